use crate::config::{keys, ConfigRecord, ConfigStore};
use crate::error::Result;
use crate::form::parse_form;
use crate::http::Response;
use crate::wifi::WifiLink;
use askama::Template;
use tracing::{info, warn};

/// Template for the WiFi credentials page; every value is HTML-escaped
///
/// The stored password is never rendered back to the client.
#[derive(Template)]
#[template(path = "wifi.html")]
pub struct WifiTemplate {
    status: Vec<String>,
    connected: bool,
    ip: String,
    ssid: String,
}

/// Render the WiFi page with the SSID currently stored in `record`
///
/// # Errors
///
/// Returns an error if the template fails to render
pub fn render_wifi_page(
    status: Vec<String>,
    connected: bool,
    ip: String,
    record: &ConfigRecord,
) -> Result<String> {
    let template = WifiTemplate {
        status,
        connected,
        ip,
        ssid: record.ssid(),
    };
    Ok(template.render()?)
}

/// `GET /`
///
/// # Errors
///
/// Returns an error if the page cannot be rendered
pub async fn show_wifi<W: WifiLink>(store: &ConfigStore, wifi: &W) -> Result<Response> {
    tracing::debug!("Generating WiFi page");
    wifi_response(store, wifi, Vec::new()).await
}

/// `POST /update_wifi`
///
/// Stores the submitted credentials and tries to join the network when both
/// `ssid` and `password` are present and non-empty. Otherwise nothing is
/// persisted. The outcome is reported on the re-rendered page.
///
/// # Errors
///
/// Returns an error if the page cannot be rendered
pub async fn update_wifi<W: WifiLink>(
    store: &ConfigStore,
    wifi: &W,
    body: &str,
) -> Result<Response> {
    info!("Updating WiFi credentials");

    let form = parse_form(body);
    let mut status = form.rejection_messages();

    match (form.non_empty(keys::SSID), form.non_empty(keys::PASSWORD)) {
        (Some(ssid), Some(password)) => {
            let saved = store
                .update(|record| {
                    record.set(keys::SSID, ssid);
                    record.set(keys::PASSWORD, password);
                    Ok(())
                })
                .is_ok();

            if saved {
                status.push("Configuration updated: SSID and Password saved.".to_string());

                if wifi.connect().await {
                    info!("Connected to new WiFi network '{ssid}'");
                    status.push("Connected to new Wi-Fi network!".to_string());
                } else {
                    warn!("Failed to connect to new WiFi network '{ssid}'");
                    status.push("Failed to connect to new Wi-Fi network.".to_string());
                }
            } else {
                status.push("Failed to save Wi-Fi configuration.".to_string());
            }
        }
        _ => {
            warn!("Invalid SSID or password received");
            status.push("Invalid SSID or Password received.".to_string());
        }
    }

    wifi_response(store, wifi, status).await
}

async fn wifi_response<W: WifiLink>(
    store: &ConfigStore,
    wifi: &W,
    status: Vec<String>,
) -> Result<Response> {
    let connected = wifi.is_connected().await;
    let ip = if connected {
        wifi.ip().await
    } else {
        String::new()
    };

    let html = render_wifi_page(status, connected, ip, &store.load())?;
    Ok(Response::html(html))
}
