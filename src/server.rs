use crate::config::{ConfigStore, CONFIG_FILE};
use crate::display::DisplayRefresh;
use crate::error::Result;
use crate::http::{read_request, Request, Response, DEFAULT_READ_LIMIT};
use crate::wifi::WifiLink;
use crate::{index, settings};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Port the configuration pages are served on
pub const DEFAULT_PORT: u16 = 80;

/// How long to wait on a silent client before giving up on it
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Process-level settings for the configuration server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub port: u16,
    pub config_path: PathBuf,
    /// Upper bound on the bytes read from one request
    pub read_limit: usize,
    pub read_timeout: Duration,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            config_path: PathBuf::from(CONFIG_FILE),
            read_limit: DEFAULT_READ_LIMIT,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// Routes requests to the page handlers
///
/// Owns the configuration store and the WiFi and display collaborators, which
/// are handed to each handler explicitly.
pub struct Portal<W, D> {
    store: Arc<ConfigStore>,
    wifi: W,
    display: D,
}

impl<W, D> Portal<W, D>
where
    W: WifiLink,
    D: DisplayRefresh,
{
    pub fn new(store: Arc<ConfigStore>, wifi: W, display: D) -> Self {
        Self {
            store,
            wifi,
            display,
        }
    }

    #[must_use]
    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Produce the single response for `request`.
    ///
    /// Unknown method and path combinations get a 404 page.
    ///
    /// # Errors
    ///
    /// Returns an error if a page cannot be rendered.
    pub async fn dispatch(&self, request: &Request) -> Result<Response> {
        match (request.method.as_str(), request.path.as_str()) {
            ("GET", "/") => index::show_wifi(&self.store, &self.wifi).await,
            ("GET", "/config") => settings::show_config(&self.store),
            ("POST", "/update_wifi") => {
                index::update_wifi(&self.store, &self.wifi, &request.body).await
            }
            ("POST", "/update_config") => {
                settings::update_config(&self.store, &self.display, &request.body)
            }
            (method, path) => {
                debug!("No route for {method} {path}");
                Ok(Response::not_found())
            }
        }
    }
}

/// Serve one connection: read, dispatch, respond, close.
///
/// The stream is shut down on every path, including errors. A peer that
/// closes without sending anything gets no response.
///
/// # Errors
///
/// Returns the error that ended the exchange early.
pub async fn handle_connection<S, W, D>(
    mut stream: S,
    portal: &Portal<W, D>,
    settings: &ServerSettings,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
    W: WifiLink,
    D: DisplayRefresh,
{
    let outcome = respond(&mut stream, portal, settings).await;

    if let Err(e) = stream.shutdown().await {
        debug!("Failed to shut down connection: {e}");
    }
    outcome
}

async fn respond<S, W, D>(
    stream: &mut S,
    portal: &Portal<W, D>,
    settings: &ServerSettings,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
    W: WifiLink,
    D: DisplayRefresh,
{
    let raw = read_request(stream, settings.read_limit, settings.read_timeout).await?;
    if raw.is_empty() {
        debug!("Empty request received");
        return Ok(());
    }

    let request = Request::parse(&raw);
    info!("{} {}", request.method, request.path);

    let response = portal.dispatch(&request).await?;
    stream.write_all(&response.to_bytes()).await?;
    stream.flush().await?;

    debug!("Responded {} to {} {}", response.status.code(), request.method, request.path);
    Ok(())
}

/// Accept connections on `listener` until `cancel_token` fires.
///
/// Each connection is handled to completion before the next one is accepted,
/// so configuration updates never interleave. A failing connection is logged
/// and does not stop the loop.
///
/// # Errors
///
/// This function currently always returns `Ok(())` once cancelled.
pub async fn serve<W, D>(
    listener: TcpListener,
    portal: Portal<W, D>,
    settings: ServerSettings,
    cancel_token: CancellationToken,
) -> Result<()>
where
    W: WifiLink,
    D: DisplayRefresh,
{
    loop {
        tokio::select! {
            () = cancel_token.cancelled() => {
                info!("Shutdown requested, no longer accepting connections");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!("Accepted connection from {peer}");
                    if let Err(e) = handle_connection(stream, &portal, &settings).await {
                        error!("Failed to handle request from {peer}: {e}");
                    }
                }
                Err(e) => warn!("Failed to accept connection: {e}"),
            },
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Run the configuration server on the port in `settings`.
///
/// # Errors
///
/// Returns an error if:
/// - The address string cannot be parsed into a valid `SocketAddr`
/// - The server fails to bind to the specified address
pub async fn run<W, D>(
    settings: ServerSettings,
    portal: Portal<W, D>,
    cancel_token: CancellationToken,
) -> Result<()>
where
    W: WifiLink,
    D: DisplayRefresh,
{
    tracing::info!("Initializing server");

    let addr = format!("0.0.0.0:{}", settings.port);
    let address: SocketAddr = addr.parse()?;
    tracing::info!("Binding server to address: {address}");

    let listener = TcpListener::bind(address).await?;
    tracing::info!(
        "Configuration pages available on http://{address} (config file {})",
        portal.store().path().display()
    );

    serve(listener, portal, settings, cancel_token).await
}
