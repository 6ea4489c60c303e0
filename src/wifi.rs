//! Station-mode WiFi used by the credentials page.
//!
//! The handlers only need three answers: whether the device is on a network,
//! which address it has, and whether joining the configured network worked.

use crate::config::ConfigStore;
use std::future::Future;
use std::process::Output;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// How long a single `nmcli` invocation may take, joining a network included
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Address used to pick the outbound interface; nothing is sent to it
const ROUTE_PROBE: &str = "8.8.8.8:80";

/// Station-mode WiFi link
pub trait WifiLink {
    /// Whether the station interface is associated and configured
    fn is_connected(&self) -> impl Future<Output = bool> + Send;

    /// Current station address, or an empty string when there is none
    fn ip(&self) -> impl Future<Output = String> + Send;

    /// Join the network whose credentials are in the configuration
    fn connect(&self) -> impl Future<Output = bool> + Send;
}

/// WiFi link driven through NetworkManager's `nmcli`
#[derive(Debug, Clone)]
pub struct NmcliWifi {
    store: Arc<ConfigStore>,
    command_timeout: Duration,
}

impl NmcliWifi {
    #[must_use]
    pub fn new(store: Arc<ConfigStore>) -> Self {
        Self {
            store,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, command_timeout: Duration) -> Self {
        self.command_timeout = command_timeout;
        self
    }

    async fn nmcli(&self, args: &[&str]) -> Option<Output> {
        let mut command = Command::new("nmcli");
        command.args(args).kill_on_drop(true);

        match timeout(self.command_timeout, command.output()).await {
            Ok(Ok(output)) => Some(output),
            Ok(Err(e)) => {
                warn!("Failed to run nmcli: {e}");
                None
            }
            Err(_) => {
                warn!("nmcli did not finish within {:?}", self.command_timeout);
                None
            }
        }
    }
}

impl WifiLink for NmcliWifi {
    async fn is_connected(&self) -> bool {
        match self.nmcli(&["-t", "-f", "STATE", "general"]).await {
            Some(output) if output.status.success() => {
                is_connected_state(&String::from_utf8_lossy(&output.stdout))
            }
            _ => false,
        }
    }

    async fn ip(&self) -> String {
        match local_address().await {
            Ok(ip) => ip,
            Err(e) => {
                debug!("No station address: {e}");
                String::new()
            }
        }
    }

    async fn connect(&self) -> bool {
        let Some((ssid, password)) = self.store.load().credentials() else {
            warn!("No WiFi credentials configured");
            return false;
        };

        info!("Connecting to WiFi network '{ssid}'");
        let args = ["dev", "wifi", "connect", ssid.as_str(), "password", password.as_str()];
        match self.nmcli(&args).await {
            Some(output) if output.status.success() => {
                info!("Connected to WiFi network '{ssid}'");
                true
            }
            Some(output) => {
                warn!(
                    "Failed to connect to WiFi network '{ssid}': {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                false
            }
            None => false,
        }
    }
}

/// `nmcli -t -f STATE general` prints e.g. `connected` or `connected (site only)`
fn is_connected_state(state: &str) -> bool {
    state.trim().starts_with("connected")
}

async fn local_address() -> std::io::Result<String> {
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    socket.connect(ROUTE_PROBE).await?;
    let ip = socket.local_addr()?.ip();
    if ip.is_unspecified() {
        return Ok(String::new());
    }
    Ok(ip.to_string())
}
