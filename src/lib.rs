//! # ARX-RING Configuration Server Library
//!
//! This library provides the on-device configuration server for the ARX-RING
//! alarm/paging appliance. An operator connected to the device's access point
//! uses two small HTML pages to set the WiFi credentials and the device
//! configuration (rooms, block, machine identity), and to inspect the alarm
//! lists kept alongside that configuration.
//!
//! ## Overview
//!
//! - `http`: reads a request from a socket and splits it into method, path and body
//! - `form`: decodes the double URL-encoded form bodies the pages submit
//! - `server`: routes requests and runs the one-connection-at-a-time acceptor
//! - `index`: the WiFi credentials page
//! - `settings`: the additional configuration page
//! - `config`: the persisted configuration record and its store
//! - `alarms`: ring-flag reset and alarm bookkeeping
//! - `reference`: short random alarm references
//! - `wifi` and `display`: the station link and idle display the handlers drive
//! - `utils`: timestamp formatting
//!
//! ## Getting Started
//!
//! ```no_run
//! use arx_ring::config::{ConfigStore, CONFIG_FILE};
//! use arx_ring::display::LogDisplay;
//! use arx_ring::server::{self, Portal, ServerSettings};
//! use arx_ring::wifi::NmcliWifi;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), arx_ring::error::ArxRingError> {
//!     let store = Arc::new(ConfigStore::new(CONFIG_FILE));
//!     let portal = Portal::new(
//!         Arc::clone(&store),
//!         NmcliWifi::new(Arc::clone(&store)),
//!         LogDisplay::new(store),
//!     );
//!
//!     server::run(ServerSettings::default(), portal, CancellationToken::new()).await
//! }
//! ```

/// Custom error types module
///
/// Defines the `ArxRingError` enum used by every stage of request handling.
pub mod error;

/// Persisted device configuration
///
/// The configuration record is a flat JSON object kept in a single file. The
/// store degrades to an empty record when the file is missing or corrupt and
/// replaces the file atomically on save.
pub mod config;

/// Alarm list management
pub mod alarms;

pub mod reference;

pub mod form;

pub mod http;

/// WiFi credentials page
pub mod index;

/// Additional configuration page
pub mod settings;

/// Server operations module
///
/// Routes requests to the page handlers and runs the acceptor loop, which
/// serves one connection to completion before accepting the next.
pub mod server;

pub mod wifi;

pub mod display;

/// Utility functions module
pub mod utils;
