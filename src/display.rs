//! The device's idle display.

use crate::config::{keys, ConfigRecord, ConfigStore};
use std::sync::Arc;
use tracing::info;

/// Something that can redraw the idle screen from the current configuration
pub trait DisplayRefresh {
    /// Start a redraw without waiting for it to finish
    fn trigger_refresh(&self);
}

/// Idle screen rendered to the log
#[derive(Debug, Clone)]
pub struct LogDisplay {
    store: Arc<ConfigStore>,
}

impl LogDisplay {
    #[must_use]
    pub fn new(store: Arc<ConfigStore>) -> Self {
        Self { store }
    }
}

impl DisplayRefresh for LogDisplay {
    fn trigger_refresh(&self) {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            let record = store.load();
            for line in idle_screen_lines(&record) {
                info!(target: "display", "{line}");
            }
        });
    }
}

/// Lines shown on the idle screen
#[must_use]
pub fn idle_screen_lines(record: &ConfigRecord) -> Vec<String> {
    let mut lines = vec![
        record.str_or(keys::CENTER_NAME, "ARX-RING"),
        format!("Block {}", record.str_or(keys::BLOCK_NAME, "-")),
    ];

    match record.number_of_rooms() {
        Some(rooms) => lines.push(format!("Rooms: {rooms}")),
        None => lines.push("Rooms: not set".to_string()),
    }
    if record.is_mother() {
        lines.push("Mother device".to_string());
    }
    if record.test_mode() {
        lines.push("TEST MODE".to_string());
    }
    lines
}
