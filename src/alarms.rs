//! Alarm lists kept inside the configuration record.
//!
//! `mother_alarms` holds alarms this device relays and may still need to
//! sound (`ring`); `last_alarm` holds recent alarms with a `status` flag.
//! Entries are only appended or have their flags changed; nothing here
//! removes or reorders them.

use crate::config::{keys, ConfigRecord, ConfigStore};
use crate::error::{ArxRingError, Result};
use crate::reference::{generate_reference, REFERENCE_LENGTH};
use crate::utils::current_datetime_string;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

/// One alarm occurrence as stored in an alarm list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmEntry {
    pub room: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_name: Option<String>,
    pub date: String,
    pub reference: String,
    /// Mother alarms only: the alarm should still sound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ring: Option<bool>,
    /// Last-alarm records only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<bool>,
}

impl AlarmEntry {
    /// A ringing mother alarm
    #[must_use]
    pub fn mother(room: &str, block_name: &str, date: String, reference: String) -> Self {
        Self {
            room: room.to_string(),
            block_name: Some(block_name.to_string()),
            date,
            reference,
            ring: Some(true),
            status: None,
        }
    }

    /// A last-alarm record
    #[must_use]
    pub fn last(room: &str, date: String, reference: String, status: bool) -> Self {
        Self {
            room: room.to_string(),
            block_name: None,
            date,
            reference,
            ring: None,
            status: Some(status),
        }
    }
}

/// Clear the ring flag on every mother alarm.
///
/// Entries without a `ring` key get one set to `false`. Items that are not
/// objects are left alone. Returns the number of entries reset; an empty
/// list succeeds with zero.
///
/// # Errors
///
/// Returns [`ArxRingError::AlarmList`] without touching the record when
/// `mother_alarms` is missing or is not a list.
pub fn reset_mother_ring_flags(record: &mut ConfigRecord) -> Result<usize> {
    let alarms = record
        .list_mut(keys::MOTHER_ALARMS)
        .ok_or_else(|| ArxRingError::AlarmList(keys::MOTHER_ALARMS.to_string()))?;

    let mut reset = 0;
    for alarm in alarms.iter_mut() {
        if let Value::Object(entry) = alarm {
            entry.insert("ring".to_string(), Value::Bool(false));
            reset += 1;
        }
    }

    if reset == 0 {
        debug!("No mother alarm entries to reset");
    }
    Ok(reset)
}

/// Append a mother alarm, creating the list when it does not exist yet.
///
/// # Errors
///
/// Returns [`ArxRingError::AlarmList`] when `mother_alarms` holds a non-list.
pub fn push_mother_alarm(record: &mut ConfigRecord, entry: &AlarmEntry) -> Result<()> {
    push_entry(record, keys::MOTHER_ALARMS, entry)
}

/// Append a last-alarm record, creating the list when it does not exist yet.
///
/// # Errors
///
/// Returns [`ArxRingError::AlarmList`] when `last_alarm` holds a non-list.
pub fn push_last_alarm(record: &mut ConfigRecord, entry: &AlarmEntry) -> Result<()> {
    push_entry(record, keys::LAST_ALARM, entry)
}

fn push_entry(record: &mut ConfigRecord, key: &str, entry: &AlarmEntry) -> Result<()> {
    let value = serde_json::to_value(entry)?;

    if let Some(list) = record.list_mut(key) {
        list.push(value);
        return Ok(());
    }
    if record.get(key).is_some() {
        return Err(ArxRingError::AlarmList(key.to_string()));
    }

    record.set(key, Value::Array(vec![value]));
    Ok(())
}

/// Decode the object entries of an alarm list, skipping anything malformed
#[must_use]
pub fn entries(record: &ConfigRecord, key: &str) -> Vec<AlarmEntry> {
    record
        .list(key)
        .map(|list| {
            list.iter()
                .filter_map(|value| serde_json::from_value(value.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Reset every mother alarm's ring flag in the persisted configuration.
///
/// # Errors
///
/// Fails without saving when `mother_alarms` is missing or not a list, or
/// when the configuration cannot be written.
pub fn reset_mother(store: &ConfigStore) -> Result<usize> {
    let (_, reset) = store.update(reset_mother_ring_flags)?;
    info!("Reset ring flag on {reset} mother alarm(s)");
    Ok(reset)
}

/// Record a new ringing mother alarm for `room` and persist it.
///
/// # Errors
///
/// Fails when `mother_alarms` holds a non-list or the save fails.
pub fn raise_mother_alarm(
    store: &ConfigStore,
    room: &str,
    block_name: &str,
) -> Result<AlarmEntry> {
    let entry = AlarmEntry::mother(
        room,
        block_name,
        current_datetime_string(),
        generate_reference(REFERENCE_LENGTH),
    );
    store.update(|record| push_mother_alarm(record, &entry))?;
    info!(
        "Mother alarm raised for room {room} in block {block_name} (reference {})",
        entry.reference
    );
    Ok(entry)
}
