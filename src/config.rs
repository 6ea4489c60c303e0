use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Default location of the persisted device configuration
pub const CONFIG_FILE: &str = "wifi_config.json";

/// Keys of the fields the configuration pages know about
pub mod keys {
    pub const SSID: &str = "ssid";
    pub const PASSWORD: &str = "password";
    pub const MOTHERS: &str = "mothers";
    pub const IS_MOTHER: &str = "isMother";
    pub const CENTER_NAME: &str = "center_name";
    pub const BLOCK_NAME: &str = "block_name";
    pub const NUMBER_OF_ROOMS: &str = "number_of_rooms";
    pub const MACHINE_CODE: &str = "machine_code";
    pub const MACHINE_TOKEN: &str = "machine_token";
    pub const TEST_MODE: &str = "test_mode";
    pub const MOTHER_ALARMS: &str = "mother_alarms";
    pub const LAST_ALARM: &str = "last_alarm";
}

/// The device configuration and alarm state
///
/// A flat mapping from keys to arbitrary JSON values. Keys this crate does
/// not know about are carried through every update untouched. An empty record
/// means "use defaults" everywhere.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ConfigRecord(Map<String, Value>);

impl ConfigRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    /// String form of `key`; numbers are rendered, anything else gives `default`
    #[must_use]
    pub fn str_or(&self, key: &str, default: &str) -> String {
        match self.0.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => default.to_string(),
        }
    }

    #[must_use]
    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        self.0.get(key).and_then(Value::as_bool).unwrap_or(default)
    }

    /// The list stored under `key`, if the key holds a list
    #[must_use]
    pub fn list(&self, key: &str) -> Option<&Vec<Value>> {
        self.0.get(key).and_then(Value::as_array)
    }

    pub fn list_mut(&mut self, key: &str) -> Option<&mut Vec<Value>> {
        self.0.get_mut(key).and_then(Value::as_array_mut)
    }

    #[must_use]
    pub fn ssid(&self) -> String {
        self.str_or(keys::SSID, "")
    }

    #[must_use]
    pub fn password(&self) -> String {
        self.str_or(keys::PASSWORD, "")
    }

    /// Both WiFi credentials, when both are set and non-empty
    #[must_use]
    pub fn credentials(&self) -> Option<(String, String)> {
        let ssid = self.ssid();
        let password = self.password();
        (!ssid.is_empty() && !password.is_empty()).then_some((ssid, password))
    }

    #[must_use]
    pub fn is_mother(&self) -> bool {
        self.bool_or(keys::IS_MOTHER, false)
    }

    #[must_use]
    pub fn test_mode(&self) -> bool {
        self.bool_or(keys::TEST_MODE, false)
    }

    /// Room count, whether stored as a number or as the submitted text
    #[must_use]
    pub fn number_of_rooms(&self) -> Option<u32> {
        self.str_or(keys::NUMBER_OF_ROOMS, "").trim().parse().ok()
    }
}

impl From<Map<String, Value>> for ConfigRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Owner of the persisted configuration file
///
/// Every read-modify-write goes through [`ConfigStore::update`], which holds
/// the store lock for the whole load, mutate and save sequence.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the configuration record.
    ///
    /// A missing, unreadable or corrupt file yields an empty record.
    #[must_use]
    pub fn load(&self) -> ConfigRecord {
        match self.try_load() {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(
                    "Using empty configuration, could not load {}: {e}",
                    self.path.display()
                );
                ConfigRecord::new()
            }
        }
    }

    fn try_load(&self) -> crate::error::Result<ConfigRecord> {
        tracing::debug!("Loading configuration from {}", self.path.display());
        let config_str = fs::read_to_string(&self.path)?;

        match json5::from_str::<Value>(&config_str)? {
            Value::Object(map) => Ok(ConfigRecord::from(map)),
            _ => Err(crate::error::ArxRingError::from("Config is not an object")),
        }
    }

    /// Persist `record`, replacing the previous file.
    ///
    /// The record is written to a sibling temporary file which is then
    /// renamed over the target, so a failed save leaves the old file intact.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be serialized or written. The
    /// error is also logged here.
    pub fn save(&self, record: &ConfigRecord) -> crate::error::Result<()> {
        let result = self.write_atomically(record);
        match &result {
            Ok(()) => tracing::info!("Configuration file updated"),
            Err(e) => tracing::error!("Error writing configuration file: {e}"),
        }
        result
    }

    fn write_atomically(&self, record: &ConfigRecord) -> crate::error::Result<()> {
        let config_json = serde_json::to_string_pretty(record)?;
        let temp_path = self.temp_path();

        fs::write(&temp_path, config_json)?;
        if let Err(e) = fs::rename(&temp_path, &self.path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_else(|| CONFIG_FILE.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Load, apply `mutate`, and save as one serialized step.
    ///
    /// `mutate` returning an error aborts the update without saving. The
    /// mutated record is returned on success.
    ///
    /// # Errors
    ///
    /// Returns the error from `mutate`, or the save error.
    pub fn update<T, F>(&self, mutate: F) -> crate::error::Result<(ConfigRecord, T)>
    where
        F: FnOnce(&mut ConfigRecord) -> crate::error::Result<T>,
    {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| crate::error::ArxRingError::from("Configuration lock poisoned"))?;

        let mut record = self.load();
        let outcome = mutate(&mut record)?;
        self.save(&record)?;
        Ok((record, outcome))
    }
}
