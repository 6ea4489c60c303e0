use crate::config::{keys, ConfigRecord, ConfigStore};
use crate::display::DisplayRefresh;
use crate::error::Result;
use crate::form::{parse_form, FormData};
use crate::http::Response;
use askama::Template;
use serde_json::Value;
use tracing::{error, info, warn};

/// Free-text fields the configuration form always submits
const TEXT_FIELDS: [&str; 6] = [
    keys::MOTHERS,
    keys::CENTER_NAME,
    keys::BLOCK_NAME,
    keys::NUMBER_OF_ROOMS,
    keys::MACHINE_CODE,
    keys::MACHINE_TOKEN,
];

/// Alarm lists that may be replaced through the form
const ALARM_FIELDS: [&str; 2] = [keys::MOTHER_ALARMS, keys::LAST_ALARM];

/// One row of an alarm table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmRow {
    pub valid: bool,
    pub room: String,
    pub block_name: String,
    pub date: String,
    pub reference: String,
    pub flag: &'static str,
}

impl AlarmRow {
    /// Build a row from a stored entry, reading `flag_key` as the Yes/No column
    fn from_value(value: &Value, flag_key: &str, flag_default: bool) -> Self {
        let Value::Object(entry) = value else {
            return Self {
                valid: false,
                room: String::new(),
                block_name: String::new(),
                date: String::new(),
                reference: String::new(),
                flag: "",
            };
        };

        let field = |key: &str| match entry.get(key) {
            None | Some(Value::Null) => "N/A".to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };
        let flag = entry
            .get(flag_key)
            .and_then(Value::as_bool)
            .unwrap_or(flag_default);

        Self {
            valid: true,
            room: field("room"),
            block_name: field("block_name"),
            date: field("date"),
            reference: field("reference"),
            flag: if flag { "Yes" } else { "No" },
        }
    }
}

fn alarm_rows(
    record: &ConfigRecord,
    key: &str,
    flag_key: &str,
    flag_default: bool,
) -> Vec<AlarmRow> {
    record
        .list(key)
        .map(|list| {
            list.iter()
                .map(|value| AlarmRow::from_value(value, flag_key, flag_default))
                .collect()
        })
        .unwrap_or_default()
}

// Template structure for the additional configuration page
#[derive(Template)]
#[template(path = "config.html")]
pub struct ConfigTemplate {
    status: Vec<String>,
    mothers: String,
    center_name: String,
    block_name: String,
    number_of_rooms: String,
    machine_code: String,
    machine_token: String,
    is_mother: bool,
    test_mode: bool,
    mother_alarms: Vec<AlarmRow>,
    last_alarms: Vec<AlarmRow>,
}

impl ConfigTemplate {
    #[must_use]
    pub fn new(status: Vec<String>, record: &ConfigRecord) -> Self {
        Self {
            status,
            mothers: record.str_or(keys::MOTHERS, ""),
            center_name: record.str_or(keys::CENTER_NAME, ""),
            block_name: record.str_or(keys::BLOCK_NAME, ""),
            number_of_rooms: record.str_or(keys::NUMBER_OF_ROOMS, ""),
            machine_code: record.str_or(keys::MACHINE_CODE, ""),
            machine_token: record.str_or(keys::MACHINE_TOKEN, ""),
            is_mother: record.is_mother(),
            test_mode: record.test_mode(),
            mother_alarms: alarm_rows(record, keys::MOTHER_ALARMS, "ring", false),
            last_alarms: alarm_rows(record, keys::LAST_ALARM, "status", true),
        }
    }
}

/// Render the additional configuration page for `record`
///
/// # Errors
///
/// Returns an error if the template fails to render
pub fn render_config_page(status: Vec<String>, record: &ConfigRecord) -> Result<String> {
    Ok(ConfigTemplate::new(status, record).render()?)
}

/// `GET /config`
///
/// # Errors
///
/// Returns an error if the page cannot be rendered
pub fn show_config(store: &ConfigStore) -> Result<Response> {
    tracing::debug!("Generating configuration page");
    let html = render_config_page(Vec::new(), &store.load())?;
    Ok(Response::html(html))
}

/// `POST /update_config`
///
/// Every text field is overwritten (missing ones become empty), the two
/// checkboxes are true exactly when their key was submitted, and unrelated
/// keys are preserved. A text field whose value could not be decoded keeps
/// its stored value. A successful save triggers a display refresh before
/// the page is rendered.
///
/// # Errors
///
/// Returns an error if the page cannot be rendered
pub fn update_config<D: DisplayRefresh>(
    store: &ConfigStore,
    display: &D,
    body: &str,
) -> Result<Response> {
    info!("Saving additional configuration");

    let form = parse_form(body);
    let mut status = form.rejection_messages();

    let number_of_rooms = form.value_or_empty(keys::NUMBER_OF_ROOMS);
    if number_of_rooms.is_empty() {
        status.push("Number of Rooms not provided.".to_string());
    } else {
        status.push(format!("Number of Rooms: {number_of_rooms}"));
    }

    let result = store.update(|record| {
        for key in TEXT_FIELDS.into_iter().filter(|key| !form.is_rejected(key)) {
            record.set(key, form.value_or_empty(key));
        }
        record.set(keys::IS_MOTHER, form.contains(keys::IS_MOTHER));
        record.set(keys::TEST_MODE, form.contains(keys::TEST_MODE));
        Ok(apply_alarm_fields(record, &form))
    });

    match result {
        Ok((_, alarm_messages)) => {
            status.extend(alarm_messages);
            status.push("Additional configurations updated successfully.".to_string());
            info!("Additional configuration updated");
            display.trigger_refresh();
        }
        Err(e) => {
            error!("Failed to update additional configuration: {e}");
            status.push("Failed to save additional configuration.".to_string());
        }
    }

    let html = render_config_page(status, &store.load())?;
    Ok(Response::html(html))
}

/// Replace alarm lists submitted as JSON arrays; anything else is ignored
fn apply_alarm_fields(record: &mut ConfigRecord, form: &FormData) -> Vec<String> {
    let mut messages = Vec::new();

    for key in ALARM_FIELDS {
        let Some(raw) = form.get(key) else {
            continue;
        };

        match serde_json::from_str::<Value>(raw) {
            Ok(list @ Value::Array(_)) => record.set(key, list),
            _ => {
                warn!("Ignoring '{key}' from form: not a JSON list");
                messages.push(format!("Ignored {key}: expected a list of alarms."));
            }
        }
    }

    messages
}
