//! Decoding of `application/x-www-form-urlencoded` request bodies.
//!
//! The configuration pages are submitted by a client that percent-encodes
//! form values twice, so every key and value goes through up to
//! [`DECODE_PASSES`] decode passes. A pass that leaves the string unchanged
//! ends decoding early, which keeps single-encoded input correct.

use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Number of decode passes applied to every key and value.
pub const DECODE_PASSES: usize = 2;

/// Reasons a single decode pass can fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A `%` at `offset` is not followed by two hexadecimal digits
    MalformedEscape { offset: usize },
    /// The decoded bytes are not valid UTF-8
    InvalidUtf8,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::MalformedEscape { offset } => {
                write!(f, "malformed percent escape at offset {offset}")
            }
            DecodeError::InvalidUtf8 => f.write_str("decoded bytes are not valid UTF-8"),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Fields decoded from a form body.
///
/// Pairs that failed to decode have no value in `fields`. Their keys are
/// listed in `rejected`, decoded when the key itself was decodable, so
/// handlers can report them and still see that the key was submitted.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FormData {
    fields: HashMap<String, String>,
    rejected: Vec<String>,
}

impl FormData {
    /// Decoded value for `key`, if the key was present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Decoded value for `key`, treating an empty value as absent.
    #[must_use]
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|value| !value.is_empty())
    }

    /// Presence check used for checkbox fields, whatever the submitted value.
    ///
    /// A key whose value failed to decode still counts as present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key) || self.is_rejected(key)
    }

    /// Whether `key` was submitted with a value that could not be decoded
    #[must_use]
    pub fn is_rejected(&self, key: &str) -> bool {
        self.rejected.iter().any(|rejected| rejected == key)
    }

    /// Decoded value for `key` or the empty string.
    #[must_use]
    pub fn value_or_empty(&self, key: &str) -> String {
        self.get(key).unwrap_or_default().to_string()
    }

    #[must_use]
    pub fn rejected(&self) -> &[String] {
        &self.rejected
    }

    /// One status line per field that could not be decoded
    #[must_use]
    pub fn rejection_messages(&self) -> Vec<String> {
        self.rejected
            .iter()
            .map(|key| format!("Could not decode field '{key}'."))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn reject(&mut self, key: String) {
        self.fields.remove(&key);
        if !self.is_rejected(&key) {
            self.rejected.push(key);
        }
    }
}

/// Split a form body on raw `&` and `=` and decode each side independently.
///
/// Splitting happens on the encoded text, so an encoded `&` or `=` inside a
/// value survives. Pairs without `=` are ignored and a repeated key keeps the
/// last value.
#[must_use]
pub fn parse_form(body: &str) -> FormData {
    let mut form = FormData::default();

    for pair in body.split('&') {
        let Some((raw_key, raw_value)) = pair.split_once('=') else {
            continue;
        };

        let key = match decode_component(raw_key) {
            Ok(key) => key,
            Err(e) => {
                debug!("Skipping form field '{raw_key}': {e}");
                form.reject(raw_key.to_string());
                continue;
            }
        };

        match decode_component(raw_value) {
            Ok(value) => {
                form.rejected.retain(|rejected| *rejected != key);
                form.fields.insert(key, value);
            }
            Err(e) => {
                debug!("Skipping value of form field '{key}': {e}");
                form.reject(key);
            }
        }
    }

    form
}

/// Decode one key or value with the double-decoding policy.
///
/// A failure on the first pass is an error. A failure on a later pass keeps
/// the previous result, since any `%` left after the first pass is literal.
///
/// # Errors
///
/// Returns a [`DecodeError`] when the first pass hits a malformed escape or
/// produces invalid UTF-8.
pub fn decode_component(input: &str) -> Result<String, DecodeError> {
    let mut current = decode_pass(input)?;
    if current == input {
        return Ok(current);
    }

    for _ in 1..DECODE_PASSES {
        match decode_pass(&current) {
            Ok(next) if next == current => break,
            Ok(next) => current = next,
            Err(e) => {
                debug!("Keeping partially decoded value after failed pass: {e}");
                break;
            }
        }
    }

    Ok(current)
}

/// One decode pass: `+` becomes a space and `%XX` becomes the byte `0xXX`.
///
/// The resulting bytes are interpreted as UTF-8 once every escape has been
/// substituted, so multi-byte sequences split over several escapes work.
///
/// # Errors
///
/// Returns a [`DecodeError`] on a malformed escape or invalid UTF-8.
pub fn decode_pass(input: &str) -> Result<String, DecodeError> {
    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                decoded.push(b' ');
                i += 1;
            }
            b'%' => {
                let escape = bytes
                    .get(i + 1..i + 3)
                    .ok_or(DecodeError::MalformedEscape { offset: i })?;
                let high = hex_value(escape[0]).ok_or(DecodeError::MalformedEscape { offset: i })?;
                let low = hex_value(escape[1]).ok_or(DecodeError::MalformedEscape { offset: i })?;
                decoded.push((high << 4) | low);
                i += 3;
            }
            byte => {
                decoded.push(byte);
                i += 1;
            }
        }
    }

    String::from_utf8(decoded).map_err(|_| DecodeError::InvalidUtf8)
}

fn hex_value(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::form_urlencoded::byte_serialize;

    fn encode_once(input: &str) -> String {
        byte_serialize(input.as_bytes()).collect()
    }

    #[test]
    fn test_double_encoded_credentials() {
        let form = parse_form("ssid=My%2520Net&password=p%2540ss");
        assert_eq!(form.get("ssid"), Some("My Net"));
        assert_eq!(form.get("password"), Some("p@ss"));
        assert!(form.rejected().is_empty());
    }

    #[test]
    fn test_single_encoded_input_still_decodes() {
        assert_eq!(decode_component("My+Net").unwrap(), "My Net");
        assert_eq!(decode_component("p%40ss").unwrap(), "p@ss");
        assert_eq!(decode_component("caf%C3%A9").unwrap(), "café");
    }

    #[test]
    fn test_decode_inverts_double_encoding() {
        for original in [
            "My Net",
            "p@ss w0rd!",
            "a+b=c&d",
            "100%",
            "Блок 3",
            "quote'\"",
            "",
        ] {
            let twice = encode_once(&encode_once(original));
            assert_eq!(decode_component(&twice).unwrap(), original, "input {twice}");
        }
    }

    #[test]
    fn test_decode_is_stable_on_resolved_input() {
        let resolved = decode_component("Room_12-B").unwrap();
        assert_eq!(resolved, "Room_12-B");
        assert_eq!(decode_component(&resolved).unwrap(), resolved);
    }

    #[test]
    fn test_stops_after_two_passes() {
        // Triple encoded "@" only resolves two levels.
        assert_eq!(decode_component("%252540").unwrap(), "%40");
    }

    #[test]
    fn test_malformed_escape_on_first_pass_is_an_error() {
        assert_eq!(
            decode_component("abc%zz"),
            Err(DecodeError::MalformedEscape { offset: 3 })
        );
        assert_eq!(
            decode_component("trailing%4"),
            Err(DecodeError::MalformedEscape { offset: 8 })
        );
    }

    #[test]
    fn test_literal_percent_after_first_pass_is_kept() {
        assert_eq!(decode_component("100%25").unwrap(), "100%");
        assert_eq!(decode_component("50%25+off").unwrap(), "50% off");
    }

    #[test]
    fn test_invalid_utf8_is_rejected() {
        assert_eq!(decode_component("%FF%FE"), Err(DecodeError::InvalidUtf8));
    }

    #[test]
    fn test_bad_pair_is_skipped_and_reported() {
        let form = parse_form("ssid=ok&password=bad%G1&mothers=2");
        assert_eq!(form.get("ssid"), Some("ok"));
        assert_eq!(form.get("mothers"), Some("2"));
        assert_eq!(form.get("password"), None);
        assert!(form.is_rejected("password"));
        assert_eq!(form.rejected(), ["password".to_string()]);
    }

    #[test]
    fn test_rejected_value_keeps_key_present() {
        let form = parse_form("isMother=%&machine%255Ftoken=abc%zz");
        assert!(form.contains("isMother"));
        assert!(form.contains("machine_token"));
        assert_eq!(form.get("machine_token"), None);
        assert_eq!(form.non_empty("isMother"), None);
    }

    #[test]
    fn test_undecodable_key_is_reported_raw() {
        let form = parse_form("bad%zzkey=1");
        assert_eq!(form.rejected(), ["bad%zzkey".to_string()]);
        assert!(form.is_empty());
    }

    #[test]
    fn test_later_duplicate_overrides_rejection() {
        let form = parse_form("ssid=%zz&ssid=Home");
        assert_eq!(form.get("ssid"), Some("Home"));
        assert!(!form.is_rejected("ssid"));

        let form = parse_form("ssid=Home&ssid=%zz");
        assert_eq!(form.get("ssid"), None);
        assert!(form.is_rejected("ssid"));
    }

    #[test]
    fn test_single_encoded_plus_becomes_space() {
        // `%2B` resolves to `+` on the first pass and to a space on the second
        assert_eq!(decode_component("p%2Bss").unwrap(), "p ss");
        assert_eq!(decode_component("My%252BNet").unwrap(), "My+Net");
    }

    #[test]
    fn test_encoded_separators_survive_splitting() {
        let form = parse_form("center_name=A%2526B%253DC&block_name=x");
        assert_eq!(form.get("center_name"), Some("A&B=C"));
        assert_eq!(form.get("block_name"), Some("x"));
    }

    #[test]
    fn test_keys_are_decoded_too() {
        let form = parse_form("machine%255Fcode=M1");
        assert_eq!(form.get("machine_code"), Some("M1"));
    }

    #[test]
    fn test_pairs_without_equals_are_ignored() {
        let form = parse_form("isMother&test_mode=on&&=empty_key");
        assert!(!form.contains("isMother"));
        assert!(form.contains("test_mode"));
        assert_eq!(form.get(""), Some("empty_key"));
        assert_eq!(form.len(), 2);
    }

    #[test]
    fn test_last_duplicate_wins() {
        let form = parse_form("ssid=first&ssid=second");
        assert_eq!(form.get("ssid"), Some("second"));
    }

    #[test]
    fn test_non_empty_treats_blank_as_missing() {
        let form = parse_form("ssid=&password=x");
        assert!(form.contains("ssid"));
        assert_eq!(form.non_empty("ssid"), None);
        assert_eq!(form.non_empty("password"), Some("x"));
        assert_eq!(form.value_or_empty("missing"), "");
    }
}
