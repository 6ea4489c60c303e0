//! Short random identifiers for alarm records.
//!
//! Each character comes from one random byte reduced modulo the 62-symbol
//! alphabet. 256 is not a multiple of 62, so the first symbols are slightly
//! more likely; these references only label alarms and must not be used as
//! secrets.

use rand::rngs::OsRng;
use rand::RngCore;

/// Length of references attached to new alarms.
pub const REFERENCE_LENGTH: usize = 8;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate a reference of `length` characters from the operating system RNG.
#[must_use]
pub fn generate_reference(length: usize) -> String {
    generate_reference_with(&mut OsRng, length)
}

/// Generate a reference drawing bytes from `rng`.
pub fn generate_reference_with<R: RngCore + ?Sized>(rng: &mut R, length: usize) -> String {
    let mut bytes = vec![0u8; length];
    rng.fill_bytes(&mut bytes);
    bytes
        .iter()
        .map(|&byte| char::from(ALPHABET[usize::from(byte) % ALPHABET.len()]))
        .collect()
}
