//! Checksum utilities for backup verification
//!
//! The digest is a 32-bit shift-and-subtract rolling hash over the JSON
//! serialization of an ordered record batch, rendered in base 36. It detects
//! accidental corruption of a stored snapshot; it is not a security measure.

use crate::error::{CommonError, Result};
use crate::types::Record;

const BASE36_DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Compute the digest of an ordered batch of records.
pub fn compute_checksum(records: &[Record]) -> String {
    // Serializing plain string structs cannot fail; an empty payload would
    // still hash deterministically if it ever did.
    let serialized = serde_json::to_string(records).unwrap_or_default();
    digest_str(&serialized)
}

/// Fold a string into the rolling hash, one UTF-16 code unit at a time.
pub fn digest_str(input: &str) -> String {
    let hash = input.encode_utf16().fold(0i32, |hash, unit| {
        hash.wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit))
    });
    encode_base36(u128::from(i64::from(hash).unsigned_abs()))
}

/// Verify that `records` still hash to `expected`
pub fn verify_checksum(records: &[Record], expected: &str) -> Result<()> {
    let actual = compute_checksum(records);
    if actual == expected {
        Ok(())
    } else {
        Err(CommonError::ChecksumMismatch {
            expected: expected.to_string(),
            actual,
        })
    }
}

/// Lowercase base-36 rendering of an unsigned integer.
pub fn encode_base36(mut value: u128) -> String {
    if value == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36_DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}
