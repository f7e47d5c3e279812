//! Address canonicalization
//!
//! Every record address is rewritten to carry an explicit transport scheme
//! before it is checksummed, backed up or submitted.

use crate::error::{CommonError, Result};
use crate::types::Record;
use url::Url;

/// Scheme prepended to addresses that carry none.
pub const DEFAULT_SCHEME: &str = "https://";

/// Normalize an address so it always begins with a transport scheme.
///
/// Surrounding whitespace is trimmed. Addresses that already carry a scheme
/// (`http://`, `ftp://`, ...) keep it.
pub fn canonicalize_address(address: &str) -> String {
    let trimmed = address.trim();
    if has_scheme(trimmed) {
        trimmed.to_string()
    } else {
        format!("{}{}", DEFAULT_SCHEME, trimmed)
    }
}

/// Canonicalize every record of a batch.
pub fn canonicalize_all(records: Vec<Record>) -> Vec<Record> {
    records
        .into_iter()
        .map(|mut record| {
            record.canonicalize();
            record
        })
        .collect()
}

/// Parse a canonical address, rejecting anything without a usable host.
///
/// The authority between `scheme://` and the first `/`, `?` or `#` must be
/// present in the text itself. The URL parser alone would accept
/// `https:///path` by reading `path` as the host.
pub fn parse_address(address: &str) -> Result<Url> {
    let invalid = |reason: String| CommonError::InvalidAddress {
        address: address.to_string(),
        reason,
    };

    let authority = address
        .split_once("://")
        .and_then(|(_, rest)| rest.split(['/', '?', '#']).next())
        .unwrap_or_default();
    if authority.trim().is_empty() {
        return Err(invalid("missing host".to_string()));
    }

    let url = Url::parse(address).map_err(|e| invalid(e.to_string()))?;
    match url.host_str() {
        Some(host) if !host.trim().is_empty() => Ok(url),
        _ => Err(invalid("missing host".to_string())),
    }
}

/// RFC 3986 scheme: a letter followed by letters, digits, `+`, `-` or `.`
fn has_scheme(address: &str) -> bool {
    let Some((scheme, _)) = address.split_once("://") else {
        return false;
    };

    let mut chars = scheme.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {},
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
