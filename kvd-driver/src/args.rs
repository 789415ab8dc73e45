//! Argument checks run before anything is sent. Rejections are logged the
//! same way failed commands are.

use kvd_client::{DriverError, DriverResult};
use tracing::warn;

/// Accepts only UTF-8 text.
pub(crate) fn text<'a>(op: &str, what: &str, raw: &'a [u8]) -> DriverResult<&'a str> {
    std::str::from_utf8(raw).map_err(|_| reject(op, format!("{} must be text", what)))
}

/// Accepts text without whitespace, as required for names the store tokenizes.
pub(crate) fn token<'a>(op: &str, what: &str, raw: &'a [u8]) -> DriverResult<&'a str> {
    let value = text(op, what, raw)?;
    if value.is_empty() || value.chars().any(char::is_whitespace) {
        return Err(reject(op, format!("{} must be a non-empty word without spaces", what)));
    }
    Ok(value)
}

pub(crate) fn non_empty<T>(op: &str, what: &str, items: &[T]) -> DriverResult<()> {
    if items.is_empty() {
        return Err(reject(op, format!("{} must not be empty", what)));
    }
    Ok(())
}

pub(crate) fn reject(op: &str, reason: String) -> DriverError {
    warn!(target: "kvd::args", op, %reason, "argument rejected");
    DriverError::InvalidArgument(reason)
}
