//! JSON decoding of nested columns.
//!
//! One function serves every nested column; the column name only feeds error
//! reporting.

use serde_json::{Map, Value};
use thiserror::Error;

/// A decoded nested field: key order follows the payload text.
pub type NestedRecord = Map<String, Value>;

/// Why a nested field could not be decoded.
#[derive(Debug, Error)]
#[error("column '{column}': {source}")]
pub struct DecodeError {
    pub column: String,
    #[source]
    pub source: serde_json::Error,
}

/// Parse `raw` as a JSON object.
///
/// Text that is valid JSON but not an object (an array, a bare string, `null`)
/// is rejected too.
///
/// # Errors
/// [`DecodeError`] carrying the column name and the parser's message.
pub fn decode(column: &str, raw: &str) -> Result<NestedRecord, DecodeError> {
    serde_json::from_str::<NestedRecord>(raw).map_err(|source| DecodeError {
        column: column.to_owned(),
        source,
    })
}
