//! Error types and the error-code resolver.
//!
//! # Design
//! DSM reports failures at two levels. Hard failures (marshaling, transport,
//! envelope decode) are [`ClientError`] values returned from the call itself.
//! Domain failures arrive inside the envelope as a numeric code plus optional
//! per-item sub-errors; [`resolve_error`] turns that raw record into an
//! [`ApiError`] with human-readable summaries, which the dispatcher attaches
//! to the response instead of failing the call.
//!
//! Summaries are looked up through ordered [`ErrorSummary`] tables: the
//! request's own table(s) first, [`GLOBAL_ERRORS`] last. The first table that
//! knows the code wins; codes nobody knows resolve to [`UNKNOWN_ERROR_CODE`]
//! so an unrecognized server-side code never fails a decode.

use std::fmt;

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors returned by [`crate::Client`] operations.
///
/// An API-level `success:false` is *not* represented here — it is attached to
/// the response as an [`ApiError`] and the call still returns `Ok`.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Request parameters could not be marshaled into query parameters.
    #[error("parameter marshaling failed: {0}")]
    Marshal(#[from] MarshalError),

    /// The HTTP round-trip failed (network error, TLS failure, deadline
    /// exceeded).
    #[error("transport error: {0}")]
    Transport(#[from] ureq::Error),

    /// The response envelope or its `data` payload could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Errors produced while flattening a request into query parameters.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MarshalError {
    /// The top-level value was not a struct with named fields.
    #[error("request parameters must come from a struct, got {0}")]
    NotAStruct(&'static str),

    /// Two fields mapped to the same parameter key.
    #[error("duplicate parameter key `{0}`")]
    DuplicateKey(String),

    /// A field has a shape that cannot be encoded as a query parameter.
    #[error("field `{field}`: {kind} cannot be encoded as a query parameter")]
    Unsupported {
        field: String,
        kind: &'static str,
    },

    /// Catch-all for serializer-reported errors.
    #[error("{0}")]
    Message(String),
}

impl serde::ser::Error for MarshalError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        MarshalError::Message(msg.to_string())
    }
}

/// Code-to-summary table consulted by [`describe_error`].
///
/// Tables are scanned in the order given; the first entry matching the code
/// wins.
pub type ErrorSummary = &'static [(i32, &'static str)];

/// Fallback summary for codes absent from every consulted table.
pub const UNKNOWN_ERROR_CODE: &str = "Unknown error code";

/// Error codes shared by every DSM API family.
pub const GLOBAL_ERRORS: ErrorSummary = &[
    (100, "Unknown error"),
    (101, "No parameter of API, method or version"),
    (102, "The requested API does not exist"),
    (103, "The requested method does not exist"),
    (104, "The requested version does not support the functionality"),
    (105, "The logged in session does not have permission"),
    (106, "Session timeout"),
    (107, "Session interrupted by duplicate login"),
    (119, "SID not found"),
];

/// Error record exactly as it appears on the wire, before resolution.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawError {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub errors: Vec<RawErrorItem>,
}

/// A single per-item error; extra fields beside `code` are kept as-is.
#[derive(Debug, Clone, Deserialize)]
pub struct RawErrorItem {
    pub code: i32,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

/// A fully resolved DSM error: the raw code plus its human-readable summary
/// and any per-item detail.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub code: i32,
    pub summary: String,
    pub errors: Vec<ErrorDetail>,
}

/// One resolved sub-error. `details` carries the item's extra fields; the
/// `code` entry is dropped because it is promoted to [`ErrorDetail::code`].
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorDetail {
    pub code: i32,
    pub summary: String,
    pub details: Map<String, Value>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.summary)?;
        if !self.errors.is_empty() {
            write!(f, "\n\tDetails:")?;
        }
        for item in &self.errors {
            write!(f, "\n\t\t[{}] {}", item.code, item.summary)?;
            if !item.details.is_empty() {
                let fields: Vec<String> = item
                    .details
                    .iter()
                    .map(|(key, value)| format!("{key}: {value}"))
                    .collect();
                write!(f, ": [{}]", fields.join(","))?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

/// Translate an error code into a summary by scanning `summaries` in order.
pub fn describe_error(code: i32, summaries: &[ErrorSummary]) -> &'static str {
    for table in summaries {
        for (known, text) in *table {
            if *known == code {
                return text;
            }
        }
    }
    UNKNOWN_ERROR_CODE
}

/// Resolve a raw wire error against ordered summary tables.
///
/// Returns `None` for a zero top-level code: DSM uses code 0 for "no error"
/// and such a record must not surface to callers as a failure.
pub fn resolve_error(raw: RawError, summaries: &[ErrorSummary]) -> Option<ApiError> {
    if raw.code == 0 {
        return None;
    }

    let errors = raw
        .errors
        .into_iter()
        .map(|item| {
            let mut details = item.details;
            // redundant with the item's own code field
            details.remove("code");
            ErrorDetail {
                code: item.code,
                summary: describe_error(item.code, summaries).to_string(),
                details,
            }
        })
        .collect();

    Some(ApiError {
        code: raw.code,
        summary: describe_error(raw.code, summaries).to_string(),
        errors,
    })
}
