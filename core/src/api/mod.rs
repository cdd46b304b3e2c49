//! Request/response contracts and the common JSON envelope.
//!
//! # Design
//! Every DSM call is described by a type implementing [`Request`]: it names
//! its API family, method and version, and pairs itself with a response type
//! through `Request::Response`. Request parameters come from the type's own
//! `Serialize` impl via [`crate::marshal::to_params`], so there is exactly
//! one place where a call's wire shape is declared.
//!
//! Responses decode structurally from the envelope's `data` field by serde
//! field name, not by the query-parameter annotations — the server never
//! sends parameter-style keys back.

pub mod filestation;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ErrorSummary, RawError};

/// The fixed entry path shared by all DSM APIs.
pub const ENTRY_PATH: &str = "/webapi/entry.cgi";

/// Supplies the error-summary tables a call's numeric codes resolve against.
///
/// Implemented by both requests and their paired responses; the dispatcher
/// consults the request's tables, then [`crate::error::GLOBAL_ERRORS`].
pub trait ErrorDescriber {
    fn error_summaries(&self) -> Vec<ErrorSummary>;
}

/// A single DSM API call.
pub trait Request: Serialize + ErrorDescriber {
    /// The typed payload this call decodes into.
    type Response: Response + DeserializeOwned + Default;

    /// API family name, e.g. `SYNO.FileStation.Info`.
    fn api_name(&self) -> &'static str;

    /// RPC-style method string, e.g. `list`, `get`, `rename` — not an HTTP
    /// method.
    fn api_method(&self) -> &'static str;

    /// Version number sent as the `version` query parameter.
    fn api_version(&self) -> u32;

    /// Base path for this request; nearly every API lives at [`ENTRY_PATH`].
    fn api_path(&self) -> &'static str {
        ENTRY_PATH
    }
}

/// Decoded result of a call, with its post-construction error slot.
///
/// A call that fails at the API level still returns `Ok` from the
/// dispatcher; the resolved error lands here and must be checked by the
/// caller.
pub trait Response {
    fn set_error(&mut self, error: ApiError);

    fn error(&self) -> Option<&ApiError>;

    fn is_success(&self) -> bool {
        self.error().is_none()
    }
}

/// The outer JSON structure common to all DSM responses.
///
/// `data` stays opaque until the dispatcher re-decodes it into the concrete
/// response type; the API may return partial data alongside an error.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<RawError>,
}
