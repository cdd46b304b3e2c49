//! Typed client core for the Synology DSM web API.
//!
//! # Overview
//! Every DSM call is an HTTPS GET against `/webapi/entry.cgi` carrying
//! `api`/`version`/`method` plus request-specific query parameters, answered
//! by a JSON envelope (`success`/`data`/`error`). This crate owns the generic
//! dispatch path: marshaling typed requests into flat query parameters,
//! issuing the call over an authenticated session, decoding the envelope into
//! the caller's typed response, and resolving numeric error codes into
//! human-readable summaries.
//!
//! # Design
//! - [`Client`] holds one pooled HTTP agent with a cookie jar; [`Client::login`]
//!   stores the DSM session cookie and every later call reuses it.
//! - Marshaling, transport and decode failures are hard `Err`s from
//!   [`Client::send`]. An API-level `success:false` is a normal return with
//!   the resolved [`ApiError`] attached to the response — callers must check
//!   [`Response::is_success`] after every call.
//! - Query marshaling is declared with serde field attributes (`rename`,
//!   `skip`, `flatten`) and enforced by [`marshal::to_params`]; there is no
//!   runtime reflection.
//! - Error codes resolve through ordered summary tables: the request's own
//!   tables first, then [`GLOBAL_ERRORS`]; unknown codes fall back to a fixed
//!   sentinel instead of failing the decode.

pub mod api;
pub mod client;
pub mod error;
pub mod marshal;

pub use api::{filestation, Envelope, ErrorDescriber, Request, Response};
pub use client::Client;
pub use error::{
    describe_error, resolve_error, ApiError, ClientError, ErrorDetail, ErrorSummary,
    MarshalError, RawError, RawErrorItem, GLOBAL_ERRORS, UNKNOWN_ERROR_CODE,
};
pub use marshal::{to_params, Params};
