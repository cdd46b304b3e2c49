//! Authenticated session transport and generic request dispatcher.
//!
//! # Design
//! [`Client`] owns a single pooled `ureq` agent for its whole lifetime. The
//! agent's cookie store holds the DSM session cookie established by
//! [`Client::login`], so every later call is authenticated automatically.
//! Callers must finish `login` before issuing protected calls; the client
//! does not serialize concurrent use of the jar.
//!
//! Every call, login included, is bounded by a fixed 3 second deadline.
//! There are no retries: transport failures surface immediately.

use std::time::Duration;

use tracing::debug;
use ureq::tls::TlsConfig;
use ureq::Agent;

use crate::api::{Envelope, Request, Response, ENTRY_PATH};
use crate::error::{resolve_error, ClientError, GLOBAL_ERRORS};
use crate::marshal;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(3);
const MAX_IDLE_CONNECTIONS: usize = 100;

const AUTH_API: &str = "SYNO.API.Auth";
const AUTH_VERSION: &str = "7";

/// Synchronous client for the DSM web API.
pub struct Client {
    agent: Agent,
    base_url: String,
}

impl Client {
    /// Build a client for `host`.
    ///
    /// `host` is a bare `host:port` (https is assumed) or a full base URL
    /// with an explicit scheme. `skip_certificate_verification` disables TLS
    /// certificate checks for appliances with self-signed certificates.
    pub fn new(host: &str, skip_certificate_verification: bool) -> Self {
        let config = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(REQUEST_TIMEOUT))
            .max_idle_connections(MAX_IDLE_CONNECTIONS)
            .tls_config(
                TlsConfig::builder()
                    .disable_verification(skip_certificate_verification)
                    .build(),
            )
            .build();

        Self {
            agent: config.new_agent(),
            base_url: base_url_for(host),
        }
    }

    /// Authenticate against `SYNO.API.Auth` and store the session cookie in
    /// the agent's jar.
    ///
    /// The response body is drained and discarded; DSM's interesting output
    /// here is the `Set-Cookie` header. Any transport failure surfaces as
    /// [`ClientError::Transport`] — a wrong password is not distinguished
    /// from a network failure.
    pub fn login(
        &self,
        user: &str,
        password: &str,
        session_name: &str,
    ) -> Result<(), ClientError> {
        let url = format!("{}{}", self.base_url, ENTRY_PATH);
        let mut response = self
            .agent
            .get(&url)
            .query_pairs([
                ("api", AUTH_API),
                ("version", AUTH_VERSION),
                ("method", "login"),
                ("account", user),
                ("passwd", password),
                ("session", session_name),
                ("format", "cookie"),
            ])
            .call()?;

        // drain so the pooled connection can be reused
        let _ = response.body_mut().read_to_string()?;
        debug!(user, session = session_name, "session established");
        Ok(())
    }

    /// Dispatch a typed request and decode its typed response.
    ///
    /// Marshaling, transport and decode failures are hard errors. An
    /// API-level `success:false` is not: the error record is resolved
    /// against the request's summary tables plus [`GLOBAL_ERRORS`], attached
    /// to the response, and the call returns `Ok`. Check
    /// [`Response::is_success`] on the result.
    pub fn send<R: Request>(&self, request: &R) -> Result<R::Response, ClientError> {
        let params = marshal::to_params(request)?;
        let url = format!("{}{}", self.base_url, request.api_path());
        let version = request.api_version().to_string();

        debug!(
            api = request.api_name(),
            method = request.api_method(),
            version = %version,
            "dispatching request"
        );

        let mut builder = self
            .agent
            .get(&url)
            .query("api", request.api_name())
            .query("version", &version)
            .query("method", request.api_method());
        for (key, value) in &params {
            builder = builder.query(key, value);
        }

        let mut http_response = builder.call()?;
        let body = http_response.body_mut().read_to_string()?;

        let envelope: Envelope = serde_json::from_str(&body)?;

        // decode data even on failure: the API may return partial payloads
        // alongside an error
        let mut response: R::Response = match envelope.data {
            Some(data) => serde_json::from_value(data)?,
            None => R::Response::default(),
        };

        if !envelope.success {
            let mut summaries = request.error_summaries();
            summaries.push(GLOBAL_ERRORS);
            if let Some(resolved) = envelope
                .error
                .and_then(|raw| resolve_error(raw, &summaries))
            {
                debug!(code = resolved.code, "api reported failure: {resolved}");
                response.set_error(resolved);
            }
        }

        Ok(response)
    }
}

fn base_url_for(host: &str) -> String {
    let trimmed = host.trim_end_matches('/');
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_host_defaults_to_https() {
        assert_eq!(base_url_for("nas.example.com:5001"), "https://nas.example.com:5001");
    }

    #[test]
    fn explicit_scheme_is_kept() {
        assert_eq!(base_url_for("http://127.0.0.1:3000"), "http://127.0.0.1:3000");
    }

    #[test]
    fn trailing_slash_is_stripped() {
        assert_eq!(base_url_for("https://nas.local/"), "https://nas.local");
    }
}
