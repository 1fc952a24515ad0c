//! Blocking JSON-over-HTTP transport used by the network adapters
//!
//! Adapters never talk to `ureq` directly; they go through
//! `HttpTransport` so every call shares the same timeout and the same
//! mapping from transport failures onto `StickerError`.

use serde_json::Value;
use std::time::Duration;
use sticker_core::{Result, StickerError};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// One round trip: a single attempt, no retries
pub trait HttpTransport: Send + Sync {
    /// POST a JSON body and decode the JSON response
    fn post_json(&self, url: &str, authorization: &str, body: &Value) -> Result<Value>;

    /// GET a URL and decode the JSON response
    fn get_json(&self, url: &str, authorization: &str) -> Result<Value>;
}

/// `ureq`-backed transport with a fixed global timeout per call
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        Self {
            agent: build_agent(timeout),
        }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }
}

impl HttpTransport for UreqTransport {
    fn post_json(&self, url: &str, authorization: &str, body: &Value) -> Result<Value> {
        let mut response = self
            .agent
            .post(url)
            .header("Authorization", authorization)
            .header("Content-Type", "application/json")
            .send_json(body)
            .map_err(map_ureq_error)?;

        response
            .body_mut()
            .read_json::<Value>()
            .map_err(map_ureq_error)
    }

    fn get_json(&self, url: &str, authorization: &str) -> Result<Value> {
        let mut response = self
            .agent
            .get(url)
            .header("Authorization", authorization)
            .call()
            .map_err(map_ureq_error)?;

        response
            .body_mut()
            .read_json::<Value>()
            .map_err(map_ureq_error)
    }
}

/// Build an agent whose every request is bounded by `timeout`
pub fn build_agent(timeout: Duration) -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build();
    config.into()
}

/// Map a `ureq` failure onto the pipeline's error taxonomy.
///
/// Status codes become `Provider`, body decoding becomes `Parse`, and
/// everything on the wire (timeouts, DNS, resets) becomes `Network`.
pub fn map_ureq_error(err: ureq::Error) -> StickerError {
    match err {
        ureq::Error::StatusCode(code) => StickerError::Provider(format!("HTTP status {}", code)),
        ureq::Error::Json(e) => StickerError::Parse(format!("invalid JSON body: {}", e)),
        ureq::Error::BodyExceedsLimit(limit) => {
            StickerError::UnexpectedOutput(format!("response body exceeds {} bytes", limit))
        }
        ureq::Error::Timeout(t) => StickerError::Network(format!("request timed out ({:?})", t)),
        ureq::Error::HostNotFound => StickerError::Network("host not found".to_string()),
        ureq::Error::ConnectionFailed => StickerError::Network("connection failed".to_string()),
        ureq::Error::Io(e) => StickerError::Network(e.to_string()),
        other => StickerError::Network(other.to_string()),
    }
}

/// `Authorization` header value for bearer-token providers
pub fn bearer(api_key: &str) -> String {
    format!("Bearer {}", api_key)
}

/// `Authorization` header value for `Token`-style providers
pub fn token(api_key: &str) -> String {
    format!("Token {}", api_key)
}
