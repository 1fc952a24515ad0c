//! Artifact fetching
//!
//! Generated artifacts are either hosted URLs or inline `data:` URLs.
//! `ArtifactFetcher` is the one place that turns either into bytes.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use std::time::Duration;
use sticker_core::{Result, StickerError};
use sticker_gen::config::DEFAULT_MAX_FETCH_BYTES;
use sticker_gen::transport::{build_agent, map_ureq_error};

const FETCH_TIMEOUT_SECS: u64 = 20;

/// Resolves an artifact URL to its bytes
pub trait ArtifactFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Decodes `data:` URLs locally and GETs everything else over HTTP
pub struct HttpFetcher {
    agent: ureq::Agent,
    max_bytes: u64,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, max_bytes: u64) -> Self {
        Self {
            agent: build_agent(timeout),
            max_bytes,
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(FETCH_TIMEOUT_SECS), DEFAULT_MAX_FETCH_BYTES)
    }
}

impl ArtifactFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        if url.trim().is_empty() {
            return Err(StickerError::UnexpectedOutput("empty artifact url".to_string()));
        }
        if url.starts_with("data:") {
            let bytes = decode_data_url(url)?;
            if bytes.len() as u64 > self.max_bytes {
                return Err(StickerError::UnexpectedOutput(format!(
                    "inline artifact exceeds {} bytes",
                    self.max_bytes
                )));
            }
            return Ok(bytes);
        }

        let mut response = self.agent.get(url).call().map_err(map_ureq_error)?;
        response
            .body_mut()
            .with_config()
            .limit(self.max_bytes)
            .read_to_vec()
            .map_err(map_ureq_error)
    }
}

/// Decode a base64 `data:` URL into raw bytes
pub fn decode_data_url(url: &str) -> Result<Vec<u8>> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| StickerError::Parse("not a data url".to_string()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| StickerError::Parse("data url has no payload".to_string()))?;
    if !meta.split(';').any(|part| part.eq_ignore_ascii_case("base64")) {
        return Err(StickerError::Parse(
            "only base64 data urls are supported".to_string(),
        ));
    }
    BASE64
        .decode(payload.trim())
        .map_err(|e| StickerError::Parse(format!("invalid base64 payload: {}", e)))
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory fetcher for workflow and export tests

    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves registered URLs, decodes data URLs, fails everything else
    #[derive(Default)]
    pub struct MemoryFetcher {
        artifacts: Mutex<HashMap<String, Vec<u8>>>,
    }

    impl MemoryFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&self, url: &str, bytes: Vec<u8>) {
            self.artifacts
                .lock()
                .unwrap()
                .insert(url.to_string(), bytes);
        }
    }

    impl ArtifactFetcher for MemoryFetcher {
        fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            if url.starts_with("data:") {
                return decode_data_url(url);
            }
            self.artifacts
                .lock()
                .unwrap()
                .get(url)
                .cloned()
                .ok_or_else(|| StickerError::Provider(format!("HTTP status 404 for {}", url)))
        }
    }
}
