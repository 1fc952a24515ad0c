//! Layered configuration system
//!
//! Config is loaded with three layers of precedence (highest wins):
//! 1. Environment variables: `STICKER_{PROVIDER}_API_BASE`, `STICKER_EXPORT_DIR`
//! 2. Project-local: `.sticker/config.toml`
//! 3. Global: `~/.sticker/config.toml`
//!
//! API keys are deliberately absent: they are supplied per project at
//! runtime and only ever held in memory.

use crate::providers::{available_adapters, AdapterContext};
use crate::retry::{RetryPolicy, DEFAULT_ATTEMPTS, DEFAULT_DELAY_MS};
use crate::transport::{UreqTransport, DEFAULT_TIMEOUT_SECS};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use sticker_core::{Result, StickerError};

pub const DEFAULT_CANVAS_WIDTH: u32 = 370;
pub const DEFAULT_CANVAS_HEIGHT: u32 = 320;
pub const DEFAULT_MAX_FETCH_BYTES: u64 = 10 * 1024 * 1024;
const EXPORT_DIR_NAME: &str = "sticker-exports";

/// Provider-specific configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_base: Option<String>,
}

/// `[pipeline]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub retry_attempts: Option<u32>,
    #[serde(default)]
    pub retry_delay_ms: Option<u64>,
    #[serde(default)]
    pub poll_attempts: Option<u32>,
    #[serde(default)]
    pub poll_interval_ms: Option<u64>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

/// `[canvas]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CanvasConfig {
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

/// `[export]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub max_fetch_bytes: Option<u64>,
}

/// Top-level config file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StickerConfigFile {
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub canvas: CanvasConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

/// Resolved configuration with environment variable overrides applied
#[derive(Debug, Clone, Default)]
pub struct StickerConfig {
    pub providers: HashMap<String, ProviderConfig>,
    pub pipeline: PipelineConfig,
    pub canvas: CanvasConfig,
    pub export: ExportConfig,
}

impl StickerConfig {
    /// Load config with layered precedence: global < project < env vars
    pub fn load() -> Result<Self> {
        let mut config = StickerConfigFile::default();

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                let global = Self::load_file(&global_path)?;
                Self::merge_into(&mut config, global);
            }
        }

        let local_path = PathBuf::from(".sticker/config.toml");
        if local_path.exists() {
            let local = Self::load_file(&local_path)?;
            Self::merge_into(&mut config, local);
        }

        Self::apply_env_overrides(&mut config, |key| std::env::var(key).ok());
        Self::validate(&config)?;
        Ok(config.into())
    }

    /// Load config from a specific file path only
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let mut config = Self::load_file(path)?;
        Self::apply_env_overrides(&mut config, |key| std::env::var(key).ok());
        Self::validate(&config)?;
        Ok(config.into())
    }

    /// Endpoint override for a provider
    pub fn api_base(&self, provider: &str) -> Option<&str> {
        self.providers
            .get(provider)
            .and_then(|p| p.api_base.as_deref())
    }

    /// Policy applied to every provider request
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.pipeline.retry_attempts.unwrap_or(DEFAULT_ATTEMPTS),
            Duration::from_millis(self.pipeline.retry_delay_ms.unwrap_or(DEFAULT_DELAY_MS)),
        )
    }

    /// Policy bounding prediction polling
    pub fn poll_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.pipeline.poll_attempts.unwrap_or(DEFAULT_ATTEMPTS),
            Duration::from_millis(self.pipeline.poll_interval_ms.unwrap_or(DEFAULT_DELAY_MS)),
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.pipeline
                .request_timeout_secs
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        )
    }

    /// Target canvas as `(width, height)`
    pub fn canvas_size(&self) -> (u32, u32) {
        (
            self.canvas.width.unwrap_or(DEFAULT_CANVAS_WIDTH),
            self.canvas.height.unwrap_or(DEFAULT_CANVAS_HEIGHT),
        )
    }

    /// Directory archives are written to
    pub fn export_dir(&self) -> PathBuf {
        self.export
            .output_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(EXPORT_DIR_NAME))
    }

    pub fn max_fetch_bytes(&self) -> u64 {
        self.export
            .max_fetch_bytes
            .unwrap_or(DEFAULT_MAX_FETCH_BYTES)
    }

    /// Build the adapter plumbing (transport, policies, endpoint overrides)
    pub fn adapter_context(&self) -> AdapterContext {
        let transport = Arc::new(UreqTransport::new(self.request_timeout()));
        let mut ctx = AdapterContext::new(transport)
            .with_policies(self.retry_policy(), self.poll_policy());
        for (id, provider) in &self.providers {
            if let Some(base) = provider.api_base.as_deref() {
                ctx = ctx.with_api_base(id, base);
            }
        }
        ctx
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".sticker").join("config.toml"))
    }

    fn load_file(path: &Path) -> Result<StickerConfigFile> {
        let content = std::fs::read_to_string(path)?;
        let config: StickerConfigFile = toml::from_str(&content).map_err(|e| {
            StickerError::TomlParseError(format!(
                "failed to parse config {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(config)
    }

    fn merge_into(base: &mut StickerConfigFile, overlay: StickerConfigFile) {
        for (name, provider) in overlay.providers {
            let entry = base.providers.entry(name).or_default();
            if provider.api_base.is_some() {
                entry.api_base = provider.api_base;
            }
        }

        let pipeline = overlay.pipeline;
        if pipeline.retry_attempts.is_some() {
            base.pipeline.retry_attempts = pipeline.retry_attempts;
        }
        if pipeline.retry_delay_ms.is_some() {
            base.pipeline.retry_delay_ms = pipeline.retry_delay_ms;
        }
        if pipeline.poll_attempts.is_some() {
            base.pipeline.poll_attempts = pipeline.poll_attempts;
        }
        if pipeline.poll_interval_ms.is_some() {
            base.pipeline.poll_interval_ms = pipeline.poll_interval_ms;
        }
        if pipeline.request_timeout_secs.is_some() {
            base.pipeline.request_timeout_secs = pipeline.request_timeout_secs;
        }

        if overlay.canvas.width.is_some() {
            base.canvas.width = overlay.canvas.width;
        }
        if overlay.canvas.height.is_some() {
            base.canvas.height = overlay.canvas.height;
        }

        if overlay.export.output_dir.is_some() {
            base.export.output_dir = overlay.export.output_dir;
        }
        if overlay.export.max_fetch_bytes.is_some() {
            base.export.max_fetch_bytes = overlay.export.max_fetch_bytes;
        }
    }

    fn validate(config: &StickerConfigFile) -> Result<()> {
        if config.canvas.width == Some(0) || config.canvas.height == Some(0) {
            return Err(StickerError::Config(
                "canvas width and height must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn apply_env_overrides<F>(config: &mut StickerConfigFile, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for name in available_adapters() {
            let env_key = format!("STICKER_{}_API_BASE", name.to_uppercase());
            if let Some(base) = lookup(&env_key) {
                let entry = config.providers.entry(name.to_string()).or_default();
                entry.api_base = Some(base);
            }
        }
        if let Some(dir) = lookup("STICKER_EXPORT_DIR") {
            config.export.output_dir = Some(PathBuf::from(dir));
        }
    }
}

impl From<StickerConfigFile> for StickerConfig {
    fn from(file: StickerConfigFile) -> Self {
        Self {
            providers: file.providers,
            pipeline: file.pipeline,
            canvas: file.canvas,
            export: file.export,
        }
    }
}
