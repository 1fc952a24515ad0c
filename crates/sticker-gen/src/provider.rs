//! Provider adapter trait and the value types that cross it

use serde::{Deserialize, Serialize};
use std::fmt;
use sticker_core::Result;

/// Where a character reference came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CharacterSource {
    /// Described by a prompt and rendered by the provider
    #[default]
    Ai,
    /// Reference image supplied by the user
    Upload,
}

impl fmt::Display for CharacterSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CharacterSource::Ai => write!(f, "AI"),
            CharacterSource::Upload => write!(f, "UPLOAD"),
        }
    }
}

/// Character description handed to every generation call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterInput {
    pub prompt: String,
    pub reference_image_url: String,
    pub source_type: CharacterSource,
}

impl Default for CharacterInput {
    fn default() -> Self {
        Self {
            prompt: "main character".to_string(),
            reference_image_url: String::new(),
            source_type: CharacterSource::Ai,
        }
    }
}

/// One caption + image prompt pair returned by draft generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftIdea {
    #[serde(default)]
    pub caption: String,
    #[serde(default, rename = "imagePrompt")]
    pub image_prompt: String,
}

impl DraftIdea {
    pub fn new(caption: impl Into<String>, image_prompt: impl Into<String>) -> Self {
        Self {
            caption: caption.into(),
            image_prompt: image_prompt.into(),
        }
    }
}

/// Credentials and model for a single adapter call
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ProviderAccess {
    pub api_key: String,
    /// Empty means the adapter's default endpoint
    pub api_base: String,
    pub model: String,
}

impl fmt::Debug for ProviderAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderAccess")
            .field("api_key", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish()
    }
}

/// Trait implemented by each provider family (OpenAI-compatible,
/// Replicate-style predictions, catalog stubs, local fallback)
pub trait ProviderAdapter: Send + Sync {
    /// Provider identifier (e.g. "openai", "replicate", "local")
    fn id(&self) -> &str;

    /// Check the shape of the access parameters without touching the network
    fn validate(&self, access: &ProviderAccess) -> Result<()>;

    /// Produce caption/prompt ideas for a themed pack
    fn generate_drafts(
        &self,
        access: &ProviderAccess,
        theme: &str,
        count: usize,
        character: &CharacterInput,
    ) -> Result<Vec<DraftIdea>>;

    /// Render one image and return its artifact URL
    fn generate_image(
        &self,
        access: &ProviderAccess,
        prompt: &str,
        character: &CharacterInput,
    ) -> Result<String>;

    /// Strip the background of an image and return the new artifact URL.
    ///
    /// Providers without the capability return `image_url` unchanged.
    fn remove_background(&self, access: &ProviderAccess, image_url: &str) -> Result<String>;
}

/// Shared key/model shape check used by the network-backed adapters
pub(crate) fn require_key_and_model(access: &ProviderAccess) -> Result<()> {
    if access.api_key.trim().is_empty() {
        return Err(sticker_core::StickerError::Config("missing api key".to_string()));
    }
    if access.model.trim().is_empty() {
        return Err(sticker_core::StickerError::Config("missing model".to_string()));
    }
    Ok(())
}

/// Build the user message sent to text-capable providers
pub(crate) fn draft_request_prompt(theme: &str, count: usize, character: &CharacterInput) -> String {
    format!(
        "Theme: {}. Character: {}. Count: {}",
        theme, character.prompt, count
    )
}
