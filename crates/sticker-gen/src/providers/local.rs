//! Local fallback generator
//!
//! Produces deterministic drafts and placeholder artifact URLs without any
//! network calls. This is the path taken whenever no provider is
//! configured, so it must never fail.

use crate::provider::*;
use sticker_core::Result;

pub const PLACEHOLDER_IMAGE_URL: &str = "https://example.com/sticker.png";
pub const PLACEHOLDER_TRANSPARENT_URL: &str = "https://example.com/sticker-transparent.png";

/// Offline, deterministic implementation of the generation capabilities
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalGenerator;

impl LocalGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Exactly `count` ideas keyed by theme, character prompt and 1-based index
    pub fn drafts(&self, theme: &str, count: usize, character: &CharacterInput) -> Vec<DraftIdea> {
        (1..=count)
            .map(|i| {
                DraftIdea::new(
                    format!("{} sticker {}", theme, i),
                    format!("{} / {} / action {}", character.prompt, theme, i),
                )
            })
            .collect()
    }

    pub fn image(&self, _prompt: &str, _character: &CharacterInput) -> String {
        PLACEHOLDER_IMAGE_URL.to_string()
    }

    pub fn transparent(&self, _image_url: &str) -> String {
        PLACEHOLDER_TRANSPARENT_URL.to_string()
    }
}

impl ProviderAdapter for LocalGenerator {
    fn id(&self) -> &str {
        "local"
    }

    fn validate(&self, _access: &ProviderAccess) -> Result<()> {
        Ok(())
    }

    fn generate_drafts(
        &self,
        _access: &ProviderAccess,
        theme: &str,
        count: usize,
        character: &CharacterInput,
    ) -> Result<Vec<DraftIdea>> {
        Ok(self.drafts(theme, count, character))
    }

    fn generate_image(
        &self,
        _access: &ProviderAccess,
        prompt: &str,
        character: &CharacterInput,
    ) -> Result<String> {
        Ok(self.image(prompt, character))
    }

    fn remove_background(&self, _access: &ProviderAccess, image_url: &str) -> Result<String> {
        Ok(self.transparent(image_url))
    }
}
