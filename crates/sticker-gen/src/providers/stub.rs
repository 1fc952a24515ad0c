//! Catalog-only providers
//!
//! Lets configuration screens offer a provider before its integration
//! exists: credentials are shape-checked like any other provider, but the
//! generation capabilities report `NotImplemented`.

use crate::provider::*;
use sticker_core::{Result, StickerError};

pub struct StubAdapter {
    id: String,
}

impl StubAdapter {
    pub fn new(id: &str) -> Self {
        Self { id: id.to_string() }
    }

    fn not_implemented(&self, capability: &str) -> StickerError {
        StickerError::NotImplemented(format!("{} for provider '{}'", capability, self.id))
    }
}

impl ProviderAdapter for StubAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self, access: &ProviderAccess) -> Result<()> {
        require_key_and_model(access)
    }

    fn generate_drafts(
        &self,
        _access: &ProviderAccess,
        _theme: &str,
        _count: usize,
        _character: &CharacterInput,
    ) -> Result<Vec<DraftIdea>> {
        Err(self.not_implemented("draft generation"))
    }

    fn generate_image(
        &self,
        _access: &ProviderAccess,
        _prompt: &str,
        _character: &CharacterInput,
    ) -> Result<String> {
        Err(self.not_implemented("image generation"))
    }

    fn remove_background(&self, _access: &ProviderAccess, image_url: &str) -> Result<String> {
        Ok(image_url.to_string())
    }
}
