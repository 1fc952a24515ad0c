//! BYOK pipeline router
//!
//! Picks the adapter for a user's provider/model/key selection, or the
//! local fallback when nothing is configured, and exposes the three
//! generation capabilities through one surface. Routers are stateless and
//! rebuilt for every stage call.

use crate::provider::*;
use crate::providers::local::LocalGenerator;
use crate::providers::{create_adapter, AdapterContext, AdapterSlot};
use std::fmt;
use sticker_core::{Result, StickerError};

/// A user's provider selection plus the credentials to use it
#[derive(Clone, Default)]
pub struct RouteConfig {
    pub provider: String,
    pub model: String,
    pub api_key: String,
    pub api_base: String,
}

impl fmt::Debug for RouteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("api_base", &self.api_base)
            .finish()
    }
}

enum Route {
    Fallback(LocalGenerator),
    Adapter {
        adapter: Box<dyn ProviderAdapter>,
        access: ProviderAccess,
    },
}

/// Routes generation calls to one provider adapter or the local fallback
pub struct PipelineRouter {
    route: Route,
}

impl PipelineRouter {
    /// Build and validate a router for a configured provider.
    ///
    /// Checks run in order: provider/model present, key present, provider
    /// known to the registry, then the adapter's own validation.
    pub fn new(config: RouteConfig, ctx: &AdapterContext) -> Result<Self> {
        if config.provider.trim().is_empty() || config.model.trim().is_empty() {
            return Err(StickerError::Config("provider/model required".to_string()));
        }
        if config.api_key.trim().is_empty() {
            return Err(StickerError::Config("api key required".to_string()));
        }

        let adapter = match create_adapter(&config.provider, ctx) {
            AdapterSlot::Ready(adapter) => adapter,
            AdapterSlot::Unsupported(id) => {
                tracing::debug!(provider = %id, "provider not in registry");
                return Err(StickerError::Config("unsupported provider".to_string()));
            }
        };

        let api_base = if config.api_base.trim().is_empty() {
            ctx.api_base(&config.provider).unwrap_or_default().to_string()
        } else {
            config.api_base
        };
        let access = ProviderAccess {
            api_key: config.api_key,
            api_base,
            model: config.model,
        };
        adapter.validate(&access)?;

        Ok(Self {
            route: Route::Adapter { adapter, access },
        })
    }

    /// A router that never leaves the process
    pub fn fallback() -> Self {
        Self {
            route: Route::Fallback(LocalGenerator::new()),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.route, Route::Fallback(_))
    }

    /// Id of the provider handling calls ("local" for the fallback)
    pub fn provider(&self) -> &str {
        match &self.route {
            Route::Fallback(local) => local.id(),
            Route::Adapter { adapter, .. } => adapter.id(),
        }
    }

    /// Re-run the adapter's credential shape check
    pub fn validate(&self) -> Result<()> {
        match &self.route {
            Route::Fallback(_) => Ok(()),
            Route::Adapter { adapter, access } => adapter.validate(access),
        }
    }

    /// At most `count` ideas; providers may return fewer
    pub fn generate_drafts(
        &self,
        theme: &str,
        count: usize,
        character: &CharacterInput,
    ) -> Result<Vec<DraftIdea>> {
        let mut ideas = match &self.route {
            Route::Fallback(local) => local.drafts(theme, count, character),
            Route::Adapter { adapter, access } => {
                adapter.generate_drafts(access, theme, count, character)?
            }
        };
        ideas.truncate(count);
        Ok(ideas)
    }

    pub fn generate_image(&self, prompt: &str, character: &CharacterInput) -> Result<String> {
        match &self.route {
            Route::Fallback(local) => Ok(local.image(prompt, character)),
            Route::Adapter { adapter, access } => adapter.generate_image(access, prompt, character),
        }
    }

    pub fn remove_background(&self, image_url: &str) -> Result<String> {
        match &self.route {
            Route::Fallback(local) => Ok(local.transparent(image_url)),
            Route::Adapter { adapter, access } => adapter.remove_background(access, image_url),
        }
    }
}

impl fmt::Debug for PipelineRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineRouter")
            .field("provider", &self.provider())
            .finish()
    }
}
