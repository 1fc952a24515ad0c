//! Sticker Gen - provider-agnostic generation pipeline
//!
//! Provides a pluggable adapter framework for producing sticker drafts,
//! images and background removals, either through a user-supplied
//! ("bring your own key") provider or the deterministic local fallback.
//! Every outbound call goes through a fixed-delay retry policy.

pub mod catalog;
pub mod config;
pub mod provider;
pub mod providers;
pub mod retry;
pub mod router;
pub mod transport;

pub use catalog::{provider_catalog, ProviderInfo};
pub use config::StickerConfig;
pub use provider::{CharacterInput, CharacterSource, DraftIdea, ProviderAccess, ProviderAdapter};
pub use providers::{AdapterContext, AdapterSlot};
pub use retry::RetryPolicy;
pub use router::{PipelineRouter, RouteConfig};
pub use transport::{HttpTransport, UreqTransport};
