//! Adapter registry
//!
//! Maps provider identifiers to concrete adapter implementations. The
//! registry is independent of the display catalog: it may know providers
//! the catalog does not list and vice versa.

pub mod local;
pub mod openai;
pub mod replicate;
pub mod stub;

use crate::provider::ProviderAdapter;
use crate::retry::RetryPolicy;
use crate::transport::{HttpTransport, UreqTransport};
use std::collections::HashMap;
use std::sync::Arc;

/// Chat-completion family
pub const OPENAI: &str = "openai";
/// Prediction (submit/poll) family
pub const REPLICATE: &str = "replicate";
/// Providers advertised before a real integration exists
pub const STUB_PROVIDERS: [&str; 6] = ["gemini", "copilot", "grok", "kimi", "deepseek", "other"];

/// Shared plumbing handed to every network adapter
#[derive(Clone)]
pub struct AdapterContext {
    pub transport: Arc<dyn HttpTransport>,
    /// Policy for submit/request calls
    pub retry: RetryPolicy,
    /// Policy bounding prediction polling
    pub poll: RetryPolicy,
    /// Endpoint overrides keyed by provider id
    pub api_bases: HashMap<String, String>,
}

impl AdapterContext {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            retry: RetryPolicy::default(),
            poll: RetryPolicy::default(),
            api_bases: HashMap::new(),
        }
    }

    pub fn with_policies(mut self, retry: RetryPolicy, poll: RetryPolicy) -> Self {
        self.retry = retry;
        self.poll = poll;
        self
    }

    pub fn with_api_base(mut self, provider: &str, api_base: &str) -> Self {
        self.api_bases
            .insert(provider.to_string(), api_base.to_string());
        self
    }

    /// Configured endpoint override for `provider`, if any
    pub fn api_base(&self, provider: &str) -> Option<&str> {
        self.api_bases
            .get(provider)
            .map(|s| s.as_str())
            .filter(|s| !s.is_empty())
    }
}

impl Default for AdapterContext {
    fn default() -> Self {
        Self::new(Arc::new(UreqTransport::default()))
    }
}

/// Outcome of resolving a provider identifier
pub enum AdapterSlot {
    Ready(Box<dyn ProviderAdapter>),
    /// The identifier is not in the registry
    Unsupported(String),
}

impl AdapterSlot {
    pub fn is_supported(&self) -> bool {
        matches!(self, AdapterSlot::Ready(_))
    }
}

/// Resolve a provider identifier to an adapter
pub fn create_adapter(id: &str, ctx: &AdapterContext) -> AdapterSlot {
    match id {
        OPENAI => AdapterSlot::Ready(Box::new(openai::OpenAiAdapter::new(ctx.clone()))),
        REPLICATE => AdapterSlot::Ready(Box::new(replicate::ReplicateAdapter::new(ctx.clone()))),
        _ if STUB_PROVIDERS.contains(&id) => {
            AdapterSlot::Ready(Box::new(stub::StubAdapter::new(id)))
        }
        _ => AdapterSlot::Unsupported(id.to_string()),
    }
}

/// List every identifier the registry resolves
pub fn available_adapters() -> Vec<&'static str> {
    let mut ids = vec![OPENAI, REPLICATE];
    ids.extend(STUB_PROVIDERS);
    ids
}
