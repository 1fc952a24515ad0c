//! Static provider/model catalog offered to users

use serde::Serialize;

/// One selectable provider and the models it offers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInfo {
    pub id: &'static str,
    pub display_name: &'static str,
    pub models: Vec<&'static str>,
}

impl ProviderInfo {
    fn new(id: &'static str, display_name: &'static str, models: &[&'static str]) -> Self {
        Self {
            id,
            display_name,
            models: models.to_vec(),
        }
    }
}

/// The catalog in display order
pub fn provider_catalog() -> Vec<ProviderInfo> {
    vec![
        ProviderInfo::new("openai", "OpenAI (ChatGPT)", &["gpt-4o-mini", "gpt-4o"]),
        ProviderInfo::new("replicate", "Replicate", &["sdxl", "flux-dev", "flux-schnell"]),
        ProviderInfo::new("gemini", "Gemini", &["gemini-1.5-pro", "gemini-1.5-flash"]),
        ProviderInfo::new("copilot", "Copilot", &["gpt-4o"]),
        ProviderInfo::new("grok", "Grok", &["grok-beta"]),
        ProviderInfo::new("kimi", "Kimi", &["kimi-k2"]),
        ProviderInfo::new("deepseek", "DeepSeek", &["deepseek-chat", "deepseek-reasoner"]),
        ProviderInfo::new("other", "Other (Custom)", &[]),
    ]
}

/// Look up a catalog entry by id
pub fn find_provider(id: &str) -> Option<ProviderInfo> {
    provider_catalog().into_iter().find(|p| p.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{create_adapter, AdapterContext};

    #[test]
    fn test_catalog_order_and_models() {
        let catalog = provider_catalog();
        let ids: Vec<_> = catalog.iter().map(|p| p.id).collect();
        assert_eq!(
            ids,
            vec!["openai", "replicate", "gemini", "copilot", "grok", "kimi", "deepseek", "other"]
        );
        assert_eq!(find_provider("replicate").unwrap().models.len(), 3);
        assert!(find_provider("other").unwrap().models.is_empty());
        assert!(find_provider("midjourney").is_none());
    }

    #[test]
    fn test_every_catalog_entry_has_an_adapter() {
        let ctx = AdapterContext::default();
        for info in provider_catalog() {
            assert!(create_adapter(info.id, &ctx).is_supported(), "{}", info.id);
        }
    }

    #[test]
    fn test_catalog_serializes_camel_case() {
        let json = serde_json::to_value(find_provider("openai").unwrap()).unwrap();
        assert_eq!(json["displayName"], "OpenAI (ChatGPT)");
        assert_eq!(json["models"][1], "gpt-4o");
    }
}
