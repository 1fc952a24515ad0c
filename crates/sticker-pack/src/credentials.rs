//! Per-project provider credentials, held in process memory only

use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

/// API key (and optional endpoint override) supplied by the user
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub provider: String,
    pub api_key: String,
    pub api_base: Option<String>,
}

impl Credentials {
    pub fn new(provider: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            api_key: api_key.into(),
            api_base: None,
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = Some(api_base.into());
        self
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Credentials keyed by project id; never written anywhere
#[derive(Default)]
pub struct CredentialStore {
    entries: RwLock<HashMap<String, Credentials>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store credentials for a project, replacing any previous entry
    pub fn put(&self, project_id: &str, credentials: Credentials) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(project_id.to_string(), credentials);
    }

    pub fn get(&self, project_id: &str) -> Option<Credentials> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(project_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_until_supplied() {
        let store = CredentialStore::new();
        assert!(store.get("proj_1").is_none());
        store.put("proj_1", Credentials::new("openai", "sk-1"));
        assert_eq!(store.get("proj_1").unwrap().api_key, "sk-1");
        assert!(store.get("proj_2").is_none());
    }

    #[test]
    fn test_put_replaces() {
        let store = CredentialStore::new();
        store.put("proj_1", Credentials::new("openai", "sk-1"));
        store.put(
            "proj_1",
            Credentials::new("replicate", "r8-2").with_api_base("https://proxy.test/v1"),
        );
        let creds = store.get("proj_1").unwrap();
        assert_eq!(creds.provider, "replicate");
        assert_eq!(creds.api_base.as_deref(), Some("https://proxy.test/v1"));
    }

    #[test]
    fn test_debug_redacts_key() {
        let printed = format!("{:?}", Credentials::new("openai", "sk-very-secret"));
        assert!(printed.contains("openai"));
        assert!(!printed.contains("sk-very-secret"));
    }
}
