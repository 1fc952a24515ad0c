//! OpenAI-compatible provider (chat completions + image generations)
//!
//! Both calls are synchronous: one POST with bearer auth, result in the
//! first response body. Any endpoint that speaks the same wire format can
//! be targeted through `api_base`.

use super::AdapterContext;
use crate::provider::*;
use crate::transport::bearer;
use serde_json::{json, Value};
use sticker_core::{Result, StickerError};

const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com";
const IMAGE_SIZE: &str = "1024x1024";
const DRAFT_SYSTEM_PROMPT: &str =
    "You generate sticker drafts. Return JSON array with caption and imagePrompt.";

/// Chat-completion family adapter
pub struct OpenAiAdapter {
    ctx: AdapterContext,
}

impl OpenAiAdapter {
    pub fn new(ctx: AdapterContext) -> Self {
        Self { ctx }
    }

    fn post(&self, access: &ProviderAccess, path: &str, payload: &Value) -> Result<Value> {
        let url = format!("{}{}", base_url(&access.api_base), path);
        let auth = bearer(&access.api_key);
        tracing::debug!(url = %url, model = %access.model, "openai request");
        self.ctx.retry.run_while(
            || self.ctx.transport.post_json(&url, &auth, payload),
            StickerError::is_transient,
        )
    }
}

fn base_url(api_base: &str) -> &str {
    let trimmed = api_base.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        DEFAULT_OPENAI_BASE
    } else {
        trimmed
    }
}

impl ProviderAdapter for OpenAiAdapter {
    fn id(&self) -> &str {
        super::OPENAI
    }

    fn validate(&self, access: &ProviderAccess) -> Result<()> {
        require_key_and_model(access)
    }

    fn generate_drafts(
        &self,
        access: &ProviderAccess,
        theme: &str,
        count: usize,
        character: &CharacterInput,
    ) -> Result<Vec<DraftIdea>> {
        let payload = json!({
            "model": access.model,
            "messages": [
                { "role": "system", "content": DRAFT_SYSTEM_PROMPT },
                { "role": "user", "content": draft_request_prompt(theme, count, character) }
            ]
        });
        let response = self.post(access, "/v1/chat/completions", &payload)?;
        parse_chat_drafts(&response)
    }

    fn generate_image(
        &self,
        access: &ProviderAccess,
        prompt: &str,
        _character: &CharacterInput,
    ) -> Result<String> {
        let payload = json!({
            "model": access.model,
            "prompt": prompt,
            "size": IMAGE_SIZE
        });
        let response = self.post(access, "/v1/images/generations", &payload)?;
        parse_image_response(&response)
    }

    fn remove_background(&self, _access: &ProviderAccess, image_url: &str) -> Result<String> {
        // No background removal endpoint; pass the artifact through.
        Ok(image_url.to_string())
    }
}

/// Extract the draft array embedded in a chat completion
pub fn parse_chat_drafts(response: &Value) -> Result<Vec<DraftIdea>> {
    let content = response
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|arr| arr.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .ok_or_else(|| {
            StickerError::UnexpectedOutput("chat completion has no choices".to_string())
        })?;

    serde_json::from_str::<Vec<DraftIdea>>(strip_code_fence(content)).map_err(|e| {
        StickerError::Parse(format!("completion is not a JSON draft array: {}", e))
    })
}

/// Extract the first image from an image-generation response.
///
/// Hosted URLs are returned as-is; inline `b64_json` payloads become a PNG
/// data URL.
pub fn parse_image_response(response: &Value) -> Result<String> {
    let first = response
        .get("data")
        .and_then(|d| d.as_array())
        .and_then(|arr| arr.first())
        .ok_or_else(|| StickerError::UnexpectedOutput("no image in response".to_string()))?;

    if let Some(url) = first.get("url").and_then(|u| u.as_str()) {
        return Ok(url.to_string());
    }
    if let Some(b64) = first.get("b64_json").and_then(|b| b.as_str()) {
        return Ok(format!("data:image/png;base64,{}", b64));
    }
    Err(StickerError::UnexpectedOutput(
        "image entry has neither url nor b64_json".to_string(),
    ))
}

/// Models often wrap JSON in a markdown fence
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end().trim_end_matches("```").trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RetryPolicy;
    use crate::transport::testing::ScriptedTransport;
    use std::sync::Arc;
    use std::time::Duration;

    fn adapter(transport: Arc<ScriptedTransport>) -> OpenAiAdapter {
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        OpenAiAdapter::new(AdapterContext::new(transport).with_policies(policy, policy))
    }

    fn access() -> ProviderAccess {
        ProviderAccess {
            api_key: "sk-test".to_string(),
            api_base: String::new(),
            model: "gpt-4o-mini".to_string(),
        }
    }

    fn completion(content: &str) -> Value {
        json!({ "choices": [ { "message": { "role": "assistant", "content": content } } ] })
    }

    #[test]
    fn test_parse_chat_drafts() {
        let response = completion(
            r#"[{"caption":"Morning!","imagePrompt":"cat with coffee"},{"caption":"Bye","imagePrompt":"cat waving"}]"#,
        );
        let ideas = parse_chat_drafts(&response).unwrap();
        assert_eq!(ideas.len(), 2);
        assert_eq!(ideas[1], DraftIdea::new("Bye", "cat waving"));
    }

    #[test]
    fn test_parse_chat_drafts_fenced() {
        let response = completion("```json\n[{\"caption\":\"Hi\",\"imagePrompt\":\"wave\"}]\n```");
        let ideas = parse_chat_drafts(&response).unwrap();
        assert_eq!(ideas, vec![DraftIdea::new("Hi", "wave")]);
    }

    #[test]
    fn test_parse_chat_drafts_malformed_is_parse_error() {
        let response = completion("Sure! Here are some ideas: morning, evening");
        assert!(matches!(
            parse_chat_drafts(&response),
            Err(StickerError::Parse(_))
        ));
    }

    #[test]
    fn test_parse_chat_drafts_no_choices() {
        assert!(matches!(
            parse_chat_drafts(&json!({ "choices": [] })),
            Err(StickerError::UnexpectedOutput(_))
        ));
    }

    #[test]
    fn test_parse_image_response() {
        let url = parse_image_response(&json!({
            "created": 1700000000,
            "data": [ { "url": "https://cdn.test/img.png" } ]
        }))
        .unwrap();
        assert_eq!(url, "https://cdn.test/img.png");

        let inline = parse_image_response(&json!({ "data": [ { "b64_json": "iVBORw0KGgo=" } ] })).unwrap();
        assert_eq!(inline, "data:image/png;base64,iVBORw0KGgo=");

        assert!(parse_image_response(&json!({ "data": [] })).is_err());
    }

    #[test]
    fn test_generate_drafts_request_shape() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(completion(
            r#"[{"caption":"A","imagePrompt":"a"}]"#,
        ))]));
        let openai = adapter(transport.clone());
        let character = CharacterInput {
            prompt: "shiba".to_string(),
            ..Default::default()
        };
        let ideas = openai
            .generate_drafts(&access(), "Weekend", 1, &character)
            .unwrap();
        assert_eq!(ideas.len(), 1);

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, "https://api.openai.com/v1/chat/completions");
        assert_eq!(requests[0].authorization, "Bearer sk-test");
        let body = requests[0].body.as_ref().unwrap();
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(
            body["messages"][1]["content"],
            "Theme: Weekend. Character: shiba. Count: 1"
        );
    }

    #[test]
    fn test_transient_failures_are_retried() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Err(StickerError::Network("reset".to_string())),
            Err(StickerError::Provider("HTTP status 502".to_string())),
            Ok(json!({ "data": [ { "url": "https://cdn.test/ok.png" } ] })),
        ]));
        let openai = adapter(transport.clone());
        let mut custom = access();
        custom.api_base = "https://proxy.test/".to_string();
        let url = openai
            .generate_image(&custom, "cat", &CharacterInput::default())
            .unwrap();
        assert_eq!(url, "https://cdn.test/ok.png");
        let requests = transport.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].url, "https://proxy.test/v1/images/generations");
    }

    #[test]
    fn test_exhausted_retries_surface_last_error() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Err(StickerError::Network("reset".to_string())),
            Err(StickerError::Network("reset".to_string())),
            Err(StickerError::Provider("HTTP status 500".to_string())),
        ]));
        let err = adapter(transport.clone())
            .generate_image(&access(), "cat", &CharacterInput::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "Provider error: HTTP status 500");
        assert_eq!(transport.requests().len(), 3);
    }

    #[test]
    fn test_parse_failure_not_retried() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Err(StickerError::Parse("invalid JSON body".to_string())),
            Ok(completion("[]")),
        ]));
        let result = adapter(transport.clone()).generate_drafts(
            &access(),
            "Office",
            2,
            &CharacterInput::default(),
        );
        assert!(matches!(result, Err(StickerError::Parse(_))));
        assert_eq!(transport.requests().len(), 1);
    }
}
