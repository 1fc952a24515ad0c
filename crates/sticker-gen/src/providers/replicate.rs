//! Replicate-style prediction provider
//!
//! Generation is asynchronous: a prediction is submitted, then its poll
//! URL is fetched until the prediction reaches a terminal state or the
//! poll budget runs out. Each poll is a single GET (itself retried on
//! transport failures); a still-running prediction counts as a failed
//! poll attempt.

use super::AdapterContext;
use crate::provider::*;
use crate::transport::token;
use serde_json::{json, Value};
use sticker_core::{Result, StickerError};

const DEFAULT_REPLICATE_BASE: &str = "https://api.replicate.com/v1";

/// Lifecycle of a single prediction
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionState {
    /// Accepted by the provider, not yet polled
    Submitted { poll_url: String },
    /// Still running; `status` is whatever the provider reported
    Polling { poll_url: String, status: String },
    Succeeded(Value),
    Failed(String),
    /// Poll budget exhausted while the prediction was still running
    TimedOut { attempts: u32 },
}

impl PredictionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PredictionState::Succeeded(_)
                | PredictionState::Failed(_)
                | PredictionState::TimedOut { .. }
        )
    }
}

/// Classify one poll response.
///
/// `succeeded` yields the output, `failed`/`canceled` yield the provider's
/// error message. A response with output but no status is treated as
/// finished; anything else is still running.
pub fn classify_prediction(poll_url: &str, response: &Value) -> PredictionState {
    let status = response
        .get("status")
        .and_then(|s| s.as_str())
        .unwrap_or("");
    let output = response.get("output").cloned().unwrap_or(Value::Null);

    match status {
        "succeeded" => PredictionState::Succeeded(output),
        "failed" | "canceled" => {
            let reason = response
                .get("error")
                .and_then(|e| e.as_str())
                .filter(|e| !e.is_empty())
                .map(|e| e.to_string())
                .unwrap_or_else(|| format!("prediction {}", status));
            PredictionState::Failed(reason)
        }
        "" if !output.is_null() => PredictionState::Succeeded(output),
        other => PredictionState::Polling {
            poll_url: poll_url.to_string(),
            status: if other.is_empty() { "unknown" } else { other }.to_string(),
        },
    }
}

/// Prediction family adapter
pub struct ReplicateAdapter {
    ctx: AdapterContext,
}

impl ReplicateAdapter {
    pub fn new(ctx: AdapterContext) -> Self {
        Self { ctx }
    }

    /// Create a prediction and return it in the `Submitted` state
    pub fn submit(&self, access: &ProviderAccess, prompt: &str) -> Result<PredictionState> {
        let url = format!("{}/predictions", base_url(&access.api_base));
        let auth = token(&access.api_key);
        let payload = json!({
            "version": access.model,
            "input": { "prompt": prompt }
        });

        tracing::debug!(url = %url, model = %access.model, "submitting prediction");
        let response = self.ctx.retry.run_while(
            || self.ctx.transport.post_json(&url, &auth, &payload),
            StickerError::is_transient,
        )?;

        let poll_url = response
            .get("urls")
            .and_then(|u| u.get("get"))
            .and_then(|g| g.as_str())
            .filter(|g| !g.is_empty())
            .ok_or_else(|| {
                StickerError::UnexpectedOutput("prediction response has no poll URL".to_string())
            })?;

        Ok(PredictionState::Submitted {
            poll_url: poll_url.to_string(),
        })
    }

    /// Drive a submitted prediction to a terminal state
    pub fn await_prediction(
        &self,
        access: &ProviderAccess,
        state: PredictionState,
    ) -> Result<PredictionState> {
        let poll_url = match state {
            PredictionState::Submitted { poll_url } | PredictionState::Polling { poll_url, .. } => {
                poll_url
            }
            terminal => return Ok(terminal),
        };
        let auth = token(&access.api_key);

        let outcome = self.ctx.poll.run_while(
            || {
                let response = self.ctx.retry.run_while(
                    || self.ctx.transport.get_json(&poll_url, &auth),
                    StickerError::is_transient,
                )?;
                match classify_prediction(&poll_url, &response) {
                    PredictionState::Polling { status, .. } => {
                        Err(StickerError::PredictionPending(status))
                    }
                    terminal => Ok(terminal),
                }
            },
            |err| matches!(err, StickerError::PredictionPending(_)),
        );

        match outcome {
            Ok(state) => Ok(state),
            Err(StickerError::PredictionPending(status)) => {
                let attempts = self.ctx.poll.attempts.max(1);
                tracing::warn!(poll_url = %poll_url, status = %status, attempts, "prediction still running after poll budget");
                Ok(PredictionState::TimedOut { attempts })
            }
            Err(e) => Err(e),
        }
    }

    /// Submit, poll and return the raw prediction output
    fn predict(&self, access: &ProviderAccess, prompt: &str) -> Result<Value> {
        let submitted = self.submit(access, prompt)?;
        match self.await_prediction(access, submitted)? {
            PredictionState::Succeeded(output) => Ok(output),
            PredictionState::Failed(reason) => Err(StickerError::Provider(reason)),
            PredictionState::TimedOut { attempts } => {
                Err(StickerError::PredictionTimedOut(attempts))
            }
            other => Err(StickerError::InvalidState(format!(
                "prediction left in non-terminal state {:?}",
                other
            ))),
        }
    }
}

fn base_url(api_base: &str) -> &str {
    let trimmed = api_base.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        DEFAULT_REPLICATE_BASE
    } else {
        trimmed
    }
}

impl ProviderAdapter for ReplicateAdapter {
    fn id(&self) -> &str {
        super::REPLICATE
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
        let output = self.predict(access, &draft_request_prompt(theme, count, character))?;
        parse_draft_output(&output)
    }

    fn generate_image(
        &self,
        access: &ProviderAccess,
        prompt: &str,
        _character: &CharacterInput,
    ) -> Result<String> {
        let output = self.predict(access, prompt)?;
        parse_image_output(&output)
    }

    fn remove_background(&self, _access: &ProviderAccess, image_url: &str) -> Result<String> {
        Ok(image_url.to_string())
    }
}

/// Interpret prediction output as draft ideas.
///
/// Items may be `{caption, imagePrompt}` objects or plain strings (used as
/// both caption and prompt). Items of any other type are skipped.
pub fn parse_draft_output(output: &Value) -> Result<Vec<DraftIdea>> {
    let items = output.as_array().ok_or_else(|| {
        StickerError::UnexpectedOutput(format!("draft output is not an array: {}", output))
    })?;

    Ok(items
        .iter()
        .filter_map(|item| match item {
            Value::String(text) => Some(DraftIdea::new(text.clone(), text.clone())),
            Value::Object(fields) => {
                let field = |name: &str| {
                    fields
                        .get(name)
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string()
                };
                Some(DraftIdea::new(field("caption"), field("imagePrompt")))
            }
            _ => None,
        })
        .collect())
}

/// Interpret prediction output as an image URL
pub fn parse_image_output(output: &Value) -> Result<String> {
    match output {
        Value::String(url) => Ok(url.clone()),
        // Multi-output models return a list of URLs; the first one is the image
        Value::Array(items) => match items.first() {
            Some(Value::String(url)) => Ok(url.clone()),
            _ => Err(StickerError::UnexpectedOutput(
                "image output array does not start with a URL".to_string(),
            )),
        },
        other => Err(StickerError::UnexpectedOutput(format!(
            "unsupported image output: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RetryPolicy;
    use crate::transport::testing::ScriptedTransport;
    use std::sync::Arc;
    use std::time::Duration;

    const POLL_URL: &str = "https://api.replicate.com/v1/predictions/abc123";

    fn adapter(transport: Arc<ScriptedTransport>, poll_attempts: u32) -> ReplicateAdapter {
        let retry = RetryPolicy::new(3, Duration::from_millis(1));
        let poll = RetryPolicy::new(poll_attempts, Duration::from_millis(1));
        ReplicateAdapter::new(AdapterContext::new(transport).with_policies(retry, poll))
    }

    fn access() -> ProviderAccess {
        ProviderAccess {
            api_key: "r8_test".to_string(),
            api_base: String::new(),
            model: "sdxl".to_string(),
        }
    }

    fn submitted() -> Value {
        json!({ "id": "abc123", "status": "starting", "urls": { "get": POLL_URL } })
    }

    #[test]
    fn test_classify_prediction() {
        assert_eq!(
            classify_prediction(POLL_URL, &json!({ "status": "succeeded", "output": "u" })),
            PredictionState::Succeeded(json!("u"))
        );
        assert_eq!(
            classify_prediction(POLL_URL, &json!({ "status": "failed", "error": "NSFW" })),
            PredictionState::Failed("NSFW".to_string())
        );
        assert_eq!(
            classify_prediction(POLL_URL, &json!({ "status": "canceled" })),
            PredictionState::Failed("prediction canceled".to_string())
        );
        assert_eq!(
            classify_prediction(POLL_URL, &json!({ "output": ["u"] })),
            PredictionState::Succeeded(json!(["u"]))
        );
        let pending = classify_prediction(POLL_URL, &json!({ "status": "processing" }));
        assert!(!pending.is_terminal());
        assert_eq!(
            pending,
            PredictionState::Polling {
                poll_url: POLL_URL.to_string(),
                status: "processing".to_string()
            }
        );
    }

    #[test]
    fn test_parse_image_output_shapes() {
        assert_eq!(parse_image_output(&json!("https://r.test/a.png")).unwrap(), "https://r.test/a.png");
        assert_eq!(
            parse_image_output(&json!(["https://r.test/b.png", "https://r.test/c.png"])).unwrap(),
            "https://r.test/b.png"
        );
        assert!(matches!(
            parse_image_output(&json!(42)),
            Err(StickerError::UnexpectedOutput(_))
        ));
        assert!(parse_image_output(&json!([])).is_err());
    }

    #[test]
    fn test_parse_draft_output_duck_typed() {
        let ideas = parse_draft_output(&json!([
            { "caption": "Hi", "imagePrompt": "waving" },
            "Good night",
            7,
            null
        ]))
        .unwrap();
        assert_eq!(
            ideas,
            vec![
                DraftIdea::new("Hi", "waving"),
                DraftIdea::new("Good night", "Good night")
            ]
        );
        assert!(matches!(
            parse_draft_output(&json!({ "caption": "x" })),
            Err(StickerError::UnexpectedOutput(_))
        ));
    }

    #[test]
    fn test_submit_then_poll_until_succeeded() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(submitted()),
            Ok(json!({ "status": "processing" })),
            Ok(json!({ "status": "succeeded", "output": ["https://r.test/out.png"] })),
        ]));
        let replicate = adapter(transport.clone(), 5);
        let url = replicate
            .generate_image(&access(), "cat dancing", &CharacterInput::default())
            .unwrap();
        assert_eq!(url, "https://r.test/out.png");

        let requests = transport.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].url, "https://api.replicate.com/v1/predictions");
        assert_eq!(requests[0].authorization, "Token r8_test");
        let body = requests[0].body.as_ref().unwrap();
        assert_eq!(body["version"], "sdxl");
        assert_eq!(body["input"]["prompt"], "cat dancing");
        assert_eq!(requests[1].method, "GET");
        assert_eq!(requests[1].url, POLL_URL);
    }

    #[test]
    fn test_failed_prediction_is_provider_error() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(submitted()),
            Ok(json!({ "status": "failed", "error": "out of memory" })),
        ]));
        let err = adapter(transport.clone(), 5)
            .generate_image(&access(), "cat", &CharacterInput::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "Provider error: out of memory");
        assert_eq!(transport.requests().len(), 2);
    }

    #[test]
    fn test_poll_budget_exhaustion_times_out() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(submitted()),
            Ok(json!({ "status": "processing" })),
            Ok(json!({ "status": "processing" })),
            Ok(json!({ "status": "processing" })),
        ]));
        let err = adapter(transport.clone(), 3)
            .generate_image(&access(), "cat", &CharacterInput::default())
            .unwrap_err();
        assert!(matches!(err, StickerError::PredictionTimedOut(3)));
        assert_eq!(transport.requests().len(), 4);
    }

    #[test]
    fn test_missing_poll_url() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(
            json!({ "id": "abc", "urls": { "get": "" } }),
        )]));
        let err = adapter(transport, 3).submit(&access(), "cat").unwrap_err();
        assert!(matches!(err, StickerError::UnexpectedOutput(_)));
    }

    #[test]
    fn test_poll_transport_error_retried_within_attempt() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(submitted()),
            Err(StickerError::Network("reset".to_string())),
            Ok(json!({ "status": "succeeded", "output": "https://r.test/x.png" })),
        ]));
        let url = adapter(transport, 1)
            .generate_image(&access(), "cat", &CharacterInput::default())
            .unwrap();
        assert_eq!(url, "https://r.test/x.png");
    }

    #[test]
    fn test_drafts_from_prediction() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(submitted()),
            Ok(json!({ "status": "succeeded", "output": ["Hello", "Bye"] })),
        ]));
        let mut custom = access();
        custom.api_base = "https://replicate.proxy.test/v1/".to_string();
        let ideas = adapter(transport.clone(), 2)
            .generate_drafts(&custom, "Weekend", 2, &CharacterInput::default())
            .unwrap();
        assert_eq!(ideas.len(), 2);
        assert_eq!(ideas[0].caption, "Hello");
        assert_eq!(
            transport.requests()[0].url,
            "https://replicate.proxy.test/v1/predictions"
        );
    }
}
