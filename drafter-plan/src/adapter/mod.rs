//! LLM provider adapters.
//!
//! Each provider is a blocking [`ureq`] client with a fixed request timeout.
//! Request payloads and response extraction are plain functions over
//! [`serde_json::Value`] so they can be checked without a network.

mod anthropic;
mod google;
mod ollama;
mod openai;

use std::time::Duration;

use serde_json::Value;

use drafter_core::DrafterConfig;

use crate::error::AdapterError;

pub use anthropic::AnthropicAdapter;
pub use google::GoogleAdapter;
pub use ollama::OllamaAdapter;
pub use openai::OpenAiAdapter;

/// Upper bound on a single provider round trip.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Longest error body kept from a failed response.
const ERROR_BODY_LIMIT: usize = 300;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmRequest {
    pub prompt: String,
    pub system: Option<String>,
}

/// A text-generation backend.
pub trait Adapter: Send {
    fn provider(&self) -> &'static str;

    fn generate(&self, request: &LlmRequest) -> Result<String, AdapterError>;
}

/// Build the adapter named by `config.provider`; `none` disables refinement.
pub fn build_adapter(config: &DrafterConfig) -> Result<Option<Box<dyn Adapter>>, AdapterError> {
    let model = config.model.clone();
    let adapter: Box<dyn Adapter> = match config.provider.trim().to_ascii_lowercase().as_str() {
        "none" | "" => return Ok(None),
        "ollama" => Box::new(OllamaAdapter::new(&config.ollama_host, model)),
        "openai" => Box::new(OpenAiAdapter::new(model, api_key("OPENAI_API_KEY")?)),
        "anthropic" => Box::new(AnthropicAdapter::new(model, api_key("ANTHROPIC_API_KEY")?)),
        "google" => Box::new(GoogleAdapter::new(model, api_key("GOOGLE_API_KEY")?)),
        other => return Err(AdapterError::UnsupportedProvider(other.to_string())),
    };
    Ok(Some(adapter))
}

fn api_key(var: &'static str) -> Result<String, AdapterError> {
    std::env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(AdapterError::MissingApiKey { var })
}

pub(crate) fn agent() -> ureq::Agent {
    ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build()
}

/// Send `body` and decode the JSON answer, mapping every failure to [`AdapterError`].
pub(crate) fn post_json(
    provider: &'static str,
    request: ureq::Request,
    body: Value,
) -> Result<Value, AdapterError> {
    match request.send_json(body) {
        Ok(response) => response
            .into_json::<Value>()
            .map_err(|e| AdapterError::Decode {
                provider,
                message: e.to_string(),
            }),
        Err(ureq::Error::Status(code, response)) => {
            let body = response.into_string().unwrap_or_default();
            Err(AdapterError::Status {
                provider,
                code,
                body: body.chars().take(ERROR_BODY_LIMIT).collect(),
            })
        }
        Err(ureq::Error::Transport(transport)) => Err(AdapterError::Transport {
            provider,
            message: transport.to_string(),
        }),
    }
}

/// Non-empty string at a JSON pointer.
pub(crate) fn text_at(
    provider: &'static str,
    value: &Value,
    pointer: &str,
    field: &'static str,
) -> Result<String, AdapterError> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
        .ok_or(AdapterError::MissingField { provider, field })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_provider_disables_refinement() {
        let config = DrafterConfig {
            provider: "none".to_string(),
            ..DrafterConfig::default()
        };
        assert!(build_adapter(&config).unwrap().is_none());
    }

    #[test]
    fn ollama_needs_no_key() {
        let adapter = build_adapter(&DrafterConfig::default()).unwrap().unwrap();
        assert_eq!(adapter.provider(), "ollama");
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let config = DrafterConfig {
            provider: "carrier-pigeon".to_string(),
            ..DrafterConfig::default()
        };
        assert!(matches!(
            build_adapter(&config),
            Err(AdapterError::UnsupportedProvider(name)) if name == "carrier-pigeon"
        ));
    }

    #[test]
    fn text_at_requires_non_empty_string() {
        let value = serde_json::json!({ "a": { "b": "" }, "c": 3 });
        assert!(matches!(
            text_at("test", &value, "/a/b", "b"),
            Err(AdapterError::MissingField { field: "b", .. })
        ));
        assert!(text_at("test", &value, "/c", "c").is_err());
    }
}
