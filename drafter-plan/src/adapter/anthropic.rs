//! Anthropic messages API.

use serde_json::{json, Value};

use super::{agent, post_json, text_at, Adapter, LlmRequest};
use crate::error::AdapterError;

const PROVIDER: &str = "anthropic";
const ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;

pub struct AnthropicAdapter {
    agent: ureq::Agent,
    model: String,
    api_key: String,
}

impl AnthropicAdapter {
    pub fn new(model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            agent: agent(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }
}

fn payload(model: &str, request: &LlmRequest) -> Value {
    let mut body = json!({
        "model": model,
        "max_tokens": MAX_TOKENS,
        "messages": [{ "role": "user", "content": request.prompt }],
    });
    if let Some(system) = &request.system {
        body["system"] = json!(system);
    }
    body
}

fn extract(value: &Value) -> Result<String, AdapterError> {
    text_at(PROVIDER, value, "/content/0/text", "content")
}

impl Adapter for AnthropicAdapter {
    fn provider(&self) -> &'static str {
        PROVIDER
    }

    fn generate(&self, request: &LlmRequest) -> Result<String, AdapterError> {
        let http = self
            .agent
            .post(ENDPOINT)
            .set("x-api-key", &self.api_key)
            .set("anthropic-version", API_VERSION);
        let response = post_json(PROVIDER, http, payload(&self.model, request))?;
        extract(&response)
    }
}
