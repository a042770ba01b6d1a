//! Google Gemini `generateContent`.

use serde_json::{json, Value};

use super::{agent, post_json, text_at, Adapter, LlmRequest};
use crate::error::AdapterError;

const PROVIDER: &str = "google";
const ENDPOINT_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub struct GoogleAdapter {
    agent: ureq::Agent,
    model: String,
    api_key: String,
}

impl GoogleAdapter {
    pub fn new(model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            agent: agent(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }
}

fn endpoint(model: &str) -> String {
    format!("{ENDPOINT_BASE}/{model}:generateContent")
}

fn payload(request: &LlmRequest) -> Value {
    let mut body = json!({
        "contents": [{ "role": "user", "parts": [{ "text": request.prompt }] }],
        "generationConfig": { "responseMimeType": "application/json" },
    });
    if let Some(system) = &request.system {
        body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
    }
    body
}

fn extract(value: &Value) -> Result<String, AdapterError> {
    text_at(
        PROVIDER,
        value,
        "/candidates/0/content/parts/0/text",
        "candidates",
    )
}

impl Adapter for GoogleAdapter {
    fn provider(&self) -> &'static str {
        PROVIDER
    }

    fn generate(&self, request: &LlmRequest) -> Result<String, AdapterError> {
        let http = self
            .agent
            .post(&endpoint(&self.model))
            .query("key", &self.api_key);
        let response = post_json(PROVIDER, http, payload(request))?;
        extract(&response)
    }
}
