//! Local Ollama server via `/api/generate`.

use serde_json::{json, Value};

use super::{agent, post_json, text_at, Adapter, LlmRequest};
use crate::error::AdapterError;

const PROVIDER: &str = "ollama";

pub struct OllamaAdapter {
    agent: ureq::Agent,
    host: String,
    model: String,
}

impl OllamaAdapter {
    pub fn new(host: &str, model: impl Into<String>) -> Self {
        Self {
            agent: agent(),
            host: host.trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.host)
    }
}

fn payload(model: &str, request: &LlmRequest) -> Value {
    let mut body = json!({
        "model": model,
        "prompt": request.prompt,
        "stream": false,
    });
    if let Some(system) = &request.system {
        body["system"] = json!(system);
    }
    body
}

fn extract(value: &Value) -> Result<String, AdapterError> {
    text_at(PROVIDER, value, "/response", "response")
}

impl Adapter for OllamaAdapter {
    fn provider(&self) -> &'static str {
        PROVIDER
    }

    fn generate(&self, request: &LlmRequest) -> Result<String, AdapterError> {
        let response = post_json(
            PROVIDER,
            self.agent.post(&self.endpoint()),
            payload(&self.model, request),
        )?;
        extract(&response)
    }
}
