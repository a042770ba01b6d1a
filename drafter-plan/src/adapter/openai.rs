//! OpenAI chat completions.

use serde_json::{json, Value};

use super::{agent, post_json, text_at, Adapter, LlmRequest};
use crate::error::AdapterError;

const PROVIDER: &str = "openai";
const ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

pub struct OpenAiAdapter {
    agent: ureq::Agent,
    model: String,
    api_key: String,
}

impl OpenAiAdapter {
    pub fn new(model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            agent: agent(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }
}

fn payload(model: &str, request: &LlmRequest) -> Value {
    let mut messages = Vec::new();
    if let Some(system) = &request.system {
        messages.push(json!({ "role": "system", "content": system }));
    }
    messages.push(json!({ "role": "user", "content": request.prompt }));
    json!({
        "model": model,
        "messages": messages,
        "response_format": { "type": "json_object" },
    })
}

fn extract(value: &Value) -> Result<String, AdapterError> {
    text_at(PROVIDER, value, "/choices/0/message/content", "choices")
}

impl Adapter for OpenAiAdapter {
    fn provider(&self) -> &'static str {
        PROVIDER
    }

    fn generate(&self, request: &LlmRequest) -> Result<String, AdapterError> {
        let http = self
            .agent
            .post(ENDPOINT)
            .set("Authorization", &format!("Bearer {}", self.api_key));
        let response = post_json(PROVIDER, http, payload(&self.model, request))?;
        extract(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_leads_the_messages() {
        let request = LlmRequest {
            prompt: "files".to_string(),
            system: Some("json only".to_string()),
        };
        let body = payload("gpt", &request);
        assert_eq!(body["messages"][0]["role"], json!("system"));
        assert_eq!(body["messages"][1]["content"], json!("files"));
        assert_eq!(body["response_format"]["type"], json!("json_object"));
    }

    #[test]
    fn extract_reads_first_choice() {
        let value = json!({ "choices": [{ "message": { "content": "{\"groups\":[]}" } }] });
        assert_eq!(extract(&value).unwrap(), "{\"groups\":[]}");
        assert!(extract(&json!({ "choices": [] })).is_err());
    }
}
