use thiserror::Error;

/// Failure talking to an LLM provider.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("{provider} request failed: {message}")]
    Transport {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} returned HTTP {code}: {body}")]
    Status {
        provider: &'static str,
        code: u16,
        body: String,
    },

    #[error("{provider} response could not be decoded: {message}")]
    Decode {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} response missing '{field}'")]
    MissingField {
        provider: &'static str,
        field: &'static str,
    },

    #[error("{var} is not set")]
    MissingApiKey { var: &'static str },

    #[error("unsupported provider '{0}'; expected: ollama, openai, anthropic, google, none")]
    UnsupportedProvider(String),
}

/// Why a provider answer was not used. Every variant falls back to heuristics.
#[derive(Debug, Error)]
pub enum RefineError {
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error("prompt rendering failed: {0}")]
    Prompt(#[from] tera::Error),

    #[error("response is not JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("response has no 'groups' list")]
    GroupsNotList,

    #[error("response 'groups' list is empty")]
    NoGroups,

    #[error("group {index} has no list of file paths")]
    MissingFiles { index: usize },
}
