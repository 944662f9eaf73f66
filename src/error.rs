use thiserror::Error;

/// Startup-time failures. Any of these halt the process before the server
/// binds; none are recoverable without operator intervention.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML config: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("failed to parse JSON config: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("no API credential found (tried {0}); set GEMINI_API_KEY or analysis_config.api_key")]
    MissingCredential(String),

    #[error("invalid bind address {0}")]
    BindAddr(String),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// The single failure class for an upstream generation call. Transport,
/// authentication, quota, and malformed-response problems all land here;
/// the message is the user-visible text and there is no structured code.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RequestError {
    message: String,
}

impl RequestError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<reqwest::Error> for RequestError {
    fn from(err: reqwest::Error) -> Self {
        let status = err.status();
        let message = match status {
            Some(s) if s.as_u16() == 401 || s.as_u16() == 403 => {
                format!("upstream rejected the API credential ({s})")
            }
            Some(s) => format!("upstream request failed with status {s}"),
            None if err.is_timeout() => "upstream request timed out".to_string(),
            None if err.is_connect() => format!("could not reach the upstream service: {err}"),
            None => format!("upstream request failed: {err}"),
        };
        Self { message }
    }
}

impl From<serde_json::Error> for RequestError {
    fn from(err: serde_json::Error) -> Self {
        Self {
            message: format!("upstream returned a malformed response: {err}"),
        }
    }
}
