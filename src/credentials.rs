use crate::config::Config;
use crate::error::ConfigError;

/// One place an API credential may come from. Providers are tried in list
/// order; a provider "hits" when it yields a non-empty value after trimming.
#[derive(Debug, Clone)]
pub enum CredentialProvider {
    /// An environment variable, looked up by name.
    Env(String),
    /// A value already read from the config file (or another secret store),
    /// carried with a label for error messages.
    Literal { label: String, value: Option<String> },
}

impl CredentialProvider {
    pub fn env(name: impl Into<String>) -> Self {
        CredentialProvider::Env(name.into())
    }

    pub fn literal(label: impl Into<String>, value: Option<String>) -> Self {
        CredentialProvider::Literal {
            label: label.into(),
            value,
        }
    }

    fn lookup(&self) -> Option<String> {
        match self {
            CredentialProvider::Env(name) => std::env::var(name).ok(),
            CredentialProvider::Literal { value, .. } => value.clone(),
        }
    }

    fn describe(&self) -> String {
        match self {
            CredentialProvider::Env(name) => format!("${name}"),
            CredentialProvider::Literal { label, .. } => label.clone(),
        }
    }
}

/// First non-empty result wins; whitespace-only values count as absent.
pub fn resolve_api_key(providers: &[CredentialProvider]) -> Option<String> {
    providers.iter().find_map(|provider| {
        provider
            .lookup()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

/// Same resolution, but absence is the fatal startup condition: the error
/// names every provider that was tried so the operator knows where to put
/// the key.
pub fn require_api_key(providers: &[CredentialProvider]) -> Result<String, ConfigError> {
    resolve_api_key(providers).ok_or_else(|| {
        let tried: Vec<String> = providers.iter().map(|p| p.describe()).collect();
        ConfigError::MissingCredential(tried.join(", "))
    })
}

/// The chain the app ships with: process environment first (both names the
/// hosted API documents), then the config file.
pub fn default_providers(config: &Config) -> Vec<CredentialProvider> {
    vec![
        CredentialProvider::env("GEMINI_API_KEY"),
        CredentialProvider::env("GOOGLE_API_KEY"),
        CredentialProvider::literal(
            "analysis_config.api_key",
            config.analysis_config.api_key.clone(),
        ),
    ]
}
