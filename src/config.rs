use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::Path;

use crate::error::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub system_config: SystemConfig,
    #[serde(default)]
    pub analysis_config: AnalysisConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Model identifier appended to the upstream URL. The page caption is
    /// derived from this value, never hardcoded.
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Lowest-priority credential source; environment variables win over it.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Deadline for the blocking call. Streaming calls run without one.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    12750
}

fn default_static_dir() -> String {
    "static".to_string()
}

fn default_model() -> String {
    "gemini-2.5-pro".to_string()
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_request_timeout_secs() -> u64 {
    300
}

impl Default for Config {
    fn default() -> Self {
        Self {
            system_config: SystemConfig::default(),
            analysis_config: AnalysisConfig::default(),
        }
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            api_key: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl SystemConfig {
    /// Resolve host and port into a bind address. The host may be an IP
    /// literal or a name like `localhost`; the first resolved address wins.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let target = format!("{}:{}", self.host, self.port);
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| ConfigError::BindAddr(format!("{target}: {e}")))?
            .next()
            .ok_or_else(|| ConfigError::BindAddr(target))
    }
}

impl Config {
    /// Load from a YAML file, or JSON when the extension says so.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let path_lower = path.to_lowercase();
        if path_lower.ends_with(".json") {
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            let config: Config = serde_yaml::from_str(&content)?;
            Ok(config)
        }
    }

    /// Parse from a YAML string (for testing).
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(s)?;
        Ok(config)
    }

    /// Candidate config locations, highest priority first: explicit
    /// CONFIG_PATH, the working directory, then next to the executable.
    pub fn candidate_paths() -> Vec<String> {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()));

        vec![
            std::env::var("CONFIG_PATH").ok(),
            Some("conf.yaml".to_string()),
            exe_dir
                .map(|d| d.join("conf.yaml"))
                .filter(|p| Path::new(p).exists())
                .and_then(|p| p.to_str().map(|s| s.to_string())),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}
