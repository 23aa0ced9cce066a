use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::llm::{LlmConfig, RetryConfig};
use crate::orchestrator::OrchestratorConfig;
use crate::segmenter::{KeywordConfig, SegmenterConfig};

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub segmenter: SegmenterConfig,
    #[serde(default)]
    pub keywords: KeywordConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Largest accepted upload, in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

fn default_max_upload_bytes() -> usize {
    64 * 1024 * 1024
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub segmenter: SegmenterConfig,
    pub keywords: KeywordConfig,
    pub orchestrator: OrchestratorConfig,
    pub llm: SanitizedLlmConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedLlmConfig {
    pub api_base: String,
    pub model: String,
    pub api_key: Option<String>,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    pub write_timeout_secs: u64,
    pub max_content_chars: usize,
    pub fallback_stages: Vec<usize>,
    pub retry: RetryConfig,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            segmenter: config.segmenter.clone(),
            keywords: config.keywords.clone(),
            orchestrator: config.orchestrator.clone(),
            llm: SanitizedLlmConfig {
                api_base: config.llm.api_base.clone(),
                model: config.llm.model.clone(),
                api_key: config.llm.api_key.as_ref().map(|_| "[REDACTED]".to_string()),
                connect_timeout_secs: config.llm.connect_timeout_secs,
                read_timeout_secs: config.llm.read_timeout_secs,
                write_timeout_secs: config.llm.write_timeout_secs,
                max_content_chars: config.llm.max_content_chars,
                fallback_stages: config.llm.fallback_stages.clone(),
                retry: config.llm.retry.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitized_config_redacts_api_key() {
        let mut config = Config::default();
        config.llm.api_key = Some("sk-secret".to_string());

        let sanitized = SanitizedConfig::from(&config);
        assert_eq!(sanitized.llm.api_key.as_deref(), Some("[REDACTED]"));

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("sk-secret"));
    }

    #[test]
    fn test_sanitized_config_without_key() {
        let sanitized = SanitizedConfig::from(&Config::default());
        assert!(sanitized.llm.api_key.is_none());
    }
}
