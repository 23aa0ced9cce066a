//! Configuration for the LLM client and its retry policy.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Chat-completions endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Model name/identifier.
    #[serde(default = "default_model")]
    pub model: String,

    /// API key. Usually supplied through `BROADSHEET_LLM__API_KEY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Maximum wait for response data.
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,

    /// Budget for sending the request body; added to the total request timeout.
    #[serde(default = "default_write_timeout")]
    pub write_timeout_secs: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Completion token limit; omitted from requests when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Article content is cut to this many characters before prompting.
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,

    /// Shorter content lengths tried in order after a content-policy rejection.
    #[serde(default = "default_fallback_stages")]
    pub fallback_stages: Vec<usize>,

    /// Substring of an error body that marks a content-policy rejection.
    #[serde(default = "default_content_risk_signal")]
    pub content_risk_signal: String,

    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_api_base() -> String {
    "https://api.deepseek.com".to_string()
}

fn default_model() -> String {
    "deepseek-chat".to_string()
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_read_timeout() -> u64 {
    300 // long articles take minutes to generate
}

fn default_write_timeout() -> u64 {
    30
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_content_chars() -> usize {
    80_000
}

fn default_fallback_stages() -> Vec<usize> {
    vec![6000, 3000]
}

fn default_content_risk_signal() -> String {
    "Content Exists Risk".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            model: default_model(),
            api_key: None,
            connect_timeout_secs: default_connect_timeout(),
            read_timeout_secs: default_read_timeout(),
            write_timeout_secs: default_write_timeout(),
            temperature: default_temperature(),
            max_tokens: None,
            max_content_chars: default_max_content_chars(),
            fallback_stages: default_fallback_stages(),
            content_risk_signal: default_content_risk_signal(),
            retry: RetryConfig::default(),
        }
    }
}

impl LlmConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    /// Whole-request bound covering connect, upload and response.
    pub fn total_timeout(&self) -> Duration {
        Duration::from_secs(
            self.connect_timeout_secs + self.read_timeout_secs + self.write_timeout_secs,
        )
    }
}

/// Retry configuration for transient transport failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry in milliseconds.
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    /// Upper bound on any single delay in milliseconds.
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Exponential backoff multiplier.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> u64 {
    1000
}

fn default_max_delay() -> u64 {
    30_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetryConfig {
    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let delay = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(exponent);
        Duration::from_millis(delay.min(self.max_delay_ms as f64) as u64)
    }

    /// No waiting between attempts; used by tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay_ms: 0,
            max_delay_ms: 0,
            backoff_multiplier: 1.0,
        }
    }
}
