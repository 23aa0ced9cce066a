use super::{types::Config, ConfigError};
use crate::segmenter::TITLE_CHAR_LIMIT;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - At least one task may run at a time
/// - Body-line threshold is positive and the title cap is within 1..=200
/// - Fallback stages shrink strictly and stay below the content cap
/// - The retry budget allows at least one attempt
/// - Roundup intro patterns are valid regular expressions
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.orchestrator.max_parallel_tasks == 0 {
        return Err(ConfigError::ValidationError(
            "orchestrator.max_parallel_tasks must be at least 1".to_string(),
        ));
    }

    if config.segmenter.min_body_line_chars == 0 {
        return Err(ConfigError::ValidationError(
            "segmenter.min_body_line_chars must be at least 1".to_string(),
        ));
    }

    if !(1..=TITLE_CHAR_LIMIT).contains(&config.segmenter.max_title_chars) {
        return Err(ConfigError::ValidationError(format!(
            "segmenter.max_title_chars must be between 1 and {TITLE_CHAR_LIMIT}"
        )));
    }

    let stages = &config.llm.fallback_stages;
    if stages.windows(2).any(|pair| pair[1] >= pair[0]) {
        return Err(ConfigError::ValidationError(
            "llm.fallback_stages must be strictly decreasing".to_string(),
        ));
    }
    if stages.first().is_some_and(|&s| s >= config.llm.max_content_chars) {
        return Err(ConfigError::ValidationError(
            "llm.fallback_stages must be smaller than llm.max_content_chars".to_string(),
        ));
    }

    if config.llm.retry.max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "llm.retry.max_attempts must be at least 1".to_string(),
        ));
    }

    for pattern in &config.keywords.roundup_intro_patterns {
        if let Err(e) = regex_lite::Regex::new(pattern) {
            return Err(ConfigError::ValidationError(format!(
                "keywords.roundup_intro_patterns: invalid pattern {pattern:?}: {e}"
            )));
        }
    }

    Ok(())
}
