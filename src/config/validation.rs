use crate::config::types::{
    BrowserConfig, CacheConfig, Config, CrawlerConfig, DriverKind, OutputConfig, PolicyConfig,
    RateLimitConfig, SummarizerConfig, TimeoutConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    validate_cache_config(&config.cache)?;
    validate_rate_limit_config(&config.rate_limit)?;
    validate_timeout_config(&config.timeouts)?;
    validate_browser_config(&config.browser)?;
    validate_summarizer_config(&config.summarizer)?;
    validate_policy_config(&config.policy)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_pages < 1 || config.max_concurrent_pages > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_pages must be between 1 and 100, got {}",
            config.max_concurrent_pages
        )));
    }

    if config.link_batch_size < 1 {
        return Err(ConfigError::Validation(
            "link_batch_size must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.output_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output_dir cannot be empty".to_string(),
        ));
    }

    if config.database_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.report_file.is_empty() || config.report_file.contains(['/', '\\']) {
        return Err(ConfigError::Validation(format!(
            "report_file must be a plain file name, got '{}'",
            config.report_file
        )));
    }

    Ok(())
}

fn validate_cache_config(config: &CacheConfig) -> Result<(), ConfigError> {
    if config.max < 1 {
        return Err(ConfigError::Validation("cache max must be >= 1".to_string()));
    }

    if config.ttl_secs < 1 {
        return Err(ConfigError::Validation(
            "cache ttl_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_rate_limit_config(config: &RateLimitConfig) -> Result<(), ConfigError> {
    if config.max_tokens < 1 {
        return Err(ConfigError::Validation(
            "rate limit max_tokens must be >= 1".to_string(),
        ));
    }

    if !config.refill_rate.is_finite() || config.refill_rate <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "rate limit refill_rate must be a positive number, got {}",
            config.refill_rate
        )));
    }

    Ok(())
}

fn validate_timeout_config(config: &TimeoutConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("navigation_ms", config.navigation_ms),
        ("page_ms", config.page_ms),
        ("screenshot_ms", config.screenshot_ms),
    ] {
        if value == 0 {
            return Err(ConfigError::Validation(format!("{} must be > 0", name)));
        }
    }

    Ok(())
}

fn validate_browser_config(config: &BrowserConfig) -> Result<(), ConfigError> {
    if config.launch_attempts < 1 {
        return Err(ConfigError::Validation(
            "launch_attempts must be >= 1".to_string(),
        ));
    }

    if !config.backoff_multiplier.is_finite() || config.backoff_multiplier < 1.0 {
        return Err(ConfigError::Validation(format!(
            "backoff_multiplier must be >= 1.0, got {}",
            config.backoff_multiplier
        )));
    }

    if config.launch_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "launch_timeout_ms must be > 0".to_string(),
        ));
    }

    if config.driver == DriverKind::Webdriver {
        Url::parse(&config.webdriver_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid webdriver_url: {}", e)))?;
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_summarizer_config(config: &SummarizerConfig) -> Result<(), ConfigError> {
    Url::parse(&config.api_base)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid summarizer api_base: {}", e)))?;

    if config.model.trim().is_empty() {
        return Err(ConfigError::Validation(
            "summarizer model cannot be empty".to_string(),
        ));
    }

    if config.max_input_chars < 1 {
        return Err(ConfigError::Validation(
            "summarizer max_input_chars must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates content policy configuration
///
/// The placeholder may not contain a blocked word: filtering must be
/// idempotent, and a placeholder that matches the blocklist would be
/// replaced again on every pass.
fn validate_policy_config(config: &PolicyConfig) -> Result<(), ConfigError> {
    for pattern in &config.restricted_domains {
        validate_domain_pattern(pattern)?;
    }

    if config.placeholder.is_empty() {
        return Err(ConfigError::Validation(
            "policy placeholder cannot be empty".to_string(),
        ));
    }

    let placeholder = config.placeholder.to_lowercase();
    for word in &config.blocked_words {
        if word.trim().is_empty() {
            return Err(ConfigError::Validation(
                "blocked words cannot be empty".to_string(),
            ));
        }

        if placeholder.contains(&word.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "policy placeholder '{}' contains blocked word '{}'",
                config.placeholder, word
            )));
        }
    }

    Ok(())
}

/// Validates a domain pattern (supports wildcards)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    match pattern.strip_prefix("*.") {
        Some(domain) => validate_domain_string(domain),
        None => validate_domain_string(pattern),
    }
}

/// Validates a domain string (without wildcard prefix)
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' must contain at least one dot (e.g., 'example.com')",
            domain
        )));
    }

    Ok(())
}
