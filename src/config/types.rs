use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Crawlscribe
///
/// Every section is optional; missing sections and keys fall back to the
/// defaults below, so `Config::default()` is a complete configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub output: OutputConfig,
    pub cache: CacheConfig,
    pub retry: RetryConfig,
    #[serde(rename = "rate-limit")]
    pub rate_limit: RateLimitConfig,
    pub timeouts: TimeoutConfig,
    pub browser: BrowserConfig,
    pub summarizer: SummarizerConfig,
    pub policy: PolicyConfig,
}

/// Crawler traversal configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Maximum hop distance from the root URL
    pub max_depth: u32,

    /// Maximum number of simultaneously open pages
    pub max_concurrent_pages: u32,

    /// Number of discovered links visited together in one fan-out batch
    pub link_batch_size: usize,

    /// Pause between fan-out batches (milliseconds)
    pub link_batch_delay_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_concurrent_pages: 5,
            link_batch_size: 3,
            link_batch_delay_ms: 200,
        }
    }
}

impl CrawlerConfig {
    pub fn link_batch_delay(&self) -> Duration {
        Duration::from_millis(self.link_batch_delay_ms)
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Root directory for per-page artifacts
    pub output_dir: PathBuf,

    /// Path to the SQLite run ledger
    pub database_path: PathBuf,

    /// File name of the JSON crawl report, written inside `output_dir`
    pub report_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./output"),
            database_path: PathBuf::from("./output/crawlscribe.db"),
            report_file: "crawl_report.json".to_string(),
        }
    }
}

impl OutputConfig {
    pub fn report_path(&self) -> PathBuf {
        self.output_dir.join(&self.report_file)
    }
}

/// Result cache bounds
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CacheConfig {
    /// Maximum number of cached page results
    pub max: usize,

    /// Lifetime of a cached result (seconds)
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max: 1000,
            ttl_secs: 3600,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Retry policy handed to collaborators
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RetryConfig {
    pub max_retries: u32,

    /// Initial delay before the first retry (milliseconds)
    pub retry_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl RetryConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Token bucket tuning for navigation and summarizer calls
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RateLimitConfig {
    /// Bucket capacity
    pub max_tokens: u32,

    /// Tokens added per second
    pub refill_rate: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_tokens: 10,
            refill_rate: 5.0,
        }
    }
}

/// Hard per-operation timeouts (milliseconds)
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TimeoutConfig {
    pub navigation_ms: u64,
    pub page_ms: u64,
    pub screenshot_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            navigation_ms: 30_000,
            page_ms: 60_000,
            screenshot_ms: 30_000,
        }
    }
}

impl TimeoutConfig {
    pub fn navigation(&self) -> Duration {
        Duration::from_millis(self.navigation_ms)
    }

    pub fn page(&self) -> Duration {
        Duration::from_millis(self.page_ms)
    }

    pub fn screenshot(&self) -> Duration {
        Duration::from_millis(self.screenshot_ms)
    }
}

/// Which page driver implementation to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    /// Plain HTTP fetches parsed as HTML
    Http,
    /// A real browser controlled over the WebDriver protocol
    Webdriver,
}

/// Browser/page driver configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BrowserConfig {
    pub driver: DriverKind,

    /// WebDriver endpoint, used when `driver = "webdriver"`
    pub webdriver_url: String,

    /// User agent sent by the HTTP driver
    pub user_agent: String,

    /// Launch attempts before the crawl is abandoned
    pub launch_attempts: u32,

    /// Growth factor applied to the delay between launch attempts
    pub backoff_multiplier: f64,

    /// Overall budget for launching (milliseconds)
    pub launch_timeout_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            driver: DriverKind::Http,
            webdriver_url: "http://localhost:4444".to_string(),
            user_agent: format!("crawlscribe/{}", env!("CARGO_PKG_VERSION")),
            launch_attempts: 5,
            backoff_multiplier: 1.5,
            launch_timeout_ms: 120_000,
        }
    }
}

impl BrowserConfig {
    pub fn launch_timeout(&self) -> Duration {
        Duration::from_millis(self.launch_timeout_ms)
    }
}

/// LLM summarizer configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SummarizerConfig {
    /// Base URL of an OpenAI-compatible API
    pub api_base: String,

    pub model: String,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Input is truncated to this many characters before sending
    pub max_input_chars: usize,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            max_input_chars: 12_000,
        }
    }
}

/// Content policy configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PolicyConfig {
    /// Domain patterns (e.g., "example.com" or "*.example.com") never visited
    pub restricted_domains: Vec<String>,

    /// Words replaced by the placeholder in extracted text
    pub blocked_words: Vec<String>,

    pub placeholder: String,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            restricted_domains: Vec::new(),
            blocked_words: Vec::new(),
            placeholder: "[FILTERED]".to_string(),
        }
    }
}
