//! Content policy
//!
//! One policy instance is built at startup and shared by every visit. It
//! decides which URLs may be visited at all and scrubs blocked words from
//! extracted text before anything is persisted or summarized.

mod wordlist;

pub use wordlist::WordlistPolicy;

/// Filtering capability consumed by the crawl engine
pub trait ContentPolicy: Send + Sync {
    /// Returns true if the URL must never be visited
    fn is_restricted(&self, url: &url::Url) -> bool;

    /// Replaces disallowed spans with a placeholder
    ///
    /// Must be idempotent and must not fail.
    fn filter_text(&self, text: &str) -> String;
}
