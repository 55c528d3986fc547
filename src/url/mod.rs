//! URL handling for Crawlscribe
//!
//! This module turns raw link strings into [`CrawlTarget`]s with a stable
//! identity, derives the [`Origin`] boundary of a crawl, maps URLs to
//! artifact route paths and decides which links are worth visiting.

mod filter;
mod matcher;
mod normalize;
mod route;
mod target;

pub use filter::is_textual_link;
pub use matcher::matches_wildcard;
pub use normalize::{normalize_fetch_url, normalize_url};
pub use route::route_path;
pub use target::{CrawlTarget, Origin};
