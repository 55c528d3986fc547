use crate::url::normalize::{normalize_fetch_url, normalize_url};
use crate::url::route::route_path;
use crate::UrlError;
use std::fmt;
use std::hash::{Hash, Hasher};
use url::Url;

/// A URL eligible for crawling, identified by its normalized form
///
/// Two targets are equal when their [`key`](Self::key)s are equal, no matter
/// how the original strings were written.
#[derive(Debug, Clone)]
pub struct CrawlTarget {
    key: String,
    url: Url,
}

impl CrawlTarget {
    /// Parses and normalizes an absolute http(s) URL
    ///
    /// # Examples
    ///
    /// ```
    /// use crawlscribe::url::CrawlTarget;
    ///
    /// let a = CrawlTarget::parse("http://www.Example.com/docs/").unwrap();
    /// let b = CrawlTarget::parse("https://example.com/docs#intro").unwrap();
    /// assert_eq!(a, b);
    /// assert_eq!(a.key(), "https://example.com/docs");
    /// assert_eq!(a.url().as_str(), "http://example.com/docs");
    /// ```
    pub fn parse(input: &str) -> Result<Self, UrlError> {
        let url = normalize_fetch_url(input)?;
        Self::from_url(url)
    }

    /// Resolves a (possibly relative) link against the page it appeared on
    pub fn resolve(base: &Url, href: &str) -> Result<Self, UrlError> {
        let joined = base
            .join(href.trim())
            .map_err(|e| UrlError::Parse(e.to_string()))?;
        Self::parse(joined.as_str())
    }

    fn from_url(url: Url) -> Result<Self, UrlError> {
        let identity = normalize_url(url.as_str())?;
        let mut key = identity.to_string();
        if identity.path() == "/" && identity.query().is_none() {
            key.pop();
        }
        Ok(Self { key, url })
    }

    /// The normalized identity string used for deduplication
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The URL a page driver should navigate to
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    pub fn origin(&self) -> Origin {
        Origin::of(self)
    }

    /// Filesystem-safe route derived from the target's path
    pub fn route(&self) -> String {
        route_path(&self.url)
    }
}

impl PartialEq for CrawlTarget {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for CrawlTarget {}

impl Hash for CrawlTarget {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Display for CrawlTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

/// The crawl boundary derived from the root URL
///
/// An origin is the normalized host plus any explicit port. The scheme is
/// not part of it: `http://example.com` and `https://example.com` share an
/// identity, so they share an origin too.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin {
    host: String,
    port: Option<u16>,
}

impl Origin {
    pub fn of(target: &CrawlTarget) -> Self {
        Self {
            host: target.host().to_string(),
            port: target.url().port(),
        }
    }

    /// Returns true if the target lies inside this boundary
    pub fn contains(&self, target: &CrawlTarget) -> bool {
        self.host == target.host() && self.port == target.url().port()
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}:{}", self.host, port),
            None => f.write_str(&self.host),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_root_key_has_no_trailing_slash() {
        let target = CrawlTarget::parse("https://example.com/").unwrap();
        assert_eq!(target.key(), "https://example.com");

        let bare = CrawlTarget::parse("https://example.com").unwrap();
        assert_eq!(target, bare);
    }

    #[test]
    fn test_root_with_query_keeps_slash() {
        let target = CrawlTarget::parse("https://example.com/?page=2").unwrap();
        assert_eq!(target.key(), "https://example.com/?page=2");
    }

    #[test]
    fn test_scheme_and_www_variants_share_identity() {
        let variants = [
            "http://example.com/a",
            "https://www.example.com/a/",
            "HTTPS://EXAMPLE.COM/a#top",
            "https://example.com/a?utm_campaign=x",
        ];

        let keys: HashSet<_> = variants
            .iter()
            .map(|v| CrawlTarget::parse(v).unwrap())
            .collect();
        assert_eq!(keys.len(), 1);
    }

    #[test]
    fn test_fetch_url_keeps_http() {
        let target = CrawlTarget::parse("http://127.0.0.1:8080/page/").unwrap();
        assert_eq!(target.url().as_str(), "http://127.0.0.1:8080/page");
        assert_eq!(target.key(), "https://127.0.0.1:8080/page");
    }

    #[test]
    fn test_resolve_relative_link() {
        let base = Url::parse("https://example.com/blog/post").unwrap();
        let target = CrawlTarget::resolve(&base, "../about/").unwrap();
        assert_eq!(target.key(), "https://example.com/about");
    }

    #[test]
    fn test_resolve_rejects_mailto() {
        let base = Url::parse("https://example.com/").unwrap();
        assert!(CrawlTarget::resolve(&base, "mailto:someone@example.com").is_err());
    }

    #[test]
    fn test_origin_contains_same_host() {
        let root = CrawlTarget::parse("https://example.com").unwrap();
        let page = CrawlTarget::parse("http://www.example.com/deep/page").unwrap();
        assert!(root.origin().contains(&page));
    }

    #[test]
    fn test_origin_excludes_other_host_and_port() {
        let root = CrawlTarget::parse("http://127.0.0.1:8080/").unwrap();
        let other_port = CrawlTarget::parse("http://127.0.0.1:9090/").unwrap();
        let other_host = CrawlTarget::parse("https://other.com/b").unwrap();
        let subdomain = CrawlTarget::parse("https://blog.127.0.0.1.nip.io/").unwrap();

        let origin = root.origin();
        assert!(!origin.contains(&other_port));
        assert!(!origin.contains(&other_host));
        assert!(!origin.contains(&subdomain));
        assert_eq!(origin.to_string(), "127.0.0.1:8080");
    }

    #[test]
    fn test_route() {
        let target = CrawlTarget::parse("https://example.com/guides/intro").unwrap();
        assert_eq!(target.route(), "guides-intro");
    }
}
