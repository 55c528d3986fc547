/// Checks if a host matches a restricted-domain pattern
///
/// Two pattern forms are supported:
/// 1. Exact: `"example.com"` matches only `example.com`
/// 2. Wildcard: `"*.example.com"` matches `example.com` itself and any
///    subdomain at any nesting level
///
/// Comparison is case-insensitive and ignores a trailing root dot on the
/// host (`example.com.`).
///
/// # Examples
///
/// ```
/// use crawlscribe::url::matches_wildcard;
///
/// assert!(matches_wildcard("example.com", "Example.COM"));
/// assert!(!matches_wildcard("example.com", "blog.example.com"));
///
/// assert!(matches_wildcard("*.example.com", "example.com"));
/// assert!(matches_wildcard("*.example.com", "api.v2.example.com"));
/// assert!(!matches_wildcard("*.example.com", "notexample.com"));
/// ```
pub fn matches_wildcard(pattern: &str, host: &str) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    let pattern = pattern.to_ascii_lowercase();

    match pattern.strip_prefix("*.") {
        Some(base) => {
            host == base
                || host
                    .strip_suffix(base)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        }
        None => host == pattern,
    }
}
