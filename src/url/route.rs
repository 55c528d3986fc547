use url::Url;

/// Derives a filesystem-safe route path from a URL
///
/// The path and query are joined and every run of non-alphanumeric
/// characters is collapsed into a single `-`. Leading and trailing hyphens
/// are trimmed; the site root maps to `index`.
///
/// Distinct URLs may share a route (`/a-b` and `/a/b` both map to `a-b`),
/// so callers that need a unique name must add something of their own.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use crawlscribe::url::route_path;
///
/// let url = Url::parse("https://example.com/docs/getting_started").unwrap();
/// assert_eq!(route_path(&url), "docs-getting-started");
///
/// let root = Url::parse("https://example.com/").unwrap();
/// assert_eq!(route_path(&root), "index");
/// ```
pub fn route_path(url: &Url) -> String {
    let mut source = url.path().to_string();
    if let Some(query) = url.query() {
        source.push('?');
        source.push_str(query);
    }

    let mut route = String::with_capacity(source.len());
    let mut pending_separator = false;
    for c in source.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !route.is_empty() {
                route.push('-');
            }
            pending_separator = false;
            route.push(c);
        } else {
            pending_separator = true;
        }
    }

    if route.is_empty() {
        "index".to_string()
    } else {
        route
    }
}
