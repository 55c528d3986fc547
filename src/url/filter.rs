use url::Url;

/// File extensions that never lead to a textual page
const NON_TEXTUAL_EXTENSIONS: &[&str] = &[
    // images
    "png", "jpg", "jpeg", "gif", "bmp", "webp", "svg", "ico", "tif", "tiff", "avif",
    // audio / video
    "mp3", "mp4", "wav", "ogg", "webm", "avi", "mov", "mkv", "flac", "m4a",
    // archives and binaries
    "zip", "tar", "gz", "tgz", "bz2", "xz", "7z", "rar", "exe", "dmg", "iso", "apk", "bin",
    // documents
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "odt", "ods", "epub",
    // fonts
    "woff", "woff2", "ttf", "otf", "eot",
    // page assets
    "css", "js", "mjs", "map", "json", "xml", "rss", "atom",
];

/// Returns true if the URL plausibly points at a textual page
///
/// Only the extension of the last path segment is considered; URLs without
/// an extension are assumed to be pages.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use crawlscribe::url::is_textual_link;
///
/// assert!(is_textual_link(&Url::parse("https://example.com/about").unwrap()));
/// assert!(is_textual_link(&Url::parse("https://example.com/index.html").unwrap()));
/// assert!(!is_textual_link(&Url::parse("https://example.com/logo.PNG").unwrap()));
/// ```
pub fn is_textual_link(url: &Url) -> bool {
    let last_segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("");

    match last_segment.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => {
            let extension = extension.to_ascii_lowercase();
            !NON_TEXTUAL_EXTENSIONS.contains(&extension.as_str())
        }
        _ => true,
    }
}
