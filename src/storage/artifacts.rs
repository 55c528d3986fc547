//! Per-page artifact files on disk
//!
//! Each URL gets a route directory under the output root, named after its
//! route path plus a short hash of its normalized URL, holding at most
//! one `content_*`, one `processed_*` and one `screenshot_*` file plus a
//! `links.json` manifest. The content file is written last, so its
//! presence means every other artifact of that page is complete.

use crate::storage::traits::{StorageError, StorageResult};
use crate::url::CrawlTarget;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const CONTENT_PREFIX: &str = "content_";
const PROCESSED_PREFIX: &str = "processed_";
const SCREENSHOT_PREFIX: &str = "screenshot_";
const LINKS_FILE: &str = "links.json";
const KEY_HASH_LEN: usize = 8;

/// Where one attempt at a page writes its artifacts
#[derive(Debug, Clone)]
pub struct PagePaths {
    pub dir: PathBuf,
    pub content: PathBuf,
    pub processed: PathBuf,
    /// Requested capture path; drivers may change the extension
    pub screenshot: PathBuf,
    pub links: PathBuf,
}

/// Artifacts left behind by an earlier, completed attempt
#[derive(Debug, Clone)]
pub struct StoredPage {
    pub content_path: PathBuf,
    pub processed_content_path: PathBuf,
    pub screenshot_paths: Vec<PathBuf>,
    /// Same-origin links recorded when the page was processed
    pub links: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of `target`'s artifacts
    ///
    /// Route paths are lossy (`/a-b` and `/a/b` both become `a-b`), so the
    /// name carries a prefix of the key's SHA-256 to keep URLs apart.
    pub fn route_dir(&self, target: &CrawlTarget) -> PathBuf {
        let digest = hex::encode(Sha256::digest(target.key().as_bytes()));
        self.root
            .join(format!("{}-{}", target.route(), &digest[..KEY_HASH_LEN]))
    }

    /// Looks for a completed earlier attempt at `target`
    pub async fn existing(&self, target: &CrawlTarget) -> StorageResult<Option<StoredPage>> {
        let dir = self.route_dir(target);
        let mut listing = match tokio::fs::read_dir(&dir).await {
            Ok(listing) => listing,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::io(&dir, e)),
        };

        let mut content = Vec::new();
        let mut processed = Vec::new();
        let mut screenshots = Vec::new();
        let mut links_path = None;

        while let Some(entry) = listing
            .next_entry()
            .await
            .map_err(|e| StorageError::io(&dir, e))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            let path = entry.path();
            if name.starts_with(CONTENT_PREFIX) {
                content.push(path);
            } else if name.starts_with(PROCESSED_PREFIX) {
                processed.push(path);
            } else if name.starts_with(SCREENSHOT_PREFIX) {
                screenshots.push(path);
            } else if name == LINKS_FILE {
                links_path = Some(path);
            }
        }

        content.sort();
        processed.sort();
        screenshots.sort();

        let Some(content_path) = content.pop() else {
            return Ok(None);
        };
        let processed_content_path = processed.pop().unwrap_or_else(|| content_path.clone());

        let links = match links_path {
            Some(path) => read_links(&path).await,
            None => Vec::new(),
        };

        let completed_at = tokio::fs::metadata(&content_path)
            .await
            .and_then(|meta| meta.modified())
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        debug!(url = %target, path = %content_path.display(), "Found completed artifacts");

        Ok(Some(StoredPage {
            content_path,
            processed_content_path,
            screenshot_paths: screenshots,
            links,
            completed_at,
        }))
    }

    /// Creates the route directory and clears leftovers of an interrupted attempt
    pub async fn prepare(&self, target: &CrawlTarget) -> StorageResult<PagePaths> {
        let dir = self.route_dir(target);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StorageError::io(&dir, e))?;

        let mut listing = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| StorageError::io(&dir, e))?;
        while let Some(entry) = listing
            .next_entry()
            .await
            .map_err(|e| StorageError::io(&dir, e))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            let stale = name.starts_with(PROCESSED_PREFIX)
                || name.starts_with(SCREENSHOT_PREFIX)
                || name == LINKS_FILE;
            if stale {
                let path = entry.path();
                tokio::fs::remove_file(&path)
                    .await
                    .map_err(|e| StorageError::io(&path, e))?;
            }
        }

        let stamp = Utc::now().format("%Y%m%d%H%M%S%3f").to_string();
        Ok(PagePaths {
            content: dir.join(format!("{}{}.txt", CONTENT_PREFIX, stamp)),
            processed: dir.join(format!("{}{}.txt", PROCESSED_PREFIX, stamp)),
            screenshot: dir.join(format!("{}{}.png", SCREENSHOT_PREFIX, stamp)),
            links: dir.join(LINKS_FILE),
            dir,
        })
    }

    pub async fn write_text(&self, path: &Path, text: &str) -> StorageResult<()> {
        tokio::fs::write(path, text)
            .await
            .map_err(|e| StorageError::io(path, e))
    }

    pub async fn write_links(&self, path: &Path, links: &[String]) -> StorageResult<()> {
        let json = serde_json::to_string_pretty(links)?;
        self.write_text(path, &json).await
    }
}

async fn read_links(path: &Path) -> Vec<String> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(path = %path.display(), "Could not read link manifest: {}", e);
            return Vec::new();
        }
    };

    serde_json::from_str(&raw).unwrap_or_else(|e| {
        warn!(path = %path.display(), "Ignoring malformed link manifest: {}", e);
        Vec::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn target(url: &str) -> CrawlTarget {
        CrawlTarget::parse(url).unwrap()
    }

    #[tokio::test]
    async fn test_no_directory_means_no_artifacts() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());

        let found = store
            .existing(&target("https://example.com/a"))
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_prepare_uses_route_directory() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());

        let paths = store
            .prepare(&target("https://example.com/docs/intro"))
            .await
            .unwrap();

        let name = paths.dir.file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(paths.dir.parent().unwrap(), dir.path());
        assert!(name.starts_with("docs-intro-"));
        assert_eq!(name.len(), "docs-intro-".len() + 8);
        assert!(paths.dir.is_dir());
        let name = paths.content.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("content_") && name.ends_with(".txt"));
    }

    #[tokio::test]
    async fn test_completed_page_is_found() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        let page = target("https://example.com");

        let paths = store.prepare(&page).await.unwrap();
        store.write_text(&paths.processed, "summary").await.unwrap();
        store
            .write_links(&paths.links, &["https://example.com/a".to_string()])
            .await
            .unwrap();
        store.write_text(&paths.content, "raw").await.unwrap();

        let found = store.existing(&page).await.unwrap().unwrap();
        assert_eq!(found.content_path, paths.content);
        assert_eq!(found.processed_content_path, paths.processed);
        assert_eq!(found.links, vec!["https://example.com/a".to_string()]);
    }

    #[tokio::test]
    async fn test_partial_attempt_is_not_complete() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        let page = target("https://example.com/partial");

        let paths = store.prepare(&page).await.unwrap();
        store.write_text(&paths.processed, "summary").await.unwrap();

        assert!(store.existing(&page).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_prepare_removes_stale_files() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        let page = target("https://example.com/retry");

        let first = store.prepare(&page).await.unwrap();
        store.write_text(&first.processed, "old").await.unwrap();
        store.write_text(&first.screenshot, "old").await.unwrap();

        let second = store.prepare(&page).await.unwrap();
        let remaining = std::fs::read_dir(&second.dir).unwrap().count();
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn test_malformed_manifest_ignored() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        let page = target("https://example.com/m");

        let paths = store.prepare(&page).await.unwrap();
        store.write_text(&paths.links, "not json").await.unwrap();
        store.write_text(&paths.content, "raw").await.unwrap();

        let found = store.existing(&page).await.unwrap().unwrap();
        assert!(found.links.is_empty());
        assert_eq!(found.processed_content_path, paths.content);
    }

    #[tokio::test]
    async fn test_colliding_routes_get_separate_directories() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        let dashed = target("https://example.com/a-b");
        let nested = target("https://example.com/a/b");
        assert_eq!(dashed.route(), nested.route());

        let first = store.prepare(&dashed).await.unwrap();
        store.write_text(&first.content, "dashed").await.unwrap();
        let second = store.prepare(&nested).await.unwrap();
        store.write_text(&second.content, "nested").await.unwrap();

        assert_ne!(first.dir, second.dir);
        let found = store.existing(&dashed).await.unwrap().unwrap();
        assert_eq!(std::fs::read_to_string(found.content_path).unwrap(), "dashed");
        let found = store.existing(&nested).await.unwrap().unwrap();
        assert_eq!(std::fs::read_to_string(found.content_path).unwrap(), "nested");
    }

    #[test]
    fn test_route_dir_is_stable() {
        let store = ArtifactStore::new("/out");
        let page = target("https://example.com/docs");
        assert_eq!(store.route_dir(&page), store.route_dir(&page));
        assert_ne!(
            store.route_dir(&page),
            store.route_dir(&target("https://example.com/docs?page=2"))
        );
    }
}
