//! Sitemap store
//!
//! The durable, scope-filtered set of URLs discovered during a run. The store is
//! shared by discovery and every fetch worker; all access goes through one lock.
//!
//! The file is a standard `urlset` document. Each entry's `lastmod` is the date the
//! file was saved, not the date the page was discovered.

use crate::storage::{write_atomic, StorageError, StorageResult};
use crate::url::{in_scope, normalize_url, PageUrl, Scope};
use chrono::Utc;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// Shared sitemap for one crawl scope
#[derive(Debug)]
pub struct SitemapStore {
    scope: Scope,
    path: PathBuf,
    urls: Mutex<BTreeSet<PageUrl>>,
}

impl SitemapStore {
    /// Creates an empty store that saves to `path`
    pub fn new(scope: Scope, path: impl Into<PathBuf>) -> Self {
        Self {
            scope,
            path: path.into(),
            urls: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Adds a URL if it is in scope
    ///
    /// Returns true if the URL was newly added. Adding the same URL twice, or two
    /// spellings that normalize alike, keeps one entry.
    pub fn add(&self, url: &str) -> bool {
        let url = normalize_url(url);
        if !in_scope(url.as_str(), &self.scope) {
            tracing::trace!(url = %url, "Not adding out-of-scope URL to sitemap");
            return false;
        }
        self.lock().insert(url)
    }

    /// Snapshot of the current URLs in sorted order
    pub fn urls(&self) -> Vec<PageUrl> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Writes the sitemap, replacing any previous file
    ///
    /// Entries are sorted by URL and stamped with today's UTC date.
    pub fn save(&self) -> StorageResult<()> {
        let xml = render_sitemap(&self.urls(), &Utc::now().format("%Y-%m-%d").to_string());
        write_atomic(&self.path, xml.as_bytes())?;
        tracing::info!(path = %self.path.display(), urls = self.len(), "Sitemap saved");
        Ok(())
    }

    /// Reads the saved sitemap, keeping only URLs inside `scope`
    ///
    /// A missing file yields an empty set. URLs saved under a different scope are
    /// dropped silently.
    pub fn load(&self, scope: &Scope) -> StorageResult<BTreeSet<PageUrl>> {
        let xml = match std::fs::read_to_string(&self.path) {
            Ok(xml) => xml,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "No existing sitemap");
                return Ok(BTreeSet::new());
            }
            Err(source) => {
                return Err(StorageError::Io {
                    path: self.path.display().to_string(),
                    source,
                })
            }
        };

        let urls: BTreeSet<PageUrl> = extract_loc_values(&xml)
            .into_iter()
            .map(|loc| normalize_url(&loc))
            .filter(|url| in_scope(url.as_str(), scope))
            .collect();

        tracing::info!(path = %self.path.display(), urls = urls.len(), "Loaded sitemap");
        Ok(urls)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeSet<PageUrl>> {
        self.urls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn render_sitemap(urls: &[PageUrl], lastmod: &str) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str(&format!("<urlset xmlns=\"{SITEMAP_NS}\">\n"));
    for url in urls {
        xml.push_str("  <url>\n");
        xml.push_str(&format!("    <loc>{}</loc>\n", escape(url.as_str())));
        xml.push_str(&format!("    <lastmod>{lastmod}</lastmod>\n"));
        xml.push_str("  </url>\n");
    }
    xml.push_str("</urlset>\n");
    xml
}

/// Text of every complete `<loc>` element, unescaped
///
/// Reading stops at the first malformed event, so a truncated file yields the
/// entries before the damage.
fn extract_loc_values(xml: &str) -> Vec<String> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut out = Vec::new();
    let mut current: Option<String> = None;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"loc" => {
                current = Some(String::new());
            }
            Ok(Event::Text(ref t)) => {
                if let (Some(value), Ok(text)) = (current.as_mut(), t.unescape()) {
                    value.push_str(&text);
                }
            }
            Ok(Event::CData(ref c)) => {
                if let Some(value) = current.as_mut() {
                    value.push_str(&String::from_utf8_lossy(c));
                }
            }
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"loc" => {
                if let Some(value) = current.take() {
                    let value = value.trim();
                    if !value.is_empty() {
                        out.push(value.to_string());
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                tracing::debug!(position = reader.buffer_position(), error = %e, "Sitemap XML ends early");
                break;
            }
            _ => {}
        }
        buf.clear();
    }
    out
}
