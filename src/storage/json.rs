use crate::pipeline::DocumentChunk;
use crate::storage::{write_atomic, ChunkSink, StorageResult};
use std::path::{Path, PathBuf};
use url::Url;

/// Longest sanitized URL prefix used in a file name
const MAX_KEY_LEN: usize = 200;

/// Writes each chunk as a pretty-printed JSON file in one directory
///
/// File names are `{sanitized url}_chunk_{n}.json`.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    output_dir: PathBuf,
}

impl JsonFileSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Full path of the record for chunk `chunk_number` of `url`
    pub fn chunk_path(&self, url: &str, chunk_number: usize) -> PathBuf {
        self.output_dir
            .join(format!("{}_chunk_{}.json", sanitize_url(url), chunk_number))
    }
}

impl ChunkSink for JsonFileSink {
    fn persist(&self, chunk: &DocumentChunk) -> StorageResult<String> {
        let path = self.chunk_path(&chunk.url, chunk.chunk_number);
        let json = serde_json::to_vec_pretty(chunk)?;
        write_atomic(&path, &json)?;
        Ok(path.display().to_string())
    }
}

/// Turns a URL into a file-name-safe key
///
/// Host (with port) and path are joined, every run of non-alphanumeric characters
/// becomes one `_`, edge underscores are trimmed and the result is capped at 200
/// characters.
///
/// ```
/// use doc_trawler::storage::sanitize_url;
///
/// assert_eq!(sanitize_url("https://ex.com/docs/getting-started/"), "ex_com_docs_getting_started");
/// ```
pub fn sanitize_url(url: &str) -> String {
    let raw = match Url::parse(url) {
        Ok(parsed) => {
            let netloc = match (parsed.host_str(), parsed.port()) {
                (Some(host), Some(port)) => format!("{host}:{port}"),
                (Some(host), None) => host.to_string(),
                _ => String::new(),
            };
            format!("{}_{}", netloc, parsed.path().trim_matches('/'))
        }
        Err(_) => url.to_string(),
    };

    let mut key = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            key.push(c);
        } else if !key.ends_with('_') {
            key.push('_');
        }
    }

    let trimmed = key.trim_matches('_');
    trimmed[..trimmed.len().min(MAX_KEY_LEN)].to_string()
}
