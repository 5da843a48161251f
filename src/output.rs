//! Per-feed JSON artifacts.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::enrich::Story;
use crate::util::{content_hash, write_atomic};

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to serialize batch: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// `<hash-of-feed-url>.json`
pub fn output_filename(feed_url: &str) -> String {
    format!("{}.json", content_hash(feed_url))
}

/// Serializes one feed's batch and writes it to `dir` in a single atomic step.
///
/// Returns the path written.
pub async fn write_batch(
    dir: &Path,
    feed_url: &str,
    stories: &[Story],
) -> Result<PathBuf, OutputError> {
    let path = dir.join(output_filename(feed_url));
    let json = serde_json::to_vec(stories)?;
    write_atomic(&path, &json)
        .await
        .map_err(|source| OutputError::Write {
            path: path.clone(),
            source,
        })?;
    Ok(path)
}
