use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Disambiguates temp files created within the same nanosecond by
/// concurrent workers of this process.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Writes `bytes` to `dst` using the write-to-temp-then-rename pattern.
///
/// Readers never observe a partially written file: the content lands in a
/// uniquely named sibling first and is renamed over `dst` once complete. When
/// two writers race on the same `dst`, the last rename wins.
pub async fn write_atomic(dst: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let temp_path = temp_sibling(dst);

    if let Err(e) = tokio::fs::write(&temp_path, bytes).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e);
    }

    // On Windows, rename fails if destination exists
    #[cfg(windows)]
    if tokio::fs::try_exists(dst).await.unwrap_or(false) {
        let _ = tokio::fs::remove_file(dst).await;
    }

    if let Err(e) = tokio::fs::rename(&temp_path, dst).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e);
    }

    Ok(())
}

fn temp_sibling(dst: &Path) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let seq = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut name = dst
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".tmp.{:016x}.{}", nanos, seq));
    dst.with_file_name(name)
}
