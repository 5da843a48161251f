use std::path::PathBuf;
use std::time::Duration;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use thiserror::Error;

use crate::util::{read_limited_bytes, write_atomic, BodyError};

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_IMAGE_SIZE: usize = 20 * 1024 * 1024; // 20MB

/// Errors that can occur while resolving an image into the cache.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Invalid cache filename: {0}")]
    InvalidFilename(String),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP error: {0}")]
    HttpStatus(u16),

    #[error("Download timed out")]
    Timeout,

    #[error("Body error: {0}")]
    Body(#[from] BodyError),

    #[error("Image codec error: {0}")]
    Codec(#[from] image::ImageError),

    #[error("Transcode task failed: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Resize and re-encode parameters applied to every cached image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageOptions {
    /// Shrink (or grow) to fit within the bounds, keeping aspect ratio.
    /// When false the image keeps its original dimensions.
    pub resize: bool,
    pub max_width: u32,
    pub max_height: u32,
    /// JPEG quality, 1-100.
    pub quality: u8,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            resize: true,
            max_width: 800,
            max_height: 600,
            quality: 90,
        }
    }
}

/// Local cache of resized story images, keyed by filename.
///
/// The cache is append-only by filename. A file that already exists is never
/// fetched again, and there is no lock between the existence check and the
/// write: two workers resolving the same name may both download, and the
/// last rename wins. Both write the same content, so the race is harmless.
#[derive(Clone)]
pub struct ImageCache {
    http_client: reqwest::Client,
    images_dir: PathBuf,
    options: ImageOptions,
}

impl ImageCache {
    /// Create a new ImageCache.
    ///
    /// # Arguments
    /// * `http_client` - Shared reqwest client for downloads
    /// * `images_dir` - Directory holding cached images (must exist)
    /// * `options` - Resize/encode parameters
    pub fn new(http_client: reqwest::Client, images_dir: PathBuf, options: ImageOptions) -> Self {
        Self {
            http_client,
            images_dir,
            options,
        }
    }

    /// Makes sure `filename` exists in the cache, downloading `source_url` if needed.
    ///
    /// Returns `true` when the file is present afterwards (cache hit or
    /// successful fetch) and `false` on any failure. Failures are logged at
    /// debug level and never propagated.
    pub async fn ensure_local_image(&self, source_url: &str, filename: &str) -> bool {
        match self.resolve(source_url, filename).await {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(
                    url = %source_url,
                    filename = %filename,
                    error = %e,
                    "Image resize failed"
                );
                false
            }
        }
    }

    async fn resolve(&self, source_url: &str, filename: &str) -> Result<(), ImageError> {
        validate_filename(filename)?;
        let local_path = self.images_dir.join(filename);

        if tokio::fs::try_exists(&local_path).await.unwrap_or(false) {
            tracing::trace!(path = %local_path.display(), "Image already cached");
            return Ok(());
        }

        let bytes = self.download(source_url).await?;

        let options = self.options;
        let encoded = tokio::task::spawn_blocking(move || transcode(&bytes, options))
            .await
            .map_err(|e| ImageError::Task(e.to_string()))??;

        write_atomic(&local_path, &encoded).await?;

        tracing::debug!(path = %local_path.display(), bytes = encoded.len(), "Cached image");
        Ok(())
    }

    async fn download(&self, source_url: &str) -> Result<Vec<u8>, ImageError> {
        let fetch = async {
            let response = self.http_client.get(source_url).send().await?;
            if !response.status().is_success() {
                return Err(ImageError::HttpStatus(response.status().as_u16()));
            }
            Ok(read_limited_bytes(response, MAX_IMAGE_SIZE).await?)
        };

        tokio::time::timeout(DOWNLOAD_TIMEOUT, fetch)
            .await
            .map_err(|_| ImageError::Timeout)?
    }
}

/// Decodes `bytes`, fits the image within the configured bounds and
/// re-encodes it as JPEG.
///
/// CPU-bound; callers on the async runtime should run it via `spawn_blocking`.
pub fn transcode(bytes: &[u8], options: ImageOptions) -> Result<Vec<u8>, ImageError> {
    let decoded = image::load_from_memory(bytes)?;

    let fitted = if options.resize {
        decoded.resize(options.max_width, options.max_height, FilterType::Lanczos3)
    } else {
        decoded
    };

    // JPEG has no alpha channel
    let rgb = fitted.to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, options.quality.clamp(1, 100)).encode_image(&rgb)?;
    Ok(out)
}

/// Rejects names that could escape the cache directory.
fn validate_filename(filename: &str) -> Result<(), ImageError> {
    if filename.is_empty()
        || filename.contains("..")
        || filename.contains('/')
        || filename.contains('\\')
    {
        return Err(ImageError::InvalidFilename(filename.to_owned()));
    }
    Ok(())
}
