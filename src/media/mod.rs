//! Local image cache for story thumbnails.

mod image_cache;

pub use image_cache::{transcode, ImageCache, ImageError, ImageOptions};
