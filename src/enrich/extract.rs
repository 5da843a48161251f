//! Field extractors: pull the podcast audio URL, an image URL and cleaned
//! text out of one raw entry.

use crate::feed::RawEntry;
use crate::util::to_plain_text;

use super::opengraph::fetch_og_image;

const AUDIO_MIME: &str = "audio/mpeg";
const IMAGE_MIME: &str = "image/jpeg";
const ENCLOSURE: &str = "enclosure";

/// Href of the first `enclosure` link with an audio MIME type.
pub fn extract_podcast_url(entry: &RawEntry) -> Option<String> {
    entry
        .links
        .iter()
        .find_map(|link| link.href_if(ENCLOSURE, AUDIO_MIME))
        .map(str::to_owned)
}

/// Image URL found in the entry's own fields, in tier order: first
/// thumbnail, first media content, first image enclosure.
pub fn extract_feed_image_url(entry: &RawEntry) -> Option<String> {
    if let Some(url) = entry.media_thumbnail.first().and_then(|m| m.url.clone()) {
        return Some(url);
    }
    if let Some(url) = entry.media_content.first().and_then(|m| m.url.clone()) {
        return Some(url);
    }
    entry
        .links
        .iter()
        .find_map(|link| link.href_if(ENCLOSURE, IMAGE_MIME))
        .map(str::to_owned)
}

/// Image URL for a story, falling back to the article page's OpenGraph
/// image when `og_fallback` is set.
///
/// A failed page scrape is logged at debug level and yields `None`.
pub async fn extract_image_url(
    client: &reqwest::Client,
    entry: &RawEntry,
    og_fallback: bool,
) -> Option<String> {
    if let Some(url) = extract_feed_image_url(entry) {
        return Some(url);
    }
    if !og_fallback {
        return None;
    }

    let page_url = entry.link.as_deref()?;
    match fetch_og_image(client, page_url).await {
        Ok(found) => found,
        Err(e) => {
            tracing::debug!(url = %page_url, error = %e, "OpenGraph lookup failed");
            None
        }
    }
}

/// Runs a title or summary through the HTML sanitizer.
///
/// Missing or empty input stays absent, and so does input the sanitizer
/// rejects.
pub fn clean_text(raw: Option<&str>, field: &'static str) -> Option<String> {
    let raw = raw.filter(|s| !s.is_empty())?;
    match to_plain_text(raw) {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::debug!(field, error = %e, "Failed to clean text");
            None
        }
    }
}
