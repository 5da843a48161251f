use std::time::Duration;

use scraper::{Html, Selector};
use thiserror::Error;

use crate::util::{read_limited_bytes, BodyError};

const PAGE_TIMEOUT: Duration = Duration::from_secs(1);
const MAX_PAGE_SIZE: usize = 2 * 1024 * 1024; // 2MB

#[derive(Debug, Error)]
pub enum OpenGraphError {
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Page request timed out")]
    Timeout,
    #[error("Body error: {0}")]
    Body(#[from] BodyError),
    #[error("Selector error: {0}")]
    Selector(String),
}

/// Fetches an article page and returns its `og:image` URL, if it has one.
///
/// The whole request, body included, is bounded by a one second timeout.
pub async fn fetch_og_image(
    client: &reqwest::Client,
    page_url: &str,
) -> Result<Option<String>, OpenGraphError> {
    let fetch = async {
        let response = client.get(page_url).send().await?;
        Ok::<_, OpenGraphError>(read_limited_bytes(response, MAX_PAGE_SIZE).await?)
    };

    let bytes = tokio::time::timeout(PAGE_TIMEOUT, fetch)
        .await
        .map_err(|_| OpenGraphError::Timeout)??;

    find_og_image(&String::from_utf8_lossy(&bytes))
}

/// First `<meta property="og:image">` with non-empty content.
pub fn find_og_image(html: &str) -> Result<Option<String>, OpenGraphError> {
    let document = Html::parse_document(html);
    let meta_selector =
        Selector::parse("meta[property]").map_err(|e| OpenGraphError::Selector(e.to_string()))?;

    let found = document
        .select(&meta_selector)
        .filter(|meta| meta.value().attr("property") == Some("og:image"))
        .filter_map(|meta| meta.value().attr("content"))
        .map(str::trim)
        .find(|content| !content.is_empty())
        .map(str::to_owned);

    Ok(found)
}
