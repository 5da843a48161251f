use std::time::Duration;

use thiserror::Error;
use url::Url;

use super::entry::RawEntry;
use super::parser::{parse_entries, ParseError};
use crate::util::{read_limited_bytes, BodyError};

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors that can occur while retrieving a feed.
///
/// Every variant is terminal for the feed: fetches are single-attempt and the
/// caller turns any of these into an empty batch.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Feed location is neither an http(s) URL nor a readable local path
    #[error("Invalid feed location: {0}")]
    InvalidLocation(String),
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the 30-second timeout, body included
    #[error("Request timed out")]
    Timeout,
    /// Body could not be read in full or exceeded 10MB
    #[error("Body error: {0}")]
    Body(#[from] BodyError),
    /// Local feed file could not be read
    #[error("Failed to read feed file: {0}")]
    Io(#[from] std::io::Error),
    /// Feed XML could not be parsed as RSS or Atom
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
}

/// Fetches a feed and parses it into raw entries, in document order.
///
/// `location` is normally an http(s) URL. `file://` URLs and plain filesystem
/// paths are read from disk, which is handy for archived feeds.
///
/// # Errors
///
/// Returns [`FetchError`] on network failure, non-2xx status, timeout,
/// oversized body, unreadable file or unparseable XML. There is no retry.
pub async fn fetch_entries(
    client: &reqwest::Client,
    location: &str,
) -> Result<Vec<RawEntry>, FetchError> {
    let bytes = match Url::parse(location) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {
            fetch_bytes(client, url, FETCH_TIMEOUT).await?
        }
        Ok(url) if url.scheme() == "file" => {
            let path = url
                .to_file_path()
                .map_err(|_| FetchError::InvalidLocation(location.to_owned()))?;
            read_local(&path).await?
        }
        Ok(url) => {
            return Err(FetchError::InvalidLocation(format!(
                "unsupported scheme {}",
                url.scheme()
            )))
        }
        Err(_) => read_local(std::path::Path::new(location)).await?,
    };

    let entries = parse_entries(&bytes)?;
    tracing::debug!(feed = %location, entries = entries.len(), "Parsed feed");
    Ok(entries)
}

async fn fetch_bytes(
    client: &reqwest::Client,
    url: Url,
    timeout: Duration,
) -> Result<Vec<u8>, FetchError> {
    let fetch = async {
        let response = client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }
        Ok(read_limited_bytes(response, MAX_FEED_SIZE).await?)
    };

    tokio::time::timeout(timeout, fetch)
        .await
        .map_err(|_| FetchError::Timeout)?
}

async fn read_local(path: &std::path::Path) -> Result<Vec<u8>, FetchError> {
    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > MAX_FEED_SIZE as u64 {
        return Err(FetchError::Body(BodyError::TooLarge));
    }
    Ok(tokio::fs::read(path).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const VALID_RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <item><guid>1</guid><title>Test</title><link>https://a.test/1</link></item>
</channel></rss>"#;

    #[tokio::test]
    async fn test_fetch_success() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(VALID_RSS)
                    .insert_header("Content-Type", "application/xml"),
            )
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let entries = fetch_entries(&client, &format!("{}/feed", mock_server.uri()))
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].link.as_deref(), Some("https://a.test/1"));
    }

    #[tokio::test]
    async fn test_fetch_404_is_single_attempt() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let result = fetch_entries(&client, &format!("{}/feed", mock_server.uri())).await;
        match result {
            Err(FetchError::HttpStatus(404)) => {}
            other => panic!("Expected HttpStatus(404), got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_500_not_retried() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let result = fetch_entries(&client, &mock_server.uri()).await;
        assert!(matches!(result, Err(FetchError::HttpStatus(500))));
    }

    #[tokio::test]
    async fn test_malformed_feed_parse_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<not valid xml"))
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let result = fetch_entries(&client, &mock_server.uri()).await;
        match result {
            Err(FetchError::Parse(_)) => {}
            other => panic!("Expected Parse error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stalled_body_times_out() {
        let uri = crate::util::serve_stalled_body().await;

        let client = reqwest::Client::new();
        let started = std::time::Instant::now();
        let result = fetch_bytes(
            &client,
            Url::parse(&uri).unwrap(),
            Duration::from_millis(300),
        )
        .await;

        assert!(matches!(result, Err(FetchError::Timeout)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_fetch_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let feed_path = dir.path().join("feed.xml");
        std::fs::write(&feed_path, VALID_RSS).unwrap();

        let client = reqwest::Client::new();
        let by_path = fetch_entries(&client, feed_path.to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(by_path.len(), 1);

        let file_url = Url::from_file_path(&feed_path).unwrap();
        let by_url = fetch_entries(&client, file_url.as_str()).await.unwrap();
        assert_eq!(by_url.len(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_scheme() {
        let client = reqwest::Client::new();
        let result = fetch_entries(&client, "ftp://example.com/feed.xml").await;
        assert!(matches!(result, Err(FetchError::InvalidLocation(_))));
    }

    #[tokio::test]
    async fn test_missing_local_file() {
        let client = reqwest::Client::new();
        let result = fetch_entries(&client, "/definitely/not/here/feed.xml").await;
        assert!(matches!(result, Err(FetchError::Io(_))));
    }
}
