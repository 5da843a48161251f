use futures::StreamExt;
use thiserror::Error;

/// Errors raised while draining a response body.
#[derive(Debug, Error)]
pub enum BodyError {
    /// Connection dropped or TLS failure mid-body
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// Body exceeded the caller's size limit
    #[error("Response too large")]
    TooLarge,
    /// Received fewer bytes than Content-Length announced
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    Incomplete { expected: u64, received: usize },
}

/// Reads a response body into memory, refusing anything larger than `limit`.
///
/// Checks `Content-Length` up front when the server sends it, then enforces
/// the limit again while streaming so a lying or absent header cannot cause
/// unbounded buffering.
pub async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, BodyError> {
    let expected_length = response.content_length();

    if let Some(len) = expected_length {
        if len as usize > limit {
            return Err(BodyError::TooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(BodyError::TooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(BodyError::Incomplete {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}

/// Local server that answers every request with headers and a partial body,
/// then holds the connection open without sending the rest.
#[cfg(test)]
pub(crate) async fn serve_stalled_body() -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut request = [0u8; 8192];
                let _ = socket.read(&mut request).await;
                let _ = socket
                    .write_all(
                        b"HTTP/1.1 200 OK\r\n\
                          Content-Type: application/json\r\n\
                          Content-Length: 1000\r\n\r\n[",
                    )
                    .await;
                std::future::pending::<()>().await;
            });
        }
    });
    format!("http://{}", addr)
}
