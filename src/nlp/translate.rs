use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const INDEX_TIMEOUT: Duration = Duration::from_secs(30);
const TRANSLATE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum TranslateError {
    /// Request, body included, exceeded its timeout
    #[error("Request timed out")]
    Timeout,
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("No translation package installed for {from} -> {to}")]
    UnsupportedPair { from: String, to: String },
    #[error("Package index lists no usable languages")]
    NothingInstalled,
}

/// Machine translation between language codes.
///
/// Handles are created once per run and shared read-only by every worker.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, from: &str, to: &str) -> Result<String, TranslateError>;
}

#[derive(Debug, Deserialize)]
struct LanguagePackage {
    code: String,
    #[serde(default)]
    targets: Vec<String>,
}

#[derive(Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

/// Client for a LibreTranslate-compatible HTTP translation server.
///
/// Only source languages registered by [`LibreTranslate::install`] are
/// translated; anything else fails with [`TranslateError::UnsupportedPair`].
pub struct LibreTranslate {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<SecretString>,
    installed: BTreeSet<String>,
    timeout: Duration,
}

impl LibreTranslate {
    /// Fetches the server's package index once and installs every requested
    /// source language that can translate into `target`.
    ///
    /// Languages the server does not offer are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Fails when the index cannot be fetched, or when none of the requested
    /// languages are available.
    pub async fn install(
        client: reqwest::Client,
        endpoint: &str,
        api_key: Option<&str>,
        languages: &[String],
        target: &str,
    ) -> Result<Self, TranslateError> {
        let endpoint = endpoint.trim_end_matches('/').to_owned();
        let index = fetch_index(&client, &format!("{}/languages", endpoint), INDEX_TIMEOUT).await?;

        let mut installed = BTreeSet::new();
        for (idx, code) in languages.iter().enumerate() {
            let available = index
                .iter()
                .any(|pkg| pkg.code == *code && pkg.targets.iter().any(|t| t == target));
            if available {
                tracing::info!(
                    "[{}/{}] installed translation package {} -> {}",
                    idx + 1,
                    languages.len(),
                    code,
                    target
                );
                installed.insert(code.clone());
            } else {
                tracing::warn!(language = %code, target = %target, "No translation package available, skipping");
            }
        }

        if installed.is_empty() {
            return Err(TranslateError::NothingInstalled);
        }

        Ok(Self {
            client,
            endpoint,
            api_key: api_key.map(|k| SecretString::from(k.to_owned())),
            installed,
            timeout: TRANSLATE_TIMEOUT,
        })
    }

    /// Source languages this handle can translate from.
    pub fn installed(&self) -> impl Iterator<Item = &str> {
        self.installed.iter().map(String::as_str)
    }
}

#[async_trait]
impl Translator for LibreTranslate {
    async fn translate(&self, text: &str, from: &str, to: &str) -> Result<String, TranslateError> {
        if !self.installed.contains(from) {
            return Err(TranslateError::UnsupportedPair {
                from: from.to_owned(),
                to: to.to_owned(),
            });
        }

        let body = TranslateRequest {
            q: text,
            source: from,
            target: to,
            format: "text",
            api_key: self.api_key.as_ref().map(|k| k.expose_secret()),
        };
        let request = self
            .client
            .post(format!("{}/translate", self.endpoint))
            .json(&body);

        let call = async {
            let response = request.send().await?;
            if !response.status().is_success() {
                return Err(TranslateError::HttpStatus(response.status().as_u16()));
            }
            let parsed: TranslateResponse = response.json().await?;
            Ok(parsed.translated_text)
        };

        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| TranslateError::Timeout)?
    }
}

async fn fetch_index(
    client: &reqwest::Client,
    index_url: &str,
    timeout: Duration,
) -> Result<Vec<LanguagePackage>, TranslateError> {
    let call = async {
        let response = client.get(index_url).send().await?;
        if !response.status().is_success() {
            return Err(TranslateError::HttpStatus(response.status().as_u16()));
        }
        Ok(response.json().await?)
    };

    tokio::time::timeout(timeout, call)
        .await
        .map_err(|_| TranslateError::Timeout)?
}
