//! Run controller: startup checks, one-time capability initialization, and
//! the sequential loop over feeds.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::redirect::Policy;

use crate::config::Config;
use crate::enrich::{Capabilities, EnrichOptions, Enricher};
use crate::media::{ImageCache, ImageOptions};
use crate::nlp::{InferenceNer, LibreTranslate, WhatlangDetector};
use crate::orchestrator::FeedOrchestrator;
use crate::output::write_batch;
use crate::util::USER_AGENT;

const MAX_REDIRECTS: usize = 5;
/// Upper bound for any single request. Each call site applies its own
/// shorter limit on top.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// What one feed produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedReport {
    pub feed_url: String,
    pub stories: usize,
    pub path: PathBuf,
}

/// Owns the validated configuration and the shared HTTP client for a run.
pub struct Runner {
    config: Config,
    client: reqwest::Client,
    feeds: Vec<String>,
}

impl Runner {
    /// Validates `config`, creates the output tree and reads the feed list.
    ///
    /// # Errors
    ///
    /// Fails on a missing input file, NER without translation, invalid image
    /// settings, or when the output directory cannot be created.
    pub fn prepare(config: Config) -> Result<Self> {
        config.validate()?;

        let images_dir = config.images_dir();
        std::fs::create_dir_all(&images_dir).with_context(|| {
            format!("Failed to create output directory '{}'", images_dir.display())
        })?;

        let feeds = read_feed_list(&config.input_feeds)?;
        let client = build_http_client()?;

        Ok(Self {
            config,
            client,
            feeds,
        })
    }

    pub fn feeds(&self) -> &[String] {
        &self.feeds
    }

    /// Installs translation packages and loads the NER model, once, before
    /// any feed is processed. Disabled features stay `None`.
    pub async fn initialize_capabilities(&self) -> Result<Capabilities> {
        let translation = &self.config.translation;
        let translator = if translation.enabled {
            tracing::info!(endpoint = %translation.endpoint, "Updating translation models");
            let t = LibreTranslate::install(
                self.client.clone(),
                &translation.endpoint,
                translation.api_key.as_deref(),
                &translation.languages,
                "en",
            )
            .await
            .context("Failed to initialize translation")?;
            Some(Arc::new(t) as Arc<dyn crate::nlp::Translator>)
        } else {
            None
        };

        let ner_config = &self.config.ner;
        let ner = if ner_config.enabled {
            let n = InferenceNer::load(
                self.client.clone(),
                &ner_config.endpoint,
                &ner_config.model,
                ner_config.api_token.as_deref(),
            )
            .await
            .context("Failed to load NER model")?;
            Some(Arc::new(n) as Arc<dyn crate::nlp::EntityExtractor>)
        } else {
            None
        };

        Ok(Capabilities {
            detector: Arc::new(WhatlangDetector),
            translator,
            ner,
        })
    }

    /// Processes every feed, one after another, with the given capabilities.
    ///
    /// Feed failures produce an empty batch and the run continues. Only a
    /// failure to write an output file aborts the run.
    pub async fn run_with(&self, caps: Capabilities) -> Result<Vec<FeedReport>> {
        let images = &self.config.images;
        let cache = ImageCache::new(
            self.client.clone(),
            self.config.images_dir(),
            ImageOptions {
                resize: images.resize,
                max_width: images.width,
                max_height: images.height,
                quality: images.quality,
            },
        );
        let enricher = Arc::new(Enricher::new(
            self.client.clone(),
            cache,
            EnrichOptions {
                fetch_images: images.fetch,
                og_images: images.og_fallback,
            },
            caps,
        ));
        let orchestrator = FeedOrchestrator::new(
            self.client.clone(),
            enricher,
            self.config.max_entries,
            self.config.workers,
        );

        let mut reports = Vec::with_capacity(self.feeds.len());
        for feed_url in &self.feeds {
            let stories = orchestrator.process_feed(feed_url).await;
            let path = write_batch(&self.config.output_dir, feed_url, &stories)
                .await
                .with_context(|| format!("Failed to write output for {}", feed_url))?;

            tracing::info!(
                feed = %feed_url,
                stories = stories.len(),
                path = %path.display(),
                "Feed done"
            );
            reports.push(FeedReport {
                feed_url: feed_url.clone(),
                stories: stories.len(),
                path,
            });
        }
        Ok(reports)
    }

    pub async fn run(&self) -> Result<Vec<FeedReport>> {
        let caps = self.initialize_capabilities().await?;
        self.run_with(caps).await
    }
}

/// One URL per line; surrounding whitespace trimmed, blank lines skipped.
pub fn read_feed_list(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read feed list '{}'", path.display()))?;
    let feeds: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect();

    tracing::info!(count = feeds.len(), "Feeds:");
    for feed in &feeds {
        tracing::info!("  - {}", feed);
    }
    Ok(feeds)
}

fn build_http_client() -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .redirect(create_redirect_policy())
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Duration::from_secs(30))
        .tcp_keepalive(Duration::from_secs(60))
        .build()
        .context("Failed to build HTTP client")?;
    Ok(client)
}

fn create_redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error("Too many redirects");
        }

        let url = attempt.url();
        if attempt.previous().iter().any(|prev| prev.as_str() == url.as_str()) {
            return attempt.error("Redirect loop detected");
        }

        tracing::trace!(
            to = %url,
            hop = attempt.previous().len() + 1,
            "Following redirect"
        );
        attempt.follow()
    })
}
