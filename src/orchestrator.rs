//! Fan-out/fan-in of one feed's entries across a bounded worker pool.

use std::sync::Arc;

use futures::stream::{self, StreamExt};

use crate::enrich::{Enricher, EntryOutcome, Story};
use crate::feed::fetch_entries;

/// Drives the enrichment pipeline over every entry of a feed.
pub struct FeedOrchestrator {
    client: reqwest::Client,
    enricher: Arc<Enricher>,
    max_entries: usize,
    workers: usize,
}

impl FeedOrchestrator {
    /// `workers` is clamped to at least one.
    pub fn new(
        client: reqwest::Client,
        enricher: Arc<Enricher>,
        max_entries: usize,
        workers: usize,
    ) -> Self {
        Self {
            client,
            enricher,
            max_entries,
            workers: workers.max(1),
        }
    }

    /// Fetches `feed_url` and enriches its first `max_entries` entries.
    ///
    /// Each entry runs as its own task, at most `workers` at a time. Stories
    /// are returned in completion order once every task has finished. Rejected
    /// entries contribute nothing. A feed that cannot be fetched or parsed
    /// yields an empty batch.
    pub async fn process_feed(&self, feed_url: &str) -> Vec<Story> {
        tracing::debug!(feed = %feed_url, "Processing feed");

        let mut entries = match fetch_entries(&self.client, feed_url).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(feed = %feed_url, error = %e, "Failed to fetch feed");
                return Vec::new();
            }
        };
        entries.truncate(self.max_entries);
        let total = entries.len();

        let outcomes: Vec<EntryOutcome> = stream::iter(entries.into_iter().enumerate())
            .map(|(idx, entry)| {
                let enricher = Arc::clone(&self.enricher);
                async move {
                    let task =
                        tokio::spawn(async move { enricher.enrich(&entry, idx, total).await });
                    match task.await {
                        Ok(outcome) => outcome,
                        Err(e) => EntryOutcome::Failed(e.to_string()),
                    }
                }
            })
            .buffer_unordered(self.workers)
            .collect()
            .await;

        let mut batch = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            match outcome {
                EntryOutcome::Story(story) => batch.push(*story),
                EntryOutcome::Rejected => {}
                EntryOutcome::Failed(reason) => {
                    tracing::debug!(feed = %feed_url, reason = %reason, "Entry worker failed");
                }
            }
        }
        batch
    }
}
