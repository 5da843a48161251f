use std::sync::Arc;

use chrono::Utc;
use url::Url;

use crate::feed::RawEntry;
use crate::media::ImageCache;
use crate::nlp::{Entity, EntityExtractor, LanguageDetector, TranslateError, Translator};
use crate::util::{content_hash, format_ago, parse_published, truncate_chars};

use super::extract::{clean_text, extract_image_url, extract_podcast_url};
use super::story::{Localized, Published, Story, StoryKind};

/// Element-name prefix that marks an entry as a podcast episode.
const PODCAST_KEY_PREFIX: &str = "itunes";
const ENGLISH: &str = "en";
const PROGRESS_TITLE_CHARS: usize = 50;

/// Switches that gate the network-bound story enrichments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrichOptions {
    pub fetch_images: bool,
    pub og_images: bool,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            fetch_images: true,
            og_images: true,
        }
    }
}

/// Language capabilities, initialized once per run and shared by every worker.
///
/// `translator` and `ner` are `Some` exactly when the feature is enabled.
#[derive(Clone)]
pub struct Capabilities {
    pub detector: Arc<dyn LanguageDetector>,
    pub translator: Option<Arc<dyn Translator>>,
    pub ner: Option<Arc<dyn EntityExtractor>>,
}

/// Result of one unit of work in the worker pool.
#[derive(Debug)]
pub enum EntryOutcome {
    Story(Box<Story>),
    /// The entry had no link and was dropped before enrichment.
    Rejected,
    /// The worker died before producing a result.
    Failed(String),
}

impl EntryOutcome {
    pub fn into_story(self) -> Option<Story> {
        match self {
            EntryOutcome::Story(story) => Some(*story),
            EntryOutcome::Rejected | EntryOutcome::Failed(_) => None,
        }
    }
}

/// Turns raw feed entries into [`Story`] records.
///
/// Every stage after admission is isolated: a failure is logged at debug
/// level, the fields that stage owns are left `None`, and later stages still
/// run. Nothing escapes [`Enricher::enrich`] as an error.
pub struct Enricher {
    client: reqwest::Client,
    images: ImageCache,
    options: EnrichOptions,
    caps: Capabilities,
}

impl Enricher {
    pub fn new(
        client: reqwest::Client,
        images: ImageCache,
        options: EnrichOptions,
        caps: Capabilities,
    ) -> Self {
        Self {
            client,
            images,
            options,
            caps,
        }
    }

    /// Enriches one entry. `idx` and `total` only feed the progress line.
    pub async fn enrich(&self, entry: &RawEntry, idx: usize, total: usize) -> EntryOutcome {
        // Admission
        let Some(link) = entry.link.clone() else {
            tracing::debug!(idx, "Entry has no link, skipping");
            return EntryOutcome::Rejected;
        };

        // Identity
        let guid = content_hash(&link);
        let source = source_of(&link);

        // Text normalization
        let mut title = Localized {
            origin: clean_text(entry.title.as_deref(), "title"),
            en: None,
        };
        let mut summary = Localized {
            origin: clean_text(entry.summary.as_deref(), "summary"),
            en: None,
        };

        let published = published_block(entry.published.as_deref());

        let kind = if entry.has_key_prefix(PODCAST_KEY_PREFIX) {
            StoryKind::Podcast
        } else {
            StoryKind::Story
        };

        tracing::info!(
            "[{}/{}] {} :: {} > {}",
            idx + 1,
            total,
            kind_label(kind),
            source,
            truncate_chars(entry.title.as_deref().unwrap_or_default(), PROGRESS_TITLE_CHARS)
        );

        let mut podcast_url = None;
        let mut image_filename = None;
        match kind {
            StoryKind::Podcast => podcast_url = extract_podcast_url(entry),
            StoryKind::Story => image_filename = self.resolve_image(entry, &guid).await,
        }

        let origin_language = self.detect_language(&title, &summary);

        match origin_language.as_deref() {
            Some(ENGLISH) => {
                title.en = title.origin.clone();
                summary.en = summary.origin.clone();
            }
            lang => {
                if let Some(translator) = &self.caps.translator {
                    match translate_pair(translator.as_ref(), &title, &summary, lang).await {
                        Ok((title_en, summary_en)) => {
                            title.en = Some(title_en);
                            summary.en = Some(summary_en);
                        }
                        Err(e) => {
                            tracing::debug!(link = %link, error = %e, "Translation failed");
                        }
                    }
                }
            }
        }

        let ner = self.extract_entities(&title, &summary).await;

        EntryOutcome::Story(Box::new(Story {
            guid,
            link,
            title,
            summary,
            published,
            ner,
            image_filename,
            podcast_url,
            source,
            kind,
            origin_language,
        }))
    }

    async fn resolve_image(&self, entry: &RawEntry, guid: &str) -> Option<String> {
        if !self.options.fetch_images {
            return None;
        }
        let image_url = extract_image_url(&self.client, entry, self.options.og_images).await?;
        let filename = format!("{}.jpg", guid);
        self.images
            .ensure_local_image(&image_url, &filename)
            .await
            .then_some(filename)
    }

    fn detect_language(&self, title: &Localized, summary: &Localized) -> Option<String> {
        let (Some(t), Some(s)) = (non_empty(&title.origin), non_empty(&summary.origin)) else {
            return None;
        };
        match self.caps.detector.detect(&format!("{} {}", t, s)) {
            Ok(lang) => Some(lang),
            Err(e) => {
                tracing::debug!(error = %e, "Language detection failed");
                None
            }
        }
    }

    async fn extract_entities(&self, title: &Localized, summary: &Localized) -> Option<Vec<Entity>> {
        let ner = self.caps.ner.as_ref()?;
        let (Some(t), Some(s)) = (non_empty(&title.en), non_empty(&summary.en)) else {
            return None;
        };
        match ner.extract(&format!("{} {}", t, s)).await {
            Ok(entities) => Some(entities),
            Err(e) => {
                tracing::debug!(error = %e, "Entity extraction failed");
                None
            }
        }
    }
}

/// Translates title and summary independently; either failing fails both.
async fn translate_pair(
    translator: &dyn Translator,
    title: &Localized,
    summary: &Localized,
    lang: Option<&str>,
) -> Result<(String, String), TranslateError> {
    let unsupported = || TranslateError::UnsupportedPair {
        from: lang.unwrap_or("unknown").to_owned(),
        to: ENGLISH.to_owned(),
    };
    let (Some(from), Some(t), Some(s)) = (lang, title.origin.as_deref(), summary.origin.as_deref())
    else {
        return Err(unsupported());
    };

    let title_en = translator.translate(t, from, ENGLISH).await?;
    let summary_en = translator.translate(s, from, ENGLISH).await?;
    Ok((title_en, summary_en))
}

/// Missing timestamp: empty block. Unparseable timestamp: no block at all.
fn published_block(raw: Option<&str>) -> Option<Published> {
    let Some(raw) = raw.filter(|s| !s.is_empty()) else {
        return Some(Published::default());
    };
    match parse_published(raw) {
        Ok(dt) => Some(Published {
            dt: Some(raw.to_owned()),
            ago: Some(format_ago(dt, Utc::now())),
        }),
        Err(e) => {
            tracing::debug!(error = %e, "Failed to parse published date");
            None
        }
    }
}

/// Network location of a link as written: userinfo, host and any explicit
/// port, default ports included.
fn source_of(link: &str) -> String {
    let link = link.trim();
    if Url::parse(link).is_err() {
        return String::new();
    }
    let Some((_, rest)) = link.split_once("://") else {
        return String::new();
    };
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    rest[..end].to_owned()
}

fn non_empty(text: &Option<String>) -> Option<&str> {
    text.as_deref().filter(|s| !s.is_empty())
}

fn kind_label(kind: StoryKind) -> &'static str {
    match kind {
        StoryKind::Story => "story",
        StoryKind::Podcast => "podcast",
    }
}
