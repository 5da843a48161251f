use serde::{Deserialize, Serialize};

use crate::nlp::Entity;

/// Whether an entry is an article or a podcast episode.
///
/// Decided once from the entry's element names and never revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoryKind {
    Story,
    Podcast,
}

/// Original-language text alongside its English rendering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Localized {
    pub origin: Option<String>,
    pub en: Option<String>,
}

/// Raw publication timestamp plus a relative rendering ("3 days ago").
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Published {
    pub dt: Option<String>,
    pub ago: Option<String>,
}

/// The enriched record produced for one admitted feed entry.
///
/// Absent fields serialize as `null` rather than being skipped, so every
/// record in an output file has the same shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub guid: String,
    pub link: String,
    pub title: Localized,
    pub summary: Localized,
    /// `None` when the entry carried a timestamp that could not be parsed.
    pub published: Option<Published>,
    pub ner: Option<Vec<Entity>>,
    pub image_filename: Option<String>,
    pub podcast_url: Option<String>,
    pub source: String,
    #[serde(rename = "type")]
    pub kind: StoryKind,
    pub origin_language: Option<String>,
}
