//! Per-entry enrichment: field extraction, the staged pipeline, and the
//! [`Story`] record it produces.

pub mod extract;
pub mod opengraph;
pub mod pipeline;
pub mod story;

pub use extract::{clean_text, extract_feed_image_url, extract_image_url, extract_podcast_url};
pub use opengraph::{fetch_og_image, find_og_image, OpenGraphError};
pub use pipeline::{Capabilities, EnrichOptions, Enricher, EntryOutcome};
pub use story::{Localized, Published, Story, StoryKind};
