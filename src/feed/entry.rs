use std::collections::BTreeSet;

/// A `<link>` (Atom) or `<enclosure>` (RSS) attached to an entry.
///
/// RSS enclosures are recorded with `rel = "enclosure"` so both dialects can
/// be searched the same way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawLink {
    pub href: Option<String>,
    pub rel: Option<String>,
    pub media_type: Option<String>,
}

impl RawLink {
    /// Returns the href when this link has the given relation and media type.
    pub fn href_if(&self, rel: &str, media_type: &str) -> Option<&str> {
        match (&self.rel, &self.media_type, &self.href) {
            (Some(r), Some(t), Some(href)) if r == rel && t == media_type => Some(href),
            _ => None,
        }
    }
}

/// A `media:thumbnail` or `media:content` reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaRef {
    pub url: Option<String>,
    pub media_type: Option<String>,
}

/// One item of a fetched feed, prior to enrichment.
///
/// Only the fields the enrichment pipeline reads are modelled. `keys` holds
/// the name of every element found directly under the item, with namespace
/// prefixes folded into the name (`itunes:duration` becomes
/// `itunes_duration`), which is what podcast detection looks at.
#[derive(Debug, Clone, Default)]
pub struct RawEntry {
    pub link: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub published: Option<String>,
    pub links: Vec<RawLink>,
    pub media_thumbnail: Vec<MediaRef>,
    pub media_content: Vec<MediaRef>,
    pub keys: BTreeSet<String>,
}

impl RawEntry {
    /// True when any recorded key starts with `prefix`.
    pub fn has_key_prefix(&self, prefix: &str) -> bool {
        self.keys.iter().any(|key| key.starts_with(prefix))
    }
}
