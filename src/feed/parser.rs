use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

use super::entry::{MediaRef, RawEntry, RawLink};

/// SEC-003: Maximum element nesting inside a single item.
const MAX_ENTRY_DEPTH: usize = 64;

#[derive(Debug, Error)]
pub enum ParseError {
    /// XML was malformed.
    #[error("XML parse error: {0}")]
    Xml(String),
    /// Well-formed XML whose root is not `rss`, `feed` or `rdf:RDF`.
    #[error("not an RSS or Atom document")]
    NotAFeed,
    /// SEC-003: Item nesting exceeds safety limit.
    #[error("entry nesting depth exceeds maximum of {0} levels")]
    MaxDepthExceeded(usize),
}

/// Text-bearing children of an item that land in [`RawEntry`] fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextField {
    Title,
    Link,
    Summary,
    Content,
    Published,
    Updated,
}

/// Accumulates one `<item>`/`<entry>` while its events stream past.
#[derive(Default)]
struct EntryBuilder {
    entry: RawEntry,
    content: Option<String>,
    updated: Option<String>,
    depth: usize,
    capture: Option<TextField>,
    text: String,
}

impl EntryBuilder {
    fn open(&mut self, e: &BytesStart<'_>, reader: &Reader<&[u8]>, depth: usize, empty: bool) {
        let qname = String::from_utf8_lossy(e.name().as_ref()).into_owned();

        // Media RSS references may sit inside a media:group, so accept them at any depth
        match qname.as_str() {
            "media:thumbnail" => {
                self.entry.keys.insert("media_thumbnail".into());
                self.entry.media_thumbnail.push(MediaRef {
                    url: attribute(e, reader, b"url"),
                    media_type: None,
                });
                return;
            }
            "media:content" => {
                self.entry.keys.insert("media_content".into());
                self.entry.media_content.push(MediaRef {
                    url: attribute(e, reader, b"url"),
                    media_type: attribute(e, reader, b"type"),
                });
                return;
            }
            _ => {}
        }

        if depth != 1 {
            return;
        }

        let field = match qname.as_str() {
            "title" => Some(TextField::Title),
            "link" => {
                if let Some(href) = attribute(e, reader, b"href") {
                    self.push_atom_link(href, e, reader);
                    None
                } else {
                    Some(TextField::Link)
                }
            }
            "enclosure" => {
                self.entry.keys.insert("links".into());
                self.entry.links.push(RawLink {
                    href: attribute(e, reader, b"url"),
                    rel: Some("enclosure".into()),
                    media_type: attribute(e, reader, b"type"),
                });
                None
            }
            "description" | "summary" => Some(TextField::Summary),
            "content:encoded" | "content" => Some(TextField::Content),
            "pubDate" | "published" | "dc:date" | "issued" => Some(TextField::Published),
            "updated" | "modified" => Some(TextField::Updated),
            other => {
                self.entry.keys.insert(other.replace(':', "_"));
                None
            }
        };

        if let Some(field) = field {
            if !empty {
                self.capture = Some(field);
                self.text.clear();
            }
        }
    }

    fn push_atom_link(&mut self, href: String, e: &BytesStart<'_>, reader: &Reader<&[u8]>) {
        let rel = attribute(e, reader, b"rel").unwrap_or_else(|| "alternate".into());
        if rel == "alternate" && self.entry.link.is_none() {
            self.entry.keys.insert("link".into());
            self.entry.link = Some(href.clone());
        }
        self.entry.keys.insert("links".into());
        self.entry.links.push(RawLink {
            href: Some(href),
            rel: Some(rel),
            media_type: attribute(e, reader, b"type"),
        });
    }

    fn push_text(&mut self, text: &str) {
        if self.capture.is_some() {
            self.text.push_str(text);
        }
    }

    fn close_field(&mut self) {
        let Some(field) = self.capture.take() else {
            return;
        };
        let value = std::mem::take(&mut self.text).trim().to_owned();
        if value.is_empty() {
            return;
        }

        let entry = &mut self.entry;
        match field {
            TextField::Title => {
                entry.keys.insert("title".into());
                entry.title.get_or_insert(value);
            }
            TextField::Link => {
                entry.keys.insert("link".into());
                entry.keys.insert("links".into());
                entry.links.push(RawLink {
                    href: Some(value.clone()),
                    rel: Some("alternate".into()),
                    media_type: Some("text/html".into()),
                });
                entry.link.get_or_insert(value);
            }
            TextField::Summary => {
                entry.keys.insert("summary".into());
                entry.summary.get_or_insert(value);
            }
            TextField::Content => {
                entry.keys.insert("content".into());
                self.content.get_or_insert(value);
            }
            TextField::Published => {
                entry.keys.insert("published".into());
                entry.published.get_or_insert(value);
            }
            TextField::Updated => {
                entry.keys.insert("updated".into());
                self.updated.get_or_insert(value);
            }
        }
    }

    fn finish(self) -> RawEntry {
        let mut entry = self.entry;
        if entry.summary.is_none() {
            entry.summary = self.content;
        }
        if entry.published.is_none() {
            entry.published = self.updated;
        }
        entry
    }
}

/// Parses an RSS 2.0, RSS 1.0 or Atom document into raw entries.
///
/// Entries come back in document order. Fields are kept as the raw strings
/// found in the XML (summaries still contain their HTML, timestamps are not
/// parsed) so that later stages decide how to clean and interpret them.
///
/// # Errors
///
/// - [`ParseError::Xml`] for malformed XML
/// - [`ParseError::NotAFeed`] when the root element is not a feed
/// - [`ParseError::MaxDepthExceeded`] for pathologically nested items
///
/// # Security
///
/// SEC-002: `quick-xml` (0.37) never expands `<!ENTITY>` declarations, so
/// external-entity payloads in hostile feeds are inert.
pub fn parse_entries(bytes: &[u8]) -> Result<Vec<RawEntry>, ParseError> {
    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();
    let mut entries = Vec::new();
    let mut current: Option<EntryBuilder> = None;
    let mut root_seen = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if !root_seen {
                    check_root(&e)?;
                    root_seen = true;
                }
                match current.as_mut() {
                    Some(builder) => {
                        builder.depth += 1;
                        if builder.depth > MAX_ENTRY_DEPTH {
                            return Err(ParseError::MaxDepthExceeded(MAX_ENTRY_DEPTH));
                        }
                        let depth = builder.depth;
                        builder.open(&e, &reader, depth, false);
                    }
                    None if is_entry_element(&e) => current = Some(EntryBuilder::default()),
                    None => {}
                }
            }
            Ok(Event::Empty(e)) => {
                if !root_seen {
                    check_root(&e)?;
                    root_seen = true;
                }
                match current.as_mut() {
                    Some(builder) => {
                        let depth = builder.depth + 1;
                        builder.open(&e, &reader, depth, true);
                    }
                    // A self-closed <item/> carries nothing, not even a link
                    None if is_entry_element(&e) => entries.push(RawEntry::default()),
                    None => {}
                }
            }
            Ok(Event::Text(t)) => {
                if let Some(builder) = current.as_mut() {
                    match t.unescape() {
                        Ok(text) => builder.push_text(&text),
                        Err(_) => builder.push_text(&String::from_utf8_lossy(&t)),
                    }
                }
            }
            Ok(Event::CData(c)) => {
                if let Some(builder) = current.as_mut() {
                    builder.push_text(&String::from_utf8_lossy(&c));
                }
            }
            Ok(Event::End(_)) => {
                let finished = match current.as_mut() {
                    Some(builder) if builder.depth == 0 => true,
                    Some(builder) => {
                        if builder.depth == 1 {
                            builder.close_field();
                        }
                        builder.depth -= 1;
                        false
                    }
                    None => false,
                };
                if finished {
                    if let Some(builder) = current.take() {
                        entries.push(builder.finish());
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ParseError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if !root_seen {
        return Err(ParseError::NotAFeed);
    }

    Ok(entries)
}

fn check_root(e: &BytesStart<'_>) -> Result<(), ParseError> {
    match e.local_name().as_ref() {
        b"rss" | b"feed" | b"RDF" => Ok(()),
        _ => Err(ParseError::NotAFeed),
    }
}

fn is_entry_element(e: &BytesStart<'_>) -> bool {
    matches!(e.local_name().as_ref(), b"item" | b"entry")
}

/// Returns the trimmed, unescaped value of `key`, or `None` when missing/blank.
fn attribute(e: &BytesStart<'_>, reader: &Reader<&[u8]>, key: &[u8]) -> Option<String> {
    let decoder = reader.decoder();
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .and_then(|attr| attr.decode_and_unescape_value(decoder).ok())
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}
