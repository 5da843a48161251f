//! Feed retrieval and parsing.
//!
//! - [`fetcher`] - single-attempt HTTP (or local file) retrieval with size and time limits
//! - [`parser`] - streaming RSS/Atom reader built on `quick-xml`
//! - [`entry`] - the raw entry model handed to the enrichment pipeline
//!
//! # Example
//!
//! ```ignore
//! use feedlens::feed::fetch_entries;
//!
//! let entries = fetch_entries(&client, "https://example.com/feed.xml").await?;
//! ```

mod entry;
mod fetcher;
mod parser;

pub use entry::{MediaRef, RawEntry, RawLink};
pub use fetcher::{fetch_entries, FetchError};
pub use parser::{parse_entries, ParseError};
