//! Utility functions shared by the enrichment pipeline and the run controller.
//!
//! - **Hashing**: content hashes used for story guids and output filenames
//! - **Text**: HTML-to-plain-text sanitizing and progress-line truncation
//! - **Time**: lenient timestamp parsing and "N days ago" rendering
//! - **Files**: write-to-temp-then-rename persistence
//! - **HTTP**: size-limited response body reads

mod fs;
mod hash;
mod http;
mod text;
mod time;

pub use fs::write_atomic;
pub use hash::content_hash;
pub use http::{read_limited_bytes, BodyError};
#[cfg(test)]
pub(crate) use http::serve_stalled_body;
pub use text::{to_plain_text, truncate_chars, SanitizeError};
pub use time::{format_ago, parse_published, DateError};

/// User agent sent with every outbound request. Some image hosts reject
/// requests that carry no browser-like agent.
pub const USER_AGENT: &str = "Mozilla/5.0";
