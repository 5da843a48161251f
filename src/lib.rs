//! feedlens: ingests RSS and podcast feeds, enriches every entry (text
//! cleanup, images, podcast audio, language detection, English translation,
//! named entities) and writes one JSON document per feed.

pub mod cli;
pub mod config;
pub mod enrich;
pub mod feed;
pub mod media;
pub mod nlp;
pub mod orchestrator;
pub mod output;
pub mod runner;
pub mod util;
