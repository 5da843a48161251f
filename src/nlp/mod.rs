//! Language capabilities used by the enrichment pipeline.
//!
//! Each capability sits behind a trait so handles can be created once per run
//! and shared across workers as `Arc<dyn ...>`.

pub mod language;
pub mod ner;
pub mod translate;

pub use language::{DetectError, LanguageDetector, WhatlangDetector};
pub use ner::{Entity, EntityExtractor, InferenceNer, NerError};
pub use translate::{LibreTranslate, TranslateError, Translator};
