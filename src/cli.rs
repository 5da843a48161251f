//! Command-line surface.
//!
//! Boolean options come in `--x` / `--no-x` pairs; the last one given wins.
//! Options left unset keep the value from the config file (or the default).

use clap::Parser;
use std::path::PathBuf;

use crate::config::{Config, ConfigError};

#[derive(Parser, Debug)]
#[command(
    name = "feedlens",
    version,
    about = "Parses RSS feeds, enriches each entry (images, language, English translation, \
             named entities) and exports one JSON file per feed"
)]
pub struct Args {
    /// File with the list of RSS feeds, one URL per line
    #[arg(long, value_name = "FILE")]
    pub input_feeds: PathBuf,

    /// Output directory [default: ./output]
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Max feed entries to parse per feed [default: 50]
    #[arg(long, value_name = "N")]
    pub max_entries: Option<usize>,

    /// Fetch images from feed entries [default]
    #[arg(long, overrides_with = "no_fetch_images")]
    fetch_images: bool,
    /// Do not fetch images
    #[arg(long, overrides_with = "fetch_images")]
    no_fetch_images: bool,

    /// Fall back to OpenGraph meta tags for images [default]
    #[arg(long, overrides_with = "no_og_images")]
    og_images: bool,
    /// Do not scrape article pages for images
    #[arg(long, overrides_with = "og_images")]
    no_og_images: bool,

    /// Resize images to fit the configured dimensions [default]
    #[arg(long, overrides_with = "no_resize")]
    resize: bool,
    /// Keep original image dimensions
    #[arg(long, overrides_with = "resize")]
    no_resize: bool,

    /// Resized image width [default: 800]
    #[arg(long, value_name = "PX")]
    pub image_width: Option<u32>,

    /// Resized image height [default: 600]
    #[arg(long, value_name = "PX")]
    pub image_height: Option<u32>,

    /// Image JPEG quality, 1-100 [default: 90]
    #[arg(long, value_name = "Q")]
    pub image_quality: Option<u8>,

    /// Translate each story to English
    #[arg(long, overrides_with = "no_translate")]
    translate: bool,
    /// Do not translate [default]
    #[arg(long, overrides_with = "translate")]
    no_translate: bool,

    /// Enable NER classification (requires --translate)
    #[arg(long, overrides_with = "no_ner")]
    ner: bool,
    /// Disable NER classification [default]
    #[arg(long, overrides_with = "ner")]
    no_ner: bool,

    /// Concurrent entries per feed [default: CPUs + 4, max 32]
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,

    /// TOML file with additional settings
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Make the operation more talkative
    #[arg(short, long)]
    pub verbose: bool,
}

fn flag_pair(yes: bool, no: bool) -> Option<bool> {
    match (yes, no) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

impl Args {
    /// Loads the config file (if any) and applies command-line overrides.
    pub fn into_config(self) -> Result<Config, ConfigError> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        self.apply(&mut config);
        Ok(config)
    }

    fn apply(self, config: &mut Config) {
        config.input_feeds = self.input_feeds;
        config.verbose = self.verbose;

        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        if let Some(n) = self.max_entries {
            config.max_entries = n;
        }
        if let Some(n) = self.workers {
            config.workers = n;
        }

        let images = &mut config.images;
        if let Some(v) = flag_pair(self.fetch_images, self.no_fetch_images) {
            images.fetch = v;
        }
        if let Some(v) = flag_pair(self.og_images, self.no_og_images) {
            images.og_fallback = v;
        }
        if let Some(v) = flag_pair(self.resize, self.no_resize) {
            images.resize = v;
        }
        if let Some(w) = self.image_width {
            images.width = w;
        }
        if let Some(h) = self.image_height {
            images.height = h;
        }
        if let Some(q) = self.image_quality {
            images.quality = q;
        }

        if let Some(v) = flag_pair(self.translate, self.no_translate) {
            config.translation.enabled = v;
        }
        if let Some(v) = flag_pair(self.ner, self.no_ner) {
            config.ner.enabled = v;
        }
    }
}
