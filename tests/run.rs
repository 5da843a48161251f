//! Run controller end to end: feed list in, one JSON file per feed out.

use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, ImageFormat, RgbImage};
use pretty_assertions::assert_eq;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use feedlens::config::{Config, ConfigError};
use feedlens::enrich::{Story, StoryKind};
use feedlens::output::output_filename;
use feedlens::runner::Runner;
use feedlens::util::content_hash;

fn png_bytes() -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(RgbImage::new(1024, 1024))
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

fn podcast_feed(base: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"
     xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd"
     xmlns:media="http://search.yahoo.com/mrss/">
<channel>
  <title>Mixed</title>
  <item>
    <title>The quick brown fox jumps over the lazy dog</title>
    <link>{base}/articles/fox</link>
    <description><![CDATA[<p>A <em>very</em> quick brown fox was seen jumping over a sleepy dog in the village this morning.</p>]]></description>
    <pubDate>Mon, 01 Jan 2024 00:00:00 GMT</pubDate>
    <media:thumbnail url="{base}/img/fox.png"/>
  </item>
  <item>
    <title>Episode 12</title>
    <link>{base}/episodes/12</link>
    <description>Talking about foxes and dogs</description>
    <itunes:duration>00:42:00</itunes:duration>
    <enclosure url="{base}/audio/12.mp3" length="123" type="audio/mpeg"/>
  </item>
  <item>
    <title>No link at all</title>
  </item>
</channel>
</rss>"#
    )
}

fn write_input(dir: &Path, feeds: &[String]) -> std::path::PathBuf {
    let input = dir.join("feeds.txt");
    std::fs::write(&input, feeds.join("\n\n")).unwrap();
    input
}

fn read_batch(path: &Path) -> Vec<Story> {
    serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
}

#[tokio::test]
async fn test_end_to_end() {
    let server = MockServer::start().await;
    let base = server.uri();
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(podcast_feed(&base)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/img/fox.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gone.xml"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let good_feed = format!("{}/feed.xml", base);
    let gone_feed = format!("{}/gone.xml", base);
    let output_dir = dir.path().join("output");

    let mut config = Config {
        input_feeds: write_input(dir.path(), &[good_feed.clone(), gone_feed.clone()]),
        output_dir: output_dir.clone(),
        workers: 4,
        ..Config::default()
    };
    config.images.og_fallback = false;

    let runner = Runner::prepare(config).unwrap();
    assert_eq!(runner.feeds(), [good_feed.clone(), gone_feed.clone()]);

    let reports = runner.run().await.unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].stories, 2);
    assert_eq!(reports[1].stories, 0);

    // Failed feed still produces an (empty) artifact
    let gone_path = output_dir.join(output_filename(&gone_feed));
    assert_eq!(std::fs::read_to_string(&gone_path).unwrap(), "[]");

    let batch = read_batch(&output_dir.join(output_filename(&good_feed)));
    assert_eq!(batch.len(), 2);

    let story = batch
        .iter()
        .find(|s| s.kind == StoryKind::Story)
        .expect("story record");
    let fox_link = format!("{}/articles/fox", base);
    assert_eq!(story.link, fox_link);
    assert_eq!(
        story.summary.origin.as_deref(),
        Some("A very quick brown fox was seen jumping over a sleepy dog in the village this morning.")
    );
    assert_eq!(story.origin_language.as_deref(), Some("en"));
    assert_eq!(story.title.en, story.title.origin);
    let image = format!("{}.jpg", content_hash(&fox_link));
    assert_eq!(story.image_filename.as_deref(), Some(image.as_str()));
    let cached = std::fs::read(output_dir.join("images").join(&image)).unwrap();
    assert_eq!(image::guess_format(&cached).unwrap(), ImageFormat::Jpeg);

    let podcast = batch
        .iter()
        .find(|s| s.kind == StoryKind::Podcast)
        .expect("podcast record");
    assert_eq!(
        podcast.podcast_url,
        Some(format!("{}/audio/12.mp3", base))
    );
    assert_eq!(podcast.image_filename, None);
    // No pubDate: empty block rather than null
    assert_eq!(podcast.published.as_ref().map(|p| p.dt.is_none()), Some(true));
}

#[tokio::test]
async fn test_translation_and_ner_end_to_end() {
    let feed_server = MockServer::start().await;
    let base = feed_server.uri();
    let feed = format!(
        r#"<rss version="2.0"><channel>
  <item>
    <title>Le gouvernement annonce de nouvelles mesures</title>
    <link>{base}/fr/1</link>
    <description>Le ministre a présenté mardi un plan pour soutenir les agriculteurs de la région.</description>
  </item>
</channel></rss>"#
    );
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(feed))
        .mount(&feed_server)
        .await;

    let nlp_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/languages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"code": "fr", "name": "French", "targets": ["en"]}
        ])))
        .expect(1)
        .mount(&nlp_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/translate"))
        .and(body_partial_json(serde_json::json!({"source": "fr", "target": "en"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"translatedText": "Paris news"})),
        )
        .expect(2)
        .mount(&nlp_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/models/test-ner"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"entity_group": "LOC", "score": 0.99, "word": "Paris", "start": 0, "end": 5}
        ])))
        .mount(&nlp_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let feed_url = format!("{}/feed.xml", base);
    let output_dir = dir.path().join("out");
    let mut config = Config {
        input_feeds: write_input(dir.path(), std::slice::from_ref(&feed_url)),
        output_dir: output_dir.clone(),
        ..Config::default()
    };
    config.images.fetch = false;
    config.translation.enabled = true;
    config.translation.endpoint = nlp_server.uri();
    config.translation.languages = vec!["fr".into(), "de".into()];
    config.ner.enabled = true;
    config.ner.endpoint = format!("{}/models", nlp_server.uri());
    config.ner.model = "test-ner".into();

    let runner = Runner::prepare(config).unwrap();
    runner.run().await.unwrap();

    let batch = read_batch(&output_dir.join(output_filename(&feed_url)));
    assert_eq!(batch.len(), 1);
    let story = &batch[0];
    assert_eq!(story.origin_language.as_deref(), Some("fr"));
    assert_eq!(story.title.en.as_deref(), Some("Paris news"));
    assert_eq!(story.summary.en.as_deref(), Some("Paris news"));
    let ner = story.ner.as_ref().expect("entities");
    assert_eq!(ner[0].word, "Paris");
    assert_eq!(ner[0].end, 5);
}

#[test]
fn test_missing_input_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        input_feeds: dir.path().join("does-not-exist.txt"),
        output_dir: dir.path().join("out"),
        ..Config::default()
    };

    let err = Runner::prepare(config).err().expect("prepare must fail");
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::MissingInput(_))
    ));
    assert!(!dir.path().join("out").exists());
}

#[test]
fn test_ner_without_translation_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config {
        input_feeds: write_input(dir.path(), &["https://a.test/feed".to_string()]),
        output_dir: dir.path().join("out"),
        ..Config::default()
    };
    config.ner.enabled = true;

    let err = Runner::prepare(config).err().expect("prepare must fail");
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::NerRequiresTranslation)
    ));
}

#[tokio::test]
async fn test_unreachable_translation_index_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = Config {
        input_feeds: write_input(dir.path(), &["https://a.test/feed".to_string()]),
        output_dir: dir.path().join("out"),
        ..Config::default()
    };
    config.translation.enabled = true;
    config.translation.endpoint = server.uri();

    let runner = Runner::prepare(config).unwrap();
    assert!(runner.initialize_capabilities().await.is_err());
}
