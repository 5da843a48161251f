use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use feedlens::cli::Args;
use feedlens::runner::Runner;

fn init_tracing(verbose: bool) {
    // RUST_LOG wins when set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "info,feedlens=debug" } else { "info" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = args.into_config()?;
    tracing::info!(
        input_feeds = %config.input_feeds.display(),
        output_dir = %config.output_dir.display(),
        max_entries = config.max_entries,
        workers = config.workers,
        fetch_images = config.images.fetch,
        og_images = config.images.og_fallback,
        resize = config.images.resize,
        image_width = config.images.width,
        image_height = config.images.height,
        image_quality = config.images.quality,
        translate = config.translation.enabled,
        ner = config.ner.enabled,
        verbose = config.verbose,
        "Arguments"
    );

    let runner = Runner::prepare(config)?;
    let reports = runner.run().await?;

    let stories: usize = reports.iter().map(|r| r.stories).sum();
    tracing::info!(feeds = reports.len(), stories, "Done");
    Ok(())
}
