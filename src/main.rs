mod cli;

use anyhow::Context as _;
use clap::Parser as _;
use kp_scout::config::RendererKind;
use kp_scout::logging;
use kp_scout::scrapers::{
    ChromeRenderer, HttpRenderer, JsonFileSink, MultiPageAggregator, PageRenderer, ResultSink,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init()?;

    let config = cli::Cli::parse().into_config();

    info!("🛒 KP Scout - marketplace search scraper");
    info!("==========================================");

    let parser = config.build_parser()?;

    // The browser lives for the whole run and is only lent to the session
    let renderer: Box<dyn PageRenderer> = match config.renderer {
        RendererKind::Chrome => Box::new(ChromeRenderer::launch(&config.chrome)?),
        RendererKind::Http => Box::new(HttpRenderer::new(config.navigation_timeout())?),
    };

    if let Some(dir) = &config.session.html_dir {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("create HTML directory: {}", dir.display()))?;
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Ctrl-C received, stopping after the current page");
                cancel.cancel();
            }
        });
    }

    let aggregator = MultiPageAggregator::new(parser, config.session.clone());
    let outcome = aggregator
        .run(renderer.as_ref(), &config.search, &cancel)
        .await;

    let sink = JsonFileSink::new(&config.output_dir);
    let path = sink.persist(&outcome.result, &outcome.metadata).await?;

    let result = &outcome.result;
    info!(
        "\n✅ Scraped {} ads from {} page(s), {} failed, {} error(s), {} warning(s)\n",
        result.ads.len(),
        outcome.metadata.pages_scraped,
        result.stats.pages_failed,
        result.errors.len(),
        result.warnings.len()
    );

    for (i, parsed) in result.sorted_by_posted_date().iter().take(10).enumerate() {
        let ad = &parsed.ad;
        println!("{}. {} ({})", i + 1, ad.title, ad.price.formatted);
        if !ad.location.name.is_empty() {
            println!("   Location: {}", ad.location.name);
        }
        println!("   Posted: {}", ad.metrics.posted_ago_text);
        println!("   URL: {}", ad.url);
        println!();
    }

    info!("💾 Results written to {}", path);

    Ok(())
}
