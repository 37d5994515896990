//! Pricelens batch entrypoint.
//!
//! ```text
//! pricelens [run]
//! pricelens search <category> <query-vectors.json> [top_n]
//! pricelens next-id <category>
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use mimalloc::MiMalloc;

use pricelens::catalog::next_category_id;
use pricelens::config::{CatalogConfig, Config};
use pricelens::pipeline::Pipeline;
use pricelens::search::{QueryVectors, SearchEngine};
use pricelens::sentiment::{
    BatchSentimentClient, HttpSentimentClassifier, SentimentCache, SentimentCacheHandle,
};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const USAGE: &str = "usage: pricelens [run | search <category> <query.json> [top_n] | next-id <category>]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    let config = Config::from_env()?;
    config.validate()?;
    let catalog = CatalogConfig::load(&config.catalog_file())?;

    match args.first().map(String::as_str) {
        None | Some("run") => run(&config, &catalog).await,
        Some("search") => search(&config, &catalog, &args[1..]),
        Some("next-id") => next_id(&config, &catalog, &args[1..]),
        Some("--help" | "-h") => {
            println!("{USAGE}");
            Ok(())
        }
        Some(other) => bail!("unknown command '{other}'\n{USAGE}"),
    }
}

async fn run(config: &Config, catalog: &CatalogConfig) -> anyhow::Result<()> {
    tracing::info!(
        root = %config.root.display(),
        shops = catalog.shops.len(),
        categories = catalog.categories.len(),
        "Pricelens pipeline starting"
    );

    let classifier = HttpSentimentClassifier::new(
        config.sentiment_url.clone(),
        config.sentiment_api_key.as_deref(),
        config.sentiment_model.clone(),
        config.request_timeout,
    )?;
    let cache = SentimentCache::load(config.cache_file())?;
    let client = BatchSentimentClient::new(
        Arc::new(classifier),
        SentimentCacheHandle::new(cache),
        config.batch_config(),
    );

    let pipeline = Pipeline::from_config(config, catalog, client);
    let report = pipeline.run().await?;

    if report.is_noop() {
        println!("No changes detected");
    } else {
        let summary = report.summary;
        println!(
            "processed={} skipped={} failed={}",
            summary.processed, summary.skipped, summary.failed
        );
    }

    Ok(())
}

fn search(config: &Config, catalog: &CatalogConfig, args: &[String]) -> anyhow::Result<()> {
    let [category, query_path, rest @ ..] = args else {
        bail!("search needs a category and a query vector file\n{USAGE}");
    };
    let top_n = match rest.first() {
        Some(raw) => raw
            .parse::<usize>()
            .with_context(|| format!("invalid top_n '{raw}'"))?,
        None => config.top_n,
    };

    let files = catalog.files_for_category(&config.root, category)?;
    let query = QueryVectors::load(&PathBuf::from(query_path))?;
    let outcome = SearchEngine::new(files).search(category, &query, top_n);

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

fn next_id(config: &Config, catalog: &CatalogConfig, args: &[String]) -> anyhow::Result<()> {
    let Some(category) = args.first() else {
        bail!("next-id needs a category\n{USAGE}");
    };

    let category_config = catalog.category(category)?;
    let files = catalog.files_for_category(&config.root, category)?;
    let id = next_category_id(&files, &category_config.id_prefix());

    println!("{id} sizes={}", category_config.sizes.join(","));
    Ok(())
}
