mod fetch;
mod http;
mod pages;
mod parser;
mod pipeline;
mod record;
mod sink;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;

#[derive(Parser)]
#[command(name = "calorie_scraper", about = "Nutritional catalog scraper for calorizator.ru")]
struct Cli {
    /// Site root
    #[arg(long, default_value = "https://calorizator.ru")]
    base_url: String,
    /// Listing path under the site root
    #[arg(long, default_value = "/product/all")]
    path: String,
    /// Directory the output files are written to
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let client = Arc::new(http::ReqwestClient::new()?);
    let stats = pipeline::run(
        client,
        &cli.base_url,
        &cli.path,
        &cli.out_dir,
        fetch::FetchConfig::default(),
    )
    .await?;

    println!(
        "Done: {} records from {} pages in {:.1}s",
        stats.records,
        stats.pages,
        t0.elapsed().as_secs_f64()
    );
    Ok(())
}
