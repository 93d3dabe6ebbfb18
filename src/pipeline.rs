use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use rayon::prelude::*;
use tracing::{error, info};

use crate::fetch::{FetchConfig, Fetcher};
use crate::http::HttpClient;
use crate::record::Record;
use crate::{pages, parser, sink};

#[derive(Debug)]
pub struct RunStats {
    pub pages: usize,
    pub records: usize,
}

/// One full harvest: seed page → page discovery → batch fetch → extraction
/// in page order → both sinks.
pub async fn run(
    client: Arc<dyn HttpClient>,
    base_link: &str,
    page_path: &str,
    out_dir: &Path,
    fetch_config: FetchConfig,
) -> Result<RunStats> {
    let fetcher = Fetcher::new(fetch_config);
    let seed_url = format!("{}{}", base_link, page_path);

    let t = Instant::now();
    let mut seed_batch = fetcher.fetch(Arc::clone(&client), &[seed_url.clone()]).await?;
    let seed = seed_batch.remove(0);
    info!(elapsed_ms = t.elapsed().as_millis() as u64, url = %seed_url, "fetched seed page");

    let remaining_urls = match pages::discover(&seed.body, &seed_url) {
        Some(urls) => {
            info!(pages = urls.len(), "pagination discovered");
            urls
        }
        None => {
            info!("no pagination control, harvesting the seed page only");
            Vec::new()
        }
    };

    let t = Instant::now();
    let remaining = if remaining_urls.is_empty() {
        Vec::new()
    } else {
        fetcher.fetch(Arc::clone(&client), &remaining_urls).await?
    };
    info!(
        elapsed_ms = t.elapsed().as_millis() as u64,
        pages = remaining.len(),
        "fetched remaining pages"
    );

    let t = Instant::now();
    let mut bodies = Vec::with_capacity(1 + remaining.len());
    bodies.push(seed.body);
    bodies.extend(remaining.into_iter().map(|r| r.body));

    let records: Vec<Record> = bodies
        .par_iter()
        .map(|body| parser::extract(body))
        .collect::<Vec<_>>()
        .into_iter()
        .flatten()
        .collect();
    info!(
        elapsed_ms = t.elapsed().as_millis() as u64,
        records = records.len(),
        "extracted records"
    );

    let stamp = sink::timestamp();
    let txt_path = out_dir.join(format!("calories_{}.txt", stamp));
    let json_path = out_dir.join(format!("calories_{}.json", stamp));

    let t = Instant::now();
    // The sinks are independent: try both even if the first fails.
    let txt_result = sink::write_txt(&records, &txt_path);
    if let Err(e) = &txt_result {
        error!("text sink failed: {:#}", e);
    }
    let json_result = sink::write_json(&records, &json_path);
    if let Err(e) = &json_result {
        error!("json sink failed: {:#}", e);
    }
    txt_result.and(json_result)?;
    info!(elapsed_ms = t.elapsed().as_millis() as u64, "wrote output files");

    Ok(RunStats {
        pages: bodies.len(),
        records: records.len(),
    })
}
