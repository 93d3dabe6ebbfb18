use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::http::{HttpClient, PageResponse};

const CONCURRENCY: usize = 10;
const MAX_RETRY_ROUNDS: u32 = 10;
const BASE_BACKOFF_MS: u64 = 500;
const MAX_BACKOFF_MS: u64 = 8_000;

#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Max in-flight requests per round.
    pub concurrency: usize,
    /// Retry rounds after the initial pass, so attempts per url <= 1 + this.
    pub max_retry_rounds: u32,
    /// Base delay before each retry round, doubled per round up to a cap.
    /// Zero disables backoff entirely.
    pub backoff_base: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            concurrency: CONCURRENCY,
            max_retry_rounds: MAX_RETRY_ROUNDS,
            backoff_base: Duration::from_millis(BASE_BACKOFF_MS),
        }
    }
}

/// Terminal outcome of a batch that exhausted its retry rounds. The batch is
/// all-or-nothing: no responses are exposed alongside this error.
#[derive(Debug, thiserror::Error)]
#[error("{} of {total} urls never returned 200 within {rounds} retry rounds", .remaining.len())]
pub struct FetchError {
    pub total: usize,
    pub rounds: u32,
    /// Urls that never got a 200, in original batch order.
    pub remaining: Vec<String>,
    /// Last observed status or transport error per remaining url.
    pub last_errors: HashMap<String, String>,
}

/// Concurrent batch fetcher that retries only the failed subset of a batch,
/// round after round, until every url has a 200 or the round ceiling hits.
pub struct Fetcher {
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Self {
        Self { config }
    }

    /// Fetch every url in the batch. Returns the responses in input order,
    /// or a [`FetchError`] naming the urls that never succeeded.
    pub async fn fetch(
        &self,
        client: Arc<dyn HttpClient>,
        urls: &[String],
    ) -> Result<Vec<PageResponse>, FetchError> {
        if urls.is_empty() {
            return Ok(Vec::new());
        }

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let pb = ProgressBar::new(urls.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
                .unwrap()
                .progress_chars("=> "),
        );

        let mut success: BTreeMap<usize, PageResponse> = BTreeMap::new();
        let mut last_errors: HashMap<usize, String> = HashMap::new();
        let mut pending: Vec<usize> = (0..urls.len()).collect();
        let mut rounds = 0u32;

        loop {
            for (idx, outcome) in self.round(&client, &semaphore, urls, &pending).await {
                match outcome {
                    Ok(resp) if resp.status == 200 => {
                        pb.inc(1);
                        last_errors.remove(&idx);
                        success.insert(idx, resp);
                    }
                    Ok(resp) => {
                        last_errors.insert(idx, format!("status {}", resp.status));
                    }
                    Err(e) => {
                        last_errors.insert(idx, e.to_string());
                    }
                }
            }

            pending.retain(|idx| !success.contains_key(idx));
            if pending.is_empty() {
                break;
            }
            if rounds >= self.config.max_retry_rounds {
                pb.finish_and_clear();
                return Err(FetchError {
                    total: urls.len(),
                    rounds,
                    remaining: pending.iter().map(|&i| urls[i].clone()).collect(),
                    last_errors: last_errors
                        .into_iter()
                        .map(|(i, e)| (urls[i].clone(), e))
                        .collect(),
                });
            }

            rounds += 1;
            warn!(round = rounds, outstanding = pending.len(), "retrying failed urls");
            if !self.config.backoff_base.is_zero() {
                let backoff = (self.config.backoff_base * 2u32.saturating_pow(rounds - 1))
                    .min(Duration::from_millis(MAX_BACKOFF_MS));
                tokio::time::sleep(backoff).await;
            }
        }

        pb.finish_and_clear();
        debug!(urls = urls.len(), rounds, "batch resolved");
        Ok(success.into_values().collect())
    }

    /// One concurrent dispatch over the currently-outstanding urls. Results
    /// arrive in completion order and carry their batch index; aggregation
    /// back into the outcome maps happens sequentially in the caller.
    async fn round(
        &self,
        client: &Arc<dyn HttpClient>,
        semaphore: &Arc<Semaphore>,
        urls: &[String],
        pending: &[usize],
    ) -> Vec<(usize, Result<PageResponse>)> {
        let (tx, mut rx) = tokio::sync::mpsc::channel(pending.len().max(1));

        for &idx in pending {
            let url = urls[idx].clone();
            let client = Arc::clone(client);
            let sem = Arc::clone(semaphore);
            let tx = tx.clone();

            tokio::spawn(async move {
                let _permit = sem.acquire().await.unwrap();
                let outcome = client.get(&url).await;
                let _ = tx.send((idx, outcome)).await;
            });
        }

        // Drop our copy of tx so rx closes when all spawned tasks finish
        drop(tx);

        let mut out = Vec::with_capacity(pending.len());
        while let Some(item) = rx.recv().await {
            out.push(item);
        }
        out
    }
}
