use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::calendar;

const CONCURRENCY: usize = 4;
const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF_MS: u64 = 2000;
const PROBE_DELAY_MS: u64 = 200;
const HEAD_TIMEOUT: Duration = Duration::from_secs(5);
const GET_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Downloaded { path: PathBuf, url: String },
    AlreadyPresent(PathBuf),
    Skipped(String),
    NotFound,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FetchStats {
    pub total: usize,
    pub downloaded: usize,
    pub present: usize,
    pub skipped: usize,
    pub not_found: usize,
    pub errors: usize,
}

impl FetchStats {
    fn record(&mut self, outcome: &Result<FetchOutcome>) {
        self.total += 1;
        match outcome {
            Ok(FetchOutcome::Downloaded { .. }) => self.downloaded += 1,
            Ok(FetchOutcome::AlreadyPresent(_)) => self.present += 1,
            Ok(FetchOutcome::Skipped(_)) => self.skipped += 1,
            Ok(FetchOutcome::NotFound) => self.not_found += 1,
            Err(_) => self.errors += 1,
        }
    }

    /// Documents available on disk after the run.
    pub fn available(&self) -> usize {
        self.downloaded + self.present
    }
}

/// Fetch every date concurrently into `dir`, one probe sequence per date.
pub async fn fetch_dates(dir: &Path, dates: Vec<String>) -> Result<FetchStats> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {:?}", dir))?;

    let client = Client::builder()
        .user_agent(concat!("indycar_laptimes/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;
    let semaphore = Arc::new(Semaphore::new(CONCURRENCY));

    let pb = ProgressBar::new(dates.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );

    let (tx, mut rx) =
        tokio::sync::mpsc::channel::<(String, Result<FetchOutcome>)>(CONCURRENCY * 2);
    for date in dates {
        let client = client.clone();
        let sem = Arc::clone(&semaphore);
        let dir = dir.to_path_buf();
        let tx = tx.clone();

        tokio::spawn(async move {
            let outcome = match sem.acquire().await {
                Ok(_permit) => fetch_date(&client, &dir, &date).await,
                Err(e) => Err(e.into()),
            };
            let _ = tx.send((date, outcome)).await;
        });
    }
    drop(tx);

    let mut stats = FetchStats::default();
    while let Some((date, outcome)) = rx.recv().await {
        match &outcome {
            Ok(FetchOutcome::Downloaded { path, url }) => {
                info!(%date, %url, file = ?path, "downloaded")
            }
            Ok(FetchOutcome::Skipped(reason)) => debug!(%date, %reason, "skipped"),
            Ok(FetchOutcome::NotFound) => warn!(%date, "no document found"),
            Ok(FetchOutcome::AlreadyPresent(_)) => debug!(%date, "already downloaded"),
            Err(e) => warn!(%date, error = %e, "fetch failed"),
        }
        stats.record(&outcome);
        pb.set_message(date);
        pb.inc(1);
    }
    pb.finish_and_clear();

    info!(
        total = stats.total,
        downloaded = stats.downloaded,
        present = stats.present,
        not_found = stats.not_found,
        errors = stats.errors,
        "fetch complete"
    );
    Ok(stats)
}

/// Probe candidate URLs for one race date until a document downloads.
pub async fn fetch_date(client: &Client, dir: &Path, date: &str) -> Result<FetchOutcome> {
    if !calendar::is_valid_date(date) {
        return Ok(FetchOutcome::Skipped(format!("invalid date format {date:?}")));
    }
    if calendar::is_future(date, Local::now().date_naive()) {
        return Ok(FetchOutcome::Skipped("future race date".into()));
    }

    let path = dir.join(calendar::target_filename(date));
    if tokio::fs::try_exists(&path).await.unwrap_or(false) {
        return Ok(FetchOutcome::AlreadyPresent(path));
    }

    for url in calendar::candidate_urls(date) {
        debug!(%url, "probing");
        let found = send_with_retry(&url, || client.head(&url).timeout(HEAD_TIMEOUT))
            .await
            .is_some_and(|r| r.status() == StatusCode::OK);
        if found && download(client, &url, &path).await? {
            return Ok(FetchOutcome::Downloaded { path, url });
        }
        tokio::time::sleep(Duration::from_millis(PROBE_DELAY_MS)).await;
    }
    Ok(FetchOutcome::NotFound)
}

async fn download(client: &Client, url: &str, path: &Path) -> Result<bool> {
    let Some(response) = send_with_retry(url, || client.get(url).timeout(GET_TIMEOUT)).await else {
        return Ok(false);
    };
    if response.status() != StatusCode::OK {
        return Ok(false);
    }
    let body = response
        .bytes()
        .await
        .with_context(|| format!("Failed to read body from {url}"))?;
    if body.is_empty() {
        return Ok(false);
    }

    tokio::fs::write(path, &body)
        .await
        .with_context(|| format!("Failed to write {:?}", path))?;
    let size = tokio::fs::metadata(path).await.map(|m| m.len()).unwrap_or(0);
    if size == 0 {
        warn!(%url, "download left an empty file, removing");
        let _ = tokio::fs::remove_file(path).await;
        return Ok(false);
    }
    Ok(true)
}

fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Send, backing off exponentially on 429/5xx. Transport errors read as "not there".
async fn send_with_retry<F>(url: &str, make: F) -> Option<Response>
where
    F: Fn() -> RequestBuilder,
{
    let mut attempt = 0;
    loop {
        let response = match make().send().await {
            Ok(r) => r,
            Err(e) => {
                debug!(%url, error = %e, "request failed");
                return None;
            }
        };
        if !should_retry(response.status()) || attempt == MAX_RETRIES {
            return Some(response);
        }

        let backoff = Duration::from_millis(BASE_BACKOFF_MS * 2u64.pow(attempt));
        warn!(
            "{} on {} (attempt {}/{}), backing off {:.1}s",
            response.status(),
            url,
            attempt + 1,
            MAX_RETRIES,
            backoff.as_secs_f64()
        );
        tokio::time::sleep(backoff).await;
        attempt += 1;
    }
}
