use std::fs;
use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Duration, Local};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::{debug, info};

use crate::app::{ProgressEvent, ProgressSink};
use crate::config::{FreshnessPolicy, RunConfig};
use crate::domain::{Category, RefreshReason};
use crate::error::CovidError;

pub trait SeriesSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, CovidError>;
}

#[derive(Clone)]
pub struct HttpSeriesSource {
    client: Client,
}

impl HttpSeriesSource {
    pub fn new() -> Result<Self, CovidError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("covid-charts/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| CovidError::Http(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|err| CovidError::Http(err.to_string()))?;
        Ok(Self { client })
    }
}

impl SeriesSource for HttpSeriesSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, CovidError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| CovidError::Http(err.to_string()))?;
        if !response.status().is_success() {
            return Err(CovidError::HttpStatus {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }
        let body = response
            .bytes()
            .map_err(|err| CovidError::Http(err.to_string()))?;
        Ok(body.to_vec())
    }
}

pub fn assess_freshness(
    modified: Option<DateTime<Local>>,
    now: DateTime<Local>,
    policy: FreshnessPolicy,
    force: bool,
) -> Option<RefreshReason> {
    if force {
        return Some(RefreshReason::Forced);
    }
    let modified = match modified {
        Some(modified) => modified,
        None => return Some(RefreshReason::Missing),
    };
    let stale = match policy {
        FreshnessPolicy::Window { hours } => now - modified > Duration::hours(i64::from(hours)),
        FreshnessPolicy::CalendarDay => modified.date_naive() < now.date_naive(),
    };
    stale.then_some(RefreshReason::Stale)
}

pub fn modified_time(path: &Utf8Path) -> Result<Option<DateTime<Local>>, CovidError> {
    match fs::metadata(path.as_std_path()) {
        Ok(metadata) => {
            let modified = metadata
                .modified()
                .map_err(|err| CovidError::Filesystem(format!("mtime of {path}: {err}")))?;
            Ok(Some(DateTime::<Local>::from(modified)))
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(CovidError::Filesystem(format!("stat {path}: {err}"))),
    }
}

pub fn needs_refresh(
    path: &Utf8Path,
    policy: FreshnessPolicy,
    force: bool,
    now: DateTime<Local>,
) -> Result<Option<RefreshReason>, CovidError> {
    let modified = modified_time(path)?;
    Ok(assess_freshness(modified, now, policy, force))
}

pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), CovidError> {
    let parent = path
        .parent()
        .ok_or_else(|| CovidError::Filesystem(format!("invalid cache path {path}")))?;
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| CovidError::Filesystem(err.to_string()))?;
    let mut temp = tempfile::Builder::new()
        .prefix(".covid-charts")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| CovidError::Filesystem(err.to_string()))?;
    temp.write_all(content)
        .map_err(|err| CovidError::Filesystem(err.to_string()))?;
    temp.persist(path.as_std_path())
        .map_err(|err| CovidError::Filesystem(err.to_string()))?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheAction {
    Refreshed { reason: RefreshReason },
    UpToDate { modified: DateTime<Local> },
}

#[derive(Debug, Clone)]
pub struct CacheStatus {
    pub category: Category,
    pub path: Utf8PathBuf,
    pub action: CacheAction,
}

pub struct CacheManager<S: SeriesSource> {
    cache_dir: Utf8PathBuf,
    base_url: String,
    policy: FreshnessPolicy,
    force: bool,
    source: S,
}

impl<S: SeriesSource> CacheManager<S> {
    pub fn new(config: &RunConfig, source: S) -> Self {
        Self {
            cache_dir: config.cache_dir.clone(),
            base_url: config.base_url.clone(),
            policy: config.freshness,
            force: config.force_update,
            source,
        }
    }

    pub fn path(&self, category: Category) -> Utf8PathBuf {
        self.cache_dir.join(category.file_name())
    }

    pub fn url(&self, category: Category) -> String {
        format!("{}{}", self.base_url, category.file_name())
    }

    pub fn ensure_cache_dir(&self) -> Result<(), CovidError> {
        fs::create_dir_all(self.cache_dir.as_std_path())
            .map_err(|err| CovidError::Filesystem(err.to_string()))
    }

    pub fn prepare(
        &self,
        category: Category,
        sink: &dyn ProgressSink,
    ) -> Result<CacheStatus, CovidError> {
        self.ensure_cache_dir()?;
        let path = self.path(category);
        let modified = modified_time(&path)?;
        let reason = assess_freshness(modified, Local::now(), self.policy, self.force);

        let action = match (reason, modified) {
            (None, Some(modified)) => {
                sink.event(ProgressEvent {
                    message: format!(
                        "Cache file {path} is up-to-date ({})",
                        modified.format("%a %b %e %H:%M:%S %Y")
                    ),
                    elapsed: None,
                });
                debug!(%category, "cache file is fresh");
                CacheAction::UpToDate { modified }
            }
            (reason, _) => {
                let reason = reason.unwrap_or(RefreshReason::Missing);
                self.refresh(category, &path, reason, sink)?;
                CacheAction::Refreshed { reason }
            }
        };

        Ok(CacheStatus {
            category,
            path,
            action,
        })
    }

    fn refresh(
        &self,
        category: Category,
        path: &Utf8Path,
        reason: RefreshReason,
        sink: &dyn ProgressSink,
    ) -> Result<(), CovidError> {
        sink.event(ProgressEvent {
            message: match reason {
                RefreshReason::Forced => format!("Updating cache file {path} (forced by user)"),
                other => format!("Cache file {path} {other}, updating..."),
            },
            elapsed: None,
        });
        let url = self.url(category);
        info!(%category, %url, %reason, "downloading table");
        let started = std::time::Instant::now();
        let body = self.source.fetch(&url)?;
        write_bytes_atomic(path, &body)?;
        debug!(%category, bytes = body.len(), "cache file replaced");
        sink.event(ProgressEvent {
            message: format!("Downloaded {} bytes from {url}", body.len()),
            elapsed: Some(started.elapsed()),
        });
        Ok(())
    }

    pub fn prepare_all(&self, sink: &dyn ProgressSink) -> Result<Vec<CacheStatus>, CovidError> {
        Category::ALL
            .iter()
            .map(|category| self.prepare(*category, sink))
            .collect()
    }
}
