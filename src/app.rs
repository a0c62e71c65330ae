use std::fs::File;
use std::time::Duration;

use camino::Utf8PathBuf;
use tracing::info;

use crate::cache::{CacheManager, CacheStatus, SeriesSource};
use crate::chart::{self, ChartRequest};
use crate::config::RunConfig;
use crate::domain::{Category, RegionKey};
use crate::error::CovidError;
use crate::series::RegionSeries;
use crate::table::{self, ExtractedRow};
use crate::viewer::ChartViewer;

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Debug, Clone)]
pub struct ListResult {
    pub cache: CacheStatus,
    pub regions: Vec<RegionKey>,
}

#[derive(Debug, Clone)]
pub struct LoadResult {
    pub cache: Vec<CacheStatus>,
    pub series: RegionSeries,
}

#[derive(Debug, Clone)]
pub struct ChartResult {
    pub path: Utf8PathBuf,
    pub days: usize,
}

pub struct App<S: SeriesSource> {
    config: RunConfig,
    cache: CacheManager<S>,
}

impl<S: SeriesSource> App<S> {
    pub fn new(config: RunConfig, source: S) -> Self {
        let cache = CacheManager::new(&config, source);
        Self { config, cache }
    }

    pub fn list(&self, sink: &dyn ProgressSink) -> Result<ListResult, CovidError> {
        let cache = self.cache.prepare(Category::Infected, sink)?;
        let file = open_table(&cache)?;
        let regions = table::list_regions(file, cache.path.as_str())?;
        info!(regions = regions.len(), "listed regions");
        Ok(ListResult { cache, regions })
    }

    pub fn load(&self, sink: &dyn ProgressSink) -> Result<LoadResult, CovidError> {
        let mut statuses = Vec::with_capacity(Category::ALL.len());
        let infected = self.load_category(Category::Infected, &mut statuses, sink)?;
        let recovered = self.load_category(Category::Recovered, &mut statuses, sink)?;
        let deaths = self.load_category(Category::Deaths, &mut statuses, sink)?;

        let series = RegionSeries::new(infected, recovered, deaths);
        info!(region = %self.config.region, days = series.days(), "loaded region series");

        Ok(LoadResult {
            cache: statuses,
            series,
        })
    }

    pub fn chart(
        &self,
        series: &RegionSeries,
        viewer: &dyn ChartViewer,
        sink: &dyn ProgressSink,
    ) -> Result<ChartResult, CovidError> {
        let request = ChartRequest {
            mode: self.config.mode,
            region: &self.config.region,
            start_date: self.config.start_date,
            series,
        };
        let started = std::time::Instant::now();
        chart::render_svg(&request, &self.config.output)?;
        sink.event(ProgressEvent {
            message: format!("Chart written to {}", self.config.output),
            elapsed: Some(started.elapsed()),
        });
        viewer.show(self.config.output.as_std_path())?;
        Ok(ChartResult {
            path: self.config.output.clone(),
            days: series.days(),
        })
    }

    pub fn run(
        &self,
        viewer: &dyn ChartViewer,
        sink: &dyn ProgressSink,
    ) -> Result<ChartResult, CovidError> {
        let loaded = self.load(sink)?;
        self.chart(&loaded.series, viewer, sink)
    }

    fn load_category(
        &self,
        category: Category,
        statuses: &mut Vec<CacheStatus>,
        sink: &dyn ProgressSink,
    ) -> Result<Vec<i64>, CovidError> {
        let status = self.cache.prepare(category, sink)?;
        let row = self.extract(&status, sink)?;
        statuses.push(status);
        Ok(row.cumulative)
    }

    fn extract(
        &self,
        status: &CacheStatus,
        sink: &dyn ProgressSink,
    ) -> Result<ExtractedRow, CovidError> {
        let file = open_table(status)?;
        let row = table::extract_series(
            file,
            &self.config.region,
            self.config.start_date,
            status.path.as_str(),
        )?;
        sink.event(ProgressEvent {
            message: row.fields.join(", "),
            elapsed: None,
        });
        Ok(row)
    }
}

fn open_table(status: &CacheStatus) -> Result<File, CovidError> {
    File::open(status.path.as_std_path())
        .map_err(|err| CovidError::Filesystem(format!("open {}: {err}", status.path)))
}
