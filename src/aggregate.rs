// src/aggregate.rs

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::cache::YearCache;
use crate::error::{AggregateError, ScrapeError};
use crate::extract::extract;
use crate::fetch::{Fetcher, RetryPolicy};
use crate::table::Table;

/// Everything the pipeline needs, threaded through explicitly. The year
/// range itself is an argument to [`Pipeline::aggregate`], not config state.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Page URL with a `{year}` placeholder.
    pub url_template: String,
    /// Element id of the table to extract from each page.
    pub table_id: String,
    /// Selector for the decorative spanner row to drop, when present.
    pub header_row_selector: String,
    /// Directory holding one cached page per year.
    pub cache_dir: PathBuf,
    /// Where the aggregated CSV lands; overwritten on every successful run.
    pub output_path: PathBuf,
    pub retry: RetryPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            url_template: "https://www.basketball-reference.com/awards/awards_{year}.html"
                .to_string(),
            table_id: "mvp".to_string(),
            header_row_selector: "tr.over_header".to_string(),
            cache_dir: PathBuf::from("yearly_mvp_data"),
            output_path: PathBuf::from("mvp_voting.csv"),
            retry: RetryPolicy::default(),
        }
    }
}

/// Drives the per-year fetch → cache → extract → tag loop and produces the
/// combined dataset the prediction side consumes.
pub struct Pipeline {
    config: PipelineConfig,
    fetcher: Fetcher,
    cache: YearCache,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, ScrapeError> {
        let cache = YearCache::new(&config.cache_dir)?;
        let fetcher = Fetcher::new(config.retry);
        Ok(Pipeline {
            fetcher,
            cache,
            config,
        })
    }

    pub fn url_for(&self, year: i32) -> String {
        self.config.url_template.replace("{year}", &year.to_string())
    }

    /// Build the combined year-tagged table for `years`, in the order given.
    ///
    /// All-or-nothing: the first failing year aborts the run, nothing is
    /// persisted, and the error names that year. On success the CSV at
    /// `output_path` is overwritten and the dataset is returned in memory.
    /// An empty year list returns an empty table and leaves any previously
    /// persisted dataset alone.
    pub async fn aggregate(&self, years: &[i32]) -> Result<Table, AggregateError> {
        if years.is_empty() {
            warn!("no years requested, nothing to aggregate");
            return Ok(Table::default());
        }

        let mut expected: Option<Vec<String>> = None;
        let mut combined: Option<Table> = None;

        for &year in years {
            let table = self
                .year_table(year)
                .await
                .map_err(|source| AggregateError::Year { year, source })?;

            // Same column set in the same order, or concatenation would
            // silently misalign cells across years. Checked before tagging
            // so the error names the source table's real columns.
            match &expected {
                None => expected = Some(table.columns.clone()),
                Some(cols) => {
                    if &table.columns != cols {
                        return Err(AggregateError::Year {
                            year,
                            source: ScrapeError::ColumnMismatch {
                                expected: cols.clone(),
                                found: table.columns,
                            },
                        });
                    }
                }
            }

            let tagged = table.tag_year(year);
            match &mut combined {
                None => combined = Some(tagged),
                Some(all) => all.extend_from(tagged),
            }
        }

        let dataset = combined.unwrap_or_default();
        self.persist(&dataset)?;
        info!(
            rows = dataset.len(),
            columns = dataset.columns.len(),
            path = %self.config.output_path.display(),
            "aggregated dataset written"
        );
        Ok(dataset)
    }

    /// One year's extracted table (not yet year-tagged), from cache when
    /// possible.
    async fn year_table(&self, year: i32) -> Result<Table, ScrapeError> {
        let url = self.url_for(year);
        let document = self
            .cache
            .ensure(year, || self.fetcher.fetch(&url))
            .await?;

        let table = extract(
            &document,
            &self.config.table_id,
            &self.config.header_row_selector,
        )?;
        info!(year, rows = table.len(), "extracted table");
        Ok(table)
    }

    fn persist(&self, dataset: &Table) -> Result<(), AggregateError> {
        let path = &self.config.output_path;
        let write = || -> std::io::Result<()> {
            let mut w = BufWriter::new(File::create(path)?);
            dataset.write_csv(&mut w)?;
            w.flush()
        };
        write().map_err(|source| AggregateError::Persist {
            path: path.clone(),
            source,
        })
    }
}
