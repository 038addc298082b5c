use anyhow::{Context, Result};
use mvpscraper::{Pipeline, PipelineConfig};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Scrape award-voting pages for a year range (default 1991-2022) and write
/// the combined year-tagged voting table as CSV.
///
/// Usage: mvpscraper [START_YEAR [END_YEAR]]
#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    // ─── 2) year range from args ─────────────────────────────────────
    let mut args = std::env::args().skip(1);
    let start: i32 = match args.next() {
        Some(s) => s.parse().context("START_YEAR must be an integer")?,
        None => 1991,
    };
    let end: i32 = match args.next() {
        Some(s) => s.parse().context("END_YEAR must be an integer")?,
        None => 2022,
    };
    anyhow::ensure!(start <= end, "year range {start}..={end} is empty");
    let years: Vec<i32> = (start..=end).collect();

    // ─── 3) run the pipeline ─────────────────────────────────────────
    let config = PipelineConfig::default();
    info!(
        start,
        end,
        cache = %config.cache_dir.display(),
        output = %config.output_path.display(),
        "startup"
    );

    let pipeline = Pipeline::new(config)?;
    let dataset = pipeline.aggregate(&years).await?;

    info!(rows = dataset.len(), "all done");
    Ok(())
}
