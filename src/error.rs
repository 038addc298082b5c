use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the fetch / cache / extract layers.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The server reported the URL as a bad request or not found. Retrying
    /// cannot help, so this fails immediately.
    #[error("`{url}` is not a valid target")]
    InvalidTarget { url: String },

    /// Any non-success status we do not have specific handling for.
    #[error("unexpected status {status} from `{url}`")]
    UnexpectedResponse { url: String, status: StatusCode },

    /// The server rate-limited every attempt we were willing to make.
    #[error("gave up on `{url}` after {attempts} rate-limited attempts")]
    RetryBudgetExhausted { url: String, attempts: usize },

    /// Cache-layer wrapper: fetching the document for a year failed, and no
    /// cache entry was written for it.
    #[error("fetching document for year {year} failed")]
    FetchFailed {
        year: i32,
        #[source]
        source: Box<ScrapeError>,
    },

    /// Another writer currently holds the claim on this year's cache entry.
    /// The claim is never stolen; the losing call fails instead.
    #[error("cache entry for year {year} is claimed by another writer")]
    ClaimHeld { year: i32 },

    /// The document parsed fine but contains no element with the requested id.
    #[error("no table with id `{table_id}` in document")]
    TableNotFound { table_id: String },

    /// A year's table does not share the column set of the years before it.
    /// Concatenating anyway would silently pad rows, so we refuse.
    #[error("table columns {found:?} do not match expected {expected:?}")]
    ColumnMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// A caller-supplied CSS selector failed to parse.
    #[error("invalid CSS selector `{selector}`")]
    InvalidSelector { selector: String },

    /// Connection-level failure (DNS, connect, mid-body disconnect).
    #[error("transport error for `{url}`")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors from a whole aggregation run. A run either succeeds for every
/// requested year or fails naming the first year that broke it.
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("year {year}: {source}")]
    Year {
        year: i32,
        #[source]
        source: ScrapeError,
    },

    #[error("writing aggregated dataset to `{}`", .path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AggregateError {
    /// The year that aborted the run, if the failure was year-specific.
    pub fn year(&self) -> Option<i32> {
        match self {
            AggregateError::Year { year, .. } => Some(*year),
            AggregateError::Persist { .. } => None,
        }
    }
}
