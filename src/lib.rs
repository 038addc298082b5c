pub mod aggregate;
pub mod cache;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod table;

pub use aggregate::{Pipeline, PipelineConfig};
pub use error::{AggregateError, ScrapeError};
pub use fetch::{Fetcher, RetryPolicy};
pub use table::Table;
