//! Survey-sheet dashboard pipeline.
//!
//! Raw spreadsheet rows go through schema normalization, yes/no indicator
//! coercion, a caller-owned filter and aggregation, ending in a
//! [`DashboardView`](types::DashboardView) that a renderer can draw and an
//! exporter can write out as CSV.
pub mod config;
pub mod error;
pub mod filter;
pub mod indicators;
pub mod loader;
pub mod output;
pub mod reports;
pub mod schema;
pub mod source;
pub mod types;
pub mod util;

pub use config::DashboardConfig;
pub use error::{DashError, Result};
pub use filter::{ComplianceFilter, FilterSpec};
pub use source::{CsvSource, DataSource};
pub use types::{AggregateResult, Dataset, DashboardView, Indicator, IndicatorSet, RawTable};
