//! Engagement Pulse - Social media engagement metrics pipeline
//!
//! Loads a CSV of post metrics, derives engagement, engagement rate, ROI and time
//! buckets per row, then reduces the derived table into per-platform summaries.
//!
//! ```no_run
//! use engagement_pulse::data::{DataLoader, MetricDeriver};
//! use engagement_pulse::stats::{DashboardReport, HourFill};
//!
//! let table = DataLoader::new().load_csv("posts.csv")?;
//! let derived = MetricDeriver::derive(&table, 5000.0)?;
//! let report = DashboardReport::build(&derived, HourFill::Observed)?;
//! println!("{}", report.best_roi_platform);
//! # Ok::<(), engagement_pulse::PipelineError>(())
//! ```

pub mod cache;
pub mod config;
pub mod data;
pub mod error;
pub mod stats;

pub use cache::PipelineCache;
pub use error::PipelineError;
