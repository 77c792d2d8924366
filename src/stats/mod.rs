//! Stats module - Platform aggregation and reporting

mod aggregator;
mod calculator;
mod report;

pub use aggregator::{
    AggregateError, Aggregator, HourFill, HourlyEngagement, MetricValue, MonthlyEngagement,
};
pub use calculator::{PlatformStats, StatsCalculator};
pub use report::DashboardReport;
