//! Metric Derivation Module
//! Computes per-row engagement metrics and time buckets from raw event records.

use crate::data::record::{EventRecord, Table};
use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Serialize, Serializer};
use std::fmt;
use thiserror::Error;
use tracing::{info, instrument, warn};

/// Campaign cost assumed by the dashboards when none is configured.
pub const DEFAULT_CAMPAIGN_COST: f64 = 5000.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProcessorError {
    #[error("Invalid parameter {name}: {value} (must be a finite value greater than zero)")]
    InvalidParameter { name: &'static str, value: f64 },
    #[error("Engagement rate is undefined for row {row} (zero views)")]
    UndefinedMetric { row: usize },
    #[error("Row {row}: {metric} is not a finite number")]
    NonFiniteMetric { row: usize, metric: &'static str },
}

/// Calendar month bucket. Orders chronologically, displays as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn from_datetime(date: &NaiveDateTime) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Event record plus its derived metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedRecord {
    #[serde(flatten)]
    pub event: EventRecord,
    pub engagement: f64,
    /// `None` when the post has zero views or the rate is not representable.
    pub engagement_rate: Option<f64>,
    pub roi: f64,
    pub year_month: YearMonth,
    pub hour: u32,
}

impl DerivedRecord {
    /// Engagement rate, or `UndefinedMetric` for zero-view rows. `row` is reported 1-based.
    pub fn checked_engagement_rate(&self, row: usize) -> Result<f64, ProcessorError> {
        self.engagement_rate
            .ok_or(ProcessorError::UndefinedMetric { row })
    }
}

/// Output of [`MetricDeriver::derive`]. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedTable {
    rows: Vec<DerivedRecord>,
    campaign_cost: f64,
}

impl DerivedTable {
    pub fn rows(&self) -> &[DerivedRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn campaign_cost(&self) -> f64 {
        self.campaign_cost
    }

    /// The original columns, without any derived field.
    pub fn source_table(&self) -> Table {
        self.rows.iter().map(|r| r.event.clone()).collect()
    }

    /// Number of rows whose engagement rate is undefined.
    pub fn undefined_rate_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| r.engagement_rate.is_none())
            .count()
    }
}

/// Derives engagement metrics. Pure: no clock, no randomness, input untouched.
pub struct MetricDeriver;

impl MetricDeriver {
    pub fn engagement(event: &EventRecord) -> f64 {
        event.likes + event.comments + event.shares
    }

    /// `None` for zero views, and for views so small the rate overflows.
    pub fn engagement_rate(engagement: f64, views: f64) -> Option<f64> {
        if views == 0.0 {
            return None;
        }
        Some(100.0 * engagement / views).filter(|rate| rate.is_finite())
    }

    pub fn roi(engagement: f64, campaign_cost: f64) -> f64 {
        100.0 * (engagement - campaign_cost) / campaign_cost
    }

    /// Derive one record. `row` is 1-based and only used for error context.
    pub fn derive_record(
        event: &EventRecord,
        campaign_cost: f64,
        row: usize,
    ) -> Result<DerivedRecord, ProcessorError> {
        let engagement = Self::engagement(event);
        if !engagement.is_finite() {
            return Err(ProcessorError::NonFiniteMetric {
                row,
                metric: "engagement",
            });
        }
        let roi = Self::roi(engagement, campaign_cost);
        if !roi.is_finite() {
            return Err(ProcessorError::NonFiniteMetric { row, metric: "roi" });
        }

        Ok(DerivedRecord {
            engagement,
            engagement_rate: Self::engagement_rate(engagement, event.views),
            roi,
            year_month: YearMonth::from_datetime(&event.date),
            hour: event.date.hour(),
            event: event.clone(),
        })
    }

    /// Derive every row of `table`.
    #[instrument(skip(table), fields(rows = table.len()))]
    pub fn derive(table: &Table, campaign_cost: f64) -> Result<DerivedTable, ProcessorError> {
        if !campaign_cost.is_finite() || campaign_cost <= 0.0 {
            return Err(ProcessorError::InvalidParameter {
                name: "campaign_cost",
                value: campaign_cost,
            });
        }

        let rows = table
            .rows()
            .iter()
            .enumerate()
            .map(|(i, event)| Self::derive_record(event, campaign_cost, i + 1))
            .collect::<Result<Vec<_>, _>>()?;

        let derived = DerivedTable {
            rows,
            campaign_cost,
        };

        let undefined = derived.undefined_rate_count();
        if undefined > 0 {
            warn!(undefined, "Rows without a defined engagement rate");
        }
        info!(rows = derived.len(), "Derived engagement metrics");

        Ok(derived)
    }
}
