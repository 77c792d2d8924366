//! Statistics Calculator Module
//! Descriptive statistics of engagement for each platform.

use crate::data::DerivedTable;
use serde::Serialize;
use statrs::statistics::{Data, OrderStatistics, Statistics};
use std::collections::BTreeMap;

/// Engagement statistics for a single platform.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformStats {
    pub platform: String,
    pub count: usize,
    pub total_engagement: f64,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub variance: f64,
    pub p95: f64,
    pub p05: f64,
}

/// Handles descriptive statistics over derived engagement.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Descriptive statistics of `values`, or `None` when there are none.
    ///
    /// Percentiles use the statrs median-unbiased quantile estimator.
    pub fn compute_descriptive_stats(platform: &str, values: &[f64]) -> Option<PlatformStats> {
        if values.is_empty() {
            return None;
        }

        // Sample variance; a single observation has none.
        let variance = match values.len() {
            1 => 0.0,
            _ => values.iter().variance(),
        };
        let mut ordered = Data::new(values.to_vec());

        Some(PlatformStats {
            platform: platform.to_string(),
            count: values.len(),
            total_engagement: values.iter().sum(),
            mean: values.iter().mean(),
            median: ordered.median(),
            std: variance.sqrt(),
            variance,
            p95: ordered.percentile(95),
            p05: ordered.percentile(5),
        })
    }

    /// Engagement values grouped by platform, in row order.
    pub fn engagement_by_platform(table: &DerivedTable) -> BTreeMap<String, Vec<f64>> {
        let mut grouped: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for row in table.rows() {
            grouped
                .entry(row.event.platform.clone())
                .or_default()
                .push(row.engagement);
        }
        grouped
    }

    /// Engagement statistics for every platform in the table.
    pub fn compute_platform_stats(table: &DerivedTable) -> BTreeMap<String, PlatformStats> {
        Self::engagement_by_platform(table)
            .into_iter()
            .filter_map(|(platform, values)| {
                Self::compute_descriptive_stats(&platform, &values).map(|stats| (platform, stats))
            })
            .collect()
    }
}
