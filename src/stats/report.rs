//! Dashboard Report Module
//! Bundles every aggregate a dashboard shows into one serializable value.

use crate::data::DerivedTable;
use crate::stats::aggregator::{
    AggregateError, Aggregator, HourFill, HourlyEngagement, MonthlyEngagement,
};
use crate::stats::calculator::{PlatformStats, StatsCalculator};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, instrument};

/// All aggregates for one derived table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardReport {
    pub row_count: usize,
    pub campaign_cost: f64,
    pub undefined_rate_rows: usize,
    pub monthly_trend_by_platform: BTreeMap<String, Vec<MonthlyEngagement>>,
    pub monthly_trend_overall: Vec<MonthlyEngagement>,
    pub engagement_rate_by_platform: BTreeMap<String, Option<f64>>,
    pub roi_by_platform: BTreeMap<String, f64>,
    pub optimal_hour_by_platform: BTreeMap<String, u32>,
    pub engagement_by_hour_by_platform: BTreeMap<String, Vec<HourlyEngagement>>,
    pub platform_stats: BTreeMap<String, PlatformStats>,
    /// `None` when no platform has a defined engagement rate.
    pub best_engagement_rate_platform: Option<String>,
    pub best_roi_platform: String,
}

impl DashboardReport {
    /// Build every aggregate. Independent reductions run in parallel.
    #[instrument(skip(table), fields(rows = table.len()))]
    pub fn build(table: &DerivedTable, fill: HourFill) -> Result<Self, AggregateError> {
        let ((monthly, overall), ((rates, roi), ((optimal, hourly), platform_stats))) =
            rayon::join(
                || {
                    rayon::join(
                        || Aggregator::monthly_trend_by_platform(table),
                        || Aggregator::monthly_trend_overall(table),
                    )
                },
                || {
                    rayon::join(
                        || {
                            rayon::join(
                                || Aggregator::mean_engagement_rate_by_platform(table),
                                || Aggregator::mean_roi_by_platform(table),
                            )
                        },
                        || {
                            rayon::join(
                                || {
                                    rayon::join(
                                        || Aggregator::optimal_hour_by_platform(table),
                                        || Aggregator::engagement_by_hour_by_platform(table, fill),
                                    )
                                },
                                || StatsCalculator::compute_platform_stats(table),
                            )
                        },
                    )
                },
            );

        let rates = rates?;
        let roi = roi?;

        let best_engagement_rate_platform = match Aggregator::best_platform_by_metric(&rates) {
            Ok(platform) => Some(platform.to_string()),
            Err(AggregateError::EmptyInput { .. }) => None,
        };
        let best_roi_platform = Aggregator::best_platform_by_metric(&roi)?.to_string();

        let report = Self {
            row_count: table.len(),
            campaign_cost: table.campaign_cost(),
            undefined_rate_rows: table.undefined_rate_count(),
            monthly_trend_by_platform: monthly?,
            monthly_trend_overall: overall?,
            engagement_rate_by_platform: rates,
            roi_by_platform: roi,
            optimal_hour_by_platform: optimal?,
            engagement_by_hour_by_platform: hourly?,
            platform_stats,
            best_engagement_rate_platform,
            best_roi_platform,
        };

        info!(
            platforms = report.roi_by_platform.len(),
            months = report.monthly_trend_overall.len(),
            "Built dashboard report"
        );
        Ok(report)
    }
}
