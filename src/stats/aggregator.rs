//! Platform Aggregation Module
//! Group-wise reductions over a derived table: monthly trends, per-platform means,
//! optimal posting hours and best-platform selection.
//!
//! Every reduction is pure and walks the table in row order, so repeated calls on the
//! same table are bit-identical. Per-platform results are keyed by a `BTreeMap`, which
//! fixes iteration to ascending platform name.

use crate::data::{DerivedRecord, DerivedTable, YearMonth};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregateError {
    #[error("{operation}: no input to aggregate")]
    EmptyInput { operation: &'static str },
}

/// Engagement summed over one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MonthlyEngagement {
    pub year_month: YearMonth,
    pub engagement: f64,
}

/// Mean engagement at one hour of day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HourlyEngagement {
    pub hour: u32,
    pub mean_engagement: f64,
}

/// How hours without observations are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HourFill {
    /// Only hours with at least one post.
    #[default]
    Observed,
    /// All 24 hours; empty hours report zero.
    ZeroFill,
}

/// A per-platform value that may be undefined.
pub trait MetricValue {
    fn metric(&self) -> Option<f64>;
}

impl MetricValue for f64 {
    fn metric(&self) -> Option<f64> {
        Some(*self)
    }
}

impl MetricValue for Option<f64> {
    fn metric(&self) -> Option<f64> {
        *self
    }
}

/// Running sum and count for a mean.
#[derive(Debug, Default, Clone, Copy)]
struct MeanAccumulator {
    sum: f64,
    count: usize,
}

impl MeanAccumulator {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

fn non_empty<'a>(
    table: &'a DerivedTable,
    operation: &'static str,
) -> Result<&'a [DerivedRecord], AggregateError> {
    if table.is_empty() {
        Err(AggregateError::EmptyInput { operation })
    } else {
        Ok(table.rows())
    }
}

fn hourly_means(rows: &[DerivedRecord]) -> BTreeMap<String, BTreeMap<u32, MeanAccumulator>> {
    let mut grouped: BTreeMap<String, BTreeMap<u32, MeanAccumulator>> = BTreeMap::new();
    for row in rows {
        grouped
            .entry(row.event.platform.clone())
            .or_default()
            .entry(row.hour)
            .or_default()
            .add(row.engagement);
    }
    grouped
}

/// Handles group-wise engagement reductions.
pub struct Aggregator;

impl Aggregator {
    /// Sum of engagement per (platform, month), months ascending within each platform.
    pub fn monthly_trend_by_platform(
        table: &DerivedTable,
    ) -> Result<BTreeMap<String, Vec<MonthlyEngagement>>, AggregateError> {
        let rows = non_empty(table, "monthly_trend_by_platform")?;

        let mut grouped: BTreeMap<String, BTreeMap<YearMonth, f64>> = BTreeMap::new();
        for row in rows {
            *grouped
                .entry(row.event.platform.clone())
                .or_default()
                .entry(row.year_month)
                .or_insert(0.0) += row.engagement;
        }

        Ok(grouped
            .into_iter()
            .map(|(platform, months)| {
                let trend = months
                    .into_iter()
                    .map(|(year_month, engagement)| MonthlyEngagement {
                        year_month,
                        engagement,
                    })
                    .collect();
                (platform, trend)
            })
            .collect())
    }

    /// Mean engagement rate per platform over rows with a defined rate.
    /// A platform whose rows all have zero views maps to `None`.
    pub fn mean_engagement_rate_by_platform(
        table: &DerivedTable,
    ) -> Result<BTreeMap<String, Option<f64>>, AggregateError> {
        let rows = non_empty(table, "mean_engagement_rate_by_platform")?;

        let mut grouped: BTreeMap<String, MeanAccumulator> = BTreeMap::new();
        let mut excluded = 0usize;
        for row in rows {
            let acc = grouped.entry(row.event.platform.clone()).or_default();
            match row.engagement_rate {
                Some(rate) => acc.add(rate),
                None => excluded += 1,
            }
        }
        if excluded > 0 {
            debug!(excluded, "Excluded zero-view rows from engagement rate means");
        }

        Ok(grouped
            .into_iter()
            .map(|(platform, acc)| (platform, acc.mean()))
            .collect())
    }

    /// Mean ROI per platform.
    pub fn mean_roi_by_platform(
        table: &DerivedTable,
    ) -> Result<BTreeMap<String, f64>, AggregateError> {
        let rows = non_empty(table, "mean_roi_by_platform")?;

        let mut grouped: BTreeMap<String, MeanAccumulator> = BTreeMap::new();
        for row in rows {
            grouped
                .entry(row.event.platform.clone())
                .or_default()
                .add(row.roi);
        }

        // Every group holds at least one row.
        Ok(grouped
            .into_iter()
            .filter_map(|(platform, acc)| acc.mean().map(|m| (platform, m)))
            .collect())
    }

    /// Key with the largest defined value. Ties keep the first key in iteration order;
    /// undefined values are skipped.
    pub fn best_platform_by_metric<'a, I, V>(metric: I) -> Result<&'a str, AggregateError>
    where
        I: IntoIterator<Item = (&'a String, &'a V)>,
        V: MetricValue + 'a,
    {
        let mut best: Option<(&'a str, f64)> = None;
        for (platform, value) in metric {
            let Some(value) = value.metric() else {
                continue;
            };
            match best {
                Some((_, current)) if value <= current => {}
                _ => best = Some((platform.as_str(), value)),
            }
        }

        best.map(|(platform, _)| platform)
            .ok_or(AggregateError::EmptyInput {
                operation: "best_platform_by_metric",
            })
    }

    /// Hour of day with the highest mean engagement per platform.
    /// Ties resolve to the smallest hour.
    pub fn optimal_hour_by_platform(
        table: &DerivedTable,
    ) -> Result<BTreeMap<String, u32>, AggregateError> {
        let rows = non_empty(table, "optimal_hour_by_platform")?;

        let mut result = BTreeMap::new();
        for (platform, hours) in hourly_means(rows) {
            let mut best: Option<(u32, f64)> = None;
            // BTreeMap yields hours ascending, so strict `>` keeps the earliest tie.
            for (hour, acc) in hours {
                let Some(mean) = acc.mean() else {
                    continue;
                };
                match best {
                    Some((_, current)) if mean <= current => {}
                    _ => best = Some((hour, mean)),
                }
            }
            if let Some((hour, _)) = best {
                result.insert(platform, hour);
            }
        }
        Ok(result)
    }

    /// Mean engagement per hour of day per platform, hours ascending.
    pub fn engagement_by_hour_by_platform(
        table: &DerivedTable,
        fill: HourFill,
    ) -> Result<BTreeMap<String, Vec<HourlyEngagement>>, AggregateError> {
        let rows = non_empty(table, "engagement_by_hour_by_platform")?;

        Ok(hourly_means(rows)
            .into_iter()
            .map(|(platform, hours)| {
                let series: Vec<HourlyEngagement> = match fill {
                    HourFill::Observed => hours
                        .iter()
                        .filter_map(|(&hour, acc)| {
                            acc.mean().map(|mean_engagement| HourlyEngagement {
                                hour,
                                mean_engagement,
                            })
                        })
                        .collect(),
                    HourFill::ZeroFill => (0..24)
                        .map(|hour| HourlyEngagement {
                            hour,
                            mean_engagement: hours
                                .get(&hour)
                                .and_then(MeanAccumulator::mean)
                                .unwrap_or(0.0),
                        })
                        .collect(),
                };
                (platform, series)
            })
            .collect())
    }

    /// Sum of engagement per month across all platforms, months ascending.
    pub fn monthly_trend_overall(
        table: &DerivedTable,
    ) -> Result<Vec<MonthlyEngagement>, AggregateError> {
        let rows = non_empty(table, "monthly_trend_overall")?;

        let mut grouped: BTreeMap<YearMonth, f64> = BTreeMap::new();
        for row in rows {
            *grouped.entry(row.year_month).or_insert(0.0) += row.engagement;
        }

        Ok(grouped
            .into_iter()
            .map(|(year_month, engagement)| MonthlyEngagement {
                year_month,
                engagement,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{EventRecord, MetricDeriver, Table};
    use chrono::NaiveDate;

    fn post(platform: &str, date: &str, hour: u32, views: f64, engagement: (f64, f64, f64)) -> EventRecord {
        EventRecord {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap(),
            platform: platform.to_string(),
            views,
            likes: engagement.0,
            comments: engagement.1,
            shares: engagement.2,
        }
    }

    fn derived(rows: Vec<EventRecord>) -> DerivedTable {
        MetricDeriver::derive(&Table::new(rows), 5000.0).unwrap()
    }

    fn example() -> DerivedTable {
        derived(vec![
            post("A", "2024-01-01", 0, 100.0, (10.0, 5.0, 5.0)),
            post("A", "2024-02-01", 0, 0.0, (1.0, 1.0, 1.0)),
        ])
    }

    #[test]
    fn test_monthly_trend_by_platform_example() {
        let trend = Aggregator::monthly_trend_by_platform(&example()).unwrap();
        let a: Vec<(String, f64)> = trend["A"]
            .iter()
            .map(|m| (m.year_month.to_string(), m.engagement))
            .collect();
        assert_eq!(trend.len(), 1);
        assert_eq!(
            a,
            vec![("2024-01".to_string(), 20.0), ("2024-02".to_string(), 3.0)]
        );
    }

    #[test]
    fn test_monthly_trend_sorted_across_years() {
        let table = derived(vec![
            post("B", "2025-01-15", 1, 1.0, (1.0, 0.0, 0.0)),
            post("B", "2024-12-15", 1, 1.0, (2.0, 0.0, 0.0)),
            post("B", "2024-03-15", 1, 1.0, (4.0, 0.0, 0.0)),
            post("B", "2024-12-01", 1, 1.0, (8.0, 0.0, 0.0)),
        ]);
        let trend = Aggregator::monthly_trend_by_platform(&table).unwrap();
        let labels: Vec<String> = trend["B"].iter().map(|m| m.year_month.to_string()).collect();
        assert_eq!(labels, vec!["2024-03", "2024-12", "2025-01"]);
        assert_eq!(trend["B"][1].engagement, 10.0);
    }

    #[test]
    fn test_mean_engagement_rate_excludes_zero_views() {
        let rates = Aggregator::mean_engagement_rate_by_platform(&example()).unwrap();
        assert_eq!(rates["A"], Some(20.0));
    }

    #[test]
    fn test_mean_engagement_rate_all_excluded_is_undefined() {
        let table = derived(vec![
            post("A", "2024-01-01", 0, 50.0, (5.0, 0.0, 0.0)),
            post("Z", "2024-01-01", 0, 0.0, (5.0, 0.0, 0.0)),
            post("Z", "2024-01-02", 0, 0.0, (7.0, 0.0, 0.0)),
        ]);
        let rates = Aggregator::mean_engagement_rate_by_platform(&table).unwrap();
        assert_eq!(rates["A"], Some(10.0));
        assert_eq!(rates["Z"], None);
        assert_eq!(Aggregator::best_platform_by_metric(&rates), Ok("A"));
    }

    #[test]
    fn test_mean_roi_by_platform() {
        let table = derived(vec![
            post("A", "2024-01-01", 0, 1.0, (6000.0, 0.0, 0.0)),
            post("A", "2024-01-01", 0, 1.0, (4000.0, 0.0, 0.0)),
            post("B", "2024-01-01", 0, 0.0, (10000.0, 0.0, 0.0)),
        ]);
        let roi = Aggregator::mean_roi_by_platform(&table).unwrap();
        assert_eq!(roi["A"], 0.0);
        assert_eq!(roi["B"], 100.0);
        assert_eq!(Aggregator::best_platform_by_metric(&roi), Ok("B"));
    }

    #[test]
    fn test_best_platform_empty_and_ties() {
        let empty: BTreeMap<String, f64> = BTreeMap::new();
        assert_eq!(
            Aggregator::best_platform_by_metric(&empty),
            Err(AggregateError::EmptyInput {
                operation: "best_platform_by_metric"
            })
        );

        let undefined: BTreeMap<String, Option<f64>> = [("A".to_string(), None)].into();
        assert!(Aggregator::best_platform_by_metric(&undefined).is_err());

        let tied: BTreeMap<String, f64> = [
            ("Twitter".to_string(), 3.0),
            ("Instagram".to_string(), 3.0),
            ("LinkedIn".to_string(), 1.0),
        ]
        .into();
        assert_eq!(Aggregator::best_platform_by_metric(&tied), Ok("Instagram"));
    }

    #[test]
    fn test_optimal_hour_tie_picks_smaller_hour() {
        let table = derived(vec![
            post("A", "2024-01-01", 18, 1.0, (10.0, 0.0, 0.0)),
            post("A", "2024-01-01", 9, 1.0, (4.0, 6.0, 0.0)),
            post("A", "2024-01-02", 12, 1.0, (3.0, 0.0, 0.0)),
            post("B", "2024-01-01", 7, 1.0, (1.0, 0.0, 0.0)),
            post("B", "2024-01-01", 20, 1.0, (2.0, 0.0, 0.0)),
        ]);
        let optimal = Aggregator::optimal_hour_by_platform(&table).unwrap();
        assert_eq!(optimal["A"], 9);
        assert_eq!(optimal["B"], 20);
    }

    #[test]
    fn test_optimal_hour_uses_mean_not_sum() {
        let table = derived(vec![
            post("A", "2024-01-01", 8, 1.0, (5.0, 0.0, 0.0)),
            post("A", "2024-01-02", 8, 1.0, (5.0, 0.0, 0.0)),
            post("A", "2024-01-03", 8, 1.0, (5.0, 0.0, 0.0)),
            post("A", "2024-01-01", 21, 1.0, (6.0, 0.0, 0.0)),
        ]);
        let optimal = Aggregator::optimal_hour_by_platform(&table).unwrap();
        assert_eq!(optimal["A"], 21);
    }

    #[test]
    fn test_engagement_by_hour_observed_and_zero_fill() {
        let table = derived(vec![
            post("A", "2024-01-01", 15, 1.0, (2.0, 0.0, 0.0)),
            post("A", "2024-01-02", 15, 1.0, (4.0, 0.0, 0.0)),
            post("A", "2024-01-01", 3, 1.0, (1.0, 0.0, 0.0)),
        ]);

        let observed = Aggregator::engagement_by_hour_by_platform(&table, HourFill::Observed).unwrap();
        assert_eq!(
            observed["A"],
            vec![
                HourlyEngagement { hour: 3, mean_engagement: 1.0 },
                HourlyEngagement { hour: 15, mean_engagement: 3.0 },
            ]
        );

        let filled = Aggregator::engagement_by_hour_by_platform(&table, HourFill::ZeroFill).unwrap();
        assert_eq!(filled["A"].len(), 24);
        assert_eq!(filled["A"][0].mean_engagement, 0.0);
        assert_eq!(filled["A"][15].mean_engagement, 3.0);
        assert!(filled["A"].windows(2).all(|w| w[0].hour < w[1].hour));
    }

    #[test]
    fn test_monthly_trend_overall_sum_invariant() {
        let table = derived(vec![
            post("A", "2024-01-01", 0, 10.0, (1.0, 2.0, 3.0)),
            post("B", "2024-01-20", 0, 10.0, (4.0, 0.0, 0.0)),
            post("B", "2023-06-20", 0, 10.0, (0.0, 0.0, 9.0)),
            post("C", "2024-04-02", 0, 0.0, (1.0, 1.0, 1.0)),
        ]);
        let overall = Aggregator::monthly_trend_overall(&table).unwrap();
        let labels: Vec<String> = overall.iter().map(|m| m.year_month.to_string()).collect();
        assert_eq!(labels, vec!["2023-06", "2024-01", "2024-04"]);
        assert_eq!(overall[1].engagement, 10.0);

        let total: f64 = overall.iter().map(|m| m.engagement).sum();
        let expected: f64 = table.rows().iter().map(|r| r.engagement).sum();
        assert_eq!(total, expected);
    }

    #[test]
    fn test_empty_table_is_empty_input() {
        let table = derived(Vec::new());
        assert!(matches!(
            Aggregator::monthly_trend_overall(&table),
            Err(AggregateError::EmptyInput { operation: "monthly_trend_overall" })
        ));
        assert!(Aggregator::optimal_hour_by_platform(&table).is_err());
        assert!(Aggregator::mean_roi_by_platform(&table).is_err());
    }

    #[test]
    fn test_repeated_calls_identical() {
        let table = derived(vec![
            post("A", "2024-01-01", 1, 3.0, (0.1, 0.2, 0.3)),
            post("A", "2024-01-01", 1, 7.0, (0.7, 0.11, 0.13)),
            post("B", "2024-02-01", 2, 9.0, (1.1, 2.2, 3.3)),
        ]);
        assert_eq!(
            Aggregator::mean_engagement_rate_by_platform(&table),
            Aggregator::mean_engagement_rate_by_platform(&table)
        );
        assert_eq!(
            Aggregator::engagement_by_hour_by_platform(&table, HourFill::Observed),
            Aggregator::engagement_by_hour_by_platform(&table, HourFill::Observed)
        );
    }
}
