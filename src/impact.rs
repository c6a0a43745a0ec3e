// 💥 Event Impact Analyzer - segmented regression around known event dates
//
// For each event the series is split into pre (date < event) and post
// (date >= event) segments. A line is fitted to each, with time measured in
// years from the event date, so both intercepts sit at the event itself.

use crate::series::{decimal_year, EventMarker, SeriesPoint, TimeSeries};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

const Z_95: f64 = 1.96;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpactConfig {
    /// Observations required on each side of an event
    pub min_segment_points: usize,
}

impl Default for ImpactConfig {
    fn default() -> Self {
        ImpactConfig {
            min_segment_points: 2,
        }
    }
}

/// Estimated effect of one event on one indicator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventImpact {
    pub event_id: String,
    pub event_name: String,
    pub event_date: NaiveDate,
    pub indicator_code: String,
    pub pre_points: usize,
    pub post_points: usize,
    pub pre_slope: f64,
    pub post_slope: f64,
    /// Post line minus pre line at the event date
    pub level_shift: f64,
    /// Post slope minus pre slope, per year
    pub trend_change: f64,
    pub std_err: f64,
    pub ci_low: f64,
    pub ci_high: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedEvent {
    pub event_id: String,
    pub event_name: String,
    pub event_date: NaiveDate,
    pub pre_points: usize,
    pub post_points: usize,
    /// Too few observations after the event for its effect to show in the data
    pub awaiting_data: bool,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImpactAnalysis {
    pub indicator_code: String,
    pub impacts: Vec<EventImpact>,
    pub skipped: Vec<SkippedEvent>,
}

impl ImpactAnalysis {
    pub fn summary(&self) -> String {
        format!(
            "{}: {} events estimated, {} skipped",
            self.indicator_code,
            self.impacts.len(),
            self.skipped.len()
        )
    }

    pub fn is_estimated(&self, event_id: &str) -> bool {
        self.impacts.iter().any(|i| i.event_id == event_id)
    }
}

// ============================================================================
// SEGMENT FIT
// ============================================================================

struct SegmentFit {
    n: usize,
    intercept: f64,
    slope: f64,
    sse: f64,
    x_mean: f64,
    sxx: f64,
}

impl SegmentFit {
    fn new(xs: &[f64], ys: &[f64]) -> Self {
        let n = xs.len();
        let x_mean = xs.iter().sum::<f64>() / n as f64;
        let y_mean = ys.iter().sum::<f64>() / n as f64;
        let sxx: f64 = xs.iter().map(|x| (x - x_mean).powi(2)).sum();
        let sxy: f64 = xs
            .iter()
            .zip(ys)
            .map(|(x, y)| (x - x_mean) * (y - y_mean))
            .sum();

        // All points on one date: flat line through their mean
        let slope = if sxx > 1e-12 { sxy / sxx } else { 0.0 };
        let intercept = y_mean - slope * x_mean;
        let sse = xs
            .iter()
            .zip(ys)
            .map(|(x, y)| (y - intercept - slope * x).powi(2))
            .sum();

        SegmentFit {
            n,
            intercept,
            slope,
            sse,
            x_mean,
            sxx,
        }
    }

    /// Variance factor of the fitted value at x = 0 (the event date)
    fn leverage_at_event(&self) -> f64 {
        let spread = if self.sxx > 1e-12 {
            self.x_mean.powi(2) / self.sxx
        } else {
            0.0
        };
        1.0 / self.n as f64 + spread
    }
}

// ============================================================================
// ANALYSIS
// ============================================================================

/// Estimate level shift and trend change for every event with enough support
pub fn analyze_event_impacts(
    series: &TimeSeries,
    events: &[EventMarker],
    config: &ImpactConfig,
) -> ImpactAnalysis {
    let mut impacts = Vec::new();
    let mut skipped = Vec::new();

    for event in events {
        let (pre, post): (Vec<&SeriesPoint>, Vec<&SeriesPoint>) =
            series.points.iter().partition(|p| p.date < event.date);

        if pre.len() < config.min_segment_points || post.len() < config.min_segment_points {
            let reason = format!(
                "needs {} observations on each side, has {} before and {} after",
                config.min_segment_points,
                pre.len(),
                post.len()
            );
            tracing::info!(event = %event.record_id, %reason, "event skipped");
            skipped.push(SkippedEvent {
                event_id: event.record_id.clone(),
                event_name: event.name.clone(),
                event_date: event.date,
                pre_points: pre.len(),
                post_points: post.len(),
                awaiting_data: post.len() < config.min_segment_points,
                reason,
            });
            continue;
        }

        let origin = decimal_year(event.date);
        let split = |points: &[&SeriesPoint]| -> (Vec<f64>, Vec<f64>) {
            points
                .iter()
                .map(|p| (decimal_year(p.date) - origin, p.value))
                .unzip()
        };
        let (pre_x, pre_y) = split(&pre);
        let (post_x, post_y) = split(&post);
        let pre_fit = SegmentFit::new(&pre_x, &pre_y);
        let post_fit = SegmentFit::new(&post_x, &post_y);

        let level_shift = post_fit.intercept - pre_fit.intercept;
        let trend_change = post_fit.slope - pre_fit.slope;

        let total = pre.len() + post.len();
        let dof = total.saturating_sub(4).max(1);
        let sigma2 = (pre_fit.sse + post_fit.sse) / dof as f64;
        let std_err = (sigma2 * (pre_fit.leverage_at_event() + post_fit.leverage_at_event())).sqrt();

        tracing::debug!(
            event = %event.record_id,
            level_shift,
            trend_change,
            std_err,
            "event impact estimated"
        );

        impacts.push(EventImpact {
            event_id: event.record_id.clone(),
            event_name: event.name.clone(),
            event_date: event.date,
            indicator_code: series.indicator_code.clone(),
            pre_points: pre.len(),
            post_points: post.len(),
            pre_slope: pre_fit.slope,
            post_slope: post_fit.slope,
            level_shift,
            trend_change,
            std_err,
            ci_low: level_shift - Z_95 * std_err,
            ci_high: level_shift + Z_95 * std_err,
        });
    }

    ImpactAnalysis {
        indicator_code: series.indicator_code.clone(),
        impacts,
        skipped,
    }
}

// ============================================================================
// WINDOW STATISTICS
// ============================================================================

/// Points within `[date - days_before, date + days_after]`
pub fn filter_by_event_window(
    points: &[SeriesPoint],
    date: NaiveDate,
    days_before: i64,
    days_after: i64,
) -> Vec<SeriesPoint> {
    let start = date - Duration::days(days_before);
    let end = date + Duration::days(days_after);
    points
        .iter()
        .filter(|p| p.date >= start && p.date <= end)
        .copied()
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrePostStats {
    pub pre_count: usize,
    pub post_count: usize,
    pub pre_mean: Option<f64>,
    pub post_mean: Option<f64>,
    pub absolute_change: Option<f64>,
    /// Percent change of the post mean over the pre mean
    pub relative_change: Option<f64>,
}

pub fn pre_post_statistics(points: &[SeriesPoint], date: NaiveDate) -> PrePostStats {
    let mean = |values: &[f64]| -> Option<f64> {
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        }
    };
    let pre: Vec<f64> = points.iter().filter(|p| p.date < date).map(|p| p.value).collect();
    let post: Vec<f64> = points.iter().filter(|p| p.date >= date).map(|p| p.value).collect();

    let pre_mean = mean(&pre);
    let post_mean = mean(&post);
    let absolute_change = match (pre_mean, post_mean) {
        (Some(a), Some(b)) => Some(b - a),
        _ => None,
    };
    let relative_change = match (pre_mean, absolute_change) {
        (Some(a), Some(change)) if a != 0.0 => Some(change / a * 100.0),
        _ => None,
    };

    PrePostStats {
        pre_count: pre.len(),
        post_count: post.len(),
        pre_mean,
        post_mean,
        absolute_change,
        relative_change,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ownership() -> TimeSeries {
        TimeSeries {
            indicator_code: "ACC_OWNERSHIP".to_string(),
            points: vec![
                SeriesPoint { date: date(2011, 12, 31), value: 22.0 },
                SeriesPoint { date: date(2014, 12, 31), value: 35.0 },
                SeriesPoint { date: date(2017, 12, 31), value: 35.0 },
                SeriesPoint { date: date(2021, 12, 31), value: 46.0 },
                SeriesPoint { date: date(2024, 6, 30), value: 48.5 },
            ],
        }
    }

    fn marker(id: &str, d: NaiveDate) -> EventMarker {
        EventMarker {
            record_id: id.to_string(),
            name: id.to_string(),
            date: d,
        }
    }

    #[test]
    fn test_events_without_support_are_skipped() {
        let events = vec![
            marker("EVT_TELEBIRR", date(2021, 5, 11)),
            marker("EVT_MPESA", date(2023, 8, 16)),
            marker("EVT_FAYDA", date(2024, 1, 25)),
        ];

        let analysis = analyze_event_impacts(&ownership(), &events, &ImpactConfig::default());

        println!("{}", analysis.summary());
        assert_eq!(analysis.impacts.len(), 1);
        assert!(analysis.is_estimated("EVT_TELEBIRR"));
        assert_eq!(analysis.skipped.len(), 2);
        assert_eq!(analysis.skipped[0].post_points, 1);
        assert!(analysis.skipped.iter().all(|s| s.awaiting_data));

        let telebirr = &analysis.impacts[0];
        assert_eq!((telebirr.pre_points, telebirr.post_points), (3, 2));
        assert!(telebirr.ci_low <= telebirr.level_shift);
        assert!(telebirr.level_shift <= telebirr.ci_high);
    }

    #[test]
    fn test_event_before_series_is_skipped_but_not_awaiting() {
        let analysis = analyze_event_impacts(
            &ownership(),
            &[marker("EVT_OLD", date(2008, 1, 1))],
            &ImpactConfig::default(),
        );

        assert!(analysis.impacts.is_empty());
        let skipped = &analysis.skipped[0];
        assert_eq!((skipped.pre_points, skipped.post_points), (0, 5));
        assert!(!skipped.awaiting_data);
        assert!(skipped.reason.contains("has 0 before and 5 after"));
    }

    #[test]
    fn test_known_break_is_recovered() {
        // Flat 10 before 2020, flat 15 after, exact data
        let points: Vec<SeriesPoint> = (2015..=2024)
            .map(|y| SeriesPoint {
                date: date(y, 7, 1),
                value: if y >= 2020 { 15.0 } else { 10.0 },
            })
            .collect();
        let series = TimeSeries {
            indicator_code: "X".to_string(),
            points,
        };

        let analysis =
            analyze_event_impacts(&series, &[marker("EVT", date(2020, 1, 1))], &ImpactConfig::default());
        let impact = &analysis.impacts[0];

        assert!((impact.level_shift - 5.0).abs() < 1e-9);
        assert!(impact.trend_change.abs() < 1e-9);
        assert!(impact.std_err.abs() < 1e-9);
    }

    #[test]
    fn test_min_segment_points_configurable() {
        let config = ImpactConfig {
            min_segment_points: 1,
        };
        let analysis =
            analyze_event_impacts(&ownership(), &[marker("EVT_FAYDA", date(2024, 1, 25))], &config);

        assert_eq!(analysis.impacts.len(), 1);
        assert!(analysis.skipped.is_empty());
    }

    #[test]
    fn test_filter_by_event_window() {
        let window = filter_by_event_window(&ownership().points, date(2021, 5, 11), 365 * 4, 365);

        assert_eq!(window.len(), 2);
        assert_eq!(window[0].value, 35.0);
        assert_eq!(window[1].value, 46.0);
    }

    #[test]
    fn test_pre_post_statistics() {
        let stats = pre_post_statistics(&ownership().points, date(2021, 5, 11));

        assert_eq!(stats.pre_count, 3);
        assert_eq!(stats.post_count, 2);
        assert!((stats.pre_mean.unwrap() - 30.666666666666668).abs() < 1e-9);
        assert!((stats.post_mean.unwrap() - 47.25).abs() < 1e-9);
        assert!(stats.relative_change.unwrap() > 50.0);

        let none_before = pre_post_statistics(&ownership().points, date(2000, 1, 1));
        assert_eq!(none_before.pre_mean, None);
        assert_eq!(none_before.relative_change, None);
    }
}
