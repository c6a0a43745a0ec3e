// 📊 Dashboard data - what the TUI and the JSON API show
//
// Loads the enriched dataset plus the forecast tables written by the
// pipeline. Missing forecast files are reported, never replaced with
// made-up numbers.

use crate::config::PathsConfig;
use crate::dataset::Dataset;
use crate::loader::load_dataset;
use crate::output::{read_forecast_csv, read_scenarios_csv, ForecastRow, ScenarioRow};
use crate::record::{Confidence, FinancialInclusionRecord, Pillar, RecordType};
use anyhow::{bail, Result};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

pub const HEADLINE_INDICATOR: &str = "ACC_OWNERSHIP";

#[derive(Debug, Clone, Serialize)]
pub struct DashboardData {
    pub dataset: Dataset,
    pub forecast: Option<Vec<ForecastRow>>,
    pub scenarios: Option<Vec<ScenarioRow>>,
    /// Files that were expected but not found
    pub missing: Vec<String>,
    pub rejected_rows: usize,
}

impl DashboardData {
    /// Enriched dataset (base dataset as fallback) and forecast tables
    pub fn load(paths: &PathsConfig) -> Result<Self> {
        let mut missing = Vec::new();

        let enriched = paths.enriched_path();
        let dataset_path = if enriched.exists() {
            enriched
        } else {
            missing.push(enriched.display().to_string());
            paths.dataset_path()
        };
        if !dataset_path.exists() {
            bail!("no dataset found at {}", dataset_path.display());
        }
        let report = load_dataset(&dataset_path)?;

        let forecast = read_optional(&paths.forecast_path(), &mut missing, read_forecast_csv)?;
        let scenarios = read_optional(&paths.scenarios_path(), &mut missing, read_scenarios_csv)?;

        for file in &missing {
            tracing::warn!(file = %file, "dashboard input missing");
        }

        Ok(DashboardData {
            dataset: report.dataset,
            forecast,
            scenarios,
            missing,
            rejected_rows: report.rejected.len(),
        })
    }

    pub fn from_parts(
        dataset: Dataset,
        forecast: Option<Vec<ForecastRow>>,
        scenarios: Option<Vec<ScenarioRow>>,
    ) -> Self {
        DashboardData {
            dataset,
            forecast,
            scenarios,
            missing: Vec::new(),
            rejected_rows: 0,
        }
    }

    pub fn summary(&self) -> DashboardSummary {
        let latest = latest_observation(&self.dataset, HEADLINE_INDICATOR);
        let change_pp = previous_and_latest(&self.dataset, HEADLINE_INDICATOR)
            .map(|(prev, last)| last - prev);
        let final_forecast = self
            .forecast
            .as_ref()
            .and_then(|rows| rows.last())
            .map(|r| (r.year, r.forecast));

        let types = self.dataset.type_distribution();
        DashboardSummary {
            total_records: self.dataset.len(),
            observations: types.get("observation").copied().unwrap_or(0),
            events: types.get("event").copied().unwrap_or(0),
            impact_links: types.get("impact_link").copied().unwrap_or(0),
            latest,
            change_pp,
            final_forecast,
            pillar_distribution: pillar_distribution(&self.dataset),
            confidence_distribution: confidence_distribution(&self.dataset),
            missing: self.missing.clone(),
        }
    }
}

fn read_optional<T>(
    path: &Path,
    missing: &mut Vec<String>,
    read: fn(&Path) -> Result<Vec<T>>,
) -> Result<Option<Vec<T>>> {
    if path.exists() {
        Ok(Some(read(path)?))
    } else {
        missing.push(path.display().to_string());
        Ok(None)
    }
}

// ============================================================================
// SUMMARY
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct LatestObservation {
    pub record_id: String,
    pub value: f64,
    pub date: NaiveDate,
    pub source: String,
    pub confidence: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub total_records: usize,
    pub observations: usize,
    pub events: usize,
    pub impact_links: usize,
    pub latest: Option<LatestObservation>,
    /// Change between the last two observations, percentage points
    pub change_pp: Option<f64>,
    pub final_forecast: Option<(i32, f64)>,
    pub pillar_distribution: BTreeMap<String, usize>,
    pub confidence_distribution: BTreeMap<String, usize>,
    pub missing: Vec<String>,
}

// ============================================================================
// HELPERS
// ============================================================================

/// `48.5` → `"48.5%"`
pub fn format_metric(value: f64, suffix: &str, decimals: usize) -> String {
    format!("{:.*}{}", decimals, value, suffix)
}

/// Percent change from `previous` to `current`; 0 when `previous` is 0
pub fn calculate_growth_rate(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return 0.0;
    }
    (current - previous) / previous * 100.0
}

fn dated_observations<'a>(
    dataset: &'a Dataset,
    code: &str,
) -> Vec<(&'a FinancialInclusionRecord, NaiveDate, f64)> {
    let mut obs: Vec<_> = dataset
        .observations(Some(&[code][..]))
        .into_iter()
        .filter_map(|r| match (r.observation_date, r.value_numeric) {
            (Some(d), Some(v)) => Some((r, d, v)),
            _ => None,
        })
        .collect();
    obs.sort_by_key(|(_, d, _)| *d);
    obs
}

pub fn latest_observation(dataset: &Dataset, indicator_code: &str) -> Option<LatestObservation> {
    dated_observations(dataset, indicator_code)
        .last()
        .map(|(r, date, value)| LatestObservation {
            record_id: r.record_id.clone(),
            value: *value,
            date: *date,
            source: r.source_name.clone().unwrap_or_else(|| "Unknown".to_string()),
            confidence: r
                .confidence
                .map(|c| c.as_str().to_string())
                .unwrap_or_else(|| "Unknown".to_string()),
        })
}

fn previous_and_latest(dataset: &Dataset, indicator_code: &str) -> Option<(f64, f64)> {
    let obs = dated_observations(dataset, indicator_code);
    match obs.as_slice() {
        [.., (_, _, prev), (_, _, last)] => Some((*prev, *last)),
        _ => None,
    }
}

/// Observation counts per pillar
pub fn pillar_distribution(dataset: &Dataset) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for record in dataset.observations(None) {
        if let Some(p) = record.pillar {
            *counts.entry(p.as_str().to_string()).or_insert(0) += 1;
        }
    }
    counts
}

pub fn confidence_distribution(dataset: &Dataset) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for record in dataset.records() {
        if let Some(c) = record.confidence {
            *counts.entry(c.as_str().to_string()).or_insert(0) += 1;
        }
    }
    counts
}

#[derive(Debug, Clone, Serialize)]
pub struct TimelineEntry {
    pub record_id: String,
    pub date: Option<NaiveDate>,
    pub name: String,
    pub category: Option<String>,
    /// Indicators this event is linked to
    pub linked_indicators: Vec<String>,
}

/// Events in date order with the indicators their impact links point at
pub fn event_timeline(dataset: &Dataset) -> Vec<TimelineEntry> {
    let links = dataset.impact_links();
    dataset
        .events()
        .into_iter()
        .map(|event| {
            let linked_indicators = links
                .iter()
                .filter_map(|l| l.impact.as_ref())
                .filter(|l| l.parent_id.as_deref() == Some(event.record_id.as_str()))
                .filter_map(|l| l.related_indicator.clone())
                .collect();
            TimelineEntry {
                record_id: event.record_id.clone(),
                date: event.observation_date,
                name: event.label().to_string(),
                category: event.category.clone(),
                linked_indicators,
            }
        })
        .collect()
}

// ============================================================================
// FILTERS
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RecordFilter {
    pub pillar: Option<Pillar>,
    pub record_type: Option<RecordType>,
    pub confidence: Option<Confidence>,
    /// Inclusive; undated records never match a year range
    pub year_range: Option<(i32, i32)>,
}

impl RecordFilter {
    pub fn matches(&self, record: &FinancialInclusionRecord) -> bool {
        if let Some(p) = self.pillar {
            if record.pillar != Some(p) {
                return false;
            }
        }
        if let Some(t) = self.record_type {
            if record.record_type != t {
                return false;
            }
        }
        if let Some(c) = self.confidence {
            if record.confidence != Some(c) {
                return false;
            }
        }
        if let Some((from, to)) = self.year_range {
            match record.observation_date.map(|d| d.year()) {
                Some(year) if year >= from && year <= to => {}
                _ => return false,
            }
        }
        true
    }

    pub fn apply<'a>(&self, dataset: &'a Dataset) -> Vec<&'a FinancialInclusionRecord> {
        dataset.records().iter().filter(|r| self.matches(r)).collect()
    }

    pub fn is_empty(&self) -> bool {
        *self == RecordFilter::default()
    }
}

/// First and last observation year
pub fn year_bounds(dataset: &Dataset) -> Option<(i32, i32)> {
    let years: Vec<i32> = dataset
        .observations(None)
        .iter()
        .filter_map(|r| r.year())
        .collect();
    Some((*years.iter().min()?, *years.iter().max()?))
}
