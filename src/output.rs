// 💾 Forecast output - CSV tables for the dashboard and downstream reports

use crate::forecast::{ForecastPoint, ForecastResult};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One row of the ensemble forecast table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Forecast (%)")]
    pub forecast: f64,
    #[serde(rename = "Lower 80% CI")]
    pub lower_80: f64,
    #[serde(rename = "Upper 80% CI")]
    pub upper_80: f64,
    #[serde(rename = "Lower 95% CI")]
    pub lower_95: f64,
    #[serde(rename = "Upper 95% CI")]
    pub upper_95: f64,
}

impl From<&ForecastPoint> for ForecastRow {
    fn from(p: &ForecastPoint) -> Self {
        ForecastRow {
            year: p.year,
            forecast: round2(p.point),
            lower_80: round2(p.lower_80),
            upper_80: round2(p.upper_80),
            lower_95: round2(p.lower_95),
            upper_95: round2(p.upper_95),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRow {
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Base Case (%)")]
    pub base: f64,
    #[serde(rename = "Accelerated (%)")]
    pub accelerated: f64,
    #[serde(rename = "Stagnation (%)")]
    pub stagnation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentRow {
    pub model: String,
    pub weight: f64,
    pub year: i32,
    pub forecast: f64,
    pub lower_95: f64,
    pub upper_95: f64,
    pub std_err: f64,
    pub in_sample_mae: f64,
    pub aic: f64,
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

// ============================================================================
// ROW BUILDERS
// ============================================================================

pub fn forecast_rows(result: &ForecastResult) -> Vec<ForecastRow> {
    result.ensemble.iter().map(ForecastRow::from).collect()
}

/// Scenario table; a missing scenario is an error, not a blank column
pub fn scenario_rows(result: &ForecastResult) -> Result<Vec<ScenarioRow>> {
    let get = |name: &str| {
        result
            .scenario(name)
            .ok_or_else(|| anyhow!("scenario '{}' missing from forecast", name))
    };
    let (base, fast, slow) = (get("base")?, get("accelerated")?, get("stagnation")?);

    Ok(base
        .points
        .iter()
        .zip(&fast.points)
        .zip(&slow.points)
        .map(|((b, a), s)| ScenarioRow {
            year: b.year,
            base: round2(b.point),
            accelerated: round2(a.point),
            stagnation: round2(s.point),
        })
        .collect())
}

pub fn component_rows(result: &ForecastResult) -> Vec<ComponentRow> {
    result
        .components
        .iter()
        .flat_map(|c| {
            c.points.iter().zip(&c.std_err).map(move |(p, se)| ComponentRow {
                model: c.model.clone(),
                weight: round2(c.weight),
                year: p.year,
                forecast: round2(p.point),
                lower_95: round2(p.lower_95),
                upper_95: round2(p.upper_95),
                std_err: round2(*se),
                in_sample_mae: round2(c.diagnostics.in_sample.mae),
                aic: round2(c.diagnostics.aic),
            })
        })
        .collect()
}

// ============================================================================
// WRITE / READ
// ============================================================================

fn write_rows<T: Serialize>(rows: &[T], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
    for row in rows {
        wtr.serialize(row).context("Failed to write CSV row")?;
    }
    wtr.flush().context("Failed to flush CSV writer")?;
    tracing::info!(path = %path.display(), rows = rows.len(), "CSV written");
    Ok(())
}

fn read_rows<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;
    let mut rows = Vec::new();
    for (idx, row) in rdr.deserialize().enumerate() {
        rows.push(row.with_context(|| format!("{}: bad row at line {}", path.display(), idx + 2))?);
    }
    Ok(rows)
}

pub fn write_forecast_csv(result: &ForecastResult, path: &Path) -> Result<()> {
    write_rows(&forecast_rows(result), path)
}

pub fn write_scenarios_csv(result: &ForecastResult, path: &Path) -> Result<()> {
    write_rows(&scenario_rows(result)?, path)
}

pub fn write_components_csv(result: &ForecastResult, path: &Path) -> Result<()> {
    write_rows(&component_rows(result), path)
}

pub fn read_forecast_csv(path: &Path) -> Result<Vec<ForecastRow>> {
    read_rows(path)
}

pub fn read_scenarios_csv(path: &Path) -> Result<Vec<ScenarioRow>> {
    read_rows(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ForecastConfig;
    use crate::dataset::Dataset;
    use crate::forecast::forecast_indicator;
    use crate::impact::ImpactConfig;
    use crate::record::{FinancialInclusionRecord, Pillar};
    use chrono::NaiveDate;

    fn result() -> ForecastResult {
        let mut ds = Dataset::new();
        for (i, (year, value)) in [(2011, 22.0), (2014, 35.0), (2017, 35.0), (2021, 46.0), (2024, 48.5)]
            .iter()
            .enumerate()
        {
            ds.push(FinancialInclusionRecord::observation(
                &format!("REC_{:04}", i),
                Pillar::Access,
                "ACC_OWNERSHIP",
                *value,
                NaiveDate::from_ymd_opt(*year, 12, 31).unwrap(),
            ))
            .unwrap();
        }
        forecast_indicator(&ds, &ForecastConfig::default(), &ImpactConfig::default()).unwrap()
    }

    #[test]
    fn test_forecast_csv_headers_and_readback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("account_ownership_forecast.csv");
        let result = result();

        write_forecast_csv(&result, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(
            header,
            "Year,Forecast (%),Lower 80% CI,Upper 80% CI,Lower 95% CI,Upper 95% CI"
        );

        let rows = read_forecast_csv(&path).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].year, 2025);
        assert!(rows.iter().all(|r| r.lower_95 <= r.forecast && r.forecast <= r.upper_95));

        println!("✅ Forecast CSV test PASSED");
    }

    #[test]
    fn test_scenarios_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forecast_scenarios.csv");

        write_scenarios_csv(&result(), &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Year,Base Case (%),Accelerated (%),Stagnation (%)"));
        let rows = read_scenarios_csv(&path).unwrap();
        assert!(rows.iter().all(|r| r.stagnation <= r.base && r.base <= r.accelerated));
    }

    #[test]
    fn test_component_rows_cover_every_model_and_year() {
        let result = result();
        let rows = component_rows(&result);
        assert_eq!(rows.len(), result.components.len() * 3);
    }

    #[test]
    fn test_read_missing_file_fails() {
        assert!(read_forecast_csv(Path::new("/nonexistent/forecast.csv")).is_err());
    }
}
