// 🔁 Pipeline - load → validate → enrich → forecast → write
//
// Each stage is a public function so the CLI can run them one at a time;
// run() chains them and returns what happened.

use crate::audit::AuditLog;
use crate::config::PipelineConfig;
use crate::dataset::Dataset;
use crate::enrichment::{curated_records, write_dataset, EnrichmentReport, Enricher};
use crate::forecast::{forecast_indicator, ForecastResult};
use crate::loader::{load_data, LoadReport, ReferenceCode};
use crate::output::{write_components_csv, write_forecast_csv, write_scenarios_csv};
use crate::validation::{validate_dataset, DataQualityEngine, DatasetValidation};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct PipelineSummary {
    pub loaded: usize,
    pub rejected: usize,
    pub validation: DatasetValidation,
    pub enrichment: EnrichmentReport,
    pub forecast: ForecastResult,
    pub outputs: Vec<PathBuf>,
    pub audit_events: usize,
    pub dataset_fingerprint: String,
}

impl PipelineSummary {
    pub fn summary(&self) -> String {
        format!(
            "{} loaded ({} rejected), {} | {}",
            self.loaded,
            self.rejected,
            self.enrichment.summary(),
            self.forecast.summary()
        )
    }
}

/// Load the base dataset and reference codes (if the codes file exists)
pub fn load(config: &PipelineConfig) -> Result<(LoadReport, Vec<ReferenceCode>)> {
    let data_path = config.paths.dataset_path();
    let codes_path = config.paths.reference_codes_path();
    let codes = if codes_path.exists() {
        Some(codes_path.as_path())
    } else {
        None
    };
    let (report, codes) = load_data(&data_path, codes)
        .with_context(|| format!("failed to load {}", data_path.display()))?;
    info!("{}", report.summary());
    Ok((report, codes))
}

pub fn validate(dataset: &Dataset, codes: &[ReferenceCode]) -> DatasetValidation {
    let engine = DataQualityEngine::new().with_reference_codes(codes);
    let validation = validate_dataset(dataset, &engine);
    info!("{}", validation.summary.summary());
    validation
}

/// Append the curated records and write the enriched CSV
pub fn enrich(dataset: &mut Dataset, config: &PipelineConfig) -> Result<EnrichmentReport> {
    let report = Enricher::new(&config.enrichment.collected_by).enrich(dataset, curated_records());
    write_dataset(dataset, &config.paths.enriched_path())?;
    Ok(report)
}

/// Forecast the configured indicator and write the three CSV tables
pub fn forecast(dataset: &Dataset, config: &PipelineConfig) -> Result<(ForecastResult, Vec<PathBuf>)> {
    let result = forecast_indicator(dataset, &config.forecast, &config.impact)?;

    let forecast_path = config.paths.forecast_path();
    let scenarios_path = config.paths.scenarios_path();
    let components_path = config.paths.components_path();
    write_forecast_csv(&result, &forecast_path)?;
    write_scenarios_csv(&result, &scenarios_path)?;
    write_components_csv(&result, &components_path)?;

    Ok((result, vec![forecast_path, scenarios_path, components_path]))
}

/// Full batch run
pub fn run(config: &PipelineConfig) -> Result<PipelineSummary> {
    let (report, codes) = load(config)?;
    for row in &report.rejected {
        info!(line = row.line, reason = %row.reason, "row rejected");
    }
    let loaded = report.dataset.len();
    let rejected = report.rejected.len();
    let mut dataset = report.dataset;

    let validation = validate(&dataset, &codes);
    let enrichment = enrich(&mut dataset, config)?;
    let (result, mut outputs) = forecast(&dataset, config)?;
    outputs.insert(0, config.paths.enriched_path());

    let audit_events = match &config.paths.audit_db {
        Some(path) => {
            let audit = AuditLog::open(path, &config.enrichment.collected_by)?;
            let logged = audit.record_enrichment(&dataset, &enrichment)?;
            audit.record_forecast(&result)?;
            logged + 1
        }
        None => 0,
    };

    let summary = PipelineSummary {
        loaded,
        rejected,
        validation,
        enrichment,
        forecast: result,
        outputs,
        audit_events,
        dataset_fingerprint: dataset.fingerprint(),
    };
    info!("{}", summary.summary());
    Ok(summary)
}
