// ➕ Enricher - append-only additions with batch provenance
//
// Existing records are never touched. Each enrich() call is one batch:
// every record it appends carries the same batch UUID.

use crate::dataset::{AppendError, Dataset};
use crate::record::{
    Confidence, FinancialInclusionRecord, ImpactDirection, ImpactEstimate, Magnitude, Pillar,
    Provenance, RecordRow,
};
use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRecord {
    pub record_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrichmentReport {
    pub batch_id: String,
    pub appended: Vec<String>,
    pub skipped: Vec<SkippedRecord>,
}

impl EnrichmentReport {
    pub fn summary(&self) -> String {
        format!(
            "batch {}: {} appended, {} skipped",
            self.batch_id,
            self.appended.len(),
            self.skipped.len()
        )
    }
}

pub struct Enricher {
    collected_by: String,
    collection_date: NaiveDate,
}

impl Enricher {
    pub fn new(collected_by: &str) -> Self {
        Enricher {
            collected_by: collected_by.to_string(),
            collection_date: Utc::now().date_naive(),
        }
    }

    pub fn with_collection_date(mut self, date: NaiveDate) -> Self {
        self.collection_date = date;
        self
    }

    /// Append `records` to `dataset` as one batch
    pub fn enrich(
        &self,
        dataset: &mut Dataset,
        records: Vec<FinancialInclusionRecord>,
    ) -> EnrichmentReport {
        let batch_id = uuid::Uuid::new_v4().to_string();
        let mut seen: HashSet<String> = dataset.records().iter().map(|r| r.content_hash()).collect();
        let mut appended = Vec::new();
        let mut skipped = Vec::new();

        for mut record in records {
            let hash = record.content_hash();
            if seen.contains(&hash) {
                tracing::warn!(record_id = %record.record_id, "duplicate content, skipped");
                skipped.push(SkippedRecord {
                    reason: "Duplicate content of an existing record".to_string(),
                    record_id: record.record_id,
                });
                continue;
            }

            record.provenance = Some(Provenance {
                collected_by: self.collected_by.clone(),
                collection_date: self.collection_date,
                enrichment_batch: batch_id.clone(),
            });
            let record_id = record.record_id.clone();

            match dataset.push(record) {
                Ok(()) => {
                    seen.insert(hash);
                    appended.push(record_id);
                }
                Err(e) => {
                    let reason = match &e {
                        AppendError::DuplicateId(_) => e.to_string(),
                        AppendError::Invalid(why) => format!("Malformed record: {}", why),
                    };
                    tracing::warn!(record_id = %record_id, reason = %reason, "record skipped");
                    skipped.push(SkippedRecord { record_id, reason });
                }
            }
        }

        let report = EnrichmentReport {
            batch_id,
            appended,
            skipped,
        };
        tracing::info!("{}", report.summary());
        report
    }
}

// ============================================================================
// CURATED ADDITIONS
// ============================================================================

fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

/// Default curated additions: Digital ID launch, 2024 ownership estimate, and their link
pub fn curated_records() -> Vec<FinancialInclusionRecord> {
    let mut records = Vec::new();

    if let Some(date) = ymd(2024, 1, 25) {
        records.push(
            FinancialInclusionRecord::event("EVT_2024_001", "Digital ID Launch", date)
                .with_indicator_code("DIG_ID_LAUNCH")
                .with_category("REGULATION")
                .with_pillar(Pillar::Infrastructure)
                .with_source("NID Program", Some("https://fayda.et/"))
                .with_confidence(Confidence::High)
                .with_original_text("Launch of Fayda ID registration countrywide.")
                .with_notes("Enriched data point"),
        );
    }

    if let Some(date) = ymd(2024, 6, 30) {
        records.push(
            FinancialInclusionRecord::observation(
                "OBS_2024_001",
                Pillar::Access,
                "ACC_OWNERSHIP",
                48.5,
                date,
            )
            .with_indicator("Account Ownership Rate")
            .with_direction("higher_better")
            .with_unit("%")
            .with_source("NBE Estimate", None)
            .with_confidence(Confidence::Medium)
            .with_notes("Projected based on recent trends."),
        );
    }

    records.push(
        FinancialInclusionRecord::impact_link("IMP_2024_001", "EVT_2024_001", "ACC_OWNERSHIP")
            .with_impact(
                ImpactDirection::Positive,
                ImpactEstimate::Magnitude(Magnitude::High),
            )
            .with_relationship("causal", "Global experience")
            .with_lag_months(12)
            .with_original_text(
                "Digital ID implementation is a key driver for financial inclusion.",
            )
            .with_notes("Digital ID expected to boost account opening"),
    );

    records
}

/// Write the dataset with the loader's column schema
pub fn write_dataset(dataset: &Dataset, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
    for record in dataset.records() {
        wtr.serialize(RecordRow::from(record))
            .with_context(|| format!("Failed to write record {}", record.record_id))?;
    }
    wtr.flush().context("Failed to flush CSV writer")?;
    tracing::info!(path = %path.display(), records = dataset.len(), "dataset written");
    Ok(())
}
