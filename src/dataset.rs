// 🗂️ Dataset - ordered, append-only collection of records with an id index

use crate::record::{FinancialInclusionRecord, Pillar, RecordType};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Why a record could not be appended
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AppendError {
    #[error("Duplicate record_id: {0}")]
    DuplicateId(String),
    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Dataset {
    records: Vec<FinancialInclusionRecord>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl Dataset {
    pub fn new() -> Self {
        Dataset::default()
    }

    /// Append a record. The record must satisfy the shape rules of its type.
    pub fn push(&mut self, record: FinancialInclusionRecord) -> Result<(), AppendError> {
        if self.index.contains_key(&record.record_id) {
            return Err(AppendError::DuplicateId(record.record_id));
        }
        if let Err(errors) = crate::validation::check_record_shape(&record) {
            let reason = errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(AppendError::Invalid(reason));
        }
        self.index
            .insert(record.record_id.clone(), self.records.len());
        self.records.push(record);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[FinancialInclusionRecord] {
        &self.records
    }

    pub fn get(&self, record_id: &str) -> Option<&FinancialInclusionRecord> {
        self.index.get(record_id).map(|&i| &self.records[i])
    }

    pub fn contains(&self, record_id: &str) -> bool {
        self.index.contains_key(record_id)
    }

    // ========================================================================
    // FILTERS
    // ========================================================================

    /// Observations, optionally restricted to `codes`
    pub fn observations(&self, codes: Option<&[&str]>) -> Vec<&FinancialInclusionRecord> {
        self.records
            .iter()
            .filter(|r| r.is_observation())
            .filter(|r| match codes {
                Some(codes) => r
                    .indicator_code
                    .as_deref()
                    .map(|c| codes.contains(&c))
                    .unwrap_or(false),
                None => true,
            })
            .collect()
    }

    /// Events sorted by date (undated events last)
    pub fn events(&self) -> Vec<&FinancialInclusionRecord> {
        let mut events: Vec<_> = self.records.iter().filter(|r| r.is_event()).collect();
        events.sort_by_key(|e| (e.observation_date.is_none(), e.observation_date));
        events
    }

    pub fn impact_links(&self) -> Vec<&FinancialInclusionRecord> {
        self.records.iter().filter(|r| r.is_impact_link()).collect()
    }

    /// Impact links whose target indicator is `indicator_code`
    pub fn impact_links_for(&self, indicator_code: &str) -> Vec<&FinancialInclusionRecord> {
        self.records
            .iter()
            .filter(|r| {
                r.impact
                    .as_ref()
                    .and_then(|l| l.related_indicator.as_deref())
                    .map(|c| c.eq_ignore_ascii_case(indicator_code))
                    .unwrap_or(false)
            })
            .collect()
    }

    pub fn indicator_codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = self
            .observations(None)
            .iter()
            .filter_map(|r| r.indicator_code.clone())
            .collect();
        codes.sort();
        codes.dedup();
        codes
    }

    // ========================================================================
    // DISTRIBUTIONS
    // ========================================================================

    pub fn type_distribution(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for t in [RecordType::Observation, RecordType::Event, RecordType::ImpactLink] {
            counts.insert(t.as_str(), 0);
        }
        for record in &self.records {
            *counts.entry(record.record_type.as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// Observation counts per pillar
    pub fn pillar_distribution(&self) -> BTreeMap<Pillar, usize> {
        let mut counts = BTreeMap::new();
        for record in self.records.iter().filter(|r| r.is_observation()) {
            if let Some(pillar) = record.pillar {
                *counts.entry(pillar).or_insert(0) += 1;
            }
        }
        counts
    }

    /// SHA-256 over every record's id and content hash, in order
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for record in &self.records {
            hasher.update(record.record_id.as_bytes());
            hasher.update(b":");
            hasher.update(record.content_hash().as_bytes());
            hasher.update(b"\n");
        }
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> Dataset {
        let mut ds = Dataset::new();
        ds.push(FinancialInclusionRecord::observation(
            "REC_0001", Pillar::Access, "ACC_OWNERSHIP", 46.0, date(2021, 12, 31),
        ))
        .unwrap();
        ds.push(FinancialInclusionRecord::observation(
            "REC_0002", Pillar::Usage, "USG_DIGITAL_PAYMENT", 21.0, date(2021, 12, 31),
        ))
        .unwrap();
        ds.push(FinancialInclusionRecord::event("EVT_0001", "Telebirr Launch", date(2021, 5, 11)))
            .unwrap();
        ds.push(FinancialInclusionRecord::impact_link("IMP_0001", "EVT_0001", "ACC_OWNERSHIP"))
            .unwrap();
        ds
    }

    #[test]
    fn test_push_rejects_duplicate_id() {
        let mut ds = sample();
        let dup = FinancialInclusionRecord::event("EVT_0001", "Again", date(2022, 1, 1));

        assert_eq!(
            ds.push(dup),
            Err(AppendError::DuplicateId("EVT_0001".to_string()))
        );
        assert_eq!(ds.len(), 4);
    }

    #[test]
    fn test_append_error_messages() {
        let dup = AppendError::DuplicateId("EVT_0001".to_string());
        assert_eq!(dup.to_string(), "Duplicate record_id: EVT_0001");

        let invalid = AppendError::Invalid("Events must not carry a value".to_string());
        assert_eq!(invalid.to_string(), "Events must not carry a value");

        let boxed: Box<dyn std::error::Error> = Box::new(dup);
        assert!(boxed.to_string().contains("EVT_0001"));
    }

    #[test]
    fn test_push_rejects_event_with_value() {
        let mut ds = Dataset::new();
        let mut event = FinancialInclusionRecord::event("EVT_X", "Bad", date(2022, 1, 1));
        event.value_numeric = Some(3.0);

        assert!(matches!(ds.push(event), Err(AppendError::Invalid(_))));
        assert!(ds.is_empty());
    }

    #[test]
    fn test_filters_and_distributions() {
        let ds = sample();

        assert_eq!(ds.observations(None).len(), 2);
        assert_eq!(ds.observations(Some(&["ACC_OWNERSHIP"])).len(), 1);
        assert_eq!(ds.events().len(), 1);
        assert_eq!(ds.impact_links_for("acc_ownership").len(), 1);
        assert_eq!(ds.type_distribution()["observation"], 2);
        assert_eq!(ds.pillar_distribution()[&Pillar::Usage], 1);
        assert_eq!(ds.get("REC_0002").unwrap().value_numeric, Some(21.0));
    }

    #[test]
    fn test_fingerprint_changes_on_append() {
        let mut ds = sample();
        let before = ds.fingerprint();
        ds.push(FinancialInclusionRecord::event("EVT_0002", "M-Pesa Launch", date(2023, 8, 16)))
            .unwrap();

        assert_ne!(before, ds.fingerprint());
        assert_eq!(before, sample().fingerprint());
    }
}
