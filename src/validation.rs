// ✅ Data Quality Engine - shape rules and quality checks for inclusion records
//
// Shape rules decide whether a record may enter a dataset at all.
// Quality rules grade records that did, with a severity per finding.

use crate::dataset::Dataset;
use crate::loader::ReferenceCode;
use crate::record::{FinancialInclusionRecord, RecordType};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ============================================================================
// FIELD ERRORS (shape)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: &str) -> Self {
        FieldError {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for FieldError {}

/// Required fields and the value/type invariant
pub fn check_record_shape(record: &FinancialInclusionRecord) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();

    if record.record_id.trim().is_empty() {
        errors.push(FieldError::new("record_id", "Required field is empty"));
    }

    match record.record_type {
        RecordType::Observation => {
            match record.value_numeric {
                None => errors.push(FieldError::new(
                    "value_numeric",
                    "Observation without a value",
                )),
                Some(v) if !v.is_finite() => {
                    errors.push(FieldError::new("value_numeric", "Value is not finite"))
                }
                _ => {}
            }
            if record.indicator_code.is_none() {
                errors.push(FieldError::new("indicator_code", "Required for observations"));
            }
            if record.pillar.is_none() {
                errors.push(FieldError::new("pillar", "Required for observations"));
            }
            if record.observation_date.is_none() {
                errors.push(FieldError::new("observation_date", "Required for observations"));
            }
        }
        RecordType::Event => {
            if record.value_numeric.is_some() {
                errors.push(FieldError::new("value_numeric", "Events must not carry a value"));
            }
            if record.observation_date.is_none() {
                errors.push(FieldError::new("observation_date", "Required for events"));
            }
        }
        RecordType::ImpactLink => {
            if record.value_numeric.is_some() {
                errors.push(FieldError::new(
                    "value_numeric",
                    "Impact links must not carry a value",
                ));
            }
            let has_target = record
                .impact
                .as_ref()
                .and_then(|l| l.related_indicator.as_ref())
                .is_some();
            if !has_target {
                errors.push(FieldError::new("related_indicator", "Required for impact links"));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

// ============================================================================
// VALIDATION RESULT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub passed: bool,
    pub rule_name: String,
    pub field: String,
    pub message: String,
    pub severity: Severity,
}

impl ValidationResult {
    pub fn pass(rule_name: &str, field: &str, message: &str) -> Self {
        ValidationResult {
            passed: true,
            rule_name: rule_name.to_string(),
            field: field.to_string(),
            message: message.to_string(),
            severity: Severity::Info,
        }
    }

    pub fn fail(rule_name: &str, field: &str, message: &str, severity: Severity) -> Self {
        ValidationResult {
            passed: false,
            rule_name: rule_name.to_string(),
            field: field.to_string(),
            message: message.to_string(),
            severity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Critical, // Record breaks an invariant
    Warning,  // Value is questionable
    Info,     // Valid but incomplete
}

// ============================================================================
// QUALITY REPORT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    pub record_id: String,
    /// Fraction of rules passed
    pub overall_quality: f64,
    pub validations: Vec<ValidationResult>,
    pub passed_count: usize,
    pub failed_count: usize,
}

impl QualityReport {
    pub fn summary(&self) -> String {
        format!(
            "Quality: {:.1}%, Issues: {} ({} critical)",
            self.overall_quality * 100.0,
            self.failed_count,
            self.issues()
                .filter(|v| v.severity == Severity::Critical)
                .count()
        )
    }

    pub fn issues(&self) -> impl Iterator<Item = &ValidationResult> {
        self.validations.iter().filter(|v| !v.passed)
    }

    pub fn is_high_quality(&self) -> bool {
        self.overall_quality >= 0.8 && !self.has_critical_issues()
    }

    pub fn has_critical_issues(&self) -> bool {
        self.issues().any(|v| v.severity == Severity::Critical)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_records: usize,
    pub high_quality_count: usize,
    pub critical_issues_count: usize,
    pub warning_count: usize,
    pub average_quality: f64,
}

impl BatchSummary {
    pub fn summary(&self) -> String {
        format!(
            "{} records: {:.1}% quality | {} high quality, {} with warnings, {} critical",
            self.total_records,
            self.average_quality * 100.0,
            self.high_quality_count,
            self.warning_count,
            self.critical_issues_count
        )
    }
}

// ============================================================================
// DATA QUALITY ENGINE
// ============================================================================

pub struct DataQualityEngine {
    known_pillars: Vec<String>,
    known_types: Vec<String>,
    known_confidence: Vec<String>,
    /// Observations dated after this are flagged
    today: NaiveDate,
}

impl DataQualityEngine {
    pub fn new() -> Self {
        DataQualityEngine {
            known_pillars: vec![
                "ACCESS".to_string(),
                "USAGE".to_string(),
                "QUALITY".to_string(),
                "INFRASTRUCTURE".to_string(),
            ],
            known_types: vec![
                "observation".to_string(),
                "event".to_string(),
                "impact_link".to_string(),
            ],
            known_confidence: vec!["high".to_string(), "medium".to_string(), "low".to_string()],
            today: Local::now().date_naive(),
        }
    }

    /// Replace the built-in code lists with those from a reference-code table
    pub fn with_reference_codes(mut self, codes: &[ReferenceCode]) -> Self {
        let collect = |field: &str| -> Vec<String> {
            codes
                .iter()
                .filter(|c| c.field.eq_ignore_ascii_case(field))
                .map(|c| c.code.clone())
                .collect()
        };
        let pillars = collect("pillar");
        if !pillars.is_empty() {
            self.known_pillars = pillars;
        }
        let types = collect("record_type");
        if !types.is_empty() {
            self.known_types = types;
        }
        let confidence = collect("confidence");
        if !confidence.is_empty() {
            self.known_confidence = confidence;
        }
        self
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn validate(&self, record: &FinancialInclusionRecord) -> QualityReport {
        let mut validations = Vec::new();

        // Rule 1: structural invariants
        match check_record_shape(record) {
            Ok(()) => validations.push(ValidationResult::pass(
                "shape_valid",
                "record",
                "Required fields present",
            )),
            Err(errors) => {
                for e in errors {
                    validations.push(ValidationResult::fail(
                        "shape_invalid",
                        &e.field,
                        &e.message,
                        Severity::Critical,
                    ));
                }
            }
        }

        // Rule 2: codes appear in the reference table
        validations.push(self.validate_code(
            "record_type",
            Some(record.record_type.as_str()),
            &self.known_types,
        ));
        if let Some(pillar) = record.pillar {
            validations.push(self.validate_code("pillar", Some(pillar.as_str()), &self.known_pillars));
        }
        validations.push(self.validate_code(
            "confidence",
            record.confidence.map(|c| c.as_str()),
            &self.known_confidence,
        ));

        // Rule 3: plausible value
        if let Some(value) = record.value_numeric {
            validations.push(self.validate_value(value, record.unit.as_deref()));
        }

        // Rule 4: not in the future
        if let Some(date) = record.observation_date {
            validations.push(self.validate_date(date, record.record_type));
        }

        // Rule 5: sourced
        validations.push(self.validate_source(record));

        // Rule 6: impact links say which way and how much
        if record.is_impact_link() {
            validations.push(self.validate_impact(record));
        }

        let passed_count = validations.iter().filter(|v| v.passed).count();
        let failed_count = validations.len() - passed_count;

        QualityReport {
            record_id: record.record_id.clone(),
            overall_quality: passed_count as f64 / validations.len() as f64,
            validations,
            passed_count,
            failed_count,
        }
    }

    pub fn validate_batch(&self, records: &[FinancialInclusionRecord]) -> Vec<QualityReport> {
        records.iter().map(|r| self.validate(r)).collect()
    }

    pub fn batch_summary(&self, reports: &[QualityReport]) -> BatchSummary {
        let total = reports.len();
        let average_quality = if total == 0 {
            1.0
        } else {
            reports.iter().map(|r| r.overall_quality).sum::<f64>() / total as f64
        };

        BatchSummary {
            total_records: total,
            high_quality_count: reports.iter().filter(|r| r.is_high_quality()).count(),
            critical_issues_count: reports.iter().filter(|r| r.has_critical_issues()).count(),
            warning_count: reports
                .iter()
                .filter(|r| r.issues().any(|v| v.severity == Severity::Warning))
                .count(),
            average_quality,
        }
    }

    // ========================================================================
    // VALIDATION RULES
    // ========================================================================

    fn validate_code(&self, field: &str, code: Option<&str>, known: &[String]) -> ValidationResult {
        match code {
            None => ValidationResult::fail(
                &format!("{}_missing", field),
                field,
                &format!("{} is empty", field),
                Severity::Info,
            ),
            Some(code) if known.iter().any(|k| k.eq_ignore_ascii_case(code)) => {
                ValidationResult::pass(
                    &format!("{}_known", field),
                    field,
                    &format!("Known {}: {}", field, code),
                )
            }
            Some(code) => ValidationResult::fail(
                &format!("{}_unknown", field),
                field,
                &format!("Code not in reference table: {}", code),
                Severity::Warning,
            ),
        }
    }

    fn validate_value(&self, value: f64, unit: Option<&str>) -> ValidationResult {
        if unit == Some("%") && !(0.0..=100.0).contains(&value) {
            return ValidationResult::fail(
                "percentage_out_of_range",
                "value_numeric",
                &format!("Percentage outside 0-100: {}", value),
                Severity::Warning,
            );
        }
        if value < 0.0 {
            return ValidationResult::fail(
                "value_negative",
                "value_numeric",
                &format!("Negative value: {}", value),
                Severity::Warning,
            );
        }
        ValidationResult::pass("value_valid", "value_numeric", "Value is plausible")
    }

    fn validate_date(&self, date: NaiveDate, record_type: RecordType) -> ValidationResult {
        // Announced events may be dated ahead; measurements may not
        if record_type == RecordType::Observation && date > self.today {
            return ValidationResult::fail(
                "date_in_future",
                "observation_date",
                &format!("Observation dated in the future: {}", date),
                Severity::Warning,
            );
        }
        ValidationResult::pass("date_valid", "observation_date", "Date is valid")
    }

    fn validate_source(&self, record: &FinancialInclusionRecord) -> ValidationResult {
        if record.source_name.is_none() && record.source_url.is_none() {
            return ValidationResult::fail(
                "source_missing",
                "source_name",
                "No source name or URL",
                Severity::Info,
            );
        }
        ValidationResult::pass("source_present", "source_name", "Source present")
    }

    fn validate_impact(&self, record: &FinancialInclusionRecord) -> ValidationResult {
        let link = record.impact.clone().unwrap_or_default();
        if link.parent_id.is_none() {
            return ValidationResult::fail(
                "impact_parent_missing",
                "parent_id",
                "Impact link has no parent event",
                Severity::Warning,
            );
        }
        if link.impact_direction.is_none() || link.impact_estimate.is_none() {
            return ValidationResult::fail(
                "impact_estimate_missing",
                "impact_estimate",
                "Impact link has no direction or estimate",
                Severity::Info,
            );
        }
        ValidationResult::pass("impact_complete", "impact_estimate", "Impact link complete")
    }
}

impl Default for DataQualityEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// DATASET VALIDATION
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct DatasetValidation {
    pub duplicate_ids: Vec<String>,
    /// (record_id, reason) for records breaking the value/type invariant
    pub invariant_violations: Vec<(String, String)>,
    /// Impact links whose parent_id is not an event in the dataset
    pub dangling_links: Vec<String>,
    pub summary: BatchSummary,
}

impl DatasetValidation {
    pub fn is_valid(&self) -> bool {
        self.duplicate_ids.is_empty() && self.invariant_violations.is_empty()
    }
}

/// Check dataset invariants and grade every record
pub fn validate_dataset(dataset: &Dataset, engine: &DataQualityEngine) -> DatasetValidation {
    let mut seen = HashSet::new();
    let mut duplicate_ids = Vec::new();
    let mut invariant_violations = Vec::new();
    let mut dangling_links = Vec::new();

    for record in dataset.records() {
        if !seen.insert(record.record_id.as_str()) {
            duplicate_ids.push(record.record_id.clone());
        }
        if let Err(errors) = check_record_shape(record) {
            let reason = errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            invariant_violations.push((record.record_id.clone(), reason));
        }
        if let Some(parent) = record.impact.as_ref().and_then(|l| l.parent_id.as_deref()) {
            let resolves = dataset.get(parent).map(|p| p.is_event()).unwrap_or(false);
            if !resolves {
                dangling_links.push(record.record_id.clone());
            }
        }
    }

    let reports = engine.validate_batch(dataset.records());
    let summary = engine.batch_summary(&reports);

    if !duplicate_ids.is_empty() || !invariant_violations.is_empty() {
        tracing::warn!(
            duplicates = duplicate_ids.len(),
            violations = invariant_violations.len(),
            "dataset invariants violated"
        );
    }

    DatasetValidation {
        duplicate_ids,
        invariant_violations,
        dangling_links,
        summary,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Confidence, ImpactDirection, ImpactEstimate, Magnitude, Pillar};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn engine() -> DataQualityEngine {
        DataQualityEngine::new().with_today(date(2025, 1, 1))
    }

    fn create_valid_observation() -> FinancialInclusionRecord {
        FinancialInclusionRecord::observation(
            "REC_0001",
            Pillar::Access,
            "ACC_OWNERSHIP",
            46.0,
            date(2021, 12, 31),
        )
        .with_unit("%")
        .with_source("Global Findex 2021", Some("https://www.worldbank.org/globalfindex"))
        .with_confidence(Confidence::High)
    }

    #[test]
    fn test_validate_perfect_observation() {
        let report = engine().validate(&create_valid_observation());

        println!("Report: {}", report.summary());

        assert!(report.is_high_quality());
        assert_eq!(report.failed_count, 0);
        assert_eq!(report.overall_quality, 1.0);
    }

    #[test]
    fn test_observation_without_value_is_critical() {
        let mut record = create_valid_observation();
        record.value_numeric = None;

        let report = engine().validate(&record);

        assert!(report.has_critical_issues());
        assert!(report.issues().any(|v| v.field == "value_numeric"));
    }

    #[test]
    fn test_percentage_out_of_range_is_warning() {
        let mut record = create_valid_observation();
        record.value_numeric = Some(146.0);

        let report = engine().validate(&record);

        assert!(!report.has_critical_issues());
        assert!(report
            .issues()
            .any(|v| v.rule_name == "percentage_out_of_range" && v.severity == Severity::Warning));
    }

    #[test]
    fn test_future_observation_flagged_but_event_allowed() {
        let mut obs = create_valid_observation();
        obs.observation_date = Some(date(2026, 6, 30));
        let event = FinancialInclusionRecord::event("EVT_F", "Planned rollout", date(2026, 6, 30));

        assert!(engine().validate(&obs).issues().any(|v| v.rule_name == "date_in_future"));
        assert!(!engine().validate(&event).issues().any(|v| v.rule_name == "date_in_future"));
    }

    #[test]
    fn test_reference_codes_replace_known_lists() {
        let codes = vec![ReferenceCode {
            field: "pillar".to_string(),
            code: "ACCESS".to_string(),
            description: "Account access".to_string(),
        }];
        let engine = engine().with_reference_codes(&codes);
        let usage = FinancialInclusionRecord::observation(
            "REC_U", Pillar::Usage, "USG_X", 10.0, date(2021, 1, 1),
        );

        let report = engine.validate(&usage);
        assert!(report.issues().any(|v| v.rule_name == "pillar_unknown"));
    }

    #[test]
    fn test_validate_dataset_reports_dangling_links() {
        let mut ds = Dataset::new();
        ds.push(create_valid_observation()).unwrap();
        ds.push(
            FinancialInclusionRecord::impact_link("IMP_1", "EVT_MISSING", "ACC_OWNERSHIP")
                .with_impact(ImpactDirection::Positive, ImpactEstimate::Magnitude(Magnitude::Low)),
        )
        .unwrap();

        let result = validate_dataset(&ds, &engine());

        println!("{}", result.summary.summary());
        assert!(result.is_valid());
        assert_eq!(result.dangling_links, vec!["IMP_1".to_string()]);
        assert_eq!(result.summary.total_records, 2);
    }
}
