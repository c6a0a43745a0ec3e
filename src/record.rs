// 📇 Financial Inclusion Record - one row of the unified dataset
// Observations, events and impact links share a single flat schema

use crate::validation::FieldError;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// ENUMERATIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    Observation,
    Event,
    ImpactLink,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Observation => "observation",
            RecordType::Event => "event",
            RecordType::ImpactLink => "impact_link",
        }
    }
}

impl FromStr for RecordType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_code(s).as_str() {
            "observation" => Ok(RecordType::Observation),
            "event" => Ok(RecordType::Event),
            "impact_link" | "impact" => Ok(RecordType::ImpactLink),
            other => Err(format!("unknown record type '{}'", other)),
        }
    }
}

/// Global Findex dimension an indicator belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Pillar {
    Access,
    Usage,
    Quality,
    Infrastructure,
}

impl Pillar {
    pub const ALL: [Pillar; 4] = [
        Pillar::Access,
        Pillar::Usage,
        Pillar::Quality,
        Pillar::Infrastructure,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Pillar::Access => "ACCESS",
            Pillar::Usage => "USAGE",
            Pillar::Quality => "QUALITY",
            Pillar::Infrastructure => "INFRASTRUCTURE",
        }
    }
}

impl FromStr for Pillar {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_code(s).as_str() {
            "access" => Ok(Pillar::Access),
            "usage" => Ok(Pillar::Usage),
            "quality" => Ok(Pillar::Quality),
            "infrastructure" => Ok(Pillar::Infrastructure),
            other => Err(format!("unknown pillar '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

impl FromStr for Confidence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_code(s).as_str() {
            "high" => Ok(Confidence::High),
            "medium" => Ok(Confidence::Medium),
            "low" => Ok(Confidence::Low),
            other => Err(format!("unknown confidence '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactDirection {
    Positive,
    Negative,
}

impl ImpactDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImpactDirection::Positive => "positive",
            ImpactDirection::Negative => "negative",
        }
    }

    pub fn sign(&self) -> f64 {
        match self {
            ImpactDirection::Positive => 1.0,
            ImpactDirection::Negative => -1.0,
        }
    }
}

impl FromStr for ImpactDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_code(s).as_str() {
            "positive" | "increase" => Ok(ImpactDirection::Positive),
            "negative" | "decrease" => Ok(ImpactDirection::Negative),
            other => Err(format!("unknown impact direction '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Magnitude {
    High,
    Medium,
    Low,
}

/// Expected effect of an event on an indicator
///
/// Curated sources give either a number of percentage points or only a
/// qualitative label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ImpactEstimate {
    Points(f64),
    Magnitude(Magnitude),
}

impl ImpactEstimate {
    pub fn label(&self) -> String {
        match self {
            ImpactEstimate::Points(pp) => format!("{}", pp),
            ImpactEstimate::Magnitude(Magnitude::High) => "high".to_string(),
            ImpactEstimate::Magnitude(Magnitude::Medium) => "medium".to_string(),
            ImpactEstimate::Magnitude(Magnitude::Low) => "low".to_string(),
        }
    }
}

impl FromStr for ImpactEstimate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_end_matches("pp").trim();
        if let Ok(points) = trimmed.parse::<f64>() {
            if points.is_finite() {
                return Ok(ImpactEstimate::Points(points));
            }
        }
        match normalize_code(s).as_str() {
            "high" => Ok(ImpactEstimate::Magnitude(Magnitude::High)),
            "medium" | "moderate" => Ok(ImpactEstimate::Magnitude(Magnitude::Medium)),
            "low" => Ok(ImpactEstimate::Magnitude(Magnitude::Low)),
            other => Err(format!("unknown impact estimate '{}'", other)),
        }
    }
}

// ============================================================================
// IMPACT LINK + PROVENANCE
// ============================================================================

/// Fields only carried by `impact_link` records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImpactLink {
    /// Event record this link starts from
    pub parent_id: Option<String>,
    /// Indicator code the event is expected to move
    pub related_indicator: Option<String>,
    pub relationship_type: Option<String>,
    pub impact_direction: Option<ImpactDirection>,
    pub impact_estimate: Option<ImpactEstimate>,
    /// Months before the effect shows up in the indicator
    pub lag_months: Option<u32>,
    pub evidence_basis: Option<String>,
}

impl ImpactLink {
    /// Signed effect in percentage points, resolving labels through `magnitudes`
    pub fn signed_effect(&self, magnitudes: &MagnitudeScale) -> Option<f64> {
        let estimate = self.impact_estimate?;
        let sign = self
            .impact_direction
            .unwrap_or(ImpactDirection::Positive)
            .sign();
        let points = match estimate {
            ImpactEstimate::Points(pp) => pp.abs(),
            ImpactEstimate::Magnitude(m) => magnitudes.points(m),
        };
        Some(sign * points)
    }
}

/// Percentage-point effect assumed for each qualitative magnitude
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MagnitudeScale {
    pub high: f64,
    pub medium: f64,
    pub low: f64,
}

impl MagnitudeScale {
    pub fn points(&self, magnitude: Magnitude) -> f64 {
        match magnitude {
            Magnitude::High => self.high,
            Magnitude::Medium => self.medium,
            Magnitude::Low => self.low,
        }
    }
}

impl Default for MagnitudeScale {
    fn default() -> Self {
        MagnitudeScale {
            high: 5.0,
            medium: 2.5,
            low: 1.0,
        }
    }
}

/// Who added a record and in which enrichment batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub collected_by: String,
    pub collection_date: NaiveDate,
    pub enrichment_batch: String,
}

// ============================================================================
// RECORD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialInclusionRecord {
    pub record_id: String,
    pub record_type: RecordType,
    pub category: Option<String>,
    pub pillar: Option<Pillar>,
    pub indicator: Option<String>,
    pub indicator_code: Option<String>,
    pub indicator_direction: Option<String>,
    /// Present iff `record_type` is `Observation`
    pub value_numeric: Option<f64>,
    pub unit: Option<String>,
    pub observation_date: Option<NaiveDate>,
    pub source_name: Option<String>,
    pub source_url: Option<String>,
    pub confidence: Option<Confidence>,
    pub original_text: Option<String>,
    pub notes: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact: Option<ImpactLink>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,
}

impl FinancialInclusionRecord {
    fn blank(record_id: &str, record_type: RecordType) -> Self {
        FinancialInclusionRecord {
            record_id: record_id.to_string(),
            record_type,
            category: None,
            pillar: None,
            indicator: None,
            indicator_code: None,
            indicator_direction: None,
            value_numeric: None,
            unit: None,
            observation_date: None,
            source_name: None,
            source_url: None,
            confidence: None,
            original_text: None,
            notes: None,
            impact: None,
            provenance: None,
        }
    }

    /// New observation of `indicator_code` on `date`
    pub fn observation(
        record_id: &str,
        pillar: Pillar,
        indicator_code: &str,
        value: f64,
        date: NaiveDate,
    ) -> Self {
        let mut record = Self::blank(record_id, RecordType::Observation);
        record.pillar = Some(pillar);
        record.indicator_code = Some(indicator_code.to_string());
        record.value_numeric = Some(value);
        record.observation_date = Some(date);
        record
    }

    /// New event (no value) on `date`
    pub fn event(record_id: &str, indicator: &str, date: NaiveDate) -> Self {
        let mut record = Self::blank(record_id, RecordType::Event);
        record.indicator = Some(indicator.to_string());
        record.observation_date = Some(date);
        record
    }

    /// New impact link from event `parent_id` to indicator `related_indicator`
    pub fn impact_link(record_id: &str, parent_id: &str, related_indicator: &str) -> Self {
        let mut record = Self::blank(record_id, RecordType::ImpactLink);
        record.impact = Some(ImpactLink {
            parent_id: Some(parent_id.to_string()),
            related_indicator: Some(related_indicator.to_string()),
            ..ImpactLink::default()
        });
        record
    }

    // ========================================================================
    // BUILDER HELPERS
    // ========================================================================

    pub fn with_indicator(mut self, name: &str) -> Self {
        self.indicator = Some(name.to_string());
        self
    }

    pub fn with_indicator_code(mut self, code: &str) -> Self {
        self.indicator_code = Some(code.to_string());
        self
    }

    pub fn with_pillar(mut self, pillar: Pillar) -> Self {
        self.pillar = Some(pillar);
        self
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    pub fn with_unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_string());
        self
    }

    pub fn with_direction(mut self, direction: &str) -> Self {
        self.indicator_direction = Some(direction.to_string());
        self
    }

    pub fn with_source(mut self, name: &str, url: Option<&str>) -> Self {
        self.source_name = Some(name.to_string());
        self.source_url = url.map(|u| u.to_string());
        self
    }

    pub fn with_confidence(mut self, confidence: Confidence) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_original_text(mut self, text: &str) -> Self {
        self.original_text = Some(text.to_string());
        self
    }

    pub fn with_notes(mut self, notes: &str) -> Self {
        self.notes = Some(notes.to_string());
        self
    }

    /// Set direction and estimate on an impact link. No-op for other types.
    pub fn with_impact(mut self, direction: ImpactDirection, estimate: ImpactEstimate) -> Self {
        if let Some(link) = self.impact.as_mut() {
            link.impact_direction = Some(direction);
            link.impact_estimate = Some(estimate);
        }
        self
    }

    pub fn with_lag_months(mut self, lag_months: u32) -> Self {
        if let Some(link) = self.impact.as_mut() {
            link.lag_months = Some(lag_months);
        }
        self
    }

    pub fn with_relationship(mut self, relationship: &str, evidence: &str) -> Self {
        if let Some(link) = self.impact.as_mut() {
            link.relationship_type = Some(relationship.to_string());
            link.evidence_basis = Some(evidence.to_string());
        }
        self
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn is_observation(&self) -> bool {
        self.record_type == RecordType::Observation
    }

    pub fn is_event(&self) -> bool {
        self.record_type == RecordType::Event
    }

    pub fn is_impact_link(&self) -> bool {
        self.record_type == RecordType::ImpactLink
    }

    /// Display name: indicator name, falling back to code, then id
    pub fn label(&self) -> &str {
        self.indicator
            .as_deref()
            .or(self.indicator_code.as_deref())
            .unwrap_or(&self.record_id)
    }

    pub fn year(&self) -> Option<i32> {
        use chrono::Datelike;
        self.observation_date.map(|d| d.year())
    }

    /// Content hash for duplicate detection
    ///
    /// Identity is `record_id`; this hash only covers what the record says
    /// (type, indicator, date, value, link target), so the same fact
    /// submitted under a new id is still caught.
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        let link_target = self
            .impact
            .as_ref()
            .map(|l| {
                format!(
                    "{}>{}",
                    l.parent_id.as_deref().unwrap_or(""),
                    l.related_indicator.as_deref().unwrap_or("")
                )
            })
            .unwrap_or_default();
        hasher.update(format!(
            "{}|{}|{}|{}|{}|{}",
            self.record_type.as_str(),
            self.indicator_code.as_deref().unwrap_or(""),
            self.indicator.as_deref().unwrap_or(""),
            self.observation_date
                .map(|d| d.to_string())
                .unwrap_or_default(),
            self.value_numeric
                .map(|v| format!("{:.6}", v))
                .unwrap_or_default(),
            link_target,
        ));
        format!("{:x}", hasher.finalize())
    }
}

impl fmt::Display for FinancialInclusionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} {}", self.record_type.as_str(), self.record_id, self.label())?;
        if let Some(date) = self.observation_date {
            write!(f, " @ {}", date)?;
        }
        if let Some(value) = self.value_numeric {
            write!(f, " = {}{}", value, self.unit.as_deref().unwrap_or(""))?;
        }
        Ok(())
    }
}

// ============================================================================
// CSV ROW (flat, string-typed)
// ============================================================================

/// Flat CSV representation shared by the loader and the writer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordRow {
    pub record_id: Option<String>,
    pub record_type: Option<String>,
    pub category: Option<String>,
    pub pillar: Option<String>,
    pub indicator: Option<String>,
    pub indicator_code: Option<String>,
    pub indicator_direction: Option<String>,
    pub value_numeric: Option<String>,
    pub unit: Option<String>,
    pub observation_date: Option<String>,
    pub source_name: Option<String>,
    pub source_url: Option<String>,
    pub confidence: Option<String>,
    pub original_text: Option<String>,
    pub notes: Option<String>,
    pub parent_id: Option<String>,
    pub related_indicator: Option<String>,
    pub relationship_type: Option<String>,
    pub impact_direction: Option<String>,
    pub impact_estimate: Option<String>,
    pub lag_months: Option<String>,
    pub evidence_basis: Option<String>,
    pub collected_by: Option<String>,
    pub collection_date: Option<String>,
    pub enrichment_batch: Option<String>,
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("nan"))
}

fn parse_field<T: FromStr<Err = String>>(
    field: &str,
    value: Option<String>,
    errors: &mut Vec<FieldError>,
) -> Option<T> {
    let raw = clean(value)?;
    match raw.parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(message) => {
            errors.push(FieldError::new(field, &message));
            None
        }
    }
}

impl TryFrom<RecordRow> for FinancialInclusionRecord {
    type Error = Vec<FieldError>;

    fn try_from(row: RecordRow) -> Result<Self, Self::Error> {
        let mut errors = Vec::new();

        let record_id = clean(row.record_id);
        if record_id.is_none() {
            errors.push(FieldError::new("record_id", "Required field is empty"));
        }

        let record_type = match clean(row.record_type) {
            Some(raw) => match raw.parse::<RecordType>() {
                Ok(t) => Some(t),
                Err(message) => {
                    errors.push(FieldError::new("record_type", &message));
                    None
                }
            },
            None => {
                errors.push(FieldError::new("record_type", "Required field is empty"));
                None
            }
        };

        let value_numeric = match clean(row.value_numeric) {
            Some(raw) => match raw.replace(',', "").parse::<f64>() {
                Ok(v) if v.is_finite() => Some(v),
                _ => {
                    errors.push(FieldError::new(
                        "value_numeric",
                        &format!("Not a number: {}", raw),
                    ));
                    None
                }
            },
            None => None,
        };

        let observation_date = match clean(row.observation_date) {
            Some(raw) => match parse_date(&raw) {
                Some(date) => Some(date),
                None => {
                    errors.push(FieldError::new(
                        "observation_date",
                        &format!("Invalid date format: {}", raw),
                    ));
                    None
                }
            },
            None => None,
        };

        let pillar = parse_field::<Pillar>("pillar", row.pillar, &mut errors);
        let confidence = parse_field::<Confidence>("confidence", row.confidence, &mut errors);
        let impact_direction =
            parse_field::<ImpactDirection>("impact_direction", row.impact_direction, &mut errors);
        let impact_estimate =
            parse_field::<ImpactEstimate>("impact_estimate", row.impact_estimate, &mut errors);

        let lag_months = match clean(row.lag_months) {
            Some(raw) => match raw.parse::<f64>() {
                Ok(v) if v >= 0.0 && v.is_finite() => Some(v.round() as u32),
                _ => {
                    errors.push(FieldError::new(
                        "lag_months",
                        &format!("Not a month count: {}", raw),
                    ));
                    None
                }
            },
            None => None,
        };

        let provenance = match (clean(row.collected_by), clean(row.collection_date)) {
            (Some(collected_by), Some(date)) => match parse_date(&date) {
                Some(collection_date) => Some(Provenance {
                    collected_by,
                    collection_date,
                    enrichment_batch: clean(row.enrichment_batch).unwrap_or_default(),
                }),
                None => {
                    errors.push(FieldError::new(
                        "collection_date",
                        &format!("Invalid date format: {}", date),
                    ));
                    None
                }
            },
            _ => None,
        };

        let (record_id, record_type) = match (record_id, record_type) {
            (Some(id), Some(t)) if errors.is_empty() => (id, t),
            _ => return Err(errors),
        };

        let impact = if record_type == RecordType::ImpactLink {
            Some(ImpactLink {
                parent_id: clean(row.parent_id),
                related_indicator: clean(row.related_indicator),
                relationship_type: clean(row.relationship_type),
                impact_direction,
                impact_estimate,
                lag_months,
                evidence_basis: clean(row.evidence_basis),
            })
        } else {
            None
        };

        Ok(FinancialInclusionRecord {
            record_id,
            record_type,
            category: clean(row.category),
            pillar,
            indicator: clean(row.indicator),
            indicator_code: clean(row.indicator_code),
            indicator_direction: clean(row.indicator_direction),
            value_numeric,
            unit: clean(row.unit),
            observation_date,
            source_name: clean(row.source_name),
            source_url: clean(row.source_url),
            confidence,
            original_text: clean(row.original_text),
            notes: clean(row.notes),
            impact,
            provenance,
        })
    }
}

impl From<&FinancialInclusionRecord> for RecordRow {
    fn from(record: &FinancialInclusionRecord) -> Self {
        let link = record.impact.clone().unwrap_or_default();
        RecordRow {
            record_id: Some(record.record_id.clone()),
            record_type: Some(record.record_type.as_str().to_string()),
            category: record.category.clone(),
            pillar: record.pillar.map(|p| p.as_str().to_string()),
            indicator: record.indicator.clone(),
            indicator_code: record.indicator_code.clone(),
            indicator_direction: record.indicator_direction.clone(),
            value_numeric: record.value_numeric.map(|v| v.to_string()),
            unit: record.unit.clone(),
            observation_date: record.observation_date.map(|d| d.to_string()),
            source_name: record.source_name.clone(),
            source_url: record.source_url.clone(),
            confidence: record.confidence.map(|c| c.as_str().to_string()),
            original_text: record.original_text.clone(),
            notes: record.notes.clone(),
            parent_id: link.parent_id,
            related_indicator: link.related_indicator,
            relationship_type: link.relationship_type,
            impact_direction: link.impact_direction.map(|d| d.as_str().to_string()),
            impact_estimate: link.impact_estimate.map(|e| e.label()),
            lag_months: link.lag_months.map(|m| m.to_string()),
            evidence_basis: link.evidence_basis,
            collected_by: record.provenance.as_ref().map(|p| p.collected_by.clone()),
            collection_date: record
                .provenance
                .as_ref()
                .map(|p| p.collection_date.to_string()),
            enrichment_batch: record
                .provenance
                .as_ref()
                .map(|p| p.enrichment_batch.clone()),
        }
    }
}

// ============================================================================
// HELPERS
// ============================================================================

/// Lowercase, trim, and turn spaces/dashes into underscores
pub fn normalize_code(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

/// Parse the date formats seen in spreadsheet exports
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    for format in ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date);
        }
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(datetime.date());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_enum_parsing_is_case_insensitive() {
        assert_eq!("Observation".parse::<RecordType>().unwrap(), RecordType::Observation);
        assert_eq!("impact-link".parse::<RecordType>().unwrap(), RecordType::ImpactLink);
        assert_eq!("access".parse::<Pillar>().unwrap(), Pillar::Access);
        assert_eq!(" HIGH ".parse::<Confidence>().unwrap(), Confidence::High);
        assert!("sideways".parse::<ImpactDirection>().is_err());
    }

    #[test]
    fn test_impact_estimate_parsing() {
        assert_eq!(
            "High".parse::<ImpactEstimate>().unwrap(),
            ImpactEstimate::Magnitude(Magnitude::High)
        );
        assert_eq!("6.5".parse::<ImpactEstimate>().unwrap(), ImpactEstimate::Points(6.5));
        assert_eq!("3pp".parse::<ImpactEstimate>().unwrap(), ImpactEstimate::Points(3.0));
    }

    #[test]
    fn test_signed_effect() {
        let scale = MagnitudeScale::default();
        let link = FinancialInclusionRecord::impact_link("IMP_1", "EVT_1", "ACC_OWNERSHIP")
            .with_impact(
                ImpactDirection::Negative,
                ImpactEstimate::Magnitude(Magnitude::Medium),
            );

        let effect = link.impact.as_ref().unwrap().signed_effect(&scale);
        assert_eq!(effect, Some(-2.5));
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2024-06-30"), Some(date(2024, 6, 30)));
        assert_eq!(parse_date("06/30/2024"), Some(date(2024, 6, 30)));
        assert_eq!(parse_date("2024-06-30 00:00:00"), Some(date(2024, 6, 30)));
        assert_eq!(parse_date("June 2024"), None);
    }

    #[test]
    fn test_row_conversion_roundtrip_keeps_impact_fields() {
        let record = FinancialInclusionRecord::impact_link("IMP_2024_001", "EVT_2024_001", "ACC_OWNERSHIP")
            .with_impact(ImpactDirection::Positive, ImpactEstimate::Magnitude(Magnitude::High))
            .with_lag_months(12);

        let row = RecordRow::from(&record);
        assert_eq!(row.impact_estimate.as_deref(), Some("high"));
        assert_eq!(row.lag_months.as_deref(), Some("12"));

        let back = FinancialInclusionRecord::try_from(row).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_row_with_bad_value_is_rejected() {
        let row = RecordRow {
            record_id: Some("OBS_X".to_string()),
            record_type: Some("observation".to_string()),
            value_numeric: Some("forty".to_string()),
            ..RecordRow::default()
        };

        let errors = FinancialInclusionRecord::try_from(row).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "value_numeric"));
    }

    #[test]
    fn test_content_hash_ignores_identity() {
        let a = FinancialInclusionRecord::observation("A", Pillar::Access, "ACC_OWNERSHIP", 46.0, date(2021, 12, 31));
        let b = FinancialInclusionRecord::observation("B", Pillar::Access, "ACC_OWNERSHIP", 46.0, date(2021, 12, 31));
        let c = FinancialInclusionRecord::observation("C", Pillar::Access, "ACC_OWNERSHIP", 47.0, date(2021, 12, 31));

        assert_eq!(a.content_hash(), b.content_hash());
        assert_ne!(a.content_hash(), c.content_hash());
        assert_eq!(a.content_hash().len(), 64);
    }
}
