// Inclusion Forecast - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod record;      // Record model + CSV row mapping
pub mod dataset;     // Append-only record collection
pub mod validation;  // Shape rules + data quality engine
pub mod loader;      // CSV loading, reference codes, schema inspection
pub mod enrichment;  // Curated additions with batch provenance
pub mod audit;       // SQLite audit trail
pub mod series;      // Time series + event regressors
pub mod impact;      // Interrupted time series around events
pub mod error;       // Model errors
pub mod models;      // ARIMA-X, damped Holt, trend regression
pub mod forecast;    // Ensemble, bands, scenarios
pub mod output;      // Forecast CSV tables
pub mod config;      // TOML configuration
pub mod dashboard;   // Data behind the TUI and the API
pub mod pipeline;    // End-to-end batch run

// Re-export commonly used types
pub use record::{
    Confidence, FinancialInclusionRecord, ImpactDirection, ImpactEstimate, ImpactLink,
    Magnitude, MagnitudeScale, Pillar, Provenance, RecordRow, RecordType,
};
pub use dataset::{AppendError, Dataset};
pub use validation::{
    check_record_shape, validate_dataset, BatchSummary, DataQualityEngine, DatasetValidation,
    FieldError, QualityReport, Severity, ValidationResult,
};
pub use loader::{
    inspect_schema, load_data, load_dataset, load_reference_codes, LoadReport, ReferenceCode,
    RejectedRow, SchemaSummary,
};
pub use enrichment::{curated_records, write_dataset, Enricher, EnrichmentReport, SkippedRecord};
pub use audit::{get_events_for_entity, insert_event, setup_database, AuditEvent, AuditLog};
pub use series::{
    decimal_year, event_indicators, event_markers, prepare_time_series, AnnualSeries,
    EventMarker, RegressorShape, SeriesPoint, TimeSeries,
};
pub use impact::{
    analyze_event_impacts, filter_by_event_window, pre_post_statistics, EventImpact,
    ImpactAnalysis, ImpactConfig, PrePostStats, SkippedEvent,
};
pub use error::{ModelError, ModelResult};
pub use models::{ArimaX, DampedHolt, Forecaster, ModelForecast, TrendRegression};
pub use forecast::{
    calculate_confidence_intervals, forecast_indicator, generate_scenarios, validate_forecast,
    AccuracyMetrics, ComponentForecast, ForecastPoint, ForecastResult, PendingEffect,
    ScenarioForecast,
};
pub use output::{
    read_forecast_csv, read_scenarios_csv, write_components_csv, write_forecast_csv,
    write_scenarios_csv, ForecastRow, ScenarioRow,
};
pub use config::{ForecastConfig, PathsConfig, PipelineConfig};
pub use dashboard::{
    calculate_growth_rate, event_timeline, format_metric, latest_observation, DashboardData,
    DashboardSummary, RecordFilter,
};
pub use pipeline::PipelineSummary;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
