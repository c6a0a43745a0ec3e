// End-to-end pipeline run against the bundled Ethiopia dataset

use inclusion_forecast::{
    load_dataset, pipeline, read_forecast_csv, read_scenarios_csv, AuditLog, DashboardData,
    PipelineConfig,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn fixture_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("data")
}

/// Copy the bundled inputs into a scratch data directory
fn scratch_config() -> (TempDir, PipelineConfig) {
    let dir = TempDir::new().unwrap();
    for file in ["ethiopia_fi_unified_data.csv", "reference_codes.csv"] {
        std::fs::copy(fixture_dir().join(file), dir.path().join(file)).unwrap();
    }

    let mut config = PipelineConfig::default();
    config.paths.data_dir = dir.path().to_path_buf();
    config.paths.audit_db = Some(dir.path().join("audit.db"));
    (dir, config)
}

fn header(path: &Path) -> Vec<String> {
    let mut rdr = csv::Reader::from_path(path).unwrap();
    rdr.headers().unwrap().iter().map(|h| h.to_string()).collect()
}

#[test]
fn test_full_pipeline_run() {
    println!("\n🧪 Testing full pipeline run...");

    let (_dir, config) = scratch_config();
    let summary = pipeline::run(&config).unwrap();
    println!("{}", summary.summary());

    assert_eq!(summary.loaded, 14);
    assert_eq!(summary.rejected, 0);
    assert!(summary.validation.duplicate_ids.is_empty());
    assert!(summary.validation.dangling_links.is_empty());
    assert_eq!(summary.enrichment.appended.len(), 3);

    // Forecast
    let forecast = &summary.forecast;
    assert_eq!(forecast.years, vec![2025, 2026, 2027]);
    assert_eq!(forecast.regressors, vec!["EVT_0001".to_string()]);
    let base_2027 = forecast.scenario("base").unwrap().points[2].point;
    assert!(
        (54.5..=66.5).contains(&base_2027),
        "2027 base forecast {} outside 54.5-66.5",
        base_2027
    );
    for point in &forecast.ensemble {
        assert!(point.is_ordered(), "bands out of order in {}", point.year);
    }

    // Enriched dataset on disk: unique ids, provenance on the new rows
    let enriched = load_dataset(&config.paths.enriched_path()).unwrap();
    assert!(enriched.rejected.is_empty());
    assert_eq!(enriched.dataset.len(), 17);
    let ids: HashSet<&str> = enriched
        .dataset
        .records()
        .iter()
        .map(|r| r.record_id.as_str())
        .collect();
    assert_eq!(ids.len(), enriched.dataset.len());
    let added = enriched.dataset.get("OBS_2024_001").unwrap();
    let provenance = added.provenance.as_ref().unwrap();
    assert_eq!(provenance.enrichment_batch, summary.enrichment.batch_id);
    assert!(enriched.dataset.get("REC_0001").unwrap().provenance.is_none());

    // Output tables
    assert_eq!(
        header(&config.paths.forecast_path()),
        vec![
            "Year",
            "Forecast (%)",
            "Lower 80% CI",
            "Upper 80% CI",
            "Lower 95% CI",
            "Upper 95% CI"
        ]
    );
    assert_eq!(
        header(&config.paths.scenarios_path()),
        vec!["Year", "Base Case (%)", "Accelerated (%)", "Stagnation (%)"]
    );
    assert!(config.paths.components_path().exists());

    let rows = read_forecast_csv(&config.paths.forecast_path()).unwrap();
    assert_eq!(rows.len(), 3);
    assert!((rows[2].forecast - base_2027).abs() < 0.01);
    let scenarios = read_scenarios_csv(&config.paths.scenarios_path()).unwrap();
    for row in &scenarios {
        assert!(row.stagnation <= row.base && row.base <= row.accelerated);
    }

    // Audit trail: 3 appended records + 1 forecast run
    assert_eq!(summary.audit_events, 4);
    let audit = AuditLog::open(config.paths.audit_db.as_ref().unwrap(), "test").unwrap();
    assert_eq!(audit.count(Some("record_appended")).unwrap(), 3);
    assert_eq!(audit.count(Some("forecast_run")).unwrap(), 1);

    println!("✅ Full pipeline run PASSED (2027 base {:.2})", base_2027);
}

#[test]
fn test_dashboard_reads_pipeline_outputs() {
    println!("\n🧪 Testing dashboard load before and after the pipeline...");

    let (_dir, config) = scratch_config();

    // Before the run: base dataset, forecast reported missing
    let before = DashboardData::load(&config.paths).unwrap();
    assert_eq!(before.dataset.len(), 14);
    assert!(before.forecast.is_none());
    assert!(before.scenarios.is_none());
    assert_eq!(before.missing.len(), 3);
    assert!(before.summary().final_forecast.is_none());

    pipeline::run(&config).unwrap();

    let after = DashboardData::load(&config.paths).unwrap();
    assert!(after.missing.is_empty());
    assert_eq!(after.dataset.len(), 17);
    let summary = after.summary();
    let latest = summary.latest.unwrap();
    assert_eq!(latest.record_id, "OBS_2024_001");
    assert_eq!(summary.final_forecast.map(|(year, _)| year), Some(2027));

    println!("✅ Dashboard load PASSED");
}

#[test]
fn test_rerun_is_stable() {
    println!("\n🧪 Testing that a second run gives the same forecast...");

    let (_dir, config) = scratch_config();
    let first = pipeline::run(&config).unwrap();
    let second = pipeline::run(&config).unwrap();

    // Each run starts from the base file, so the enriched output is the same
    assert_eq!(second.enrichment.appended.len(), 3);
    assert_eq!(first.dataset_fingerprint, second.dataset_fingerprint);
    let a: Vec<f64> = first.forecast.ensemble.iter().map(|p| p.point).collect();
    let b: Vec<f64> = second.forecast.ensemble.iter().map(|p| p.point).collect();
    assert_eq!(a, b);

    println!("✅ Rerun stability PASSED");
}
