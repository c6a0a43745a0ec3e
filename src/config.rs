// ⚙️ Pipeline configuration - TOML file, every key optional

use crate::impact::ImpactConfig;
use crate::record::MagnitudeScale;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub forecast: ForecastConfig,
    #[serde(default)]
    pub impact: ImpactConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
}

// ============================================================================
// PATHS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub data_dir: PathBuf,
    pub dataset: String,
    pub reference_codes: String,
    pub enriched: String,
    pub forecast: String,
    pub scenarios: String,
    pub components: String,
    /// SQLite audit trail; disabled when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit_db: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        PathsConfig {
            data_dir: PathBuf::from("data"),
            dataset: "ethiopia_fi_unified_data.csv".to_string(),
            reference_codes: "reference_codes.csv".to_string(),
            enriched: "ethiopia_fi_unified_data_enriched.csv".to_string(),
            forecast: "account_ownership_forecast.csv".to_string(),
            scenarios: "forecast_scenarios.csv".to_string(),
            components: "forecast_components.csv".to_string(),
            audit_db: None,
        }
    }
}

impl PathsConfig {
    pub fn dataset_path(&self) -> PathBuf {
        self.data_dir.join(&self.dataset)
    }

    pub fn reference_codes_path(&self) -> PathBuf {
        self.data_dir.join(&self.reference_codes)
    }

    pub fn enriched_path(&self) -> PathBuf {
        self.data_dir.join(&self.enriched)
    }

    pub fn forecast_path(&self) -> PathBuf {
        self.data_dir.join(&self.forecast)
    }

    pub fn scenarios_path(&self) -> PathBuf {
        self.data_dir.join(&self.scenarios)
    }

    pub fn components_path(&self) -> PathBuf {
        self.data_dir.join(&self.components)
    }
}

// ============================================================================
// FORECAST
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelWeights {
    pub arima: f64,
    pub ets: f64,
    pub regression: f64,
}

impl Default for ModelWeights {
    fn default() -> Self {
        ModelWeights {
            arima: 0.4,
            ets: 0.2,
            regression: 0.4,
        }
    }
}

impl ModelWeights {
    /// Weight for a model by its short name
    pub fn for_model(&self, name: &str) -> f64 {
        match name {
            "arima" => self.arima,
            "ets" => self.ets,
            "regression" => self.regression,
            _ => 0.0,
        }
    }
}

/// Trend multipliers per scenario
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioMultipliers {
    pub base: f64,
    pub accelerated: f64,
    pub stagnation: f64,
}

impl Default for ScenarioMultipliers {
    fn default() -> Self {
        ScenarioMultipliers {
            base: 1.0,
            accelerated: 1.5,
            stagnation: 0.6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub indicator: String,
    pub horizon: usize,
    pub arima_p: usize,
    pub arima_d: usize,
    pub with_drift: bool,
    pub weights: ModelWeights,
    pub scenarios: ScenarioMultipliers,
    /// Effect assumed for qualitative impact estimates
    pub magnitudes: MagnitudeScale,
    /// Lag applied to impact links that do not state one
    pub default_lag_months: u32,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        ForecastConfig {
            indicator: "ACC_OWNERSHIP".to_string(),
            horizon: 3,
            arima_p: 1,
            arima_d: 1,
            with_drift: true,
            weights: ModelWeights::default(),
            scenarios: ScenarioMultipliers::default(),
            magnitudes: MagnitudeScale::default(),
            default_lag_months: 12,
        }
    }
}

// ============================================================================
// ENRICHMENT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub collected_by: String,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        EnrichmentConfig {
            collected_by: "data-team".to_string(),
        }
    }
}

// ============================================================================
// LOADING
// ============================================================================

impl PipelineConfig {
    /// Load from `path`, or defaults when no path is given or the file is missing
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) if path.exists() => {
                debug!(config_path = %path.display(), "Loading config");
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config: {}", path.display()))?;
                toml::from_str::<Self>(&content)
                    .with_context(|| format!("failed to parse config: {}", path.display()))?
            }
            Some(path) => {
                debug!(config_path = %path.display(), "Config file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize config")
    }

    pub fn validate(&self) -> Result<()> {
        let w = &self.forecast.weights;
        if w.arima < 0.0 || w.ets < 0.0 || w.regression < 0.0 {
            bail!("model weights must be non-negative");
        }
        if w.arima + w.ets + w.regression <= 0.0 {
            bail!("at least one model weight must be positive");
        }
        let s = &self.forecast.scenarios;
        if s.base < 0.0 || s.accelerated < 0.0 || s.stagnation < 0.0 {
            bail!("scenario multipliers must be non-negative");
        }
        if self.forecast.horizon == 0 {
            bail!("forecast horizon must be at least 1");
        }
        if self.forecast.arima_d > 1 {
            bail!("arima_d must be 0 or 1");
        }
        if self.impact.min_segment_points == 0 {
            bail!("impact.min_segment_points must be at least 1");
        }
        Ok(())
    }
}
