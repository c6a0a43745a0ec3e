// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use inclusion_forecast::{
    analyze_event_impacts, event_markers, inspect_schema, load_dataset, pipeline,
    prepare_time_series, AuditLog, Dataset, PipelineConfig,
};

/// Financial inclusion dataset enrichment, event impact analysis and forecasting
#[derive(Parser, Debug)]
#[command(name = "inclusion-forecast", version, about)]
struct Cli {
    /// Path to the TOML config file (defaults apply when missing)
    #[arg(long, env = "INCLUSION_CONFIG", default_value = "pipeline.toml")]
    config: PathBuf,

    /// Override the data directory
    #[arg(long, env = "INCLUSION_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Write audit events to this SQLite database
    #[arg(long, env = "INCLUSION_AUDIT_DB")]
    audit_db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the dataset and print schema and quality summaries
    Inspect,
    /// Append the curated records and write the enriched dataset
    Enrich,
    /// Estimate event impacts on an indicator
    Analyze {
        #[arg(long)]
        indicator: Option<String>,
    },
    /// Forecast an indicator and write the forecast tables
    Forecast {
        #[arg(long)]
        indicator: Option<String>,
        #[arg(long)]
        horizon: Option<usize>,
    },
    /// Full pipeline: load, validate, enrich, forecast, write
    Run,
    /// Open the terminal dashboard
    Dashboard,
    /// Print the effective configuration as TOML
    ShowConfig,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let mut config = PipelineConfig::load(Some(&cli.config))?;
    if let Some(dir) = cli.data_dir {
        config.paths.data_dir = dir;
    }
    if cli.audit_db.is_some() {
        config.paths.audit_db = cli.audit_db;
    }

    match cli.command {
        Command::Inspect => run_inspect(&config),
        Command::Enrich => run_enrich(&config),
        Command::Analyze { indicator } => {
            if let Some(code) = indicator {
                config.forecast.indicator = code;
            }
            run_analyze(&config)
        }
        Command::Forecast { indicator, horizon } => {
            if let Some(code) = indicator {
                config.forecast.indicator = code;
            }
            if let Some(h) = horizon {
                config.forecast.horizon = h;
            }
            config.validate()?;
            run_forecast(&config)
        }
        Command::Run => run_pipeline(&config),
        Command::Dashboard => run_ui_mode(&config),
        Command::ShowConfig => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

fn rule() {
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

/// Enriched dataset when present, base dataset otherwise
fn working_dataset(config: &PipelineConfig) -> Result<Dataset> {
    let enriched = config.paths.enriched_path();
    if enriched.exists() {
        return Ok(load_dataset(&enriched)?.dataset);
    }
    println!("⚠️  {} not found, using the base dataset", enriched.display());
    println!("   Run: inclusion-forecast enrich");
    let (report, _) = pipeline::load(config)?;
    Ok(report.dataset)
}

fn run_inspect(config: &PipelineConfig) -> Result<()> {
    println!("🔎 Dataset inspection");
    rule();

    let (report, codes) = pipeline::load(config)?;
    let schema = inspect_schema(&report.dataset, &report.columns);
    println!("\n📂 {}", config.paths.dataset_path().display());
    println!("{}", schema.summary());

    if !report.rejected.is_empty() {
        println!("\n❌ Rejected rows:");
        for row in &report.rejected {
            println!(
                "   line {:>4} {:<14} {}",
                row.line,
                row.record_id.as_deref().unwrap_or("-"),
                row.reason
            );
        }
    }

    println!("\n🔍 Validation ({} reference codes)", codes.len());
    let validation = pipeline::validate(&report.dataset, &codes);
    println!("✓ {}", validation.summary.summary());
    for id in &validation.dangling_links {
        println!("⚠️  impact link {} points at no known event", id);
    }

    Ok(())
}

fn run_enrich(config: &PipelineConfig) -> Result<()> {
    println!("➕ Enrichment");
    rule();

    let (report, _) = pipeline::load(config)?;
    let mut dataset = report.dataset;
    let before = dataset.len();

    let enrichment = pipeline::enrich(&mut dataset, config)?;
    println!("✓ {} → {} records", before, dataset.len());
    for skipped in &enrichment.skipped {
        println!("   skipped {}: {}", skipped.record_id, skipped.reason);
    }
    println!("✓ Saved {}", config.paths.enriched_path().display());

    if let Some(path) = &config.paths.audit_db {
        let audit = AuditLog::open(path, &config.enrichment.collected_by)?;
        let logged = audit.record_enrichment(&dataset, &enrichment)?;
        println!("✓ {} audit events written to {}", logged, path.display());
    }

    Ok(())
}

fn run_analyze(config: &PipelineConfig) -> Result<()> {
    let code = &config.forecast.indicator;
    println!("🎯 Event impact analysis: {}", code);
    rule();

    let dataset = working_dataset(config)?;
    let series = prepare_time_series(&dataset, code);
    let events = event_markers(&dataset, None);
    let analysis = analyze_event_impacts(&series, &events, &config.impact);

    println!("\n{} observations, {} events", series.len(), events.len());
    for impact in &analysis.impacts {
        println!(
            "✓ {:<28} level {:+6.2}pp [{:+.2}, {:+.2}]  trend {:+.2}pp/yr",
            impact.event_name, impact.level_shift, impact.ci_low, impact.ci_high, impact.trend_change
        );
    }
    for skipped in &analysis.skipped {
        println!("⏭️  {:<28} {}", skipped.event_name, skipped.reason);
    }

    Ok(())
}

fn run_forecast(config: &PipelineConfig) -> Result<()> {
    println!("🔮 Forecast: {}", config.forecast.indicator);
    rule();

    let dataset = working_dataset(config)?;
    let (result, outputs) = pipeline::forecast(&dataset, config)?;
    print_forecast(&result);

    if let Some(path) = &config.paths.audit_db {
        AuditLog::open(path, &config.enrichment.collected_by)?.record_forecast(&result)?;
    }
    for path in outputs {
        println!("✓ Saved {}", path.display());
    }
    Ok(())
}

fn print_forecast(result: &inclusion_forecast::ForecastResult) {
    println!(
        "\nLast observed: {:.1}% ({})",
        result.last_observation.value, result.last_observation.date
    );
    for c in &result.components {
        println!(
            "   {:<10} w={:.2}  MAE {:.2}  AIC {:.1}",
            c.model, c.weight, c.diagnostics.in_sample.mae, c.diagnostics.aic
        );
    }
    for m in &result.skipped_models {
        println!("⏭️  {:<10} {}", m.model, m.reason);
    }
    for e in &result.pending_effects {
        println!(
            "⏳ {} {:+.1}pp from {}",
            e.event_name, e.effect, e.active_from_year
        );
    }

    println!("\n{:<6} {:>9} {:>17} {:>17}", "Year", "Forecast", "80% band", "95% band");
    for p in &result.ensemble {
        println!(
            "{:<6} {:>8.1}% {:>7.1} – {:<7.1} {:>7.1} – {:<7.1}",
            p.year, p.point, p.lower_80, p.upper_80, p.lower_95, p.upper_95
        );
    }
    for s in &result.scenarios {
        if let Some(last) = s.points.last() {
            println!("   {:<12} {} → {:.1}%", s.name, last.year, last.point);
        }
    }
}

fn run_pipeline(config: &PipelineConfig) -> Result<()> {
    println!("🔁 Full pipeline");
    rule();

    let summary = pipeline::run(config)?;

    println!("\n📂 Loaded {} records ({} rejected)", summary.loaded, summary.rejected);
    println!("🔍 {}", summary.validation.summary.summary());
    println!("➕ {}", summary.enrichment.summary());
    print_forecast(&summary.forecast);

    println!();
    rule();
    for path in &summary.outputs {
        println!("✓ Saved {}", path.display());
    }
    if summary.audit_events > 0 {
        println!("✓ {} audit events", summary.audit_events);
    }
    println!("✅ Pipeline complete (dataset {})", summary.dataset_fingerprint.get(..12).unwrap_or_default());
    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &PipelineConfig) -> Result<()> {
    println!("🖥️  Loading dashboard...\n");

    let data = inclusion_forecast::DashboardData::load(&config.paths)?;
    for file in &data.missing {
        println!("⚠️  missing: {}", file);
    }
    println!("✓ Loaded {} records", data.dataset.len());
    println!("Starting UI... (Press 'q' to quit)\n");

    let mut app = ui::App::new(data);
    ui::run_ui(&mut app)?;

    println!("\n✅ UI closed successfully");
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &PipelineConfig) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the API: cargo run --bin inclusion-server --features server");
    std::process::exit(1);
}
