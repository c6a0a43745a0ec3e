// Inclusion Forecast - Dashboard API
// JSON view of the enriched dataset and the forecast tables

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use clap::Parser;
use inclusion_forecast::{
    dashboard::TimelineEntry, event_timeline, Confidence, DashboardData,
    FinancialInclusionRecord, PipelineConfig, Pillar, RecordFilter, RecordType,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

#[derive(Parser, Debug)]
#[command(name = "inclusion-server", version, about = "Dashboard JSON API")]
struct Args {
    #[arg(long, env = "INCLUSION_CONFIG", default_value = "pipeline.toml")]
    config: PathBuf,

    #[arg(long, env = "INCLUSION_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[arg(long, env = "INCLUSION_SERVER_ADDR", default_value = "0.0.0.0:3000")]
    addr: String,
}

/// Shared application state, loaded once at startup
#[derive(Clone)]
struct AppState {
    data: Arc<DashboardData>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Response {
        (
            StatusCode::OK,
            Json(ApiResponse {
                success: true,
                data: Some(data),
                error: None,
            }),
        )
            .into_response()
    }
}

fn api_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(message.into()),
        }),
    )
        .into_response()
}

/// Query string for GET /api/records
#[derive(Debug, Default, Deserialize)]
struct RecordQuery {
    pillar: Option<String>,
    #[serde(rename = "type")]
    record_type: Option<String>,
    confidence: Option<String>,
    from: Option<i32>,
    to: Option<i32>,
}

impl RecordQuery {
    fn to_filter(&self) -> Result<RecordFilter, String> {
        let year_range = match (self.from, self.to) {
            (None, None) => None,
            (from, to) => {
                let from = from.unwrap_or(i32::MIN);
                let to = to.unwrap_or(i32::MAX);
                if from > to {
                    return Err(format!("year range {}..{} is empty", from, to));
                }
                Some((from, to))
            }
        };
        Ok(RecordFilter {
            pillar: self.pillar.as_deref().map(str::parse::<Pillar>).transpose()?,
            record_type: self.record_type.as_deref().map(str::parse::<RecordType>).transpose()?,
            confidence: self.confidence.as_deref().map(str::parse::<Confidence>).transpose()?,
            year_range,
        })
    }
}

#[derive(Serialize)]
struct RecordsResponse {
    total: usize,
    filter: RecordFilter,
    records: Vec<FinancialInclusionRecord>,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> Response {
    ApiResponse::ok("OK")
}

/// GET /api/summary - Headline metrics and distributions
async fn get_summary(State(state): State<AppState>) -> Response {
    ApiResponse::ok(state.data.summary())
}

/// GET /api/records?pillar=&type=&confidence=&from=&to=
async fn get_records(State(state): State<AppState>, Query(query): Query<RecordQuery>) -> Response {
    let filter = match query.to_filter() {
        Ok(filter) => filter,
        Err(e) => return api_error(StatusCode::BAD_REQUEST, e),
    };
    let data = state.data;
    let records: Vec<FinancialInclusionRecord> =
        filter.apply(&data.dataset).into_iter().cloned().collect();
    ApiResponse::ok(RecordsResponse {
        total: data.dataset.len(),
        filter,
        records,
    })
}

/// GET /api/records/pillar/:pillar - Records of one pillar
async fn get_records_by_pillar(
    State(state): State<AppState>,
    Path(pillar): Path<String>,
) -> Response {
    let decoded = urlencoding::decode(&pillar)
        .unwrap_or_else(|_| pillar.clone().into())
        .into_owned();
    let pillar: Pillar = match decoded.parse() {
        Ok(p) => p,
        Err(e) => return api_error(StatusCode::BAD_REQUEST, e),
    };

    let filter = RecordFilter {
        pillar: Some(pillar),
        ..RecordFilter::default()
    };
    let data = state.data;
    let records: Vec<FinancialInclusionRecord> =
        filter.apply(&data.dataset).into_iter().cloned().collect();
    ApiResponse::ok(records)
}

/// GET /api/records/:id - One record
async fn get_record(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let decoded = urlencoding::decode(&id)
        .unwrap_or_else(|_| id.clone().into())
        .into_owned();
    match state.data.dataset.get(&decoded) {
        Some(record) => ApiResponse::ok(record.clone()),
        None => api_error(StatusCode::NOT_FOUND, format!("record {} not found", decoded)),
    }
}

/// GET /api/events - Event timeline
async fn get_events(State(state): State<AppState>) -> Response {
    let timeline: Vec<TimelineEntry> = event_timeline(&state.data.dataset);
    ApiResponse::ok(timeline)
}

/// GET /api/impacts - Impact links
async fn get_impacts(State(state): State<AppState>) -> Response {
    let data = state.data;
    let links: Vec<FinancialInclusionRecord> =
        data.dataset.impact_links().into_iter().cloned().collect();
    ApiResponse::ok(links)
}

/// GET /api/forecast - Ensemble forecast table
async fn get_forecast(State(state): State<AppState>) -> Response {
    match &state.data.forecast {
        Some(rows) => ApiResponse::ok(rows.clone()),
        None => api_error(
            StatusCode::NOT_FOUND,
            "forecast not available, run the pipeline first",
        ),
    }
}

/// GET /api/scenarios - Scenario table
async fn get_scenarios(State(state): State<AppState>) -> Response {
    match &state.data.scenarios {
        Some(rows) => ApiResponse::ok(rows.clone()),
        None => api_error(
            StatusCode::NOT_FOUND,
            "scenarios not available, run the pipeline first",
        ),
    }
}

fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/summary", get(get_summary))
        .route("/records", get(get_records))
        .route("/records/pillar/:pillar", get(get_records_by_pillar))
        .route("/records/:id", get(get_record))
        .route("/events", get(get_events))
        .route("/impacts", get(get_impacts))
        .route("/forecast", get(get_forecast))
        .route("/scenarios", get(get_scenarios))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();

    println!("🌐 Inclusion Forecast - Dashboard API");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let mut config = PipelineConfig::load(Some(&args.config))?;
    if let Some(dir) = args.data_dir {
        config.paths.data_dir = dir;
    }

    let data = match DashboardData::load(&config.paths) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("❌ {}", e);
            eprintln!("   Run: inclusion-forecast run");
            eprintln!("   to build the dataset and forecast first.");
            std::process::exit(1);
        }
    };
    println!("✓ Loaded {} records from {}", data.dataset.len(), config.paths.data_dir.display());
    for file in &data.missing {
        println!("⚠️  missing: {}", file);
    }

    let state = AppState {
        data: Arc::new(data),
    };
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&args.addr).await?;

    println!("\n🚀 Server running on http://{}", args.addr);
    println!("   API: http://{}/api/summary", args.addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app).await?;
    Ok(())
}
