use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, post},
};
use roll_optimizer::power::{AssignMode, DirectReport, GroupedReport, SupplyCatalog};
use roll_optimizer::solver::Planner;
use roll_optimizer::types::{CutPlan, CutRequest};
use serde::{Deserialize, Serialize};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[derive(Deserialize, Serialize)]
struct OptimizeRequest {
    roll_length: f64,
    cuts: Vec<CutRequest>,
    #[serde(default)]
    max_items_per_pattern: Option<usize>,
}

async fn optimize(
    Json(req): Json<OptimizeRequest>,
) -> Result<Json<CutPlan>, (StatusCode, String)> {
    tracing::info!(
        body = serde_json::to_string(&req).unwrap_or_default(),
        "POST /optimize"
    );

    let planner = Planner::new(req.roll_length, req.cuts, req.max_items_per_pattern)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    Ok(Json(planner.plan()))
}

#[derive(Deserialize, Serialize)]
struct PowerRequest {
    cuts: Vec<CutRequest>,
    watts_per_meter: f64,
    ratings: Vec<f64>,
    #[serde(default = "default_safety_factor")]
    safety_factor: f64,
    #[serde(default = "default_mode")]
    mode: AssignMode,
}

fn default_safety_factor() -> f64 {
    1.2
}

fn default_mode() -> AssignMode {
    AssignMode::Direct
}

#[derive(Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
enum PowerResponse {
    Direct(DirectReport),
    Grouped(GroupedReport),
}

async fn power(
    Json(req): Json<PowerRequest>,
) -> Result<Json<PowerResponse>, (StatusCode, String)> {
    tracing::info!(
        body = serde_json::to_string(&req).unwrap_or_default(),
        "POST /power"
    );

    for cut in &req.cuts {
        if !cut.length.is_finite() || cut.length <= 0.0 {
            return Err((
                StatusCode::BAD_REQUEST,
                "cut length must be positive".to_string(),
            ));
        }
        if cut.qty == 0 {
            return Err((
                StatusCode::BAD_REQUEST,
                "cut quantity must be non-zero".to_string(),
            ));
        }
    }

    let catalog = SupplyCatalog::new(req.watts_per_meter, req.ratings, req.safety_factor)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let response = match req.mode {
        AssignMode::Direct => PowerResponse::Direct(catalog.assign_direct(&req.cuts)),
        AssignMode::Grouped => PowerResponse::Grouped(catalog.assign_grouped(&req.cuts)),
    };

    Ok(Json(response))
}

fn main() {
    let _sentry = sentry::init(sentry::ClientOptions {
        dsn: std::env::var("SENTRY_DSN")
            .ok()
            .and_then(|dsn| dsn.parse().ok()),
        release: sentry::release_name!(),
        ..Default::default()
    });

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open("development.log")
        .expect("failed to open development.log");

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_target(false)
        .with_ansi(false)
        .with_max_level(Level::INFO)
        .init();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to start runtime")
        .block_on(serve());
}

async fn serve() {
    let port = std::env::var("PORT").unwrap_or_else(|_| "3001".to_string());
    let addr = format!("0.0.0.0:{port}");

    let app = Router::new()
        .route("/up", get(|| async { "ok" }))
        .route("/optimize", post(optimize))
        .route("/power", post(power))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    eprintln!("Listening on {addr}");
    axum::serve(listener, app).await.unwrap();
}
