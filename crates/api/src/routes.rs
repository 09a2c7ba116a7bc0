use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use dispatch::{DecisionResult, Diagnostics};
use market_sim::{
    find_preset, scenario_presets, Controls, ControlsPatch, ForecastPoint, IntervalGranularity,
    PnlBuckets, ScenarioPreset, SCARCITY_WINDOW,
};
use serde::Serialize;

use crate::{
    error::ApiError,
    state::{AppState, RuntimeEvent},
    ws,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/runs", post(start_run))
        .route("/step", post(step_once))
        .route("/decision", get(current_decision))
        .route("/controls", get(current_controls).patch(update_controls))
        .route("/series", get(series))
        .route("/pnl", get(pnl))
        .route("/presets", get(list_presets))
        .route("/presets/:id", post(apply_preset))
        .route("/ws/events", get(ws::events_socket))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct StartRunResponse {
    run_id: u64,
}

#[derive(Debug, Serialize)]
struct DecisionResponse {
    step: usize,
    time: String,
    decision: DecisionResult,
    diagnostics: Diagnostics,
}

#[derive(Debug, Serialize)]
struct SeriesResponse {
    granularity: IntervalGranularity,
    current_step: usize,
    average_rt: f64,
    scarcity_window: Option<(f64, f64)>,
    points: Vec<ForecastPoint>,
}

#[derive(Debug, Serialize)]
struct PnlResponse {
    #[serde(flatten)]
    buckets: PnlBuckets,
    total: f64,
}

#[derive(Debug, Serialize)]
struct PresetAppliedResponse {
    preset_id: &'static str,
    controls: Controls,
}

async fn start_run(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let run_id = state.start_run()?;
    state.engine().lock().await.reset();
    state.publish_event(RuntimeEvent::run_started(run_id));
    tracing::info!(run_id, "run started");

    let location = format!("/runs/{run_id}");
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(StartRunResponse { run_id }),
    ))
}

/// Advances one interval by hand; the response mirrors the `tick` event.
async fn step_once(State(state): State<AppState>) -> Json<RuntimeEvent> {
    let outcome = state.engine().lock().await.step_once().await;
    let event = RuntimeEvent::tick(&outcome);
    state.publish_event(event.clone());

    Json(event)
}

async fn current_decision(State(state): State<AppState>) -> Json<DecisionResponse> {
    let engine = state.engine().lock().await;
    let session = engine.session();
    let decision = session.decision();
    let diagnostics = session.diagnostics(&decision);
    let time = session
        .prices()
        .get(session.current_step())
        .map(|point| point.time.clone())
        .unwrap_or_default();

    Json(DecisionResponse {
        step: session.current_step(),
        time,
        decision,
        diagnostics,
    })
}

async fn current_controls(State(state): State<AppState>) -> Json<Controls> {
    let engine = state.engine().lock().await;
    Json(engine.session().controls().clone())
}

async fn update_controls(
    State(state): State<AppState>,
    body: Result<Json<ControlsPatch>, JsonRejection>,
) -> Result<Json<Controls>, ApiError> {
    let Json(patch) = body.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    let controls = {
        let mut engine = state.engine().lock().await;
        engine.update_controls(&patch);
        engine.session().controls().clone()
    };
    state.publish_event(RuntimeEvent::controls_updated(controls.clone()));

    Ok(Json(controls))
}

async fn series(State(state): State<AppState>) -> Json<SeriesResponse> {
    let engine = state.engine().lock().await;
    let session = engine.session();
    let controls = session.controls();

    Json(SeriesResponse {
        granularity: controls.granularity,
        current_step: session.current_step(),
        average_rt: session.average_rt(),
        scarcity_window: controls.show_scarcity_window.then_some(SCARCITY_WINDOW),
        points: session.forecast().to_vec(),
    })
}

async fn pnl(State(state): State<AppState>) -> Json<PnlResponse> {
    let engine = state.engine().lock().await;
    let buckets = *engine.session().pnl();

    Json(PnlResponse {
        buckets,
        total: buckets.total(),
    })
}

async fn list_presets() -> Json<Vec<ScenarioPreset>> {
    Json(scenario_presets())
}

async fn apply_preset(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PresetAppliedResponse>, ApiError> {
    let preset = find_preset(&id).ok_or(ApiError::UnknownPreset(id))?;

    let controls = {
        let mut engine = state.engine().lock().await;
        engine.apply_preset(&preset);
        engine.session().controls().clone()
    };
    state.publish_event(RuntimeEvent::preset_applied(preset.id));

    Ok(Json(PresetAppliedResponse {
        preset_id: preset.id,
        controls,
    }))
}
