//! Route handlers

use crate::app::AppState;
use crate::errors::{ServerError, ServerResult};
use axum::{
    extract::{rejection::FormRejection, State},
    http::StatusCode,
    Form, Json,
};
use skirmish_orchestrator::{RunForm, RunResponse};
use tracing::info;

fn read_form(form: Result<Form<RunForm>, FormRejection>) -> ServerResult<RunForm> {
    form.map(|Form(form)| form)
        .map_err(|rejection| ServerError::Validation(rejection.body_text()))
}

/// POST /admin/start
pub async fn admin_start(
    State(state): State<AppState>,
    form: Result<Form<RunForm>, FormRejection>,
) -> ServerResult<Json<RunResponse>> {
    let form = read_form(form)?;
    info!(?form, "Admin start requested");
    Ok(Json(state.coordinator.start(&form).await?))
}

/// POST /admin/stop
pub async fn admin_stop(State(state): State<AppState>) -> Json<RunResponse> {
    Json(state.coordinator.stop().await)
}

/// POST /run
pub async fn run(
    State(state): State<AppState>,
    form: Result<Form<RunForm>, FormRejection>,
) -> ServerResult<Json<RunResponse>> {
    let form = read_form(form)?;
    info!(?form, "Run requested");
    Ok(Json(state.coordinator.run(&form)?))
}

/// POST /stopRun
pub async fn stop_run(State(state): State<AppState>) -> Json<RunResponse> {
    Json(state.coordinator.stop_run())
}

pub async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "404")
}
