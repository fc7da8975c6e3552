use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::booth::error::BoothError;
use crate::booth::flow;
use crate::booth::session::SessionSnapshot;
use crate::state::AppState;
use crate::utils::timing::{start_operation_timer, OperationTimer};

type SnapshotResult = Result<Json<SessionSnapshot>, BoothError>;

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub keyword: String,
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub accepted: bool,
    pub session: SessionSnapshot,
}

#[derive(Debug, Deserialize)]
pub struct KeywordsRequest {
    pub keywords: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImageRequest {
    pub image: String,
}

fn finish<T>(timer: &mut OperationTimer, result: Result<T, BoothError>) -> Result<Json<T>, BoothError> {
    match result {
        Ok(value) => Ok(Json(value)),
        Err(err) => {
            timer.mark_status(err.kind(), Some(err.to_string()));
            Err(err)
        }
    }
}

pub async fn create_session(State(state): State<AppState>) -> Json<SessionSnapshot> {
    let session = state.create_session();
    let _timer = start_operation_timer("create_session", Some(session.id()));
    Json(session.snapshot())
}

pub async fn get_session(State(state): State<AppState>, Path(id): Path<String>) -> SnapshotResult {
    let mut timer = start_operation_timer("get_session", Some(&id));
    finish(&mut timer, flow::current(&state, &id))
}

pub async fn enter(State(state): State<AppState>, Path(id): Path<String>) -> SnapshotResult {
    let mut timer = start_operation_timer("enter", Some(&id));
    let result = state.with_session(&id, |session| {
        session.enter()?;
        Ok(session.snapshot())
    });
    finish(&mut timer, result)
}

pub async fn toggle_keyword(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ToggleRequest>,
) -> Result<Json<ToggleResponse>, BoothError> {
    let mut timer = start_operation_timer("toggle_keyword", Some(&id));
    let result = state.with_session(&id, |session| {
        let accepted = session.toggle_keyword(&state.catalog, &request.keyword)?;
        Ok(ToggleResponse {
            accepted,
            session: session.snapshot(),
        })
    });
    finish(&mut timer, result)
}

pub async fn submit_keywords(State(state): State<AppState>, Path(id): Path<String>) -> SnapshotResult {
    let mut timer = start_operation_timer("submit_keywords", Some(&id));
    let result = state.with_session(&id, |session| {
        session.submit_keywords(&state.catalog)?;
        Ok(session.snapshot())
    });
    finish(&mut timer, result)
}

pub async fn select_keywords(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<KeywordsRequest>,
) -> SnapshotResult {
    let mut timer = start_operation_timer("select_keywords", Some(&id));
    let result = state.with_session(&id, |session| {
        session.select_keywords(&state.catalog, &request.keywords)?;
        Ok(session.snapshot())
    });
    finish(&mut timer, result)
}

pub async fn capture(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ImageRequest>,
) -> SnapshotResult {
    let mut timer = start_operation_timer("capture", Some(&id));
    finish(&mut timer, flow::capture(&state, &id, &request.image))
}

pub async fn retake(State(state): State<AppState>, Path(id): Path<String>) -> SnapshotResult {
    let mut timer = start_operation_timer("retake", Some(&id));
    let result = state.with_session(&id, |session| {
        session.retake()?;
        Ok(session.snapshot())
    });
    finish(&mut timer, result)
}

pub async fn generate(State(state): State<AppState>, Path(id): Path<String>) -> SnapshotResult {
    let mut timer = start_operation_timer("generate", Some(&id));
    let result = flow::generate(&state, &id).await;
    finish(&mut timer, result)
}

pub async fn upload_composite(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ImageRequest>,
) -> SnapshotResult {
    let mut timer = start_operation_timer("upload_composite", Some(&id));
    let result = flow::upload_composite(&state, &id, &request.image).await;
    finish(&mut timer, result)
}

pub async fn go_back(State(state): State<AppState>, Path(id): Path<String>) -> SnapshotResult {
    let mut timer = start_operation_timer("go_back", Some(&id));
    let result = state.with_session(&id, |session| {
        session.go_back()?;
        Ok(session.snapshot())
    });
    finish(&mut timer, result)
}

pub async fn restart(State(state): State<AppState>, Path(id): Path<String>) -> SnapshotResult {
    let mut timer = start_operation_timer("restart", Some(&id));
    finish(&mut timer, flow::restart(&state, &id))
}
