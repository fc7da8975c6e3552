use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::booth::session::REQUIRED_KEYWORDS;
use crate::state::AppState;
use crate::themes::types::EraThemes;
use crate::themes::{ThemeScores, WinningThemes};
use crate::utils::timing::start_operation_timer;

#[derive(Debug, Serialize)]
pub struct EraView {
    pub label: String,
    pub themes: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct KeywordsResponse {
    pub keywords: Vec<String>,
    pub required: usize,
    pub past: EraView,
    pub future: EraView,
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    pub themes: WinningThemes,
    pub scores: ThemeScores,
}

pub async fn list_keywords(State(state): State<AppState>) -> Json<KeywordsResponse> {
    let catalog = &state.catalog;
    let era_view = |era: &EraThemes| EraView {
        label: era.label().to_string(),
        themes: era.themes().to_vec(),
    };

    Json(KeywordsResponse {
        keywords: catalog.keywords().map(str::to_string).collect(),
        required: REQUIRED_KEYWORDS,
        past: era_view(catalog.past()),
        future: era_view(catalog.future()),
    })
}

/// Stateless resolve, handy for previewing the vote.
pub async fn resolve_themes(
    State(state): State<AppState>,
    Json(request): Json<ResolveRequest>,
) -> Json<ResolveResponse> {
    let _timer = start_operation_timer("resolve_themes", None);
    let scores = state.catalog.score(&request.keywords);
    let themes = state.catalog.winners(&scores);
    Json(ResolveResponse { themes, scores })
}
