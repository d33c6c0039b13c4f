use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::state::ApiState;
use crate::survey::languages::{self, Language};
use crate::survey::models::Platform;
use crate::survey::view::View;

#[derive(Deserialize)]
pub struct LanguageQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Serialize)]
pub struct LanguageListResponse {
    pub languages: Vec<Language>,
}

#[derive(Deserialize)]
pub struct PlatformRequest {
    pub platform: Platform,
}

#[derive(Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub term: String,
}

#[derive(Deserialize)]
pub struct LanguageRequest {
    pub code: String,
}

#[derive(Deserialize)]
pub struct TextRequest {
    #[serde(default)]
    pub text: String,
}

/// GET /api/v1/survey
pub async fn handle_get_view(State(state): State<ApiState>) -> Json<View> {
    Json(state.survey.view().await)
}

/// GET /api/v1/languages?q=
pub async fn handle_list_languages(Query(params): Query<LanguageQuery>) -> Json<LanguageListResponse> {
    Json(LanguageListResponse {
        languages: languages::filter(&params.q),
    })
}

/// POST /api/v1/survey/platform
pub async fn handle_select_platform(
    State(state): State<ApiState>,
    Json(req): Json<PlatformRequest>,
) -> Result<Json<View>, AppError> {
    Ok(Json(state.survey.select_platform(req.platform).await?))
}

/// POST /api/v1/survey/back
pub async fn handle_back(State(state): State<ApiState>) -> Result<Json<View>, AppError> {
    Ok(Json(state.survey.back().await?))
}

/// POST /api/v1/survey/search
pub async fn handle_search(
    State(state): State<ApiState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<View>, AppError> {
    Ok(Json(state.survey.set_search_term(&req.term).await?))
}

/// POST /api/v1/survey/language
pub async fn handle_select_language(
    State(state): State<ApiState>,
    Json(req): Json<LanguageRequest>,
) -> Result<Json<View>, AppError> {
    Ok(Json(state.survey.select_language(&req.code).await?))
}

/// POST /api/v1/survey/start
pub async fn handle_start(State(state): State<ApiState>) -> Result<Json<View>, AppError> {
    Ok(Json(state.survey.start().await?))
}

/// PUT /api/v1/survey/draft
pub async fn handle_set_draft(
    State(state): State<ApiState>,
    Json(req): Json<TextRequest>,
) -> Result<Json<View>, AppError> {
    Ok(Json(state.survey.set_draft(&req.text).await?))
}

/// POST /api/v1/survey/answer
pub async fn handle_answer(
    State(state): State<ApiState>,
    Json(req): Json<TextRequest>,
) -> Result<Json<View>, AppError> {
    Ok(Json(state.survey.answer(&req.text).await?))
}

/// POST /api/v1/survey/report
pub async fn handle_generate_report(State(state): State<ApiState>) -> Result<Json<View>, AppError> {
    Ok(Json(state.survey.generate_report().await?))
}

/// POST /api/v1/survey/report/load
pub async fn handle_load_report(State(state): State<ApiState>) -> Result<Json<View>, AppError> {
    Ok(Json(state.survey.load_saved_report().await?))
}

/// POST /api/v1/survey/reset
pub async fn handle_reset(State(state): State<ApiState>) -> Json<View> {
    Json(state.survey.reset().await)
}
