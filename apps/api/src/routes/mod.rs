pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::errors::AppError;
use crate::report::handlers as report;
use crate::state::ApiState;
use crate::survey::handlers as survey;

async fn configuration_error() -> AppError {
    AppError::Configuration
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Survey flow
        .route("/api/v1/survey", get(survey::handle_get_view))
        .route("/api/v1/languages", get(survey::handle_list_languages))
        .route("/api/v1/survey/platform", post(survey::handle_select_platform))
        .route("/api/v1/survey/back", post(survey::handle_back))
        .route("/api/v1/survey/search", post(survey::handle_search))
        .route("/api/v1/survey/language", post(survey::handle_select_language))
        .route("/api/v1/survey/start", post(survey::handle_start))
        .route("/api/v1/survey/draft", put(survey::handle_set_draft))
        .route("/api/v1/survey/answer", post(survey::handle_answer))
        .route("/api/v1/survey/report", post(survey::handle_generate_report))
        .route("/api/v1/survey/report/load", post(survey::handle_load_report))
        .route("/api/v1/survey/reset", post(survey::handle_reset))
        // Report outputs
        .route("/api/v1/report/csv", get(report::handle_csv))
        .route("/api/v1/report/csv/uri", get(report::handle_csv_uri))
        .route("/api/v1/report/pdf", get(report::handle_pdf))
        .route("/api/v1/report/chart.svg", get(report::handle_chart_svg))
        .with_state(state)
}

/// Used when the API key is missing: only `/health` works, everything else
/// answers `503 CONFIGURATION_ERROR`.
pub fn build_configuration_error_router() -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .fallback(configuration_error)
}
