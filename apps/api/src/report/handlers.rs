use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::errors::AppError;
use crate::report::csv::{to_data_uri, CSV_CONTENT_TYPE, CSV_FILENAME};
use crate::report::pdf::PDF_FILENAME;
use crate::state::ApiState;

fn attachment(filename: &str) -> String {
    format!("attachment; filename=\"{filename}\"")
}

/// GET /api/v1/report/csv
pub async fn handle_csv(State(state): State<ApiState>) -> Result<Response, AppError> {
    let csv = state.survey.csv().await?;
    Ok((
        [
            (header::CONTENT_TYPE, CSV_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, attachment(CSV_FILENAME)),
        ],
        csv,
    )
        .into_response())
}

#[derive(Serialize)]
pub struct DataUriResponse {
    pub filename: &'static str,
    pub uri: String,
}

/// GET /api/v1/report/csv/uri
pub async fn handle_csv_uri(State(state): State<ApiState>) -> Result<Json<DataUriResponse>, AppError> {
    let csv = state.survey.csv().await?;
    Ok(Json(DataUriResponse {
        filename: CSV_FILENAME,
        uri: to_data_uri(&csv),
    }))
}

/// GET /api/v1/report/pdf
pub async fn handle_pdf(State(state): State<ApiState>) -> Result<Response, AppError> {
    let pdf = state.survey.pdf().await?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, attachment(PDF_FILENAME)),
        ],
        pdf,
    )
        .into_response())
}

/// GET /api/v1/report/chart.svg
pub async fn handle_chart_svg(State(state): State<ApiState>) -> Result<Response, AppError> {
    let svg = state
        .survey
        .chart_svg()
        .await
        .ok_or_else(|| AppError::NotFound("No chart for the current report".to_string()))?;
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response())
}
