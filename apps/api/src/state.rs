use std::sync::Arc;

use crate::survey::service::SurveyService;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct ApiState {
    pub survey: Arc<SurveyService>,
}
