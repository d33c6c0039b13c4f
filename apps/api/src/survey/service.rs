//! Survey service — the async shell around the orchestrator.
//!
//! Locks are always taken orchestrator first, then renderer. LLM calls run
//! with neither held, between `begin_*` and `complete_*`.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::errors::AppError;
use crate::llm_client::LlmCollaborator;
use crate::report::csv::to_csv;
use crate::report::document::ReportDocument;
use crate::report::pdf::PdfExporter;
use crate::report::{RenderError, ReportRenderer};
use crate::survey::models::{AppState, Platform};
use crate::survey::orchestrator::{Completion, LoadOutcome, Orchestrator, TransitionError};
use crate::survey::view::View;

pub struct SurveyService {
    orchestrator: Mutex<Orchestrator>,
    renderer: Mutex<ReportRenderer>,
    llm: Arc<dyn LlmCollaborator>,
    exporter: PdfExporter,
}

impl SurveyService {
    /// Runs the orchestrator's initial load before taking ownership. A
    /// welcome-back start has no chart until the saved report is loaded.
    pub fn new(
        mut orchestrator: Orchestrator,
        renderer: ReportRenderer,
        llm: Arc<dyn LlmCollaborator>,
        exporter: PdfExporter,
    ) -> Self {
        orchestrator.initialize();
        Self {
            orchestrator: Mutex::new(orchestrator),
            renderer: Mutex::new(renderer),
            llm,
            exporter,
        }
    }

    pub async fn view(&self) -> View {
        let orchestrator = self.orchestrator.lock().await;
        self.view_of(&orchestrator).await
    }

    async fn view_of(&self, orchestrator: &Orchestrator) -> View {
        let chart_available = self.renderer.lock().await.chart_markup().is_some();
        View::of(orchestrator, chart_available)
    }

    // ────────────────────────────────────────────────────────────────────────
    // Synchronous transitions
    // ────────────────────────────────────────────────────────────────────────

    pub async fn select_platform(&self, platform: Platform) -> Result<View, AppError> {
        let mut orchestrator = self.orchestrator.lock().await;
        orchestrator.select_platform(platform)?;
        Ok(self.view_of(&orchestrator).await)
    }

    pub async fn back(&self) -> Result<View, AppError> {
        let mut orchestrator = self.orchestrator.lock().await;
        orchestrator.back()?;
        Ok(self.view_of(&orchestrator).await)
    }

    pub async fn set_search_term(&self, term: &str) -> Result<View, AppError> {
        let mut orchestrator = self.orchestrator.lock().await;
        orchestrator.set_search_term(term)?;
        Ok(self.view_of(&orchestrator).await)
    }

    pub async fn select_language(&self, code: &str) -> Result<View, AppError> {
        let mut orchestrator = self.orchestrator.lock().await;
        orchestrator.select_language(code)?;
        Ok(self.view_of(&orchestrator).await)
    }

    pub async fn set_draft(&self, text: &str) -> Result<View, AppError> {
        let mut orchestrator = self.orchestrator.lock().await;
        orchestrator.set_draft(text)?;
        Ok(self.view_of(&orchestrator).await)
    }

    pub async fn load_saved_report(&self) -> Result<View, AppError> {
        let mut orchestrator = self.orchestrator.lock().await;
        let outcome = orchestrator.load_saved_report()?;
        {
            let mut renderer = self.renderer.lock().await;
            match (outcome, orchestrator.report()) {
                (LoadOutcome::Loaded, Some(report)) => renderer.show(report),
                _ => renderer.clear(),
            }
        }
        Ok(self.view_of(&orchestrator).await)
    }

    pub async fn reset(&self) -> View {
        let mut orchestrator = self.orchestrator.lock().await;
        orchestrator.reset();
        self.renderer.lock().await.clear();
        self.view_of(&orchestrator).await
    }

    // ────────────────────────────────────────────────────────────────────────
    // LLM-backed transitions
    // ────────────────────────────────────────────────────────────────────────

    pub async fn start(&self) -> Result<View, AppError> {
        let ticket = self.orchestrator.lock().await.begin_start()?;
        let result = self.llm.generate(&ticket.request).await;

        let mut orchestrator = self.orchestrator.lock().await;
        let completion = orchestrator.complete_start(ticket, result);
        debug!("Start completed: {:?}", completion);
        Ok(self.view_of(&orchestrator).await)
    }

    pub async fn answer(&self, text: &str) -> Result<View, AppError> {
        let ticket = self.orchestrator.lock().await.begin_answer(text)?;
        let result = self.llm.generate(&ticket.request).await;

        let mut orchestrator = self.orchestrator.lock().await;
        let completion = orchestrator.complete_answer(ticket, result);
        debug!("Answer completed: {:?}", completion);
        Ok(self.view_of(&orchestrator).await)
    }

    pub async fn generate_report(&self) -> Result<View, AppError> {
        let ticket = self.orchestrator.lock().await.begin_report()?;
        let result = self.llm.generate(&ticket.request).await;

        let mut orchestrator = self.orchestrator.lock().await;
        if orchestrator.complete_report(ticket, result) == Completion::Succeeded {
            if let Some(report) = orchestrator.report() {
                self.renderer.lock().await.show(report);
            }
        }
        Ok(self.view_of(&orchestrator).await)
    }

    // ────────────────────────────────────────────────────────────────────────
    // Downloads
    // ────────────────────────────────────────────────────────────────────────

    pub async fn csv(&self) -> Result<String, AppError> {
        let orchestrator = self.orchestrator.lock().await;
        require_report_view(&orchestrator, "download the responses")?;
        Ok(to_csv(orchestrator.responses()))
    }

    /// Rasterizes on the blocking pool; the orchestrator is released first.
    pub async fn pdf(&self) -> Result<Vec<u8>, AppError> {
        let mut document = {
            let orchestrator = self.orchestrator.lock().await;
            require_report_view(&orchestrator, "download the report")?;
            let report = orchestrator
                .report()
                .ok_or_else(|| AppError::NotFound("No report available".to_string()))?;
            ReportDocument::build(report)
        };

        let exporter = self.exporter.clone();
        let bytes = tokio::task::spawn_blocking(move || exporter.export(&mut document))
            .await
            .map_err(|e| RenderError::Task(e.to_string()))??;
        info!("PDF exported ({} bytes)", bytes.len());
        Ok(bytes)
    }

    pub async fn chart_svg(&self) -> Option<String> {
        let renderer = self.renderer.lock().await;
        renderer.chart_markup().map(str::to_string)
    }
}

fn require_report_view(orchestrator: &Orchestrator, action: &'static str) -> Result<(), TransitionError> {
    match orchestrator.state() {
        AppState::ReportView => Ok(()),
        state => Err(TransitionError::InvalidTransition { action, state }),
    }
}
