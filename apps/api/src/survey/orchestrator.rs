//! Survey Orchestrator — owns the survey state machine.
//!
//! Flow: loading → (welcome-back | platform-select) → language-select →
//!       survey-running → survey-complete → report-generating → report-view,
//!       with reset returning to platform-select from anywhere.
//!
//! LLM-backed transitions are split in two halves so the model call can run
//! without holding the orchestrator:
//! - `begin_*` validates the action, applies the synchronous part, claims the
//!   single in-flight slot and returns a `Ticket` carrying the prompt.
//! - `complete_*` applies the outcome, but only if the ticket still owns the
//!   slot and its epoch matches. Reset bumps the epoch, so a reply that lands
//!   after a reset is dropped.

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::llm_client::{strip_json_fences, LlmError, LlmRequest};
use crate::storage::ReportStore;
use crate::survey::languages::{self, Language};
use crate::survey::models::{AppState, Message, Platform, ReportData, SurveyResponse};
use crate::survey::prompts::{self, TOTAL_QUESTIONS};

/// Answers recorded before the current one at which the survey completes.
/// With five questions this is the fifth answer (count 4).
const COMPLETION_THRESHOLD: usize = TOTAL_QUESTIONS - 1;

pub const START_FAILED_NOTICE: &str = "Sorry, I encountered an error. Please try again.";
pub const TURN_FAILED_MESSAGE: &str = "Sorry, an error occurred.";

#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("Cannot {action} while in state '{state}'")]
    InvalidTransition { action: &'static str, state: AppState },

    #[error("A request is already in progress")]
    Busy,

    #[error("Answer cannot be empty")]
    EmptyInput,

    #[error("Unknown language code '{0}'")]
    UnknownLanguage(String),

    #[error("Select a language before starting the survey")]
    NoLanguageSelected,

    #[error("Failed to build prompt: {0}")]
    Prompt(#[from] serde_json::Error),
}

/// Why a structured report reply was rejected.
#[derive(Debug, Error)]
pub enum ReportRejection {
    #[error("LLM call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Report is not valid JSON for the report shape: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Report failed validation: {0}")]
    Schema(String),
}

/// The three places the orchestrator talks to the LLM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallSite {
    Start,
    Turn,
    Report,
}

/// Undo information for an answer whose follow-up call fails.
#[derive(Debug, Clone)]
struct PendingTurn {
    answer: String,
    messages_before: usize,
    responses_before: usize,
}

/// Claim on the in-flight slot, handed back to `complete_*` with the result.
#[derive(Debug)]
pub struct Ticket {
    site: CallSite,
    epoch: u64,
    turn: Option<PendingTurn>,
    pub request: LlmRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Succeeded,
    Failed,
    /// The ticket no longer owns the slot (reset happened meanwhile).
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    /// Snapshot was missing or corrupt; the orchestrator was reset instead.
    Reset,
}

pub struct Orchestrator {
    state: AppState,
    platform: Platform,
    language: Option<Language>,
    search_term: String,
    draft: String,
    messages: Vec<Message>,
    responses: Vec<SurveyResponse>,
    report: Option<ReportData>,
    notice: Option<String>,
    in_flight: Option<CallSite>,
    epoch: u64,
    store: ReportStore,
}

impl Orchestrator {
    pub fn new(store: ReportStore) -> Self {
        Self {
            state: AppState::Loading,
            platform: Platform::default(),
            language: None,
            search_term: String::new(),
            draft: String::new(),
            messages: Vec::new(),
            responses: Vec::new(),
            report: None,
            notice: None,
            in_flight: None,
            epoch: 0,
            store,
        }
    }

    // ────────────────────────────────────────────────────────────────────────
    // Accessors
    // ────────────────────────────────────────────────────────────────────────

    pub fn state(&self) -> AppState {
        self.state
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn language(&self) -> Option<Language> {
        self.language
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn responses(&self) -> &[SurveyResponse] {
        &self.responses
    }

    pub fn report(&self) -> Option<&ReportData> {
        self.report.as_ref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    // ────────────────────────────────────────────────────────────────────────
    // Synchronous transitions
    // ────────────────────────────────────────────────────────────────────────

    /// loading → welcome-back | platform-select. A storage failure reads as
    /// "nothing saved".
    pub fn initialize(&mut self) {
        if self.state != AppState::Loading {
            debug!("initialize called in state {}, ignoring", self.state);
            return;
        }
        self.state = if self.store.has_saved_report() {
            AppState::WelcomeBack
        } else {
            AppState::PlatformSelect
        };
        info!("Survey initialized in state {}", self.state);
    }

    pub fn select_platform(&mut self, platform: Platform) -> Result<(), TransitionError> {
        self.expect_state(AppState::PlatformSelect, "select a platform")?;
        self.platform = platform;
        self.state = AppState::LanguageSelect;
        info!("Platform selected: {:?}", platform);
        Ok(())
    }

    /// language-select → platform-select. Keeps the language and search term.
    pub fn back(&mut self) -> Result<(), TransitionError> {
        self.expect_state(AppState::LanguageSelect, "go back")?;
        self.ensure_idle()?;
        self.state = AppState::PlatformSelect;
        Ok(())
    }

    pub fn set_search_term(&mut self, term: &str) -> Result<(), TransitionError> {
        self.expect_state(AppState::LanguageSelect, "search languages")?;
        self.ensure_idle()?;
        self.search_term = term.to_string();
        Ok(())
    }

    /// Pure selection; does not change state.
    pub fn select_language(&mut self, code: &str) -> Result<(), TransitionError> {
        self.expect_state(AppState::LanguageSelect, "select a language")?;
        self.ensure_idle()?;
        let language =
            languages::find(code).ok_or_else(|| TransitionError::UnknownLanguage(code.to_string()))?;
        self.language = Some(language);
        Ok(())
    }

    pub fn set_draft(&mut self, text: &str) -> Result<(), TransitionError> {
        self.expect_state(AppState::SurveyRunning, "edit the answer")?;
        self.ensure_idle()?;
        self.draft = text.to_string();
        Ok(())
    }

    /// welcome-back → report-view, or a full reset when the snapshot is
    /// missing, unparsable or fails validation.
    pub fn load_saved_report(&mut self) -> Result<LoadOutcome, TransitionError> {
        self.expect_state(AppState::WelcomeBack, "load the saved report")?;

        let snapshot = self
            .store
            .load()
            .filter(|(report, _)| match validate_report(report) {
                Ok(()) => true,
                Err(reason) => {
                    warn!("Saved report rejected: {reason}");
                    false
                }
            });

        match snapshot {
            Some((report, responses)) => {
                self.report = Some(report);
                self.responses = responses;
                self.state = AppState::ReportView;
                info!("Loaded saved report ({} responses)", self.responses.len());
                Ok(LoadOutcome::Loaded)
            }
            None => {
                warn!("Saved report unavailable or corrupt, starting over");
                self.reset();
                Ok(LoadOutcome::Reset)
            }
        }
    }

    /// any → platform-select. Clears the saved snapshot and every piece of run
    /// state, and invalidates outstanding tickets. Idempotent.
    pub fn reset(&mut self) {
        self.store.clear();
        self.report = None;
        self.responses.clear();
        self.messages.clear();
        self.language = None;
        self.draft.clear();
        self.search_term.clear();
        self.notice = None;
        if self.in_flight.take().is_some() {
            debug!("Reset discarded an in-flight request");
        }
        self.epoch += 1;
        self.state = AppState::PlatformSelect;
        info!("Survey reset (epoch {})", self.epoch);
    }

    // ────────────────────────────────────────────────────────────────────────
    // Start survey
    // ────────────────────────────────────────────────────────────────────────

    pub fn begin_start(&mut self) -> Result<Ticket, TransitionError> {
        self.expect_state(AppState::LanguageSelect, "start the survey")?;
        self.ensure_idle()?;
        let language = self.language.ok_or(TransitionError::NoLanguageSelected)?;

        self.notice = None;
        info!("Starting survey in {}", language.code);
        Ok(self.claim(CallSite::Start, None, prompts::start_request(language.code)))
    }

    /// Success: first bot message, → survey-running. Failure: stay on
    /// language-select with a notice.
    pub fn complete_start(&mut self, ticket: Ticket, result: Result<String, LlmError>) -> Completion {
        if !self.release(&ticket, CallSite::Start) {
            return Completion::Stale;
        }

        match result {
            Ok(text) => {
                self.messages = vec![Message::bot(text)];
                self.state = AppState::SurveyRunning;
                info!("Survey started");
                Completion::Succeeded
            }
            Err(e) => {
                error!("Error starting survey: {e}");
                self.notice = Some(START_FAILED_NOTICE.to_string());
                Completion::Failed
            }
        }
    }

    // ────────────────────────────────────────────────────────────────────────
    // Answer
    // ────────────────────────────────────────────────────────────────────────

    /// Records the answer against the last bot reply and prepares the
    /// follow-up prompt.
    pub fn begin_answer(&mut self, input: &str) -> Result<Ticket, TransitionError> {
        self.expect_state(AppState::SurveyRunning, "answer")?;
        self.ensure_idle()?;
        if input.trim().is_empty() {
            return Err(TransitionError::EmptyInput);
        }
        let language = self.language.ok_or(TransitionError::NoLanguageSelected)?;

        let pending = PendingTurn {
            answer: input.to_string(),
            messages_before: self.messages.len(),
            responses_before: self.responses.len(),
        };

        let question = self
            .messages
            .iter()
            .rev()
            .find(|m| m.is_bot_reply())
            .map(|m| m.text.clone())
            .unwrap_or_default();
        if question.is_empty() {
            warn!("Answer recorded without a preceding bot question");
        }

        self.messages.push(Message::user(input));
        self.responses.push(SurveyResponse {
            question,
            answer: input.to_string(),
        });
        self.draft.clear();

        let questions_asked = pending.responses_before;
        let transcript = prompts::transcript(&self.messages);
        let request = prompts::turn_request(language.code, &transcript, questions_asked);

        debug!("Answer {} recorded, requesting next question", questions_asked + 1);
        Ok(self.claim(CallSite::Turn, Some(pending), request))
    }

    /// Success: append the reply and complete after the fifth answer.
    /// Failure: roll the turn back, show an error bubble, restore the draft.
    pub fn complete_answer(&mut self, ticket: Ticket, result: Result<String, LlmError>) -> Completion {
        if !self.release(&ticket, CallSite::Turn) {
            return Completion::Stale;
        }
        let Some(pending) = ticket.turn else {
            error!("Turn ticket without pending answer");
            return Completion::Failed;
        };

        match result {
            Ok(text) => {
                self.messages.push(Message::bot(text));
                if pending.responses_before >= COMPLETION_THRESHOLD {
                    self.state = AppState::SurveyComplete;
                    info!("Survey complete with {} responses", self.responses.len());
                }
                Completion::Succeeded
            }
            Err(e) => {
                error!("Error sending message: {e}");
                self.messages.truncate(pending.messages_before);
                self.responses.truncate(pending.responses_before);
                self.messages.push(Message::bot_error(TURN_FAILED_MESSAGE));
                self.draft = pending.answer;
                Completion::Failed
            }
        }
    }

    // ────────────────────────────────────────────────────────────────────────
    // Report generation
    // ────────────────────────────────────────────────────────────────────────

    /// survey-complete → report-generating.
    pub fn begin_report(&mut self) -> Result<Ticket, TransitionError> {
        self.expect_state(AppState::SurveyComplete, "generate the report")?;
        self.ensure_idle()?;
        let language = self.language.ok_or(TransitionError::NoLanguageSelected)?;

        let request = prompts::report_request(language.code, &self.responses)?;
        self.state = AppState::ReportGenerating;
        info!("Generating report from {} responses", self.responses.len());
        Ok(self.claim(CallSite::Report, None, request))
    }

    /// Success: persist best-effort, → report-view. Any failure (transport,
    /// bad JSON, shape mismatch): → survey-complete with responses intact.
    pub fn complete_report(&mut self, ticket: Ticket, result: Result<String, LlmError>) -> Completion {
        if !self.release(&ticket, CallSite::Report) {
            return Completion::Stale;
        }

        match result.map_err(ReportRejection::from).and_then(|t| parse_report(&t)) {
            Ok(report) => {
                self.store.save(&report, &self.responses);
                self.report = Some(report);
                self.state = AppState::ReportView;
                info!("Report generated");
                Completion::Succeeded
            }
            Err(e) => {
                error!("Error generating report: {e}");
                self.state = AppState::SurveyComplete;
                Completion::Failed
            }
        }
    }

    // ────────────────────────────────────────────────────────────────────────
    // Helpers
    // ────────────────────────────────────────────────────────────────────────

    fn expect_state(&self, expected: AppState, action: &'static str) -> Result<(), TransitionError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(TransitionError::InvalidTransition {
                action,
                state: self.state,
            })
        }
    }

    fn ensure_idle(&self) -> Result<(), TransitionError> {
        if self.is_busy() {
            Err(TransitionError::Busy)
        } else {
            Ok(())
        }
    }

    fn claim(&mut self, site: CallSite, turn: Option<PendingTurn>, request: LlmRequest) -> Ticket {
        self.in_flight = Some(site);
        Ticket {
            site,
            epoch: self.epoch,
            turn,
            request,
        }
    }

    /// Frees the slot if `ticket` still owns it. False means stale.
    fn release(&mut self, ticket: &Ticket, site: CallSite) -> bool {
        if ticket.epoch != self.epoch || ticket.site != site || self.in_flight != Some(site) {
            debug!(
                "Discarding stale {:?} completion (ticket epoch {}, current {})",
                ticket.site, ticket.epoch, self.epoch
            );
            return false;
        }
        self.in_flight = None;
        true
    }
}

/// Parses and validates a structured report reply.
pub fn parse_report(text: &str) -> Result<ReportData, ReportRejection> {
    let report: ReportData = serde_json::from_str(strip_json_fences(text))?;
    validate_report(&report).map_err(ReportRejection::Schema)?;
    Ok(report)
}

/// Shape checks serde cannot express.
pub fn validate_report(report: &ReportData) -> Result<(), String> {
    if report.title.trim().is_empty() {
        return Err("title is empty".to_string());
    }
    let chart = &report.chart_data;
    if chart.labels.len() != chart.values.len() {
        return Err(format!(
            "chartData has {} labels but {} values",
            chart.labels.len(),
            chart.values.len()
        ));
    }
    Ok(())
}
