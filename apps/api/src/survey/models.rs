use serde::{Deserialize, Serialize};

/// Chat surface the user picked. Only changes theme and chat header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Web,
    Whatsapp,
    Telegram,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Web, Platform::Whatsapp, Platform::Telegram];

    pub fn label(&self) -> &'static str {
        match self {
            Platform::Web => "Web App",
            Platform::Whatsapp => "WhatsApp",
            Platform::Telegram => "Telegram",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    Bot,
    User,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::Bot => "bot",
            Sender::User => "user",
        }
    }
}

/// Bot messages are either model replies or locally-authored error notices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Reply,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub sender: Sender,
    pub text: String,
    #[serde(default)]
    pub kind: MessageKind,
}

impl Message {
    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Bot,
            text: text.into(),
            kind: MessageKind::Reply,
        }
    }

    pub fn bot_error(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Bot,
            text: text.into(),
            kind: MessageKind::Error,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
            kind: MessageKind::Reply,
        }
    }

    pub fn is_bot_reply(&self) -> bool {
        self.sender == Sender::Bot && self.kind == MessageKind::Reply
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyResponse {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisItem {
    pub question: String,
    pub answer: String,
    pub insight: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub title: String,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl ChartData {
    /// A chart is drawn only when both series carry data.
    pub fn has_data(&self) -> bool {
        !self.labels.is_empty() && !self.values.is_empty()
    }
}

/// The structured report returned by the LLM and persisted as `savedReport`.
///
/// Every field is required: a reply missing any of them fails deserialization
/// and is treated as a generation error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportData {
    pub title: String,
    pub summary: String,
    pub detailed_analysis: Vec<AnalysisItem>,
    pub conclusion: String,
    pub chart_data: ChartData,
}

/// Which view is active. Exactly one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppState {
    Loading,
    WelcomeBack,
    PlatformSelect,
    LanguageSelect,
    SurveyRunning,
    SurveyComplete,
    ReportGenerating,
    ReportView,
}

impl AppState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppState::Loading => "loading",
            AppState::WelcomeBack => "welcome-back",
            AppState::PlatformSelect => "platform-select",
            AppState::LanguageSelect => "language-select",
            AppState::SurveyRunning => "survey-running",
            AppState::SurveyComplete => "survey-complete",
            AppState::ReportGenerating => "report-generating",
            AppState::ReportView => "report-view",
        }
    }
}

impl std::fmt::Display for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
