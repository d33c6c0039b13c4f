//! Read-only projections of the orchestrator, one per state. Serialized as
//! JSON tagged by `state`.

use serde::Serialize;

use crate::report::document::ReportDocument;
use crate::survey::languages::{self, Language};
use crate::survey::models::{AppState, Message, Platform};
use crate::survey::orchestrator::Orchestrator;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformOption {
    pub id: Platform,
    pub label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatHeader {
    pub title: &'static str,
    pub status: &'static str,
}

impl ChatHeader {
    /// The web theme has no header bar.
    pub fn for_platform(platform: Platform) -> Option<Self> {
        match platform {
            Platform::Web => None,
            Platform::Whatsapp => Some(Self {
                title: "Goals Assistant",
                status: "online",
            }),
            Platform::Telegram => Some(Self {
                title: "Goals Assistant Bot",
                status: "bot",
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatView {
    pub theme: Platform,
    pub header: Option<ChatHeader>,
    pub language: Option<Language>,
    pub messages: Vec<Message>,
    pub questions_answered: usize,
    pub busy: bool,
    pub input_enabled: bool,
    pub draft: String,
    pub can_generate_report: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum View {
    Loading,
    WelcomeBack,
    PlatformSelect {
        platforms: Vec<PlatformOption>,
        selected: Platform,
    },
    LanguageSelect {
        platform: Platform,
        search_term: String,
        languages: Vec<Language>,
        selected: Option<Language>,
        can_start: bool,
        busy: bool,
        notice: Option<String>,
    },
    SurveyRunning(ChatView),
    SurveyComplete(ChatView),
    ReportGenerating {
        responses: usize,
    },
    ReportView {
        document: Option<ReportDocument>,
        chart_available: bool,
    },
}

impl View {
    pub fn of(orchestrator: &Orchestrator, chart_available: bool) -> Self {
        let busy = orchestrator.is_busy();
        match orchestrator.state() {
            AppState::Loading => View::Loading,
            AppState::WelcomeBack => View::WelcomeBack,
            AppState::PlatformSelect => View::PlatformSelect {
                platforms: Platform::ALL
                    .iter()
                    .map(|p| PlatformOption {
                        id: *p,
                        label: p.label(),
                    })
                    .collect(),
                selected: orchestrator.platform(),
            },
            AppState::LanguageSelect => View::LanguageSelect {
                platform: orchestrator.platform(),
                search_term: orchestrator.search_term().to_string(),
                languages: languages::filter(orchestrator.search_term()),
                selected: orchestrator.language(),
                can_start: orchestrator.language().is_some() && !busy,
                busy,
                notice: orchestrator.notice().map(str::to_string),
            },
            AppState::SurveyRunning => View::SurveyRunning(chat_view(orchestrator)),
            AppState::SurveyComplete => View::SurveyComplete(chat_view(orchestrator)),
            AppState::ReportGenerating => View::ReportGenerating {
                responses: orchestrator.responses().len(),
            },
            AppState::ReportView => View::ReportView {
                document: orchestrator.report().map(ReportDocument::build),
                chart_available,
            },
        }
    }
}

fn chat_view(orchestrator: &Orchestrator) -> ChatView {
    let busy = orchestrator.is_busy();
    let state = orchestrator.state();
    ChatView {
        theme: orchestrator.platform(),
        header: ChatHeader::for_platform(orchestrator.platform()),
        language: orchestrator.language(),
        messages: orchestrator.messages().to_vec(),
        questions_answered: orchestrator.responses().len(),
        busy,
        input_enabled: state == AppState::SurveyRunning && !busy,
        draft: orchestrator.draft().to_string(),
        can_generate_report: state == AppState::SurveyComplete && !busy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, ReportStore};

    fn orchestrator() -> Orchestrator {
        let mut o = Orchestrator::new(ReportStore::new(Box::new(MemoryStore::new())));
        o.initialize();
        o
    }

    #[test]
    fn test_view_is_tagged_by_state() {
        let json = serde_json::to_value(View::of(&orchestrator(), false)).unwrap();
        assert_eq!(json["state"], "platform-select");
        assert_eq!(json["platforms"].as_array().unwrap().len(), 3);
        assert_eq!(json["platforms"][1]["id"], "whatsapp");
        assert_eq!(json["selected"], "web");
    }

    #[test]
    fn test_language_select_filters_by_search_term() {
        let mut o = orchestrator();
        o.select_platform(Platform::Web).unwrap();
        o.set_search_term("fra").unwrap();

        let View::LanguageSelect {
            languages,
            can_start,
            ..
        } = View::of(&o, false)
        else {
            panic!("expected language-select");
        };
        assert_eq!(languages.len(), 1);
        assert_eq!(languages[0].code, "French");
        assert!(!can_start);

        o.select_language("French").unwrap();
        let View::LanguageSelect { can_start, .. } = View::of(&o, false) else {
            panic!("expected language-select");
        };
        assert!(can_start);
    }

    #[test]
    fn test_busy_start_disables_start_button() {
        let mut o = orchestrator();
        o.select_platform(Platform::Web).unwrap();
        o.select_language("German").unwrap();
        let _ticket = o.begin_start().unwrap();

        let json = serde_json::to_value(View::of(&o, false)).unwrap();
        assert_eq!(json["busy"], true);
        assert_eq!(json["can_start"], false);
    }

    #[test]
    fn test_chat_view_flattens_into_tagged_object() {
        let mut o = orchestrator();
        o.select_platform(Platform::Whatsapp).unwrap();
        o.select_language("Spanish").unwrap();
        let ticket = o.begin_start().unwrap();
        o.complete_start(ticket, Ok("¿Cuál es tu meta?".to_string()));

        let json = serde_json::to_value(View::of(&o, false)).unwrap();
        assert_eq!(json["state"], "survey-running");
        assert_eq!(json["theme"], "whatsapp");
        assert_eq!(json["header"]["title"], "Goals Assistant");
        assert_eq!(json["header"]["status"], "online");
        assert_eq!(json["input_enabled"], true);
        assert_eq!(json["can_generate_report"], false);
        assert_eq!(json["messages"][0]["sender"], "bot");
    }

    #[test]
    fn test_headers_per_platform() {
        assert!(ChatHeader::for_platform(Platform::Web).is_none());
        assert_eq!(
            ChatHeader::for_platform(Platform::Telegram).unwrap().title,
            "Goals Assistant Bot"
        );
    }
}
