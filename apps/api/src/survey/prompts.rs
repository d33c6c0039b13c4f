// All LLM prompts for the survey.
// Reuses cross-cutting fragments from llm_client::prompts.

use serde_json::json;

use crate::llm_client::prompts::{language_instruction, JSON_ONLY_SYSTEM};
use crate::llm_client::{LlmRequest, OutputSchema};
use crate::survey::models::{Message, MessageKind, SurveyResponse};

/// Total number of questions the assistant asks.
pub const TOTAL_QUESTIONS: usize = 5;

/// The user turn of the opening call. The system instruction carries the real
/// content.
pub const START_USER_TURN: &str = "Please start the survey now.";

pub const REPORT_TOOL_NAME: &str = "submit_report";

const PERSONA: &str = "You are a friendly and helpful 'Personal Needs & Goals Assistant'. \
    Your goal is to understand what the user needs or wants to accomplish.";

fn survey_frame(language_code: &str) -> String {
    format!(
        "{PERSONA} The survey consists of {TOTAL_QUESTIONS} questions. \
        You must ask adaptive questions based on the user's previous answers. {}",
        language_instruction(language_code)
    )
}

/// Opening call: greet and ask the first question.
pub fn start_request(language_code: &str) -> LlmRequest {
    let system = format!(
        "{} Start with a friendly greeting and ask the first question to understand \
        the user's primary goal or need right now.",
        survey_frame(language_code)
    );
    LlmRequest::prose(START_USER_TURN, system)
}

/// Follow-up call. `questions_asked` is the number of answers recorded before
/// the one being sent.
pub fn turn_request(language_code: &str, transcript: &str, questions_asked: usize) -> LlmRequest {
    let system = format!(
        "{} You have asked {questions_asked} questions so far. Based on the conversation \
        history, ask the next relevant question to get more clarity on their needs. \
        If the survey is complete ({TOTAL_QUESTIONS} questions asked), thank the user \
        and tell them you will now summarize their needs.",
        survey_frame(language_code)
    );
    let content = format!("Conversation History:\n{transcript}\n\nAsk the next question.");
    LlmRequest::prose(content, system)
}

/// `sender: text` lines in order. Locally-authored error notices are left
/// out so the model only sees the real exchange.
pub fn transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .filter(|m| m.kind == MessageKind::Reply)
        .map(|m| format!("{}: {}", m.sender.as_str(), m.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Structured call that turns the collected answers into a `ReportData`.
pub fn report_request(
    language_code: &str,
    responses: &[SurveyResponse],
) -> Result<LlmRequest, serde_json::Error> {
    let responses_json = serde_json::to_string_pretty(responses)?;

    let system = format!(
        "You are an analyst who turns survey answers into a personal action plan. \
        The entire report, including every string value in the JSON, must be in \
        {language_code}. {} {JSON_ONLY_SYSTEM}",
        language_instruction(language_code)
    );

    let content = REPORT_PROMPT_TEMPLATE
        .replace("{language}", language_code)
        .replace("{responses_json}", &responses_json);

    Ok(LlmRequest::structured(content, system, report_schema()))
}

const REPORT_PROMPT_TEMPLATE: &str = r#"Analyze the following conversation where a user describes their needs and goals. Generate a personal action plan report based on their responses. The entire report, including all string values in the JSON, must be in {language}.
The report must include:
1. A concise title (e.g., 'Your Personal Action Plan').
2. A one-paragraph summary of their stated needs.
3. A detailed analysis section. This should be an array where each item contains the original question, the user's answer, and a concise insight or analysis of that specific exchange.
4. A brief conclusion with encouragement.
5. Identify any quantifiable data suitable for a simple bar chart (like priority levels, or estimated timeframes). If no clear numerical data is found, provide an empty array for chartData labels and values. labels and values must have the same length.
Conversation responses:
{responses_json}"#;

/// JSON schema of `ReportData`, handed to the model as the tool input schema.
pub fn report_schema() -> OutputSchema {
    OutputSchema {
        name: REPORT_TOOL_NAME.to_string(),
        description: "Submit the personal action plan report.".to_string(),
        schema: json!({
            "type": "object",
            "properties": {
                "title": {"type": "string"},
                "summary": {"type": "string"},
                "detailedAnalysis": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "question": {"type": "string"},
                            "answer": {"type": "string"},
                            "insight": {"type": "string"}
                        },
                        "required": ["question", "answer", "insight"]
                    }
                },
                "conclusion": {"type": "string"},
                "chartData": {
                    "type": "object",
                    "properties": {
                        "title": {"type": "string"},
                        "labels": {"type": "array", "items": {"type": "string"}},
                        "values": {"type": "array", "items": {"type": "number"}}
                    },
                    "required": ["title", "labels", "values"]
                }
            },
            "required": ["title", "summary", "detailedAnalysis", "conclusion", "chartData"]
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_request_pins_language_and_question_count() {
        let req = start_request("Français");
        assert!(req.system.contains("Français"));
        assert!(req.system.contains("5 questions"));
        assert_eq!(req.content, START_USER_TURN);
        assert!(req.schema.is_none());
    }

    #[test]
    fn test_turn_request_carries_count_and_transcript() {
        let req = turn_request("German", "bot: Hi\nuser: Hello", 3);
        assert!(req.system.contains("German"));
        assert!(req.system.contains("asked 3 questions"));
        assert!(req.content.contains("bot: Hi\nuser: Hello"));
    }

    #[test]
    fn test_transcript_skips_error_notices() {
        let messages = vec![
            Message::bot("What is your goal?"),
            Message::user("Run"),
            Message::bot_error("Sorry, an error occurred."),
        ];
        assert_eq!(transcript(&messages), "bot: What is your goal?\nuser: Run");
    }

    #[test]
    fn test_report_request_is_structured() {
        let responses = vec![SurveyResponse {
            question: "Goal?".to_string(),
            answer: "Learn \"Rust\"".to_string(),
        }];
        let req = report_request("Spanish", &responses).unwrap();
        assert!(req.system.contains("Spanish"));
        assert!(req.content.contains("Learn \\\"Rust\\\""));
        let schema = req.schema.expect("structured");
        assert_eq!(schema.name, REPORT_TOOL_NAME);
        assert_eq!(schema.schema["required"].as_array().unwrap().len(), 5);
    }
}
