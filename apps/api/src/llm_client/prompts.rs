// Shared prompt fragments and prompt-building utilities.
// The survey defines its own prompts.rs alongside the orchestrator.
// This file contains cross-cutting prompt fragments.

/// System prompt fragment for structured calls. The forced tool call already
/// constrains the shape; this covers models that answer in a text block.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Language pin included in every system instruction. The language code is
/// embedded verbatim.
pub fn language_instruction(language_code: &str) -> String {
    format!("Your responses must always be in {language_code}.")
}
