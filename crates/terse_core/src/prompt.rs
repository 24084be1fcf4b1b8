//! Prompt assembly.
//!
//! Pure transformation: a fixed system instruction, the user's question,
//! and an optional evidence blob become a two-role message pair for the
//! engine's chat template renderer. No I/O happens here.

use crate::engine::ChatMessage;

/// Hard output constraints. Single sentence, definitional, no filler, no
/// newlines, no stray punctuation; kept aggressive on purpose so the
/// normalizer has less to repair.
pub const SYSTEM_INSTRUCTION: &str = "You are a course teaching assistant. \
Your output must satisfy all of the following: \
(1) output exactly one sentence; \
(2) the sentence must be a definitional statement; \
(3) never use filler phrases such as \"Sure\", \"Okay\", \"As an AI\", \
\"Based on\", or \"For example\"; \
(4) never output a newline; \
(5) never output extraneous punctuation.";

const EVIDENCE_PREAMBLE: &str =
    "Answer using only the evidence below; do not invent facts.\n";

/// The exact response template the model must follow. The subject doubles
/// as the anchor phrase for post-generation salvage.
pub fn format_directive(subject: Option<&str>) -> String {
    match subject {
        Some(subject) => format!(
            "Answer in exactly this format:\n[Definition] {}: <one-sentence definition>.\n",
            subject
        ),
        None => "Answer in exactly this format:\n[Definition] <term>: <one-sentence definition>.\n"
            .to_string(),
    }
}

/// Build the system/user message pair.
///
/// With evidence: preamble, blob, format directive, question.
/// Without: format directive, question. No evidence framing is emitted
/// for an empty blob.
pub fn build_messages(question: &str, subject: Option<&str>, evidence: &str) -> [ChatMessage; 2] {
    let directive = format_directive(subject);

    let user = if evidence.is_empty() {
        format!("{}Question: {}", directive, question)
    } else {
        format!(
            "{}{}{}Question: {}",
            EVIDENCE_PREAMBLE, evidence, directive, question
        )
    };

    [ChatMessage::system(SYSTEM_INSTRUCTION), ChatMessage::user(user)]
}
