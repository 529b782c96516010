//! Prompt template for the summarization call.
//!
//! Kept in one place so tests can inspect the exact text sent to the model
//! without a running generation endpoint.

/// Instruction preceding the extracted document text.
pub const SUMMARY_INSTRUCTION: &str = "Please provide a concise summary of the following text:";

/// Build the full prompt for one document.
///
/// The document is fenced between `---` lines so the model can tell the
/// instruction apart from the content, and the prompt ends with `Summary:`
/// to steer the completion.
pub fn summary_prompt(text: &str) -> String {
    format!("{SUMMARY_INSTRUCTION}\n\n---\n\n{text}\n\n---\n\nSummary:")
}
