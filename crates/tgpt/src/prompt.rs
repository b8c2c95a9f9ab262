//! Prompt construction

/// Build the completion prompt for `command`, capped at `word_limit` words.
///
/// The model is asked for a bare JSON object `{"Q": ..., "A": ...}` so the
/// answer can be pulled out with [`crate::completion::parse_answer`].
pub fn build_prompt(command: &str, word_limit: u32) -> String {
    format!(
        "Describe the UNIX manual entry for the command `{command}` in at most \
         {word_limit} words. Reply with a single JSON object that can be parsed \
         strictly, with no text before or after it, of the form \
         {{\"Q\": \"<the question you answered>\", \"A\": \"<your answer>\"}}."
    )
}
