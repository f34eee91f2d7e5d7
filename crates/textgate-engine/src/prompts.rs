//! Prompt templates.
//!
//! Centralized so template changes never touch orchestration logic.

/// Instructs the model to produce a fixed-length summary in the given
/// language and nothing else.
pub fn summarize(text: &str, max_sentences: u8, language: &str) -> String {
    format!(
        "You are a professional summarization assistant.\n\
         Summarize the following text in exactly {max_sentences} concise sentence(s). \
         Write the summary in language code '{language}'. \
         Output only the summary text, nothing else.\n\n\
         TEXT:\n{text}\n\nSUMMARY:"
    )
}

pub fn translate(text: &str, source_language: &str, target_language: &str) -> String {
    format!(
        "You are a professional translation assistant.\n\
         Translate the following text from '{source_language}' to '{target_language}'. \
         Output only the translated text, nothing else.\n\n\
         TEXT:\n{text}\n\nTRANSLATION:"
    )
}

/// Asks for a JSON object `{"label": ..., "confidence": ...}` so the
/// output can be parsed mechanically.
pub fn classify(text: &str, categories: &[String]) -> String {
    let category_list = categories
        .iter()
        .map(|c| format!("\"{c}\""))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "You are a text classification assistant.\n\
         Classify the following text into exactly one of these categories: {category_list}.\n\
         Respond with a JSON object only, in this exact format:\n\
         {{\"label\": \"<chosen_category>\", \"confidence\": <0.0-1.0>}}\n\n\
         TEXT:\n{text}\n\nCLASSIFICATION:"
    )
}
