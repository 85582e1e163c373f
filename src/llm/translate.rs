//! Working-language gate
//!
//! A cheap binary decision (is this English?) made locally. Only text that
//! fails it costs a model round trip.

use crate::core::error::Result;
use crate::llm::{LanguageModel, ANSWER_ONLY_PROMPT};
use tracing::{debug, info};

/// Common English function words; one hit is enough
const ENGLISH_MARKERS: &[&str] = &[
    "the", "an", "of", "to", "and", "or", "for", "from", "with", "on", "is", "are",
    "how", "many", "what", "which", "write", "save", "find", "count", "sort", "into", "each",
    "all", "file", "files", "run", "format", "extract", "list", "this", "that", "by",
];

/// Share of non-ASCII letters above which text is treated as foreign
const NON_ASCII_THRESHOLD: f32 = 0.1;

/// Texts with fewer words than this are never translated
const MIN_WORDS_FOR_DETECTION: usize = 3;

/// Decide whether `text` is already in the working language
pub fn is_working_language(text: &str) -> bool {
    // Paths and addresses say nothing about the language
    let prose: Vec<&str> = text
        .split_whitespace()
        .filter(|token| !token.contains('/') && !token.contains('@'))
        .collect();
    let prose = prose.join(" ");

    let letters: Vec<char> = prose.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.is_empty() {
        return true;
    }

    let non_ascii = letters.iter().filter(|c| !c.is_ascii()).count();
    if non_ascii as f32 / letters.len() as f32 > NON_ASCII_THRESHOLD {
        return false;
    }

    let words: Vec<String> = prose
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect();

    if words.len() < MIN_WORDS_FOR_DETECTION {
        return true;
    }

    words.iter().any(|w| ENGLISH_MARKERS.contains(&w.as_str()))
}

/// Return the task in the working language, translating when needed.
///
/// A provider failure propagates; there is no retry and no partial result.
pub async fn ensure_working_language(model: &dyn LanguageModel, task: &str) -> Result<String> {
    if is_working_language(task) {
        debug!("task already in working language");
        return Ok(task.to_string());
    }

    info!("translating task before classification");
    let prompt = format!(
        "Translate this text to English. Keep file paths, numbers and names exactly as written: {}",
        task
    );
    let translated = model.complete(ANSWER_ONLY_PROMPT, &prompt).await?;
    Ok(translated.trim().to_string())
}
