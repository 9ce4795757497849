//! Indexed-list prompt and response handling shared by chat providers.

use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;
use crate::language_utils::LanguageCode;

#[derive(Debug, Serialize, Deserialize)]
struct IndexedText {
    index: usize,
    text: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexedTexts {
    texts: Vec<IndexedText>,
}

/// Instruction sent alongside the payload
pub const SYSTEM_PROMPT: &str = "You are a professional movie subtitle translator. You answer with a single valid JSON object and nothing else.";

/// Build the user prompt carrying the units as `{"texts":[{"index","text"}]}`
pub fn build_prompt(units: &[String], target: &LanguageCode) -> Result<String, ProviderError> {
    let payload = IndexedTexts {
        texts: units
            .iter()
            .enumerate()
            .map(|(index, text)| IndexedText {
                index,
                text: text.clone(),
            })
            .collect(),
    };
    let payload = serde_json::to_string(&payload).map_err(|e| ProviderError::ParseError(e.to_string()))?;

    let language = target.display_name().unwrap_or_else(|| target.to_string());

    Ok(format!(
        "Translate each subtitle text in the \"texts\" array of the following JSON object into {language} ({code}).\n\n\
         The output must be a JSON object with the same structure as the input. The \"texts\" array must contain \
         the translated texts under their original indices.\n\n\
         Strict requirements:\n\
         - Preserve line breaks and formatting inside each text.\n\
         - Do not combine or split texts.\n\
         - The output array must have exactly {count} elements.\n\n\
         Input:\n{payload}\n",
        language = language,
        code = target,
        count = units.len(),
        payload = payload,
    ))
}

/// Parse a model reply into units ordered by index
///
/// Accepts the object form or a bare array, optionally wrapped in a
/// markdown code fence.
pub fn parse_indexed_units(content: &str) -> Result<Vec<String>, ProviderError> {
    let json = strip_code_fence(content);

    let mut texts = match serde_json::from_str::<IndexedTexts>(json) {
        Ok(parsed) => parsed.texts,
        Err(object_err) => serde_json::from_str::<Vec<IndexedText>>(json).map_err(|_| {
            ProviderError::ParseError(format!("Reply is not an indexed text list: {}", object_err))
        })?,
    };

    texts.sort_by_key(|t| t.index);
    Ok(texts.into_iter().map(|t| t.text).collect())
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag line, then the closing fence
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
    body.trim_end().trim_end_matches("```").trim()
}
