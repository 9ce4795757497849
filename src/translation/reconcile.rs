use log::debug;

/// Try to restore the unit count of a provider reply
///
/// When the reply is short by `d` units and its first unit splits on
/// whitespace into exactly `d + 1` tokens, those tokens replace the first
/// unit. Any other shape is returned untouched; the caller checks the count.
pub fn reconcile_unit_count(source_count: usize, mut translated: Vec<String>) -> Vec<String> {
    if translated.is_empty() || translated.len() >= source_count {
        return translated;
    }

    let missing = source_count - translated.len();
    let tokens: Vec<String> = translated[0].split_whitespace().map(str::to_string).collect();

    if tokens.len() == missing + 1 {
        debug!("Split merged first unit into {} units", tokens.len());
        translated.splice(0..1, tokens);
    }

    translated
}
