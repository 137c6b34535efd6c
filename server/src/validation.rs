use crate::error::ApiError;

/// Maximum input length, in characters
const MAX_TEXT_LENGTH: usize = 5000;

/// Validate a submitted translation form.
pub fn validate_translation_request(text: &str, target_lang: &str) -> Result<(), ApiError> {
    if text.trim().is_empty() {
        return Err(ApiError::InvalidInput("Text cannot be empty".to_string()));
    }
    if text.chars().count() > MAX_TEXT_LENGTH {
        return Err(ApiError::InvalidInput(format!(
            "Text too long (max {} characters)",
            MAX_TEXT_LENGTH
        )));
    }

    if !is_valid_language_code(target_lang) {
        return Err(ApiError::InvalidInput(format!(
            "Invalid target language: {}. Expected a language code such as fr or de",
            target_lang
        )));
    }

    Ok(())
}

/// Reject a pair that would need an identity model.
pub fn validate_language_pair(detected: &str, target: &str) -> Result<(), ApiError> {
    if detected == target {
        return Err(ApiError::InvalidInput(format!(
            "Text is already in the target language ({target})"
        )));
    }
    Ok(())
}

/// ISO 639 code: 2 or 3 lowercase ASCII letters
fn is_valid_language_code(code: &str) -> bool {
    (2..=3).contains(&code.len()) && code.chars().all(|c| c.is_ascii_lowercase())
}
