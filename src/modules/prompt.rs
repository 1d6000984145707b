use crate::error::AppError;
use crate::models::Preset;

/// Joins a preset template and the user's detail text
pub const PROMPT_SEPARATOR: &str = ", ";

/// Build the outbound prompt. Only emptiness is validated.
pub fn compose(selected: Option<&Preset>, free_text: &str) -> Result<String, AppError> {
    let prompt = match selected {
        Some(preset) => format!("{}{}{}", preset.template, PROMPT_SEPARATOR, free_text),
        None => free_text.to_string(),
    };

    if prompt.trim().is_empty() {
        return Err(AppError::EmptyPrompt);
    }
    Ok(prompt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::presets;

    #[test]
    fn test_preset_with_empty_text_keeps_separator() {
        let preset = presets::lookup("tropical-resort").unwrap();
        let prompt = compose(Some(preset), "").unwrap();
        assert_eq!(prompt, format!("{}, ", preset.template));
    }

    #[test]
    fn test_free_text_only_is_verbatim() {
        assert_eq!(compose(None, "red door").unwrap(), "red door");
        assert_eq!(compose(None, "  red door ").unwrap(), "  red door ");
    }

    #[test]
    fn test_preset_and_text() {
        let preset = presets::lookup("modern-villa").unwrap();
        let prompt = compose(Some(preset), "two storeys").unwrap();
        assert!(prompt.starts_with(preset.template));
        assert!(prompt.ends_with(", two storeys"));
    }

    #[test]
    fn test_empty_composition_rejected() {
        assert!(matches!(compose(None, ""), Err(AppError::EmptyPrompt)));
        assert!(matches!(compose(None, " \n\t"), Err(AppError::EmptyPrompt)));
    }
}
