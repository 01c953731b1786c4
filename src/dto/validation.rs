//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest accepted display name, in characters.
const DISPLAY_NAME_MAX_CHARS: usize = 50;

/// Validates that a display name fits on screen and contains no control
/// characters. An empty or whitespace-only name is accepted here; the
/// coordinator substitutes the default name for those.
pub fn validate_display_name(name: &str) -> Result<(), ValidationError> {
    if name.chars().count() > DISPLAY_NAME_MAX_CHARS {
        let mut err = ValidationError::new("display_name_length");
        err.message = Some(
            format!("Display name must be at most {DISPLAY_NAME_MAX_CHARS} characters").into(),
        );
        return Err(err);
    }

    if name.chars().any(char::is_control) {
        let mut err = ValidationError::new("display_name_format");
        err.message = Some("Display name must not contain control characters".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_display_name_valid() {
        assert!(validate_display_name("Alice").is_ok());
        assert!(validate_display_name("").is_ok());
        assert!(validate_display_name("  ").is_ok());
        assert!(validate_display_name(&"x".repeat(50)).is_ok());
    }

    #[test]
    fn test_validate_display_name_too_long() {
        assert!(validate_display_name(&"x".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_display_name_control_characters() {
        assert!(validate_display_name("Ali\nce").is_err());
        assert!(validate_display_name("Ali\u{0007}ce").is_err());
    }
}
