//! Validation helpers for DTOs.

use validator::ValidationError;

/// Validates that a submitted display name carries visible characters.
///
/// # Examples
///
/// ```ignore
/// validate_display_name("Ada")     // Ok
/// validate_display_name("  Ada ")  // Ok - trimmed later
/// validate_display_name("   ")     // Err - blank
/// ```
pub fn validate_display_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("display_name_blank");
        err.message = Some("Display name must not be blank".into());
        return Err(err);
    }

    if name.chars().count() > 64 {
        let mut err = ValidationError::new("display_name_length");
        err.message = Some(
            format!(
                "Display name must be at most 64 characters (got {})",
                name.chars().count()
            )
            .into(),
        );
        return Err(err);
    }

    Ok(())
}

/// Validates a question identifier: non-blank, short, path-safe (no
/// slashes, since the id becomes a tree path segment).
pub fn validate_question_id(id: &str) -> Result<(), ValidationError> {
    if id.trim().is_empty() {
        let mut err = ValidationError::new("question_id_blank");
        err.message = Some("Question id must not be blank".into());
        return Err(err);
    }

    if id.contains('/') {
        let mut err = ValidationError::new("question_id_format");
        err.message = Some("Question id must not contain `/`".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_display_name_valid() {
        assert!(validate_display_name("Ada").is_ok());
        assert!(validate_display_name("  Zinedine ").is_ok());
        assert!(validate_display_name("A").is_ok());
    }

    #[test]
    fn test_validate_display_name_blank() {
        assert!(validate_display_name("").is_err());
        assert!(validate_display_name("   ").is_err());
        assert!(validate_display_name("\t\n").is_err());
    }

    #[test]
    fn test_validate_display_name_too_long() {
        let long = "x".repeat(65);
        assert!(validate_display_name(&long).is_err());
        let max = "x".repeat(64);
        assert!(validate_display_name(&max).is_ok());
    }

    #[test]
    fn test_validate_question_id() {
        assert!(validate_question_id("q1").is_ok());
        assert!(validate_question_id("").is_err());
        assert!(validate_question_id("  ").is_err());
        assert!(validate_question_id("a/b").is_err());
    }
}
