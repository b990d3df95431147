//! Inbound frame validation.

use memberhub_core::AppError;

/// Rejects empty frames and frames larger than `max_bytes`.
pub fn validate_inbound(raw: &str, max_bytes: usize) -> Result<(), AppError> {
    if raw.len() > max_bytes {
        return Err(AppError::validation(format!(
            "Frame exceeds maximum size of {max_bytes} bytes"
        )));
    }

    if raw.trim().is_empty() {
        return Err(AppError::validation("Empty frame"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits() {
        assert!(validate_inbound(r#"{"event":"heartbeat"}"#, 64).is_ok());
        assert!(validate_inbound("   ", 64).is_err());
        assert!(validate_inbound(&"x".repeat(65), 64).is_err());
    }
}
