//! Common validation rules shared across request payloads.

use validator::ValidationError;

use crate::utils::pin::validate_pin_format;

/// Longest display name accepted from the admin portal.
pub const DISPLAY_NAME_MAX_CHARS: usize = 100;

/// Validates a student display name.
///
/// Requirements:
/// - Not blank after trimming
/// - At most 100 characters
pub fn validate_display_name(display_name: &str) -> Result<(), ValidationError> {
    if display_name.trim().is_empty() {
        return Err(ValidationError::new("display_name_blank"));
    }

    if display_name.chars().count() > DISPLAY_NAME_MAX_CHARS {
        return Err(ValidationError::new("display_name_too_long"));
    }

    Ok(())
}

/// Validates that a PIN matches the six-digit format contract.
pub fn validate_pin(pin: &str) -> Result<(), ValidationError> {
    if validate_pin_format(pin) {
        Ok(())
    } else {
        Err(ValidationError::new("pin_invalid_format"))
    }
}
