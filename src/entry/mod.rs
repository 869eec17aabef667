pub(crate) mod pinentry;
pub(crate) mod prompt;
pub(crate) mod terminal;

use secrecy::{ExposeSecret, SecretString};

pub use self::pinentry::PinentryEntry;
pub use prompt::{new_pin_prompt, PinPrompt};
pub use terminal::{restore_echo, TerminalEntry};

use crate::config::{PIN_MAX_LEN, PIN_MIN_LEN};

#[derive(Debug, thiserror::Error)]
pub enum EntryError {
    #[error("cannot read from terminal: {0}")]
    Io(#[from] std::io::Error),
    #[error("pinentry: {0}")]
    Pinentry(String),
    #[error("cancelled by operator")]
    Cancelled,
    #[error("PIN must be {min} to {max} characters, got {0}", min = PIN_MIN_LEN, max = PIN_MAX_LEN)]
    InvalidLength(usize),
    #[error("PIN must be ASCII")]
    NonAscii,
    #[error("PINs do not match")]
    Mismatch,
}

/// Where secrets come from.
pub trait SecretSource {
    /// Ask once. No validation.
    fn read_secret(&mut self, prompt: &PinPrompt) -> Result<SecretString, EntryError>;
}

/// Ask for a new PIN twice, check the length bound and that both entries match.
pub fn collect_new_pin(source: &mut dyn SecretSource) -> Result<SecretString, EntryError> {
    let (entry, confirm) = new_pin_prompt();
    let pin = source.read_secret(&entry)?;
    validate_pin(&pin)?;
    let again = source.read_secret(&confirm)?;
    if pin.expose_secret() != again.expose_secret() {
        return Err(EntryError::Mismatch);
    }
    Ok(pin)
}

/// The card counts PIN bytes, so only ASCII PINs have as many bytes as characters.
pub fn validate_pin(pin: &SecretString) -> Result<(), EntryError> {
    let pin = pin.expose_secret();
    if !pin.is_ascii() {
        return Err(EntryError::NonAscii);
    }
    let len = pin.len();
    if !(PIN_MIN_LEN..=PIN_MAX_LEN).contains(&len) {
        return Err(EntryError::InvalidLength(len));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_pin_bounds() {
        for (pin, ok) in [("12345", false), ("123456", true), ("12345678", true), ("123456789", false), ("", false)] {
            let res = validate_pin(&SecretString::from(pin.to_string()));
            assert_eq!(res.is_ok(), ok, "pin of length {}", pin.len());
        }
    }

    #[test]
    fn test_validate_pin_rejects_non_ascii() {
        // Eight characters, nine bytes.
        let err = validate_pin(&SecretString::from("1234567é".to_string())).unwrap_err();
        assert!(matches!(err, EntryError::NonAscii));
        let err = validate_pin(&SecretString::from("12é".to_string())).unwrap_err();
        assert!(matches!(err, EntryError::NonAscii));
    }
}
