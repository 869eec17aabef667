use secrecy::SecretString;

use super::{EntryError, PinPrompt, SecretSource};

/// Reads through an external pinentry program (Assuan protocol).
#[derive(Debug, Clone)]
pub struct PinentryEntry {
    binary: String,
}

impl PinentryEntry {
    pub fn new(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }
}

impl SecretSource for PinentryEntry {
    fn read_secret(&mut self, prompt: &PinPrompt) -> Result<SecretString, EntryError> {
        let Some(mut input) = ::pinentry::PassphraseInput::with_binary(&self.binary) else {
            return Err(EntryError::Pinentry(format!("binary not found: '{}'", self.binary)));
        };
        input
            .with_title(&prompt.title)
            .with_description(&prompt.description)
            .with_prompt(&prompt.prompt)
            .required("A PIN is required.")
            .interact()
            .map_err(|e| match e {
                ::pinentry::Error::Cancelled => EntryError::Cancelled,
                e => EntryError::Pinentry(e.to_string()),
            })
    }
}
