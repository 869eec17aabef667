use secrecy::SecretString;

use super::{EntryError, PinPrompt, SecretSource};

/// Reads from the controlling terminal with echo disabled.
#[derive(Debug, Default)]
pub struct TerminalEntry;

impl SecretSource for TerminalEntry {
    fn read_secret(&mut self, prompt: &PinPrompt) -> Result<SecretString, EntryError> {
        eprintln!("{}", prompt.description);
        let secret = rpassword::prompt_password(format!("{} ", prompt.prompt))?;
        Ok(SecretString::from(secret))
    }
}

/// Turn echo back on after a prompt was abandoned mid-read; the blocked
/// reader never restores it. No-op without a controlling terminal.
pub fn restore_echo() {
    let tty = match std::fs::File::open("/dev/tty") {
        Ok(tty) => tty,
        Err(e) => {
            tracing::debug!(error = %e, "No controlling terminal to restore");
            return;
        }
    };
    match std::process::Command::new("stty").arg("echo").stdin(tty).status() {
        Ok(status) if status.success() => tracing::debug!("Terminal echo restored"),
        Ok(status) => tracing::warn!(%status, "stty echo failed"),
        Err(e) => tracing::warn!(error = %e, "cannot run stty to restore echo"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restore_echo_is_best_effort() {
        // Must return quietly with or without a controlling terminal.
        restore_echo();
        restore_echo();
    }
}
