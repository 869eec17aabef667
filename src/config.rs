use std::path::PathBuf;

use crate::piv::{KeyUsage, PinPolicy, TouchPolicy};

/// Factory default PIV PIN, replaced during enrollment.
pub const DEFAULT_PIN: &str = "123456";
pub const PIN_MIN_LEN: usize = 6;
pub const PIN_MAX_LEN: usize = 8;

pub const KEY_USAGE: KeyUsage = KeyUsage::Signature;
pub const TOUCH_POLICY: TouchPolicy = TouchPolicy::Always;
pub const PIN_POLICY: PinPolicy = PinPolicy::Always;

#[derive(clap::Parser, Debug, Clone)]
#[command(name = "pivroot", version, about = "Hardware key enrollment for a TUF repository")]
pub struct Config {
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
    /// Collect the new PIN through this pinentry program instead of the terminal.
    #[arg(long, global = true)]
    pub pinentry: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug, Clone)]
pub enum Command {
    /// Reset the connected PIV key, generate a signing key on it and write its
    /// public key and attestation certificates to REPOSITORY/keys/SERIAL/.
    #[command(name = "add-key")]
    AddKey {
        /// Path to the staged repository.
        #[arg(long)]
        repository: PathBuf,
    },
}
