pub mod attestation;
pub mod config;
pub mod diagnostics;
pub mod entry;
pub mod error;
pub mod piv;
pub mod repo;
pub mod tuf;

use std::path::{Path, PathBuf};

use attestation::AttestationBundle;
use entry::SecretSource;
use piv::DeviceSession;
use repo::KeyPaths;
use tuf::KeyDescriptor;

/// Everything one enrollment produced.
#[derive(Debug, Clone)]
pub struct Enrollment {
    pub bundle:     AttestationBundle,
    pub descriptor: KeyDescriptor,
    pub key_id:     String,
    pub paths:      KeyPaths,
}

/// Enroll the device behind `device` into `repository`.
///
/// Destructive: the device is reset first. On error nothing is written to the
/// repository unless the failure happens while writing the artifacts, and the
/// device is left in whatever state the failing step produced.
pub fn enroll<D: DeviceSession + ?Sized>(
    device: &mut D,
    secrets: &mut dyn SecretSource,
    repository: &Path,
) -> error::Result<Enrollment> {
    let bundle = attestation::extract(device, secrets)?;
    let descriptor = tuf::build_key_descriptor(&bundle.public_key);
    let key_id = descriptor.key_id()?;
    tracing::info!(serial = %bundle.serial, key_id = %key_id, "Key descriptor built");
    let paths = repo::write_key_data(&bundle, &descriptor, repository)?;
    Ok(Enrollment { bundle, descriptor, key_id, paths })
}

pub async fn run(cfg: config::Config) -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;
    let level = match cfg.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(level))
        .with_writer(std::io::stderr)
        .try_init();

    match cfg.command.clone() {
        config::Command::AddKey { repository } => add_key(cfg, repository).await,
    }
}

async fn add_key(cfg: config::Config, repository: PathBuf) -> anyhow::Result<()> {
    tracing::info!(repository = %repository.display(), "Starting add-key");

    // Preflight checks
    diagnostics::check(&cfg, &repository)?;

    // Single-instance lock: one device, one enrollment at a time
    let lock_dir = match std::env::var("XDG_RUNTIME_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => directories::ProjectDirs::from("", "", "pivroot")
            .ok_or_else(|| anyhow::anyhow!("cannot determine XDG data dir"))?
            .data_dir()
            .to_path_buf(),
    };
    std::fs::create_dir_all(&lock_dir)?;
    let lock_path = lock_dir.join("pivroot.lock");
    let lock_file = std::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)?;
    let mut lock = fd_lock::RwLock::new(lock_file);
    let _guard = lock.try_write().map_err(|_| {
        anyhow::anyhow!("another enrollment is in progress (lock: {})", lock_path.display())
    })?;

    let pinentry = cfg.pinentry.clone();
    let uses_terminal = pinentry.is_none();
    let task = tokio::task::spawn_blocking(move || -> anyhow::Result<Enrollment> {
        let mut secrets: Box<dyn SecretSource> = match pinentry {
            Some(bin) => Box::new(entry::PinentryEntry::new(bin)),
            None => Box::new(entry::TerminalEntry),
        };
        // Dropped, and so disconnected, on every path out of this closure.
        let mut device = open_device()?;
        Ok(enroll(&mut device, secrets.as_mut(), &repository)?)
    });

    tokio::select! {
        res = task => {
            let enrollment = res.map_err(|e| anyhow::anyhow!("enrollment task failed: {e}"))??;
            println!("Key ID: {}", enrollment.key_id);
            Ok(())
        }
        _ = tokio::signal::ctrl_c() => {
            if uses_terminal {
                entry::restore_echo();
            }
            anyhow::bail!(
                "interrupted; device state is unknown, inspect it and rerun add-key from the start"
            )
        }
    }
}

#[cfg(feature = "yubikey")]
fn open_device() -> Result<Box<dyn DeviceSession>, piv::DeviceError> {
    Ok(Box::new(piv::yubikey::YubiKeySession::open()?))
}

#[cfg(not(feature = "yubikey"))]
fn open_device() -> Result<Box<dyn DeviceSession>, piv::DeviceError> {
    Err(piv::DeviceError::NoDriver)
}
