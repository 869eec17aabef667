use std::path::{Path, PathBuf};

use crate::piv::Serial;

/// Where one device's artifacts live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPaths {
    pub dir:                PathBuf,
    pub public_key:         PathBuf,
    pub key_certificate:    PathBuf,
    pub device_certificate: PathBuf,
}

impl KeyPaths {
    pub fn new(repository: &Path, serial: Serial) -> Self {
        let serial = serial.to_string();
        let dir = repository.join("keys").join(&serial);
        Self {
            public_key: dir.join(format!("{serial}_pubkey.pem")),
            key_certificate: dir.join(format!("{serial}_key_cert.pem")),
            device_certificate: dir.join(format!("{serial}_device_cert.pem")),
            dir,
        }
    }

    pub fn files(&self) -> [&Path; 3] {
        [&self.public_key, &self.key_certificate, &self.device_certificate]
    }
}
