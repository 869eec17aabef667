use std::fs::{self, DirBuilder, Permissions};
use std::io::Write;
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::Path;

use super::{KeyPaths, RepoError};
use crate::attestation::AttestationBundle;
use crate::tuf::KeyDescriptor;

pub const DIR_MODE: u32 = 0o755;
pub const FILE_MODE: u32 = 0o644;

/// Write the public key and both attestation certificates for `bundle`.
///
/// Each file is staged next to its destination and renamed into place, so no
/// single artifact is ever half-written. The three files are independent:
/// a failure part-way leaves the ones already written.
pub fn write_key_data(
    bundle: &AttestationBundle,
    descriptor: &KeyDescriptor,
    repository: &Path,
) -> Result<KeyPaths, RepoError> {
    match descriptor.public_key() {
        Ok(key) if key == bundle.public_key => {}
        _ => return Err(RepoError::DescriptorMismatch),
    }

    let paths = KeyPaths::new(repository, bundle.serial);
    let keys_dir = repository.join("keys");
    let created_keys_dir = !keys_dir.exists();
    DirBuilder::new()
        .recursive(true)
        .mode(DIR_MODE)
        .create(&paths.dir)
        .map_err(|source| RepoError::CreateDir { path: paths.dir.clone(), source })?;

    // DirBuilder modes are masked by the umask; the layout needs exactly 0755.
    if created_keys_dir {
        set_dir_mode(&keys_dir)?;
    }
    set_dir_mode(&paths.dir)?;

    write_artifact(&paths.public_key, bundle.public_key_pem()?.as_bytes())?;
    write_artifact(&paths.key_certificate, bundle.key_certificate_pem()?.as_bytes())?;
    write_artifact(&paths.device_certificate, bundle.device_certificate_pem()?.as_bytes())?;

    tracing::info!(dir = %paths.dir.display(), serial = %bundle.serial, "Key data written");
    println!("Wrote public key data to {}", paths.dir.display());
    Ok(paths)
}

fn set_dir_mode(dir: &Path) -> Result<(), RepoError> {
    fs::set_permissions(dir, Permissions::from_mode(DIR_MODE))
        .map_err(|source| RepoError::CreateDir { path: dir.to_path_buf(), source })
}

fn write_artifact(path: &Path, contents: &[u8]) -> Result<(), RepoError> {
    let err = |source| RepoError::Write { path: path.to_path_buf(), source };
    let dir = path.parent().unwrap_or(Path::new("."));

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(err)?;
    tmp.write_all(contents).map_err(err)?;
    tmp.as_file().sync_all().map_err(err)?;
    fs::set_permissions(tmp.path(), Permissions::from_mode(FILE_MODE)).map_err(err)?;
    tmp.persist(path).map_err(|e| err(e.error))?;

    tracing::debug!(path = %path.display(), bytes = contents.len(), "Wrote artifact");
    Ok(())
}
