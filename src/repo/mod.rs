pub mod layout;
pub mod writer;

use std::path::PathBuf;

pub use layout::KeyPaths;
pub use writer::write_key_data;

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("cannot create {}: {source}", .path.display())]
    CreateDir { path: PathBuf, source: std::io::Error },
    #[error("cannot write {}: {source}", .path.display())]
    Write { path: PathBuf, source: std::io::Error },
    #[error("encode: {0}")]
    Encode(#[from] crate::attestation::AttestationError),
    #[error("key descriptor does not match the attested public key")]
    DescriptorMismatch,
}
