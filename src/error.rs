#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Device: {0}")]
    Device(#[from] crate::piv::DeviceError),
    #[error("Attestation: {0}")]
    Attestation(#[from] crate::attestation::AttestationError),
    #[error("Key: {0}")]
    Key(#[from] crate::tuf::KeyError),
    #[error("PIN entry: {0}")]
    Entry(#[from] crate::entry::EntryError),
    #[error("Repository: {0}")]
    Repo(#[from] crate::repo::RepoError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
