//! Repository-facing key representation.

pub mod key;

pub use key::{
    build_key_descriptor, ecdsa_p256_from_spki, EcdsaKeyValue, HashAlgorithm, KeyDescriptor,
    KeyScheme, KeyType, HASH_ALGORITHMS,
};

#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("unsupported public key algorithm {0} (expected id-ecPublicKey)")]
    UnsupportedAlgorithm(String),
    #[error("unsupported elliptic curve {0} (expected P-256)")]
    UnsupportedCurve(String),
    #[error("invalid public key: {0}")]
    InvalidKey(String),
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
}
