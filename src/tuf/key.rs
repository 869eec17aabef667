use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::elliptic_curve::ALGORITHM_OID;
use p256::pkcs8::AssociatedOid;
use p256::{NistP256, PublicKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use x509_cert::der::referenced::OwnedToRef;
use x509_cert::spki::SubjectPublicKeyInfoOwned;

use super::KeyError;

/// SEC1 uncompressed point: `0x04 || X || Y`.
const UNCOMPRESSED_POINT_LEN: usize = 65;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyType {
    #[serde(rename = "ecdsa-sha2-nistp256")]
    EcdsaSha2Nistp256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyScheme {
    #[serde(rename = "ecdsa-sha2-nistp256")]
    EcdsaSha2Nistp256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HashAlgorithm {
    #[serde(rename = "sha256")]
    Sha256,
    #[serde(rename = "sha512")]
    Sha512,
}

/// Hash algorithms the repository accepts for computing key IDs, in order.
pub const HASH_ALGORITHMS: [HashAlgorithm; 2] = [HashAlgorithm::Sha256, HashAlgorithm::Sha512];

/// `keyval` envelope for ECDSA keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcdsaKeyValue {
    #[serde(with = "hex")]
    pub public: Vec<u8>,
}

/// Canonical repository key descriptor.
///
/// Fields are declared in lexicographic order of their JSON names, so compact
/// serialization is already the canonical form used for key IDs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDescriptor {
    #[serde(rename = "keyid_hash_algorithms")]
    pub algorithms: Vec<HashAlgorithm>,
    #[serde(rename = "keytype")]
    pub key_type:   KeyType,
    #[serde(rename = "keyval")]
    pub value:      EcdsaKeyValue,
    pub scheme:     KeyScheme,
}

/// Build the descriptor for an ECDSA P-256 public key. Deterministic.
pub fn build_key_descriptor(public_key: &PublicKey) -> KeyDescriptor {
    let point = public_key.to_encoded_point(false);
    KeyDescriptor {
        algorithms: HASH_ALGORITHMS.to_vec(),
        key_type: KeyType::EcdsaSha2Nistp256,
        value: EcdsaKeyValue { public: point.as_bytes().to_vec() },
        scheme: KeyScheme::EcdsaSha2Nistp256,
    }
}

/// Accept only `id-ecPublicKey` on P-256; anything else fails closed.
pub fn ecdsa_p256_from_spki(spki: &SubjectPublicKeyInfoOwned) -> Result<PublicKey, KeyError> {
    let spki = spki.owned_to_ref();
    let (algorithm, curve) = spki
        .algorithm
        .oids()
        .map_err(|e| KeyError::InvalidKey(e.to_string()))?;
    if algorithm != ALGORITHM_OID {
        return Err(KeyError::UnsupportedAlgorithm(algorithm.to_string()));
    }
    match curve {
        Some(curve) if curve == NistP256::OID => {}
        Some(curve) => return Err(KeyError::UnsupportedCurve(curve.to_string())),
        None => return Err(KeyError::UnsupportedCurve("(missing)".into())),
    }
    PublicKey::try_from(spki).map_err(|e| KeyError::InvalidKey(e.to_string()))
}

impl KeyDescriptor {
    /// Compact JSON with sorted keys.
    pub fn to_canonical_json(&self) -> Result<Vec<u8>, KeyError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// The encoded `keyval` envelope.
    pub fn value_bytes(&self) -> Result<Vec<u8>, KeyError> {
        Ok(serde_json::to_vec(&self.value)?)
    }

    /// Hex SHA-256 of the canonical encoding.
    pub fn key_id(&self) -> Result<String, KeyError> {
        let json = self.to_canonical_json()?;
        Ok(hex::encode(Sha256::digest(&json)))
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, KeyError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Decode `keyval.public` back into the EC point it encodes.
    pub fn public_key(&self) -> Result<PublicKey, KeyError> {
        let bytes = &self.value.public;
        if bytes.len() != UNCOMPRESSED_POINT_LEN || bytes[0] != 0x04 {
            return Err(KeyError::InvalidKey(format!(
                "expected {UNCOMPRESSED_POINT_LEN}-byte uncompressed point, got {} bytes",
                bytes.len()
            )));
        }
        PublicKey::from_sec1_bytes(bytes).map_err(|e| KeyError::InvalidKey(e.to_string()))
    }
}
