pub mod extensions;

use p256::pkcs8::{EncodePublicKey, LineEnding};
use secrecy::ExposeSecret;
use x509_cert::der::{Decode, EncodePem};
use x509_cert::Certificate;

pub use extensions::YubicoExtensions;

use crate::config::{DEFAULT_PIN, KEY_USAGE, PIN_POLICY, TOUCH_POLICY};
use crate::entry::{self, SecretSource};
use crate::piv::{DeviceSession, PinPolicy, RawAttestation, Serial, TouchPolicy};
use crate::tuf::{self, KeyError};

#[derive(Debug, thiserror::Error)]
pub enum AttestationError {
    #[error("cannot parse {which} certificate: {reason}")]
    Certificate { which: &'static str, reason: String },
    #[error("unexpected key material: {0}")]
    UnsupportedKey(#[from] KeyError),
    #[error("key certificate issuer ({issuer}) is not the device certificate subject ({device})")]
    IssuerMismatch { issuer: String, device: String },
    #[error("device reported serial {reported} but the key certificate attests {attested}")]
    SerialMismatch { reported: Serial, attested: u32 },
    #[error("key attested with PIN policy {pin:?} and touch policy {touch:?}, expected Always/Always")]
    PolicyMismatch { pin: PinPolicy, touch: TouchPolicy },
    #[error("malformed extension {oid}: {reason}")]
    MalformedExtension { oid: String, reason: String },
    #[error("PEM encoding: {0}")]
    Pem(String),
}

/// Parsed, cross-checked attestation for one generated key.
#[derive(Debug, Clone)]
pub struct AttestationBundle {
    pub serial:             Serial,
    pub key_certificate:    Certificate,
    pub device_certificate: Certificate,
    /// Public key embedded in `key_certificate`, always P-256.
    pub public_key:         p256::PublicKey,
    pub extensions:         YubicoExtensions,
}

impl AttestationBundle {
    pub fn key_certificate_pem(&self) -> Result<String, AttestationError> {
        self.key_certificate
            .to_pem(LineEnding::LF)
            .map_err(|e| AttestationError::Pem(e.to_string()))
    }

    pub fn device_certificate_pem(&self) -> Result<String, AttestationError> {
        self.device_certificate
            .to_pem(LineEnding::LF)
            .map_err(|e| AttestationError::Pem(e.to_string()))
    }

    /// SPKI `PUBLIC KEY` PEM.
    pub fn public_key_pem(&self) -> Result<String, AttestationError> {
        self.public_key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| AttestationError::Pem(e.to_string()))
    }
}

/// Reset the device, generate a signing key, replace the default PIN and
/// attest the new key.
pub fn extract<D: DeviceSession + ?Sized>(
    device: &mut D,
    secrets: &mut dyn SecretSource,
) -> crate::error::Result<AttestationBundle> {
    tracing::info!("Resetting PIV application");
    device.reset()?;

    let slot = KEY_USAGE.slot();
    tracing::info!(%slot, usage = KEY_USAGE.name(), "Generating key");
    device.generate_key(slot, TOUCH_POLICY, PIN_POLICY, KEY_USAGE)?;

    {
        let pin = entry::collect_new_pin(secrets)?;
        device.set_pin(DEFAULT_PIN.as_bytes(), pin.expose_secret().as_bytes())?;
    }
    tracing::info!("PIN changed");

    let raw = device.attest(KEY_USAGE)?;
    tracing::info!(serial = %raw.serial, "Attestation received");
    Ok(parse_attestation(raw)?)
}

/// Parse and cross-check raw attestation output.
pub fn parse_attestation(raw: RawAttestation) -> Result<AttestationBundle, AttestationError> {
    let key_certificate = Certificate::from_der(&raw.key_certificate_der).map_err(|e| {
        AttestationError::Certificate { which: "key", reason: e.to_string() }
    })?;
    let device_certificate = Certificate::from_der(&raw.device_certificate_der).map_err(|e| {
        AttestationError::Certificate { which: "device", reason: e.to_string() }
    })?;

    let public_key =
        tuf::ecdsa_p256_from_spki(&key_certificate.tbs_certificate.subject_public_key_info)?;

    let issuer = &key_certificate.tbs_certificate.issuer;
    let device_subject = &device_certificate.tbs_certificate.subject;
    if issuer != device_subject {
        return Err(AttestationError::IssuerMismatch {
            issuer: issuer.to_string(),
            device: device_subject.to_string(),
        });
    }

    let extensions = YubicoExtensions::parse(&key_certificate)?;
    if let Some(attested) = extensions.serial {
        if attested != raw.serial.0 {
            return Err(AttestationError::SerialMismatch { reported: raw.serial, attested });
        }
    }
    if let Some((pin, touch)) = extensions.policy {
        if pin != PIN_POLICY || touch != TOUCH_POLICY {
            return Err(AttestationError::PolicyMismatch { pin, touch });
        }
    }
    if let Some([major, minor, patch]) = extensions.firmware {
        tracing::debug!(firmware = %format_args!("{major}.{minor}.{patch}"), "Attested firmware");
    }

    Ok(AttestationBundle {
        serial: raw.serial,
        key_certificate,
        device_certificate,
        public_key,
        extensions,
    })
}
