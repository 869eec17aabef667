pub mod scripted;
#[cfg(feature = "yubikey")]
pub mod yubikey;

use std::fmt;

/// PIV slot identifier (SP 800-73-4 key reference).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot(pub u8);

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}", self.0)
    }
}

/// Key usage, which fixes the slot a key lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyUsage {
    Authentication,
    Signature,
    KeyManagement,
    CardAuthentication,
}

impl KeyUsage {
    pub fn slot(self) -> Slot {
        match self {
            Self::Authentication     => Slot(0x9a),
            Self::Signature          => Slot(0x9c),
            Self::KeyManagement      => Slot(0x9d),
            Self::CardAuthentication => Slot(0x9e),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Authentication     => "authentication",
            Self::Signature          => "signature",
            Self::KeyManagement      => "key-management",
            Self::CardAuthentication => "card-authentication",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinPolicy {
    Never,
    Once,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchPolicy {
    Never,
    Always,
    Cached,
}

/// Device serial number, the storage key for enrolled artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Serial(pub u32);

impl fmt::Display for Serial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Raw attestation as returned by the device, before any parsing.
#[derive(Debug, Clone)]
pub struct RawAttestation {
    pub serial:                 Serial,
    /// DER certificate over the generated key, issued by the device.
    pub key_certificate_der:    Vec<u8>,
    /// DER certificate identifying the device (PIV slot f9).
    pub device_certificate_der: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("no PIV device found")]
    NotFound,
    #[error("no PIV driver compiled in (rebuild with --features yubikey)")]
    NoDriver,
    #[error("device communication failed: {0}")]
    Communication(String),
    #[error("device rejected the PIN{}", tries_suffix(.tries))]
    PinRejected { tries: Option<u8> },
    #[error("device does not support {0}")]
    NotSupported(&'static str),
    #[error("device error: {0}")]
    Other(String),
}

fn tries_suffix(tries: &Option<u8>) -> String {
    match tries {
        Some(n) => format!(" ({n} tries left)"),
        None => String::new(),
    }
}

/// An open session on one PIV device.
///
/// Implementations are exclusively owned by one enrollment and release the
/// underlying connection on drop.
pub trait DeviceSession {
    /// Reset the PIV application to factory defaults, destroying all keys.
    fn reset(&mut self) -> Result<(), DeviceError>;

    /// Generate a fresh ECC P-256 key pair on-card in `slot`.
    fn generate_key(
        &mut self,
        slot: Slot,
        touch_policy: TouchPolicy,
        pin_policy: PinPolicy,
        usage: KeyUsage,
    ) -> Result<(), DeviceError>;

    fn set_pin(&mut self, old_pin: &[u8], new_pin: &[u8]) -> Result<(), DeviceError>;

    /// Attest the key held for `usage`.
    fn attest(&mut self, usage: KeyUsage) -> Result<RawAttestation, DeviceError>;
}

impl<D: DeviceSession + ?Sized> DeviceSession for Box<D> {
    fn reset(&mut self) -> Result<(), DeviceError> {
        (**self).reset()
    }

    fn generate_key(
        &mut self,
        slot: Slot,
        touch_policy: TouchPolicy,
        pin_policy: PinPolicy,
        usage: KeyUsage,
    ) -> Result<(), DeviceError> {
        (**self).generate_key(slot, touch_policy, pin_policy, usage)
    }

    fn set_pin(&mut self, old_pin: &[u8], new_pin: &[u8]) -> Result<(), DeviceError> {
        (**self).set_pin(old_pin, new_pin)
    }

    fn attest(&mut self, usage: KeyUsage) -> Result<RawAttestation, DeviceError> {
        (**self).attest(usage)
    }
}
