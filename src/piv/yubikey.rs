use ::yubikey::certificate::Certificate;
use ::yubikey::piv::{self, AlgorithmId, SlotId};
use ::yubikey::{MgmKey, YubiKey};
use x509_cert::der::Encode;

use super::{DeviceError, DeviceSession, KeyUsage, PinPolicy, RawAttestation, Serial, Slot, TouchPolicy};

/// Wrong credential used to exhaust the PIN and PUK retry counters before reset.
const BLOCKING_SECRET: &[u8] = b"0000000!";
/// Upper bound on attempts; PIV allows at most 255 retries but cards ship with 3.
const MAX_BLOCK_ATTEMPTS: usize = 16;

pub struct YubiKeySession {
    yubikey: YubiKey,
}

impl YubiKeySession {
    /// Open the single connected YubiKey.
    pub fn open() -> Result<Self, DeviceError> {
        let yubikey = YubiKey::open().map_err(map_err)?;
        tracing::info!(serial = %yubikey.serial(), version = ?yubikey.version(), "Opened YubiKey");
        Ok(Self { yubikey })
    }

    pub fn serial(&self) -> Serial {
        Serial(self.yubikey.serial().0)
    }

    fn block_pin(&mut self) -> Result<(), DeviceError> {
        for _ in 0..MAX_BLOCK_ATTEMPTS {
            match self.yubikey.verify_pin(BLOCKING_SECRET) {
                Err(::yubikey::Error::PinLocked) | Err(::yubikey::Error::WrongPin { tries: 0 }) => {
                    return Ok(())
                }
                Err(::yubikey::Error::WrongPin { .. }) => {}
                Ok(()) => return Err(DeviceError::Other("PIN unexpectedly accepted".into())),
                Err(e) => return Err(map_err(e)),
            }
        }
        Err(DeviceError::Other("PIN retry counter did not reach zero".into()))
    }

    fn block_puk(&mut self) -> Result<(), DeviceError> {
        for _ in 0..MAX_BLOCK_ATTEMPTS {
            match self.yubikey.unblock_pin(BLOCKING_SECRET, BLOCKING_SECRET) {
                Err(::yubikey::Error::PinLocked) | Err(::yubikey::Error::WrongPin { tries: 0 }) => {
                    return Ok(())
                }
                Err(::yubikey::Error::WrongPin { .. }) => {}
                Ok(()) => return Err(DeviceError::Other("PUK unexpectedly accepted".into())),
                Err(e) => return Err(map_err(e)),
            }
        }
        Err(DeviceError::Other("PUK retry counter did not reach zero".into()))
    }
}

fn map_err(e: ::yubikey::Error) -> DeviceError {
    match e {
        ::yubikey::Error::NotFound => DeviceError::NotFound,
        ::yubikey::Error::WrongPin { tries } => DeviceError::PinRejected { tries: Some(tries) },
        ::yubikey::Error::PinLocked => DeviceError::PinRejected { tries: Some(0) },
        ::yubikey::Error::NotSupported => DeviceError::NotSupported("this operation"),
        e @ ::yubikey::Error::PcscError { .. } => DeviceError::Communication(e.to_string()),
        e => DeviceError::Other(e.to_string()),
    }
}

fn slot_id(usage: KeyUsage) -> SlotId {
    match usage {
        KeyUsage::Authentication     => SlotId::Authentication,
        KeyUsage::Signature          => SlotId::Signature,
        KeyUsage::KeyManagement      => SlotId::KeyManagement,
        KeyUsage::CardAuthentication => SlotId::CardAuthentication,
    }
}

impl From<PinPolicy> for ::yubikey::PinPolicy {
    fn from(p: PinPolicy) -> Self {
        match p {
            PinPolicy::Never  => Self::Never,
            PinPolicy::Once   => Self::Once,
            PinPolicy::Always => Self::Always,
        }
    }
}

impl From<TouchPolicy> for ::yubikey::TouchPolicy {
    fn from(p: TouchPolicy) -> Self {
        match p {
            TouchPolicy::Never  => Self::Never,
            TouchPolicy::Always => Self::Always,
            TouchPolicy::Cached => Self::Cached,
        }
    }
}

impl DeviceSession for YubiKeySession {
    fn reset(&mut self) -> Result<(), DeviceError> {
        // The PIV applet refuses to reset while either retry counter is non-zero.
        self.block_pin()?;
        self.block_puk()?;
        self.yubikey.reset_device().map_err(map_err)
    }

    fn generate_key(
        &mut self,
        slot: Slot,
        touch_policy: TouchPolicy,
        pin_policy: PinPolicy,
        usage: KeyUsage,
    ) -> Result<(), DeviceError> {
        if slot != usage.slot() {
            return Err(DeviceError::NotSupported("a slot that does not match the key usage"));
        }
        self.yubikey.authenticate(MgmKey::default()).map_err(map_err)?;
        piv::generate(
            &mut self.yubikey,
            slot_id(usage),
            AlgorithmId::EccP256,
            pin_policy.into(),
            touch_policy.into(),
        )
        .map_err(map_err)?;
        Ok(())
    }

    fn set_pin(&mut self, old_pin: &[u8], new_pin: &[u8]) -> Result<(), DeviceError> {
        self.yubikey.change_pin(old_pin, new_pin).map_err(map_err)
    }

    fn attest(&mut self, usage: KeyUsage) -> Result<RawAttestation, DeviceError> {
        let key_certificate_der = piv::attest(&mut self.yubikey, slot_id(usage))
            .map_err(map_err)?
            .to_vec();
        let device = Certificate::read(&mut self.yubikey, SlotId::Attestation).map_err(map_err)?;
        let device_certificate_der = device
            .cert
            .to_der()
            .map_err(|e| DeviceError::Other(format!("encode device certificate: {e}")))?;
        Ok(RawAttestation {
            serial: self.serial(),
            key_certificate_der,
            device_certificate_der,
        })
    }
}
