use x509_cert::der::{DecodePem, Encode};
use x509_cert::Certificate;

use super::{DeviceError, DeviceSession, KeyUsage, PinPolicy, RawAttestation, Serial, Slot, TouchPolicy};
use crate::config::DEFAULT_PIN;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Reset,
    GenerateKey,
    SetPin,
    Attest,
}

/// One recorded device call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Reset,
    GenerateKey {
        slot:         Slot,
        touch_policy: TouchPolicy,
        pin_policy:   PinPolicy,
        usage:        KeyUsage,
    },
    SetPin,
    Attest(KeyUsage),
}

pub struct ScriptedDevice {
    attestation: RawAttestation,
    fail_at:     Option<Step>,
    reject_pin:  bool,
    pin:         Vec<u8>,
    generated:   Option<Slot>,
    calls:       Vec<Call>,
}

impl ScriptedDevice {
    pub fn new(attestation: RawAttestation) -> Self {
        Self {
            attestation,
            fail_at: None,
            reject_pin: false,
            pin: DEFAULT_PIN.as_bytes().to_vec(),
            generated: None,
            calls: Vec::new(),
        }
    }

    /// Build a device from PEM certificates.
    pub fn from_pem(
        serial: u32,
        key_certificate_pem: &str,
        device_certificate_pem: &str,
    ) -> Result<Self, DeviceError> {
        Ok(Self::new(RawAttestation {
            serial: Serial(serial),
            key_certificate_der: pem_to_der(key_certificate_pem)?,
            device_certificate_der: pem_to_der(device_certificate_pem)?,
        }))
    }

    pub fn fail_at(mut self, step: Step) -> Self {
        self.fail_at = Some(step);
        self
    }

    /// Refuse every PIN change the way a card does when the old PIN is wrong.
    pub fn reject_pin(mut self) -> Self {
        self.reject_pin = true;
        self
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    /// PIN currently set on the device.
    pub fn current_pin(&self) -> &[u8] {
        &self.pin
    }

    fn check(&self, step: Step) -> Result<(), DeviceError> {
        if self.fail_at == Some(step) {
            return Err(DeviceError::Communication(format!("scripted failure at {step:?}")));
        }
        Ok(())
    }
}

fn pem_to_der(pem: &str) -> Result<Vec<u8>, DeviceError> {
    Certificate::from_pem(pem)
        .and_then(|cert| cert.to_der())
        .map_err(|e| DeviceError::Other(format!("bad certificate fixture: {e}")))
}

impl DeviceSession for ScriptedDevice {
    fn reset(&mut self) -> Result<(), DeviceError> {
        self.calls.push(Call::Reset);
        self.check(Step::Reset)?;
        self.pin = DEFAULT_PIN.as_bytes().to_vec();
        self.generated = None;
        Ok(())
    }

    fn generate_key(
        &mut self,
        slot: Slot,
        touch_policy: TouchPolicy,
        pin_policy: PinPolicy,
        usage: KeyUsage,
    ) -> Result<(), DeviceError> {
        self.calls.push(Call::GenerateKey { slot, touch_policy, pin_policy, usage });
        self.check(Step::GenerateKey)?;
        self.generated = Some(slot);
        Ok(())
    }

    fn set_pin(&mut self, old_pin: &[u8], new_pin: &[u8]) -> Result<(), DeviceError> {
        self.calls.push(Call::SetPin);
        self.check(Step::SetPin)?;
        if self.reject_pin || old_pin != self.pin.as_slice() || !(6..=8).contains(&new_pin.len()) {
            return Err(DeviceError::PinRejected { tries: Some(2) });
        }
        self.pin = new_pin.to_vec();
        Ok(())
    }

    fn attest(&mut self, usage: KeyUsage) -> Result<RawAttestation, DeviceError> {
        self.calls.push(Call::Attest(usage));
        self.check(Step::Attest)?;
        if self.generated != Some(usage.slot()) {
            return Err(DeviceError::Other(format!("slot {} is empty", usage.slot())));
        }
        Ok(self.attestation.clone())
    }
}
