use std::collections::VecDeque;

use pivroot::attestation::{self, AttestationError};
use pivroot::entry::{EntryError, PinPrompt, SecretSource};
use pivroot::error::Error;
use pivroot::piv::scripted::{Call, ScriptedDevice, Step};
use pivroot::piv::{DeviceError, KeyUsage, PinPolicy, Slot, TouchPolicy};
use pivroot::tuf::KeyError;
use secrecy::SecretString;

const SERIAL: u32 = 123456789;
const DEVICE_CERT: &str = include_str!("fixtures/device_cert.pem");
const KEY_CERT_P256: &str = include_str!("fixtures/key_cert_p256.pem");
const KEY_CERT_RSA: &str = include_str!("fixtures/key_cert_rsa.pem");
const KEY_CERT_P384: &str = include_str!("fixtures/key_cert_p384.pem");
const KEY_CERT_WRONG_SERIAL: &str = include_str!("fixtures/key_cert_wrong_serial.pem");
const KEY_CERT_WEAK_POLICY: &str = include_str!("fixtures/key_cert_weak_policy.pem");
const KEY_CERT_NO_EXT: &str = include_str!("fixtures/key_cert_no_ext.pem");
const KEY_CERT_FOREIGN: &str = include_str!("fixtures/key_cert_foreign.pem");

struct ScriptedSecrets(VecDeque<&'static str>);

impl ScriptedSecrets {
    fn pin(pin: &'static str) -> Self {
        Self(VecDeque::from([pin, pin]))
    }
}

impl SecretSource for ScriptedSecrets {
    fn read_secret(&mut self, _prompt: &PinPrompt) -> Result<SecretString, EntryError> {
        self.0
            .pop_front()
            .map(|s| SecretString::from(s.to_string()))
            .ok_or_else(|| {
                EntryError::Io(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "no terminal"))
            })
    }
}

fn device(key_cert: &str) -> ScriptedDevice {
    ScriptedDevice::from_pem(SERIAL, key_cert, DEVICE_CERT).unwrap()
}

#[test]
fn test_extract_drives_device_in_order() {
    let mut dev = device(KEY_CERT_P256);
    let bundle = attestation::extract(&mut dev, &mut ScriptedSecrets::pin("24681357")).unwrap();

    assert_eq!(bundle.serial.0, SERIAL);
    assert_eq!(
        dev.calls(),
        &[
            Call::Reset,
            Call::GenerateKey {
                slot: Slot(0x9c),
                touch_policy: TouchPolicy::Always,
                pin_policy: PinPolicy::Always,
                usage: KeyUsage::Signature,
            },
            Call::SetPin,
            Call::Attest(KeyUsage::Signature),
        ]
    );
    assert_eq!(dev.current_pin(), b"24681357");
}

#[test]
fn test_extract_reads_yubico_extensions() {
    let mut dev = device(KEY_CERT_P256);
    let bundle = attestation::extract(&mut dev, &mut ScriptedSecrets::pin("135790")).unwrap();
    assert_eq!(bundle.extensions.serial, Some(SERIAL));
    assert_eq!(bundle.extensions.firmware, Some([5, 2, 7]));
    assert_eq!(bundle.extensions.policy, Some((PinPolicy::Always, TouchPolicy::Always)));
}

#[test]
fn test_extract_accepts_certificate_without_extensions() {
    let mut dev = device(KEY_CERT_NO_EXT);
    let bundle = attestation::extract(&mut dev, &mut ScriptedSecrets::pin("135790")).unwrap();
    assert_eq!(bundle.extensions, Default::default());
}

#[test]
fn test_extract_rejects_rsa_key() {
    let mut dev = device(KEY_CERT_RSA);
    let err = attestation::extract(&mut dev, &mut ScriptedSecrets::pin("135790")).unwrap_err();
    assert!(
        matches!(
            err,
            Error::Attestation(AttestationError::UnsupportedKey(KeyError::UnsupportedAlgorithm(_)))
        ),
        "got {err}"
    );
}

#[test]
fn test_extract_rejects_p384_key() {
    let mut dev = device(KEY_CERT_P384);
    let err = attestation::extract(&mut dev, &mut ScriptedSecrets::pin("135790")).unwrap_err();
    assert!(
        matches!(
            err,
            Error::Attestation(AttestationError::UnsupportedKey(KeyError::UnsupportedCurve(_)))
        ),
        "got {err}"
    );
}

#[test]
fn test_extract_rejects_serial_mismatch() {
    let mut dev = device(KEY_CERT_WRONG_SERIAL);
    let err = attestation::extract(&mut dev, &mut ScriptedSecrets::pin("135790")).unwrap_err();
    assert!(
        matches!(err, Error::Attestation(AttestationError::SerialMismatch { attested: 987654321, .. })),
        "got {err}"
    );
}

#[test]
fn test_extract_rejects_weak_policy() {
    let mut dev = device(KEY_CERT_WEAK_POLICY);
    let err = attestation::extract(&mut dev, &mut ScriptedSecrets::pin("135790")).unwrap_err();
    assert!(
        matches!(
            err,
            Error::Attestation(AttestationError::PolicyMismatch {
                pin: PinPolicy::Once,
                touch: TouchPolicy::Never,
            })
        ),
        "got {err}"
    );
}

#[test]
fn test_extract_rejects_foreign_issuer() {
    let mut dev = device(KEY_CERT_FOREIGN);
    let err = attestation::extract(&mut dev, &mut ScriptedSecrets::pin("135790")).unwrap_err();
    assert!(
        matches!(err, Error::Attestation(AttestationError::IssuerMismatch { .. })),
        "got {err}"
    );
}

#[test]
fn test_extract_stops_at_failing_step() {
    let expected_calls = [(Step::Reset, 1), (Step::GenerateKey, 2), (Step::SetPin, 3), (Step::Attest, 4)];
    for (step, calls) in expected_calls {
        let mut dev = device(KEY_CERT_P256).fail_at(step);
        let err = attestation::extract(&mut dev, &mut ScriptedSecrets::pin("135790")).unwrap_err();
        assert!(matches!(err, Error::Device(_)), "{step:?}: got {err}");
        assert_eq!(dev.calls().len(), calls, "{step:?} must be the last call");
    }
}

#[test]
fn test_extract_surfaces_device_pin_rejection() {
    let mut dev = device(KEY_CERT_P256).reject_pin();
    let err = attestation::extract(&mut dev, &mut ScriptedSecrets::pin("24681357")).unwrap_err();
    assert!(
        matches!(err, Error::Device(DeviceError::PinRejected { tries: Some(2) })),
        "got {err}"
    );
    assert_eq!(dev.calls().last(), Some(&Call::SetPin), "nothing after the rejected PIN");
    assert_eq!(dev.current_pin(), b"123456");
}

#[test]
fn test_extract_rejects_short_pin_before_device() {
    let mut dev = device(KEY_CERT_P256);
    let err = attestation::extract(&mut dev, &mut ScriptedSecrets::pin("1234")).unwrap_err();
    assert!(matches!(err, Error::Entry(EntryError::InvalidLength(4))), "got {err}");
    assert!(!dev.calls().contains(&Call::SetPin), "PIN must not reach the device");
    assert_eq!(dev.current_pin(), b"123456");
}

#[test]
fn test_extract_rejects_confirmation_mismatch() {
    let mut dev = device(KEY_CERT_P256);
    let mut secrets = ScriptedSecrets(VecDeque::from(["11223344", "11223355"]));
    let err = attestation::extract(&mut dev, &mut secrets).unwrap_err();
    assert!(matches!(err, Error::Entry(EntryError::Mismatch)), "got {err}");
    assert!(!dev.calls().contains(&Call::SetPin));
}

#[test]
fn test_extract_fails_without_terminal() {
    let mut dev = device(KEY_CERT_P256);
    let err = attestation::extract(&mut dev, &mut ScriptedSecrets(VecDeque::new())).unwrap_err();
    assert!(matches!(err, Error::Entry(EntryError::Io(_))), "got {err}");
}
