use x509_cert::der::asn1::ObjectIdentifier;
use x509_cert::der::Decode;
use x509_cert::Certificate;

use super::AttestationError;
use crate::piv::{PinPolicy, TouchPolicy};

// https://developers.yubico.com/PIV/Introduction/PIV_attestation.html
pub const FIRMWARE_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.4.1.41482.3.3");
pub const SERIAL_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.4.1.41482.3.7");
pub const POLICY_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.4.1.41482.3.8");

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct YubicoExtensions {
    /// Firmware version `major.minor.patch`.
    pub firmware: Option<[u8; 3]>,
    pub serial:   Option<u32>,
    pub policy:   Option<(PinPolicy, TouchPolicy)>,
}

impl YubicoExtensions {
    pub fn parse(cert: &Certificate) -> Result<Self, AttestationError> {
        let mut out = Self::default();
        let Some(extensions) = &cert.tbs_certificate.extensions else {
            return Ok(out);
        };
        for ext in extensions {
            let value = ext.extn_value.as_bytes();
            if ext.extn_id == FIRMWARE_OID {
                let bytes: [u8; 3] = value
                    .try_into()
                    .map_err(|_| malformed(FIRMWARE_OID, "expected 3 bytes"))?;
                out.firmware = Some(bytes);
            } else if ext.extn_id == SERIAL_OID {
                let serial = u32::from_der(value).map_err(|e| malformed(SERIAL_OID, &e.to_string()))?;
                out.serial = Some(serial);
            } else if ext.extn_id == POLICY_OID {
                let [pin, touch] = value else {
                    return Err(malformed(POLICY_OID, "expected 2 bytes"));
                };
                out.policy = Some((pin_policy(*pin)?, touch_policy(*touch)?));
            }
        }
        Ok(out)
    }
}

fn malformed(oid: ObjectIdentifier, reason: &str) -> AttestationError {
    AttestationError::MalformedExtension { oid: oid.to_string(), reason: reason.to_string() }
}

fn pin_policy(b: u8) -> Result<PinPolicy, AttestationError> {
    match b {
        1 => Ok(PinPolicy::Never),
        2 => Ok(PinPolicy::Once),
        3 => Ok(PinPolicy::Always),
        other => Err(malformed(POLICY_OID, &format!("unknown PIN policy {other}"))),
    }
}

fn touch_policy(b: u8) -> Result<TouchPolicy, AttestationError> {
    match b {
        1 => Ok(TouchPolicy::Never),
        2 => Ok(TouchPolicy::Always),
        3 => Ok(TouchPolicy::Cached),
        other => Err(malformed(POLICY_OID, &format!("unknown touch policy {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_bytes() {
        assert_eq!(pin_policy(3).unwrap(), PinPolicy::Always);
        assert_eq!(touch_policy(2).unwrap(), TouchPolicy::Always);
        assert_eq!(touch_policy(3).unwrap(), TouchPolicy::Cached);
        assert!(pin_policy(0).is_err());
        assert!(touch_policy(4).is_err());
    }
}
