//! KeyIDs.
//!
//! A KeyID identifies a public key, but unlike a `Fingerprint`, it is
//! short and easily spoofed.
//!
//! The `KeyID` type is declared in the crate root; this module
//! implements its functionality.

use std::fmt;

use crate::Fingerprint;
use crate::KeyID;
use crate::Result;

impl fmt::Display for KeyID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_string_internal(true))
    }
}

impl fmt::Debug for KeyID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("KeyID")
            .field(&self.to_string())
            .finish()
    }
}

impl From<u64> for KeyID {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

impl From<&[u8]> for KeyID {
    fn from(id: &[u8]) -> Self {
        if id.len() == 8 {
            // Binary.
            let mut keyid: [u8; 8] = Default::default();
            keyid.copy_from_slice(id);
            KeyID::V4(keyid)
        } else {
            KeyID::Invalid(id.to_vec().into_boxed_slice())
        }
    }
}

impl From<Fingerprint> for KeyID {
    fn from(fp: Fingerprint) -> Self {
        match fp {
            Fingerprint::V4(fp) =>
                KeyID::from(&fp[12..]),
            Fingerprint::Invalid(fp) =>
                KeyID::Invalid(fp),
        }
    }
}

impl From<&Fingerprint> for KeyID {
    fn from(fp: &Fingerprint) -> Self {
        fp.clone().into()
    }
}

impl KeyID {
    /// Converts a u64 to a KeyID.
    pub fn new(data: u64) -> KeyID {
        let bytes = data.to_be_bytes();
        Self::from_bytes(&bytes[..])
    }

    /// Converts the KeyID to a u64 if possible.
    pub fn as_u64(&self) -> Result<u64> {
        match &self {
            KeyID::V4(ref b) =>
                Ok(u64::from_be_bytes(*b)),
            KeyID::Invalid(_) =>
                Err(crate::Error::InvalidArgument(
                    format!("not a v4 KeyID: {}", self)).into()),
        }
    }

    /// Reads a binary key ID.
    pub fn from_bytes(raw: &[u8]) -> KeyID {
        raw.into()
    }

    /// Reads a hexadecimal key ID, ignoring whitespace.
    pub fn from_hex(hex: &str) -> Result<KeyID> {
        Ok(KeyID::from_bytes(&crate::fmt::from_hex(hex, true)?[..]))
    }

    /// Returns a reference to the raw KeyID.
    pub fn as_slice(&self) -> &[u8] {
        match self {
            KeyID::V4(ref id) => id,
            KeyID::Invalid(ref id) => id,
        }
    }

    /// Returns the wildcard KeyID.
    ///
    /// A wildcard KeyID is all zeros, and is used in PKESK packets to
    /// hide the recipient of a message.
    pub fn wildcard() -> Self {
        Self::from_bytes(&[0u8; 8][..])
    }

    /// Returns true if this is a wild card ID.
    pub fn is_wildcard(&self) -> bool {
        self.as_slice().iter().all(|b| *b == 0)
    }

    /// Converts this key ID to its canonical hexadecimal representation.
    pub fn to_hex(&self) -> String {
        self.to_string_internal(false)
    }

    /// Common code for the above functions.
    fn to_string_internal(&self, pretty: bool) -> String {
        let raw = self.as_slice();

        // We currently only handle V4 key IDs, which look like:
        //
        //   AACB 3243 6300 52D9
        //
        // Since we have no idea how to format an invalid key ID, just
        // format it like a V4 key ID and hope for the best.
        let mut output = Vec::with_capacity(
            // Each byte results in to hex characters.
            raw.len() * 2
            + if pretty {
                // Every 2 bytes of output, we insert a space.
                raw.len() / 2
            } else { 0 });

        for (i, b) in raw.iter().enumerate() {
            if pretty && i > 0 && i % 2 == 0 {
                output.push(b' ');
            }

            let top = b >> 4;
            let bottom = b & 0xFu8;

            if top < 10u8 {
                output.push(b'0' + top)
            } else {
                output.push(b'A' + (top - 10u8))
            }

            if bottom < 10u8 {
                output.push(b'0' + bottom)
            } else {
                output.push(b'A' + (bottom - 10u8))
            }
        }

        // We know the content is valid UTF-8.
        String::from_utf8(output).unwrap()
    }
}

#[cfg(test)]
impl quickcheck::Arbitrary for KeyID {
    fn arbitrary(g: &mut quickcheck::Gen) -> Self {
        use quickcheck::Arbitrary;
        KeyID::new(u64::arbitrary(g))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn from_u64_and_back() {
        let keyid = KeyID::new(0xAACB324363005299);
        assert_eq!(keyid.as_u64().unwrap(), 0xAACB324363005299);
        assert_eq!(keyid.to_hex(), "AACB324363005299");
        assert_eq!(keyid.to_string(), "AACB 3243 6300 5299");
    }

    #[test]
    fn from_fingerprint() {
        let fp = Fingerprint::from_hex(
            "8F17 7771 18A3 3DDA 9BA4  8E62 AACB 3243 6300 52D9").unwrap();
        let keyid: KeyID = fp.into();
        assert_eq!(keyid.to_hex(), "AACB3243630052D9");
    }

    #[test]
    fn wildcard() {
        assert!(KeyID::wildcard().is_wildcard());
        assert!(!KeyID::new(1).is_wildcard());
    }
}
