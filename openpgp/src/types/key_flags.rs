//! Describes how a key may be used.

use std::fmt;

#[cfg(test)]
use quickcheck::{Arbitrary, Gen};

use crate::types::Bitfield;

/// Describes how a key may be used, and stores additional information.
///
/// Key flags are described in [Section 5.2.3.21 of RFC 4880] and
/// [Section 5.2.3.22 of RFC 4880bis].
///
/// [Section 5.2.3.21 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.2.3.21
/// [Section 5.2.3.22 of RFC 4880bis]: https://tools.ietf.org/html/draft-ietf-openpgp-rfc4880bis-08#section-5.2.3.22
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct KeyFlags(Bitfield);
assert_send_and_sync!(KeyFlags);

impl fmt::Debug for KeyFlags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.for_certification() {
            f.write_str("C")?;
        }
        if self.for_signing() {
            f.write_str("S")?;
        }
        if self.for_transport_encryption() {
            f.write_str("Et")?;
        }
        if self.for_storage_encryption() {
            f.write_str("Es")?;
        }
        if self.for_authentication() {
            f.write_str("A")?;
        }
        if self.is_split_key() {
            f.write_str("D")?;
        }
        if self.is_group_key() {
            f.write_str("G")?;
        }

        let mut need_space = false;
        for i in self.0.iter_set() {
            if i > KEY_FLAG_GROUP_KEY_BIT {
                if need_space {
                    f.write_str(" ")?;
                } else {
                    need_space = true;
                }
                write!(f, "+0x{:x}", i)?;
            }
        }

        Ok(())
    }
}

const KEY_FLAG_CERTIFY_BIT: usize = 0;
const KEY_FLAG_SIGN_BIT: usize = 1;
const KEY_FLAG_ENCRYPT_FOR_TRANSPORT_BIT: usize = 2;
const KEY_FLAG_ENCRYPT_AT_REST_BIT: usize = 3;
const KEY_FLAG_SPLIT_KEY_BIT: usize = 4;
const KEY_FLAG_AUTHENTICATE_BIT: usize = 5;
const KEY_FLAG_GROUP_KEY_BIT: usize = 7;

impl KeyFlags {
    /// Creates a new instance from `bytes`.
    pub fn new<B: AsRef<[u8]>>(bytes: B) -> Self {
        KeyFlags(bytes.as_ref().to_vec().into())
    }

    /// Creates a new instance with all flags cleared.
    pub fn empty() -> Self {
        Self::new([0])
    }

    /// Returns a slice containing the raw values.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Compares two key flag sets for semantic equality, ignoring
    /// padding.
    pub fn normalized_eq(&self, other: &Self) -> bool {
        self.0.normalized_eq(&other.0)
    }

    /// This key may be used to certify other keys.
    pub fn for_certification(&self) -> bool {
        self.0.get(KEY_FLAG_CERTIFY_BIT)
    }

    /// Declares that this key may be used to certify other keys.
    pub fn set_certification(mut self) -> Self {
        self.0.set(KEY_FLAG_CERTIFY_BIT);
        self
    }

    /// This key may be used to sign data.
    pub fn for_signing(&self) -> bool {
        self.0.get(KEY_FLAG_SIGN_BIT)
    }

    /// Declares that this key may be used to sign data.
    pub fn set_signing(mut self) -> Self {
        self.0.set(KEY_FLAG_SIGN_BIT);
        self
    }

    /// This key may be used to encrypt communications.
    pub fn for_transport_encryption(&self) -> bool {
        self.0.get(KEY_FLAG_ENCRYPT_FOR_TRANSPORT_BIT)
    }

    /// Declares that this key may be used to encrypt communications.
    pub fn set_transport_encryption(mut self) -> Self {
        self.0.set(KEY_FLAG_ENCRYPT_FOR_TRANSPORT_BIT);
        self
    }

    /// This key may be used to encrypt storage.
    pub fn for_storage_encryption(&self) -> bool {
        self.0.get(KEY_FLAG_ENCRYPT_AT_REST_BIT)
    }

    /// Declares that this key may be used to encrypt storage.
    pub fn set_storage_encryption(mut self) -> Self {
        self.0.set(KEY_FLAG_ENCRYPT_AT_REST_BIT);
        self
    }

    /// This key may be used for authentication.
    pub fn for_authentication(&self) -> bool {
        self.0.get(KEY_FLAG_AUTHENTICATE_BIT)
    }

    /// Declares that this key may be used for authentication.
    pub fn set_authentication(mut self) -> Self {
        self.0.set(KEY_FLAG_AUTHENTICATE_BIT);
        self
    }

    /// The private component of this key may have been split using a
    /// secret-sharing mechanism.
    pub fn is_split_key(&self) -> bool {
        self.0.get(KEY_FLAG_SPLIT_KEY_BIT)
    }

    /// Declares that the private component of this key may have been
    /// split using a secret-sharing mechanism.
    pub fn set_split_key(mut self) -> Self {
        self.0.set(KEY_FLAG_SPLIT_KEY_BIT);
        self
    }

    /// The private component of this key may be in possession of more
    /// than one person.
    pub fn is_group_key(&self) -> bool {
        self.0.get(KEY_FLAG_GROUP_KEY_BIT)
    }

    /// Declares that the private component of this key is in
    /// possession of more than one person.
    pub fn set_group_key(mut self) -> Self {
        self.0.set(KEY_FLAG_GROUP_KEY_BIT);
        self
    }

    /// Returns whether no flags are set.
    pub fn is_empty(&self) -> bool {
        self.as_bytes().iter().all(|b| *b == 0)
    }
}

#[cfg(test)]
impl Arbitrary for KeyFlags {
    fn arbitrary(g: &mut Gen) -> Self {
        Self::new(Vec::arbitrary(g))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let f = KeyFlags::empty().set_signing().set_certification();
        assert!(f.for_signing());
        assert!(f.for_certification());
        assert!(!f.for_transport_encryption());
        assert_eq!(f.as_bytes(), &[0x03]);
    }

    #[test]
    fn padding_is_ignored() {
        let a = KeyFlags::new([0x02]);
        let b = KeyFlags::new([0x02, 0x00]);
        assert!(a.normalized_eq(&b));
        assert!(a != b);
    }
}
