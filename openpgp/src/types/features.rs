//! Describes the features supported by an OpenPGP implementation.

use std::fmt;

#[cfg(test)]
use quickcheck::{Arbitrary, Gen};

use crate::types::Bitfield;

/// Describes the features supported by an OpenPGP implementation.
///
/// The feature flags are defined in [Section 5.2.3.24 of RFC 4880],
/// and [Section 5.2.3.25 of RFC 4880bis].
///
/// [Section 5.2.3.24 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.2.3.24
/// [Section 5.2.3.25 of RFC 4880bis]: https://tools.ietf.org/html/draft-ietf-openpgp-rfc4880bis-08#section-5.2.3.25
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Features(Bitfield);
assert_send_and_sync!(Features);

impl fmt::Debug for Features {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.supports_mdc() {
            f.write_str("MDC")?;
        }
        if self.supports_aead() {
            f.write_str(" AEAD")?;
        }

        let mut need_space = false;
        for i in self.0.iter_set() {
            if i > FEATURE_FLAG_AEAD_BIT {
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

const FEATURE_FLAG_MDC_BIT: usize = 0;
const FEATURE_FLAG_AEAD_BIT: usize = 1;

impl Features {
    /// Creates a new instance from `bytes`.
    pub fn new<B: AsRef<[u8]>>(bytes: B) -> Self {
        Features(bytes.as_ref().to_vec().into())
    }

    /// Creates a new feature set describing this crate's support.
    pub fn supported() -> Self {
        Self::empty().set_mdc().set_aead()
    }

    /// Creates a new instance with all flags cleared.
    pub fn empty() -> Self {
        Self::new([0])
    }

    /// Returns a slice containing the raw values.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Compares two feature sets for semantic equality, ignoring
    /// padding.
    pub fn normalized_eq(&self, other: &Self) -> bool {
        self.0.normalized_eq(&other.0)
    }

    /// Whether or not MDC is supported.
    pub fn supports_mdc(&self) -> bool {
        self.0.get(FEATURE_FLAG_MDC_BIT)
    }

    /// Declares that MDC is supported.
    pub fn set_mdc(mut self) -> Self {
        self.0.set(FEATURE_FLAG_MDC_BIT);
        self
    }

    /// Whether or not AEAD is supported.
    pub fn supports_aead(&self) -> bool {
        self.0.get(FEATURE_FLAG_AEAD_BIT)
    }

    /// Declares that AEAD is supported.
    pub fn set_aead(mut self) -> Self {
        self.0.set(FEATURE_FLAG_AEAD_BIT);
        self
    }
}

#[cfg(test)]
impl Arbitrary for Features {
    fn arbitrary(g: &mut Gen) -> Self {
        Self::new(Vec::arbitrary(g))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_query() {
        let f = Features::empty().set_mdc();
        assert!(f.supports_mdc());
        assert!(!f.supports_aead());
        assert_eq!(f.as_bytes(), &[0x01]);
        assert!(f.normalized_eq(&Features::new([0x01, 0x00])));
    }
}
