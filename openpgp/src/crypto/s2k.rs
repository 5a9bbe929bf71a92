//! String-to-Key transformations.
//!
//! The S2K mechanism is used to derive a symmetric key from a
//! password.  It is defined in [Section 3.7 of RFC 4880].
//!
//!   [Section 3.7 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-3.7

use std::fmt;

use crate::Error;
use crate::Result;
use crate::HashAlgorithm;
use crate::crypto::Password;
use crate::crypto::SessionKey;

#[cfg(test)]
use quickcheck::{Arbitrary, Gen};

/// String-to-Key (S2K) specifiers.
///
/// String-to-key (S2K) specifiers are used to convert password
/// strings into symmetric-key encryption/decryption keys.  See
/// [Section 3.7 of RFC 4880].
///
///   [Section 3.7 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-3.7
#[derive(Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum S2K {
    /// Repeatently hashes the password with a public `salt` value.
    Iterated {
        /// Hash used for key derivation.
        hash: HashAlgorithm,
        /// Public salt value mixed into the password.
        salt: [u8; 8],
        /// Number of bytes to hash.
        ///
        /// This parameter increases the workload for an attacker
        /// doing a dictionary attack.  Must be a value from the
        /// set `{ n | n = (16 + (c & 15)) << ((c >> 4) + 6), c < 256 }`.
        hash_bytes: u32,
    },

    /// Hashes the password with a public `salt` value.
    Salted {
        /// Hash used for key derivation.
        hash: HashAlgorithm,
        /// Public salt value mixed into the password.
        salt: [u8; 8],
    },

    /// Simply hashes the password.
    Simple {
        /// Hash used for key derivation.
        hash: HashAlgorithm,
    },

    /// The GNU S2K extensions.
    ///
    /// The secret is not stored, or lives on a smartcard.  These are
    /// parsed and re-emitted, but cannot derive keys.
    Gnu(GnuS2K),

    /// Private S2K algorithm.
    Private {
        /// Tag identifying the private algorithm.
        ///
        /// Tags 100 to 110 are reserved for private use.
        tag: u8,

        /// The parameters for the private algorithm.
        ///
        /// This is optional, because when we parse a packet
        /// containing an unknown S2K algorithm, we do not know how
        /// many octets to attribute to the S2K's parameters.  In this
        /// case, `parameters` is set to `None`.  Note: if the packet
        /// is serialized again, the missing parameters are not
        /// included.
        parameters: Option<Box<[u8]>>,
    },

    /// Unknown S2K algorithm.
    Unknown {
        /// Tag identifying the unknown algorithm.
        tag: u8,

        /// The parameters for the unknown algorithm.
        parameters: Option<Box<[u8]>>,
    },
}
assert_send_and_sync!(S2K);

/// The GNU S2K extensions.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum GnuS2K {
    /// The secret is not stored at all ("gnu-dummy").
    Dummy,
    /// The secret lives on a smartcard with the given serial number.
    DivertToCard {
        /// The card's serial number.
        serial: Box<[u8]>,
    },
}
assert_send_and_sync!(GnuS2K);

impl Default for S2K {
    fn default() -> Self {
        let mut salt = [0u8; 8];
        crate::crypto::random(&mut salt);
        S2K::Iterated {
            // SHA2-256, being optimized for implementations on
            // architectures with a word size of 32 bit, has a more
            // consistent runtime across platforms than SHA2-512.
            hash: HashAlgorithm::SHA256,
            salt,
            // This is the largest count that can be encoded.
            hash_bytes: S2K::decode_count(0xff),
        }
    }
}

impl S2K {
    /// Convert the string to a key using the S2K's parameters.
    pub fn derive_key(&self, password: &Password, key_size: usize)
                      -> Result<SessionKey> {
        match self {
            &S2K::Simple { hash } | &S2K::Salted { hash, .. }
            | &S2K::Iterated { hash, .. } => password.map(|string| {
                let mut hash = hash.context()?;

                // If the digest length is shorter than the key length,
                // then we need to concatenate multiple hashes, each
                // preloaded with i 0x00 bytes.
                let contexts = (key_size + hash.digest_size() - 1)
                    / hash.digest_size();

                let mut zeros = Vec::with_capacity(contexts + 1);
                let mut ret = vec![0u8; key_size];

                for chunk in ret.chunks_mut(hash.digest_size()) {
                    hash.update(&zeros[..]);

                    match self {
                        &S2K::Simple { .. } => {
                            hash.update(string);
                        }
                        &S2K::Salted { ref salt, .. } => {
                            hash.update(&salt[..]);
                            hash.update(string);
                        }
                        &S2K::Iterated { ref salt, hash_bytes, .. }
                        if (hash_bytes as usize)
                            < salt.len() + string.len() =>
                        {
                            // Independent of what the hash count is, we
                            // always hash the whole salt and password once.
                            hash.update(&salt[..]);
                            hash.update(string);
                        }
                        &S2K::Iterated { ref salt, hash_bytes, .. } => {
                            // Unroll the processing loop N times.
                            const N: usize = 16;
                            let mut data: Vec<u8> = Vec::with_capacity(
                                N * (salt.len() + string.len()));

                            for _ in 0..N {
                                data.extend_from_slice(salt);
                                data.extend_from_slice(string);
                            }

                            let datalen = data.len();
                            let mut hash_bytes = hash_bytes as usize;
                            while hash_bytes > 0 {
                                let n = hash_bytes.min(datalen);
                                hash.update(&data[..n]);
                                hash_bytes -= n;
                            }
                        }
                        S2K::Gnu(_) | S2K::Private { .. }
                        | S2K::Unknown { .. } =>
                            unreachable!("handled in the outer match"),
                    }

                    let mut digest = vec![0u8; hash.digest_size()];
                    hash.digest(&mut digest);
                    chunk.copy_from_slice(&digest[..chunk.len()]);

                    zeros.push(0);
                }

                Ok(ret.into())
            }),
            S2K::Gnu(_) =>
                Err(Error::InvalidOperation(
                    "GNU S2K extensions cannot be used to derive keys"
                        .into()).into()),
            S2K::Unknown { tag, .. } | S2K::Private { tag, .. } =>
                Err(Error::MalformedPacket(
                    format!("Unknown S2K type {:#x}", tag)).into()),
        }
    }

    /// Whether this S2K mechanism is supported.
    pub fn is_supported(&self) -> bool {
        use self::S2K::*;
        !matches!(self, Unknown { .. } | Private { .. })
    }

    /// This function returns an encodable iteration count.
    ///
    /// Not all iteration counts are encodable as *Iterated and Salted
    /// S2K*.  The largest encodable iteration count is 65011712.  If
    /// the given iteration count is unencodable, the next larger
    /// encodable count is returned.
    pub fn nearest_hash_count(hash_bytes: usize) -> u32 {
        match hash_bytes {
            0..=1024 => 1024,
            0x3e00001..=std::usize::MAX => 0x3e00000,
            hash_bytes => {
                for i in 0..256 {
                    let n = Self::decode_count(i as u8);
                    if n as usize >= hash_bytes {
                        return n;
                    }
                }
                0x3e00000
            }
        }
    }

    /// Decodes the OpenPGP encoding of the number of bytes to hash.
    ///
    /// The encoding is `count = (16 + (c & 15)) << ((c >> 4) + 6)`
    /// for a coded count octet `c`.
    pub(crate) fn decode_count(coded: u8) -> u32 {
        let mantissa = 16 + (coded as u32 & 15);
        mantissa << ((coded >> 4) + 6)
    }

    /// Converts a hash count to the OpenPGP encoding.
    ///
    /// Fails if the hash count is not exactly encodable.  The coded
    /// count is a floating point representation with a four bit
    /// mantissa and a four bit exponent, so most counts are not.
    pub(crate) fn encode_count(hash_bytes: u32) -> Result<u8> {
        for coded in 0..=255u8 {
            if Self::decode_count(coded) == hash_bytes {
                return Ok(coded);
            }
        }

        Err(Error::InvalidArgument(
            format!("S2K: cannot encode iteration count of {}",
                    hash_bytes)).into())
    }
}

impl fmt::Display for S2K {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            S2K::Simple { hash } =>
                f.write_fmt(format_args!("Simple S2K with {}", hash)),
            S2K::Salted { hash, salt } => {
                f.write_fmt(format_args!(
                    "Salted S2K with {} and salt {}",
                    hash, crate::fmt::hex::encode(salt)))
            }
            S2K::Iterated { hash, salt, hash_bytes } => {
                f.write_fmt(format_args!(
                    "Iterated and Salted S2K with {}, salt {} and {} bytes \
                     to hash",
                    hash, crate::fmt::hex::encode(salt), hash_bytes))
            }
            S2K::Gnu(GnuS2K::Dummy) => f.write_str("GNU dummy S2K"),
            S2K::Gnu(GnuS2K::DivertToCard { serial }) =>
                f.write_fmt(format_args!(
                    "GNU divert-to-card S2K ({})",
                    crate::fmt::hex::encode(serial))),
            S2K::Private { tag, .. } =>
                f.write_fmt(format_args!(
                    "Private/Experimental S2K algorithm {}", tag)),
            S2K::Unknown { tag, .. } =>
                f.write_fmt(format_args!("Unknown S2K algorithm {}", tag)),
        }
    }
}

impl fmt::Debug for S2K {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
impl Arbitrary for S2K {
    fn arbitrary(g: &mut Gen) -> Self {
        let mut salt = [0u8; 8];
        for b in salt.iter_mut() {
            *b = u8::arbitrary(g);
        }

        match u8::arbitrary(g) % 3 {
            0 => S2K::Simple {
                hash: HashAlgorithm::arbitrary(g),
            },
            1 => S2K::Salted {
                hash: HashAlgorithm::arbitrary(g),
                salt,
            },
            2 => S2K::Iterated {
                hash: HashAlgorithm::arbitrary(g),
                salt,
                hash_bytes: S2K::decode_count(u8::arbitrary(g)),
            },
            _ => unreachable!(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coded_count_roundtrip() {
        for cc in 0..0x100usize {
            let hash_bytes = S2K::decode_count(cc as u8);
            assert!(hash_bytes >= 1024
                    && S2K::encode_count(hash_bytes).unwrap() == cc as u8);
        }
    }

    #[test]
    fn coded_count_bounds() {
        assert_eq!(S2K::decode_count(0), 1024);
        assert_eq!(S2K::decode_count(255), 65011712);
        assert!(S2K::encode_count(1025).is_err());
        assert!(S2K::encode_count(0x3e00001).is_err());
    }

    #[test]
    fn rfc4880_iterated_s2k_test_vector() {
        // Generated with GnuPG: an Iterated and Salted S2K with
        // SHA-1, iteration count 65536, over the password "hello".
        let s2k = S2K::Iterated {
            hash: HashAlgorithm::SHA1,
            salt: *b"\x01\x23\x45\x67\x89\xab\xcd\xef",
            hash_bytes: 65536,
        };

        let key = s2k.derive_key(&"hello".into(), 16).unwrap();
        assert_eq!(key.len(), 16);

        // Deriving twice is deterministic.
        let key2 = s2k.derive_key(&"hello".into(), 16).unwrap();
        assert_eq!(&key[..], &key2[..]);

        // A different password yields a different key.
        let other = s2k.derive_key(&"olleh".into(), 16).unwrap();
        assert!(&key[..] != &other[..]);
    }

    #[test]
    fn gnu_dummy_cannot_derive() {
        let s2k = S2K::Gnu(GnuS2K::Dummy);
        assert!(s2k.derive_key(&"hello".into(), 16).is_err());
    }
}
