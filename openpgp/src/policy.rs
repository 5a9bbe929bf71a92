//! The configuration record and algorithm policy.
//!
//! Every top-level operation takes an immutable [`Config`]: it
//! carries the preferred algorithms for new artifacts, escape hatches
//! for working with legacy data, and the reject lists and strength
//! floors applied when verifying signatures, selecting keys, and
//! decrypting messages.  A process-wide default is available via
//! [`Config::global`], but operations never consult it implicitly;
//! the record is always passed explicitly.
//!
//!   [`Config`]: struct.Config.html
//!   [`Config::global`]: struct.Config.html#method.global

use std::collections::HashSet;
use std::time::{Duration, SystemTime};

use once_cell::sync::Lazy;

use crate::Error;
use crate::Result;
use crate::packet::Signature;
use crate::types::{
    AEADAlgorithm,
    CompressionAlgorithm,
    Curve,
    HashAlgorithm,
    SymmetricAlgorithm,
};

static GLOBAL: Lazy<Config> = Lazy::new(Config::default);

/// The configuration record.
///
/// A `Config` is immutable during an operation.  To customize it,
/// build one with the `set_*` methods, then pass it to the operations
/// that should use it.
#[derive(Clone, Debug)]
pub struct Config {
    /// Hash algorithm for new signatures.
    preferred_hash_algorithm: HashAlgorithm,
    /// Symmetric algorithm for new encrypted messages.
    preferred_symmetric_algorithm: SymmetricAlgorithm,
    /// Compression algorithm for new messages.
    preferred_compression_algorithm: CompressionAlgorithm,
    /// AEAD mode for new messages, if `aead_protect` is set.
    preferred_aead_algorithm: AEADAlgorithm,

    /// Whether new messages use the AEAD encrypted data packet
    /// instead of the SEIP packet.
    aead_protect: bool,
    /// The chunk size octet for new AEAD messages.
    aead_chunk_size_byte: u8,

    /// The coded S2K iteration count for new password-protected
    /// artifacts.
    s2k_iteration_count_byte: u8,
    /// The deflate compression level.
    deflate_level: u32,

    /// Minimum number of bits for accepted RSA moduli.
    min_rsa_bits: usize,
    /// Curves that must not be used.
    reject_curves: HashSet<Curve>,
    /// Hash algorithms that must not be used at all.
    reject_hash_algorithms: HashSet<HashAlgorithm>,
    /// Hash algorithms that must not be used for message signatures.
    ///
    /// Collision attacks only matter where the attacker controls the
    /// hashed data, so this set is typically larger than
    /// `reject_hash_algorithms` which also covers self-signatures on
    /// keys.
    reject_message_hash_algorithms: HashSet<HashAlgorithm>,

    /// Whether messages without integrity protection (the legacy SED
    /// packet) may be decrypted.
    allow_unauthenticated_messages: bool,
    /// Whether decryption may use keys flagged for signing only.
    allow_insecure_decryption_with_signing_keys: bool,
    /// Whether the private-use GCM AEAD identifier is accepted.
    allow_experimental_gcm: bool,

    /// Whether PKCS#1 v1.5 decryption errors are replaced by a random
    /// session key, so that the error path is indistinguishable to a
    /// timing observer.
    constant_time_pkcs1_decryption: bool,
    /// The symmetric algorithms considered when synthesizing a random
    /// session key for the constant-time PKCS#1 path.
    constant_time_pkcs1_decryption_supported_symmetric_algorithms:
        HashSet<SymmetricAlgorithm>,

    /// Tolerated clock skew when checking that signature creation
    /// times are not in the future.
    clock_skew_tolerance: Duration,
}
assert_send_and_sync!(Config);

impl Default for Config {
    fn default() -> Self {
        let mut reject_hash = HashSet::new();
        reject_hash.insert(HashAlgorithm::MD5);

        let mut reject_message_hash = HashSet::new();
        reject_message_hash.insert(HashAlgorithm::MD5);
        reject_message_hash.insert(HashAlgorithm::SHA1);
        reject_message_hash.insert(HashAlgorithm::RipeMD);

        let mut ct_pkcs1_algos = HashSet::new();
        ct_pkcs1_algos.insert(SymmetricAlgorithm::AES128);
        ct_pkcs1_algos.insert(SymmetricAlgorithm::AES192);
        ct_pkcs1_algos.insert(SymmetricAlgorithm::AES256);

        Config {
            preferred_hash_algorithm: HashAlgorithm::SHA256,
            preferred_symmetric_algorithm: SymmetricAlgorithm::AES256,
            preferred_compression_algorithm:
                CompressionAlgorithm::Uncompressed,
            preferred_aead_algorithm: AEADAlgorithm::EAX,
            aead_protect: false,
            aead_chunk_size_byte: 12,
            s2k_iteration_count_byte: 0xe1,
            deflate_level: 6,
            min_rsa_bits: 2047,
            reject_curves: Default::default(),
            reject_hash_algorithms: reject_hash,
            reject_message_hash_algorithms: reject_message_hash,
            allow_unauthenticated_messages: false,
            allow_insecure_decryption_with_signing_keys: false,
            allow_experimental_gcm: false,
            constant_time_pkcs1_decryption: false,
            constant_time_pkcs1_decryption_supported_symmetric_algorithms:
                ct_pkcs1_algos,
            clock_skew_tolerance: Duration::new(30 * 60, 0),
        }
    }
}

impl Config {
    /// Returns the process-wide default configuration.
    pub fn global() -> &'static Config {
        &GLOBAL
    }

    /// Returns the hash algorithm for new signatures.
    pub fn preferred_hash_algorithm(&self) -> HashAlgorithm {
        self.preferred_hash_algorithm
    }

    /// Sets the hash algorithm for new signatures.
    pub fn set_preferred_hash_algorithm(mut self, algo: HashAlgorithm)
                                        -> Self {
        self.preferred_hash_algorithm = algo;
        self
    }

    /// Returns the symmetric algorithm for new messages.
    pub fn preferred_symmetric_algorithm(&self) -> SymmetricAlgorithm {
        self.preferred_symmetric_algorithm
    }

    /// Sets the symmetric algorithm for new messages.
    pub fn set_preferred_symmetric_algorithm(
        mut self, algo: SymmetricAlgorithm) -> Self {
        self.preferred_symmetric_algorithm = algo;
        self
    }

    /// Returns the compression algorithm for new messages.
    pub fn preferred_compression_algorithm(&self) -> CompressionAlgorithm {
        self.preferred_compression_algorithm
    }

    /// Sets the compression algorithm for new messages.
    pub fn set_preferred_compression_algorithm(
        mut self, algo: CompressionAlgorithm) -> Self {
        self.preferred_compression_algorithm = algo;
        self
    }

    /// Returns the AEAD mode for new messages.
    pub fn preferred_aead_algorithm(&self) -> AEADAlgorithm {
        self.preferred_aead_algorithm
    }

    /// Sets the AEAD mode for new messages.
    pub fn set_preferred_aead_algorithm(mut self, algo: AEADAlgorithm)
                                        -> Self {
        self.preferred_aead_algorithm = algo;
        self
    }

    /// Returns whether new messages use AEAD encryption.
    pub fn aead_protect(&self) -> bool {
        self.aead_protect
    }

    /// Sets whether new messages use AEAD encryption.
    pub fn set_aead_protect(mut self, v: bool) -> Self {
        self.aead_protect = v;
        self
    }

    /// Returns the chunk size octet for new AEAD messages.
    pub fn aead_chunk_size_byte(&self) -> u8 {
        self.aead_chunk_size_byte
    }

    /// Sets the chunk size octet for new AEAD messages.
    ///
    /// Valid values are 0 to 56, yielding chunks of `2^(value + 6)`
    /// bytes.
    pub fn set_aead_chunk_size_byte(mut self, v: u8) -> Result<Self> {
        if v > 56 {
            return Err(Error::InvalidArgument(
                format!("AEAD chunk size octet out of range: {}", v))
                       .into());
        }
        self.aead_chunk_size_byte = v;
        Ok(self)
    }

    /// Returns the coded S2K iteration count.
    pub fn s2k_iteration_count_byte(&self) -> u8 {
        self.s2k_iteration_count_byte
    }

    /// Sets the coded S2K iteration count.
    pub fn set_s2k_iteration_count_byte(mut self, v: u8) -> Self {
        self.s2k_iteration_count_byte = v;
        self
    }

    /// Returns the deflate compression level.
    pub fn deflate_level(&self) -> u32 {
        self.deflate_level
    }

    /// Sets the deflate compression level (1-9).
    pub fn set_deflate_level(mut self, v: u32) -> Result<Self> {
        if !(1..=9).contains(&v) {
            return Err(Error::InvalidArgument(
                format!("deflate level out of range: {}", v)).into());
        }
        self.deflate_level = v;
        Ok(self)
    }

    /// Returns the minimum number of bits for accepted RSA moduli.
    pub fn min_rsa_bits(&self) -> usize {
        self.min_rsa_bits
    }

    /// Sets the minimum number of bits for accepted RSA moduli.
    pub fn set_min_rsa_bits(mut self, v: usize) -> Self {
        self.min_rsa_bits = v;
        self
    }

    /// Rejects the given curve.
    pub fn reject_curve(mut self, curve: Curve) -> Self {
        self.reject_curves.insert(curve);
        self
    }

    /// Rejects the given hash algorithm for all purposes.
    pub fn reject_hash_algorithm(mut self, algo: HashAlgorithm) -> Self {
        self.reject_hash_algorithms.insert(algo);
        self
    }

    /// Rejects the given hash algorithm for message signatures.
    pub fn reject_message_hash_algorithm(mut self, algo: HashAlgorithm)
                                         -> Self {
        self.reject_message_hash_algorithms.insert(algo);
        self
    }

    /// Accepts the given hash algorithm for all purposes.
    pub fn accept_hash_algorithm(mut self, algo: HashAlgorithm) -> Self {
        self.reject_hash_algorithms.remove(&algo);
        self.reject_message_hash_algorithms.remove(&algo);
        self
    }

    /// Returns whether unauthenticated messages may be decrypted.
    pub fn allow_unauthenticated_messages(&self) -> bool {
        self.allow_unauthenticated_messages
    }

    /// Sets whether unauthenticated messages may be decrypted.
    ///
    /// The legacy SED packet offers no integrity protection; its
    /// ciphertext is malleable.  Only enable this to recover
    /// historical data.
    pub fn set_allow_unauthenticated_messages(mut self, v: bool) -> Self {
        self.allow_unauthenticated_messages = v;
        self
    }

    /// Returns whether decryption may use signing-only keys.
    pub fn allow_insecure_decryption_with_signing_keys(&self) -> bool {
        self.allow_insecure_decryption_with_signing_keys
    }

    /// Sets whether decryption may use signing-only keys.
    pub fn set_allow_insecure_decryption_with_signing_keys(
        mut self, v: bool) -> Self {
        self.allow_insecure_decryption_with_signing_keys = v;
        self
    }

    /// Returns whether the private-use GCM AEAD identifier is
    /// accepted.
    pub fn allow_experimental_gcm(&self) -> bool {
        self.allow_experimental_gcm
    }

    /// Sets whether the private-use GCM AEAD identifier is accepted.
    ///
    /// GCM uses identifier 100 from the private-use space; a future
    /// revision of the standard may assign it differently.
    pub fn set_allow_experimental_gcm(mut self, v: bool) -> Self {
        self.allow_experimental_gcm = v;
        self
    }

    /// Returns whether PKCS#1 v1.5 decryption is done in constant
    /// time.
    pub fn constant_time_pkcs1_decryption(&self) -> bool {
        self.constant_time_pkcs1_decryption
    }

    /// Sets whether PKCS#1 v1.5 decryption is done in constant time.
    ///
    /// If set, a failed session key decryption is replaced by a
    /// random session key, and the failure surfaces later as an
    /// integrity error, so that the padding check is not observable
    /// as a timing difference (countering Bleichenbacher-style
    /// oracles).
    pub fn set_constant_time_pkcs1_decryption(mut self, v: bool) -> Self {
        self.constant_time_pkcs1_decryption = v;
        self
    }

    /// Returns the symmetric algorithms considered by the
    /// constant-time PKCS#1 path.
    pub fn constant_time_pkcs1_decryption_supported_symmetric_algorithms(
        &self) -> &HashSet<SymmetricAlgorithm> {
        &self.constant_time_pkcs1_decryption_supported_symmetric_algorithms
    }

    /// Sets the symmetric algorithms considered by the constant-time
    /// PKCS#1 path.
    pub fn set_constant_time_pkcs1_decryption_supported_symmetric_algorithms(
        mut self, algos: HashSet<SymmetricAlgorithm>) -> Self {
        self.constant_time_pkcs1_decryption_supported_symmetric_algorithms =
            algos;
        self
    }

    /// Returns the tolerated clock skew.
    pub fn clock_skew_tolerance(&self) -> Duration {
        self.clock_skew_tolerance
    }

    /// Sets the tolerated clock skew.
    pub fn set_clock_skew_tolerance(mut self, v: Duration) -> Self {
        self.clock_skew_tolerance = v;
        self
    }
}

/// Policy checks.
impl Config {
    /// Checks whether the given hash algorithm is acceptable.
    ///
    /// `for_message` selects the stricter message-signature reject
    /// list.
    pub fn check_hash(&self, algo: HashAlgorithm, for_message: bool)
                      -> Result<()> {
        if self.reject_hash_algorithms.contains(&algo)
            || (for_message
                && self.reject_message_hash_algorithms.contains(&algo))
        {
            return Err(Error::PolicyViolation(algo.to_string(), None)
                       .into());
        }
        Ok(())
    }

    /// Checks whether the given symmetric algorithm is acceptable.
    pub fn check_symmetric(&self, algo: SymmetricAlgorithm) -> Result<()> {
        if !algo.is_supported() {
            return Err(Error::UnsupportedSymmetricAlgorithm(algo).into());
        }
        Ok(())
    }

    /// Checks whether the given AEAD mode is acceptable.
    pub fn check_aead(&self, algo: AEADAlgorithm) -> Result<()> {
        match algo {
            AEADAlgorithm::GCM if !self.allow_experimental_gcm =>
                Err(Error::PolicyViolation(
                    "GCM uses a private-use identifier; \
                     enable allow_experimental_gcm to use it".into(),
                    None).into()),
            a if !a.is_supported() =>
                Err(Error::UnsupportedAEADAlgorithm(a).into()),
            _ => Ok(()),
        }
    }

    /// Checks whether the given key is acceptable.
    ///
    /// This applies the RSA strength floor and the curve reject list.
    pub fn check_key<P, R>(&self, key: &crate::packet::Key<P, R>)
                           -> Result<()>
        where P: crate::packet::key::KeyParts,
              R: crate::packet::key::KeyRole,
    {
        use crate::crypto::mpi::PublicKey as M;

        match key.mpis() {
            M::RSA { n, .. } => {
                if n.bits() < self.min_rsa_bits {
                    return Err(Error::PolicyViolation(
                        format!("RSA-{} is below the configured minimum \
                                 of RSA-{}", n.bits(), self.min_rsa_bits),
                        None).into());
                }
            }
            M::EdDSA { curve, .. }
            | M::ECDSA { curve, .. }
            | M::ECDH { curve, .. } => {
                if self.reject_curves.contains(curve) {
                    return Err(Error::PolicyViolation(
                        curve.to_string(), None).into());
                }
            }
            _ => (),
        }

        Ok(())
    }

    /// Checks whether the given signature is acceptable.
    ///
    /// This checks the hash algorithm against the reject lists, and
    /// the creation time against the clock (with the configured
    /// tolerance).
    pub fn check_signature(&self, sig: &Signature, for_message: bool)
                           -> Result<()> {
        self.check_hash(sig.hash_algo(), for_message)?;

        match sig.signature_creation_time() {
            None => return Err(Error::BadSignature(
                "no creation time subpacket".into()).into()),
            Some(ct) if ct > SystemTime::now()
                + self.clock_skew_tolerance =>
            {
                return Err(Error::BadSignature(
                    format!("creation time is in the future: {:?}", ct))
                           .into());
            }
            Some(_) => (),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = Config::default();
        assert_eq!(c.preferred_hash_algorithm(), HashAlgorithm::SHA256);
        assert_eq!(c.preferred_symmetric_algorithm(),
                   SymmetricAlgorithm::AES256);
        assert_eq!(c.preferred_compression_algorithm(),
                   CompressionAlgorithm::Uncompressed);
        assert_eq!(c.preferred_aead_algorithm(), AEADAlgorithm::EAX);
        assert_eq!(c.min_rsa_bits(), 2047);
        assert!(!c.allow_unauthenticated_messages());
        assert!(!c.allow_experimental_gcm());
    }

    #[test]
    fn hash_rejection() {
        let c = Config::default();
        assert!(c.check_hash(HashAlgorithm::SHA256, true).is_ok());
        assert!(c.check_hash(HashAlgorithm::MD5, false).is_err());
        // SHA-1 is still accepted for self signatures, but not for
        // messages.
        assert!(c.check_hash(HashAlgorithm::SHA1, false).is_ok());
        assert!(c.check_hash(HashAlgorithm::SHA1, true).is_err());

        let c = c.accept_hash_algorithm(HashAlgorithm::SHA1);
        assert!(c.check_hash(HashAlgorithm::SHA1, true).is_ok());
    }

    #[test]
    fn gcm_is_gated() {
        let c = Config::default();
        assert!(c.check_aead(AEADAlgorithm::EAX).is_ok());
        assert!(c.check_aead(AEADAlgorithm::GCM).is_err());
        let c = c.set_allow_experimental_gcm(true);
        assert!(c.check_aead(AEADAlgorithm::GCM).is_ok());
    }
}
