//! Symmetric-Key Encrypted Session Key packets.
//!
//! The session key is needed to decrypt the actual ciphertext.  See
//! [Section 5.3 of RFC 4880] for details.
//!
//!   [Section 5.3 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.3

use std::ops::{Deref, DerefMut};

use crate::Result;
use crate::crypto;
use crate::crypto::S2K;
use crate::crypto::Password;
use crate::crypto::SessionKey;
use crate::crypto::mem::Protected;
use crate::Error;
use crate::types::{
    AEADAlgorithm,
    SymmetricAlgorithm,
};
use crate::packet::{self, SKESK};
use crate::Packet;

/// Holds a symmetrically encrypted session key version 4.
///
/// Holds a symmetrically encrypted session key.  The session key is
/// needed to decrypt the actual ciphertext.  See [Section 5.3 of RFC
/// 4880] for details.
///
///   [Section 5.3 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.3
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SKESK4 {
    /// CTB packet header fields.
    pub(crate) common: packet::Common,
    /// Packet version. Must be 4 or 5.
    ///
    /// This struct is also used by SKESK5, hence we have a version
    /// field.
    version: u8,
    /// Symmetric algorithm used to encrypt the session key.
    sym_algo: SymmetricAlgorithm,
    /// Key derivation method for the symmetric key.
    s2k: S2K,
    /// The encrypted session key.
    ///
    /// If we do not have the encrypted session key, either the
    /// session key is the result of the S2K function applied to the
    /// password, or this is a v5 packet whose esk is stored in the
    /// `SKESK5` structure.
    esk: Option<Vec<u8>>,
}
assert_send_and_sync!(SKESK4);

impl SKESK4 {
    /// Creates a new SKESK version 4 packet.
    ///
    /// The given symmetric algorithm is the one used to encrypt the
    /// session key.
    pub fn new(esk_algo: SymmetricAlgorithm, s2k: S2K,
               esk: Option<Vec<u8>>) -> Result<SKESK4> {
        Self::new_raw(esk_algo, s2k, esk.and_then(|esk| {
            if esk.is_empty() { None } else { Some(esk) }
        }))
    }

    fn new_raw(esk_algo: SymmetricAlgorithm, s2k: S2K,
               esk: Option<Vec<u8>>) -> Result<SKESK4> {
        Ok(SKESK4 {
            common: Default::default(),
            version: 4,
            sym_algo: esk_algo,
            s2k,
            esk,
        })
    }

    /// Creates a new SKESK4 packet with the given password.
    ///
    /// This function takes two [`SymmetricAlgorithm`] arguments: The
    /// first, `payload_algo`, is the algorithm used to encrypt the
    /// message's payload (i.e. the SEIP or AED packet), and the
    /// second, `esk_algo`, is used to encrypt the session key.
    /// Usually, one should use the same algorithm, but if they
    /// differ, the `esk_algo` should be at least as strong as the
    /// `payload_algo` as not to weaken the security of the payload
    /// encryption.
    ///
    ///   [`SymmetricAlgorithm`]: ../../types/enum.SymmetricAlgorithm.html
    pub fn with_password(payload_algo: SymmetricAlgorithm,
                         esk_algo: SymmetricAlgorithm,
                         s2k: S2K,
                         session_key: &SessionKey, password: &Password)
                         -> Result<SKESK4> {
        // Derive key and make a cipher.
        let key = s2k.derive_key(password, esk_algo.key_size()?)?;

        // We need to prefix the cipher specifier to the session key.
        let mut psk: Protected = vec![0; 1 + session_key.len()].into();
        psk[0] = payload_algo.into();
        psk[1..].copy_from_slice(session_key);
        let mut esk = psk.expose_into_unprotected_vec();

        // The ESK is encrypted in plain CFB mode with a zero IV.
        crypto::symmetric::encrypt_cfb(
            esk_algo, &key, &vec![0; esk_algo.block_size()?], &mut esk)?;

        SKESK4::new(esk_algo, s2k, Some(esk))
    }

    /// Gets the symmetric encryption algorithm.
    pub fn symmetric_algo(&self) -> SymmetricAlgorithm {
        self.sym_algo
    }

    /// Sets the symmetric encryption algorithm.
    pub fn set_symmetric_algo(&mut self, algo: SymmetricAlgorithm)
                              -> SymmetricAlgorithm {
        std::mem::replace(&mut self.sym_algo, algo)
    }

    /// Gets the key derivation method.
    pub fn s2k(&self) -> &S2K {
        &self.s2k
    }

    /// Sets the key derivation method.
    pub fn set_s2k(&mut self, s2k: S2K) -> S2K {
        std::mem::replace(&mut self.s2k, s2k)
    }

    /// Gets the encrypted session key.
    pub fn esk(&self) -> Option<&[u8]> {
        self.esk.as_ref().map(|esk| esk.as_slice())
    }

    /// Sets the encrypted session key.
    pub fn set_esk(&mut self, esk: Option<Vec<u8>>) -> Option<Vec<u8>> {
        std::mem::replace(&mut self.esk, esk)
    }

    /// Derives the key inside this SKESK4 from `password`.
    ///
    /// Returns a tuple of the symmetric cipher to use with the key
    /// and the key itself.
    pub fn decrypt(&self, password: &Password)
                   -> Result<(SymmetricAlgorithm, SessionKey)> {
        let key = self.s2k.derive_key(password,
                                      self.sym_algo.key_size()?)?;

        if let Some(esk) = self.esk() {
            // Use the derived key to decrypt the ESK.  Unlike SEIP,
            // don't use the prefix checksum which would be a quick
            // check of the password.
            let mut plain = esk.to_vec();
            crypto::symmetric::decrypt_cfb(
                self.sym_algo, &key,
                &vec![0; self.sym_algo.block_size()?],
                &mut plain)?;

            let sym = SymmetricAlgorithm::from(plain[0]);
            let key: SessionKey = Protected::from(&plain[1..]).into();
            Ok((sym, key))
        } else {
            // No ESK, we return the derived key.
            Ok((self.sym_algo, key))
        }
    }
}

impl From<SKESK4> for super::SKESK {
    fn from(p: SKESK4) -> Self {
        super::SKESK::V4(p)
    }
}

impl From<SKESK4> for Packet {
    fn from(s: SKESK4) -> Self {
        SKESK::from(s).into()
    }
}

/// Holds a symmetrically encrypted session key version 5.
///
/// Holds a symmetrically encrypted session key.  The session key is
/// needed to decrypt the actual ciphertext.  See [Section 5.5 of RFC
/// 4880bis] for details.
///
/// [Section 5.5 of RFC 4880bis]: https://tools.ietf.org/html/draft-ietf-openpgp-rfc4880bis-08#section-5.5
///
/// This feature is [experimental](../../index.html#experimental-features).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SKESK5 {
    /// Common fields.
    pub(crate) skesk4: SKESK4,
    /// AEAD algorithm.
    aead_algo: AEADAlgorithm,
    /// Initialization vector for the AEAD algorithm.
    aead_iv: Box<[u8]>,
    /// Digest for the AEAD algorithm.
    aead_digest: Box<[u8]>,
}
assert_send_and_sync!(SKESK5);

impl Deref for SKESK5 {
    type Target = SKESK4;

    fn deref(&self) -> &Self::Target {
        &self.skesk4
    }
}

impl DerefMut for SKESK5 {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.skesk4
    }
}

impl SKESK5 {
    /// Creates a new SKESK version 5 packet.
    pub fn new(esk_algo: SymmetricAlgorithm, esk_aead: AEADAlgorithm,
               s2k: S2K, iv: Box<[u8]>, esk: Vec<u8>,
               digest: Box<[u8]>)
               -> Result<Self> {
        Ok(SKESK5 {
            skesk4: SKESK4 {
                common: Default::default(),
                version: 5,
                sym_algo: esk_algo,
                s2k,
                esk: Some(esk),
            },
            aead_algo: esk_aead,
            aead_iv: iv,
            aead_digest: digest,
        })
    }

    /// Creates a new SKESK version 5 packet with the given password.
    pub fn with_password(payload_algo: SymmetricAlgorithm,
                         esk_algo: SymmetricAlgorithm,
                         esk_aead: AEADAlgorithm, s2k: S2K,
                         session_key: &SessionKey, password: &Password)
                         -> Result<Self> {
        // Derive the key-encryption key.
        let key = s2k.derive_key(password, esk_algo.key_size()?)?;

        // Encrypt the session key with the KEK.
        let mut iv = vec![0u8; esk_aead.iv_size()?];
        crypto::random(&mut iv);

        let ad = [0xc3, 5 /* Version */, esk_algo.into(),
                  esk_aead.into()];
        let mut ctx = esk_aead.context(esk_algo, &key, &iv)?;
        let mut esk_and_digest = Vec::with_capacity(
            session_key.len() + esk_aead.digest_size()?);
        ctx.encrypt_seal(&mut esk_and_digest, session_key, &ad)?;

        let digest_size = esk_aead.digest_size()?;
        let l = esk_and_digest.len() - digest_size;
        let digest = esk_and_digest[l..].to_vec();
        let mut esk = esk_and_digest;
        crate::vec_truncate(&mut esk, l);

        // The payload algorithm is conveyed in the SKESK's cipher
        // octet in the v5 encoding, there is no prefix octet.
        let _ = payload_algo;

        SKESK5::new(esk_algo, esk_aead, s2k, iv.into_boxed_slice(), esk,
                    digest.into_boxed_slice())
    }

    /// Derives the key inside this `SKESK5` from `password`.
    ///
    /// Returns a tuple containing a placeholder symmetric cipher and
    /// the key itself.  `SKESK5` packets do not contain the symmetric
    /// cipher algorithm and instead rely on the `AED` packet that
    /// contains it.
    pub fn decrypt(&self, password: &Password)
                   -> Result<(SymmetricAlgorithm, SessionKey)> {
        let key = self.s2k().derive_key(password,
                                        self.symmetric_algo().key_size()?)?;

        if let Some(esk) = self.esk() {
            let ad = [0xc3, 5 /* Version */,
                      self.symmetric_algo().into(),
                      self.aead_algo.into()];
            let mut ctx = self.aead_algo.context(self.symmetric_algo(),
                                                 &key, &self.aead_iv)?;

            let mut ciphertext = Vec::with_capacity(
                esk.len() + self.aead_digest.len());
            ciphertext.extend_from_slice(esk);
            ciphertext.extend_from_slice(&self.aead_digest);

            let mut plain = Vec::with_capacity(esk.len());
            ctx.decrypt_verify(&mut plain, &ciphertext, &ad)?;

            Ok((SymmetricAlgorithm::Unencrypted /* Meaningless.  */,
                Protected::from(plain).into()))
        } else {
            Err(Error::MalformedPacket(
                "No encrypted session key in v5 SKESK packet".into())
                .into())
        }
    }

    /// Gets the AEAD algorithm.
    pub fn aead_algo(&self) -> AEADAlgorithm {
        self.aead_algo
    }

    /// Sets the AEAD algorithm.
    pub fn set_aead_algo(&mut self, algo: AEADAlgorithm) -> AEADAlgorithm {
        std::mem::replace(&mut self.aead_algo, algo)
    }

    /// Gets the AEAD initialization vector.
    pub fn aead_iv(&self) -> &[u8] {
        &self.aead_iv
    }

    /// Sets the AEAD initialization vector.
    pub fn set_aead_iv(&mut self, iv: Box<[u8]>) -> Box<[u8]> {
        std::mem::replace(&mut self.aead_iv, iv)
    }

    /// Gets the AEAD digest.
    pub fn aead_digest(&self) -> &[u8] {
        &self.aead_digest
    }

    /// Sets the AEAD digest.
    pub fn set_aead_digest(&mut self, digest: Box<[u8]>) -> Box<[u8]> {
        std::mem::replace(&mut self.aead_digest, digest)
    }
}

impl From<SKESK5> for super::SKESK {
    fn from(p: SKESK5) -> Self {
        super::SKESK::V5(p)
    }
}

impl From<SKESK5> for Packet {
    fn from(s: SKESK5) -> Self {
        SKESK::from(s).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skesk4_password_roundtrip() {
        let sk = SessionKey::new(32);
        let skesk = SKESK4::with_password(
            SymmetricAlgorithm::AES256,
            SymmetricAlgorithm::AES256,
            S2K::default(),
            &sk,
            &"hello world".into()).unwrap();

        let (algo, key) = skesk.decrypt(&"hello world".into()).unwrap();
        assert_eq!(algo, SymmetricAlgorithm::AES256);
        assert_eq!(&key[..], &sk[..]);

        // The wrong password derives a wrong key.  SKESK4 has no
        // integrity protection, so decryption "succeeds".
        let (_, key) = skesk.decrypt(&"hello?".into()).unwrap();
        assert!(&key[..] != &sk[..]);
    }

    #[test]
    fn skesk4_without_esk() {
        let s2k = S2K::default();
        let skesk = SKESK4::new(SymmetricAlgorithm::AES256, s2k.clone(),
                                None).unwrap();
        let (algo, key) = skesk.decrypt(&"topsecret".into()).unwrap();
        assert_eq!(algo, SymmetricAlgorithm::AES256);
        assert_eq!(&key[..],
                   &s2k.derive_key(&"topsecret".into(), 32).unwrap()[..]);
    }

    #[test]
    fn skesk5_password_roundtrip() {
        let sk = SessionKey::new(32);
        let skesk = SKESK5::with_password(
            SymmetricAlgorithm::AES256,
            SymmetricAlgorithm::AES256,
            AEADAlgorithm::EAX,
            S2K::default(),
            &sk,
            &"bombe".into()).unwrap();

        let (_, key) = skesk.decrypt(&"bombe".into()).unwrap();
        assert_eq!(&key[..], &sk[..]);

        // Unlike v4, the wrong password is detected.
        assert!(skesk.decrypt(&"wrong".into()).is_err());
    }
}
