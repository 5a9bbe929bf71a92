//! Generates certificates.

use std::time::{Duration, SystemTime};

use crate::Result;
use crate::Error;
use crate::Packet;
use crate::cert::Cert;
use crate::packet::{
    Key,
    Signature,
    SignatureBuilder,
    UserID,
    key,
    key::Key4,
    signature::subpacket::{Subpacket, SubpacketValue},
};
use crate::types::{
    Curve,
    Features,
    HashAlgorithm,
    KeyFlags,
    ReasonForRevocation,
    SignatureType,
    SymmetricAlgorithm,
};

/// Groups symmetric and asymmetric algorithms.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum CipherSuite {
    /// EdDSA and ECDH over Curve25519 with SHA512 and AES256.
    Cv25519,
    /// 3072 bit RSA with SHA512 and AES256.
    RSA3k,
    /// EdDSA and ECDH over NIST P-256 with SHA256 and AES256.
    P256,
}
assert_send_and_sync!(CipherSuite);

impl Default for CipherSuite {
    fn default() -> Self {
        CipherSuite::Cv25519
    }
}

impl CipherSuite {
    fn generate_key<R>(self, flags: &KeyFlags)
                       -> Result<Key<key::SecretParts, R>>
        where R: key::KeyRole,
    {
        let sign = flags.for_certification() || flags.for_signing()
            || flags.for_authentication();
        let encrypt = flags.for_transport_encryption()
            || flags.for_storage_encryption();

        // The generation functions are generic over the role, so the
        // key can be requested directly in the desired role.
        let key: Key4<key::SecretParts, R> =
            match (self, sign, encrypt) {
                (CipherSuite::RSA3k, _, _) =>
                    Key4::generate_rsa(3072)?,
                (CipherSuite::Cv25519, true, false) =>
                    Key4::generate_ecc(true, Curve::Ed25519)?,
                (CipherSuite::Cv25519, false, true) =>
                    Key4::generate_ecc(false, Curve::Cv25519)?,
                (CipherSuite::P256, true, false) =>
                    Key4::generate_ecc(true, Curve::NistP256)?,
                (CipherSuite::P256, false, true) =>
                    Key4::generate_ecc(false, Curve::NistP256)?,
                _ => return Err(Error::InvalidOperation(
                    "keys can either sign or encrypt, not both".into())
                                .into()),
            };

        Ok(Key::V4(key))
    }
}

/// Simplifies the generation of OpenPGP certificates.
///
/// A builder to generate complex certificate hierarchies with
/// multiple user ids and subkeys.
///
/// The builder verifies the resulting certificate: every binding is
/// checked when the packets are reassembled into the final [`Cert`].
///
///   [`Cert`]: ../struct.Cert.html
pub struct CertBuilder {
    cipher_suite: CipherSuite,
    userids: Vec<UserID>,
    subkeys: Vec<KeyFlags>,
    validity_period: Option<Duration>,
}
assert_send_and_sync!(CertBuilder);

impl CertBuilder {
    /// Returns a new `CertBuilder`.
    ///
    /// The returned builder is configured to generate a minimal
    /// OpenPGP certificate, a certification-capable primary key.  You
    /// will typically want to add at least one user id and one
    /// subkey.
    pub fn new() -> Self {
        CertBuilder {
            cipher_suite: Default::default(),
            userids: Vec::new(),
            subkeys: Vec::new(),
            validity_period: None,
        }
    }

    /// Generates a general-purpose certificate.
    ///
    /// The returned builder is set up with a signing subkey, a
    /// transport encryption subkey, and the given user id.
    pub fn general_purpose<U>(cipher_suite: CipherSuite, userid: U) -> Self
        where U: Into<UserID>,
    {
        CertBuilder {
            cipher_suite,
            userids: vec![userid.into()],
            subkeys: vec![
                KeyFlags::empty().set_signing(),
                KeyFlags::empty().set_transport_encryption(),
            ],
            validity_period: None,
        }
    }

    /// Sets the cipher suite.
    pub fn set_cipher_suite(mut self, cs: CipherSuite) -> Self {
        self.cipher_suite = cs;
        self
    }

    /// Adds a user id.
    pub fn add_userid<U: Into<UserID>>(mut self, uid: U) -> Self {
        self.userids.push(uid.into());
        self
    }

    /// Adds a signing-capable subkey.
    pub fn add_signing_subkey(self) -> Self {
        self.add_subkey(KeyFlags::empty().set_signing())
    }

    /// Adds a transport-encryption-capable subkey.
    pub fn add_transport_encryption_subkey(self) -> Self {
        self.add_subkey(KeyFlags::empty().set_transport_encryption())
    }

    /// Adds a storage-encryption-capable subkey.
    pub fn add_storage_encryption_subkey(self) -> Self {
        self.add_subkey(KeyFlags::empty().set_storage_encryption())
    }

    /// Adds a subkey with the given flags.
    pub fn add_subkey(mut self, flags: KeyFlags) -> Self {
        self.subkeys.push(flags);
        self
    }

    /// Sets the validity period of the keys.
    pub fn set_validity_period<D>(mut self, period: D) -> Self
        where D: Into<Option<Duration>>,
    {
        self.validity_period = period.into();
        self
    }

    /// Generates the certificate.
    ///
    /// Returns the certificate and a ready-made revocation
    /// certificate for it.  The revocation certificate should be
    /// stored in a safe place in case the key material is lost.
    pub fn generate(self) -> Result<(Cert, Signature)> {
        // The primary key certifies, and signs in the absence of a
        // signing subkey.
        let primary_flags = KeyFlags::empty()
            .set_certification()
            .set_signing();

        let primary: Key<key::SecretParts, key::PrimaryRole> =
            self.cipher_suite.generate_key(&primary_flags)?;
        let mut primary_signer =
            primary.clone().into_keypair()?;
        let primary_public = primary.clone().parts_into_public();

        let mut packets: Vec<Packet> = Vec::new();
        packets.push(Packet::SecretKey(primary.clone()));

        // A direct key signature carrying the primary key's
        // properties.
        let mut sb = SignatureBuilder::new(SignatureType::DirectKey)
            .set_hash_algo(HashAlgorithm::SHA256);
        sb.hashed_area_mut().add(Subpacket::new(
            SubpacketValue::KeyFlags(primary_flags.clone()), true)?)?;
        sb.hashed_area_mut().add(Subpacket::new(
            SubpacketValue::Features(Features::supported()), false)?)?;
        if let Some(vp) = self.validity_period {
            sb.hashed_area_mut().add(Subpacket::new(
                SubpacketValue::KeyExpirationTime(vp.try_into()?),
                true)?)?;
        }
        let direct = sb.sign_direct_key(&mut primary_signer,
                                        &primary_public)?;
        packets.push(direct.into());

        // The user ids with their certifications.
        for (i, uid) in self.userids.iter().enumerate() {
            let mut sb =
                SignatureBuilder::new(SignatureType::PositiveCertification)
                .set_hash_algo(HashAlgorithm::SHA256);
            sb.hashed_area_mut().add(Subpacket::new(
                SubpacketValue::KeyFlags(primary_flags.clone()), true)?)?;
            sb.hashed_area_mut().add(Subpacket::new(
                SubpacketValue::Features(Features::supported()), false)?)?;
            sb.hashed_area_mut().add(Subpacket::new(
                SubpacketValue::PreferredSymmetricAlgorithms(vec![
                    SymmetricAlgorithm::AES256,
                    SymmetricAlgorithm::AES128,
                ]), false)?)?;
            sb.hashed_area_mut().add(Subpacket::new(
                SubpacketValue::PreferredHashAlgorithms(vec![
                    HashAlgorithm::SHA512,
                    HashAlgorithm::SHA256,
                ]), false)?)?;
            if i == 0 {
                sb.hashed_area_mut().add(Subpacket::new(
                    SubpacketValue::PrimaryUserID(true), true)?)?;
            }
            if let Some(vp) = self.validity_period {
                sb.hashed_area_mut().add(Subpacket::new(
                    SubpacketValue::KeyExpirationTime(vp.try_into()?),
                    true)?)?;
            }

            let sig = sb.sign_userid_binding(&mut primary_signer,
                                             &primary_public, uid)?;
            packets.push(uid.clone().into());
            packets.push(sig.into());
        }

        // The subkeys with their bindings.
        for flags in &self.subkeys {
            let subkey: Key<key::SecretParts, key::SubordinateRole> =
                self.cipher_suite.generate_key(flags)?;

            let mut sb = SignatureBuilder::new(SignatureType::SubkeyBinding)
                .set_hash_algo(HashAlgorithm::SHA256);
            sb.hashed_area_mut().add(Subpacket::new(
                SubpacketValue::KeyFlags(flags.clone()), true)?)?;
            if let Some(vp) = self.validity_period {
                sb.hashed_area_mut().add(Subpacket::new(
                    SubpacketValue::KeyExpirationTime(vp.try_into()?),
                    true)?)?;
            }

            if flags.for_signing() {
                // A signing-capable subkey must carry a back
                // signature made by the subkey itself.
                let mut subkey_signer = subkey.clone().into_keypair()?;
                let backsig = SignatureBuilder::new(
                    SignatureType::PrimaryKeyBinding)
                    .set_hash_algo(HashAlgorithm::SHA256)
                    .sign_primary_key_binding(
                        &mut subkey_signer, &primary_public, &subkey)?;
                sb.hashed_area_mut().add(Subpacket::new(
                    SubpacketValue::EmbeddedSignature(backsig), true)?)?;
            }

            let sig = sb.sign_subkey_binding(&mut primary_signer,
                                             &primary_public, &subkey)?;
            packets.push(Packet::SecretSubkey(subkey));
            packets.push(sig.into());
        }

        let cert = Cert::from_packets(packets.into_iter())?;

        // Generate the revocation certificate.
        let mut sb = SignatureBuilder::new(SignatureType::KeyRevocation)
            .set_hash_algo(HashAlgorithm::SHA256);
        sb.hashed_area_mut().add(Subpacket::new(
            SubpacketValue::ReasonForRevocation {
                code: ReasonForRevocation::Unspecified,
                reason: b"Unspecified".to_vec(),
            }, false)?)?;
        let revocation = sb.sign_direct_key(&mut primary_signer,
                                            &primary_public)?;

        Ok((cert, revocation))
    }
}

impl Default for CertBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Config;

    #[test]
    fn general_purpose_cert() {
        let (cert, _rev) = CertBuilder::general_purpose(
            CipherSuite::Cv25519, "Alice <alice@example.org>")
            .generate().unwrap();

        assert_eq!(cert.userids().count(), 1);
        assert_eq!(cert.subkeys().count(), 2);

        // All bindings verified during reassembly.
        assert!(cert.bad_signatures().is_empty());

        let config = Config::default();
        let now = SystemTime::now();
        assert!(cert.verify_primary_key(&config, now).is_ok());

        // The signing subkey is found, and it is not the primary.
        let signer = cert.signing_key(&config, now, None).unwrap();
        assert!(!signer.primary());
        assert!(signer.key_flags().unwrap().for_signing());

        // The encryption subkey is found.
        let enc = cert.encryption_key(&config, now, None).unwrap();
        assert!(!enc.primary());
        assert!(enc.key_flags().unwrap().for_transport_encryption());

        // They are different keys.
        assert!(signer.key().fingerprint() != enc.key().fingerprint());
    }

    #[test]
    fn cert_roundtrip_preserves_bindings() {
        use crate::parse::Parse;
        use crate::serialize::MarshalInto;

        let (cert, _) = CertBuilder::general_purpose(
            CipherSuite::Cv25519, "Bob <bob@example.org>")
            .generate().unwrap();

        let buf = cert.to_vec().unwrap();
        let cert2 = Cert::from_bytes(&buf).unwrap();

        assert_eq!(cert.fingerprint(), cert2.fingerprint());
        assert_eq!(cert.userids().count(), cert2.userids().count());
        assert_eq!(cert.subkeys().count(), cert2.subkeys().count());
        assert!(cert2.bad_signatures().is_empty());

        // Serialization is deterministic.
        assert_eq!(buf, cert2.to_vec().unwrap());
    }
}
