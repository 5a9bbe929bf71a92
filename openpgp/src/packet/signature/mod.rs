//! Signature packets.
//!
//! Signature packets are used both for certification purposes as well
//! as for document signing purposes.  See [Section 5.2 of RFC 4880]
//! for details.
//!
//!   [Section 5.2 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.2

use std::fmt;
use std::ops::{Deref, DerefMut};

use crate::Error;
use crate::Result;
use crate::crypto::{self, mpi, hash::{self, Hash}, Signer};
use crate::packet;
use crate::packet::{key, Key, UserID, UserAttribute};
use crate::Packet;
use crate::types::{
    HashAlgorithm,
    PublicKeyAlgorithm,
    SignatureType,
    Timestamp,
};

pub mod subpacket;
pub use subpacket::{
    NotationData,
    Subpacket,
    SubpacketArea,
    SubpacketAreas,
    SubpacketTag,
    SubpacketValue,
};

/// The fields of a signature packet that are covered by the hash.
///
/// The packet's version, type, algorithms, and subpacket areas feed
/// into the signature's hash together with the signed data; this
/// struct groups them so that signature creation (the builder), the
/// final signature, and rehashing during verification all operate on
/// the same data.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SignatureFields {
    /// Version of the signature packet. Must be 4.
    version: u8,
    /// Type of signature.
    typ: SignatureType,
    /// Public-key algorithm used for this signature.
    pk_algo: PublicKeyAlgorithm,
    /// Hash algorithm used to compute the signature.
    hash_algo: HashAlgorithm,
    /// Subpackets.
    subpackets: SubpacketAreas,
}
assert_send_and_sync!(SignatureFields);

impl Deref for SignatureFields {
    type Target = SubpacketAreas;

    fn deref(&self) -> &Self::Target {
        &self.subpackets
    }
}

impl DerefMut for SignatureFields {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.subpackets
    }
}

impl SignatureFields {
    pub(crate) fn new(typ: SignatureType) -> Self {
        SignatureFields {
            version: 4,
            typ,
            pk_algo: PublicKeyAlgorithm::Unknown(0),
            hash_algo: HashAlgorithm::default_for_signing(),
            subpackets: SubpacketAreas::default(),
        }
    }

    /// Gets the version.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Gets the signature type.
    pub fn typ(&self) -> SignatureType {
        self.typ
    }

    /// Gets the public key algorithm.
    pub fn pk_algo(&self) -> PublicKeyAlgorithm {
        self.pk_algo
    }

    /// Gets the hash algorithm.
    pub fn hash_algo(&self) -> HashAlgorithm {
        self.hash_algo
    }

    /// Gets a reference to the subpacket areas.
    pub fn subpackets(&self) -> &SubpacketAreas {
        &self.subpackets
    }

    /// Gets a mutable reference to the subpacket areas.
    pub fn subpackets_mut(&mut self) -> &mut SubpacketAreas {
        &mut self.subpackets
    }
}

impl HashAlgorithm {
    /// The default hash algorithm for new signatures.
    pub(crate) fn default_for_signing() -> Self {
        HashAlgorithm::SHA256
    }
}

/// Holds a v4 Signature packet.
///
/// This holds a [version 4] signature.  Use [`SignatureBuilder`] to
/// create a signature.
///
///   [version 4]: https://tools.ietf.org/html/rfc4880#section-5.2
///   [`SignatureBuilder`]: struct.SignatureBuilder.html
#[derive(Clone)]
pub struct Signature4 {
    /// CTB packet header fields.
    pub(crate) common: packet::Common,

    /// Fields as described in [Section 5.2 of RFC 4880].
    ///
    ///   [Section 5.2 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.2
    pub(crate) fields: SignatureFields,

    /// Upper 16 bits of the signed hash value.
    digest_prefix: [u8; 2],
    /// Signature MPIs.
    mpis: mpi::Signature,

    /// The computed digest, if any.
    ///
    /// If the signature is generated either directly or with the help
    /// of a `SignatureBuilder`, or if the signature is verified, then
    /// the digest over the signed data is cached here.
    computed_digest: Option<Vec<u8>>,

    /// Signature level.
    ///
    /// A level of 0 indicates that the signature is directly over the
    /// data, a level of 1 means that the signature is a notarization
    /// over all level 0 signatures and the data, and so on.
    level: usize,
}
assert_send_and_sync!(Signature4);

impl Deref for Signature4 {
    type Target = SignatureFields;

    fn deref(&self) -> &Self::Target {
        &self.fields
    }
}

impl DerefMut for Signature4 {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.fields
    }
}

impl fmt::Debug for Signature4 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Signature4")
            .field("version", &self.version())
            .field("typ", &self.typ())
            .field("pk_algo", &self.pk_algo())
            .field("hash_algo", &self.hash_algo())
            .field("hashed_area", self.hashed_area())
            .field("unhashed_area", self.unhashed_area())
            .field("digest_prefix",
                   &crate::fmt::to_hex(&self.digest_prefix, false))
            .field("level", &self.level)
            .field("computed_digest",
                   &self.computed_digest.as_ref()
                   .map(|hash| crate::fmt::to_hex(&hash[..], false)))
            .field("mpis", &self.mpis)
            .finish()
    }
}

impl PartialEq for Signature4 {
    /// This method tests for self and other values to be equal, and
    /// is used by ==.
    ///
    /// Note: We ignore the unhashed subpacket area when comparing
    /// signatures.  This prevents a malicious party from taking valid
    /// signatures, adding subpackets to the unhashed area, and
    /// deriving valid but distinct signatures, which could be used to
    /// perform a denial of service attack.
    fn eq(&self, other: &Signature4) -> bool {
        self.normalized_eq(other)
    }
}

impl Eq for Signature4 {}

impl std::hash::Hash for Signature4 {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.normalized_hash(state);
    }
}

impl Signature4 {
    /// Creates a new signature packet.
    ///
    /// If you want to sign something, consider using the
    /// [`SignatureBuilder`] interface.
    ///
    ///   [`SignatureBuilder`]: struct.SignatureBuilder.html
    pub fn new(typ: SignatureType, pk_algo: PublicKeyAlgorithm,
               hash_algo: HashAlgorithm, hashed_area: SubpacketArea,
               unhashed_area: SubpacketArea,
               digest_prefix: [u8; 2],
               mpis: mpi::Signature) -> Self {
        Signature4 {
            common: Default::default(),
            fields: SignatureFields {
                version: 4,
                typ,
                pk_algo,
                hash_algo,
                subpackets: SubpacketAreas::new(hashed_area, unhashed_area),
            },
            digest_prefix,
            mpis,
            computed_digest: None,
            level: 0,
        }
    }

    /// Gets the hash prefix.
    pub fn digest_prefix(&self) -> &[u8; 2] {
        &self.digest_prefix
    }

    /// Sets the hash prefix.
    pub fn set_digest_prefix(&mut self, prefix: [u8; 2]) -> [u8; 2] {
        std::mem::replace(&mut self.digest_prefix, prefix)
    }

    /// Gets the signature packet's MPIs.
    pub fn mpis(&self) -> &mpi::Signature {
        &self.mpis
    }

    /// Sets the signature packet's MPIs.
    pub fn set_mpis(&mut self, mpis: mpi::Signature) -> mpi::Signature {
        std::mem::replace(&mut self.mpis, mpis)
    }

    /// Gets the computed hash value.
    pub fn computed_digest(&self) -> Option<&[u8]> {
        self.computed_digest.as_ref().map(|d| &d[..])
    }

    /// Stores the computed hash.
    pub(crate) fn set_computed_digest(&mut self, hash: Option<Vec<u8>>)
                                      -> Option<Vec<u8>> {
        std::mem::replace(&mut self.computed_digest, hash)
    }

    /// Gets the signature level.
    ///
    /// A level of 0 indicates that the signature is directly over the
    /// data, a level of 1 means that the signature is a notarization
    /// over all level 0 signatures and the data, and so on.
    pub fn level(&self) -> usize {
        self.level
    }

    /// Sets the signature level.
    pub(crate) fn set_level(&mut self, level: usize) -> usize {
        std::mem::replace(&mut self.level, level)
    }

    /// Returns a reference to the hashed fields.
    pub fn fields(&self) -> &SignatureFields {
        &self.fields
    }

    /// Compares Signatures ignoring the unhashed subpacket area.
    ///
    /// This comparison function ignores the unhashed subpacket area
    /// when comparing two signatures.  The unhashed area is not
    /// protected by the signature and can be modified by anyone, so
    /// two signatures that only differ there are, for most purposes,
    /// the same signature.
    pub fn normalized_eq(&self, other: &Signature4) -> bool {
        self.fields.version == other.fields.version
            && self.fields.typ == other.fields.typ
            && self.fields.pk_algo == other.fields.pk_algo
            && self.fields.hash_algo == other.fields.hash_algo
            && self.hashed_area() == other.hashed_area()
            && self.digest_prefix == other.digest_prefix
            && self.mpis == other.mpis
    }

    /// Hashes everything but the unhashed subpacket area into state.
    pub fn normalized_hash<H>(&self, state: &mut H)
        where H: std::hash::Hasher,
    {
        use std::hash::Hash as StdHash;

        self.fields.version.hash(state);
        self.fields.typ.hash(state);
        self.fields.pk_algo.hash(state);
        self.fields.hash_algo.hash(state);
        self.hashed_area().hash(state);
        self.digest_prefix.hash(state);
        StdHash::hash(&self.mpis, state);
    }

    /// Verifies that the signature's hashed subpacket area does not
    /// contain critical but unknown subpackets.
    fn check_critical_subpackets(&self) -> Result<()> {
        for sp in self.hashed_area().iter() {
            if sp.critical()
                && matches!(sp.value(), SubpacketValue::Unknown { .. })
            {
                return Err(Error::BadSignature(
                    format!("Critical unknown subpacket: {:?}",
                            sp.tag())).into());
            }
        }
        Ok(())
    }

    /// Verifies the signature against `digest`.
    ///
    /// Note: this only verifies the cryptographic signature.
    /// Constraints on the signature, like the creation time being in
    /// the past, are not checked here; that is the job of the
    /// configured policy.
    pub fn verify_digest<P, R, D>(&mut self, key: &Key<P, R>, digest: D)
                                  -> Result<()>
        where P: key::KeyParts,
              R: key::KeyRole,
              D: AsRef<[u8]>,
    {
        self.check_critical_subpackets()?;

        // The hash prefix is a quick check, not a security feature.
        // Compare it in constant time anyway, and do not bail out
        // early: an attacker learns nothing from the result.
        let prefix_ok = crate::crypto::mem::secure_cmp(
            &self.digest_prefix[..], &digest.as_ref()[..2])
            == std::cmp::Ordering::Equal;

        let res = crypto::verify_digest(key.pk_algo(), key.mpis(),
                                        &self.mpis, self.hash_algo(),
                                        digest.as_ref());

        match res {
            Ok(()) if !prefix_ok =>
                Err(Error::BadSignature(
                    "Hash prefix mismatch".into()).into()),
            Ok(()) => {
                self.set_computed_digest(Some(digest.as_ref().to_vec()));
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Verifies the signature over the given hash context.
    pub fn verify_hash<P, R>(&mut self, key: &Key<P, R>,
                             mut hash: hash::Context)
                             -> Result<()>
        where P: key::KeyParts,
              R: key::KeyRole,
    {
        self.fields.hash(&mut hash);
        let digest = hash.into_digest();
        self.verify_digest(key, &digest)
    }

    /// Verifies the standalone signature using `key`.
    pub fn verify_standalone<P, R>(&mut self, key: &Key<P, R>) -> Result<()>
        where P: key::KeyParts,
              R: key::KeyRole,
    {
        if self.typ() != SignatureType::Standalone {
            return Err(Error::UnsupportedSignatureType(self.typ()).into());
        }

        // Standalone signatures are like binary-signatures over the
        // zero-sized string.
        let digest =
            packet::Signature::hash_standalone(self.fields())?;
        self.verify_digest(key, &digest)
    }

    /// Verifies the timestamp signature using `key`.
    pub fn verify_timestamp<P, R>(&mut self, key: &Key<P, R>) -> Result<()>
        where P: key::KeyParts,
              R: key::KeyRole,
    {
        if self.typ() != SignatureType::Timestamp {
            return Err(Error::UnsupportedSignatureType(self.typ()).into());
        }

        let digest =
            packet::Signature::hash_timestamp(self.fields())?;
        self.verify_digest(key, &digest)
    }

    /// Verifies the direct key signature.
    ///
    /// `signer` is the key that allegedly made the signature, and
    /// `pk` is the primary key the signature is over.
    pub fn verify_direct_key<P, Q, R>(&mut self,
                                      signer: &Key<P, R>,
                                      pk: &Key<Q, key::PrimaryRole>)
                                      -> Result<()>
        where P: key::KeyParts,
              Q: key::KeyParts,
              R: key::KeyRole,
    {
        if self.typ() != SignatureType::DirectKey {
            return Err(Error::UnsupportedSignatureType(self.typ()).into());
        }

        let digest = packet::Signature::hash_direct_key(
            self.fields(), pk.parts_as_public_key4())?;
        self.verify_digest(signer, &digest)
    }

    /// Verifies the primary key revocation certificate.
    pub fn verify_primary_key_revocation<P, Q, R>(
        &mut self,
        signer: &Key<P, R>,
        pk: &Key<Q, key::PrimaryRole>)
        -> Result<()>
        where P: key::KeyParts,
              Q: key::KeyParts,
              R: key::KeyRole,
    {
        if self.typ() != SignatureType::KeyRevocation {
            return Err(Error::UnsupportedSignatureType(self.typ()).into());
        }

        let digest = packet::Signature::hash_direct_key(
            self.fields(), pk.parts_as_public_key4())?;
        self.verify_digest(signer, &digest)
    }

    /// Verifies the subkey binding.
    ///
    /// `signer` is the key that allegedly made the signature, `pk` is
    /// the primary key, and `subkey` is the subkey.
    ///
    /// If the signature indicates that this is a `Signing` capable
    /// subkey, then the back signature is also verified.
    pub fn verify_subkey_binding<P, Q, R, S>(
        &mut self,
        signer: &Key<P, R>,
        pk: &Key<Q, key::PrimaryRole>,
        subkey: &Key<S, key::SubordinateRole>)
        -> Result<()>
        where P: key::KeyParts,
              Q: key::KeyParts,
              R: key::KeyRole,
              S: key::KeyParts,
    {
        if self.typ() != SignatureType::SubkeyBinding {
            return Err(Error::UnsupportedSignatureType(self.typ()).into());
        }

        let digest = packet::Signature::hash_subkey_binding(
            self.fields(), pk.parts_as_public_key4(),
            subkey.parts_as_public_key4())?;
        self.verify_digest(signer, &digest)?;

        // The signature is good, but we may still need to verify the
        // back sig.
        if self.key_flags().map(|kf| kf.for_signing()).unwrap_or(false) {
            if let Some(backsig) = self.embedded_signature() {
                let mut backsig = backsig.clone();
                backsig.verify_primary_key_binding(pk, subkey)?;
                Ok(())
            } else {
                Err(Error::BadSignature(
                    "Primary key binding signature missing".into()).into())
            }
        } else {
            Ok(())
        }
    }

    /// Verifies the primary key binding.
    ///
    /// The primary key binding is the back signature (type 0x19)
    /// issued by a signing-capable subkey; it is verified against the
    /// subkey itself.
    pub fn verify_primary_key_binding<P, Q>(
        &mut self,
        pk: &Key<P, key::PrimaryRole>,
        subkey: &Key<Q, key::SubordinateRole>)
        -> Result<()>
        where P: key::KeyParts,
              Q: key::KeyParts,
    {
        if self.typ() != SignatureType::PrimaryKeyBinding {
            return Err(Error::UnsupportedSignatureType(self.typ()).into());
        }

        let digest = packet::Signature::hash_primary_key_binding(
            self.fields(), pk.parts_as_public_key4(),
            subkey.parts_as_public_key4())?;
        self.verify_digest_with_subkey(subkey, &digest)
    }

    /// Like `verify_digest`, but the signer is a subkey.
    fn verify_digest_with_subkey<Q, D>(&mut self,
                                       subkey: &Key<Q, key::SubordinateRole>,
                                       digest: D)
                                       -> Result<()>
        where Q: key::KeyParts,
              D: AsRef<[u8]>,
    {
        self.check_critical_subpackets()?;

        let prefix_ok = crate::crypto::mem::secure_cmp(
            &self.digest_prefix[..], &digest.as_ref()[..2])
            == std::cmp::Ordering::Equal;

        let res = crypto::verify_digest(subkey.pk_algo(), subkey.mpis(),
                                        &self.mpis, self.hash_algo(),
                                        digest.as_ref());
        match res {
            Ok(()) if !prefix_ok =>
                Err(Error::BadSignature(
                    "Hash prefix mismatch".into()).into()),
            Ok(()) => {
                self.set_computed_digest(Some(digest.as_ref().to_vec()));
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Verifies the subkey revocation.
    pub fn verify_subkey_revocation<P, Q, R, S>(
        &mut self,
        signer: &Key<P, R>,
        pk: &Key<Q, key::PrimaryRole>,
        subkey: &Key<S, key::SubordinateRole>)
        -> Result<()>
        where P: key::KeyParts,
              Q: key::KeyParts,
              R: key::KeyRole,
              S: key::KeyParts,
    {
        if self.typ() != SignatureType::SubkeyRevocation {
            return Err(Error::UnsupportedSignatureType(self.typ()).into());
        }

        let digest = packet::Signature::hash_subkey_binding(
            self.fields(), pk.parts_as_public_key4(),
            subkey.parts_as_public_key4())?;
        self.verify_digest(signer, &digest)
    }

    /// Verifies the user id binding.
    pub fn verify_userid_binding<P, Q, R>(&mut self,
                                          signer: &Key<P, R>,
                                          pk: &Key<Q, key::PrimaryRole>,
                                          userid: &UserID)
                                          -> Result<()>
        where P: key::KeyParts,
              Q: key::KeyParts,
              R: key::KeyRole,
    {
        if !(self.typ().is_certification()
             || self.typ() == SignatureType::CertificationRevocation)
        {
            return Err(Error::UnsupportedSignatureType(self.typ()).into());
        }

        let digest = packet::Signature::hash_userid_binding(
            self.fields(), pk.parts_as_public_key4(), userid)?;
        self.verify_digest(signer, &digest)
    }

    /// Verifies the user attribute binding.
    pub fn verify_user_attribute_binding<P, Q, R>(
        &mut self,
        signer: &Key<P, R>,
        pk: &Key<Q, key::PrimaryRole>,
        ua: &UserAttribute)
        -> Result<()>
        where P: key::KeyParts,
              Q: key::KeyParts,
              R: key::KeyRole,
    {
        if !(self.typ().is_certification()
             || self.typ() == SignatureType::CertificationRevocation)
        {
            return Err(Error::UnsupportedSignatureType(self.typ()).into());
        }

        let digest = packet::Signature::hash_user_attribute_binding(
            self.fields(), pk.parts_as_public_key4(), ua)?;
        self.verify_digest(signer, &digest)
    }

    /// Verifies a signature of a message.
    ///
    /// `msg` is hashed as a binary document; for text signatures the
    /// caller must canonicalize the line endings first.
    pub fn verify_message<P, R, M>(&mut self, signer: &Key<P, R>, msg: M)
                                   -> Result<()>
        where P: key::KeyParts,
              R: key::KeyRole,
              M: AsRef<[u8]>,
    {
        if self.typ() != SignatureType::Binary
            && self.typ() != SignatureType::Text
        {
            return Err(Error::UnsupportedSignatureType(self.typ()).into());
        }

        // Compute the digest.
        let mut hash = self.hash_algo().context()?;
        hash.update(msg.as_ref());
        self.fields.hash(&mut hash);
        let digest = hash.into_digest();

        self.verify_digest(signer, &digest)
    }
}

impl From<Signature4> for packet::Signature {
    fn from(s: Signature4) -> Self {
        packet::Signature::V4(s)
    }
}

impl From<Signature4> for Packet {
    fn from(s: Signature4) -> Self {
        Packet::Signature(s.into())
    }
}

impl<P: key::KeyParts, R: key::KeyRole> Key<P, R> {
    /// Returns a reference to this key as `Key4<PublicParts, R>`.
    ///
    /// The public parts of a key are always present, so this
    /// conversion is infallible; it is used by the hashing functions
    /// which only consider the public material.
    pub(crate) fn parts_as_public_key4(&self)
        -> &key::Key4<key::PublicParts, R>
    {
        match self {
            Key::V4(k) => {
                // The parts marker is PhantomData; the representation
                // of Key4<P, R> and Key4<PublicParts, R> is
                // identical.
                unsafe {
                    &*(k as *const key::Key4<P, R>
                       as *const key::Key4<key::PublicParts, R>)
                }
            }
        }
    }
}

/// A signature builder.
///
/// The `SignatureBuilder` is used to create [`Signature`]s.  Although
/// it can be used to generate a signature over a document (see
/// [`sign_message`]), it is usually better to use the [streaming
/// `Signer`] for that.
///
///   [`Signature`]: ../enum.Signature.html
///   [`sign_message`]: #method.sign_message
///   [streaming `Signer`]: ../../serialize/stream/struct.Signer.html
///
/// The builder automatically adds a creation time and the signer's
/// issuer information when finalizing the signature, unless they were
/// set explicitly.
#[derive(Debug, Clone)]
pub struct SignatureBuilder {
    fields: SignatureFields,
}
assert_send_and_sync!(SignatureBuilder);

impl Deref for SignatureBuilder {
    type Target = SignatureFields;

    fn deref(&self) -> &Self::Target {
        &self.fields
    }
}

impl DerefMut for SignatureBuilder {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.fields
    }
}

impl SignatureBuilder {
    /// Returns a new `SignatureBuilder` object.
    pub fn new(typ: SignatureType) -> Self {
        SignatureBuilder {
            fields: SignatureFields::new(typ),
        }
    }

    /// Sets the signature type.
    pub fn set_type(mut self, t: SignatureType) -> Self {
        self.fields.typ = t;
        self
    }

    /// Sets the hash algorithm.
    pub fn set_hash_algo(mut self, h: HashAlgorithm) -> Self {
        self.fields.hash_algo = h;
        self
    }

    /// Returns a reference to the fields being constructed.
    pub fn fields(&self) -> &SignatureFields {
        &self.fields
    }

    /// Signs a standalone signature.
    pub fn sign_standalone(mut self, signer: &mut dyn Signer)
                           -> Result<packet::Signature> {
        self = self.pre_sign(signer)?;
        let digest = packet::Signature::hash_standalone(&self.fields)?;
        self.sign(signer, digest)
    }

    /// Signs a timestamp signature.
    pub fn sign_timestamp(mut self, signer: &mut dyn Signer)
                          -> Result<packet::Signature> {
        self = self.pre_sign(signer)?;
        let digest = packet::Signature::hash_timestamp(&self.fields)?;
        self.sign(signer, digest)
    }

    /// Signs a direct key signature over `pk`.
    pub fn sign_direct_key<P>(mut self, signer: &mut dyn Signer,
                              pk: &key::Key4<P, key::PrimaryRole>)
                              -> Result<packet::Signature>
        where P: key::KeyParts,
    {
        self = self.pre_sign(signer)?;
        let digest = packet::Signature::hash_direct_key(&self.fields, pk)?;
        self.sign(signer, digest)
    }

    /// Signs a user id binding over `userid` and `pk`.
    pub fn sign_userid_binding<P>(mut self, signer: &mut dyn Signer,
                                  pk: &key::Key4<P, key::PrimaryRole>,
                                  userid: &UserID)
                                  -> Result<packet::Signature>
        where P: key::KeyParts,
    {
        self = self.pre_sign(signer)?;
        let digest = packet::Signature::hash_userid_binding(
            &self.fields, pk, userid)?;
        self.sign(signer, digest)
    }

    /// Signs a user attribute binding over `ua` and `pk`.
    pub fn sign_user_attribute_binding<P>(
        mut self, signer: &mut dyn Signer,
        pk: &key::Key4<P, key::PrimaryRole>,
        ua: &UserAttribute)
        -> Result<packet::Signature>
        where P: key::KeyParts,
    {
        self = self.pre_sign(signer)?;
        let digest = packet::Signature::hash_user_attribute_binding(
            &self.fields, pk, ua)?;
        self.sign(signer, digest)
    }

    /// Signs a subkey binding over `subkey` and `primary`.
    pub fn sign_subkey_binding<P, Q>(
        mut self, signer: &mut dyn Signer,
        primary: &key::Key4<P, key::PrimaryRole>,
        subkey: &key::Key4<Q, key::SubordinateRole>)
        -> Result<packet::Signature>
        where P: key::KeyParts,
              Q: key::KeyParts,
    {
        self = self.pre_sign(signer)?;
        let digest = packet::Signature::hash_subkey_binding(
            &self.fields, primary, subkey)?;
        self.sign(signer, digest)
    }

    /// Signs a primary key binding (back signature) over `primary`
    /// and `subkey`.
    ///
    /// `subkey_signer` must be the signing-capable subkey itself.
    pub fn sign_primary_key_binding<P, Q>(
        mut self, subkey_signer: &mut dyn Signer,
        primary: &key::Key4<P, key::PrimaryRole>,
        subkey: &key::Key4<Q, key::SubordinateRole>)
        -> Result<packet::Signature>
        where P: key::KeyParts,
              Q: key::KeyParts,
    {
        self = self.pre_sign(subkey_signer)?;
        let digest = packet::Signature::hash_primary_key_binding(
            &self.fields, primary, subkey)?;
        self.sign(subkey_signer, digest)
    }

    /// Signs a message.
    ///
    /// `msg` is hashed as-is; for text signatures the caller must
    /// canonicalize the line endings to CRLF first.
    pub fn sign_message<M>(mut self, signer: &mut dyn Signer, msg: M)
                           -> Result<packet::Signature>
        where M: AsRef<[u8]>,
    {
        self = self.pre_sign(signer)?;

        let mut hash = self.fields.hash_algo().context()?;
        hash.update(msg.as_ref());
        self.fields.hash(&mut hash);
        let digest = hash.into_digest();

        self.sign(signer, digest)
    }

    /// Signs the given hash context.
    ///
    /// The context must contain the hashed document; this function
    /// appends the signature fields and trailer.
    pub fn sign_hash(mut self, signer: &mut dyn Signer,
                     mut hash: hash::Context)
                     -> Result<packet::Signature> {
        self.fields.hash_algo = hash.algo();
        self = self.pre_sign(signer)?;

        self.fields.hash(&mut hash);
        let digest = hash.into_digest();

        self.sign(signer, digest)
    }

    fn pre_sign(mut self, signer: &dyn Signer) -> Result<Self> {
        self.fields.pk_algo = signer.public().pk_algo();

        // Set the creation time, if nothing is set.
        if self.signature_creation_time().is_none() {
            self.fields.subpackets.hashed_area_mut().add(Subpacket::new(
                SubpacketValue::SignatureCreationTime(Timestamp::now()),
                true)?)?;
        }

        // Add the issuer information, if nothing is set.
        if self.issuers().next().is_none()
            && self.issuer_fingerprints().next().is_none()
        {
            // Add a issuer fingerprint and an issuer subpacket.
            let fp = signer.public().fingerprint();
            self.fields.subpackets.unhashed_area_mut().add(Subpacket::new(
                SubpacketValue::IssuerFingerprint(fp.clone()), false)?)?;
            self.fields.subpackets.unhashed_area_mut().add(Subpacket::new(
                SubpacketValue::Issuer(fp.into()), false)?)?;
        }

        Ok(self)
    }

    fn sign(self, signer: &mut dyn Signer, digest: Vec<u8>)
            -> Result<packet::Signature> {
        let mpis = signer.sign(self.fields.hash_algo, &digest)?;

        let sig = Signature4 {
            common: Default::default(),
            fields: self.fields,
            digest_prefix: [digest[0], digest[1]],
            mpis,
            computed_digest: Some(digest),
            level: 0,
        };

        Ok(sig.into())
    }
}

impl From<packet::Signature> for SignatureBuilder {
    fn from(sig: packet::Signature) -> Self {
        match sig {
            packet::Signature::V4(sig) => sig.into(),
        }
    }
}

impl From<Signature4> for SignatureBuilder {
    fn from(sig: Signature4) -> Self {
        SignatureBuilder {
            fields: sig.fields,
        }
    }
}
