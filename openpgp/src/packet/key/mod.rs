//! Key packets.
//!
//! All versions of key packets (`PublicKey`, `PublicSubkey`,
//! `SecretKey`, and `SecretSubkey`) share the same layout: a creation
//! time, a public key algorithm, and the algorithm-specific key
//! material.  The secret variants additionally carry the secret key
//! material, which is usually protected with a password.
//!
//! To avoid duplicating code for the four variants, [`Key4`] is
//! parameterized over two marker types: `P`, the key's parts
//! (whether secret key material may be present), and `R`, the key's
//! role (primary key or subkey).  The markers only exist at the type
//! level; all variants have the same representation.
//!
//!   [`Key4`]: struct.Key4.html

use std::fmt;
use std::cmp::Ordering;
use std::convert::TryInto;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::time::SystemTime;

use crate::Error;
use crate::Result;
use crate::crypto::{self, KeyPair, S2K};
use crate::crypto::mem::Protected;
use crate::crypto::mpi;
use crate::crypto::Password;
use crate::packet;
use crate::packet::Key;
use crate::types::{
    AEADAlgorithm,
    Curve,
    HashAlgorithm,
    PublicKeyAlgorithm,
    SymmetricAlgorithm,
    Timestamp,
};
use crate::Fingerprint;
use crate::KeyID;

/// A marker trait that captures whether a `Key` definitely contains
/// secret key material.
pub trait KeyParts: fmt::Debug + seal::Sealed {
    /// Returns whether secret key material may be present.
    fn significant_secrets() -> bool;
}

/// A marker trait that captures a `Key`'s role.
pub trait KeyRole: fmt::Debug + seal::Sealed {}

/// Seals the marker traits.
pub(crate) mod seal {
    /// Prevents downstream implementations of marker traits.
    pub trait Sealed {}
}

/// A marker that indicates that a `Key` should be treated like a
/// public key.
///
/// Secret key material may still be present, but it is ignored when
/// comparing such keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublicParts;
impl seal::Sealed for PublicParts {}
impl KeyParts for PublicParts {
    fn significant_secrets() -> bool {
        false
    }
}

/// A marker that indicates that a `Key` definitely contains secret
/// key material.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SecretParts;
impl seal::Sealed for SecretParts {}
impl KeyParts for SecretParts {
    fn significant_secrets() -> bool {
        true
    }
}

/// A marker that indicates that a `Key`'s parts are unspecified.
///
/// Like `SecretParts`, secret key material is considered when
/// comparing such keys, but unlike `SecretParts`, it need not be
/// present.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnspecifiedParts;
impl seal::Sealed for UnspecifiedParts {}
impl KeyParts for UnspecifiedParts {
    fn significant_secrets() -> bool {
        true
    }
}

/// A marker that indicates the `Key` is a primary key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrimaryRole;
impl seal::Sealed for PrimaryRole {}
impl KeyRole for PrimaryRole {}

/// A marker that indicates the `Key` is a subkey.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubordinateRole;
impl seal::Sealed for SubordinateRole {}
impl KeyRole for SubordinateRole {}

/// A marker that indicates the `Key`'s role is unspecified.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnspecifiedRole;
impl seal::Sealed for UnspecifiedRole {}
impl KeyRole for UnspecifiedRole {}

/// A public key packet.
pub type PublicKey = Key<PublicParts, PrimaryRole>;
/// A public subkey packet.
pub type PublicSubkey = Key<PublicParts, SubordinateRole>;
/// A secret key packet.
pub type SecretKey = Key<SecretParts, PrimaryRole>;
/// A secret subkey packet.
pub type SecretSubkey = Key<SecretParts, SubordinateRole>;
/// A key packet with unspecified parts and role.
pub type UnspecifiedKey = Key<UnspecifiedParts, UnspecifiedRole>;

/// Holds a public key, public subkey, private key or private subkey
/// packet.
///
/// See [Section 5.5 of RFC 4880] for details.
///
///   [Section 5.5 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.5
pub struct Key4<P, R>
    where P: KeyParts, R: KeyRole,
{
    /// CTB packet header fields.
    pub(crate) common: packet::Common,
    /// When the key was created.
    creation_time: Timestamp,
    /// Public key algorithm of this signature.
    pk_algo: PublicKeyAlgorithm,
    /// Public key MPIs.
    mpis: mpi::PublicKey,
    /// Optional secret part of the key.
    secret: Option<SecretKeyMaterial>,

    p: PhantomData<P>,
    r: PhantomData<R>,
}
assert_send_and_sync!(Key4<P, R> where P: KeyParts, R: KeyRole);

impl<P: KeyParts, R: KeyRole> fmt::Debug for Key4<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Key4")
            .field("fingerprint", &self.fingerprint())
            .field("creation_time", &self.creation_time)
            .field("pk_algo", &self.pk_algo)
            .field("mpis", &self.mpis)
            .field("secret", &self.secret)
            .finish()
    }
}

impl<P: KeyParts, R: KeyRole> fmt::Display for Key4<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.fingerprint())
    }
}

impl<P: KeyParts, R: KeyRole> Clone for Key4<P, R> {
    fn clone(&self) -> Self {
        Key4 {
            common: self.common.clone(),
            creation_time: self.creation_time,
            pk_algo: self.pk_algo,
            mpis: self.mpis.clone(),
            secret: self.secret.clone(),
            p: PhantomData,
            r: PhantomData,
        }
    }
}

impl<P: KeyParts, R: KeyRole> PartialEq for Key4<P, R> {
    fn eq(&self, other: &Self) -> bool {
        self.creation_time == other.creation_time
            && self.pk_algo == other.pk_algo
            && self.mpis == other.mpis
            && (!P::significant_secrets() || self.secret == other.secret)
    }
}

impl<P: KeyParts, R: KeyRole> Eq for Key4<P, R> {}

impl<P: KeyParts, R: KeyRole> Hash for Key4<P, R> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.creation_time.hash(state);
        self.pk_algo.hash(state);
        self.mpis.hash(state);
        if P::significant_secrets() {
            self.secret.hash(state);
        }
    }
}

impl<P: KeyParts, R: KeyRole> Key4<P, R> {
    /// Creates an OpenPGP key packet.
    pub fn new<T>(creation_time: T, pk_algo: PublicKeyAlgorithm,
                  mpis: mpi::PublicKey)
                  -> Result<Self>
        where T: Into<SystemTime>,
    {
        Ok(Key4 {
            common: Default::default(),
            creation_time: creation_time.into().try_into()?,
            pk_algo,
            mpis,
            secret: None,
            p: PhantomData,
            r: PhantomData,
        })
    }

    /// Gets the `Key`'s creation time.
    pub fn creation_time(&self) -> SystemTime {
        self.creation_time.into()
    }

    /// Sets the `Key`'s creation time.
    ///
    /// `timestamp` is converted to OpenPGP's internal format,
    /// [`Timestamp`]: a 32-bit quantity containing the number of
    /// seconds since the Unix epoch.
    ///
    ///   [`Timestamp`]: ../../types/struct.Timestamp.html
    pub fn set_creation_time<T>(&mut self, timestamp: T)
                                -> Result<SystemTime>
        where T: Into<SystemTime>,
    {
        Ok(std::mem::replace(&mut self.creation_time,
                             timestamp.into().try_into()?)
           .into())
    }

    /// Gets the public key algorithm.
    pub fn pk_algo(&self) -> PublicKeyAlgorithm {
        self.pk_algo
    }

    /// Sets the public key algorithm.
    pub fn set_pk_algo(&mut self, pk_algo: PublicKeyAlgorithm)
                       -> PublicKeyAlgorithm {
        std::mem::replace(&mut self.pk_algo, pk_algo)
    }

    /// Gets the key packet's MPIs.
    pub fn mpis(&self) -> &mpi::PublicKey {
        &self.mpis
    }

    /// Sets the key packet's MPIs.
    pub fn set_mpis(&mut self, mpis: mpi::PublicKey) -> mpi::PublicKey {
        std::mem::replace(&mut self.mpis, mpis)
    }

    /// Returns whether the key contains secret key material.
    pub fn has_secret(&self) -> bool {
        self.secret.is_some()
    }

    /// Returns whether the key contains unencrypted secret key
    /// material.
    pub fn has_unencrypted_secret(&self) -> bool {
        matches!(self.secret, Some(SecretKeyMaterial::Unencrypted { .. }))
    }

    /// Returns the key's fingerprint, as defined in [Section 12.2 of
    /// RFC 4880].
    ///
    ///   [Section 12.2 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-12.2
    pub fn fingerprint(&self) -> Fingerprint {
        use crate::crypto::hash::Hash;

        let mut h = HashAlgorithm::SHA1.context()
            .expect("SHA1 is supported");

        self.hash(&mut h);

        let mut digest = vec![0u8; h.digest_size()];
        h.digest(&mut digest);
        Fingerprint::from_bytes(&digest[..])
    }

    /// Returns the key's key ID, as defined in [Section 12.2 of RFC
    /// 4880].
    ///
    ///   [Section 12.2 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-12.2
    pub fn keyid(&self) -> KeyID {
        self.fingerprint().into()
    }

    /// Gets a reference to the key's secret material, if any.
    pub fn optional_secret(&self) -> Option<&SecretKeyMaterial> {
        self.secret.as_ref()
    }

    /// Takes the key's secret material, if any.
    ///
    /// Returns the key with the secret material removed, and the
    /// material itself.
    pub fn take_secret(mut self)
                       -> (Key4<PublicParts, R>, Option<SecretKeyMaterial>) {
        let secret = self.secret.take();
        (Key4 {
            common: self.common,
            creation_time: self.creation_time,
            pk_algo: self.pk_algo,
            mpis: self.mpis,
            secret: None,
            p: PhantomData,
            r: PhantomData,
        }, secret)
    }

    /// Adds the secret material to the key.
    ///
    /// Returns the key with the secret material added, and the old
    /// material, if any.
    pub fn add_secret(mut self, secret: SecretKeyMaterial)
                      -> (Key4<SecretParts, R>, Option<SecretKeyMaterial>) {
        let old = self.secret.take();
        (Key4 {
            common: self.common,
            creation_time: self.creation_time,
            pk_algo: self.pk_algo,
            mpis: self.mpis,
            secret: Some(secret),
            p: PhantomData,
            r: PhantomData,
        }, old)
    }

    /// Changes the key's parts tag to `PublicParts`.
    ///
    /// Any secret key material is retained; it is merely ignored when
    /// comparing the keys.  Use [`take_secret`] to remove it.
    ///
    ///   [`take_secret`]: #method.take_secret
    pub fn parts_into_public(self) -> Key4<PublicParts, R> {
        Key4 {
            common: self.common,
            creation_time: self.creation_time,
            pk_algo: self.pk_algo,
            mpis: self.mpis,
            secret: self.secret,
            p: PhantomData,
            r: PhantomData,
        }
    }

    /// Changes the key's parts tag to `UnspecifiedParts`.
    pub fn parts_into_unspecified(self) -> Key4<UnspecifiedParts, R> {
        Key4 {
            common: self.common,
            creation_time: self.creation_time,
            pk_algo: self.pk_algo,
            mpis: self.mpis,
            secret: self.secret,
            p: PhantomData,
            r: PhantomData,
        }
    }

    /// Changes the key's parts tag to `SecretParts`, if secret
    /// material is present.
    pub fn parts_into_secret(self) -> Result<Key4<SecretParts, R>> {
        if self.secret.is_some() {
            Ok(Key4 {
                common: self.common,
                creation_time: self.creation_time,
                pk_algo: self.pk_algo,
                mpis: self.mpis,
                secret: self.secret,
                p: PhantomData,
                r: PhantomData,
            })
        } else {
            Err(Error::InvalidArgument(
                "No secret key material".into()).into())
        }
    }

    /// Changes the key's role tag to `PrimaryRole`.
    pub fn role_into_primary(self) -> Key4<P, PrimaryRole> {
        self.change_role()
    }

    /// Changes the key's role tag to `SubordinateRole`.
    pub fn role_into_subordinate(self) -> Key4<P, SubordinateRole> {
        self.change_role()
    }

    /// Changes the key's role tag to `UnspecifiedRole`.
    pub fn role_into_unspecified(self) -> Key4<P, UnspecifiedRole> {
        self.change_role()
    }

    fn change_role<S: KeyRole>(self) -> Key4<P, S> {
        Key4 {
            common: self.common,
            creation_time: self.creation_time,
            pk_algo: self.pk_algo,
            mpis: self.mpis,
            secret: self.secret,
            p: PhantomData,
            r: PhantomData,
        }
    }
}

impl<R: KeyRole> Key4<SecretParts, R> {
    /// Creates an OpenPGP key packet with secrets.
    pub fn with_secret<T>(creation_time: T, pk_algo: PublicKeyAlgorithm,
                          mpis: mpi::PublicKey,
                          secret: SecretKeyMaterial)
                          -> Result<Self>
        where T: Into<SystemTime>,
    {
        Ok(Key4 {
            common: Default::default(),
            creation_time: creation_time.into().try_into()?,
            pk_algo,
            mpis,
            secret: Some(secret),
            p: PhantomData,
            r: PhantomData,
        })
    }

    /// Gets the secret key material.
    pub fn secret(&self) -> &SecretKeyMaterial {
        self.secret.as_ref().expect("SecretParts key has secrets")
    }

    /// Gets a mutable reference to the secret key material.
    pub fn secret_mut(&mut self) -> &mut SecretKeyMaterial {
        self.secret.as_mut().expect("SecretParts key has secrets")
    }

    /// Creates a new key pair from a `Key` packet with an unencrypted
    /// secret key.
    ///
    /// # Errors
    ///
    /// Fails if the secret key is encrypted.
    pub fn into_keypair(self) -> Result<KeyPair> {
        use crate::packet::key::SecretKeyMaterial::*;
        let (key, secret) = self.take_secret();
        let secret = match secret.expect("SecretParts key has secrets") {
            Unencrypted(u) => u,
            Encrypted(_) =>
                return Err(Error::InvalidArgument(
                    "secret key is encrypted".into()).into()),
        };

        KeyPair::new(Key::V4(key.role_into_unspecified()), secret)
    }

    /// Decrypts the secret key material using `password`.
    ///
    /// The key packet is not changed if the secret key material is
    /// not encrypted, or the password is wrong.
    pub fn decrypt_secret(mut self, password: &Password) -> Result<Self> {
        let pk_algo = self.pk_algo;
        let secret = self.secret_mut();
        if let SecretKeyMaterial::Encrypted(e) = secret {
            *secret = SecretKeyMaterial::Unencrypted(
                e.decrypt(pk_algo, password)?);
        }
        Ok(self)
    }

    /// Encrypts the secret key material using `password`.
    ///
    /// This returns an error if the secret key material is already
    /// encrypted.
    pub fn encrypt_secret(mut self, password: &Password) -> Result<Self> {
        let pk_algo = self.pk_algo;
        let secret = self.secret_mut();
        match secret {
            SecretKeyMaterial::Unencrypted(ref u) => {
                *secret = SecretKeyMaterial::Encrypted(
                    u.encrypt(pk_algo, password)?);
                Ok(self)
            }
            SecretKeyMaterial::Encrypted(_) =>
                Err(Error::InvalidArgument(
                    "secret key material is already encrypted".into())
                    .into()),
        }
    }
}

impl<R: KeyRole> Key4<PublicParts, R> {
    /// Adds the secret material from `other` to this key, if the
    /// public parts match.
    pub fn steal_secret<S: KeyRole>(self, other: Key4<SecretParts, S>)
                                    -> Result<Key4<SecretParts, R>> {
        if self.mpis != other.mpis {
            return Err(Error::InvalidArgument(
                "public key parameters do not match".into()).into());
        }
        let (_, secret) = other.take_secret();
        Ok(self.add_secret(secret.expect("SecretParts key has secrets")).0)
    }
}

impl<R: KeyRole> Key4<SecretParts, R> {
    /// Generates a new RSA key with a public modulus of size `bits`.
    ///
    /// The RustCrypto `rsa` crate generates the primes using a
    /// probable-prime search; the resulting key is validated before
    /// use.
    pub fn generate_rsa(bits: usize) -> Result<Self> {
        use num_bigint_dig::ModInverse;
        use rsa::RsaPrivateKey;
        use rsa::traits::PrivateKeyParts;
        use rsa::traits::PublicKeyParts;

        let key = RsaPrivateKey::new(&mut rand::rngs::OsRng, bits)?;

        let e = key.e();
        let n = key.n();
        let d = key.d();
        let primes = key.primes();
        // The OpenPGP wire format wants p < q, and u = p^-1 mod q.
        let (p, q) = if primes[0] < primes[1] {
            (primes[0].clone(), primes[1].clone())
        } else {
            (primes[1].clone(), primes[0].clone())
        };
        let u = p.clone().mod_inverse(&q)
            .and_then(|u| u.to_biguint())
            .ok_or_else(|| Error::InvalidKey(
                "p has no inverse modulo q".into()))?;

        let public_mpis = mpi::PublicKey::RSA {
            e: mpi::MPI::new(&e.to_bytes_be()),
            n: mpi::MPI::new(&n.to_bytes_be()),
        };
        let private_mpis = mpi::SecretKeyMaterial::RSA {
            d: mpi::MPI::new(&d.to_bytes_be()).into(),
            p: mpi::MPI::new(&p.to_bytes_be()).into(),
            q: mpi::MPI::new(&q.to_bytes_be()).into(),
            u: mpi::MPI::new(&u.to_bytes_be()).into(),
        };

        Self::with_secret(
            SystemTime::now(),
            PublicKeyAlgorithm::RSAEncryptSign,
            public_mpis,
            SecretKeyMaterial::Unencrypted(private_mpis.into()))
    }

    /// Generates a new ECC key over `curve`.
    ///
    /// If `for_signing` is false a ECDH key, if it's true either a
    /// EdDSA or ECDSA key is generated.  Giving `for_signing == true`
    /// and `curve == Cv25519` will produce an error.  Likewise
    /// `for_signing == false` and `curve == Ed25519` will produce an
    /// error.
    pub fn generate_ecc(for_signing: bool, curve: Curve) -> Result<Self> {
        let (pk_algo, public_mpis, private_mpis) =
            match (&curve, for_signing) {
                (Curve::Ed25519, true) => {
                    use ed25519_dalek::SigningKey;

                    let secret = SigningKey::generate(
                        &mut rand_core::OsRng);
                    let public = secret.verifying_key();

                    (PublicKeyAlgorithm::EdDSA,
                     mpi::PublicKey::EdDSA {
                         curve: Curve::Ed25519,
                         q: mpi::MPI::new_compressed_point(
                             public.as_bytes()),
                     },
                     mpi::SecretKeyMaterial::EdDSA {
                         scalar: mpi::MPI::new(&secret.to_bytes()).into(),
                     })
                }

                (Curve::Cv25519, false) => {
                    use x25519_dalek::{StaticSecret, PublicKey};

                    let secret = StaticSecret::random_from_rng(
                        rand_core::OsRng);
                    let public = PublicKey::from(&secret);

                    // The secret scalar is stored as a big-endian
                    // MPI; the native scalar is little-endian.
                    let mut sec_bytes = secret.to_bytes();
                    sec_bytes.reverse();
                    let sec_mpi = mpi::MPI::new(&sec_bytes[..]);
                    unsafe {
                        memsec::memzero(sec_bytes.as_mut_ptr(),
                                        sec_bytes.len());
                    }

                    (PublicKeyAlgorithm::ECDH,
                     mpi::PublicKey::ECDH {
                         curve: Curve::Cv25519,
                         q: mpi::MPI::new_compressed_point(
                             public.as_bytes()),
                         hash: HashAlgorithm::SHA256,
                         sym: SymmetricAlgorithm::AES256,
                     },
                     mpi::SecretKeyMaterial::ECDH {
                         scalar: sec_mpi.into(),
                     })
                }

                (Curve::NistP256, _) | (Curve::NistP384, _)
                | (Curve::NistP521, _) => {
                    macro_rules! nist_generate {
                        ($crt:ident, $hash:expr, $sym:expr) => {{
                            use $crt::elliptic_curve::sec1::ToEncodedPoint;

                            let secret = $crt::SecretKey::random(
                                &mut rand_core::OsRng);
                            let public = secret.public_key();
                            let public = public.to_encoded_point(false);
                            let q = mpi::MPI::new(public.as_bytes());
                            let scalar: mpi::ProtectedMPI =
                                mpi::MPI::new(
                                    secret.to_bytes().as_slice()).into();

                            if for_signing {
                                (PublicKeyAlgorithm::ECDSA,
                                 mpi::PublicKey::ECDSA {
                                     curve: curve.clone(),
                                     q,
                                 },
                                 mpi::SecretKeyMaterial::ECDSA { scalar })
                            } else {
                                (PublicKeyAlgorithm::ECDH,
                                 mpi::PublicKey::ECDH {
                                     curve: curve.clone(),
                                     q,
                                     hash: $hash,
                                     sym: $sym,
                                 },
                                 mpi::SecretKeyMaterial::ECDH { scalar })
                            }
                        }};
                    }

                    match curve {
                        Curve::NistP256 =>
                            nist_generate!(p256, HashAlgorithm::SHA256,
                                           SymmetricAlgorithm::AES256),
                        Curve::NistP384 =>
                            nist_generate!(p384, HashAlgorithm::SHA384,
                                           SymmetricAlgorithm::AES256),
                        Curve::NistP521 =>
                            nist_generate!(p521, HashAlgorithm::SHA512,
                                           SymmetricAlgorithm::AES256),
                        _ => unreachable!(),
                    }
                }

                (c, _) => return Err(Error::UnsupportedEllipticCurve(
                    c.clone()).into()),
            };

        Self::with_secret(
            SystemTime::now(),
            pk_algo,
            public_mpis,
            SecretKeyMaterial::Unencrypted(private_mpis.into()))
    }
}

impl<P: KeyParts, R: KeyRole> Key<P, R> {
    /// Gets the `Key`'s fingerprint.
    pub fn fingerprint(&self) -> Fingerprint {
        match self {
            Key::V4(k) => k.fingerprint(),
        }
    }

    /// Changes the key's parts tag to `PublicParts`.
    pub fn parts_into_public(self) -> Key<PublicParts, R> {
        match self {
            Key::V4(k) => Key::V4(k.parts_into_public()),
        }
    }

    /// Changes the key's parts tag to `UnspecifiedParts`.
    pub fn parts_into_unspecified(self) -> Key<UnspecifiedParts, R> {
        match self {
            Key::V4(k) => Key::V4(k.parts_into_unspecified()),
        }
    }

    /// Changes the key's parts tag to `SecretParts`, if secret
    /// material is present.
    pub fn parts_into_secret(self) -> Result<Key<SecretParts, R>> {
        match self {
            Key::V4(k) => Ok(Key::V4(k.parts_into_secret()?)),
        }
    }

    /// Changes the key's role tag to `PrimaryRole`.
    pub fn role_into_primary(self) -> Key<P, PrimaryRole> {
        match self {
            Key::V4(k) => Key::V4(k.role_into_primary()),
        }
    }

    /// Changes the key's role tag to `SubordinateRole`.
    pub fn role_into_subordinate(self) -> Key<P, SubordinateRole> {
        match self {
            Key::V4(k) => Key::V4(k.role_into_subordinate()),
        }
    }

    /// Changes the key's role tag to `UnspecifiedRole`.
    pub fn role_into_unspecified(self) -> Key<P, UnspecifiedRole> {
        match self {
            Key::V4(k) => Key::V4(k.role_into_unspecified()),
        }
    }

    /// Returns a reference to the key with the role tag erased.
    ///
    /// The role marker is `PhantomData`; all roles share one
    /// representation.
    pub fn role_as_unspecified(&self) -> &Key<P, UnspecifiedRole> {
        unsafe {
            &*(self as *const Key<P, R>
               as *const Key<P, UnspecifiedRole>)
        }
    }

    /// Takes the key's secret material, if any.
    pub fn take_secret(self)
                       -> (Key<PublicParts, R>, Option<SecretKeyMaterial>) {
        match self {
            Key::V4(k) => {
                let (k, s) = k.take_secret();
                (Key::V4(k), s)
            }
        }
    }

    /// Adds the secret material to the key.
    pub fn add_secret(self, secret: SecretKeyMaterial)
                      -> (Key<SecretParts, R>, Option<SecretKeyMaterial>) {
        match self {
            Key::V4(k) => {
                let (k, s) = k.add_secret(secret);
                (Key::V4(k), s)
            }
        }
    }
}

impl<R: KeyRole> Key<SecretParts, R> {
    /// Creates a new key pair from a `Key` packet with an unencrypted
    /// secret key.
    pub fn into_keypair(self) -> Result<KeyPair> {
        match self {
            Key::V4(k) => k.into_keypair(),
        }
    }

    /// Decrypts the secret key material using `password`.
    pub fn decrypt_secret(self, password: &Password) -> Result<Self> {
        match self {
            Key::V4(k) => Ok(Key::V4(k.decrypt_secret(password)?)),
        }
    }

    /// Encrypts the secret key material using `password`.
    pub fn encrypt_secret(self, password: &Password) -> Result<Self> {
        match self {
            Key::V4(k) => Ok(Key::V4(k.encrypt_secret(password)?)),
        }
    }
}

/// Holds secret key material.
///
/// This type allows postponing the decryption of the secret key
/// material until it is actually needed.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SecretKeyMaterial {
    /// Unencrypted secret key. Can be used as-is.
    Unencrypted(Unencrypted),
    /// The secret key is encrypted with a password.
    Encrypted(Encrypted),
}
assert_send_and_sync!(SecretKeyMaterial);

impl From<mpi::SecretKeyMaterial> for SecretKeyMaterial {
    fn from(mpis: mpi::SecretKeyMaterial) -> Self {
        SecretKeyMaterial::Unencrypted(mpis.into())
    }
}

impl From<Unencrypted> for SecretKeyMaterial {
    fn from(key: Unencrypted) -> Self {
        SecretKeyMaterial::Unencrypted(key)
    }
}

impl From<Encrypted> for SecretKeyMaterial {
    fn from(key: Encrypted) -> Self {
        SecretKeyMaterial::Encrypted(key)
    }
}

impl SecretKeyMaterial {
    /// Decrypts the secret key material using `password`.
    pub fn decrypt(self, pk_algo: PublicKeyAlgorithm,
                   password: &Password)
                   -> Result<Self> {
        match self {
            SecretKeyMaterial::Unencrypted(_) => Ok(self),
            SecretKeyMaterial::Encrypted(e) =>
                Ok(SecretKeyMaterial::Unencrypted(
                    e.decrypt(pk_algo, password)?)),
        }
    }

    /// Encrypts the secret key material using `password`.
    pub fn encrypt(self, pk_algo: PublicKeyAlgorithm,
                   password: &Password)
                   -> Result<Self> {
        match self {
            SecretKeyMaterial::Unencrypted(u) =>
                Ok(SecretKeyMaterial::Encrypted(
                    u.encrypt(pk_algo, password)?)),
            SecretKeyMaterial::Encrypted(_) => Ok(self),
        }
    }

    /// Returns whether the secret key material is encrypted.
    pub fn is_encrypted(&self) -> bool {
        matches!(self, SecretKeyMaterial::Encrypted(_))
    }
}

/// Unencrypted secret key material.
///
/// This type allows postponing the parsing of the secret key material
/// until it is actually needed.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Unencrypted {
    /// The secret key material.
    mpis: mpi::SecretKeyMaterial,
}
assert_send_and_sync!(Unencrypted);

impl From<mpi::SecretKeyMaterial> for Unencrypted {
    fn from(mpis: mpi::SecretKeyMaterial) -> Self {
        Unencrypted { mpis }
    }
}

impl Unencrypted {
    /// Maps the given function over the secret.
    pub fn map<F, T>(&self, mut f: F) -> T
        where F: FnMut(&mpi::SecretKeyMaterial) -> T,
    {
        f(&self.mpis)
    }

    /// Encrypts the secret key material using `password`.
    ///
    /// The secret key material is encrypted using AES-256 in CFB
    /// mode, protected with a SHA-1 integrity check (S2K usage octet
    /// 254).
    pub fn encrypt(&self, _pk_algo: PublicKeyAlgorithm,
                   password: &Password)
                   -> Result<Encrypted> {
        use crate::serialize::Marshal;

        let s2k = S2K::default();
        let algo = SymmetricAlgorithm::AES256;
        let key = s2k.derive_key(password, algo.key_size()?)?;

        // The secret MPIs, followed by a SHA-1 integrity hash.
        let mut plain = Vec::new();
        self.mpis.serialize(&mut plain)?;
        let mut hash = HashAlgorithm::SHA1.context()?;
        hash.update(&plain);
        let mut digest = vec![0u8; hash.digest_size()];
        hash.digest(&mut digest);
        plain.extend_from_slice(&digest);

        let mut iv = vec![0u8; algo.block_size()?];
        crypto::random(&mut iv);
        crypto::symmetric::encrypt_cfb(algo, &key, &iv, &mut plain)?;

        Ok(Encrypted {
            s2k,
            algo,
            checksum: Some(SecretKeyChecksum::SHA1),
            aead: None,
            iv: iv.into_boxed_slice(),
            ciphertext: plain.into_boxed_slice(),
        })
    }
}

/// Secret key material encrypted with a password.
///
/// This type allows postponing the decryption of the secret key
/// material until it is actually needed.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Encrypted {
    /// Key derivation mechanism to use.
    s2k: S2K,
    /// Symmetric algorithm used to encrypt the secret key material.
    algo: SymmetricAlgorithm,
    /// Checksum method protecting the secret key material.
    ///
    /// `None` for the AEAD protection mode, where the mode's tag
    /// takes the checksum's place.
    checksum: Option<SecretKeyChecksum>,
    /// AEAD mode and nonce, for S2K usage octet 253.
    aead: Option<(AEADAlgorithm, Box<[u8]>)>,
    /// The initialization vector, for the CFB modes.
    iv: Box<[u8]>,
    /// Encrypted secret key material.
    ciphertext: Box<[u8]>,
}
assert_send_and_sync!(Encrypted);

/// The checksum algorithm protecting encrypted secret key material.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SecretKeyChecksum {
    /// A SHA-1 hash (S2K usage octet 254).
    SHA1,
    /// A 16-bit sum of the octets (S2K usage octet 255, and the
    /// legacy direct-cipher-octet encoding).
    Sum16,
}
assert_send_and_sync!(SecretKeyChecksum);

impl Default for SecretKeyChecksum {
    fn default() -> Self {
        SecretKeyChecksum::SHA1
    }
}

impl Encrypted {
    /// Creates a new encrypted key object.
    pub fn new(s2k: S2K, algo: SymmetricAlgorithm,
               checksum: Option<SecretKeyChecksum>,
               iv: Box<[u8]>, ciphertext: Box<[u8]>)
               -> Self {
        Encrypted {
            s2k,
            algo,
            checksum,
            aead: None,
            iv,
            ciphertext,
        }
    }

    /// Creates a new AEAD-protected encrypted key object (S2K usage
    /// octet 253).
    pub fn new_aead(s2k: S2K, algo: SymmetricAlgorithm,
                    aead_algo: AEADAlgorithm, aead_iv: Box<[u8]>,
                    ciphertext: Box<[u8]>)
                    -> Self {
        Encrypted {
            s2k,
            algo,
            checksum: None,
            aead: Some((aead_algo, aead_iv)),
            iv: Default::default(),
            ciphertext,
        }
    }

    /// Returns the key derivation mechanism.
    pub fn s2k(&self) -> &S2K {
        &self.s2k
    }

    /// Returns the symmetric algorithm used to encrypt the secret
    /// key material.
    pub fn algo(&self) -> SymmetricAlgorithm {
        self.algo
    }

    /// Returns the checksum method protecting the secret key
    /// material.
    pub fn checksum(&self) -> Option<SecretKeyChecksum> {
        self.checksum
    }

    /// Returns the AEAD parameters, if the material uses the AEAD
    /// protection mode.
    pub fn aead(&self) -> Option<(AEADAlgorithm, &[u8])> {
        self.aead.as_ref().map(|(a, iv)| (*a, &iv[..]))
    }

    /// Returns the initialization vector.
    pub fn iv(&self) -> &[u8] {
        &self.iv
    }

    /// Returns the encrypted secret key material.
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Decrypts the secret key material using `password`.
    pub fn decrypt(&self, pk_algo: PublicKeyAlgorithm,
                   password: &Password)
                   -> Result<Unencrypted> {
        let key = self.s2k.derive_key(password, self.algo.key_size()?)?;

        let plain: Protected = if let Some((aead_algo, aead_iv)) =
            &self.aead
        {
            // S2K usage octet 253: the KEK is expanded with HKDF, and
            // the secret MPIs are sealed with the AEAD mode; the
            // packet context is bound via the associated data.
            let info = aead_info(self.algo, *aead_algo);
            let kek = hkdf_expand(&key, &info, self.algo.key_size()?)?;

            let mut ctx = aead_algo.context(self.algo, &kek, aead_iv)?;
            let mut plain = Vec::with_capacity(self.ciphertext.len());
            ctx.decrypt_verify(&mut plain, &self.ciphertext, &info)
                .map_err(|_| Error::InvalidPassword)?;
            Protected::from(plain)
        } else {
            let mut plain: Protected = self.ciphertext.to_vec().into();
            crypto::symmetric::decrypt_cfb(self.algo, &key, &self.iv,
                                           &mut plain)?;
            plain
        };

        // Verify the checksum.
        let plain = match self.checksum.unwrap_or_default() {
            _ if self.aead.is_some() => {
                // The AEAD tag took the checksum's place.
                &plain[..]
            }
            SecretKeyChecksum::SHA1 => {
                if plain.len() < 20 {
                    return Err(Error::InvalidPassword.into());
                }
                let split = plain.len() - 20;
                let mut hash = HashAlgorithm::SHA1.context()?;
                hash.update(&plain[..split]);
                let mut digest = vec![0u8; 20];
                hash.digest(&mut digest);
                if crate::crypto::mem::secure_cmp(
                    &digest, &plain[split..]) != Ordering::Equal
                {
                    return Err(Error::InvalidPassword.into());
                }
                &plain[..split]
            }
            SecretKeyChecksum::Sum16 => {
                crypto::verify_checksum(&plain)
                    .map_err(|_| Error::InvalidPassword)?
            }
        };

        let mpis = mpi::SecretKeyMaterial::parse(pk_algo, plain)?;
        Ok(mpis.into())
    }
}

/// Computes the info string binding an AEAD-protected secret key to
/// its packet context.
fn aead_info(algo: SymmetricAlgorithm, aead_algo: AEADAlgorithm) -> [u8; 4] {
    [0xc0 | u8::from(crate::packet::Tag::SecretKey),
     4, // Key packet version.
     algo.into(),
     aead_algo.into()]
}

/// Expands the S2K output into the AEAD key encryption key.
fn hkdf_expand(ikm: &[u8], info: &[u8], len: usize) -> Result<Protected> {
    use hkdf::Hkdf;

    let hkdf = Hkdf::<sha2::Sha256>::new(None, ikm);
    let mut okm = Protected::new(len);
    hkdf.expand(info, &mut okm)
        .map_err(|_| Error::InvalidOperation(
            "HKDF expansion failed".into()))?;
    Ok(okm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_and_fingerprint_ecc() {
        let key: Key4<SecretParts, PrimaryRole> =
            Key4::generate_ecc(true, Curve::Ed25519).unwrap();
        assert_eq!(key.pk_algo(), PublicKeyAlgorithm::EdDSA);

        // The fingerprint is a function of the public material only.
        let fpr = key.fingerprint();
        let (public, _) = key.take_secret();
        assert_eq!(public.fingerprint(), fpr);
        assert_match!(Fingerprint::V4(_) = fpr);
    }

    #[test]
    fn secret_protection_roundtrip() {
        let key: Key4<SecretParts, PrimaryRole> =
            Key4::generate_ecc(true, Curve::Ed25519).unwrap();
        let before = match key.secret() {
            SecretKeyMaterial::Unencrypted(u) =>
                u.map(|m| m.clone()),
            _ => unreachable!(),
        };

        let key = key.encrypt_secret(&"ouroboros".into()).unwrap();
        assert!(matches!(key.secret(), SecretKeyMaterial::Encrypted(_)));

        // A wrong password fails the SHA-1 check.
        assert!(key.clone().decrypt_secret(&"aurora".into()).is_err());

        let key = key.decrypt_secret(&"ouroboros".into()).unwrap();
        match key.secret() {
            SecretKeyMaterial::Unencrypted(u) =>
                u.map(|m| assert_eq!(m, &before)),
            _ => unreachable!(),
        };
    }

    #[test]
    fn into_keypair_requires_plaintext_secrets() {
        let key: Key4<SecretParts, PrimaryRole> =
            Key4::generate_ecc(true, Curve::Ed25519).unwrap();
        let key = key.encrypt_secret(&"pw".into()).unwrap();
        assert!(key.into_keypair().is_err());
    }
}
