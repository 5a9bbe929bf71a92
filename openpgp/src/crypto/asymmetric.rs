//! Asymmetric crypto operations: signing, verification, encryption,
//! and decryption.

use num_bigint_dig::BigUint;
use rand::rngs::OsRng;
use rsa::{RsaPrivateKey, RsaPublicKey, Pkcs1v15Encrypt, Pkcs1v15Sign};
use rsa::traits::PublicKeyParts;

use crate::{Error, Result};
use crate::crypto::SessionKey;
use crate::crypto::mem::Protected;
use crate::crypto::mpi::{self, MPI, ProtectedMPI};
use crate::packet::{Key, key};
use crate::types::{Curve, HashAlgorithm, PublicKeyAlgorithm};

/// Creates a signature.
///
/// Used in the streaming [`Signer`], the methods binding components
/// to certificates (e.g. [`UserID::certify`]), [`SignatureBuilder`]'s
/// signing functions, etc.
///
///   [`Signer`]: ../serialize/stream/struct.Signer.html
///   [`UserID::certify`]: ../packet/struct.UserID.html
///   [`SignatureBuilder`]: ../packet/signature/struct.SignatureBuilder.html
///
/// This is a low-level mechanism to produce an arbitrary OpenPGP
/// signature.  Using this trait allows a caller to provide custom
/// signing services, e.g. ones backed by a smartcard.
pub trait Signer {
    /// Returns a reference to the public key.
    fn public(&self) -> &Key<key::PublicParts, key::UnspecifiedRole>;

    /// Creates a signature over the `digest` produced by `hash_algo`.
    fn sign(&mut self, hash_algo: HashAlgorithm, digest: &[u8])
            -> Result<mpi::Signature>;
}

impl Signer for Box<dyn Signer> {
    fn public(&self) -> &Key<key::PublicParts, key::UnspecifiedRole> {
        self.as_ref().public()
    }

    fn sign(&mut self, hash_algo: HashAlgorithm, digest: &[u8])
            -> Result<mpi::Signature> {
        self.as_mut().sign(hash_algo, digest)
    }
}

/// Decrypts a message.
///
/// Used by the streaming [`Decryptor`] to decrypt public-key
/// encrypted session keys.
///
///   [`Decryptor`]: ../parse/stream/struct.Decryptor.html
pub trait Decryptor {
    /// Returns a reference to the public key.
    fn public(&self) -> &Key<key::PublicParts, key::UnspecifiedRole>;

    /// Decrypts `ciphertext`, returning the plain session key.
    fn decrypt(&mut self, ciphertext: &mpi::Ciphertext,
               plaintext_len: Option<usize>)
               -> Result<SessionKey>;
}

/// A cryptographic key pair.
///
/// A `KeyPair` is a combination of public and secret key.  If both
/// are available, then a `KeyPair` implements the [`Signer`] and the
/// [`Decryptor`] trait.
///
///   [`Signer`]: trait.Signer.html
///   [`Decryptor`]: trait.Decryptor.html
#[derive(Clone)]
pub struct KeyPair {
    public: Key<key::PublicParts, key::UnspecifiedRole>,
    secret: key::Unencrypted,
}
assert_send_and_sync!(KeyPair);

impl KeyPair {
    /// Creates a new key pair.
    pub fn new(public: Key<key::PublicParts, key::UnspecifiedRole>,
               secret: key::Unencrypted)
               -> Result<Self> {
        Ok(Self {
            public,
            secret,
        })
    }

    /// Returns a reference to the public key.
    pub fn public(&self) -> &Key<key::PublicParts, key::UnspecifiedRole> {
        &self.public
    }

    /// Returns a reference to the secret key.
    pub fn secret(&self) -> &key::Unencrypted {
        &self.secret
    }
}

impl Signer for KeyPair {
    fn public(&self) -> &Key<key::PublicParts, key::UnspecifiedRole> {
        &self.public
    }

    fn sign(&mut self, hash_algo: HashAlgorithm, digest: &[u8])
            -> Result<mpi::Signature> {
        let public = &self.public;
        self.secret.map(|secret| {
            sign_digest(public.pk_algo(), public.mpis(), secret,
                        hash_algo, digest)
        })
    }
}

impl Decryptor for KeyPair {
    fn public(&self) -> &Key<key::PublicParts, key::UnspecifiedRole> {
        &self.public
    }

    fn decrypt(&mut self, ciphertext: &mpi::Ciphertext,
               plaintext_len: Option<usize>)
               -> Result<SessionKey> {
        let public = &self.public;
        self.secret.map(|secret| {
            decrypt_session(public, secret, ciphertext, plaintext_len)
        })
    }
}

/// Converts a hash algorithm to the matching PKCS#1 v1.5 signature
/// scheme, including the DigestInfo prefix.
fn pkcs1v15_scheme(hash_algo: HashAlgorithm) -> Result<Pkcs1v15Sign> {
    match hash_algo {
        HashAlgorithm::MD5 => Ok(Pkcs1v15Sign::new::<md5::Md5>()),
        HashAlgorithm::SHA1 =>
            Ok(Pkcs1v15Sign::new::<sha1collisiondetection::Sha1CD>()),
        HashAlgorithm::RipeMD => Ok(Pkcs1v15Sign::new::<ripemd::Ripemd160>()),
        HashAlgorithm::SHA224 => Ok(Pkcs1v15Sign::new::<sha2::Sha224>()),
        HashAlgorithm::SHA256 => Ok(Pkcs1v15Sign::new::<sha2::Sha256>()),
        HashAlgorithm::SHA384 => Ok(Pkcs1v15Sign::new::<sha2::Sha384>()),
        HashAlgorithm::SHA512 => Ok(Pkcs1v15Sign::new::<sha2::Sha512>()),
        a => Err(Error::UnsupportedHashAlgorithm(a).into()),
    }
}

fn rsa_private_key(e: &MPI, n: &MPI, p: &ProtectedMPI, q: &ProtectedMPI,
                   d: &ProtectedMPI)
                   -> Result<RsaPrivateKey> {
    let key = RsaPrivateKey::from_components(
        BigUint::from_bytes_be(n.value()),
        BigUint::from_bytes_be(e.value()),
        BigUint::from_bytes_be(d.value()),
        vec![
            BigUint::from_bytes_be(p.value()),
            BigUint::from_bytes_be(q.value()),
        ])?;

    // This checks that p * q == n, that p and q are prime, and that
    // d and e are inverses in Phi(n).
    key.validate()?;
    Ok(key)
}

fn rsa_public_key(e: &MPI, n: &MPI) -> Result<RsaPublicKey> {
    Ok(RsaPublicKey::new(
        BigUint::from_bytes_be(n.value()),
        BigUint::from_bytes_be(e.value()))?)
}

/// Creates a signature over a digest, dispatching on the key's
/// algorithm.
pub(crate) fn sign_digest(pk_algo: PublicKeyAlgorithm,
                          mpis: &mpi::PublicKey,
                          secret: &mpi::SecretKeyMaterial,
                          hash_algo: HashAlgorithm,
                          digest: &[u8])
                          -> Result<mpi::Signature> {
    use crate::crypto::mpi::{PublicKey, SecretKeyMaterial};

    #[allow(deprecated)]
    match (pk_algo, mpis, secret) {
        (PublicKeyAlgorithm::RSAEncryptSign,
         PublicKey::RSA { e, n },
         SecretKeyMaterial::RSA { p, q, d, .. })
        | (PublicKeyAlgorithm::RSASign,
           PublicKey::RSA { e, n },
           SecretKeyMaterial::RSA { p, q, d, .. }) => {
            let key = rsa_private_key(e, n, p, q, d)?;
            let scheme = pkcs1v15_scheme(hash_algo)?;
            // sign_with_rng blinds the private key operation.
            let sig = key.sign_with_rng(&mut OsRng, scheme, digest)?;
            Ok(mpi::Signature::RSA {
                s: MPI::new(&sig),
            })
        }

        (PublicKeyAlgorithm::DSA,
         PublicKey::DSA { p, q, g, y },
         SecretKeyMaterial::DSA { x }) => {
            use dsa::signature::hazmat::PrehashSigner;

            let components = dsa::Components::from_components(
                BigUint::from_bytes_be(p.value()),
                BigUint::from_bytes_be(q.value()),
                BigUint::from_bytes_be(g.value()))?;
            let public = dsa::VerifyingKey::from_components(
                components,
                BigUint::from_bytes_be(y.value()))?;
            let secret = dsa::SigningKey::from_components(
                public,
                BigUint::from_bytes_be(x.value()))?;

            let sig = secret.sign_prehash(digest)?;
            Ok(mpi::Signature::DSA {
                r: MPI::new(&sig.r().to_bytes_be()),
                s: MPI::new(&sig.s().to_bytes_be()),
            })
        }

        (PublicKeyAlgorithm::EdDSA,
         PublicKey::EdDSA { curve, .. },
         SecretKeyMaterial::EdDSA { scalar }) => match curve {
            Curve::Ed25519 => {
                use ed25519_dalek::{SigningKey, Signer as _};

                let scalar = scalar.value_padded(32)?;
                let scalar: &[u8; 32] =
                    scalar.as_ref().try_into().expect("padded to 32");
                let secret = SigningKey::from_bytes(scalar);

                let sig = secret.sign(digest).to_bytes();
                Ok(mpi::Signature::EdDSA {
                    r: MPI::new(&sig[..32]),
                    s: MPI::new(&sig[32..]),
                })
            }
            _ => Err(Error::UnsupportedEllipticCurve(curve.clone()).into()),
        },

        (PublicKeyAlgorithm::ECDSA,
         PublicKey::ECDSA { curve, .. },
         SecretKeyMaterial::ECDSA { scalar }) => {
            use ecdsa::signature::hazmat::PrehashSigner;

            macro_rules! nist_sign {
                ($crt:ident) => {{
                    let field_size = (curve.len()? + 7) / 8;
                    let scalar = scalar.value_padded(field_size)?;
                    let secret = $crt::ecdsa::SigningKey::from_slice(&scalar)
                        .map_err(|_| Error::InvalidKey(
                            "invalid ECDSA scalar".into()))?;

                    let sig: $crt::ecdsa::Signature =
                        secret.sign_prehash(digest)?;
                    let sig = sig.to_bytes();
                    let half = sig.len() / 2;
                    Ok(mpi::Signature::ECDSA {
                        r: MPI::new(&sig[..half]),
                        s: MPI::new(&sig[half..]),
                    })
                }};
            }

            match curve {
                Curve::NistP256 => nist_sign!(p256),
                Curve::NistP384 => nist_sign!(p384),
                Curve::NistP521 => nist_sign!(p521),
                _ => Err(Error::UnsupportedEllipticCurve(curve.clone())
                         .into()),
            }
        }

        (pk_algo, _, _) =>
            Err(Error::UnsupportedPublicKeyAlgorithm(pk_algo).into()),
    }
}

/// Verifies a signature over a digest.
pub(crate) fn verify_digest(pk_algo: PublicKeyAlgorithm,
                            mpis: &mpi::PublicKey,
                            sig: &mpi::Signature,
                            hash_algo: HashAlgorithm,
                            digest: &[u8])
                            -> Result<()> {
    use crate::crypto::mpi::{PublicKey, Signature};

    let bad = |e: &str| -> anyhow::Error {
        Error::BadSignature(e.into()).into()
    };

    #[allow(deprecated)]
    match (pk_algo, mpis, sig) {
        (PublicKeyAlgorithm::RSAEncryptSign,
         PublicKey::RSA { e, n },
         Signature::RSA { s })
        | (PublicKeyAlgorithm::RSASign,
           PublicKey::RSA { e, n },
           Signature::RSA { s }) => {
            let key = rsa_public_key(e, n)?;
            let scheme = pkcs1v15_scheme(hash_algo)?;
            // The signature must be padded up to the modulus size.
            let s = s.value_padded(key.size())
                .map_err(|_| bad("signature exceeds modulus"))?;
            key.verify(scheme, digest, &s)
                .map_err(|_| bad("RSA signature verification failed"))?;
            Ok(())
        }

        (PublicKeyAlgorithm::DSA,
         PublicKey::DSA { p, q, g, y },
         Signature::DSA { r, s }) => {
            use dsa::signature::hazmat::PrehashVerifier;

            let components = dsa::Components::from_components(
                BigUint::from_bytes_be(p.value()),
                BigUint::from_bytes_be(q.value()),
                BigUint::from_bytes_be(g.value()))?;
            let public = dsa::VerifyingKey::from_components(
                components,
                BigUint::from_bytes_be(y.value()))?;

            let sig = dsa::Signature::from_components(
                BigUint::from_bytes_be(r.value()),
                BigUint::from_bytes_be(s.value()))?;
            public.verify_prehash(digest, &sig)
                .map_err(|_| bad("DSA signature verification failed"))?;
            Ok(())
        }

        (PublicKeyAlgorithm::EdDSA,
         PublicKey::EdDSA { curve, q },
         Signature::EdDSA { r, s }) => match curve {
            Curve::Ed25519 => {
                use ed25519_dalek::{VerifyingKey, Signature as DalekSig};

                let (point, _) = q.decode_point(curve)?;
                let point: &[u8; 32] = point.try_into()
                    .map_err(|_| Error::MalformedMPI(
                        "invalid Ed25519 point".into()))?;
                let public = VerifyingKey::from_bytes(point)
                    .map_err(|_| Error::InvalidKey(
                        "invalid Ed25519 point".into()))?;

                let mut sig = [0u8; 64];
                sig[..32].copy_from_slice(&r.value_padded(32)?);
                sig[32..].copy_from_slice(&s.value_padded(32)?);
                let sig = DalekSig::from_bytes(&sig);

                public.verify_strict(digest, &sig)
                    .map_err(|_| bad("EdDSA signature verification failed"))?;
                Ok(())
            }
            _ => Err(Error::UnsupportedEllipticCurve(curve.clone()).into()),
        },

        (PublicKeyAlgorithm::ECDSA,
         PublicKey::ECDSA { curve, q },
         Signature::ECDSA { r, s }) => {
            use ecdsa::signature::hazmat::PrehashVerifier;

            macro_rules! nist_verify {
                ($crt:ident) => {{
                    // from_sec1_bytes rejects the point at infinity
                    // and points that are not on the curve.
                    let public =
                        $crt::ecdsa::VerifyingKey::from_sec1_bytes(q.value())
                        .map_err(|_| Error::InvalidKey(
                            "invalid SEC1 point".into()))?;

                    let field_size = (curve.len()? + 7) / 8;
                    let mut rs = Vec::with_capacity(2 * field_size);
                    rs.extend_from_slice(&r.value_padded(field_size)
                                         .map_err(|_| bad("r too large"))?);
                    rs.extend_from_slice(&s.value_padded(field_size)
                                         .map_err(|_| bad("s too large"))?);
                    let sig = $crt::ecdsa::Signature::from_slice(&rs)
                        .map_err(|_| bad("malformed ECDSA signature"))?;

                    public.verify_prehash(digest, &sig)
                        .map_err(
                            |_| bad("ECDSA signature verification failed"))?;
                    Ok(())
                }};
            }

            match curve {
                Curve::NistP256 => nist_verify!(p256),
                Curve::NistP384 => nist_verify!(p384),
                Curve::NistP521 => nist_verify!(p521),
                _ => Err(Error::UnsupportedEllipticCurve(curve.clone())
                         .into()),
            }
        }

        (pk_algo, _, _) =>
            Err(Error::UnsupportedPublicKeyAlgorithm(pk_algo).into()),
    }
}

/// Encrypts a session key with a public key.
pub(crate) fn encrypt_session<R>(recipient: &Key<key::PublicParts, R>,
                                 data: &Protected)
                                 -> Result<mpi::Ciphertext>
    where R: key::KeyRole,
{
    use crate::crypto::mpi::PublicKey;

    match recipient.mpis() {
        PublicKey::RSA { e, n } => {
            let key = rsa_public_key(e, n)?;
            // EME-PKCS1-v1_5 requires an 11 byte overhead.
            if data.len() + 11 > key.size() {
                return Err(Error::InvalidArgument(
                    "message too large for key".into()).into());
            }
            let ciphertext = key.encrypt(&mut OsRng, Pkcs1v15Encrypt,
                                         data)?;
            Ok(mpi::Ciphertext::RSA {
                c: MPI::new(&ciphertext),
            })
        }

        PublicKey::ElGamal { p, g, y } =>
            elgamal_encrypt(p, g, y, data),

        PublicKey::ECDH { .. } =>
            crate::crypto::ecdh::encrypt(recipient, data),

        _ => Err(Error::UnsupportedPublicKeyAlgorithm(
            recipient.pk_algo()).into()),
    }
}

/// Decrypts a session key with a secret key.
pub(crate) fn decrypt_session<R>(public: &Key<key::PublicParts, R>,
                                 secret: &mpi::SecretKeyMaterial,
                                 ciphertext: &mpi::Ciphertext,
                                 _plaintext_len: Option<usize>)
                                 -> Result<SessionKey>
    where R: key::KeyRole,
{
    use crate::crypto::mpi::{Ciphertext, PublicKey, SecretKeyMaterial};

    match (public.mpis(), secret, ciphertext) {
        (PublicKey::RSA { e, n },
         SecretKeyMaterial::RSA { p, q, d, .. },
         Ciphertext::RSA { c }) => {
            let key = rsa_private_key(e, n, p, q, d)?;
            let c = c.value_padded(key.size())?;
            // decrypt_blinded applies RSA blinding to defeat timing
            // side channels.
            let plain = key.decrypt_blinded(&mut OsRng, Pkcs1v15Encrypt, &c)
                .map_err(|_| Error::InvalidSessionKey(
                    "RSA decryption failed".into()))?;
            Ok(Protected::from(plain).into())
        }

        (PublicKey::ElGamal { p, .. },
         SecretKeyMaterial::ElGamal { x },
         Ciphertext::ElGamal { e, c }) =>
            elgamal_decrypt(p, x, e, c),

        (PublicKey::ECDH { .. },
         SecretKeyMaterial::ECDH { .. },
         Ciphertext::ECDH { .. }) =>
            crate::crypto::ecdh::decrypt(public, secret, ciphertext),

        _ => Err(Error::InvalidOperation(
            "key and ciphertext do not match".into()).into()),
    }
}

/// ElGamal encryption with EME-PKCS1-v1_5 padding.
///
/// The RustCrypto project does not provide an ElGamal
/// implementation, so this is done directly over `num-bigint-dig`.
fn elgamal_encrypt(p: &MPI, g: &MPI, y: &MPI, data: &Protected)
                   -> Result<mpi::Ciphertext> {
    let p_ = BigUint::from_bytes_be(p.value());
    let g_ = BigUint::from_bytes_be(g.value());
    let y_ = BigUint::from_bytes_be(y.value());
    let k_len = (p.bits() + 7) / 8;

    if data.len() + 11 > k_len {
        return Err(Error::InvalidArgument(
            "message too large for key".into()).into());
    }

    // EME-PKCS1-v1_5 padding: 00 02 <nonzero random> 00 M.
    let mut em: Protected = vec![0; k_len].into();
    em[1] = 2;
    let ps_len = k_len - data.len() - 3;
    for b in em[2..2 + ps_len].iter_mut() {
        let mut byte = [0u8];
        loop {
            crate::crypto::random(&mut byte);
            if byte[0] != 0 {
                break;
            }
        }
        *b = byte[0];
    }
    em[2 + ps_len] = 0;
    em[3 + ps_len..].copy_from_slice(data);

    // An ephemeral k uniformly from [1, p-2].
    let k = loop {
        let mut buf = vec![0; k_len];
        crate::crypto::random(&mut buf);
        let k = BigUint::from_bytes_be(&buf) % (&p_ - 1u8);
        if k > BigUint::from(0u8) {
            break k;
        }
    };

    let m = BigUint::from_bytes_be(&em);
    let e = g_.modpow(&k, &p_);
    let c = (m * y_.modpow(&k, &p_)) % &p_;

    Ok(mpi::Ciphertext::ElGamal {
        e: MPI::new(&e.to_bytes_be()),
        c: MPI::new(&c.to_bytes_be()),
    })
}

/// ElGamal decryption.
fn elgamal_decrypt(p: &MPI, x: &ProtectedMPI, e: &MPI, c: &MPI)
                   -> Result<SessionKey> {
    let p_ = BigUint::from_bytes_be(p.value());
    let x_ = BigUint::from_bytes_be(x.value());
    let e_ = BigUint::from_bytes_be(e.value());
    let c_ = BigUint::from_bytes_be(c.value());
    let k_len = (p.bits() + 7) / 8;

    // m = c * (e^x)^-1 mod p.  Since e^(p-1) == 1 mod p, the inverse
    // of e^x is e^(p-1-x).
    let exp = &p_ - 1u8 - &x_;
    let m = (c_ * e_.modpow(&exp, &p_)) % &p_;

    let em: Protected = {
        let raw = m.to_bytes_be();
        let mut em = Protected::new(k_len);
        let missing = k_len.checked_sub(raw.len())
            .ok_or_else(|| Error::InvalidSessionKey(
                "ElGamal decryption failed".into()))?;
        em[missing..].copy_from_slice(&raw);
        em
    };

    // Strip the EME-PKCS1-v1_5 padding.
    if em.len() < 11 || em[0] != 0 || em[1] != 2 {
        return Err(Error::InvalidSessionKey("bad padding".into()).into());
    }
    let sep = em[2..].iter().position(|&b| b == 0)
        .ok_or_else(|| Error::InvalidSessionKey("bad padding".into()))?;
    if sep < 8 {
        return Err(Error::InvalidSessionKey("bad padding".into()).into());
    }

    Ok(Protected::from(&em[2 + sep + 1..]).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elgamal_roundtrip() {
        // The 768-bit MODP group from RFC 2409.  Too small for real
        // use, but fine for exercising the arithmetic.
        let p = MPI::new(&crate::fmt::hex::decode(
            "FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD1\
             29024E088A67CC74020BBEA63B139B22514A08798E3404DD\
             EF9519B3CD3A431B302B0A6DF25F14374FE1356D6D51C245\
             E485B576625E7EC6F44C42E9A63A3620FFFFFFFFFFFFFFFF").unwrap());
        let g = MPI::new(&[2]);

        // x random, y = g^x mod p.
        let p_ = BigUint::from_bytes_be(p.value());
        let g_ = BigUint::from_bytes_be(g.value());
        let mut xb = vec![0u8; 32];
        crate::crypto::random(&mut xb);
        let x_ = BigUint::from_bytes_be(&xb) % &p_;
        let y = MPI::new(&g_.modpow(&x_, &p_).to_bytes_be());
        let x: ProtectedMPI = MPI::new(&x_.to_bytes_be()).into();

        let sk: Protected = b"0123456789abcdef"[..].into();
        let ct = elgamal_encrypt(&p, &g, &y, &sk).unwrap();

        match &ct {
            mpi::Ciphertext::ElGamal { e, c } => {
                let pt = elgamal_decrypt(&p, &x, e, c).unwrap();
                assert_eq!(&pt[..], &sk[..]);
            }
            _ => unreachable!(),
        }
    }
}
