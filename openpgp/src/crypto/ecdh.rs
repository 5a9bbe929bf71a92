//! Elliptic Curve Diffie-Hellman.
//!
//! OpenPGP's ECDH scheme is defined in [RFC 6637]: an ephemeral
//! scalar multiplication produces a shared point whose x-coordinate
//! is run through a one-step KDF; the resulting key-encryption key
//! wraps the session key using the AES Key Wrap algorithm of [RFC
//! 3394].
//!
//!   [RFC 6637]: https://tools.ietf.org/html/rfc6637
//!   [RFC 3394]: https://tools.ietf.org/html/rfc3394

use cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use generic_array::GenericArray;

use crate::{Error, Result};
use crate::crypto::SessionKey;
use crate::crypto::mem::Protected;
use crate::crypto::mpi::{self, Ciphertext, MPI};
use crate::packet::{Key, key};
use crate::types::{Curve, HashAlgorithm, PublicKeyAlgorithm,
                   SymmetricAlgorithm};

/// Wraps a session key using Elliptic Curve Diffie-Hellman.
pub fn encrypt<R>(recipient: &Key<key::PublicParts, R>,
                  session_key: &Protected)
                  -> Result<Ciphertext>
    where R: key::KeyRole,
{
    let (curve, q) = match recipient.mpis() {
        mpi::PublicKey::ECDH { curve, q, .. } => (curve, q),
        _ => return Err(Error::InvalidArgument(
            "expected an ECDH public key".into()).into()),
    };

    match curve {
        Curve::Cv25519 => {
            use x25519_dalek::{StaticSecret, PublicKey};

            // Obtain the recipient public key R.
            let r = q.decode_point(curve)?.0;
            let r: [u8; 32] = r.try_into().map_err(|_| Error::MalformedMPI(
                "invalid Curve25519 point".into()))?;
            let r = PublicKey::from(r);

            // Generate an ephemeral key pair {v, V=vG}.
            let v = StaticSecret::random_from_rng(rand_core::OsRng);
            let vb = PublicKey::from(&v);

            // Compute the shared point S = vR.
            let s = v.diffie_hellman(&r);

            encrypt_wrap(recipient,
                         Protected::from(s.as_bytes().as_slice()),
                         MPI::new_compressed_point(vb.as_bytes()),
                         session_key)
        }

        Curve::NistP256 | Curve::NistP384 | Curve::NistP521 => {
            // The code below is macro-generated per curve, because
            // the p{256,384,521} crates export distinct types.
            macro_rules! nist_encrypt {
                ($crt:ident) => {{
                    use $crt::elliptic_curve::sec1::ToEncodedPoint;

                    let r = $crt::PublicKey::from_sec1_bytes(q.value())
                        .map_err(|_| Error::MalformedMPI(
                            "invalid SEC1 point".into()))?;

                    let v = $crt::elliptic_curve::ecdh::EphemeralSecret::random(
                        &mut rand_core::OsRng);
                    let vb = $crt::PublicKey::from(&v);
                    let vb = vb.to_encoded_point(false);

                    let s = v.diffie_hellman(&r);
                    let s = Protected::from(s.raw_secret_bytes().as_slice());

                    let vb = MPI::new(vb.as_bytes());
                    encrypt_wrap(recipient, s, vb, session_key)
                }};
            }

            match curve {
                Curve::NistP256 => nist_encrypt!(p256),
                Curve::NistP384 => nist_encrypt!(p384),
                Curve::NistP521 => nist_encrypt!(p521),
                _ => unreachable!(),
            }
        }

        _ => Err(Error::UnsupportedEllipticCurve(curve.clone()).into()),
    }
}

/// Wraps a session key.
///
/// After the Diffie-Hellman key exchange, the resulting shared secret
/// `S` is used to derive the key-encryption key, and the session key
/// is wrapped with it.
pub(crate) fn encrypt_wrap<R>(recipient: &Key<key::PublicParts, R>,
                              s: Protected, vb: MPI,
                              session_key: &Protected)
                              -> Result<Ciphertext>
    where R: key::KeyRole,
{
    match recipient.mpis() {
        mpi::PublicKey::ECDH { hash, sym, .. } => {
            let wrap_algo = *sym;
            let kek = kdf(recipient, &s, *hash, wrap_algo)?;

            // Pad the session key to an 8-byte granularity.
            let m = pkcs5_pad(session_key.clone(), 8)?;

            let wrapped = aes_key_wrap(wrap_algo, &kek, &m)?;

            Ok(Ciphertext::ECDH {
                e: vb,
                key: wrapped.into_boxed_slice(),
            })
        }
        _ => Err(Error::InvalidArgument(
            "expected an ECDH public key".into()).into()),
    }
}

/// Unwraps a session key using Elliptic Curve Diffie-Hellman.
pub fn decrypt<R>(recipient: &Key<key::PublicParts, R>,
                  recipient_sec: &mpi::SecretKeyMaterial,
                  ciphertext: &Ciphertext)
                  -> Result<SessionKey>
    where R: key::KeyRole,
{
    let (curve, scalar, e) = match (recipient.mpis(), recipient_sec,
                                    ciphertext) {
        (mpi::PublicKey::ECDH { curve, .. },
         mpi::SecretKeyMaterial::ECDH { scalar },
         Ciphertext::ECDH { e, .. }) => (curve, scalar, e),
        _ => return Err(Error::InvalidArgument(
            "expected an ECDH key and ciphertext".into()).into()),
    };

    let s: Protected = match curve {
        Curve::Cv25519 => {
            use x25519_dalek::{StaticSecret, PublicKey};

            // The ephemeral public point V.
            let v = e.decode_point(curve)?.0;
            let v: [u8; 32] = v.try_into().map_err(|_| Error::MalformedMPI(
                "invalid Curve25519 point".into()))?;
            let v = PublicKey::from(v);

            // The secret scalar is stored as a big-endian MPI; the
            // native scalar is little-endian.
            let mut r = scalar.value_padded(32)?;
            r.reverse();
            let r: [u8; 32] = r.as_ref().try_into().expect("padded to 32");
            let r = StaticSecret::from(r);

            Protected::from(r.diffie_hellman(&v).as_bytes().as_slice())
        }

        Curve::NistP256 | Curve::NistP384 | Curve::NistP521 => {
            macro_rules! nist_decrypt {
                ($crt:ident) => {{
                    let v = $crt::PublicKey::from_sec1_bytes(e.value())
                        .map_err(|_| Error::MalformedMPI(
                            "invalid SEC1 point".into()))?;

                    let field_size = (curve.len()? + 7) / 8;
                    let r = scalar.value_padded(field_size)?;
                    let r = $crt::SecretKey::from_slice(&r)
                        .map_err(|_| Error::InvalidKey(
                            "invalid ECDH scalar".into()))?;

                    let s = $crt::elliptic_curve::ecdh::diffie_hellman(
                        r.to_nonzero_scalar(), v.as_affine());
                    Protected::from(s.raw_secret_bytes().as_slice())
                }};
            }

            match curve {
                Curve::NistP256 => nist_decrypt!(p256),
                Curve::NistP384 => nist_decrypt!(p384),
                Curve::NistP521 => nist_decrypt!(p521),
                _ => unreachable!(),
            }
        }

        _ => return Err(Error::UnsupportedEllipticCurve(curve.clone()).into()),
    };

    decrypt_unwrap(recipient, &s, ciphertext)
}

/// Unwraps a session key.
///
/// After the Diffie-Hellman key exchange, the resulting shared secret
/// `S` is used to derive the key-encryption key, and the wrapped
/// session key is recovered with it.
pub(crate) fn decrypt_unwrap<R>(recipient: &Key<key::PublicParts, R>,
                                s: &Protected,
                                ciphertext: &Ciphertext)
                                -> Result<SessionKey>
    where R: key::KeyRole,
{
    match (recipient.mpis(), ciphertext) {
        (mpi::PublicKey::ECDH { hash, sym, .. },
         Ciphertext::ECDH { key, .. }) => {
            let wrap_algo = *sym;
            let kek = kdf(recipient, s, *hash, wrap_algo)?;

            let m = aes_key_unwrap(wrap_algo, &kek, key)?;
            let m = pkcs5_unpad(m)?;
            Ok(m.into())
        }
        _ => Err(Error::InvalidArgument(
            "expected an ECDH key and ciphertext".into()).into()),
    }
}

/// Derives a key-encryption key as specified in RFC 6637, Section 7.
fn kdf<R>(recipient: &Key<key::PublicParts, R>, x: &Protected,
          hash_algo: HashAlgorithm, wrap_algo: SymmetricAlgorithm)
          -> Result<Protected>
    where R: key::KeyRole,
{
    let curve = match recipient.mpis() {
        mpi::PublicKey::ECDH { curve, .. } => curve,
        _ => return Err(Error::InvalidArgument(
            "expected an ECDH public key".into()).into()),
    };

    // Param = curve_OID_len || curve_OID || public_key_alg_ID || 03
    //         || 01 || KDF_hash_ID || KEK_alg_ID for AESKeyWrap
    //         || "Anonymous Sender    " || recipient_fingerprint;
    let mut param = Vec::with_capacity(60);
    let oid = curve.oid();
    param.push(oid.len() as u8);
    param.extend_from_slice(oid);
    param.push(PublicKeyAlgorithm::ECDH.into());
    param.push(3);
    param.push(1);
    param.push(hash_algo.into());
    param.push(wrap_algo.into());
    param.extend_from_slice(b"Anonymous Sender    ");
    param.extend_from_slice(recipient.fingerprint().as_slice());

    let key_size = wrap_algo.key_size()?;
    let mut hash = hash_algo.context()?;
    if hash.digest_size() < key_size {
        return Err(Error::InvalidArgument(
            format!("KDF hash {} too short for {}", hash_algo, wrap_algo))
                   .into());
    }

    // KDF is a one-step KDF: Hash(00 00 00 01 || ZB || Param).
    hash.update([0u8, 0, 0, 1]);
    hash.update(x);
    hash.update(&param);

    let mut digest: Protected = vec![0; hash.digest_size()].into();
    hash.digest(&mut digest[..]);

    let mut key: Protected = vec![0; key_size].into();
    key.copy_from_slice(&digest[..key_size]);
    Ok(key)
}

/// Pads a byte string to a multiple of `block_size` as described in
/// PKCS#5.
fn pkcs5_pad(sk: Protected, block_size: usize) -> Result<Protected> {
    let n = block_size - sk.len() % block_size;
    let mut padded = Protected::new(sk.len() + n);
    padded[..sk.len()].copy_from_slice(&sk);
    for b in padded[sk.len()..].iter_mut() {
        *b = n as u8;
    }
    Ok(padded)
}

/// Removes PKCS#5 padding.
fn pkcs5_unpad(sk: Protected) -> Result<Protected> {
    if sk.is_empty() {
        return Err(Error::InvalidSessionKey("empty session key".into())
                   .into());
    }

    let n = sk[sk.len() - 1] as usize;
    if n == 0 || n > sk.len()
        || !sk[sk.len() - n..].iter().all(|&b| b as usize == n)
    {
        return Err(Error::InvalidSessionKey("bad padding".into()).into());
    }

    let mut unpadded = Protected::new(sk.len() - n);
    unpadded.copy_from_slice(&sk[..sk.len() - n]);
    Ok(unpadded)
}

const AES_KEY_WRAP_IV: u64 = 0xa6a6a6a6a6a6a6a6;

macro_rules! dispatch_aes {
    ($algo:expr, $fun:ident, $($arg:expr),*) => {
        match $algo {
            SymmetricAlgorithm::AES128 =>
                $fun::<aes::Aes128>($($arg),*),
            SymmetricAlgorithm::AES192 =>
                $fun::<aes::Aes192>($($arg),*),
            SymmetricAlgorithm::AES256 =>
                $fun::<aes::Aes256>($($arg),*),
            a => Err(Error::UnsupportedSymmetricAlgorithm(a).into()),
        }
    };
}

/// Wraps a key using the AES Key Wrap Algorithm.
///
/// See [RFC 3394].
///
///  [RFC 3394]: https://tools.ietf.org/html/rfc3394
pub fn aes_key_wrap(algo: SymmetricAlgorithm, key: &Protected,
                    plaintext: &Protected)
                    -> Result<Vec<u8>> {
    dispatch_aes!(algo, key_wrap, key, plaintext)
}

fn key_wrap<C>(key: &Protected, plaintext: &Protected) -> Result<Vec<u8>>
where
    C: BlockEncrypt + KeyInit,
{
    if plaintext.len() % 8 != 0 {
        return Err(Error::InvalidArgument(
            "plaintext must be a multiple of 8 bytes".into()).into());
    }

    let cipher = C::new_from_slice(key)
        .map_err(|_| Error::InvalidKey("invalid key length".into()))?;

    //   Inputs:  Plaintext, n 64-bit values {P1, P2, ..., Pn}, and
    //            Key, K (the KEK).
    //   Outputs: Ciphertext, (n+1) 64-bit values {C0, C1, ..., Cn}.
    let n = plaintext.len() / 8;
    let mut a = AES_KEY_WRAP_IV;
    let mut r = plaintext.to_vec();
    let mut block = [0u8; 16];

    // 2) Calculate intermediate values.
    for j in 0..6 {
        for i in 0..n {
            // B = AES(K, A | R[i])
            block[..8].copy_from_slice(&a.to_be_bytes());
            block[8..].copy_from_slice(&r[i * 8..(i + 1) * 8]);
            cipher.encrypt_block(GenericArray::from_mut_slice(&mut block));

            // A = MSB(64, B) ^ t where t = (n*j)+i
            let t = (n * j + i + 1) as u64;
            a = u64::from_be_bytes(block[..8].try_into().unwrap()) ^ t;

            // R[i] = LSB(64, B)
            r[i * 8..(i + 1) * 8].copy_from_slice(&block[8..]);
        }
    }

    // 3) Output the results.
    let mut ciphertext = Vec::with_capacity(8 + plaintext.len());
    ciphertext.extend_from_slice(&a.to_be_bytes());
    ciphertext.extend_from_slice(&r);
    Ok(ciphertext)
}

/// Unwraps an encrypted key using the AES Key Wrap Algorithm.
///
/// See [RFC 3394].
///
///  [RFC 3394]: https://tools.ietf.org/html/rfc3394
pub fn aes_key_unwrap(algo: SymmetricAlgorithm, key: &Protected,
                      ciphertext: &[u8])
                      -> Result<Protected> {
    dispatch_aes!(algo, key_unwrap, key, ciphertext)
}

fn key_unwrap<C>(key: &Protected, ciphertext: &[u8]) -> Result<Protected>
where
    C: BlockDecrypt + KeyInit,
{
    if ciphertext.len() % 8 != 0 || ciphertext.len() < 16 {
        return Err(Error::InvalidArgument(
            "ciphertext must be a multiple of 8 bytes".into()).into());
    }

    let cipher = C::new_from_slice(key)
        .map_err(|_| Error::InvalidKey("invalid key length".into()))?;

    //   Inputs:  Ciphertext, (n+1) 64-bit values {C0, C1, ..., Cn}, and
    //            Key, K (the KEK).
    //   Outputs: Plaintext, n 64-bit values {P1, P2, ..., Pn}.
    let n = ciphertext.len() / 8 - 1;
    let mut a = u64::from_be_bytes(ciphertext[..8].try_into().unwrap());
    let mut r: Protected = ciphertext[8..].into();
    let mut block = [0u8; 16];

    // 2) Compute intermediate values.
    for j in (0..6).rev() {
        for i in (0..n).rev() {
            // B = AES-1(K, (A ^ t) | R[i]) where t = n*j+i
            let t = (n * j + i + 1) as u64;
            block[..8].copy_from_slice(&(a ^ t).to_be_bytes());
            block[8..].copy_from_slice(&r[i * 8..(i + 1) * 8]);
            cipher.decrypt_block(GenericArray::from_mut_slice(&mut block));

            // A = MSB(64, B)
            a = u64::from_be_bytes(block[..8].try_into().unwrap());

            // R[i] = LSB(64, B)
            r[i * 8..(i + 1) * 8].copy_from_slice(&block[8..]);
        }
    }

    // 3) Output results.
    if a == AES_KEY_WRAP_IV {
        Ok(r)
    } else {
        Err(Error::InvalidSessionKey("key unwrap failed".into()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc3394_test_vectors() {
        // 4.1 Wrap 128 bits of Key Data with a 128-bit KEK.
        let kek: Protected = crate::fmt::hex::decode(
            "000102030405060708090A0B0C0D0E0F").unwrap().into();
        let key_data: Protected = crate::fmt::hex::decode(
            "00112233445566778899AABBCCDDEEFF").unwrap().into();

        let wrapped =
            aes_key_wrap(SymmetricAlgorithm::AES128, &kek, &key_data)
            .unwrap();
        assert_eq!(
            crate::fmt::hex::encode(&wrapped),
            "1FA68B0A8112B447AEF34BD8FB5A7B829D3E862371D2CFE5");

        let unwrapped =
            aes_key_unwrap(SymmetricAlgorithm::AES128, &kek, &wrapped)
            .unwrap();
        assert_eq!(unwrapped, key_data);

        // 4.6 Wrap 256 bits of Key Data with a 256-bit KEK.
        let kek: Protected = crate::fmt::hex::decode(
            "000102030405060708090A0B0C0D0E0F101112131415161718191A1B1C1D1E1F")
            .unwrap().into();
        let key_data: Protected = crate::fmt::hex::decode(
            "00112233445566778899AABBCCDDEEFF000102030405060708090A0B0C0D0E0F")
            .unwrap().into();

        let wrapped =
            aes_key_wrap(SymmetricAlgorithm::AES256, &kek, &key_data)
            .unwrap();
        assert_eq!(
            crate::fmt::hex::encode(&wrapped),
            "28C9F404C4B810F4CBCCB35CFB87F8263F5786E2D80ED326CBC7F0E71A99F43BFB988B9B7A02DD21");

        let unwrapped =
            aes_key_unwrap(SymmetricAlgorithm::AES256, &kek, &wrapped)
            .unwrap();
        assert_eq!(unwrapped, key_data);
    }

    #[test]
    fn unwrap_detects_tampering() {
        let kek: Protected = vec![0u8; 16].into();
        let key_data: Protected = vec![1u8; 16].into();

        let mut wrapped =
            aes_key_wrap(SymmetricAlgorithm::AES128, &kek, &key_data)
            .unwrap();
        wrapped[3] ^= 1;
        assert!(aes_key_unwrap(SymmetricAlgorithm::AES128, &kek, &wrapped)
                .is_err());
    }

    #[test]
    fn pkcs5_roundtrip() {
        let m: Protected = vec![1u8, 2, 3].into();
        let padded = pkcs5_pad(m, 8).unwrap();
        assert_eq!(padded.len(), 8);
        assert_eq!(&padded[3..], &[5, 5, 5, 5, 5]);
        let unpadded = pkcs5_unpad(padded).unwrap();
        assert_eq!(&unpadded[..], &[1, 2, 3]);

        // A whole extra block is added if the input is already
        // aligned.
        let m: Protected = vec![0u8; 8].into();
        assert_eq!(pkcs5_pad(m, 8).unwrap().len(), 16);
    }
}
