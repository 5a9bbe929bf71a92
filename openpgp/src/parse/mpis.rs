//! Functions for parsing MPIs.

use crate::{
    Result,
    Error,
};
use crate::types::{
    Curve,
    HashAlgorithm,
    PublicKeyAlgorithm,
    SymmetricAlgorithm,
};
use crate::crypto::mem::Protected;
use crate::crypto::mpi::{self, MPI, ProtectedMPI};
use crate::parse::PacketHeaderParser;

impl MPI {
    /// Parses an OpenPGP MPI.
    ///
    /// See [Section 3.2 of RFC 4880] for details.
    ///
    ///   [Section 3.2 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-3.2
    pub(crate) fn parse(name_len: &str, name: &str,
                        php: &mut PacketHeaderParser)
                        -> Result<Self> {
        let bits = php.parse_be_u16(name_len)? as usize;
        if bits == 0 {
            // Zero-valued MPIs are rejected on read.
            return Err(Error::MalformedMPI(
                "Zero-length MPI".into()).into());
        }

        let bytes = (bits + 7) / 8;
        let value = php.parse_bytes(name, bytes)?;

        let unused_bits = bytes * 8 - bits;
        assert_eq!(bytes * 8 - unused_bits, bits);

        // Make sure the unused bits are zeroed.
        if unused_bits > 0 {
            let mask = !((1 << (8 - unused_bits)) - 1);
            let unused_value = value[0] & mask;

            if unused_value != 0 {
                return Err(Error::MalformedMPI(
                    format!("{} unused bits not zeroed: ({:x})",
                            unused_bits, unused_value)).into());
            }
        }

        let first_used_bit = 8 - unused_bits;
        if value[0] & (1 << (first_used_bit - 1)) == 0 {
            // The declared length is not minimal.
            return Err(Error::MalformedMPI(
                format!("leading bit is not set: \
                         expected bit {} to be set in {:8b} ({:x})",
                        first_used_bit, value[0], value[0])).into());
        }

        Ok(MPI::new(&value))
    }
}

impl ProtectedMPI {
    /// Parses an OpenPGP MPI containing secrets.
    ///
    /// See [Section 3.2 of RFC 4880] for details.
    pub(crate) fn parse(name_len: &str, name: &str,
                        php: &mut PacketHeaderParser)
                        -> Result<Self> {
        // The checks are identical to the public variant; the value
        // moves into protected memory.
        Ok(MPI::parse(name_len, name, php)?.into())
    }
}

impl<'a> crate::parse::Parse<'a, MPI> for MPI {
    fn from_reader<R: 'a + std::io::Read + Send + Sync>(mut reader: R)
                                                        -> Result<MPI> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Self::from_bytes(&buf)
    }

    fn from_bytes<D: AsRef<[u8]> + ?Sized + Send + Sync>(data: &'a D)
                                                         -> Result<MPI> {
        let mut php = PacketHeaderParser::new_naked(data.as_ref());
        let mpi = MPI::parse("mpi_len", "mpi", &mut php)?;
        if !php.exhausted()? {
            return Err(Error::MalformedMPI(
                "Trailing data after MPI".into()).into());
        }
        Ok(mpi)
    }
}

/// Parses a set of OpenPGP MPIs representing a public key.
///
/// See [Section 3.2 of RFC 4880] for details.
///
///   [Section 3.2 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-3.2
pub(crate) fn parse_public_key(algo: PublicKeyAlgorithm,
                               php: &mut PacketHeaderParser)
                               -> Result<mpi::PublicKey> {
    use crate::types::PublicKeyAlgorithm::*;

    #[allow(deprecated)]
    match algo {
        RSAEncryptSign | RSAEncrypt | RSASign => {
            let n = MPI::parse("rsa_public_n_len", "rsa_public_n", php)?;
            let e = MPI::parse("rsa_public_e_len", "rsa_public_e", php)?;

            Ok(mpi::PublicKey::RSA { e, n })
        }

        DSA => {
            let p = MPI::parse("dsa_public_p_len", "dsa_public_p", php)?;
            let q = MPI::parse("dsa_public_q_len", "dsa_public_q", php)?;
            let g = MPI::parse("dsa_public_g_len", "dsa_public_g", php)?;
            let y = MPI::parse("dsa_public_y_len", "dsa_public_y", php)?;

            Ok(mpi::PublicKey::DSA {
                p,
                q,
                g,
                y,
            })
        }

        ElGamalEncrypt | ElGamalEncryptSign => {
            let p = MPI::parse("elgamal_public_p_len", "elgamal_public_p",
                               php)?;
            let g = MPI::parse("elgamal_public_g_len", "elgamal_public_g",
                               php)?;
            let y = MPI::parse("elgamal_public_y_len", "elgamal_public_y",
                               php)?;

            Ok(mpi::PublicKey::ElGamal {
                p,
                g,
                y,
            })
        }

        EdDSA => {
            let curve_len = php.parse_u8("curve_len")? as usize;
            if curve_len == 0 || curve_len == 0xff {
                return Err(Error::MalformedPacket(
                    "Reserved OID length".into()).into());
            }
            let curve = php.parse_bytes("curve", curve_len)?;
            let q = MPI::parse("eddsa_public_len", "eddsa_public", php)?;

            Ok(mpi::PublicKey::EdDSA {
                curve: Curve::from_oid(&curve),
                q,
            })
        }

        ECDSA => {
            let curve_len = php.parse_u8("curve_len")? as usize;
            if curve_len == 0 || curve_len == 0xff {
                return Err(Error::MalformedPacket(
                    "Reserved OID length".into()).into());
            }
            let curve = php.parse_bytes("curve", curve_len)?;
            let q = MPI::parse("ecdsa_public_len", "ecdsa_public", php)?;

            Ok(mpi::PublicKey::ECDSA {
                curve: Curve::from_oid(&curve),
                q,
            })
        }

        ECDH => {
            let curve_len = php.parse_u8("curve_len")? as usize;
            if curve_len == 0 || curve_len == 0xff {
                return Err(Error::MalformedPacket(
                    "Reserved OID length".into()).into());
            }
            let curve = php.parse_bytes("curve", curve_len)?;
            let q = MPI::parse("ecdh_public_len", "ecdh_public", php)?;
            let kdf_len = php.parse_u8("kdf_len")?;

            if kdf_len != 3 {
                return Err(Error::MalformedPacket(
                    "wrong kdf length".into()).into());
            }

            let reserved = php.parse_u8("kdf_reserved")?;
            if reserved != 1 {
                return Err(Error::MalformedPacket(
                    format!("Reserved kdf field must be 1, got {}",
                            reserved)).into());
            }
            let hash: HashAlgorithm = php.parse_u8("kdf_hash")?.into();
            let sym: SymmetricAlgorithm = php.parse_u8("kek_symm")?.into();

            Ok(mpi::PublicKey::ECDH {
                curve: Curve::from_oid(&curve),
                q,
                hash,
                sym,
            })
        }

        X25519 | X448 | Ed25519 | Ed448
        | Unknown(_) | Private(_) => {
            let mut mpis = Vec::new();
            while let Ok(mpi) = MPI::parse("unknown_parameter_len",
                                           "unknown_parameter", php) {
                mpis.push(mpi);
            }
            let rest = php.parse_bytes_eof("rest")?;

            Ok(mpi::PublicKey::Unknown {
                mpis: mpis.into_boxed_slice(),
                rest: rest.into_boxed_slice(),
            })
        }
    }
}

/// Parses a set of OpenPGP MPIs representing a secret key.
///
/// See [Section 3.2 of RFC 4880] for details.
pub(crate) fn parse_secret_key_php(algo: PublicKeyAlgorithm,
                                   php: &mut PacketHeaderParser)
                                   -> Result<mpi::SecretKeyMaterial> {
    use crate::types::PublicKeyAlgorithm::*;

    #[allow(deprecated)]
    match algo {
        RSAEncryptSign | RSAEncrypt | RSASign => {
            let d = ProtectedMPI::parse(
                "rsa_secret_d_len", "rsa_secret_d", php)?;
            let p = ProtectedMPI::parse(
                "rsa_secret_p_len", "rsa_secret_p", php)?;
            let q = ProtectedMPI::parse(
                "rsa_secret_q_len", "rsa_secret_q", php)?;
            let u = ProtectedMPI::parse(
                "rsa_secret_u_len", "rsa_secret_u", php)?;

            Ok(mpi::SecretKeyMaterial::RSA {
                d,
                p,
                q,
                u,
            })
        }

        DSA => {
            let x = ProtectedMPI::parse(
                "dsa_secret_len", "dsa_secret", php)?;

            Ok(mpi::SecretKeyMaterial::DSA { x })
        }

        ElGamalEncrypt | ElGamalEncryptSign => {
            let x = ProtectedMPI::parse(
                "elgamal_secret_len", "elgamal_secret", php)?;

            Ok(mpi::SecretKeyMaterial::ElGamal { x })
        }

        EdDSA => {
            let scalar = ProtectedMPI::parse(
                "eddsa_secret_len", "eddsa_secret", php)?;

            Ok(mpi::SecretKeyMaterial::EdDSA { scalar })
        }

        ECDSA => {
            let scalar = ProtectedMPI::parse(
                "ecdsa_secret_len", "ecdsa_secret", php)?;

            Ok(mpi::SecretKeyMaterial::ECDSA { scalar })
        }

        ECDH => {
            let scalar = ProtectedMPI::parse(
                "ecdh_secret_len", "ecdh_secret", php)?;

            Ok(mpi::SecretKeyMaterial::ECDH { scalar })
        }

        X25519 | X448 | Ed25519 | Ed448
        | Unknown(_) | Private(_) => {
            let mut mpis = Vec::new();
            while let Ok(mpi) = ProtectedMPI::parse(
                "unknown_parameter_len", "unknown_parameter", php)
            {
                mpis.push(mpi);
            }
            let rest = php.parse_bytes_eof("rest")?;

            Ok(mpi::SecretKeyMaterial::Unknown {
                mpis: mpis.into_boxed_slice(),
                rest: Protected::from(rest),
            })
        }
    }
}

/// Parses a set of OpenPGP MPIs representing a secret key from a
/// buffer.
pub(crate) fn parse_secret_key<B: AsRef<[u8]>>(
    algo: PublicKeyAlgorithm, buf: B)
    -> Result<mpi::SecretKeyMaterial>
{
    let mut php = PacketHeaderParser::new_naked(buf.as_ref());
    parse_secret_key_php(algo, &mut php)
}

/// Parses a set of OpenPGP MPIs representing a ciphertext.
///
/// Expects MPIs for a public key algorithm `algo`s ciphertext.  See
/// [Section 3.2 of RFC 4880] for details.
///
///   [Section 3.2 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-3.2
pub(crate) fn parse_ciphertext(algo: PublicKeyAlgorithm,
                               php: &mut PacketHeaderParser)
                               -> Result<mpi::Ciphertext> {
    use crate::types::PublicKeyAlgorithm::*;

    #[allow(deprecated)]
    match algo {
        RSAEncryptSign | RSAEncrypt => {
            let c = MPI::parse("rsa_ciphertext_len", "rsa_ciphertext",
                               php)?;

            Ok(mpi::Ciphertext::RSA { c })
        }

        ElGamalEncrypt | ElGamalEncryptSign => {
            let e = MPI::parse("elgamal_e_len", "elgamal_e", php)?;
            let c = MPI::parse("elgamal_c_len", "elgamal_c", php)?;

            Ok(mpi::Ciphertext::ElGamal {
                e,
                c,
            })
        }

        ECDH => {
            let e = MPI::parse("ecdh_e_len", "ecdh_e", php)?;
            let key_len = php.parse_u8("ecdh_esk_len")? as usize;
            let key = php.parse_bytes("ecdh_esk", key_len)?;

            Ok(mpi::Ciphertext::ECDH {
                e,
                key: key.into_boxed_slice(),
            })
        }

        RSASign | DSA | EdDSA | ECDSA =>
            Err(Error::InvalidArgument(
                format!("not an encryption algorithm: {:?}", algo)).into()),

        X25519 | X448 | Ed25519 | Ed448
        | Unknown(_) | Private(_) => {
            let mut mpis = Vec::new();
            while let Ok(mpi) = MPI::parse("unknown_parameter_len",
                                           "unknown_parameter", php) {
                mpis.push(mpi);
            }
            let rest = php.parse_bytes_eof("rest")?;

            Ok(mpi::Ciphertext::Unknown {
                mpis: mpis.into_boxed_slice(),
                rest: rest.into_boxed_slice(),
            })
        }
    }
}

/// Parses a set of OpenPGP MPIs representing a signature.
///
/// Expects MPIs for a public key algorithm `algo`s signature.  See
/// [Section 3.2 of RFC 4880] for details.
///
///   [Section 3.2 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-3.2
pub(crate) fn parse_signature(algo: PublicKeyAlgorithm,
                              php: &mut PacketHeaderParser)
                              -> Result<mpi::Signature> {
    use crate::types::PublicKeyAlgorithm::*;

    #[allow(deprecated)]
    match algo {
        RSAEncryptSign | RSASign => {
            let s = MPI::parse("rsa_signature_len", "rsa_signature", php)?;

            Ok(mpi::Signature::RSA { s })
        }

        DSA => {
            let r = MPI::parse("dsa_sig_r_len", "dsa_sig_r", php)?;
            let s = MPI::parse("dsa_sig_s_len", "dsa_sig_s", php)?;

            Ok(mpi::Signature::DSA {
                r,
                s,
            })
        }

        ElGamalEncryptSign => {
            let r = MPI::parse("elgamal_sig_r_len", "elgamal_sig_r", php)?;
            let s = MPI::parse("elgamal_sig_s_len", "elgamal_sig_s", php)?;

            Ok(mpi::Signature::ElGamal {
                r,
                s,
            })
        }

        EdDSA => {
            let r = MPI::parse("eddsa_sig_r_len", "eddsa_sig_r", php)?;
            let s = MPI::parse("eddsa_sig_s_len", "eddsa_sig_s", php)?;

            Ok(mpi::Signature::EdDSA {
                r,
                s,
            })
        }

        ECDSA => {
            let r = MPI::parse("ecdsa_sig_r_len", "ecdsa_sig_r", php)?;
            let s = MPI::parse("ecdsa_sig_s_len", "ecdsa_sig_s", php)?;

            Ok(mpi::Signature::ECDSA {
                r,
                s,
            })
        }

        RSAEncrypt | ElGamalEncrypt | ECDH =>
            Err(Error::InvalidArgument(
                format!("not a signature algorithm: {:?}", algo)).into()),

        X25519 | X448 | Ed25519 | Ed448
        | Unknown(_) | Private(_) => {
            let mut mpis = Vec::new();
            while let Ok(mpi) = MPI::parse("unknown_parameter_len",
                                           "unknown_parameter", php) {
                mpis.push(mpi);
            }
            let rest = php.parse_bytes_eof("rest")?;

            Ok(mpi::Signature::Unknown {
                mpis: mpis.into_boxed_slice(),
                rest: rest.into_boxed_slice(),
            })
        }
    }
}

impl mpi::PublicKey {
    /// Parses a set of OpenPGP MPIs representing a public key from a
    /// buffer.
    pub fn parse<B: AsRef<[u8]>>(algo: PublicKeyAlgorithm, buf: B)
                                 -> Result<Self> {
        let mut php = PacketHeaderParser::new_naked(buf.as_ref());
        parse_public_key(algo, &mut php)
    }
}

impl mpi::SecretKeyMaterial {
    /// Parses a set of OpenPGP MPIs representing a secret key from a
    /// buffer.
    pub fn parse<B: AsRef<[u8]>>(algo: PublicKeyAlgorithm, buf: B)
                                 -> Result<Self> {
        parse_secret_key(algo, buf)
    }
}

impl mpi::Ciphertext {
    /// Parses a set of OpenPGP MPIs representing a ciphertext from a
    /// buffer.
    pub fn parse<B: AsRef<[u8]>>(algo: PublicKeyAlgorithm, buf: B)
                                 -> Result<Self> {
        let mut php = PacketHeaderParser::new_naked(buf.as_ref());
        parse_ciphertext(algo, &mut php)
    }
}

impl mpi::Signature {
    /// Parses a set of OpenPGP MPIs representing a signature from a
    /// buffer.
    pub fn parse<B: AsRef<[u8]>>(algo: PublicKeyAlgorithm, buf: B)
                                 -> Result<Self> {
        let mut php = PacketHeaderParser::new_naked(buf.as_ref());
        parse_signature(algo, &mut php)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::Parse;

    #[test]
    fn mpi_rejects_zero_length() {
        assert!(MPI::from_bytes(&[0x00, 0x00][..]).is_err());
    }

    #[test]
    fn mpi_rejects_non_minimal_encoding() {
        // Value 1 encoded with a declared length of 9 bits.
        assert!(MPI::from_bytes(&[0x00, 0x09, 0x00, 0x01][..]).is_err());
        // And with unused bits set.
        assert!(MPI::from_bytes(&[0x00, 0x01, 0x03][..]).is_err());
        // The canonical encoding parses.
        let m = MPI::from_bytes(&[0x00, 0x01, 0x01][..]).unwrap();
        assert_eq!(m.value(), &[0x01]);
    }

    #[test]
    fn mpi_parse_known_value() {
        let m = MPI::from_bytes(&[0x00, 0x09, 0x01, 0xff][..]).unwrap();
        assert_eq!(m.bits(), 9);
        assert_eq!(m.value(), &[0x01, 0xff]);
    }
}
