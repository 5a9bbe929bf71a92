//! Packet serialization.
//!
//! The packet serialization mirrors the parser: every data structure
//! that has a wire representation implements [`Marshal`], which
//! writes the structure to an arbitrary `io::Write`r, and usually
//! [`MarshalInto`], which additionally computes exact serialized
//! lengths and writes into byte slices.  The wire formats are
//! emitted canonically: MPIs are minimal, and packets use new-format
//! headers with the shortest possible length encoding.
//!
//!   [`Marshal`]: trait.Marshal.html
//!   [`MarshalInto`]: trait.MarshalInto.html

use std::io::Write;
use std::io;

use crate::{
    Error,
    Packet,
    Result,
};
use crate::crypto::S2K;
use crate::crypto::s2k::GnuS2K;
use crate::crypto::mpi::{self, MPI, ProtectedMPI};
use crate::packet::prelude::*;
use crate::packet::header::BodyLength;
use crate::packet::key::{self, SecretKeyChecksum, SecretKeyMaterial};
use crate::packet::signature::subpacket::{
    subpacket_length_len,
    subpacket_length_serialize,
    Subpacket,
    SubpacketArea,
    SubpacketValue,
};
use crate::packet::Tag;
use crate::types::Timestamp;

pub mod stream;

/// Serializes OpenPGP data structures.
pub trait Marshal {
    /// Writes a serialized version of the object to `o`.
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()>;
}

/// Serializes OpenPGP data structures into pre-allocated buffers.
pub trait MarshalInto {
    /// Computes the maximal length of the serialized representation.
    fn serialized_len(&self) -> usize;

    /// Serializes into the given buffer.
    ///
    /// Returns the length of the serialized representation.
    ///
    /// # Errors
    ///
    /// If the buffer is too small, this function returns
    /// `Error::InvalidArgument`.
    fn serialize_into(&self, buf: &mut [u8]) -> Result<usize>;

    /// Serializes the packet to a vector.
    fn to_vec(&self) -> Result<Vec<u8>> {
        let mut o = Vec::with_capacity(self.serialized_len());
        let len = self.serialize_into_unchecked(&mut o)?;
        crate::vec_truncate(&mut o, len);
        Ok(o)
    }

    /// Helper for the provided methods.
    #[doc(hidden)]
    fn serialize_into_unchecked(&self, o: &mut Vec<u8>) -> Result<usize>
        where Self: Sized,
    {
        o.resize(self.serialized_len(), 0);
        self.serialize_into(o)
    }
}

/// Implements `MarshalInto::serialize_into` in terms of
/// `Marshal::serialize`.
fn generic_serialize_into(o: &dyn Marshal, serialized_len: usize,
                          buf: &mut [u8])
                          -> Result<usize> {
    let buf_len = buf.len();
    let mut cursor = io::Cursor::new(buf);
    match o.serialize(&mut cursor) {
        Ok(_) => (),
        Err(e) => {
            let short_write =
                if let Some(ioe) = e.downcast_ref::<io::Error>() {
                    ioe.kind() == io::ErrorKind::WriteZero
                } else {
                    false
                };
            return if short_write {
                assert!(buf_len < serialized_len,
                        "o.serialized_len() underestimated the required \
                         space");
                Err(Error::InvalidArgument(
                    format!("Invalid buffer size, expected {}, got {}",
                            serialized_len, buf_len)).into())
            } else {
                Err(e)
            };
        }
    };
    Ok(cursor.position() as usize)
}

/// Writes a new-format body length.
fn write_new_length(l: usize, o: &mut dyn io::Write) -> Result<()> {
    let l = l as u64;
    if l < 192 {
        o.write_all(&[l as u8])?;
    } else if l < 8384 {
        let v = l - 192;
        o.write_all(&[(v >> 8) as u8 + 192, (v & 0xff) as u8])?;
    } else if l <= u32::MAX as u64 {
        o.write_all(&[0xff])?;
        o.write_all(&(l as u32).to_be_bytes())?;
    } else {
        return Err(Error::InvalidArgument(
            format!("Packet too large: {} bytes", l)).into());
    }
    Ok(())
}

/// The length of a new-format body length.
fn new_length_len(l: usize) -> usize {
    if l < 192 {
        1
    } else if l < 8384 {
        2
    } else {
        5
    }
}

impl Marshal for BodyLength {
    /// Emits the length encoded for use with a new-style CTB.
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        match self {
            BodyLength::Full(l) => write_new_length(*l as usize, o),
            BodyLength::Partial(l) => {
                if l.count_ones() != 1 || *l > (1 << 30) {
                    return Err(Error::InvalidArgument(
                        format!("Invalid partial body length: {}", l))
                               .into());
                }
                o.write_all(&[224 + l.trailing_zeros() as u8])?;
                Ok(())
            }
            BodyLength::Indeterminate =>
                Err(Error::InvalidArgument(
                    "Indeterminate lengths are only valid \
                     for old-style CTBs".into()).into()),
        }
    }
}

impl Marshal for MPI {
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        let bits = self.bits() as u16;
        o.write_all(&bits.to_be_bytes())?;
        o.write_all(self.value())?;
        Ok(())
    }
}

impl MarshalInto for MPI {
    fn serialized_len(&self) -> usize {
        2 + self.value().len()
    }

    fn serialize_into(&self, buf: &mut [u8]) -> Result<usize> {
        generic_serialize_into(self, self.serialized_len(), buf)
    }
}

impl Marshal for ProtectedMPI {
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        let bits = self.bits() as u16;
        o.write_all(&bits.to_be_bytes())?;
        o.write_all(self.value())?;
        Ok(())
    }
}

impl MarshalInto for ProtectedMPI {
    fn serialized_len(&self) -> usize {
        2 + self.value().len()
    }

    fn serialize_into(&self, buf: &mut [u8]) -> Result<usize> {
        generic_serialize_into(self, self.serialized_len(), buf)
    }
}

impl Marshal for mpi::PublicKey {
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        use crate::crypto::mpi::PublicKey::*;

        match self {
            RSA { e, n } => {
                n.serialize(o)?;
                e.serialize(o)?;
            }

            DSA { p, q, g, y } => {
                p.serialize(o)?;
                q.serialize(o)?;
                g.serialize(o)?;
                y.serialize(o)?;
            }

            ElGamal { p, g, y } => {
                p.serialize(o)?;
                g.serialize(o)?;
                y.serialize(o)?;
            }

            EdDSA { curve, q } => {
                o.write_all(&[curve.oid().len() as u8])?;
                o.write_all(curve.oid())?;
                q.serialize(o)?;
            }

            ECDSA { curve, q } => {
                o.write_all(&[curve.oid().len() as u8])?;
                o.write_all(curve.oid())?;
                q.serialize(o)?;
            }

            ECDH { curve, q, hash, sym } => {
                o.write_all(&[curve.oid().len() as u8])?;
                o.write_all(curve.oid())?;
                q.serialize(o)?;
                o.write_all(&[3u8, 1u8, (*hash).into(), (*sym).into()])?;
            }

            Unknown { mpis, rest } => {
                for mpi in mpis.iter() {
                    mpi.serialize(o)?;
                }
                o.write_all(rest)?;
            }
        }

        Ok(())
    }
}

impl MarshalInto for mpi::PublicKey {
    fn serialized_len(&self) -> usize {
        use crate::crypto::mpi::PublicKey::*;

        match self {
            RSA { e, n } =>
                n.serialized_len() + e.serialized_len(),
            DSA { p, q, g, y } =>
                p.serialized_len() + q.serialized_len()
                + g.serialized_len() + y.serialized_len(),
            ElGamal { p, g, y } =>
                p.serialized_len() + g.serialized_len()
                + y.serialized_len(),
            EdDSA { curve, q } =>
                1 + curve.oid().len() + q.serialized_len(),
            ECDSA { curve, q } =>
                1 + curve.oid().len() + q.serialized_len(),
            ECDH { curve, q, .. } =>
                1 + curve.oid().len() + q.serialized_len() + 4,
            Unknown { mpis, rest } =>
                mpis.iter().map(|m| m.serialized_len()).sum::<usize>()
                + rest.len(),
        }
    }

    fn serialize_into(&self, buf: &mut [u8]) -> Result<usize> {
        generic_serialize_into(self, self.serialized_len(), buf)
    }
}

impl Marshal for mpi::SecretKeyMaterial {
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        use crate::crypto::mpi::SecretKeyMaterial::*;

        match self {
            RSA { d, p, q, u } => {
                d.serialize(o)?;
                p.serialize(o)?;
                q.serialize(o)?;
                u.serialize(o)?;
            }

            DSA { x } => x.serialize(o)?,

            ElGamal { x } => x.serialize(o)?,

            EdDSA { scalar } => scalar.serialize(o)?,

            ECDSA { scalar } => scalar.serialize(o)?,

            ECDH { scalar } => scalar.serialize(o)?,

            Unknown { mpis, rest } => {
                for mpi in mpis.iter() {
                    mpi.serialize(o)?;
                }
                o.write_all(rest)?;
            }
        }

        Ok(())
    }
}

impl MarshalInto for mpi::SecretKeyMaterial {
    fn serialized_len(&self) -> usize {
        use crate::crypto::mpi::SecretKeyMaterial::*;

        match self {
            RSA { d, p, q, u } =>
                d.serialized_len() + p.serialized_len()
                + q.serialized_len() + u.serialized_len(),
            DSA { x } => x.serialized_len(),
            ElGamal { x } => x.serialized_len(),
            EdDSA { scalar } => scalar.serialized_len(),
            ECDSA { scalar } => scalar.serialized_len(),
            ECDH { scalar } => scalar.serialized_len(),
            Unknown { mpis, rest } =>
                mpis.iter().map(|m| m.serialized_len()).sum::<usize>()
                + rest.len(),
        }
    }

    fn serialize_into(&self, buf: &mut [u8]) -> Result<usize> {
        generic_serialize_into(self, self.serialized_len(), buf)
    }
}

impl Marshal for mpi::Ciphertext {
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        use crate::crypto::mpi::Ciphertext::*;

        match self {
            RSA { c } => c.serialize(o)?,

            ElGamal { e, c } => {
                e.serialize(o)?;
                c.serialize(o)?;
            }

            ECDH { e, key } => {
                e.serialize(o)?;
                o.write_all(&[key.len() as u8])?;
                o.write_all(key)?;
            }

            Unknown { mpis, rest } => {
                for mpi in mpis.iter() {
                    mpi.serialize(o)?;
                }
                o.write_all(rest)?;
            }
        }

        Ok(())
    }
}

impl MarshalInto for mpi::Ciphertext {
    fn serialized_len(&self) -> usize {
        use crate::crypto::mpi::Ciphertext::*;

        match self {
            RSA { c } => c.serialized_len(),
            ElGamal { e, c } => e.serialized_len() + c.serialized_len(),
            ECDH { e, key } => e.serialized_len() + 1 + key.len(),
            Unknown { mpis, rest } =>
                mpis.iter().map(|m| m.serialized_len()).sum::<usize>()
                + rest.len(),
        }
    }

    fn serialize_into(&self, buf: &mut [u8]) -> Result<usize> {
        generic_serialize_into(self, self.serialized_len(), buf)
    }
}

impl Marshal for mpi::Signature {
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        use crate::crypto::mpi::Signature::*;

        match self {
            RSA { s } => s.serialize(o)?,

            DSA { r, s } | ElGamal { r, s } | EdDSA { r, s }
            | ECDSA { r, s } => {
                r.serialize(o)?;
                s.serialize(o)?;
            }

            Unknown { mpis, rest } => {
                for mpi in mpis.iter() {
                    mpi.serialize(o)?;
                }
                o.write_all(rest)?;
            }
        }

        Ok(())
    }
}

impl MarshalInto for mpi::Signature {
    fn serialized_len(&self) -> usize {
        use crate::crypto::mpi::Signature::*;

        match self {
            RSA { s } => s.serialized_len(),
            DSA { r, s } | ElGamal { r, s } | EdDSA { r, s }
            | ECDSA { r, s } =>
                r.serialized_len() + s.serialized_len(),
            Unknown { mpis, rest } =>
                mpis.iter().map(|m| m.serialized_len()).sum::<usize>()
                + rest.len(),
        }
    }

    fn serialize_into(&self, buf: &mut [u8]) -> Result<usize> {
        generic_serialize_into(self, self.serialized_len(), buf)
    }
}

impl Marshal for S2K {
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        match self {
            S2K::Simple { hash } => {
                o.write_all(&[0, (*hash).into()])?;
            }
            S2K::Salted { hash, salt } => {
                o.write_all(&[1, (*hash).into()])?;
                o.write_all(&salt[..])?;
            }
            S2K::Iterated { hash, salt, hash_bytes } => {
                o.write_all(&[3, (*hash).into()])?;
                o.write_all(&salt[..])?;
                o.write_all(&[S2K::encode_count(*hash_bytes)?])?;
            }
            S2K::Gnu(GnuS2K::Dummy) => {
                o.write_all(&[101, 0])?;
                o.write_all(b"GNU")?;
                o.write_all(&[1])?;
            }
            S2K::Gnu(GnuS2K::DivertToCard { serial }) => {
                o.write_all(&[101, 0])?;
                o.write_all(b"GNU")?;
                o.write_all(&[2, serial.len() as u8])?;
                o.write_all(serial)?;
            }
            S2K::Private { tag, parameters }
            | S2K::Unknown { tag, parameters } => {
                o.write_all(&[*tag])?;
                if let Some(parameters) = parameters.as_ref() {
                    o.write_all(parameters)?;
                }
            }
        }

        Ok(())
    }
}

impl MarshalInto for S2K {
    fn serialized_len(&self) -> usize {
        match self {
            S2K::Simple { .. } => 2,
            S2K::Salted { .. } => 2 + 8,
            S2K::Iterated { .. } => 2 + 8 + 1,
            S2K::Gnu(GnuS2K::Dummy) => 6,
            S2K::Gnu(GnuS2K::DivertToCard { serial }) => 7 + serial.len(),
            S2K::Private { parameters, .. }
            | S2K::Unknown { parameters, .. } =>
                1 + parameters.as_ref().map(|p| p.len()).unwrap_or(0),
        }
    }

    fn serialize_into(&self, buf: &mut [u8]) -> Result<usize> {
        generic_serialize_into(self, self.serialized_len(), buf)
    }
}

impl SubpacketValue {
    /// The length of the value's wire representation, excluding the
    /// type octet.
    fn value_len(&self) -> usize {
        use self::SubpacketValue::*;
        match self {
            SignatureCreationTime(_) => 4,
            SignatureExpirationTime(_) => 4,
            ExportableCertification(_) => 1,
            TrustSignature { .. } => 2,
            RegularExpression(re) => re.len() + 1 /* NUL */,
            Revocable(_) => 1,
            KeyExpirationTime(_) => 4,
            PreferredSymmetricAlgorithms(p) => p.len(),
            Issuer(_) => 8,
            NotationData(nd) => 4 + 2 + 2 + nd.name().len()
                + nd.value().len(),
            PreferredHashAlgorithms(p) => p.len(),
            PreferredCompressionAlgorithms(p) => p.len(),
            KeyServerPreferences(p) => p.len(),
            PreferredKeyServer(p) => p.len(),
            PrimaryUserID(_) => 1,
            PolicyURI(p) => p.len(),
            KeyFlags(f) => f.as_bytes().len(),
            SignersUserID(u) => u.len(),
            ReasonForRevocation { reason, .. } => 1 + reason.len(),
            Features(f) => f.as_bytes().len(),
            SignatureTarget { digest, .. } => 2 + digest.len(),
            EmbeddedSignature(sig) => sig.serialized_len(),
            IssuerFingerprint(fp) => 1 + fp.as_slice().len(),
            PreferredAEADAlgorithms(p) => p.len(),
            Unknown { body, .. } => body.len(),
        }
    }

    fn serialize_value(&self, o: &mut dyn io::Write) -> Result<()> {
        use self::SubpacketValue::*;
        match self {
            SignatureCreationTime(t) =>
                o.write_all(&u32::from(*t).to_be_bytes())?,
            SignatureExpirationTime(t) =>
                o.write_all(&u32::from(*t).to_be_bytes())?,
            ExportableCertification(e) =>
                o.write_all(&[if *e { 1 } else { 0 }])?,
            TrustSignature { level, trust } =>
                o.write_all(&[*level, *trust])?,
            RegularExpression(re) => {
                o.write_all(re)?;
                o.write_all(&[0])?;
            }
            Revocable(r) =>
                o.write_all(&[if *r { 1 } else { 0 }])?,
            KeyExpirationTime(t) =>
                o.write_all(&u32::from(*t).to_be_bytes())?,
            PreferredSymmetricAlgorithms(p) => {
                for a in p {
                    o.write_all(&[(*a).into()])?;
                }
            }
            Issuer(id) => o.write_all(id.as_slice())?,
            NotationData(nd) => {
                o.write_all(nd.flags().as_bytes())?;
                o.write_all(&(nd.name().len() as u16).to_be_bytes())?;
                o.write_all(&(nd.value().len() as u16).to_be_bytes())?;
                o.write_all(nd.name().as_bytes())?;
                o.write_all(nd.value())?;
            }
            PreferredHashAlgorithms(p) => {
                for a in p {
                    o.write_all(&[(*a).into()])?;
                }
            }
            PreferredCompressionAlgorithms(p) => {
                for a in p {
                    o.write_all(&[(*a).into()])?;
                }
            }
            KeyServerPreferences(p) => o.write_all(p)?,
            PreferredKeyServer(p) => o.write_all(p)?,
            PrimaryUserID(p) =>
                o.write_all(&[if *p { 1 } else { 0 }])?,
            PolicyURI(p) => o.write_all(p)?,
            KeyFlags(f) => o.write_all(f.as_bytes())?,
            SignersUserID(u) => o.write_all(u)?,
            ReasonForRevocation { code, reason } => {
                o.write_all(&[(*code).into()])?;
                o.write_all(reason)?;
            }
            Features(f) => o.write_all(f.as_bytes())?,
            SignatureTarget { pk_algo, hash_algo, digest } => {
                o.write_all(&[(*pk_algo).into(), (*hash_algo).into()])?;
                o.write_all(digest)?;
            }
            EmbeddedSignature(sig) => sig.serialize(o)?,
            IssuerFingerprint(fp) => {
                // Version octet.
                o.write_all(&[4])?;
                o.write_all(fp.as_slice())?;
            }
            PreferredAEADAlgorithms(p) => {
                for a in p {
                    o.write_all(&[(*a).into()])?;
                }
            }
            Unknown { body, .. } => o.write_all(body)?,
        }
        Ok(())
    }
}

impl Marshal for Subpacket {
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        let value_len = self.value().value_len();
        let mut len = Vec::with_capacity(5);
        subpacket_length_serialize((1 + value_len) as u32, &mut len);
        o.write_all(&len)?;

        let tag: u8 = self.tag().into();
        o.write_all(&[if self.critical() { tag | 0x80 } else { tag }])?;
        self.value().serialize_value(o)?;
        Ok(())
    }
}

impl MarshalInto for Subpacket {
    fn serialized_len(&self) -> usize {
        let value_len = self.value().value_len();
        subpacket_length_len((1 + value_len) as u32) + 1 + value_len
    }

    fn serialize_into(&self, buf: &mut [u8]) -> Result<usize> {
        generic_serialize_into(self, self.serialized_len(), buf)
    }
}

impl Marshal for SubpacketArea {
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        for sp in self.iter() {
            sp.serialize(o)?;
        }
        Ok(())
    }
}

impl MarshalInto for SubpacketArea {
    fn serialized_len(&self) -> usize {
        self.iter().map(|sp| sp.serialized_len()).sum()
    }

    fn serialize_into(&self, buf: &mut [u8]) -> Result<usize> {
        generic_serialize_into(self, self.serialized_len(), buf)
    }
}

impl Marshal for Signature4 {
    /// Writes a serialized version of the signature packet's body to
    /// `o`.
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        o.write_all(&[
            4, // Version.
            self.typ().into(),
            self.pk_algo().into(),
            self.hash_algo().into(),
        ])?;

        let hashed = self.hashed_area().serialized_len();
        if hashed > u16::MAX as usize {
            return Err(Error::InvalidArgument(
                "hashed subpacket area too large".into()).into());
        }
        o.write_all(&(hashed as u16).to_be_bytes())?;
        self.hashed_area().serialize(o)?;

        let unhashed = self.unhashed_area().serialized_len();
        if unhashed > u16::MAX as usize {
            return Err(Error::InvalidArgument(
                "unhashed subpacket area too large".into()).into());
        }
        o.write_all(&(unhashed as u16).to_be_bytes())?;
        self.unhashed_area().serialize(o)?;

        o.write_all(self.digest_prefix())?;
        self.mpis().serialize(o)?;

        Ok(())
    }
}

impl MarshalInto for Signature4 {
    fn serialized_len(&self) -> usize {
        4 // Version, type, pk algo, hash algo.
            + 2 + self.hashed_area().serialized_len()
            + 2 + self.unhashed_area().serialized_len()
            + 2 // Digest prefix.
            + self.mpis().serialized_len()
    }

    fn serialize_into(&self, buf: &mut [u8]) -> Result<usize> {
        generic_serialize_into(self, self.serialized_len(), buf)
    }
}

impl Marshal for crate::packet::Signature {
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        match self {
            crate::packet::Signature::V4(sig) => sig.serialize(o),
        }
    }
}

impl MarshalInto for crate::packet::Signature {
    fn serialized_len(&self) -> usize {
        match self {
            crate::packet::Signature::V4(sig) => sig.serialized_len(),
        }
    }

    fn serialize_into(&self, buf: &mut [u8]) -> Result<usize> {
        match self {
            crate::packet::Signature::V4(sig) => sig.serialize_into(buf),
        }
    }
}

impl Marshal for OnePassSig3 {
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        o.write_all(&[
            3, // Version.
            self.typ().into(),
            self.hash_algo().into(),
            self.pk_algo().into(),
        ])?;
        o.write_all(self.issuer().as_slice())?;
        o.write_all(&[self.last_raw()])?;

        Ok(())
    }
}

impl MarshalInto for OnePassSig3 {
    fn serialized_len(&self) -> usize {
        4 + 8 + 1
    }

    fn serialize_into(&self, buf: &mut [u8]) -> Result<usize> {
        generic_serialize_into(self, self.serialized_len(), buf)
    }
}

/// Writes a serialized version of the key packet's body.
///
/// `serialize_secrets` controls whether the secret key material is
/// emitted; it is set for the `SecretKey` and `SecretSubkey` packet
/// types, and clear for their public counterparts.
fn serialize_key<P, R>(key: &key::Key4<P, R>, serialize_secrets: bool,
                       o: &mut dyn io::Write)
                       -> Result<()>
    where P: key::KeyParts,
          R: key::KeyRole,
{
    o.write_all(&[4 /* Version. */])?;
    let creation_time: u32 = Timestamp::try_from(key.creation_time())?
        .into();
    o.write_all(&creation_time.to_be_bytes())?;
    o.write_all(&[key.pk_algo().into()])?;
    key.mpis().serialize(o)?;

    if serialize_secrets {
        let secret = key.optional_secret()
            .ok_or_else(|| Error::InvalidOperation(
                "cannot serialize a secret key packet \
                 without secret key material".into()))?;

        match secret {
            SecretKeyMaterial::Unencrypted(u) => u.map(|mpis| -> Result<()> {
                // S2K usage octet 0: plaintext MPIs followed by a
                // 16-bit checksum.
                o.write_all(&[0])?;
                let material = mpis.to_vec()?;
                o.write_all(&material)?;
                let checksum = crate::crypto::checksum(&material);
                o.write_all(&checksum.to_be_bytes())?;
                Ok(())
            })?,
            SecretKeyMaterial::Encrypted(e) => {
                if let Some((aead_algo, aead_iv)) = e.aead() {
                    o.write_all(&[253,
                                  e.algo().into(),
                                  aead_algo.into()])?;
                    e.s2k().serialize(o)?;
                    o.write_all(aead_iv)?;
                    o.write_all(e.ciphertext())?;
                } else {
                    let usage = match e.checksum().unwrap_or_default() {
                        SecretKeyChecksum::SHA1 => 254,
                        SecretKeyChecksum::Sum16 => 255,
                    };
                    o.write_all(&[usage, e.algo().into()])?;
                    e.s2k().serialize(o)?;
                    o.write_all(e.iv())?;
                    o.write_all(e.ciphertext())?;
                }
            }
        }
    }

    Ok(())
}

fn serialized_key_len<P, R>(key: &key::Key4<P, R>, serialize_secrets: bool)
                            -> usize
    where P: key::KeyParts,
          R: key::KeyRole,
{
    let mut len = 1 + 4 + 1 + key.mpis().serialized_len();

    if serialize_secrets {
        len += match key.optional_secret() {
            None => 0,
            Some(SecretKeyMaterial::Unencrypted(u)) =>
                1 + u.map(|mpis| mpis.serialized_len()) + 2,
            Some(SecretKeyMaterial::Encrypted(e)) => {
                if let Some((_, aead_iv)) = e.aead() {
                    3 + e.s2k().serialized_len() + aead_iv.len()
                        + e.ciphertext().len()
                } else {
                    2 + e.s2k().serialized_len() + e.iv().len()
                        + e.ciphertext().len()
                }
            }
        };
    }

    len
}

impl Marshal for UserID {
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        o.write_all(self.value())?;
        Ok(())
    }
}

impl MarshalInto for UserID {
    fn serialized_len(&self) -> usize {
        self.value().len()
    }

    fn serialize_into(&self, buf: &mut [u8]) -> Result<usize> {
        generic_serialize_into(self, self.serialized_len(), buf)
    }
}

impl Marshal for UserAttribute {
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        o.write_all(self.value())?;
        Ok(())
    }
}

impl MarshalInto for UserAttribute {
    fn serialized_len(&self) -> usize {
        self.value().len()
    }

    fn serialize_into(&self, buf: &mut [u8]) -> Result<usize> {
        generic_serialize_into(self, self.serialized_len(), buf)
    }
}

impl Marshal for Marker {
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        o.write_all(Marker::BODY)?;
        Ok(())
    }
}

impl MarshalInto for Marker {
    fn serialized_len(&self) -> usize {
        Marker::BODY.len()
    }

    fn serialize_into(&self, buf: &mut [u8]) -> Result<usize> {
        generic_serialize_into(self, self.serialized_len(), buf)
    }
}

impl Marshal for Trust {
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        o.write_all(self.value())?;
        Ok(())
    }
}

impl MarshalInto for Trust {
    fn serialized_len(&self) -> usize {
        self.value().len()
    }

    fn serialize_into(&self, buf: &mut [u8]) -> Result<usize> {
        generic_serialize_into(self, self.serialized_len(), buf)
    }
}

impl Marshal for MDC {
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        o.write_all(self.digest())?;
        Ok(())
    }
}

impl MarshalInto for MDC {
    fn serialized_len(&self) -> usize {
        20
    }

    fn serialize_into(&self, buf: &mut [u8]) -> Result<usize> {
        generic_serialize_into(self, self.serialized_len(), buf)
    }
}

impl Marshal for PKESK3 {
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        o.write_all(&[3 /* Version. */])?;
        o.write_all(self.recipient().as_slice())?;
        o.write_all(&[self.pk_algo().into()])?;
        self.esk().serialize(o)?;

        Ok(())
    }
}

impl MarshalInto for PKESK3 {
    fn serialized_len(&self) -> usize {
        1 + 8 + 1 + self.esk().serialized_len()
    }

    fn serialize_into(&self, buf: &mut [u8]) -> Result<usize> {
        generic_serialize_into(self, self.serialized_len(), buf)
    }
}

impl Marshal for SKESK4 {
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        o.write_all(&[4, /* Version. */
                      self.symmetric_algo().into()])?;
        self.s2k().serialize(o)?;
        if let Some(esk) = self.esk() {
            o.write_all(esk)?;
        }

        Ok(())
    }
}

impl MarshalInto for SKESK4 {
    fn serialized_len(&self) -> usize {
        2 + self.s2k().serialized_len()
            + self.esk().map(|esk| esk.len()).unwrap_or(0)
    }

    fn serialize_into(&self, buf: &mut [u8]) -> Result<usize> {
        generic_serialize_into(self, self.serialized_len(), buf)
    }
}

impl Marshal for SKESK5 {
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        o.write_all(&[5, /* Version. */
                      self.symmetric_algo().into(),
                      self.aead_algo().into()])?;
        self.s2k().serialize(o)?;
        o.write_all(self.aead_iv())?;
        if let Some(esk) = self.esk() {
            o.write_all(esk)?;
        }
        o.write_all(self.aead_digest())?;

        Ok(())
    }
}

impl MarshalInto for SKESK5 {
    fn serialized_len(&self) -> usize {
        3 + self.s2k().serialized_len()
            + self.aead_iv().len()
            + self.esk().map(|esk| esk.len()).unwrap_or(0)
            + self.aead_digest().len()
    }

    fn serialize_into(&self, buf: &mut [u8]) -> Result<usize> {
        generic_serialize_into(self, self.serialized_len(), buf)
    }
}

impl Literal {
    /// Writes the headers of the literal data packet to `o`.
    pub(crate) fn serialize_headers(&self, o: &mut dyn io::Write)
                                    -> Result<()> {
        let filename = self.filename().unwrap_or(&[]);
        let date: u32 = self.date()
            .map(|d| Timestamp::try_from(d)
                 .map(|t| t.into())
                 .unwrap_or(0))
            .unwrap_or(0);

        o.write_all(&[self.format().into(), filename.len() as u8])?;
        o.write_all(filename)?;
        o.write_all(&date.to_be_bytes())?;
        Ok(())
    }

    fn headers_len(&self) -> usize {
        2 + self.filename().map(|f| f.len()).unwrap_or(0) + 4
    }
}

impl Marshal for Literal {
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        self.serialize_headers(o)?;
        o.write_all(self.body())?;
        Ok(())
    }
}

impl MarshalInto for Literal {
    fn serialized_len(&self) -> usize {
        self.headers_len() + self.body().len()
    }

    fn serialize_into(&self, buf: &mut [u8]) -> Result<usize> {
        generic_serialize_into(self, self.serialized_len(), buf)
    }
}

impl Marshal for CompressedData {
    /// Writes a serialized version of the compressed data packet's
    /// body to `o`.
    ///
    /// If the packet holds an unprocessed body, it is emitted as-is.
    /// Otherwise, the packet's children are serialized and
    /// compressed.
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        o.write_all(&[self.algo().into()])?;

        if !self.body().is_empty() {
            o.write_all(self.body())?;
            return Ok(());
        }

        let mut inner = Vec::new();
        for p in self.children() {
            p.serialize(&mut inner)?;
        }

        match self.algo() {
            crate::types::CompressionAlgorithm::Uncompressed =>
                o.write_all(&inner)?,
            #[cfg(feature = "compression-deflate")]
            crate::types::CompressionAlgorithm::Zip => {
                let mut enc = flate2::write::DeflateEncoder::new(
                    Vec::new(), flate2::Compression::default());
                enc.write_all(&inner)?;
                o.write_all(&enc.finish()?)?;
            }
            #[cfg(feature = "compression-deflate")]
            crate::types::CompressionAlgorithm::Zlib => {
                let mut enc = flate2::write::ZlibEncoder::new(
                    Vec::new(), flate2::Compression::default());
                enc.write_all(&inner)?;
                o.write_all(&enc.finish()?)?;
            }
            #[cfg(feature = "compression-bzip2")]
            crate::types::CompressionAlgorithm::BZip2 => {
                let mut enc = bzip2::write::BzEncoder::new(
                    Vec::new(), bzip2::Compression::default());
                enc.write_all(&inner)?;
                o.write_all(&enc.finish()?)?;
            }
            a => return Err(
                Error::UnsupportedCompressionAlgorithm(a).into()),
        }

        Ok(())
    }
}

impl MarshalInto for CompressedData {
    fn serialized_len(&self) -> usize {
        // The compressed size is not known in advance; fall back to
        // serializing.
        marshal_to_vec(self).map(|v| v.len()).unwrap_or(0)
    }

    fn serialize_into(&self, buf: &mut [u8]) -> Result<usize> {
        let v = marshal_to_vec(self)?;
        if buf.len() < v.len() {
            return Err(Error::InvalidArgument(
                format!("Invalid buffer size, expected {}, got {}",
                        v.len(), buf.len())).into());
        }
        buf[..v.len()].copy_from_slice(&v);
        Ok(v.len())
    }

    fn to_vec(&self) -> Result<Vec<u8>> {
        marshal_to_vec(self)
    }
}

/// Serializes to a vector without requiring `MarshalInto`.
fn marshal_to_vec(o: &dyn Marshal) -> Result<Vec<u8>> {
    let mut v = Vec::new();
    o.serialize(&mut v)?;
    Ok(v)
}

impl Marshal for SED {
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        if self.body().is_empty() {
            return Err(Error::InvalidOperation(
                "Cannot serialize an encrypted container without \
                 its ciphertext; use serialize::stream::Encryptor \
                 to encrypt".into()).into());
        }
        o.write_all(self.body())?;
        Ok(())
    }
}

impl MarshalInto for SED {
    fn serialized_len(&self) -> usize {
        self.body().len()
    }

    fn serialize_into(&self, buf: &mut [u8]) -> Result<usize> {
        generic_serialize_into(self, self.serialized_len(), buf)
    }
}

impl Marshal for SEIP1 {
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        if self.body().is_empty() {
            return Err(Error::InvalidOperation(
                "Cannot serialize an encrypted container without \
                 its ciphertext; use serialize::stream::Encryptor \
                 to encrypt".into()).into());
        }
        o.write_all(&[1 /* Version. */])?;
        o.write_all(self.body())?;
        Ok(())
    }
}

impl MarshalInto for SEIP1 {
    fn serialized_len(&self) -> usize {
        1 + self.body().len()
    }

    fn serialize_into(&self, buf: &mut [u8]) -> Result<usize> {
        generic_serialize_into(self, self.serialized_len(), buf)
    }
}

impl Marshal for AED1 {
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        if self.body().is_empty() {
            return Err(Error::InvalidOperation(
                "Cannot serialize an encrypted container without \
                 its ciphertext; use serialize::stream::Encryptor \
                 to encrypt".into()).into());
        }
        o.write_all(&[1, // Version.
                      self.symmetric_algo().into(),
                      self.aead().into(),
                      self.chunk_size_octet()])?;
        o.write_all(self.iv())?;
        o.write_all(self.body())?;
        Ok(())
    }
}

impl MarshalInto for AED1 {
    fn serialized_len(&self) -> usize {
        4 + self.iv().len() + self.body().len()
    }

    fn serialize_into(&self, buf: &mut [u8]) -> Result<usize> {
        generic_serialize_into(self, self.serialized_len(), buf)
    }
}

impl Marshal for Unknown {
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        o.write_all(self.body())?;
        Ok(())
    }
}

impl MarshalInto for Unknown {
    fn serialized_len(&self) -> usize {
        self.body().len()
    }

    fn serialize_into(&self, buf: &mut [u8]) -> Result<usize> {
        generic_serialize_into(self, self.serialized_len(), buf)
    }
}

impl Marshal for Packet {
    /// Writes a serialized version of the packet to `o`, including
    /// the packet header.
    ///
    /// New-style CTBs and the shortest possible length encoding are
    /// used.
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        let tag = self.tag();
        let body = packet_body_to_vec(self)?;

        o.write_all(&[0b1100_0000 | u8::from(tag)])?;
        write_new_length(body.len(), o)?;
        o.write_all(&body)?;
        Ok(())
    }
}

impl MarshalInto for Packet {
    fn serialized_len(&self) -> usize {
        let body_len = packet_body_to_vec(self)
            .map(|v| v.len()).unwrap_or(0);
        1 + new_length_len(body_len) + body_len
    }

    fn serialize_into(&self, buf: &mut [u8]) -> Result<usize> {
        let v = marshal_to_vec(self)?;
        if buf.len() < v.len() {
            return Err(Error::InvalidArgument(
                format!("Invalid buffer size, expected {}, got {}",
                        v.len(), buf.len())).into());
        }
        buf[..v.len()].copy_from_slice(&v);
        Ok(v.len())
    }

    fn to_vec(&self) -> Result<Vec<u8>> {
        marshal_to_vec(self)
    }
}

/// Serializes the packet's body.
fn packet_body_to_vec(p: &Packet) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    match p {
        Packet::Unknown(p) => p.serialize(&mut body)?,
        Packet::Signature(p) => p.serialize(&mut body)?,
        Packet::OnePassSig(p) => match p {
            crate::packet::OnePassSig::V3(p) => p.serialize(&mut body)?,
        },
        Packet::PublicKey(p) => match p {
            crate::packet::Key::V4(k) =>
                serialize_key(k, false, &mut body)?,
        },
        Packet::PublicSubkey(p) => match p {
            crate::packet::Key::V4(k) =>
                serialize_key(k, false, &mut body)?,
        },
        Packet::SecretKey(p) => match p {
            crate::packet::Key::V4(k) =>
                serialize_key(k, true, &mut body)?,
        },
        Packet::SecretSubkey(p) => match p {
            crate::packet::Key::V4(k) =>
                serialize_key(k, true, &mut body)?,
        },
        Packet::Marker(p) => p.serialize(&mut body)?,
        Packet::Trust(p) => p.serialize(&mut body)?,
        Packet::UserID(p) => p.serialize(&mut body)?,
        Packet::UserAttribute(p) => p.serialize(&mut body)?,
        Packet::Literal(p) => p.serialize(&mut body)?,
        Packet::CompressedData(p) => p.serialize(&mut body)?,
        Packet::PKESK(p) => match p {
            crate::packet::PKESK::V3(p) => p.serialize(&mut body)?,
        },
        Packet::SKESK(p) => match p {
            crate::packet::SKESK::V4(p) => p.serialize(&mut body)?,
            crate::packet::SKESK::V5(p) => p.serialize(&mut body)?,
        },
        Packet::SED(p) => p.serialize(&mut body)?,
        Packet::SEIP(p) => match p {
            crate::packet::SEIP::V1(p) => p.serialize(&mut body)?,
        },
        Packet::MDC(p) => p.serialize(&mut body)?,
        Packet::AED(p) => match p {
            crate::packet::AED::V1(p) => p.serialize(&mut body)?,
        },
    }
    Ok(body)
}

impl Marshal for crate::PacketPile {
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        for p in self.children() {
            p.serialize(o)?;
        }
        Ok(())
    }
}

impl MarshalInto for crate::PacketPile {
    fn serialized_len(&self) -> usize {
        self.children().map(|p| p.serialized_len()).sum()
    }

    fn serialize_into(&self, buf: &mut [u8]) -> Result<usize> {
        let v = marshal_to_vec(self)?;
        if buf.len() < v.len() {
            return Err(Error::InvalidArgument(
                format!("Invalid buffer size, expected {}, got {}",
                        v.len(), buf.len())).into());
        }
        buf[..v.len()].copy_from_slice(&v);
        Ok(v.len())
    }

    fn to_vec(&self) -> Result<Vec<u8>> {
        marshal_to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::Parse;
    use crate::types::DataFormat;

    #[test]
    fn packet_roundtrip_literal() {
        let mut l = Literal::new(DataFormat::Text);
        l.set_filename(b"foo.txt").unwrap();
        l.set_body(b"hello world".to_vec());
        let p: Packet = l.into();

        let buf = p.to_vec().unwrap();
        let q = Packet::from_bytes(&buf).unwrap();
        assert_eq!(p, q);

        // The round-trip is byte-exact.
        assert_eq!(buf, q.to_vec().unwrap());
    }

    #[test]
    fn packet_roundtrip_userid() {
        let p: Packet = UserID::from("Mallory <mallory@example.org>")
            .into();
        let buf = p.to_vec().unwrap();
        let q = Packet::from_bytes(&buf).unwrap();
        assert_eq!(p, q);
    }

    #[test]
    fn packet_roundtrip_skesk() {
        use crate::crypto::{S2K, SessionKey};
        use crate::types::SymmetricAlgorithm;

        let sk = SessionKey::new(32);
        let skesk = SKESK4::with_password(
            SymmetricAlgorithm::AES256, SymmetricAlgorithm::AES256,
            S2K::default(), &sk, &"gondwana".into()).unwrap();
        let p: Packet = skesk.into();

        let buf = p.to_vec().unwrap();
        let q = Packet::from_bytes(&buf).unwrap();
        assert_eq!(p, q);
    }

    #[test]
    fn length_encoding() {
        for (l, expect) in [
            (0usize, vec![0x00]),
            (191, vec![0xbf]),
            (192, vec![0xc0, 0x00]),
            (8383, vec![0xdf, 0xff]),
            (8384, vec![0xff, 0x00, 0x00, 0x20, 0xc0]),
        ] {
            let mut buf = Vec::new();
            write_new_length(l, &mut buf).unwrap();
            assert_eq!(buf, expect, "length {}", l);
            assert_eq!(buf.len(), new_length_len(l));
        }
    }
}
