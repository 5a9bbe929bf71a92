//! Signature subpackets.
//!
//! OpenPGP signature packets include a set of key-value attributes
//! called subpackets.  These subpackets are used to indicate when a
//! signature was created, who created the signature, user &
//! implementation preferences, etc.  The full details are in [Section
//! 5.2.3.1 of RFC 4880].
//!
//! [Section 5.2.3.1 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.2.3.1
//!
//! The standard assigns each subpacket a numeric id, and describes
//! the format of its value.  One subpacket is called Notation Data
//! and is intended as a generic key-value store.
//!
//! Subpackets and notations can be marked as critical.  If an OpenPGP
//! implementation processes a packet that includes critical
//! subpackets or notations that it does not understand, it is
//! required to abort processing.

use std::hash::{Hash, Hasher};
use std::fmt;
use std::time;

#[cfg(test)]
use quickcheck::{Arbitrary, Gen};

use crate::{
    Error,
    Result,
    packet::Signature,
    packet::signature::{self},
    Fingerprint,
    KeyID,
};
use crate::types::{
    AEADAlgorithm,
    CompressionAlgorithm,
    Duration,
    Features,
    HashAlgorithm,
    KeyFlags,
    PublicKeyAlgorithm,
    ReasonForRevocation,
    SymmetricAlgorithm,
    Timestamp,
};

lazy_static::lazy_static!{
    /// The default amount of tolerance to use when comparing
    /// some timestamps.
    ///
    /// When determining whether a timestamp generated on another
    /// machine is valid *now*, we need to account for clock skew.
    /// (Note: you don't normally need to consider clock skew when
    /// evaluating a signature's validity at some time in the past.)
    pub static ref CLOCK_SKEW_TOLERANCE: time::Duration
        = time::Duration::new(30 * 60, 0);
}

/// The subpacket types specified by [Section 5.2.3.1 of RFC 4880].
///
/// [Section 5.2.3.1 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.2.3.1
#[derive(Debug)]
#[derive(PartialEq, Eq, Hash)]
#[derive(Clone, Copy)]
#[non_exhaustive]
pub enum SubpacketTag {
    /// The time the signature was made.
    SignatureCreationTime,
    /// The validity period of the signature.
    SignatureExpirationTime,
    /// This subpacket denotes whether a certification signature is
    /// "exportable", to be used by other users than the signature's
    /// issuer.
    ExportableCertification,
    /// Signer asserts that the key is not only valid but also
    /// trustworthy at the specified level.
    TrustSignature,
    /// Used in conjunction with Trust Signature packets (of level >
    /// 0) to limit the scope of trust that is extended.
    RegularExpression,
    /// Signature's revocability status.
    Revocable,
    /// The validity period of the key.
    KeyExpirationTime,
    /// Deprecated.
    PlaceholderForBackwardCompatibility,
    /// Symmetric algorithm numbers that indicate which algorithms the
    /// key holder prefers to use.
    PreferredSymmetricAlgorithms,
    /// Authorizes the specified key to issue revocation signatures
    /// for this key.
    RevocationKey,
    /// The OpenPGP Key ID of the key issuing the signature.
    Issuer,
    /// This subpacket describes a "notation" on the signature that
    /// the issuer wishes to make.
    NotationData,
    /// Message digest algorithm numbers that indicate which
    /// algorithms the key holder prefers to receive.
    PreferredHashAlgorithms,
    /// Compression algorithm numbers that indicate which algorithms
    /// the key holder prefers to use.
    PreferredCompressionAlgorithms,
    /// This is a list of one-bit flags that indicate preferences that
    /// the key holder has about how the key is handled on a key
    /// server.
    KeyServerPreferences,
    /// This is a URI of a key server that the key holder prefers be
    /// used for updates.
    PreferredKeyServer,
    /// This is a flag in a User ID's self-signature that states
    /// whether this User ID is the main User ID for this key.
    PrimaryUserID,
    /// This subpacket contains a URI of a document that describes the
    /// policy under which the signature was issued.
    PolicyURI,
    /// This subpacket contains a list of binary flags that hold
    /// information about a key.
    KeyFlags,
    /// This subpacket allows a keyholder to state which User ID is
    /// responsible for the signing.
    SignersUserID,
    /// This subpacket is used only in key revocation and
    /// certification revocation signatures.
    ReasonForRevocation,
    /// The Features subpacket denotes which advanced OpenPGP features
    /// a user's implementation supports.
    Features,
    /// This subpacket identifies a specific target signature to which
    /// a signature refers.
    SignatureTarget,
    /// This subpacket contains a complete Signature packet body.
    EmbeddedSignature,
    /// Added in RFC 4880bis.
    IssuerFingerprint,
    /// Preferred AEAD Algorithms.
    PreferredAEADAlgorithms,
    /// Reserved subpacket numbers.
    Reserved(u8),
    /// Private subpacket numbers.
    Private(u8),
    /// Unknown subpacket numbers.
    Unknown(u8),
}
assert_send_and_sync!(SubpacketTag);

impl From<u8> for SubpacketTag {
    fn from(u: u8) -> Self {
        match u {
            2 => SubpacketTag::SignatureCreationTime,
            3 => SubpacketTag::SignatureExpirationTime,
            4 => SubpacketTag::ExportableCertification,
            5 => SubpacketTag::TrustSignature,
            6 => SubpacketTag::RegularExpression,
            7 => SubpacketTag::Revocable,
            9 => SubpacketTag::KeyExpirationTime,
            10 => SubpacketTag::PlaceholderForBackwardCompatibility,
            11 => SubpacketTag::PreferredSymmetricAlgorithms,
            12 => SubpacketTag::RevocationKey,
            16 => SubpacketTag::Issuer,
            20 => SubpacketTag::NotationData,
            21 => SubpacketTag::PreferredHashAlgorithms,
            22 => SubpacketTag::PreferredCompressionAlgorithms,
            23 => SubpacketTag::KeyServerPreferences,
            24 => SubpacketTag::PreferredKeyServer,
            25 => SubpacketTag::PrimaryUserID,
            26 => SubpacketTag::PolicyURI,
            27 => SubpacketTag::KeyFlags,
            28 => SubpacketTag::SignersUserID,
            29 => SubpacketTag::ReasonForRevocation,
            30 => SubpacketTag::Features,
            31 => SubpacketTag::SignatureTarget,
            32 => SubpacketTag::EmbeddedSignature,
            33 => SubpacketTag::IssuerFingerprint,
            34 => SubpacketTag::PreferredAEADAlgorithms,
            0 | 1 | 8 | 13..=15 | 17..=19 => SubpacketTag::Reserved(u),
            100..=110 => SubpacketTag::Private(u),
            _ => SubpacketTag::Unknown(u),
        }
    }
}

impl From<SubpacketTag> for u8 {
    fn from(t: SubpacketTag) -> Self {
        match t {
            SubpacketTag::SignatureCreationTime => 2,
            SubpacketTag::SignatureExpirationTime => 3,
            SubpacketTag::ExportableCertification => 4,
            SubpacketTag::TrustSignature => 5,
            SubpacketTag::RegularExpression => 6,
            SubpacketTag::Revocable => 7,
            SubpacketTag::KeyExpirationTime => 9,
            SubpacketTag::PlaceholderForBackwardCompatibility => 10,
            SubpacketTag::PreferredSymmetricAlgorithms => 11,
            SubpacketTag::RevocationKey => 12,
            SubpacketTag::Issuer => 16,
            SubpacketTag::NotationData => 20,
            SubpacketTag::PreferredHashAlgorithms => 21,
            SubpacketTag::PreferredCompressionAlgorithms => 22,
            SubpacketTag::KeyServerPreferences => 23,
            SubpacketTag::PreferredKeyServer => 24,
            SubpacketTag::PrimaryUserID => 25,
            SubpacketTag::PolicyURI => 26,
            SubpacketTag::KeyFlags => 27,
            SubpacketTag::SignersUserID => 28,
            SubpacketTag::ReasonForRevocation => 29,
            SubpacketTag::Features => 30,
            SubpacketTag::SignatureTarget => 31,
            SubpacketTag::EmbeddedSignature => 32,
            SubpacketTag::IssuerFingerprint => 33,
            SubpacketTag::PreferredAEADAlgorithms => 34,
            SubpacketTag::Reserved(u) => u,
            SubpacketTag::Private(u) => u,
            SubpacketTag::Unknown(u) => u,
        }
    }
}

#[cfg(test)]
impl Arbitrary for SubpacketTag {
    fn arbitrary(g: &mut Gen) -> Self {
        u8::arbitrary(g).into()
    }
}

/// Subpacket area.
///
/// A version 4 signature contains two areas that can stores
/// subpackets: the so-called hashed and unhashed subpacket areas.
/// The hashed subpacket area is protected by the signature; the
/// unhashed area is not, and can be modified by anyone.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct SubpacketArea {
    /// The subpackets.
    packets: Vec<Subpacket>,
}
assert_send_and_sync!(SubpacketArea);

impl fmt::Debug for SubpacketArea {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list()
            .entries(self.packets.iter())
            .finish()
    }
}

impl<'a> IntoIterator for &'a SubpacketArea {
    type Item = &'a Subpacket;
    type IntoIter = std::slice::Iter<'a, Subpacket>;

    fn into_iter(self) -> Self::IntoIter {
        self.packets.iter()
    }
}

impl SubpacketArea {
    /// Returns a new subpacket area containing the given `packets`.
    pub fn new(packets: Vec<Subpacket>) -> SubpacketArea {
        SubpacketArea { packets }
    }

    /// Returns an iterator over the subpackets.
    pub fn iter(&self) -> impl Iterator<Item = &Subpacket> + Send + Sync {
        self.packets.iter()
    }

    /// Returns a reference to the *last* instance of the specified
    /// subpacket, if any.
    ///
    /// A subpacket area can contain multiple instances of the same
    /// subpacket.  The last one overrides earlier ones.
    pub fn subpacket(&self, tag: SubpacketTag) -> Option<&Subpacket> {
        self.packets.iter().rev().find(|sp| sp.tag() == tag)
    }

    /// Returns an iterator over all instances of the specified
    /// subpacket.
    pub fn subpackets(&self, target: SubpacketTag)
                      -> impl Iterator<Item = &Subpacket> + Send + Sync {
        self.packets.iter().filter(move |sp| sp.tag() == target)
    }

    /// Adds the given subpacket.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedPacket` if adding the packet makes
    /// the subpacket area exceed the size limit of 64 KB.
    pub fn add(&mut self, packet: Subpacket) -> Result<()> {
        use crate::serialize::MarshalInto;

        if self.serialized_len() + packet.serialized_len() > u16::MAX as usize
        {
            return Err(Error::MalformedPacket(
                "Subpacket area exceeds maximum size".into()).into());
        }

        self.packets.push(packet);
        Ok(())
    }

    /// Adds the given subpacket, replacing all other instances of the
    /// same subpacket type.
    pub fn replace(&mut self, packet: Subpacket) -> Result<()> {
        let tag = packet.tag();
        self.packets.retain(|sp| sp.tag() != tag);
        self.add(packet)
    }

    /// Removes all instances of the specified subpacket type.
    pub fn remove_all(&mut self, tag: SubpacketTag) {
        self.packets.retain(|sp| sp.tag() != tag);
    }

    /// Removes all subpackets.
    pub fn clear(&mut self) {
        self.packets.clear();
    }

    /// Parses a subpacket area from its serialized form.
    pub(crate) fn parse(mut bytes: &[u8]) -> Result<SubpacketArea> {
        let mut packets = Vec::new();
        while !bytes.is_empty() {
            let (sp, rest) = Subpacket::parse(bytes)?;
            packets.push(sp);
            bytes = rest;
        }
        Ok(SubpacketArea::new(packets))
    }
}

/// Payload of a Notation Data subpacket.
///
/// The name falls into two namespaces: IETF (no '@') and user
/// namespaces of the form `name@example.org`.  The standard does not
/// constrain the value.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotationData {
    flags: NotationDataFlags,
    name: String,
    value: Vec<u8>,
}
assert_send_and_sync!(NotationData);

impl NotationData {
    /// Creates a new Notation Data subpacket payload.
    pub fn new<N, V, F>(name: N, value: V, flags: F) -> Self
        where N: AsRef<str>,
              V: AsRef<[u8]>,
              F: Into<Option<NotationDataFlags>>,
    {
        Self {
            flags: flags.into().unwrap_or_default(),
            name: name.as_ref().into(),
            value: value.as_ref().into(),
        }
    }

    /// Returns the flags.
    pub fn flags(&self) -> &NotationDataFlags {
        &self.flags
    }

    /// Returns the name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the value.
    pub fn value(&self) -> &[u8] {
        &self.value
    }
}

/// Flags for the Notation Data subpacket.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotationDataFlags(crate::types::Bitfield);
assert_send_and_sync!(NotationDataFlags);

impl Default for NotationDataFlags {
    fn default() -> Self {
        NotationDataFlags(vec![0, 0, 0, 0].into())
    }
}

const NOTATION_DATA_FLAG_HUMAN_READABLE: usize = 7;

impl NotationDataFlags {
    /// Creates a new instance from `bits`.
    pub fn new<B: AsRef<[u8]>>(bits: B) -> Result<Self> {
        if bits.as_ref().len() == 4 {
            Ok(Self(bits.as_ref().to_vec().into()))
        } else {
            Err(Error::InvalidArgument(
                format!("Need four bytes of flags, got: {:?}",
                        bits.as_ref())).into())
        }
    }

    /// Returns a slice containing the raw values.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Whether the value is human-readable.
    pub fn human_readable(&self) -> bool {
        self.0.get(NOTATION_DATA_FLAG_HUMAN_READABLE)
    }

    /// Asserts that the value is human-readable.
    pub fn set_human_readable(mut self) -> Self {
        self.0.set(NOTATION_DATA_FLAG_HUMAN_READABLE);
        self
    }
}

/// Holds an arbitrary, well-structured subpacket.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum SubpacketValue {
    /// An unknown subpacket.
    Unknown {
        /// The unknown subpacket's tag.
        tag: SubpacketTag,
        /// The unknown subpacket's uninterpreted body.
        body: Vec<u8>,
    },

    /// The time the signature was made.
    SignatureCreationTime(Timestamp),
    /// The validity period of the signature.
    SignatureExpirationTime(Duration),
    /// Whether a certification signature is "exportable".
    ExportableCertification(bool),
    /// Signer asserts that the key is not only valid but also
    /// trustworthy at the specified level.
    TrustSignature {
        /// Trust level, or depth.
        level: u8,
        /// Trust amount.
        trust: u8,
    },
    /// Used in conjunction with Trust Signature packets to limit the
    /// scope of trust that is extended.
    RegularExpression(Vec<u8>),
    /// Signature's revocability status.
    Revocable(bool),
    /// The validity period of the key.
    KeyExpirationTime(Duration),
    /// Symmetric algorithm numbers that indicate which algorithms the
    /// key holder prefers to use.
    PreferredSymmetricAlgorithms(Vec<SymmetricAlgorithm>),
    /// The OpenPGP Key ID of the key issuing the signature.
    Issuer(KeyID),
    /// A "notation" on the signature.
    NotationData(NotationData),
    /// Message digest algorithm numbers that indicate which
    /// algorithms the key holder prefers to receive.
    PreferredHashAlgorithms(Vec<HashAlgorithm>),
    /// Compression algorithm numbers that indicate which algorithms
    /// the key holder prefers to use.
    PreferredCompressionAlgorithms(Vec<CompressionAlgorithm>),
    /// A list of flags that indicate preferences that the key holder
    /// has about how the key is handled on a key server.
    KeyServerPreferences(Vec<u8>),
    /// A URI of a key server that the key holder prefers be used for
    /// updates.
    PreferredKeyServer(Vec<u8>),
    /// A flag in a User ID's self-signature that states whether this
    /// User ID is the main User ID for this key.
    PrimaryUserID(bool),
    /// A URI of a document that describes the policy under which the
    /// signature was issued.
    PolicyURI(Vec<u8>),
    /// A list of flags that hold information about a key.
    KeyFlags(KeyFlags),
    /// The User ID that is responsible for the signing.
    SignersUserID(Vec<u8>),
    /// The reason for a revocation, used in key revocations and
    /// certification revocation signatures.
    ReasonForRevocation {
        /// Machine-readable reason for revocation.
        code: ReasonForRevocation,
        /// Human-readable reason for revocation.
        reason: Vec<u8>,
    },
    /// The OpenPGP features a user's implementation supports.
    Features(Features),
    /// A signature to which this signature refers.
    SignatureTarget {
        /// Public-key algorithm of the target signature.
        pk_algo: PublicKeyAlgorithm,
        /// Hash algorithm of the target signature.
        hash_algo: HashAlgorithm,
        /// Hash digest of the target signature.
        digest: Vec<u8>,
    },
    /// A complete Signature packet body.
    ///
    /// This is used to store a backsig in a subkey binding signature.
    EmbeddedSignature(Signature),
    /// The Fingerprint of the key that issued the signature (proposed
    /// in RFC 4880bis).
    IssuerFingerprint(Fingerprint),
    /// The AEAD algorithms that the certificate holder prefers
    /// (proposed in RFC 4880bis).
    PreferredAEADAlgorithms(Vec<AEADAlgorithm>),
}
assert_send_and_sync!(SubpacketValue);

impl SubpacketValue {
    /// Returns the subpacket tag for this value.
    pub fn tag(&self) -> SubpacketTag {
        use self::SubpacketValue::*;
        match self {
            SignatureCreationTime(_) => SubpacketTag::SignatureCreationTime,
            SignatureExpirationTime(_) =>
                SubpacketTag::SignatureExpirationTime,
            ExportableCertification(_) =>
                SubpacketTag::ExportableCertification,
            TrustSignature { .. } => SubpacketTag::TrustSignature,
            RegularExpression(_) => SubpacketTag::RegularExpression,
            Revocable(_) => SubpacketTag::Revocable,
            KeyExpirationTime(_) => SubpacketTag::KeyExpirationTime,
            PreferredSymmetricAlgorithms(_) =>
                SubpacketTag::PreferredSymmetricAlgorithms,
            Issuer(_) => SubpacketTag::Issuer,
            NotationData(_) => SubpacketTag::NotationData,
            PreferredHashAlgorithms(_) =>
                SubpacketTag::PreferredHashAlgorithms,
            PreferredCompressionAlgorithms(_) =>
                SubpacketTag::PreferredCompressionAlgorithms,
            KeyServerPreferences(_) => SubpacketTag::KeyServerPreferences,
            PreferredKeyServer(_) => SubpacketTag::PreferredKeyServer,
            PrimaryUserID(_) => SubpacketTag::PrimaryUserID,
            PolicyURI(_) => SubpacketTag::PolicyURI,
            KeyFlags(_) => SubpacketTag::KeyFlags,
            SignersUserID(_) => SubpacketTag::SignersUserID,
            ReasonForRevocation { .. } => SubpacketTag::ReasonForRevocation,
            Features(_) => SubpacketTag::Features,
            SignatureTarget { .. } => SubpacketTag::SignatureTarget,
            EmbeddedSignature(_) => SubpacketTag::EmbeddedSignature,
            IssuerFingerprint(_) => SubpacketTag::IssuerFingerprint,
            PreferredAEADAlgorithms(_) =>
                SubpacketTag::PreferredAEADAlgorithms,
            Unknown { tag, .. } => *tag,
        }
    }
}

/// Signature subpackets.
///
/// Most of a signature's attributes are not stored in fixed fields,
/// but in so-called subpackets.
#[derive(Clone)]
pub struct Subpacket {
    /// Critical flag.
    critical: bool,
    /// Packet value, must match packet type.
    value: SubpacketValue,
}
assert_send_and_sync!(Subpacket);

impl PartialEq for Subpacket {
    fn eq(&self, other: &Subpacket) -> bool {
        self.critical == other.critical
            && self.value == other.value
    }
}

impl Eq for Subpacket {}

impl Hash for Subpacket {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.critical.hash(state);
        self.value.hash(state);
    }
}

impl fmt::Debug for Subpacket {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut s = f.debug_struct("Subpacket");
        if self.critical {
            s.field("critical", &self.critical);
        }
        s.field("value", &self.value);
        s.finish()
    }
}

impl Subpacket {
    /// Creates a new Subpacket.
    pub fn new(value: SubpacketValue, critical: bool)
               -> Result<Subpacket> {
        Ok(Self::new_raw(value, critical))
    }

    pub(crate) fn new_raw(value: SubpacketValue, critical: bool)
                          -> Subpacket {
        Subpacket {
            critical,
            value,
        }
    }

    /// Returns whether the critical bit is set.
    pub fn critical(&self) -> bool {
        self.critical
    }

    /// Returns the Subpacket's tag.
    pub fn tag(&self) -> SubpacketTag {
        self.value.tag()
    }

    /// Returns the Subpacket's value.
    pub fn value(&self) -> &SubpacketValue {
        &self.value
    }

    /// Parses one subpacket from `bytes`, returning it and the rest.
    pub(crate) fn parse(bytes: &[u8]) -> Result<(Subpacket, &[u8])> {
        // The length includes the type octet, but not the length
        // itself.
        let (len, rest) = subpacket_length(bytes)?;
        let len = len as usize;
        if len == 0 || rest.len() < len {
            return Err(Error::MalformedPacket(
                "Truncated subpacket".into()).into());
        }

        let typ = rest[0];
        let critical = typ & (1 << 7) != 0;
        let tag: SubpacketTag = (typ & !(1 << 7)).into();
        let body = &rest[1..len];
        let rest = &rest[len..];

        let value = Subpacket::parse_value(tag, body)?;
        Ok((Subpacket { critical, value }, rest))
    }

    fn parse_value(tag: SubpacketTag, body: &[u8])
                   -> Result<SubpacketValue> {
        use self::SubpacketTag as T;
        use self::SubpacketValue as V;

        let unknown = |body: &[u8]| V::Unknown {
            tag,
            body: body.to_vec(),
        };

        let be_u32 = |b: &[u8]| -> Result<u32> {
            if b.len() == 4 {
                Ok(u32::from_be_bytes(b.try_into().expect("four bytes")))
            } else {
                Err(Error::MalformedPacket(
                    format!("Expected four bytes, got {}", b.len())).into())
            }
        };

        let bool_ = |b: &[u8]| -> Result<bool> {
            if b.len() == 1 {
                Ok(b[0] != 0)
            } else {
                Err(Error::MalformedPacket(
                    format!("Expected one byte, got {}", b.len())).into())
            }
        };

        Ok(match tag {
            T::SignatureCreationTime =>
                V::SignatureCreationTime(be_u32(body)?.into()),
            T::SignatureExpirationTime =>
                V::SignatureExpirationTime(be_u32(body)?.into()),
            T::ExportableCertification =>
                V::ExportableCertification(bool_(body)?),
            T::TrustSignature => {
                if body.len() != 2 {
                    return Err(Error::MalformedPacket(
                        "Truncated trust signature subpacket".into()).into());
                }
                V::TrustSignature {
                    level: body[0],
                    trust: body[1],
                }
            }
            T::RegularExpression => {
                // The regular expression is NUL terminated.
                let mut v = body.to_vec();
                if v.last() == Some(&0) {
                    v.pop();
                }
                V::RegularExpression(v)
            }
            T::Revocable => V::Revocable(bool_(body)?),
            T::KeyExpirationTime =>
                V::KeyExpirationTime(be_u32(body)?.into()),
            T::PreferredSymmetricAlgorithms =>
                V::PreferredSymmetricAlgorithms(
                    body.iter().map(|o| (*o).into()).collect()),
            T::Issuer => {
                if body.len() != 8 {
                    return Err(Error::MalformedPacket(
                        "Malformed issuer subpacket".into()).into());
                }
                V::Issuer(KeyID::from_bytes(body))
            }
            T::NotationData => {
                if body.len() < 8 {
                    return Err(Error::MalformedPacket(
                        "Truncated notation data subpacket".into()).into());
                }
                let flags = NotationDataFlags::new(&body[..4])?;
                let name_len =
                    u16::from_be_bytes(body[4..6].try_into().unwrap())
                    as usize;
                let value_len =
                    u16::from_be_bytes(body[6..8].try_into().unwrap())
                    as usize;
                if body.len() != 8 + name_len + value_len {
                    return Err(Error::MalformedPacket(
                        "Malformed notation data subpacket".into()).into());
                }
                let name =
                    std::str::from_utf8(&body[8..8 + name_len])
                    .map_err(|_| Error::MalformedPacket(
                        "Malformed notation name".into()))?;
                V::NotationData(NotationData::new(
                    name, &body[8 + name_len..], flags))
            }
            T::PreferredHashAlgorithms =>
                V::PreferredHashAlgorithms(
                    body.iter().map(|o| (*o).into()).collect()),
            T::PreferredCompressionAlgorithms =>
                V::PreferredCompressionAlgorithms(
                    body.iter().map(|o| (*o).into()).collect()),
            T::KeyServerPreferences =>
                V::KeyServerPreferences(body.to_vec()),
            T::PreferredKeyServer =>
                V::PreferredKeyServer(body.to_vec()),
            T::PrimaryUserID => V::PrimaryUserID(bool_(body)?),
            T::PolicyURI => V::PolicyURI(body.to_vec()),
            T::KeyFlags => V::KeyFlags(KeyFlags::new(body)),
            T::SignersUserID => V::SignersUserID(body.to_vec()),
            T::ReasonForRevocation => {
                if body.is_empty() {
                    return Err(Error::MalformedPacket(
                        "Truncated reason for revocation".into()).into());
                }
                V::ReasonForRevocation {
                    code: body[0].into(),
                    reason: body[1..].to_vec(),
                }
            }
            T::Features => V::Features(Features::new(body)),
            T::SignatureTarget => {
                if body.len() < 2 {
                    return Err(Error::MalformedPacket(
                        "Truncated signature target subpacket".into())
                               .into());
                }
                V::SignatureTarget {
                    pk_algo: body[0].into(),
                    hash_algo: body[1].into(),
                    digest: body[2..].to_vec(),
                }
            }
            T::EmbeddedSignature => {
                match signature::Signature4::from_bytes_naked(body) {
                    Ok(sig) => V::EmbeddedSignature(sig.into()),
                    // An embedded signature we cannot parse.  Keep
                    // the raw bytes.
                    Err(_) => unknown(body),
                }
            }
            T::IssuerFingerprint => {
                if body.is_empty() || body[0] != 4 {
                    unknown(body)
                } else {
                    V::IssuerFingerprint(Fingerprint::from_bytes(&body[1..]))
                }
            }
            T::PreferredAEADAlgorithms =>
                V::PreferredAEADAlgorithms(
                    body.iter().map(|o| (*o).into()).collect()),
            T::PlaceholderForBackwardCompatibility
            | T::RevocationKey
            | T::Reserved(_) | T::Private(_) | T::Unknown(_) =>
                unknown(body),
        })
    }
}

/// Parses a subpacket length, returning it and the remaining bytes.
pub(crate) fn subpacket_length(bytes: &[u8]) -> Result<(u32, &[u8])> {
    match bytes.first() {
        None => Err(Error::MalformedPacket(
            "Truncated subpacket length".into()).into()),
        Some(&n) if n < 192 =>
            Ok((n as u32, &bytes[1..])),
        Some(&n) if (192..255).contains(&n) => {
            if bytes.len() < 2 {
                return Err(Error::MalformedPacket(
                    "Truncated subpacket length".into()).into());
            }
            Ok((((n as u32 - 192) << 8) + bytes[1] as u32 + 192,
                &bytes[2..]))
        }
        Some(_) /* 255 */ => {
            if bytes.len() < 5 {
                return Err(Error::MalformedPacket(
                    "Truncated subpacket length".into()).into());
            }
            Ok((u32::from_be_bytes(bytes[1..5].try_into().unwrap()),
                &bytes[5..]))
        }
    }
}

/// Encodes a subpacket length.
pub(crate) fn subpacket_length_serialize(len: u32, buf: &mut Vec<u8>) {
    if len < 192 {
        buf.push(len as u8);
    } else if len < 16320 {
        let v = len - 192;
        buf.push((v >> 8) as u8 + 192);
        buf.push((v & 0xff) as u8);
    } else {
        buf.push(255);
        buf.extend_from_slice(&len.to_be_bytes());
    }
}

/// The length of an encoded subpacket length.
pub(crate) fn subpacket_length_len(len: u32) -> usize {
    if len < 192 {
        1
    } else if len < 16320 {
        2
    } else {
        5
    }
}

/// Subpacket storage.
///
/// Subpackets are stored either in a so-called hashed area, or in a
/// so-called unhashed area.  Subpackets stored in the hashed area are
/// protected by the signature's hash whereas subpackets stored in the
/// unhashed area are not.  Modifying the unhashed area does not
/// invalidate the signature.
#[derive(Clone, Default, PartialEq, Eq, Hash, Debug)]
pub struct SubpacketAreas {
    /// Subpackets that are part of the signature.
    hashed_area: SubpacketArea,
    /// Subpackets that are not part of the signature.
    unhashed_area: SubpacketArea,
}
assert_send_and_sync!(SubpacketAreas);

impl SubpacketAreas {
    /// Returns a new `SubpacketAreas` object.
    pub fn new(hashed_area: SubpacketArea,
               unhashed_area: SubpacketArea) -> SubpacketAreas {
        SubpacketAreas {
            hashed_area,
            unhashed_area,
        }
    }

    /// Gets a reference to the hashed area.
    pub fn hashed_area(&self) -> &SubpacketArea {
        &self.hashed_area
    }

    /// Gets a mutable reference to the hashed area.
    pub fn hashed_area_mut(&mut self) -> &mut SubpacketArea {
        &mut self.hashed_area
    }

    /// Gets a reference to the unhashed area.
    pub fn unhashed_area(&self) -> &SubpacketArea {
        &self.unhashed_area
    }

    /// Gets a mutable reference to the unhashed area.
    pub fn unhashed_area_mut(&mut self) -> &mut SubpacketArea {
        &mut self.unhashed_area
    }

    /// Returns a reference to the *last* instance of the specified
    /// subpacket.
    ///
    /// This function returns the last instance of the specified
    /// subpacket in the hashed subpacket area.  For most subpackets,
    /// the unhashed area is ignored: it is not protected by the
    /// signature, so an attacker could modify it.  The exceptions are
    /// the `Issuer`, `IssuerFingerprint`, and `EmbeddedSignature`
    /// subpackets, which are commonly stored in the unhashed area and
    /// are self-authenticating.
    pub fn subpacket(&self, tag: SubpacketTag) -> Option<&Subpacket> {
        if let Some(sp) = self.hashed_area().subpacket(tag) {
            return Some(sp);
        }

        match tag {
            SubpacketTag::Issuer
            | SubpacketTag::IssuerFingerprint
            | SubpacketTag::EmbeddedSignature =>
                self.unhashed_area().subpacket(tag),
            _ => None,
        }
    }

    /// Returns the time when the signature was created, if any.
    pub fn signature_creation_time(&self) -> Option<time::SystemTime> {
        if let Some(sp) =
            self.subpacket(SubpacketTag::SignatureCreationTime)
        {
            if let SubpacketValue::SignatureCreationTime(v) = sp.value() {
                return Some((*v).into());
            }
        }
        None
    }

    /// Returns the signature's validity period, if any.
    pub fn signature_validity_period(&self) -> Option<time::Duration> {
        if let Some(sp) =
            self.subpacket(SubpacketTag::SignatureExpirationTime)
        {
            if let SubpacketValue::SignatureExpirationTime(v) = sp.value() {
                return Some((*v).into());
            }
        }
        None
    }

    /// Returns the signature's expiration time, if any.
    ///
    /// The expiration time is the creation time plus the validity
    /// period.
    pub fn signature_expiration_time(&self) -> Option<time::SystemTime> {
        match (self.signature_creation_time(),
               self.signature_validity_period())
        {
            (Some(ct), Some(vp)) if vp.as_secs() > 0 => Some(ct + vp),
            _ => None,
        }
    }

    /// Returns whether the signature is alive at the specified time.
    ///
    /// A signature is considered to be alive if `creation time -
    /// tolerance <= time` and `time < expiration time`.
    ///
    /// If `time` is `None`, uses the current time; if `clock_skew_tolerance`
    /// is `None`, uses the default tolerance.
    pub fn signature_alive<T, U>(&self, time: T, clock_skew_tolerance: U)
                                 -> Result<()>
        where T: Into<Option<time::SystemTime>>,
              U: Into<Option<time::Duration>>,
    {
        let (time, tolerance)
            = match (time.into(), clock_skew_tolerance.into()) {
                (None, None) =>
                    (time::SystemTime::now(),
                     *CLOCK_SKEW_TOLERANCE),
                (None, Some(tolerance)) =>
                    (time::SystemTime::now(), tolerance),
                (Some(time), None) =>
                    (time, time::Duration::new(0, 0)),
                (Some(time), Some(tolerance)) =>
                    (time, tolerance),
            };

        match (self.signature_creation_time(),
               self.signature_expiration_time())
        {
            (None, _) =>
                Err(Error::MalformedPacket(
                    "no signature creation time".into()).into()),
            (Some(_), Some(e)) if e <= time =>
                Err(Error::Expired(e).into()),
            // Be careful to avoid underflow.
            (Some(c), _) if c > time + tolerance =>
                Err(Error::NotYetLive(
                    c - std::cmp::min(
                        tolerance,
                        c.duration_since(time::UNIX_EPOCH)
                            .unwrap_or_else(
                                |_| time::Duration::new(0, 0))))
                    .into()),
            _ => Ok(()),
        }
    }

    /// Returns the validity period of the key, if any.
    pub fn key_validity_period(&self) -> Option<time::Duration> {
        if let Some(sp) = self.subpacket(SubpacketTag::KeyExpirationTime) {
            if let SubpacketValue::KeyExpirationTime(v) = sp.value() {
                return Some((*v).into());
            }
        }
        None
    }

    /// Returns the value of the Issuer subpackets.
    ///
    /// Both the hashed and the unhashed areas are searched; the
    /// unhashed area is a common place for the issuer, and the value
    /// is self-authenticating.
    pub fn issuers(&self) -> impl Iterator<Item = &KeyID> + Send + Sync {
        self.hashed_area.subpackets(SubpacketTag::Issuer)
            .chain(self.unhashed_area.subpackets(SubpacketTag::Issuer))
            .filter_map(|sp| {
                match sp.value() {
                    SubpacketValue::Issuer(i) => Some(i),
                    _ => None,
                }
            })
    }

    /// Returns the value of the Issuer Fingerprint subpackets.
    pub fn issuer_fingerprints(&self)
                               -> impl Iterator<Item = &Fingerprint>
                                  + Send + Sync {
        self.hashed_area.subpackets(SubpacketTag::IssuerFingerprint)
            .chain(self.unhashed_area.subpackets(
                SubpacketTag::IssuerFingerprint))
            .filter_map(|sp| {
                match sp.value() {
                    SubpacketValue::IssuerFingerprint(i) => Some(i),
                    _ => None,
                }
            })
    }

    /// Returns the value of the Exportable Certification subpacket.
    pub fn exportable_certification(&self) -> Option<bool> {
        if let Some(sp) =
            self.subpacket(SubpacketTag::ExportableCertification)
        {
            if let SubpacketValue::ExportableCertification(v) = sp.value() {
                return Some(*v);
            }
        }
        None
    }

    /// Returns the value of the Trust Signature subpacket.
    pub fn trust_signature(&self) -> Option<(u8, u8)> {
        if let Some(sp) = self.subpacket(SubpacketTag::TrustSignature) {
            if let SubpacketValue::TrustSignature { level, trust } =
                sp.value()
            {
                return Some((*level, *trust));
            }
        }
        None
    }

    /// Returns the value of the Revocable subpacket.
    pub fn revocable(&self) -> Option<bool> {
        if let Some(sp) = self.subpacket(SubpacketTag::Revocable) {
            if let SubpacketValue::Revocable(v) = sp.value() {
                return Some(*v);
            }
        }
        None
    }

    /// Returns the value of the Preferred Symmetric Algorithms
    /// subpacket.
    pub fn preferred_symmetric_algorithms(&self)
                                          -> Option<&[SymmetricAlgorithm]> {
        if let Some(sp) =
            self.subpacket(SubpacketTag::PreferredSymmetricAlgorithms)
        {
            if let SubpacketValue::PreferredSymmetricAlgorithms(v)
                = sp.value()
            {
                return Some(v);
            }
        }
        None
    }

    /// Returns the value of the Preferred Hash Algorithms subpacket.
    pub fn preferred_hash_algorithms(&self) -> Option<&[HashAlgorithm]> {
        if let Some(sp) =
            self.subpacket(SubpacketTag::PreferredHashAlgorithms)
        {
            if let SubpacketValue::PreferredHashAlgorithms(v) = sp.value() {
                return Some(v);
            }
        }
        None
    }

    /// Returns the value of the Preferred Compression Algorithms
    /// subpacket.
    pub fn preferred_compression_algorithms(&self)
        -> Option<&[CompressionAlgorithm]>
    {
        if let Some(sp) =
            self.subpacket(SubpacketTag::PreferredCompressionAlgorithms)
        {
            if let SubpacketValue::PreferredCompressionAlgorithms(v)
                = sp.value()
            {
                return Some(v);
            }
        }
        None
    }

    /// Returns the value of the Preferred AEAD Algorithms subpacket.
    pub fn preferred_aead_algorithms(&self) -> Option<&[AEADAlgorithm]> {
        if let Some(sp) =
            self.subpacket(SubpacketTag::PreferredAEADAlgorithms)
        {
            if let SubpacketValue::PreferredAEADAlgorithms(v) = sp.value() {
                return Some(v);
            }
        }
        None
    }

    /// Returns the value of the Primary UserID subpacket.
    pub fn primary_userid(&self) -> Option<bool> {
        if let Some(sp) = self.subpacket(SubpacketTag::PrimaryUserID) {
            if let SubpacketValue::PrimaryUserID(v) = sp.value() {
                return Some(*v);
            }
        }
        None
    }

    /// Returns the value of the Key Flags subpacket.
    pub fn key_flags(&self) -> Option<KeyFlags> {
        if let Some(sp) = self.subpacket(SubpacketTag::KeyFlags) {
            if let SubpacketValue::KeyFlags(v) = sp.value() {
                return Some(v.clone());
            }
        }
        None
    }

    /// Returns the value of the Signer's UserID subpacket.
    pub fn signers_user_id(&self) -> Option<&[u8]> {
        if let Some(sp) = self.subpacket(SubpacketTag::SignersUserID) {
            if let SubpacketValue::SignersUserID(v) = sp.value() {
                return Some(v);
            }
        }
        None
    }

    /// Returns the value of the Reason for Revocation subpacket.
    pub fn reason_for_revocation(&self)
                                 -> Option<(ReasonForRevocation, &[u8])> {
        if let Some(sp) = self.subpacket(SubpacketTag::ReasonForRevocation)
        {
            if let SubpacketValue::ReasonForRevocation { code, reason } =
                sp.value()
            {
                return Some((*code, reason));
            }
        }
        None
    }

    /// Returns the value of the Features subpacket.
    pub fn features(&self) -> Option<Features> {
        if let Some(sp) = self.subpacket(SubpacketTag::Features) {
            if let SubpacketValue::Features(v) = sp.value() {
                return Some(v.clone());
            }
        }
        None
    }

    /// Returns the value of the Signature Target subpacket.
    pub fn signature_target(&self)
        -> Option<(PublicKeyAlgorithm, HashAlgorithm, &[u8])>
    {
        if let Some(sp) = self.subpacket(SubpacketTag::SignatureTarget) {
            if let SubpacketValue::SignatureTarget {
                pk_algo, hash_algo, digest } = sp.value()
            {
                return Some((*pk_algo, *hash_algo, digest));
            }
        }
        None
    }

    /// Returns the value of the Embedded Signature subpacket.
    pub fn embedded_signature(&self) -> Option<&Signature> {
        if let Some(sp) = self.subpacket(SubpacketTag::EmbeddedSignature) {
            if let SubpacketValue::EmbeddedSignature(v) = sp.value() {
                return Some(v);
            }
        }
        None
    }

    /// Returns the value of the Notation Data subpackets.
    pub fn notation_data(&self)
                         -> impl Iterator<Item = &NotationData>
                            + Send + Sync {
        self.hashed_area.subpackets(SubpacketTag::NotationData)
            .filter_map(|sp| {
                match sp.value() {
                    SubpacketValue::NotationData(v) => Some(v),
                    _ => None,
                }
            })
    }

    /// Returns the value of the Policy URI subpacket.
    pub fn policy_uri(&self) -> Option<&[u8]> {
        if let Some(sp) = self.subpacket(SubpacketTag::PolicyURI) {
            if let SubpacketValue::PolicyURI(v) = sp.value() {
                return Some(v);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialize::MarshalInto;

    #[test]
    fn length_encoding() {
        for l in [0u32, 1, 191, 192, 193, 8000, 16319, 16320, 100000] {
            let mut buf = Vec::new();
            subpacket_length_serialize(l, &mut buf);
            assert_eq!(buf.len(), subpacket_length_len(l));
            let (l_, rest) = subpacket_length(&buf).unwrap();
            assert_eq!(l, l_);
            assert!(rest.is_empty());
        }
    }

    #[test]
    fn area_roundtrip() {
        let mut area = SubpacketArea::default();
        area.add(Subpacket::new(
            SubpacketValue::SignatureCreationTime(1554542219.into()),
            true).unwrap()).unwrap();
        area.add(Subpacket::new(
            SubpacketValue::Issuer(KeyID::new(0x0123456789abcdef)),
            false).unwrap()).unwrap();
        area.add(Subpacket::new(
            SubpacketValue::KeyFlags(KeyFlags::empty().set_signing()),
            true).unwrap()).unwrap();
        area.add(Subpacket::new(
            SubpacketValue::NotationData(NotationData::new(
                "test@example.org", b"foobar",
                NotationDataFlags::default().set_human_readable())),
            false).unwrap()).unwrap();

        let buf = area.to_vec().unwrap();
        let area_ = SubpacketArea::parse(&buf).unwrap();
        assert_eq!(area, area_);
    }

    #[test]
    fn last_instance_wins() {
        let mut area = SubpacketArea::default();
        area.add(Subpacket::new(
            SubpacketValue::PrimaryUserID(false), false).unwrap()).unwrap();
        area.add(Subpacket::new(
            SubpacketValue::PrimaryUserID(true), false).unwrap()).unwrap();

        match area.subpacket(SubpacketTag::PrimaryUserID).unwrap().value() {
            SubpacketValue::PrimaryUserID(v) => assert!(v),
            _ => unreachable!(),
        }

        assert_eq!(area.subpackets(SubpacketTag::PrimaryUserID).count(), 2);
    }
}
