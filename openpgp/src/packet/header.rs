//! OpenPGP packet headers.
//!
//! An OpenPGP packet header contains a packet tag, and the length of
//! the packet's body.  There are two header formats: the so-called
//! old format and the new format ([Section 4.2 of RFC 4880]).
//!
//!   [Section 4.2 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-4.2

use crate::{
    Error,
    Result,
};
use crate::packet::Tag;

/// A packet's header.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Header {
    /// The packet's CTB.
    ctb: CTB,
    /// The packet's length.
    length: BodyLength,
}
assert_send_and_sync!(Header);

impl Header {
    /// Creates a new header.
    pub fn new(ctb: CTB, length: BodyLength) -> Self {
        Header { ctb, length }
    }

    /// Returns the header's CTB.
    pub fn ctb(&self) -> &CTB {
        &self.ctb
    }

    /// Returns the header's length.
    pub fn length(&self) -> &BodyLength {
        &self.length
    }

    /// Checks the header for validity.
    ///
    /// A header is consider invalid if the tag is `Reserved`, or the
    /// length is implausible for the tag, e.g. a `PKESK` packet with
    /// a body of two gigabytes.
    pub fn valid(&self, future_compatible: bool) -> Result<()> {
        let tag = self.ctb.tag();

        // Reserved packets are never valid.
        if tag == Tag::Reserved {
            return Err(Error::UnsupportedPacketType(tag).into());
        }

        // Unknown packets are not valid unless we want future
        // compatibility.
        if !future_compatible
            && (matches!(tag, Tag::Unknown(_)) || matches!(tag, Tag::Private(_)))
        {
            return Err(Error::UnsupportedPacketType(tag).into());
        }

        // An implementation MAY use Partial Body Lengths for data
        // packets, be they literal, compressed, or encrypted.  The
        // first partial length MUST be at least 512 octets long.
        // Partial Body Lengths MUST NOT be used for any other packet
        // types.
        match &self.length {
            BodyLength::Full(_) => Ok(()),
            BodyLength::Partial(l) => {
                if matches!(tag,
                            Tag::Literal | Tag::CompressedData
                            | Tag::SED | Tag::SEIP | Tag::AED)
                {
                    if *l < 512 {
                        Err(Error::MalformedPacket(
                            format!("Partial body length must be \
                                     at least 512 (got: {})", l)).into())
                    } else {
                        Ok(())
                    }
                } else {
                    Err(Error::MalformedPacket(
                        format!("Partial body lengths are not allowed \
                                 for {} packets", tag)).into())
                }
            }
            BodyLength::Indeterminate =>
                // An implementation SHOULD NOT use indeterminate
                // lengths, but they are valid for the data packets in
                // the old format.
                Ok(()),
        }
    }
}

/// A packet's size.
///
/// A packet's size can be expressed in three different ways.  Either
/// the size of the packet is fully known (`Full`), the packet is
/// chunked using OpenPGP's partial body encoding (`Partial`), or the
/// packet extends to the end of the file (`Indeterminate`).  See
/// [Section 4.2 of RFC 4880] for more details.
///
///   [Section 4.2 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-4.2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum BodyLength {
    /// The packet's size is known.
    Full(u32),
    /// The parameter is the number of bytes in the current chunk.
    ///
    /// This type is only used with new format packets.
    Partial(u32),
    /// The packet extends until an EOF is encountered.
    ///
    /// This type is only used with old format packets.
    Indeterminate,
}
assert_send_and_sync!(BodyLength);

/// The CTB (Cipher Type Byte) fields of an OpenPGP packet.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CTB {
    /// New (RFC4880) CTB header format.
    New(CTBNew),
    /// Old (PGP 2.6) CTB header format.
    Old(CTBOld),
}
assert_send_and_sync!(CTB);

impl CTB {
    /// Constructs a new-style CTB.
    pub fn new(tag: Tag) -> Self {
        CTB::New(CTBNew::new(tag))
    }

    /// Returns the packet's tag.
    pub fn tag(&self) -> Tag {
        match self {
            CTB::New(c) => c.tag(),
            CTB::Old(c) => c.tag(),
        }
    }
}

/// The common CTB fields.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct CTBCommon {
    /// The packet's type.
    tag: Tag,
}

/// A CTB using the new format encoding.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CTBNew {
    /// The common CTB fields.
    pub(crate) common: CTBCommon,
}

impl CTBNew {
    /// Constructs a new-style CTB.
    pub fn new(tag: Tag) -> Self {
        CTBNew {
            common: CTBCommon {
                tag,
            },
        }
    }

    /// Returns the packet's tag.
    pub fn tag(&self) -> Tag {
        self.common.tag
    }
}

/// The length encoding used in an old-format CTB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketLengthType {
    /// A one-octet Body Length header encodes a length of from 0 to
    /// 255 octets.
    OneOctet,
    /// A two-octet Body Length header encodes a length of from 256 to
    /// 65535 octets.
    TwoOctets,
    /// A four-octet Body Length header encodes a length of up to
    /// 4,294,967,295 (0xFFFFFFFF) octets in length.
    FourOctets,
    /// The packet is of indeterminate length.
    Indeterminate,
}
assert_send_and_sync!(PacketLengthType);

impl TryFrom<u8> for PacketLengthType {
    type Error = anyhow::Error;

    fn try_from(u: u8) -> Result<Self> {
        match u {
            0 => Ok(PacketLengthType::OneOctet),
            1 => Ok(PacketLengthType::TwoOctets),
            2 => Ok(PacketLengthType::FourOctets),
            3 => Ok(PacketLengthType::Indeterminate),
            _ => Err(Error::InvalidArgument(
                format!("Invalid packet length type {}", u)).into()),
        }
    }
}

impl From<PacketLengthType> for u8 {
    fn from(l: PacketLengthType) -> Self {
        match l {
            PacketLengthType::OneOctet => 0,
            PacketLengthType::TwoOctets => 1,
            PacketLengthType::FourOctets => 2,
            PacketLengthType::Indeterminate => 3,
        }
    }
}

/// A CTB using the old format encoding.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CTBOld {
    /// The common CTB fields.
    pub(crate) common: CTBCommon,
    /// The length encoding.
    pub(crate) length_type: PacketLengthType,
}

impl CTBOld {
    /// Constructs an old-style CTB.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the tag or the body
    /// length cannot be expressed using an old-style CTB.
    ///
    ///   [`Error::InvalidArgument`]: ../../enum.Error.html#variant.InvalidArgument
    pub fn new(tag: Tag, length: BodyLength) -> Result<Self> {
        let n: u8 = tag.into();

        // Only tags 0-15 are supported.
        if n > 15 {
            return Err(Error::InvalidArgument(
                format!("Only tags 0-15 are supported, got: {:?} ({})",
                        tag, n)).into());
        }

        let length_type = match length {
            // Assume an optimal encoding.
            BodyLength::Full(l) => {
                match l {
                    0..=0xFF => PacketLengthType::OneOctet,
                    0x1_00..=0xFF_FF => PacketLengthType::TwoOctets,
                    _ => PacketLengthType::FourOctets,
                }
            }
            BodyLength::Partial(_) =>
                return Err(Error::InvalidArgument(
                    "Partial body lengths are not support \
                     for old format packets".into()).into()),
            BodyLength::Indeterminate =>
                PacketLengthType::Indeterminate,
        };

        Ok(CTBOld {
            common: CTBCommon {
                tag,
            },
            length_type,
        })
    }

    /// Returns the packet's tag.
    pub fn tag(&self) -> Tag {
        self.common.tag
    }

    /// Returns the packet's length type.
    pub fn length_type(&self) -> PacketLengthType {
        self.length_type
    }
}

impl TryFrom<u8> for CTB {
    type Error = anyhow::Error;

    /// Parses a CTB as described in [Section 4.2 of RFC 4880].
    ///
    ///   [Section 4.2 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-4.2
    fn try_from(ptag: u8) -> Result<CTB> {
        // The top bit of the ptag must be set.
        if ptag & 0b1000_0000 == 0 {
            return Err(
                Error::MalformedPacket(
                    format!("Malformed CTB: MSB of ptag ({:#010b}) not set",
                            ptag)).into());
        }

        let new_format = ptag & 0b0100_0000 != 0;
        let ctb = if new_format {
            let tag = ptag & 0b0011_1111;
            CTB::New(CTBNew {
                common: CTBCommon {
                    tag: tag.into(),
                },
            })
        } else {
            let tag = (ptag & 0b0011_1100) >> 2;
            let length_type = ptag & 0b0000_0011;

            CTB::Old(CTBOld {
                common: CTBCommon {
                    tag: tag.into(),
                },
                length_type: PacketLengthType::try_from(length_type)?,
            })
        };

        Ok(ctb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ctb_parse() {
        // New format literal: 0b11_001011.
        let ctb = CTB::try_from(0xCB).unwrap();
        assert_eq!(ctb.tag(), Tag::Literal);
        assert_match!(CTB::New(_) = ctb);

        // Old format public key: 0b10_0110_00.
        let ctb = CTB::try_from(0x98).unwrap();
        assert_eq!(ctb.tag(), Tag::PublicKey);
        match ctb {
            CTB::Old(ctb) => {
                assert_eq!(ctb.length_type(), PacketLengthType::OneOctet);
            }
            _ => panic!("expected an old-format CTB"),
        }

        // MSB clear.
        assert!(CTB::try_from(0x3F).is_err());
    }

    #[test]
    fn old_ctb_restrictions() {
        assert!(CTBOld::new(Tag::AED, BodyLength::Full(1)).is_err());
        assert!(CTBOld::new(Tag::Literal, BodyLength::Partial(512)).is_err());
        assert!(CTBOld::new(Tag::Literal, BodyLength::Full(1)).is_ok());
    }

    #[test]
    fn header_validity() {
        let h = Header::new(CTB::new(Tag::Literal),
                            BodyLength::Partial(512));
        assert!(h.valid(false).is_ok());

        let h = Header::new(CTB::new(Tag::Literal),
                            BodyLength::Partial(511));
        assert!(h.valid(false).is_err());

        let h = Header::new(CTB::new(Tag::Signature),
                            BodyLength::Partial(512));
        assert!(h.valid(false).is_err());

        let h = Header::new(CTB::new(Tag::Reserved),
                            BodyLength::Full(0));
        assert!(h.valid(true).is_err());
    }
}
