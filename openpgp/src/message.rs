//! OpenPGP message support.
//!
//! An OpenPGP message is a sequence of packets obeying the grammar of
//! [Section 11.3 of RFC 4880]: an optionally encrypted, optionally
//! signed, optionally compressed literal data packet.  The grammar is
//! validated by recursive descent; the composition rules it enforces
//! are the ones the streaming verifier relies on, notably the
//! LIFO pairing of one-pass signature and signature packets.
//!
//!   [Section 11.3 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-11.3

use std::convert::TryFrom;
use std::fmt;
use std::io;

use crate::Result;
use crate::Error;
use crate::Packet;
use crate::PacketPile;
use crate::packet::{Literal, Tag};
use crate::parse::Parse;

/// An OpenPGP message.
///
/// An OpenPGP message is a structured sequence of OpenPGP packets.
/// Basically, it's an optionally encrypted, optionally signed literal
/// data packet.  The exact structure is defined in [Section 11.3 of
/// RFC 4880].
///
///   [Section 11.3 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-11.3
#[derive(PartialEq, Clone)]
pub struct Message {
    /// A message is just a validated packet pile.
    pile: PacketPile,
}
assert_send_and_sync!(Message);

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Message")
            .field("pile", &self.pile)
            .finish()
    }
}

impl<'a> Parse<'a, Message> for Message {
    fn from_reader<R: 'a + io::Read + Send + Sync>(reader: R)
                                                   -> Result<Message> {
        Self::try_from(PacketPile::from_reader(reader)?)
    }

    fn from_bytes<D: AsRef<[u8]> + ?Sized + Send + Sync>(data: &'a D)
                                                         -> Result<Message> {
        Self::try_from(PacketPile::from_bytes(data)?)
    }
}

impl TryFrom<PacketPile> for Message {
    type Error = anyhow::Error;

    /// Converts the `PacketPile` to a `Message`.
    ///
    /// Converting a `PacketPile` to a `Message` validates the
    /// message's structure using the OpenPGP grammar.
    fn try_from(pile: PacketPile) -> Result<Self> {
        let r = validate(pile.children().as_slice());
        match r {
            Ok(()) => Ok(Message { pile }),
            Err(e) => Err(e),
        }
    }
}

impl TryFrom<Vec<Packet>> for Message {
    type Error = anyhow::Error;

    fn try_from(packets: Vec<Packet>) -> Result<Self> {
        Self::try_from(PacketPile::from(packets))
    }
}

impl From<Message> for PacketPile {
    fn from(m: Message) -> Self {
        m.pile
    }
}

impl std::ops::Deref for Message {
    type Target = PacketPile;

    fn deref(&self) -> &Self::Target {
        &self.pile
    }
}

impl Message {
    /// Returns the body of the message.
    ///
    /// Returns `None` if no literal data packet is found.  This
    /// happens if an encrypted container has not been decrypted.
    pub fn body(&self) -> Option<&Literal> {
        for packet in self.pile.descendants() {
            if let Packet::Literal(l) = packet {
                return Some(l);
            }
        }

        // No literal data packet found.
        None
    }
}

/// Validates a packet sequence against the message grammar.
///
/// `OpenPGP Message :- Encrypted Message | Signed Message |
/// Compressed Message | Literal Message.`
fn validate(packets: &[Packet]) -> Result<()> {
    let malformed = |e: &str| -> anyhow::Error {
        Error::MalformedMessage(e.into()).into()
    };

    // Marker packets must be ignored wherever they occur.
    let packets = packets.iter()
        .filter(|p| p.tag() != Tag::Marker)
        .collect::<Vec<_>>();

    if packets.is_empty() {
        return Err(malformed("An empty sequence is not a message"));
    }

    // Count the leading ESK packets.
    let esks = packets.iter()
        .take_while(|p| matches!(p.tag(), Tag::PKESK | Tag::SKESK))
        .count();

    if esks > 0 {
        // Encrypted Message :- ESK Sequence, Encrypted Data.
        if packets.len() != esks + 1 {
            return Err(malformed(
                "An ESK sequence must be followed by exactly \
                 one encrypted data packet"));
        }
        return validate_encrypted(packets[esks]);
    }

    match packets[0].tag() {
        Tag::SED | Tag::SEIP | Tag::AED => {
            // An Encrypted Message without ESKs: the session key
            // comes from somewhere else.
            if packets.len() != 1 {
                return Err(malformed(
                    "Trailing data after the encrypted data packet"));
            }
            validate_encrypted(packets[0])
        }

        Tag::Literal => {
            // Literal Message.
            if packets.len() != 1 {
                return Err(malformed(
                    "Trailing data after the literal data packet"));
            }
            Ok(())
        }

        Tag::CompressedData => {
            // Compressed Message.
            if packets.len() != 1 {
                return Err(malformed(
                    "Trailing data after the compressed data packet"));
            }
            validate_compressed(packets[0])
        }

        Tag::Signature => {
            // Signed Message :- Signature Packet, OpenPGP Message.
            validate(&packets_to_vec(&packets[1..]))
        }

        Tag::OnePassSig => {
            // Signed Message :- One-Pass Signed Message.
            //
            // One-Pass Signed Message :- One-Pass Signature Packet,
            // OpenPGP Message, Corresponding Signature Packet.
            //
            // Nested one-pass signatures form a stack: the i-th
            // one-pass signature packet corresponds to the i-th
            // signature packet from the end.
            let n = packets.len();
            if n < 3 {
                return Err(malformed(
                    "A one-pass signed message requires at least \
                     three packets"));
            }

            let ops = match &packets[0] {
                Packet::OnePassSig(ops) => ops,
                _ => unreachable!("tag matched above"),
            };
            let sig = match &packets[n - 1] {
                Packet::Signature(sig) => sig,
                _ => return Err(malformed(
                    "A one-pass signature packet without a \
                     corresponding signature packet")),
            };

            // The pair must agree on the issuer.
            if !sig.issuers().any(|i| i == ops.issuer()) {
                return Err(malformed(
                    "One-pass signature packet and signature packet \
                     issuer mismatch"));
            }

            validate(&packets_to_vec(&packets[1..n - 1]))
        }

        t => Err(Error::MalformedMessage(
            format!("A message may not start with a {} packet", t))
                 .into()),
    }
}

fn packets_to_vec(packets: &[&Packet]) -> Vec<Packet> {
    packets.iter().map(|&p| p.clone()).collect()
}

/// Validates the children of an encrypted data packet, if available.
fn validate_encrypted(p: &Packet) -> Result<()> {
    let children = p.children().cloned().collect::<Vec<_>>();
    if children.is_empty() {
        // Unprocessed (not decrypted): nothing to check.
        return Ok(());
    }

    // A decrypted encrypted container contains an OpenPGP message,
    // and, for the SEIP packet, a trailing MDC packet.
    let children = if p.tag() == Tag::SEIP {
        match children.last().map(|p| p.tag()) {
            // The MDC packet may have been validated and removed by
            // the decryptor.
            Some(Tag::MDC) => &children[..children.len() - 1],
            _ => &children[..],
        }
    } else {
        &children[..]
    };

    validate(children)
}

/// Validates the children of a compressed data packet, if available.
fn validate_compressed(p: &Packet) -> Result<()> {
    let children = p.children().cloned().collect::<Vec<_>>();
    if children.is_empty() {
        // The content was not decompressed.
        return Ok(());
    }

    validate(&children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::prelude::*;
    use crate::types::{CompressionAlgorithm, DataFormat};

    fn literal(content: &[u8]) -> Literal {
        let mut l = Literal::new(DataFormat::Binary);
        l.set_body(content.to_vec());
        l
    }

    #[test]
    fn literal_is_a_message() {
        let m = Message::try_from(vec![literal(b"hello").into()]);
        assert!(m.is_ok());
        assert_eq!(m.unwrap().body().unwrap().body(), b"hello");
    }

    #[test]
    fn empty_is_not_a_message() {
        assert!(Message::try_from(vec![]).is_err());
    }

    #[test]
    fn two_literals_are_not_a_message() {
        assert!(Message::try_from(vec![
            literal(b"one").into(),
            literal(b"two").into(),
        ]).is_err());
    }

    #[test]
    fn compressed_literal_is_a_message() {
        let cd = CompressedData::new(CompressionAlgorithm::Zip)
            .push(literal(b"text").into());
        assert!(Message::try_from(vec![cd.into()]).is_ok());
    }

    #[test]
    fn a_key_is_not_a_message() {
        use crate::packet::key::{Key4, SecretParts, PrimaryRole};
        let key: Key4<SecretParts, PrimaryRole> =
            Key4::generate_ecc(true, crate::types::Curve::Ed25519).unwrap();
        let (public, _) = key.take_secret();
        let p: Packet = crate::packet::Key::V4(public).into();
        assert!(Message::try_from(vec![p]).is_err());
    }

    #[test]
    fn markers_are_ignored() {
        let m = Message::try_from(vec![
            Marker::default().into(),
            literal(b"hello").into(),
        ]);
        assert!(m.is_ok());
    }
}
