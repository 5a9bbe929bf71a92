//! Unstructured packet sequences.
//!
//! The `PacketPile` data structure is declared in the crate root;
//! this module implements its functionality.

use std::fmt;
use std::io;
use std::iter::FromIterator;
use std::vec;

use crate::Error;
use crate::Packet;
use crate::PacketPile;
use crate::Result;
use crate::packet::Container;
use crate::parse::{
    Parse,
    PacketParser,
    PacketParserResult,
};

impl std::ops::Deref for PacketPile {
    type Target = Vec<Packet>;

    fn deref(&self) -> &Self::Target {
        &self.top_level.packets
    }
}

impl std::ops::DerefMut for PacketPile {
    fn deref_mut(&mut self) -> &mut Vec<Packet> {
        &mut self.top_level.packets
    }
}

impl fmt::Display for PacketPile {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "PacketPile ({} packets)", self.top_level.packets.len())
    }
}

impl From<Vec<Packet>> for PacketPile {
    fn from(p: Vec<Packet>) -> Self {
        PacketPile {
            top_level: Container::from(p),
        }
    }
}

impl From<Packet> for PacketPile {
    fn from(p: Packet) -> Self {
        Self::from(vec![p])
    }
}

impl FromIterator<Packet> for PacketPile {
    fn from_iter<I: IntoIterator<Item = Packet>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<Packet>>())
    }
}

impl<'a> Parse<'a, PacketPile> for PacketPile {
    /// Deserializes the OpenPGP message stored in a `std::io::Read`
    /// object.
    ///
    /// Although this method is easier to use to parse a sequence of
    /// OpenPGP packets than a [`PacketParser`] or a
    /// [`PacketPileParser`], this interface buffers the whole message
    /// in memory.  Thus, the caller must be certain that the
    /// *deserialized* message is not too large.
    ///
    /// Note: this interface *does* buffer the contents of packets.
    ///
    ///   [`PacketParser`]: parse/struct.PacketParser.html
    ///   [`PacketPileParser`]: parse/struct.PacketPileParser.html
    fn from_reader<R: 'a + io::Read + Send + Sync>(reader: R)
                                                   -> Result<PacketPile> {
        let ppr = PacketParser::from_reader(reader)?;
        PacketPile::from_packet_parser(ppr)
    }

    /// Deserializes the OpenPGP message stored in the provided buffer.
    ///
    /// See [`from_reader`] for more details and caveats.
    ///
    ///   [`from_reader`]: #method.from_reader
    fn from_bytes<D: AsRef<[u8]> + ?Sized + Send + Sync>(data: &'a D)
                                                         -> Result<PacketPile>
    {
        let ppr = PacketParser::from_bytes(data)?;
        PacketPile::from_packet_parser(ppr)
    }
}

impl PacketPile {
    /// Returns an error if operating on a non-container packet.
    fn error() -> anyhow::Error {
        Error::InvalidOperation("Not a container packet".into()).into()
    }

    /// Accumulates a parsed packet sequence into a `PacketPile`.
    ///
    /// The parser is driven to completion, recursing into containers
    /// and buffering the packets' contents.
    pub(crate) fn from_packet_parser(ppr: PacketParserResult)
                                     -> Result<PacketPile> {
        // Things are not going to work out if we don't start with an
        // empty path.
        let mut ppr = ppr;
        let mut flat: Vec<(isize, Packet)> = Vec::new();

        while let PacketParserResult::Some(mut pp) = ppr {
            pp.buffer_unread_content()?;
            let depth = pp.recursion_depth();
            let (packet, tmp) = pp.recurse()?;
            flat.push((depth, packet));
            ppr = tmp;
        }

        Self::from_flattened(flat)
    }

    /// Rebuilds the packet tree from a depth-annotated sequence.
    pub(crate) fn from_flattened(flat: Vec<(isize, Packet)>)
                                 -> Result<PacketPile> {
        let mut pile = PacketPile::default();

        for (depth, packet) in flat {
            // Find the insertion point: the last container at
            // depth - 1.
            let mut container = &mut pile.top_level;
            for _ in 0..depth {
                let i = container.packets.len().checked_sub(1)
                    .ok_or_else(|| Error::MalformedMessage(
                        "Invalid packet nesting".into()))?;
                container = container.packets[i].container_mut()
                    .ok_or_else(|| Error::MalformedMessage(
                        "Invalid packet nesting".into()))?;
            }
            container.packets.push(packet);
        }

        Ok(pile)
    }

    /// Returns an iterator over the top-level packets.
    pub fn children(&self) -> std::slice::Iter<Packet> {
        self.top_level.children()
    }

    /// Returns an `IntoIter` over the top-level packets.
    pub fn into_children(self) -> vec::IntoIter<Packet> {
        self.top_level.into_children()
    }

    /// Returns an iterator over all of the packet's descendants, in
    /// depth-first order.
    pub fn descendants(&self) -> crate::packet::Iter {
        self.top_level.descendants()
    }

    /// Returns a reference to the packet at the location described by
    /// `pathspec`.
    ///
    /// `pathspec` is a slice of the form `[0, 1, 2]`.  Each element
    /// is the index of packet in a container.  Thus, the previous
    /// path specification means: return the third child of the second
    /// child of the first top-level packet.  In other words, the
    /// starred packet in the following tree:
    ///
    /// ```text
    ///         PacketPile
    ///        /     |     \
    ///       0      1      2  ...
    ///      / \
    ///     /   \
    ///   0      1  ...
    ///        / | \
    ///       0  1  2  ...
    ///          *
    /// ```
    pub fn path_ref(&self, pathspec: &[usize]) -> Option<&Packet> {
        let mut packet: Option<&Packet> = None;

        let mut cont = Some(&self.top_level);
        for i in pathspec {
            if let Some(c) = cont.take() {
                if *i < c.packets.len() {
                    let p = &c.packets[*i];
                    packet = Some(p);
                    cont = p.container_ref();
                    continue;
                }
            }

            return None;
        }
        packet
    }

    /// Replaces the specified packets at the location described by
    /// `pathspec` with `packets`.
    ///
    /// If a packet is a container, the sub-tree rooted at the
    /// container is removed.
    ///
    /// Note: the number of packets to remove need not match the
    /// number of packets to insert.
    pub fn replace(&mut self, pathspec: &[usize], count: usize,
                   mut packets: Vec<Packet>)
                   -> Result<Vec<Packet>> {
        /* Pathspec handling.  */
        let mut container = &mut self.top_level;

        if let Some((&index, tail)) = pathspec.split_first() {
            let mut index = index;
            let mut tail = tail;

            loop {
                if tail.is_empty() {
                    if container.packets.len() < index + count {
                        return Err(Self::error());
                    }

                    // Out with the old...
                    let old = container.packets
                        .splice(index..index + count,
                                packets.drain(..))
                        .collect::<Vec<Packet>>();
                    return Ok(old);
                }

                if index >= container.packets.len() {
                    return Err(Self::error());
                }

                container = container.packets[index].container_mut()
                    .ok_or_else(Self::error)?;

                let (&i, t) = tail.split_first().expect("checked above");
                index = i;
                tail = t;
            }
        } else {
            Err(Self::error())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{Literal, CompressedData};
    use crate::serialize::MarshalInto;
    use crate::types::{CompressionAlgorithm, DataFormat};

    fn literal(content: &[u8]) -> Literal {
        let mut l = Literal::new(DataFormat::Binary);
        l.set_body(content.to_vec());
        l
    }

    #[test]
    fn deref() {
        let mut pile = PacketPile::from(vec![literal(b"one").into()]);
        assert_eq!(pile.len(), 1);
        pile.push(literal(b"two").into());
        assert_eq!(pile.len(), 2);
    }

    #[test]
    fn roundtrip_flat() {
        let pile = PacketPile::from(vec![
            literal(b"hello").into(),
            literal(b"world").into(),
        ]);

        let buf = pile.to_vec().unwrap();
        let pile2 = PacketPile::from_bytes(&buf).unwrap();
        assert_eq!(pile, pile2);
    }

    #[test]
    fn roundtrip_nested() {
        let cd = CompressedData::new(CompressionAlgorithm::Zip)
            .push(literal(b"compressed greetings").into());
        let pile = PacketPile::from(vec![cd.into()]);

        let buf = pile.to_vec().unwrap();
        let pile2 = PacketPile::from_bytes(&buf).unwrap();

        // The decompressed tree contains the literal as a child of
        // the compressed data packet.
        let children = pile2.path_ref(&[0, 0]).expect("child");
        match children {
            Packet::Literal(l) => {
                assert_eq!(l.body(), b"compressed greetings");
            }
            p => panic!("unexpected packet {:?}", p),
        }
    }

    #[test]
    fn path_ref_and_replace() {
        let mut pile = PacketPile::from(vec![
            literal(b"a").into(),
            literal(b"b").into(),
        ]);

        assert!(matches!(pile.path_ref(&[1]), Some(Packet::Literal(_))));
        assert!(pile.path_ref(&[2]).is_none());

        let old = pile.replace(&[1], 1, vec![literal(b"c").into()])
            .unwrap();
        assert_eq!(old.len(), 1);
        match pile.path_ref(&[1]).unwrap() {
            Packet::Literal(l) => assert_eq!(l.body(), b"c"),
            _ => unreachable!(),
        }
    }
}
