//! Parses a packet stream into a packet pile, one packet at a time.

use std::io;

use crate::{
    Packet,
    PacketPile,
    Result,
};
use crate::parse::{
    Parse,
    PacketParser,
    PacketParserResult,
};

/// Parses an OpenPGP stream with the convenience of
/// `PacketPile::from_bytes` and the flexibility of a `PacketParser`.
///
/// Like a [`PacketParser`], a `PacketPileParser` parses one packet at
/// a time, and the caller decides whether to recurse into containers.
/// Unlike the `PacketParser`, the visited packets are accumulated
/// into a [`PacketPile`], which can be retrieved once the parser is
/// exhausted.
///
///   [`PacketParser`]: struct.PacketParser.html
///   [`PacketPile`]: ../struct.PacketPile.html
pub struct PacketPileParser<'a> {
    /// The current packet parser, if any.
    ppr: PacketParserResult<'a>,

    /// The packet pile that has been assembled so far.
    pile: Vec<(isize, Packet)>,
}

impl<'a> Parse<'a, PacketPileParser<'a>> for PacketPileParser<'a> {
    fn from_reader<R: 'a + io::Read + Send + Sync>(reader: R)
                                                   -> Result<Self> {
        Ok(Self::from_packet_parser(PacketParser::from_reader(reader)?))
    }

    fn from_bytes<D: AsRef<[u8]> + ?Sized + Send + Sync>(data: &'a D)
                                                         -> Result<Self> {
        Ok(Self::from_packet_parser(PacketParser::from_bytes(data)?))
    }
}

impl<'a> PacketPileParser<'a> {
    fn from_packet_parser(ppr: PacketParserResult<'a>) -> Self {
        PacketPileParser {
            ppr,
            pile: Vec::new(),
        }
    }

    /// Returns a reference to the current packet, if any.
    pub fn packet(&self) -> Option<&Packet> {
        match &self.ppr {
            PacketParserResult::Some(pp) => Some(&pp.packet),
            PacketParserResult::EOF(_) => None,
        }
    }

    /// Returns the current packet's recursion depth.
    pub fn recursion_depth(&self) -> Option<isize> {
        match &self.ppr {
            PacketParserResult::Some(pp) => Some(pp.recursion_depth()),
            PacketParserResult::EOF(_) => None,
        }
    }

    /// Returns whether the stream is exhausted.
    pub fn is_done(&self) -> bool {
        self.ppr.is_eof()
    }

    /// Finishes parsing the current packet, recursing into it if it
    /// is a container, and advances to the next packet.
    pub fn recurse(&mut self) -> Result<bool> {
        if let Some(mut pp) = self.ppr.take() {
            pp.buffer_unread_content()?;
            let depth = pp.recursion_depth();
            let (packet, ppr) = pp.recurse()?;
            self.pile.push((depth, packet));
            self.ppr = ppr;
        }
        Ok(self.ppr.is_some())
    }

    /// Finishes parsing the current packet and advances to its next
    /// sibling, without recursing into containers.
    pub fn next(&mut self) -> Result<bool> {
        if let Some(mut pp) = self.ppr.take() {
            pp.buffer_unread_content()?;
            let depth = pp.recursion_depth();
            let (packet, ppr) = pp.next()?;
            self.pile.push((depth, packet));
            self.ppr = ppr;
        }
        Ok(self.ppr.is_some())
    }

    /// Finishes parsing the stream and returns the assembled packet
    /// pile.
    pub fn finish(mut self) -> Result<PacketPile> {
        while self.recurse()? {
            // Keep going.
        }
        PacketPile::from_flattened(self.pile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{Literal, Tag};
    use crate::serialize::MarshalInto;
    use crate::types::DataFormat;

    #[test]
    fn iterate() {
        let mut l1 = Literal::new(DataFormat::Binary);
        l1.set_body(b"first".to_vec());
        let mut l2 = Literal::new(DataFormat::Binary);
        l2.set_body(b"second".to_vec());
        let pile = PacketPile::from(vec![l1.into(), l2.into()]);
        let buf = pile.to_vec().unwrap();

        let mut ppp = PacketPileParser::from_bytes(&buf).unwrap();
        let mut tags = Vec::new();
        while let Some(p) = ppp.packet() {
            tags.push(p.tag());
            ppp.recurse().unwrap();
        }
        assert_eq!(&tags, &[Tag::Literal, Tag::Literal]);

        let pile2 = ppp.finish().unwrap();
        assert_eq!(pile, pile2);
    }
}
