//! Packet parsing infrastructure.
//!
//! An OpenPGP stream is a sequence of packets, some of which contain
//! other packets.  The heart of this module is the [`PacketParser`]:
//! it reads one packet at a time from a `BufferedReader` stack,
//! parses the packet's fixed fields eagerly, and leaves bulk content
//! (literal data, encrypted bodies) in the stream so that arbitrarily
//! large messages can be processed in constant memory.  Containers
//! are entered with [`PacketParser::recurse`], which pushes the
//! appropriate filter (a decompressor, a decryptor) onto the reader
//! stack.
//!
//!   [`PacketParser`]: struct.PacketParser.html
//!
//! The [`Parse`] trait provides the convenient entry points
//! `from_bytes`, `from_reader`, and `from_file` implemented by all
//! data structures that can be read from a stream.
//!
//!   [`Parse`]: trait.Parse.html

use std::convert::TryFrom;
use std::fs::File;
use std::io;
use std::path::Path;

use buffered_reader::BufferedReader;

use crate::{
    Error,
    KeyID,
    Packet,
    Result,
    crypto::{self, S2K, SessionKey},
    crypto::s2k::GnuS2K,
    crypto::symmetric::Cfb,
    packet::prelude::*,
    packet::{Header, Tag},
    packet::header::{BodyLength, CTB, PacketLengthType},
    packet::key,
    packet::signature::subpacket::SubpacketArea,
    types::{
        AEADAlgorithm,
        CompressionAlgorithm,
        DataFormat,
        HashAlgorithm,
        PublicKeyAlgorithm,
        SignatureType,
        SymmetricAlgorithm,
        Timestamp,
    },
};

mod partial_body;
use self::partial_body::PartialBodyFilter;
pub(crate) mod mpis;
mod packet_pile_parser;
pub use self::packet_pile_parser::PacketPileParser;
pub mod stream;

/// The default amount of acceptable nesting.
///
/// The default is `16`.
///
/// Typical messages are protected by a compression container and an
/// encryption container, and are thus unlikely to exceed a depth of
/// three.
pub const DEFAULT_MAX_RECURSION_DEPTH: isize = 16;

/// Reader state for the parser stack.
///
/// Every reader in the stack carries a `Cookie`; the `level` ties the
/// reader to the recursion depth of the packets read from it so that
/// the parser can unwind the stack when ascending.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Cookie {
    /// The recursion depth of the packets read from this reader.
    pub(crate) level: isize,
}

impl Cookie {
    pub(crate) fn new(level: isize) -> Self {
        Cookie { level }
    }
}

pub(crate) type BoxedReader<'a> = Box<dyn BufferedReader<Cookie> + 'a>;

/// Parsing of packets and related structures.
///
/// This is a uniform interface to parse packets, messages, keys, and
/// related data structures.
pub trait Parse<'a, T> {
    /// Reads from the given reader.
    fn from_reader<R: 'a + io::Read + Send + Sync>(reader: R) -> Result<T>;

    /// Reads from the given file.
    ///
    /// The default implementation just uses [`from_reader(..)`]; many
    /// of the wrapped types use a more optimized version.
    ///
    ///   [`from_reader(..)`]: #tymethod.from_reader
    fn from_file<P: AsRef<Path>>(path: P) -> Result<T> {
        Self::from_reader(File::open(path)?)
    }

    /// Reads from the given slice.
    ///
    /// The default implementation just uses [`from_reader(..)`].
    ///
    ///   [`from_reader(..)`]: #tymethod.from_reader
    fn from_bytes<D: AsRef<[u8]> + ?Sized + Send + Sync>(data: &'a D)
                                                         -> Result<T> {
        Self::from_reader(io::Cursor::new(data))
    }
}

impl BodyLength {
    /// Decodes a new format body length as described in [Section
    /// 4.2.2 of RFC 4880].
    ///
    ///   [Section 4.2.2 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-4.2.2
    pub(crate) fn parse_new_format<T: BufferedReader<C>, C>(bio: &mut T)
        -> io::Result<BodyLength>
        where C: std::fmt::Debug + Send + Sync,
    {
        let octet1: u8 = bio.data_consume_hard(1)?[0];
        match octet1 {
            0..=191 => // One octet.
                Ok(BodyLength::Full(octet1 as u32)),
            192..=223 => { // Two octets length.
                let octet2 = bio.data_consume_hard(1)?[0];
                Ok(BodyLength::Full(
                    ((octet1 as u32 - 192) << 8) + octet2 as u32 + 192))
            }
            224..=254 => // Partial body length.
                Ok(BodyLength::Partial(1 << (octet1 & 0x1F))),
            255 => // Five octets.
                Ok(BodyLength::Full(bio.read_be_u32()?)),
        }
    }

    /// Decodes an old format body length as described in [Section
    /// 4.2.1 of RFC 4880].
    ///
    ///   [Section 4.2.1 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-4.2.1
    pub(crate) fn parse_old_format<T: BufferedReader<C>, C>(
        bio: &mut T, length_type: PacketLengthType)
        -> Result<BodyLength>
        where C: std::fmt::Debug + Send + Sync,
    {
        match length_type {
            PacketLengthType::OneOctet =>
                Ok(BodyLength::Full(bio.data_consume_hard(1)?[0] as u32)),
            PacketLengthType::TwoOctets =>
                Ok(BodyLength::Full(bio.read_be_u16()? as u32)),
            PacketLengthType::FourOctets =>
                Ok(BodyLength::Full(bio.read_be_u32()?)),
            PacketLengthType::Indeterminate =>
                Ok(BodyLength::Indeterminate),
        }
    }
}

impl Header {
    /// Parses an OpenPGP packet's header as described in [Section 4.2
    /// of RFC 4880].
    ///
    ///   [Section 4.2 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-4.2
    pub(crate) fn parse<T: BufferedReader<C>, C>(bio: &mut T)
        -> Result<Header>
        where C: std::fmt::Debug + Send + Sync,
    {
        let ctb = CTB::try_from(bio.data_consume_hard(1)?[0])?;
        let length = match ctb {
            CTB::New(_) => BodyLength::parse_new_format(bio)?,
            CTB::Old(ref ctb) =>
                BodyLength::parse_old_format(bio, ctb.length_type())?,
        };
        Ok(Header::new(ctb, length))
    }
}

/// Reads the fixed fields of a packet's body.
///
/// All field parsers read from a `PacketHeaderParser`, which wraps
/// the packet's framed body.
pub(crate) struct PacketHeaderParser<'a> {
    /// The reader for the packet's body.
    reader: BoxedReader<'a>,
}

impl<'a> PacketHeaderParser<'a> {
    fn new(reader: BoxedReader<'a>) -> Self {
        PacketHeaderParser { reader }
    }

    /// Wraps a byte slice for parsing structures that are not framed
    /// by a packet header, e.g. an embedded signature.
    pub(crate) fn new_naked(data: &'a [u8]) -> Self {
        PacketHeaderParser {
            reader: Box::new(buffered_reader::Memory::with_cookie(
                data, Cookie::default())),
        }
    }

    fn into_reader(self) -> BoxedReader<'a> {
        self.reader
    }

    pub(crate) fn parse_u8(&mut self, _name: &str) -> Result<u8> {
        Ok(self.reader.data_consume_hard(1)?[0])
    }

    pub(crate) fn parse_be_u16(&mut self, _name: &str) -> Result<u16> {
        Ok(self.reader.read_be_u16()?)
    }

    pub(crate) fn parse_be_u32(&mut self, _name: &str) -> Result<u32> {
        Ok(self.reader.read_be_u32()?)
    }

    pub(crate) fn parse_bytes(&mut self, _name: &str, amount: usize)
                              -> Result<Vec<u8>> {
        Ok(self.reader.steal(amount)?)
    }

    pub(crate) fn parse_bytes_eof(&mut self, _name: &str)
                                  -> Result<Vec<u8>> {
        Ok(self.reader.steal_eof()?)
    }

    /// Returns whether the body has been fully consumed.
    pub(crate) fn exhausted(&mut self) -> Result<bool> {
        Ok(self.reader.data(1)?.is_empty())
    }
}

impl S2K {
    /// Parses an S2K specifier as described in [Section 3.7.1 of RFC
    /// 4880].
    ///
    ///   [Section 3.7.1 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-3.7.1
    pub(crate) fn parse(php: &mut PacketHeaderParser) -> Result<Self> {
        let s2k = php.parse_u8("s2k_type")?;
        let ret = match s2k {
            0 => S2K::Simple {
                hash: php.parse_u8("s2k_hash_algo")?.into(),
            },
            1 => S2K::Salted {
                hash: php.parse_u8("s2k_hash_algo")?.into(),
                salt: Self::read_salt(php)?,
            },
            3 => S2K::Iterated {
                hash: php.parse_u8("s2k_hash_algo")?.into(),
                salt: Self::read_salt(php)?,
                hash_bytes: S2K::decode_count(
                    php.parse_u8("s2k_count")?),
            },
            101 => {
                // The GNU S2K extensions are marked by the salt
                // "GNU" plus a mode octet.
                let _hash: HashAlgorithm =
                    php.parse_u8("s2k_hash_algo")?.into();
                let magic = php.parse_bytes("gnu_magic", 3)?;
                if &magic[..] != b"GNU" {
                    return Err(Error::MalformedPacket(
                        "Malformed GNU S2K extension".into()).into());
                }
                match php.parse_u8("gnu_mode")? {
                    1 => S2K::Gnu(GnuS2K::Dummy),
                    2 => {
                        let len = php.parse_u8("card_serial_len")? as usize;
                        let serial =
                            php.parse_bytes("card_serial", len)?;
                        S2K::Gnu(GnuS2K::DivertToCard {
                            serial: serial.into_boxed_slice(),
                        })
                    }
                    m => return Err(Error::MalformedPacket(
                        format!("Unknown GNU S2K mode {}", m)).into()),
                }
            }
            100..=110 => S2K::Private {
                tag: s2k,
                parameters: None,
            },
            u => S2K::Unknown {
                tag: u,
                parameters: None,
            },
        };

        Ok(ret)
    }

    fn read_salt(php: &mut PacketHeaderParser) -> Result<[u8; 8]> {
        let mut b = [0u8; 8];
        b.copy_from_slice(&php.parse_bytes("s2k_salt", 8)?);
        Ok(b)
    }
}

impl Signature4 {
    /// Parses the body of a signature packet.
    fn parse(php: &mut PacketHeaderParser) -> Result<Packet> {
        let version = php.parse_u8("version")?;
        if version != 4 {
            // Version 3 signatures are parsed for historical
            // interoperability, but we do not interpret them; they
            // are handed to the caller as unknown packets.
            return Err(Error::MalformedPacket(
                format!("Unsupported signature version {}", version))
                       .into());
        }

        let typ: SignatureType = php.parse_u8("sigtype")?.into();
        let pk_algo: PublicKeyAlgorithm = php.parse_u8("pk_algo")?.into();
        let hash_algo: HashAlgorithm = php.parse_u8("hash_algo")?.into();

        let hashed_area_len = php.parse_be_u16("hashed_area_len")?;
        let hashed_area = SubpacketArea::parse(
            &php.parse_bytes("hashed_area", hashed_area_len as usize)?)?;
        let unhashed_area_len = php.parse_be_u16("unhashed_area_len")?;
        let unhashed_area = SubpacketArea::parse(
            &php.parse_bytes("unhashed_area",
                             unhashed_area_len as usize)?)?;

        let digest_prefix1 = php.parse_u8("digest_prefix1")?;
        let digest_prefix2 = php.parse_u8("digest_prefix2")?;

        let mpis = mpis::parse_signature(pk_algo, php)?;

        Ok(Signature4::new(typ, pk_algo, hash_algo,
                           hashed_area, unhashed_area,
                           [digest_prefix1, digest_prefix2],
                           mpis).into())
    }

    /// Parses a signature packet's body, without the packet framing.
    ///
    /// This is used for the embedded signature subpacket.
    pub(crate) fn from_bytes_naked(data: &[u8]) -> Result<Signature4> {
        let mut php = PacketHeaderParser::new_naked(data);
        match Signature4::parse(&mut php)? {
            Packet::Signature(crate::packet::Signature::V4(sig)) => Ok(sig),
            _ => unreachable!("parse returns a v4 signature"),
        }
    }
}

impl OnePassSig3 {
    /// Parses the body of a one-pass signature packet.
    fn parse(php: &mut PacketHeaderParser) -> Result<Packet> {
        let version = php.parse_u8("version")?;
        if version != 3 {
            return Err(Error::MalformedPacket(
                format!("Unsupported one-pass signature version {}",
                        version)).into());
        }

        let typ: SignatureType = php.parse_u8("sigtype")?.into();
        let hash_algo: HashAlgorithm = php.parse_u8("hash_algo")?.into();
        let pk_algo: PublicKeyAlgorithm = php.parse_u8("pk_algo")?.into();
        let issuer = KeyID::from_bytes(&php.parse_bytes("issuer", 8)?);
        let last = php.parse_u8("last")?;

        let mut ops = OnePassSig3::new(typ);
        ops.set_hash_algo(hash_algo);
        ops.set_pk_algo(pk_algo);
        ops.set_issuer(issuer);
        ops.set_last_raw(last);

        Ok(crate::packet::OnePassSig::from(ops).into())
    }
}

/// Parses the body of a key packet.
fn parse_key(php: &mut PacketHeaderParser, tag: Tag) -> Result<Packet> {
    use crate::packet::key::{
        Encrypted,
        Key4,
        SecretKeyChecksum,
        SecretKeyMaterial,
    };

    let version = php.parse_u8("version")?;
    if version != 4 {
        return Err(Error::MalformedPacket(
            format!("Unsupported key version {}", version)).into());
    }

    let creation_time: Timestamp =
        php.parse_be_u32("creation_time")?.into();
    let pk_algo: PublicKeyAlgorithm = php.parse_u8("pk_algo")?.into();
    let mpis = mpis::parse_public_key(pk_algo, php)?;

    let secret = if tag == Tag::SecretKey || tag == Tag::SecretSubkey {
        let s2k_usage = php.parse_u8("s2k_usage")?;
        Some(match s2k_usage {
            0 => {
                // Plaintext secret MPIs, followed by a 16-bit
                // checksum.
                let material = php.parse_bytes_eof("secret_mpis")?;
                let material = crypto::verify_checksum(&material)?;
                let sec = mpis::parse_secret_key(pk_algo, material)?;
                SecretKeyMaterial::Unencrypted(sec.into())
            }
            254 | 255 => {
                let algo: SymmetricAlgorithm =
                    php.parse_u8("sym_algo")?.into();
                let s2k = S2K::parse(php)?;
                let iv = if matches!(s2k, S2K::Gnu(_)) {
                    // The GNU extensions do not store any secret
                    // material, and hence no IV.
                    Vec::new()
                } else {
                    php.parse_bytes("iv", algo.block_size()?)?
                };
                let ciphertext = php.parse_bytes_eof("ciphertext")?;
                SecretKeyMaterial::Encrypted(Encrypted::new(
                    s2k, algo,
                    Some(if s2k_usage == 254 {
                        SecretKeyChecksum::SHA1
                    } else {
                        SecretKeyChecksum::Sum16
                    }),
                    iv.into_boxed_slice(),
                    ciphertext.into_boxed_slice()))
            }
            253 => {
                // AEAD protected secret material from the
                // crypto-refresh series.
                let algo: SymmetricAlgorithm =
                    php.parse_u8("sym_algo")?.into();
                let aead_algo: AEADAlgorithm =
                    php.parse_u8("aead_algo")?.into();
                let s2k = S2K::parse(php)?;
                let nonce = php.parse_bytes("nonce",
                                            aead_algo.iv_size()?)?;
                let ciphertext = php.parse_bytes_eof("ciphertext")?;
                SecretKeyMaterial::Encrypted(Encrypted::new_aead(
                    s2k, algo, aead_algo, nonce.into_boxed_slice(),
                    ciphertext.into_boxed_slice()))
            }
            algo => {
                // Any other non-zero value is the symmetric algorithm
                // id of a legacy CFB-encrypted secret, implicitly
                // keyed with MD5.
                let algo: SymmetricAlgorithm = algo.into();
                let s2k = S2K::Simple { hash: HashAlgorithm::MD5 };
                let iv = php.parse_bytes("iv", algo.block_size()?)?;
                let ciphertext = php.parse_bytes_eof("ciphertext")?;
                SecretKeyMaterial::Encrypted(Encrypted::new(
                    s2k, algo, Some(SecretKeyChecksum::Sum16),
                    iv.into_boxed_slice(),
                    ciphertext.into_boxed_slice()))
            }
        })
    } else {
        None
    };

    let key: Key4<key::UnspecifiedParts, key::UnspecifiedRole> = {
        let k = Key4::new(creation_time, pk_algo, mpis)?;
        if let Some(secret) = secret {
            k.add_secret(secret).0.parts_into_unspecified()
        } else {
            k.parts_into_unspecified()
        }
    };

    Ok(match tag {
        Tag::PublicKey =>
            Packet::PublicKey(
                crate::packet::Key::V4(
                    key.parts_into_public().role_into_primary())),
        Tag::PublicSubkey =>
            Packet::PublicSubkey(
                crate::packet::Key::V4(
                    key.parts_into_public().role_into_subordinate())),
        Tag::SecretKey =>
            Packet::SecretKey(
                crate::packet::Key::V4(
                    key.parts_into_secret()?.role_into_primary())),
        Tag::SecretSubkey =>
            Packet::SecretSubkey(
                crate::packet::Key::V4(
                    key.parts_into_secret()?.role_into_subordinate())),
        _ => unreachable!("parse_key is only called for key tags"),
    })
}

impl Marker {
    /// Parses the body of a marker packet.
    fn parse(php: &mut PacketHeaderParser) -> Result<Packet> {
        let data = php.parse_bytes_eof("marker")?;
        if &data[..] == Marker::BODY {
            Ok(Marker::default().into())
        } else {
            Err(Error::MalformedPacket("Invalid marker".into()).into())
        }
    }
}

impl Trust {
    /// Parses the body of a trust packet.
    fn parse(php: &mut PacketHeaderParser) -> Result<Packet> {
        let value = php.parse_bytes_eof("value")?;
        Ok(Trust::from(value).into())
    }
}

impl UserID {
    /// Parses the body of a user id packet.
    fn parse(php: &mut PacketHeaderParser) -> Result<Packet> {
        let value = php.parse_bytes_eof("value")?;
        Ok(UserID::from(value).into())
    }
}

impl UserAttribute {
    /// Parses the body of a user attribute packet.
    fn parse(php: &mut PacketHeaderParser) -> Result<Packet> {
        let value = php.parse_bytes_eof("value")?;
        Ok(UserAttribute::from(value).into())
    }
}

impl Literal {
    /// Parses the fixed fields of a literal packet.
    ///
    /// The packet's payload is left in the stream.
    fn parse(php: &mut PacketHeaderParser) -> Result<Packet> {
        let format: DataFormat = php.parse_u8("format")?.into();
        let filename_len = php.parse_u8("filename_len")? as usize;
        let filename = if filename_len > 0 {
            Some(php.parse_bytes("filename", filename_len)?)
        } else {
            None
        };
        let date: Timestamp = php.parse_be_u32("date")?.into();

        let mut literal = Literal::new(format);
        if let Some(filename) = filename {
            literal.set_filename(&filename)?;
        }
        literal.set_date(
            if u32::from(date) == 0 {
                None
            } else {
                Some(date.into())
            })?;

        Ok(literal.into())
    }
}

impl CompressedData {
    /// Parses the fixed fields of a compressed data packet.
    fn parse(php: &mut PacketHeaderParser) -> Result<Packet> {
        let algo: CompressionAlgorithm = php.parse_u8("algo")?.into();
        if !algo.is_supported() {
            return Err(
                Error::UnsupportedCompressionAlgorithm(algo).into());
        }
        Ok(CompressedData::new(algo).into())
    }
}

impl SKESK4 {
    /// Parses the body of an SKESK packet.
    fn parse(php: &mut PacketHeaderParser) -> Result<Packet> {
        let version = php.parse_u8("version")?;
        match version {
            4 => {
                let sym_algo: SymmetricAlgorithm =
                    php.parse_u8("sym_algo")?.into();
                let s2k = S2K::parse(php)?;
                let esk = php.parse_bytes_eof("esk")?;
                let skesk = SKESK4::new(
                    sym_algo, s2k,
                    if esk.is_empty() { None } else { Some(esk) })?;
                Ok(crate::packet::SKESK::V4(skesk).into())
            }
            5 => {
                let sym_algo: SymmetricAlgorithm =
                    php.parse_u8("sym_algo")?.into();
                let aead_algo: AEADAlgorithm =
                    php.parse_u8("aead_algo")?.into();
                let s2k = S2K::parse(php)?;
                let iv = php.parse_bytes("aead_iv",
                                         aead_algo.iv_size()?)?;
                let rest = php.parse_bytes_eof("esk_and_digest")?;
                let digest_size = aead_algo.digest_size()?;
                if rest.len() < digest_size {
                    return Err(Error::MalformedPacket(
                        "Truncated v5 SKESK".into()).into());
                }
                let l = rest.len() - digest_size;
                let esk = rest[..l].to_vec();
                let digest = rest[l..].to_vec();

                let skesk = SKESK5::new(
                    sym_algo, aead_algo, s2k, iv.into_boxed_slice(),
                    esk, digest.into_boxed_slice())?;
                Ok(crate::packet::SKESK::V5(skesk).into())
            }
            v => Err(Error::MalformedPacket(
                format!("Unsupported SKESK version {}", v)).into()),
        }
    }
}

impl PKESK3 {
    /// Parses the body of a PKESK packet.
    fn parse(php: &mut PacketHeaderParser) -> Result<Packet> {
        let version = php.parse_u8("version")?;
        if version != 3 {
            return Err(Error::MalformedPacket(
                format!("Unsupported PKESK version {}", version)).into());
        }

        let recipient = KeyID::from_bytes(
            &php.parse_bytes("recipient", 8)?);
        let pk_algo: PublicKeyAlgorithm = php.parse_u8("pk_algo")?.into();
        let esk = mpis::parse_ciphertext(pk_algo, php)?;

        Ok(crate::packet::PKESK::V3(
            PKESK3::new(recipient, pk_algo, esk)?).into())
    }
}

impl SEIP1 {
    /// Parses the fixed fields of an SEIP packet.
    fn parse(php: &mut PacketHeaderParser) -> Result<Packet> {
        let version = php.parse_u8("version")?;
        if version != 1 {
            return Err(Error::MalformedPacket(
                format!("Unsupported SEIP version {}", version)).into());
        }
        Ok(SEIP1::new().into())
    }
}

impl AED1 {
    /// Parses the fixed fields of an AED packet.
    fn parse(php: &mut PacketHeaderParser) -> Result<Packet> {
        let version = php.parse_u8("version")?;
        if version != 1 {
            return Err(Error::MalformedPacket(
                format!("Unsupported AED version {}", version)).into());
        }

        let sym_algo: SymmetricAlgorithm = php.parse_u8("sym_algo")?.into();
        let aead: AEADAlgorithm = php.parse_u8("aead_algo")?.into();
        let chunk_size_octet = php.parse_u8("chunk_size")?;
        if chunk_size_octet > 56 {
            return Err(Error::MalformedPacket(
                format!("AED chunk size octet out of range: {}",
                        chunk_size_octet)).into());
        }
        let chunk_size: u64 = 1 << (chunk_size_octet + 6);
        let iv = php.parse_bytes("iv", aead.iv_size()?)?;

        Ok(AED1::new(sym_algo, aead, chunk_size,
                     iv.into_boxed_slice())?.into())
    }
}

impl MDC {
    /// Parses the body of an MDC packet.
    fn parse(php: &mut PacketHeaderParser) -> Result<Packet> {
        let mut digest = [0u8; 20];
        digest.copy_from_slice(&php.parse_bytes("digest", 20)?);
        Ok(MDC::from(digest).into())
    }
}

/// Dispatches to the packet type's body parser.
///
/// Parsers that fail produce an `Unknown` packet wrapping the
/// unconsumed body, so that unsupported-but-recognized packets
/// survive a round-trip.
fn parse_body(php: &mut PacketHeaderParser, tag: Tag) -> Result<Packet> {
    let r = match tag {
        Tag::Signature => Signature4::parse(php),
        Tag::OnePassSig => OnePassSig3::parse(php),
        Tag::PublicKey | Tag::PublicSubkey
        | Tag::SecretKey | Tag::SecretSubkey => parse_key(php, tag),
        Tag::Marker => Marker::parse(php),
        Tag::Trust => Trust::parse(php),
        Tag::UserID => UserID::parse(php),
        Tag::UserAttribute => UserAttribute::parse(php),
        Tag::Literal => Literal::parse(php),
        Tag::CompressedData => CompressedData::parse(php),
        Tag::SKESK => SKESK4::parse(php),
        Tag::PKESK => PKESK3::parse(php),
        Tag::SED => Ok(SED::new().into()),
        Tag::SEIP => SEIP1::parse(php),
        Tag::AED => AED1::parse(php),
        Tag::MDC => MDC::parse(php),
        t => Err(Error::UnsupportedPacketType(t).into()),
    };

    match r {
        Ok(p) => Ok(p),
        Err(e) => {
            // Turn the error into an unknown packet, and preserve the
            // unread body.
            let mut unknown = Unknown::new(tag, e);
            let rest = php.parse_bytes_eof("rest")?;
            unknown.set_body(rest);
            Ok(unknown.into())
        }
    }
}

/// Whether a packet's content is parsed eagerly.
///
/// Packets that carry bulk data expose it as a stream instead.
fn parsed_eagerly(tag: Tag) -> bool {
    !matches!(tag,
              Tag::Literal | Tag::CompressedData
              | Tag::SED | Tag::SEIP | Tag::AED)
}

/// The return value of [`PacketParser::next`] and related functions.
///
///   [`PacketParser::next`]: struct.PacketParser.html#method.next
#[derive(Debug)]
pub enum PacketParserResult<'a> {
    /// A `PacketParser` for the next packet.
    Some(PacketParser<'a>),
    /// Information about a fully parsed packet sequence.
    EOF(PacketParserEOF),
}

impl<'a> PacketParserResult<'a> {
    /// Returns `true` if the result is `EOF`.
    pub fn is_eof(&self) -> bool {
        matches!(self, PacketParserResult::EOF(_))
    }

    /// Returns `true` if the result is `Some`.
    pub fn is_some(&self) -> bool {
        !self.is_eof()
    }

    /// Like `Option::take`: returns the packet parser, if any,
    /// replacing it with an EOF marker.
    pub fn take(&mut self) -> Option<PacketParser<'a>> {
        match std::mem::replace(
            self, PacketParserResult::EOF(PacketParserEOF::default()))
        {
            PacketParserResult::Some(pp) => Some(pp),
            PacketParserResult::EOF(eof) => {
                *self = PacketParserResult::EOF(eof);
                None
            }
        }
    }
}

/// Information about the stream of packets parsed by the
/// `PacketParser`.
#[derive(Debug, Default)]
pub struct PacketParserEOF {
    /// The last packet's recursion depth.
    last_recursion_depth: Option<isize>,
}

impl PacketParserEOF {
    /// The last packet's recursion depth, if any packet was parsed.
    pub fn last_recursion_depth(&self) -> Option<isize> {
        self.last_recursion_depth
    }
}

/// A low-level OpenPGP message parser.
///
/// A `PacketParser` provides a low-level, iterator-like interface to
/// parse OpenPGP messages.
///
/// For each iteration, the user is presented with a [`Packet`]
/// corresponding to the last packet, a `PacketParser` for the next
/// packet, and their positions within the message.
///
/// Using the `PacketParser`, the user is able to configure how the
/// new packet will be parsed.  For instance, it is possible to stream
/// the packet's contents (a `PacketParser` implements the
/// `std::io::Read` trait), to buffer them within the [`Packet`], or
/// to drop them.  The user can also decide to recurse into the
/// packet, if it is a container, instead of getting the following
/// packet.
///
///   [`Packet`]: ../enum.Packet.html
pub struct PacketParser<'a> {
    /// The packet that is being parsed.
    pub packet: Packet,

    /// The packet's header.
    header: Header,

    /// The reader for the packet's unread content.
    reader: BoxedReader<'a>,

    /// This packet's recursion depth.
    ///
    /// A top-level packet has a recursion depth of 0.  Packets in a
    /// top-level container have a recursion depth of 1, etc.
    recursion_depth: isize,

    /// Whether the content has been decrypted.
    ///
    /// This is only relevant for the encrypted data packets: their
    /// children can only be parsed after a successful call to
    /// [`PacketParser::decrypt`].
    ///
    ///   [`PacketParser::decrypt`]: #method.decrypt
    processed: bool,
}

impl<'a> std::fmt::Debug for PacketParser<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("PacketParser")
            .field("packet", &self.packet)
            .field("recursion_depth", &self.recursion_depth)
            .field("processed", &self.processed)
            .finish()
    }
}

impl<'a> Parse<'a, PacketParserResult<'a>> for PacketParser<'a> {
    /// Starts parsing an OpenPGP stream.
    ///
    /// This function returns a `PacketParser` for the first packet in
    /// the stream.
    fn from_reader<R: 'a + io::Read + Send + Sync>(reader: R)
        -> Result<PacketParserResult<'a>>
    {
        let bio = Box::new(buffered_reader::Generic::with_cookie(
            reader, None, Cookie::default()));
        PacketParser::from_buffered_reader(bio)
    }

    /// Starts parsing an OpenPGP message stored in a buffer.
    fn from_bytes<D: AsRef<[u8]> + ?Sized + Send + Sync>(data: &'a D)
        -> Result<PacketParserResult<'a>>
    {
        let bio = Box::new(buffered_reader::Memory::with_cookie(
            data.as_ref(), Cookie::default()));
        PacketParser::from_buffered_reader(bio)
    }
}

impl<'a> PacketParser<'a> {
    /// Starts parsing packets from a `BufferedReader`.
    pub(crate) fn from_buffered_reader(bio: BoxedReader<'a>)
                                       -> Result<PacketParserResult<'a>> {
        Self::parse_at(bio, 0)
    }

    /// Parses the next packet starting at the layer with the given
    /// level, unwinding the reader stack as needed.
    fn parse_at(mut reader: BoxedReader<'a>, mut level: isize)
                -> Result<PacketParserResult<'a>> {
        loop {
            // Skip to a layer that has data.
            while reader.data(1)?.is_empty() {
                if level == 0 {
                    return Ok(PacketParserResult::EOF(PacketParserEOF {
                        last_recursion_depth: None,
                    }));
                }

                reader.drop_eof()?;
                reader = match reader.into_inner() {
                    Some(r) => r,
                    None => return Ok(PacketParserResult::EOF(
                        PacketParserEOF {
                            last_recursion_depth: None,
                        })),
                };
                level = reader.cookie_ref().level;
            }

            let header = Header::parse(&mut reader)?;
            let tag = header.ctb().tag();

            // Unknown critical packets poison the whole stream;
            // unknown non-critical packets are skipped.
            if matches!(tag, Tag::Unknown(_) | Tag::Private(_))
                || tag == Tag::Reserved
            {
                if tag.is_critical() {
                    return Err(Error::UnsupportedPacketType(tag).into());
                }

                reader = Self::skip_body(reader, &header, level)?;
                continue;
            }

            header.valid(false)?;

            // Frame the packet's body.
            let mut body = Self::frame_body(reader, &header, level)?;

            // Parse the fixed fields.
            let mut php = PacketHeaderParser::new(body);
            let packet = parse_body(&mut php, tag)?;
            body = php.into_reader();

            if parsed_eagerly(tag) && !matches!(packet, Packet::Unknown(_))
            {
                // Eagerly parsed packets must consume their whole
                // body; trailing data indicates a malformed packet.
                if !body.data(1)?.is_empty() {
                    return Err(Error::MalformedPacket(
                        format!("Trailing data in {} packet", tag)).into());
                }
            }

            return Ok(PacketParserResult::Some(PacketParser {
                packet,
                header,
                reader: body,
                recursion_depth: level,
                processed: !matches!(
                    tag, Tag::SED | Tag::SEIP | Tag::AED),
            }));
        }
    }

    /// Pushes a framing layer for the packet body described by
    /// `header`.
    fn frame_body(reader: BoxedReader<'a>, header: &Header, level: isize)
                  -> Result<BoxedReader<'a>> {
        Ok(match header.length() {
            BodyLength::Full(l) =>
                Box::new(buffered_reader::Limitor::with_cookie(
                    reader, *l as u64, Cookie::new(level + 1))),
            BodyLength::Partial(l) =>
                Box::new(PartialBodyFilter::with_cookie(
                    reader, *l, Cookie::new(level + 1))),
            BodyLength::Indeterminate =>
                // The body extends to the end of the enclosing
                // layer; no framing is needed.  Note: the cookie
                // keeps the enclosing layer's level, so the packet's
                // body is drained when the enclosing layer is.
                reader,
        })
    }

    /// Skips over the body of a packet that is not parsed.
    fn skip_body(reader: BoxedReader<'a>, header: &Header, level: isize)
                 -> Result<BoxedReader<'a>> {
        let mut body = Self::frame_body(reader, header, level)?;
        if matches!(header.length(), BodyLength::Indeterminate) {
            body.drop_eof()?;
            return Ok(body);
        }

        body.drop_eof()?;
        Ok(body.into_inner().expect("framing layers are recoverable"))
    }

    /// Returns the current packet's header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Returns the packet's recursion depth.
    ///
    /// A top-level packet is at depth 0; a packet directly contained
    /// in a top-level container is at depth 1; etc.
    pub fn recursion_depth(&self) -> isize {
        self.recursion_depth
    }

    /// Returns whether the packet's contents have been processed.
    ///
    /// The contents of an encrypted container are unprocessed until
    /// [`PacketParser::decrypt`] succeeds.
    ///
    ///   [`PacketParser::decrypt`]: #method.decrypt
    pub fn processed(&self) -> bool {
        self.processed
    }

    /// Finishes parsing the current packet and starts parsing the
    /// next one.
    ///
    /// This function does not automatically recurse into a container;
    /// instead the container's unread content is skipped.
    pub fn next(self) -> Result<(Packet, PacketParserResult<'a>)> {
        let depth = self.recursion_depth;

        // Drop any layers pushed for the current packet's body.
        let mut reader = self.reader;

        // An indeterminate length body shares the enclosing layer and
        // extends to its end; consume it here.
        if matches!(self.header.length(), BodyLength::Indeterminate) {
            reader.drop_eof()?;
        }

        while reader.cookie_ref().level > depth {
            reader.drop_eof()?;
            reader = match reader.into_inner() {
                Some(r) => r,
                None => {
                    // An unrecoverable layer, e.g. a decryptor.  The
                    // enclosing stream cannot be resumed.
                    return Ok((self.packet, PacketParserResult::EOF(
                        PacketParserEOF {
                            last_recursion_depth: Some(depth),
                        })));
                }
            };
        }

        let level = reader.cookie_ref().level;
        let ppr = Self::parse_at(reader, level)?;
        Ok((self.packet, match ppr {
            PacketParserResult::EOF(_) =>
                PacketParserResult::EOF(PacketParserEOF {
                    last_recursion_depth: Some(depth),
                }),
            some => some,
        }))
    }

    /// Finishes parsing the current packet and starts parsing the
    /// next one, recursing if possible.
    ///
    /// This method is like the [`next()`] method, except that if the
    /// current packet is a container (and we understand the
    /// container), recurse into the container, and return a
    /// `PacketParser` for its first child.  Otherwise, return the
    /// next packet in the packet stream.
    ///
    ///   [`next()`]: #method.next
    pub fn recurse(self) -> Result<(Packet, PacketParserResult<'a>)> {
        let depth = self.recursion_depth;

        if depth + 1 >= DEFAULT_MAX_RECURSION_DEPTH {
            return self.next();
        }

        match &self.packet {
            Packet::CompressedData(cd) => {
                let algo = cd.algo();
                let packet = self.packet;
                let reader =
                    Self::decompress(algo, self.reader, depth + 1)?;
                let ppr = Self::parse_at(reader, depth + 1)?;
                Ok((packet, ppr))
            }

            Packet::SEIP(_) | Packet::AED(_) | Packet::SED(_)
                if self.processed =>
            {
                // decrypt() has installed the plaintext reader at
                // level depth + 1.
                let packet = self.packet;
                let ppr = Self::parse_at(self.reader, depth + 1)?;
                Ok((packet, ppr))
            }

            _ => self.next(),
        }
    }

    /// Pushes a decompression layer.
    fn decompress(algo: CompressionAlgorithm, reader: BoxedReader<'a>,
                  level: isize)
                  -> Result<BoxedReader<'a>> {
        match algo {
            CompressionAlgorithm::Uncompressed => {
                // Adjust the level: the contained packets belong to
                // the container.
                let mut reader = reader;
                reader.cookie_mut().level = level;
                Ok(reader)
            }
            #[cfg(feature = "compression-deflate")]
            CompressionAlgorithm::Zip =>
                Ok(Box::new(buffered_reader::Deflate::with_cookie(
                    reader, Cookie::new(level)))),
            #[cfg(feature = "compression-deflate")]
            CompressionAlgorithm::Zlib =>
                Ok(Box::new(buffered_reader::Zlib::with_cookie(
                    reader, Cookie::new(level)))),
            #[cfg(feature = "compression-bzip2")]
            CompressionAlgorithm::BZip2 =>
                Ok(Box::new(buffered_reader::Bzip::with_cookie(
                    reader, Cookie::new(level)))),
            a => Err(Error::UnsupportedCompressionAlgorithm(a).into()),
        }
    }

    /// Causes the PacketParser to buffer the packet's contents.
    ///
    /// The packet's contents can be retrieved using e.g.
    /// [`Container::body`].  In general, you should avoid buffering a
    /// packet's content and prefer streaming its content.
    ///
    ///   [`Container::body`]: ../packet/struct.Container.html#method.body
    pub fn buffer_unread_content(&mut self) -> Result<&[u8]> {
        let rest = self.reader.steal_eof()?;
        if let Some(c) = self.packet.container_mut() {
            if !rest.is_empty() {
                c.set_body(rest);
            }
            Ok(c.body())
        } else if rest.is_empty() {
            Ok(&[])
        } else {
            Err(Error::MalformedPacket(
                format!("Unexpected body data for {:?}", self.packet))
                .into())
        }
    }

    /// Finishes parsing the current packet.
    ///
    /// Any unread content is dropped.
    pub fn drop_unread_content(&mut self) -> Result<()> {
        self.reader.drop_eof()?;
        Ok(())
    }

    /// Tries to decrypt the current packet.
    ///
    /// On success, this function pushes one or more readers onto the
    /// `PacketParser`'s reader stack, and sets the packet parser's
    /// `processed` flag.
    ///
    /// If this function is called on a packet that does not contain
    /// encrypted data, or if the keys are wrong, an error is
    /// returned.
    pub fn decrypt(&mut self, algo: SymmetricAlgorithm, key: &SessionKey)
                   -> Result<()> {
        if self.processed {
            return Err(Error::InvalidOperation(
                "packet is not encrypted or already decrypted".into())
                       .into());
        }

        let bs = algo.block_size()?;
        let level = self.recursion_depth + 1;

        match self.packet {
            Packet::SEIP(_) => {
                // The SEIP packet starts with a random prefix whose
                // last two bytes are repeated, giving a quick check
                // for the session key.  There is no resynchronization
                // for MDC-protected packets.
                let mut cfb = Cfb::with_zero_iv(algo, key)?;
                let mut prefix =
                    self.reader.data_consume_hard(bs + 2)?[..bs + 2]
                    .to_vec();
                cfb.decrypt(&mut prefix);

                if prefix[bs - 2..bs] != prefix[bs..bs + 2] {
                    return Err(Error::InvalidSessionKey(
                        "quick check failed".into()).into());
                }

                // The MDC's SHA-1 covers the prefix, the plaintext,
                // and the MDC packet's own header.
                let mut hash = HashAlgorithm::SHA1.context()?;
                hash.update(&prefix);

                let reader = std::mem::replace(
                    &mut self.reader,
                    Box::new(buffered_reader::EOF::with_cookie(
                        Cookie::default())));
                let decryptor =
                    crypto::symmetric::Decryptor::from_parts(cfb, reader);
                let mdc = MdcReader::new(decryptor, hash);
                self.reader = Box::new(
                    buffered_reader::Generic::with_cookie(
                        mdc, None, Cookie::new(level)));
            }

            Packet::SED(_) => {
                // The legacy SED packet uses the OpenPGP CFB mode: it
                // resynchronizes the shift register after the random
                // prefix.
                let mut cfb = Cfb::with_zero_iv(algo, key)?;
                let ct_prefix =
                    self.reader.data_consume_hard(bs + 2)?[..bs + 2]
                    .to_vec();
                let mut prefix = ct_prefix.clone();
                cfb.decrypt(&mut prefix);

                if prefix[bs - 2..bs] != prefix[bs..bs + 2] {
                    return Err(Error::InvalidSessionKey(
                        "quick check failed".into()).into());
                }

                cfb.resync(&ct_prefix[2..]);

                let reader = std::mem::replace(
                    &mut self.reader,
                    Box::new(buffered_reader::EOF::with_cookie(
                        Cookie::default())));
                let decryptor =
                    crypto::symmetric::Decryptor::from_parts(cfb, reader);
                self.reader = Box::new(
                    buffered_reader::Generic::with_cookie(
                        decryptor, None, Cookie::new(level)));
            }

            Packet::AED(AED::V1(ref aed)) => {
                let schedule = crypto::aead::Schedule::new(
                    aed.symmetric_algo(), aed.aead(), key.clone(),
                    aed.iv(),
                    &[
                        0xc0 | u8::from(Tag::AED),
                        1, // Version.
                        aed.symmetric_algo().into(),
                        aed.aead().into(),
                        aed.chunk_size_octet(),
                    ])?;

                let reader = std::mem::replace(
                    &mut self.reader,
                    Box::new(buffered_reader::EOF::with_cookie(
                        Cookie::default())));
                let decryptor = crypto::aead::Decryptor::new(
                    schedule, aed.chunk_size() as usize, reader)?;
                self.reader = Box::new(
                    buffered_reader::Generic::with_cookie(
                        decryptor, None, Cookie::new(level)));
            }

            _ => return Err(Error::InvalidOperation(
                format!("Can't decrypt {:?} packets", self.packet.tag()))
                            .into()),
        }

        self.processed = true;
        Ok(())
    }
}

impl<'a> io::Read for PacketParser<'a> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

/// An `io::Read`er that computes the running MDC hash and withholds
/// the trailing MDC packet, validating it at the end of the stream.
///
/// The last 22 bytes of the plaintext are the MDC packet: the fixed
/// header `0xD3 0x14` and a 20 byte SHA-1 over everything preceding
/// the hash itself.  Integrity failure is reported as an
/// `io::ErrorKind::InvalidData` error wrapping
/// [`Error::ManipulatedMessage`].
///
///   [`Error::ManipulatedMessage`]: ../enum.Error.html
struct MdcReader<R: io::Read> {
    inner: R,
    hash: crate::crypto::hash::Context,
    /// Lookahead holding the candidate MDC trailer.
    pending: Vec<u8>,
    eof: bool,
    checked: bool,
}

const MDC_TRAILER_LEN: usize = 2 + 20;

impl<R: io::Read> MdcReader<R> {
    fn new(inner: R, hash: crate::crypto::hash::Context) -> Self {
        MdcReader {
            inner,
            hash,
            pending: Vec::with_capacity(2 * MDC_TRAILER_LEN),
            eof: false,
            checked: false,
        }
    }

    fn check_trailer(&mut self) -> io::Result<()> {
        self.checked = true;

        let manipulated = || io::Error::new(
            io::ErrorKind::InvalidData,
            anyhow::Error::from(Error::ManipulatedMessage));

        if self.pending.len() != MDC_TRAILER_LEN
            || self.pending[0] != 0xd3 || self.pending[1] != 0x14
        {
            return Err(manipulated());
        }

        self.hash.update(&self.pending[..2]);
        let mut digest = [0u8; 20];
        self.hash.digest(&mut digest);

        if crate::crypto::mem::secure_cmp(&digest, &self.pending[2..])
            != std::cmp::Ordering::Equal
        {
            return Err(manipulated());
        }

        Ok(())
    }
}

impl<R: io::Read> io::Read for MdcReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        // Keep at least MDC_TRAILER_LEN bytes in the lookahead so
        // that the trailer is never handed out as plaintext.
        while !self.eof && self.pending.len() <= MDC_TRAILER_LEN + buf.len()
        {
            let mut tmp = [0u8; 4096];
            let n = self.inner.read(&mut tmp)?;
            if n == 0 {
                self.eof = true;
            } else {
                self.pending.extend_from_slice(&tmp[..n]);
            }
        }

        if self.pending.len() <= MDC_TRAILER_LEN {
            if self.eof && !self.checked {
                self.check_trailer()?;
            }
            return Ok(0);
        }

        let n = std::cmp::min(buf.len(),
                              self.pending.len() - MDC_TRAILER_LEN);
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.hash.update(&self.pending[..n]);
        crate::vec_drain_prefix(&mut self.pending, n);
        Ok(n)
    }
}

impl<'a> Parse<'a, Packet> for Packet {
    /// Parses exactly one packet from the input.
    fn from_reader<R: 'a + io::Read + Send + Sync>(reader: R)
                                                   -> Result<Packet> {
        let ppr = PacketParser::from_reader(reader)?;

        let (p, ppr) = match ppr {
            PacketParserResult::Some(mut pp) => {
                pp.buffer_unread_content()?;
                pp.next()?
            }
            PacketParserResult::EOF(_) =>
                return Err(Error::MalformedPacket(
                    "Unexpected EOF".into()).into()),
        };

        match ppr {
            PacketParserResult::EOF(_) => Ok(p),
            PacketParserResult::Some(_) =>
                Err(Error::MalformedPacket(
                    "Excess data after packet".into()).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialize::MarshalInto;

    #[test]
    fn parse_simple_literal() {
        // A new-format literal packet, one-octet length.
        let mut buf = vec![
            0xcb, // CTB: new format, literal.
            0x12, // Length: 18.
            b'b', // Format: binary.
            0x00, // No filename.
            0x00, 0x00, 0x00, 0x00, // Date.
        ];
        buf.extend_from_slice(b"hello mundo!");

        let pp = match PacketParser::from_bytes(&buf).unwrap() {
            PacketParserResult::Some(pp) => pp,
            _ => panic!("expected a packet"),
        };
        assert_eq!(pp.packet.tag(), Tag::Literal);

        let mut pp = pp;
        assert_eq!(pp.buffer_unread_content().unwrap(), b"hello mundo!");
        let (packet, ppr) = pp.next().unwrap();
        assert!(ppr.is_eof());
        match packet {
            Packet::Literal(l) => {
                assert_eq!(l.body(), b"hello mundo!");
                assert_eq!(l.format(), DataFormat::Binary);
            }
            p => panic!("unexpected packet: {:?}", p),
        }
    }

    #[test]
    fn parse_marker_roundtrip() {
        let marker = Packet::from(Marker::default());
        let buf = marker.to_vec().unwrap();
        let p = Packet::from_bytes(&buf).unwrap();
        assert_eq!(marker, p);
    }

    #[test]
    fn unknown_critical_packet_is_an_error() {
        // Tag 39 is unknown and critical.
        let buf = [0xc0 | 39, 0x00];
        assert!(PacketParser::from_bytes(&buf).is_err());
    }

    #[test]
    fn unknown_noncritical_packet_is_skipped() {
        // Tag 41 is unknown but not critical; it is followed by a
        // marker packet.
        let mut buf = vec![0xc0 | 41, 0x03, 1, 2, 3];
        buf.extend_from_slice(&[0xca, 0x03, 0x50, 0x47, 0x50]);

        let ppr = PacketParser::from_bytes(&buf).unwrap();
        match ppr {
            PacketParserResult::Some(pp) => {
                assert_eq!(pp.packet.tag(), Tag::Marker);
                let (_, ppr) = pp.next().unwrap();
                assert!(ppr.is_eof());
            }
            _ => panic!("expected the marker packet"),
        }
    }

    #[test]
    fn truncated_packet_is_an_error() {
        // Length says 10, but only 5 bytes follow.
        let buf = [0xcb, 0x0a, b'b', 0x00, 0x00, 0x00, 0x00];
        let ppr = PacketParser::from_bytes(&buf);
        // The literal header parses, but buffering the content fails.
        match ppr {
            Ok(PacketParserResult::Some(mut pp)) => {
                assert!(pp.buffer_unread_content().is_err()
                        || pp.next().is_err());
            }
            Ok(_) => panic!("expected a packet"),
            Err(_) => (),
        }
    }
}
