//! Packet-related types.
//!
//! OpenPGP data is organized into a sequence of packets ([Section 4
//! of RFC 4880]).  This module defines the packet framing (tags and
//! headers), one data type per packet type, and the containers that
//! nest packets inside other packets.
//!
//!   [Section 4 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-4

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::slice;

use crate::Packet;

mod tag;
pub use self::tag::Tag;
pub mod header;
pub use self::header::Header;

#[macro_use]
mod container;
pub(crate) use self::container::Container;

mod unknown;
pub use self::unknown::Unknown;
pub mod signature;
pub use self::signature::Signature4;
pub use self::signature::SignatureBuilder;
mod one_pass_sig;
pub use self::one_pass_sig::OnePassSig3;
pub mod key;
mod marker;
pub use self::marker::Marker;
mod trust;
pub use self::trust::Trust;
mod userid;
pub use self::userid::UserID;
mod user_attribute;
pub use self::user_attribute::UserAttribute;
mod literal;
pub use self::literal::Literal;
mod compressed_data;
pub use self::compressed_data::CompressedData;
pub mod sed;
pub use self::sed::SED;
pub mod seip;
pub use self::seip::SEIP1;
pub mod skesk;
pub use self::skesk::{SKESK4, SKESK5};
mod pkesk;
pub use self::pkesk::PKESK3;
mod mdc;
pub use self::mdc::MDC;
pub mod aed;
pub use self::aed::AED1;

pub mod prelude;

/// Fields used by multiple packet types.
#[derive(Default, Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct Common {
    // In the future, this structure will hold the parsed CTB, packet
    // length, and lengths of chunks of partial body encoded packets.
    // This will allow for bit-perfect roundtripping of parsed
    // packets.  Since we consider this to be internal state, we keep
    // this struct private.
}
assert_send_and_sync!(Common);

/// An iterator over the *contents* of a packet in depth-first order.
///
/// Given a packet, an `Iter` iterates over the packet's descendants,
/// but not the packet itself.
pub struct Iter<'a> {
    // An iterator over the current message's children.
    pub(crate) children: slice::Iter<'a, Packet>,
    // The current child (i.e., the last value returned by
    // children.next()).
    pub(crate) child: Option<&'a Packet>,
    // The iterator over the current child's children.
    pub(crate) grandchildren: Option<Box<Iter<'a>>>,

    // The depth of the last returned packet.  This is used by the
    // `paths` iter.
    pub(crate) depth: usize,
}

impl<'a> Default for Iter<'a> {
    fn default() -> Self {
        Iter {
            children: [].iter(),
            child: None,
            grandchildren: None,
            depth: 0,
        }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Packet;

    fn next(&mut self) -> Option<Self::Item> {
        // If we don't have a grandchild iterator (self.grandchildren
        // is None), then we are just starting, and we need to get the
        // next child.
        if let Some(grandchildren) = self.grandchildren.as_mut() {
            let grandchild = grandchildren.next();
            // If the grandchild iterator is exhausted (grandchild is
            // None), then we need the next child.
            if grandchild.is_some() {
                self.depth = grandchildren.depth + 1;
                return grandchild;
            }
        }

        // Get the next child and the iterator for its children.
        self.child = self.children.next();
        if let Some(child) = self.child {
            self.grandchildren = Some(Box::new(child.descendants()));
        }

        // First return the child itself.  Subsequent calls will
        // return its grandchildren.
        self.depth = 0;
        self.child
    }
}

/// Holds a signature packet.
///
/// Signature packets are used to hold all kinds of signatures
/// including certifications, and signatures over documents.  See
/// [Section 5.2 of RFC 4880] for details.
///
///   [Section 5.2 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.2
///
/// Note: several signature subpackets are not covered by the
/// signature.  See the [`subpacket`] module for details.
///
///   [`subpacket`]: signature/subpacket/index.html
#[non_exhaustive]
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Signature {
    /// Signature packet version 4.
    V4(Signature4),
}
assert_send_and_sync!(Signature);

impl Signature {
    /// Gets the version of this signature packet.
    pub fn version(&self) -> u8 {
        match self {
            Signature::V4(_) => 4,
        }
    }
}

impl From<Signature> for Packet {
    fn from(s: Signature) -> Self {
        Packet::Signature(s)
    }
}

// Trivial forwarder for single-variant enum.
impl Deref for Signature {
    type Target = Signature4;

    fn deref(&self) -> &Self::Target {
        match self {
            Signature::V4(sig) => sig,
        }
    }
}

// Trivial forwarder for single-variant enum.
impl DerefMut for Signature {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self {
            Signature::V4(sig) => sig,
        }
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Signature::V4(sig) => sig.fmt(f),
        }
    }
}

/// Holds a one-pass signature packet.
///
/// See [Section 5.4 of RFC 4880] for details.
///
///   [Section 5.4 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.4
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum OnePassSig {
    /// OnePassSig packet version 3.
    V3(OnePassSig3),
}
assert_send_and_sync!(OnePassSig);

impl OnePassSig {
    /// Gets the version of this one-pass signature packet.
    pub fn version(&self) -> u8 {
        match self {
            OnePassSig::V3(_) => 3,
        }
    }
}

impl From<OnePassSig> for Packet {
    fn from(s: OnePassSig) -> Self {
        Packet::OnePassSig(s)
    }
}

// Trivial forwarder for single-variant enum.
impl Deref for OnePassSig {
    type Target = OnePassSig3;

    fn deref(&self) -> &Self::Target {
        match self {
            OnePassSig::V3(ops) => ops,
        }
    }
}

// Trivial forwarder for single-variant enum.
impl DerefMut for OnePassSig {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self {
            OnePassSig::V3(ops) => ops,
        }
    }
}

/// Holds an asymmetric key packet.
///
/// The different `Key` packets (`PublicKey`, `PublicSubkey`,
/// `SecretKey`, and `SecretSubkey`) all use the same data structure,
/// parameterized on two marker types: the *parts* (whether secret key
/// material may be present), and the *role* (whether the key is a
/// primary key or a subkey).  See [`key`] for details.
///
///   [`key`]: key/index.html
#[non_exhaustive]
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Key<P: key::KeyParts, R: key::KeyRole> {
    /// Key packet version 4.
    V4(key::Key4<P, R>),
}
assert_send_and_sync!(Key<P, R> where P: key::KeyParts, R: key::KeyRole);

impl<P: key::KeyParts, R: key::KeyRole> fmt::Debug for Key<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Key::V4(k) => k.fmt(f),
        }
    }
}

impl<P: key::KeyParts, R: key::KeyRole> fmt::Display for Key<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Key::V4(k) => k.fmt(f),
        }
    }
}

impl<P: key::KeyParts, R: key::KeyRole> Key<P, R> {
    /// Gets the version of this key packet.
    pub fn version(&self) -> u8 {
        match self {
            Key::V4(_) => 4,
        }
    }
}

// Trivial forwarder for single-variant enum.
impl<P: key::KeyParts, R: key::KeyRole> Deref for Key<P, R> {
    type Target = key::Key4<P, R>;

    fn deref(&self) -> &Self::Target {
        match self {
            Key::V4(k) => k,
        }
    }
}

// Trivial forwarder for single-variant enum.
impl<P: key::KeyParts, R: key::KeyRole> DerefMut for Key<P, R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self {
            Key::V4(k) => k,
        }
    }
}

impl From<key::PublicKey> for Packet {
    fn from(k: key::PublicKey) -> Self {
        Packet::PublicKey(k)
    }
}

impl From<key::PublicSubkey> for Packet {
    fn from(k: key::PublicSubkey) -> Self {
        Packet::PublicSubkey(k)
    }
}

impl From<key::SecretKey> for Packet {
    fn from(k: key::SecretKey) -> Self {
        Packet::SecretKey(k)
    }
}

impl From<key::SecretSubkey> for Packet {
    fn from(k: key::SecretSubkey) -> Self {
        Packet::SecretSubkey(k)
    }
}

/// Holds a SKESK packet.
///
/// A SKESK packet holds a symmetrically encrypted session key.  The
/// session key is needed to decrypt the actual ciphertext.  See
/// [Section 5.3 of RFC 4880] for details.
///
///   [Section 5.3 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.3
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SKESK {
    /// SKESK packet version 4.
    V4(SKESK4),
    /// SKESK packet version 5.
    ///
    /// This feature is [experimental](../index.html#experimental-features).
    V5(SKESK5),
}
assert_send_and_sync!(SKESK);

impl SKESK {
    /// Gets the version of this SKESK packet.
    pub fn version(&self) -> u8 {
        match self {
            SKESK::V4(_) => 4,
            SKESK::V5(_) => 5,
        }
    }
}

impl From<SKESK> for Packet {
    fn from(p: SKESK) -> Self {
        Packet::SKESK(p)
    }
}

/// Holds a PKESK packet.
///
/// A PKESK packet holds an asymmetrically encrypted session key.  The
/// session key is needed to decrypt the actual ciphertext.  See
/// [Section 5.1 of RFC 4880] for details.
///
///   [Section 5.1 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.1
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PKESK {
    /// PKESK packet version 3.
    V3(PKESK3),
}
assert_send_and_sync!(PKESK);

impl PKESK {
    /// Gets the version of the PKESK packet.
    pub fn version(&self) -> u8 {
        match self {
            PKESK::V3(_) => 3,
        }
    }
}

impl From<PKESK> for Packet {
    fn from(p: PKESK) -> Self {
        Packet::PKESK(p)
    }
}

// Trivial forwarder for single-variant enum.
impl Deref for PKESK {
    type Target = PKESK3;

    fn deref(&self) -> &Self::Target {
        match self {
            PKESK::V3(p) => p,
        }
    }
}

// Trivial forwarder for single-variant enum.
impl DerefMut for PKESK {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self {
            PKESK::V3(p) => p,
        }
    }
}

/// Holds an encrypted data packet.
///
/// An encrypted data packet is a container.  See [Section 5.13 of RFC
/// 4880] for details.
///
///   [Section 5.13 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.13
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SEIP {
    /// SEIP packet version 1.
    V1(SEIP1),
}
assert_send_and_sync!(SEIP);

impl SEIP {
    /// Gets the version of this SEIP packet.
    pub fn version(&self) -> u8 {
        match self {
            SEIP::V1(_) => 1,
        }
    }
}

impl From<SEIP> for Packet {
    fn from(p: SEIP) -> Self {
        Packet::SEIP(p)
    }
}

// Trivial forwarder for single-variant enum.
impl Deref for SEIP {
    type Target = SEIP1;

    fn deref(&self) -> &Self::Target {
        match self {
            SEIP::V1(p) => p,
        }
    }
}

// Trivial forwarder for single-variant enum.
impl DerefMut for SEIP {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self {
            SEIP::V1(p) => p,
        }
    }
}

/// Holds an AEAD encrypted data packet.
///
/// An AEAD encrypted data packet is a container.  See [Section 5.16
/// of RFC 4880bis] for details.
///
/// [Section 5.16 of RFC 4880bis]: https://tools.ietf.org/html/draft-ietf-openpgp-rfc4880bis-08#section-5.16
///
/// This feature is [experimental](../index.html#experimental-features).
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AED {
    /// AED packet version 1.
    V1(AED1),
}
assert_send_and_sync!(AED);

impl AED {
    /// Gets the version of this AED packet.
    pub fn version(&self) -> u8 {
        match self {
            AED::V1(_) => 1,
        }
    }
}

impl From<AED> for Packet {
    fn from(p: AED) -> Self {
        Packet::AED(p)
    }
}

// Trivial forwarder for single-variant enum.
impl Deref for AED {
    type Target = AED1;

    fn deref(&self) -> &Self::Target {
        match self {
            AED::V1(p) => p,
        }
    }
}

// Trivial forwarder for single-variant enum.
impl DerefMut for AED {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self {
            AED::V1(p) => p,
        }
    }
}
