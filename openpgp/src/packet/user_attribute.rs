//! User Attribute packets.
//!
//! See [Section 5.12 of RFC 4880] for details.
//!
//!   [Section 5.12 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.12

use std::fmt;

use crate::packet;
use crate::Packet;

/// Holds a UserAttribute packet.
///
/// A user attribute is a generalization of the user ID: it consists
/// of self-delimiting subpackets, the only standardized one being an
/// image.  This type stores the raw byte sequence; the subpacket
/// structure is left to the caller.  See [Section 5.12 of RFC 4880]
/// for details.
///
///   [Section 5.12 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.12
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserAttribute {
    pub(crate) common: packet::Common,

    /// The user attribute.
    value: Vec<u8>,
}
assert_send_and_sync!(UserAttribute);

impl From<Vec<u8>> for UserAttribute {
    fn from(u: Vec<u8>) -> Self {
        UserAttribute {
            common: Default::default(),
            value: u,
        }
    }
}

impl fmt::Debug for UserAttribute {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("UserAttribute")
            .field("value", &format!("{} bytes", self.value.len()))
            .finish()
    }
}

impl UserAttribute {
    /// Gets the user attribute packet's raw, unparsed value.
    pub fn value(&self) -> &[u8] {
        self.value.as_slice()
    }
}

impl From<UserAttribute> for Packet {
    fn from(s: UserAttribute) -> Self {
        Packet::UserAttribute(s)
    }
}

#[cfg(test)]
impl quickcheck::Arbitrary for UserAttribute {
    fn arbitrary(g: &mut quickcheck::Gen) -> Self {
        use quickcheck::Arbitrary;
        Vec::<u8>::arbitrary(g).into()
    }
}
