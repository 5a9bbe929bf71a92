//! Symmetrically encrypted data packets.
//!
//! The SED packet is the predecessor of the SEIP packet: the same
//! OpenPGP CFB encryption, but without the integrity protecting MDC
//! trailer.  It is vulnerable to ciphertext manipulation, and is
//! parsed for interoperability only; decryption requires the
//! [`allow_unauthenticated_messages`] escape hatch.
//!
//!   [`allow_unauthenticated_messages`]: ../../policy/struct.Config.html

use crate::packet;
use crate::Packet;

/// Holds a symmetrically encrypted data packet.
///
/// A symmetrically encrypted data packet is a container.  See
/// [Section 5.7 of RFC 4880] for details.
///
///   [Section 5.7 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.7
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SED {
    /// CTB packet header fields.
    pub(crate) common: packet::Common,

    /// This is a container packet.
    container: packet::Container,
}
assert_send_and_sync!(SED);

impl_container_forwards!(SED);

impl SED {
    /// Creates a new SED packet.
    pub fn new() -> Self {
        Self {
            common: Default::default(),
            container: Default::default(),
        }
    }
}

impl Default for SED {
    fn default() -> Self {
        Self::new()
    }
}

impl From<SED> for Packet {
    fn from(s: SED) -> Self {
        Packet::SED(s)
    }
}
