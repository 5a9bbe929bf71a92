use crate::packet;
use crate::Packet;

/// Holds a Marker packet.
///
/// See [Section 5.8 of RFC 4880] for details.
///
///   [Section 5.8 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.8
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Marker {
    /// CTB packet header fields.
    pub(crate) common: packet::Common,
}
assert_send_and_sync!(Marker);

impl Marker {
    /// The body of the marker packet.  This is always the same.
    pub(crate) const BODY: &'static [u8] = &[0x50, 0x47, 0x50];
}

impl Default for Marker {
    fn default() -> Self {
        Self {
            common: Default::default(),
        }
    }
}

impl From<Marker> for Packet {
    fn from(p: Marker) -> Self {
        Packet::Marker(p)
    }
}
