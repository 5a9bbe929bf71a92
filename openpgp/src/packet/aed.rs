//! AEAD encrypted data packets.
//!
//! An AEAD encrypted data packet is a container.  See [Section 5.16
//! of RFC 4880bis] for details.
//!
//! [Section 5.16 of RFC 4880bis]: https://tools.ietf.org/html/draft-ietf-openpgp-rfc4880bis-08#section-5.16

use crate::types::{
    AEADAlgorithm,
    SymmetricAlgorithm,
};
use crate::packet;
use crate::Packet;
use crate::Error;
use crate::Result;

/// Holds an AEAD encrypted data packet.
///
/// An AEAD encrypted data packet is a container.  See [Section 5.16
/// of RFC 4880bis] for details.
///
/// [Section 5.16 of RFC 4880bis]: https://tools.ietf.org/html/draft-ietf-openpgp-rfc4880bis-08#section-5.16
///
/// This feature is [experimental](../../index.html#experimental-features).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AED1 {
    /// CTB packet header fields.
    pub(crate) common: packet::Common,
    /// Symmetric algorithm.
    sym_algo: SymmetricAlgorithm,
    /// AEAD algorithm.
    aead: AEADAlgorithm,
    /// Chunk size.
    chunk_size: u64,
    /// Initialization vector for the AEAD algorithm.
    iv: Box<[u8]>,

    /// This is a container packet.
    container: packet::Container,
}
assert_send_and_sync!(AED1);

impl_container_forwards!(AED1);

impl AED1 {
    /// Creates a new AED1 object.
    pub fn new(sym_algo: SymmetricAlgorithm,
               aead: AEADAlgorithm,
               chunk_size: u64,
               iv: Box<[u8]>) -> Result<Self> {
        Self::check_chunk_size(chunk_size)?;

        Ok(AED1 {
            common: Default::default(),
            sym_algo,
            aead,
            chunk_size,
            iv,
            container: Default::default(),
        })
    }

    fn check_chunk_size(chunk_size: u64) -> Result<()> {
        if chunk_size.count_ones() != 1 {
            return Err(Error::InvalidArgument(
                format!("chunk size is not a power of two: {}", chunk_size))
                .into());
        }

        if chunk_size < 64 {
            return Err(Error::InvalidArgument(
                format!("chunk size is too small: {}", chunk_size))
                .into());
        }

        Ok(())
    }

    /// Gets the symmetric algorithm.
    pub fn symmetric_algo(&self) -> SymmetricAlgorithm {
        self.sym_algo
    }

    /// Sets the symmetric algorithm.
    pub fn set_symmetric_algo(&mut self, sym_algo: SymmetricAlgorithm)
                              -> SymmetricAlgorithm {
        std::mem::replace(&mut self.sym_algo, sym_algo)
    }

    /// Gets the AEAD algorithm.
    pub fn aead(&self) -> AEADAlgorithm {
        self.aead
    }

    /// Sets the AEAD algorithm.
    pub fn set_aead(&mut self, aead: AEADAlgorithm) -> AEADAlgorithm {
        std::mem::replace(&mut self.aead, aead)
    }

    /// Gets the chunk size.
    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Sets the chunk size.
    pub fn set_chunk_size(&mut self, chunk_size: u64) -> Result<()> {
        Self::check_chunk_size(chunk_size)?;
        self.chunk_size = chunk_size;
        Ok(())
    }

    /// Gets the size of a chunk with digest.
    pub fn chunk_digest_size(&self) -> Result<u64> {
        Ok(self.chunk_size + self.aead.digest_size()? as u64)
    }

    /// Gets the initialization vector for the AEAD algorithm.
    pub fn iv(&self) -> &[u8] {
        &self.iv
    }

    /// Sets the initialization vector for the AEAD algorithm.
    pub fn set_iv(&mut self, iv: Box<[u8]>) -> Box<[u8]> {
        std::mem::replace(&mut self.iv, iv)
    }

    /// Returns the chunk size octet encoding this packet's chunk
    /// size.
    pub(crate) fn chunk_size_octet(&self) -> u8 {
        // chunk_size = 2^(c + 6), and the constructor enforces that
        // chunk_size is a power of two >= 64.
        (63 - self.chunk_size.leading_zeros() as u8) - 6
    }
}

impl From<AED1> for super::AED {
    fn from(p: AED1) -> Self {
        super::AED::V1(p)
    }
}

impl From<AED1> for Packet {
    fn from(p: AED1) -> Self {
        super::AED::from(p).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_size_encoding() {
        let aed = AED1::new(SymmetricAlgorithm::AES256,
                            AEADAlgorithm::EAX,
                            64, vec![0; 16].into_boxed_slice()).unwrap();
        assert_eq!(aed.chunk_size_octet(), 0);

        let aed = AED1::new(SymmetricAlgorithm::AES256,
                            AEADAlgorithm::EAX,
                            1 << 20, vec![0; 16].into_boxed_slice()).unwrap();
        assert_eq!(aed.chunk_size_octet(), 14);
    }

    #[test]
    fn chunk_size_validation() {
        assert!(AED1::new(SymmetricAlgorithm::AES256, AEADAlgorithm::EAX,
                          100, vec![0; 16].into_boxed_slice()).is_err());
        assert!(AED1::new(SymmetricAlgorithm::AES256, AEADAlgorithm::EAX,
                          32, vec![0; 16].into_boxed_slice()).is_err());
    }
}
