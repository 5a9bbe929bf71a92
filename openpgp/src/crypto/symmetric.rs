//! Symmetric block ciphers, and OpenPGP's CFB mode.
//!
//! OpenPGP uses the ciphers in cipher feedback mode.  Two flavors
//! exist: plain CFB with a zero IV, used by the SEIP packet and for
//! protecting secret key material, and the OpenPGP variant with a
//! random prefix and a mid-stream resynchronization, used by the
//! legacy SED packet ([Section 13.9 of RFC 4880]).
//!
//!   [Section 13.9 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-13.9

use std::io;
use std::io::Write;

use cipher::{BlockEncrypt, KeyInit};
use generic_array::GenericArray;

use crate::{Error, Result};
use crate::types::SymmetricAlgorithm;

impl SymmetricAlgorithm {
    /// Returns whether this algorithm is supported by the
    /// cryptographic backend.
    pub fn is_supported(&self) -> bool {
        use self::SymmetricAlgorithm::*;
        matches!(self,
                 TripleDES | CAST5 | Blowfish | AES128 | AES192 | AES256
                 | Twofish)
    }

    /// Length of a key for this algorithm in bytes.
    ///
    /// Fails if the algorithm isn't known.
    pub fn key_size(self) -> Result<usize> {
        use self::SymmetricAlgorithm::*;
        match self {
            // RFC4880, Section 9.2: TDES is made of three 56 bit keys,
            // encoded with parity bits, so 24 bytes on the wire.
            TripleDES => Ok(24),
            CAST5 => Ok(16),
            Blowfish => Ok(16),
            AES128 => Ok(16),
            AES192 => Ok(24),
            AES256 => Ok(32),
            Twofish => Ok(32),
            _ => Err(Error::UnsupportedSymmetricAlgorithm(self).into()),
        }
    }

    /// Length of a block for this algorithm in bytes.
    ///
    /// Fails if the algorithm isn't known.
    pub fn block_size(self) -> Result<usize> {
        use self::SymmetricAlgorithm::*;
        match self {
            TripleDES => Ok(8),
            CAST5 => Ok(8),
            Blowfish => Ok(8),
            AES128 => Ok(16),
            AES192 => Ok(16),
            AES256 => Ok(16),
            Twofish => Ok(16),
            _ => Err(Error::UnsupportedSymmetricAlgorithm(self).into()),
        }
    }

    /// Creates a block cipher instance keyed with `key`.
    pub(crate) fn make_cipher(self, key: &[u8])
                              -> Result<Box<dyn BlockCipher>> {
        use self::SymmetricAlgorithm::*;

        fn make<C>(key: &[u8]) -> Result<Box<dyn BlockCipher>>
        where
            C: BlockEncrypt + KeyInit + Send + Sync + 'static,
        {
            Ok(Box::new(EcbEncryptor(C::new_from_slice(key).map_err(
                |_| Error::InvalidKey("invalid key length".into()))?)))
        }

        match self {
            TripleDES => make::<des::TdesEde3>(key),
            CAST5 => make::<cast5::Cast5>(key),
            Blowfish => make::<blowfish::Blowfish>(key),
            AES128 => make::<aes::Aes128>(key),
            AES192 => make::<aes::Aes192>(key),
            AES256 => make::<aes::Aes256>(key),
            Twofish => make::<twofish::Twofish>(key),
            _ => Err(Error::UnsupportedSymmetricAlgorithm(self).into()),
        }
    }
}

/// The block encryption abstraction the CFB mode is built on.
///
/// CFB only ever uses the forward direction of the block cipher, for
/// encryption and decryption alike.
pub(crate) trait BlockCipher: Send + Sync {
    /// The cipher's block size in bytes.
    fn block_size(&self) -> usize;

    /// Encrypts one block in place.
    fn encrypt_block(&self, block: &mut [u8]);
}

struct EcbEncryptor<C>(C);

impl<C> BlockCipher for EcbEncryptor<C>
where
    C: BlockEncrypt + Send + Sync,
{
    fn block_size(&self) -> usize {
        C::block_size()
    }

    fn encrypt_block(&self, block: &mut [u8]) {
        debug_assert_eq!(block.len(), C::block_size());
        self.0.encrypt_block(GenericArray::from_mut_slice(block));
    }
}

/// CFB mode keystream state.
///
/// The register is refilled lazily: whenever the keystream is
/// exhausted, the last block-size bytes of ciphertext (or the IV,
/// initially) are run through the block cipher.  Byte-oriented
/// operation lets callers feed data of arbitrary lengths.
pub(crate) struct Cfb {
    cipher: Box<dyn BlockCipher>,
    /// Input to the next keystream computation.  Progressively
    /// overwritten with ciphertext as it is produced or consumed.
    register: Vec<u8>,
    /// The current keystream, E(register).
    keystream: Vec<u8>,
    /// Number of keystream bytes already used.
    pos: usize,
}
assert_send_and_sync!(Cfb);

impl Cfb {
    /// Creates a CFB context with the given IV.
    pub fn new(algo: SymmetricAlgorithm, key: &[u8], iv: &[u8])
               -> Result<Self> {
        let cipher = algo.make_cipher(key)?;
        let bs = cipher.block_size();
        if iv.len() != bs {
            return Err(Error::InvalidArgument(
                format!("IV length {} does not match block size {}",
                        iv.len(), bs)).into());
        }

        Ok(Cfb {
            cipher,
            register: iv.to_vec(),
            keystream: vec![0; bs],
            // Forces a refill on first use.
            pos: bs,
        })
    }

    /// Creates a CFB context with a zero IV, as used by the SEIP
    /// packet.
    pub fn with_zero_iv(algo: SymmetricAlgorithm, key: &[u8])
                        -> Result<Self> {
        let bs = algo.block_size()?;
        Self::new(algo, key, &vec![0; bs])
    }

    fn refill(&mut self) {
        self.keystream.copy_from_slice(&self.register);
        self.cipher.encrypt_block(&mut self.keystream);
        self.pos = 0;
    }

    /// Encrypts the given data in place.
    pub fn encrypt(&mut self, data: &mut [u8]) {
        for b in data {
            if self.pos == self.keystream.len() {
                self.refill();
            }

            *b ^= self.keystream[self.pos];
            self.register[self.pos] = *b;
            self.pos += 1;
        }
    }

    /// Decrypts the given data in place.
    pub fn decrypt(&mut self, data: &mut [u8]) {
        for b in data {
            if self.pos == self.keystream.len() {
                self.refill();
            }

            let c = *b;
            *b ^= self.keystream[self.pos];
            self.register[self.pos] = c;
            self.pos += 1;
        }
    }

    /// Resynchronizes the shift register to the given ciphertext
    /// block.
    ///
    /// This implements the "resync step" of the OpenPGP CFB mode: the
    /// register is reloaded with the most recent block-size bytes of
    /// ciphertext, realigning the keystream with the block boundary.
    pub fn resync(&mut self, last_ciphertext: &[u8]) {
        debug_assert_eq!(last_ciphertext.len(), self.register.len());
        self.register.copy_from_slice(last_ciphertext);
        self.pos = self.keystream.len();
    }

    /// The cipher's block size in bytes.
    pub fn block_size(&self) -> usize {
        self.keystream.len()
    }
}

/// One-shot plain-CFB encryption, as used for secret key material.
pub(crate) fn encrypt_cfb(algo: SymmetricAlgorithm, key: &[u8], iv: &[u8],
                          data: &mut [u8]) -> Result<()> {
    let mut cfb = Cfb::new(algo, key, iv)?;
    cfb.encrypt(data);
    Ok(())
}

/// One-shot plain-CFB decryption, as used for secret key material.
pub(crate) fn decrypt_cfb(algo: SymmetricAlgorithm, key: &[u8], iv: &[u8],
                          data: &mut [u8]) -> Result<()> {
    let mut cfb = Cfb::new(algo, key, iv)?;
    cfb.decrypt(data);
    Ok(())
}

/// A `Write`r for symmetrically encrypting data in plain CFB mode.
pub struct Encryptor<W: io::Write> {
    cfb: Cfb,
    inner: Option<W>,
    buffer: Vec<u8>,
}
assert_send_and_sync!(Encryptor<W> where W: io::Write);

impl<W: io::Write> Encryptor<W> {
    /// Instantiates a new encryptor with a zero IV.
    pub fn new(algo: SymmetricAlgorithm, key: &[u8], sink: W)
               -> Result<Self> {
        Ok(Encryptor {
            cfb: Cfb::with_zero_iv(algo, key)?,
            inner: Some(sink),
            buffer: Vec::new(),
        })
    }

    /// Finishes encrypting data and returns the sink.
    pub fn finish(&mut self) -> Result<W> {
        self.inner.take().ok_or_else(|| {
            io::Error::new(io::ErrorKind::BrokenPipe,
                           "Inner writer was taken").into()
        })
    }
}

impl<W: io::Write> io::Write for Encryptor<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let inner = self.inner.as_mut().ok_or_else(|| {
            io::Error::new(io::ErrorKind::BrokenPipe,
                           "Inner writer was taken")
        })?;

        self.buffer.clear();
        self.buffer.extend_from_slice(buf);
        self.cfb.encrypt(&mut self.buffer);
        inner.write_all(&self.buffer)?;
        // Do not keep ciphertext around longer than necessary.
        crate::vec_truncate(&mut self.buffer, 0);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(inner) = self.inner.as_mut() {
            inner.flush()
        } else {
            Ok(())
        }
    }
}

impl<W: io::Write> Drop for Encryptor<W> {
    fn drop(&mut self) {
        // Unlike other writers, we do not need to flush a partial
        // block: CFB is byte-oriented.
        let _ = self.flush();
    }
}

/// A `Read`er for symmetrically decrypting data in plain CFB mode.
pub struct Decryptor<R: io::Read> {
    cfb: Cfb,
    source: R,
}
assert_send_and_sync!(Decryptor<R> where R: io::Read);

impl<R: io::Read> Decryptor<R> {
    /// Instantiates a new decryptor with a zero IV.
    pub fn new(algo: SymmetricAlgorithm, key: &[u8], source: R)
               -> Result<Self> {
        Ok(Decryptor {
            cfb: Cfb::with_zero_iv(algo, key)?,
            source,
        })
    }

    /// Instantiates a decryptor continuing with the given CFB state.
    ///
    /// This is used after the random prefix of an encrypted data
    /// packet has been processed out-of-band, possibly including a
    /// resynchronization.
    pub(crate) fn from_parts(cfb: Cfb, source: R) -> Self {
        Decryptor {
            cfb,
            source,
        }
    }
}

impl<R: io::Read> io::Read for Decryptor<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.source.read(buf)?;
        self.cfb.decrypt(&mut buf[..n]);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SymmetricAlgorithm::*;

    #[test]
    fn algorithm_parameters() {
        assert_eq!(AES128.key_size().unwrap(), 16);
        assert_eq!(AES256.key_size().unwrap(), 32);
        assert_eq!(AES256.block_size().unwrap(), 16);
        assert_eq!(TripleDES.block_size().unwrap(), 8);
        assert!(Unencrypted.key_size().is_err());
        assert!(IDEA.key_size().is_err());
    }

    #[test]
    fn cfb_roundtrip() {
        for algo in [TripleDES, CAST5, Blowfish, AES128, AES192, AES256,
                     Twofish] {
            let key = vec![0x42; algo.key_size().unwrap()];
            let iv = vec![0x23; algo.block_size().unwrap()];

            let mut data = (0u8..=255).collect::<Vec<_>>();
            encrypt_cfb(algo, &key, &iv, &mut data).unwrap();
            assert!(&data[..] != &(0u8..=255).collect::<Vec<_>>()[..]);
            decrypt_cfb(algo, &key, &iv, &mut data).unwrap();
            assert_eq!(&data[..], &(0u8..=255).collect::<Vec<_>>()[..]);
        }
    }

    #[test]
    fn cfb_is_byte_oriented() {
        // Split the stream at an odd boundary; the result must match
        // the one-shot operation.
        let key = vec![7u8; 16];
        let iv = vec![1u8; 16];

        let mut oneshot = vec![0xaau8; 100];
        encrypt_cfb(AES128, &key, &iv, &mut oneshot).unwrap();

        let mut split = vec![0xaau8; 100];
        let mut cfb = Cfb::new(AES128, &key, &iv).unwrap();
        let (a, b) = split.split_at_mut(33);
        cfb.encrypt(a);
        cfb.encrypt(b);

        assert_eq!(oneshot, split);
    }

    #[test]
    fn aes_cfb_nist_vector() {
        // NIST SP 800-38A, CFB128-AES128, first block.
        let key = crate::fmt::hex::decode(
            "2b7e151628aed2a6abf7158809cf4f3c").unwrap();
        let iv = crate::fmt::hex::decode(
            "000102030405060708090a0b0c0d0e0f").unwrap();
        let mut data = crate::fmt::hex::decode(
            "6bc1bee22e409f96e93d7e117393172a").unwrap();

        encrypt_cfb(AES128, &key, &iv, &mut data).unwrap();
        assert_eq!(crate::fmt::hex::encode(&data),
                   "3B3FD92EB72DAD20333449F8E83CFB4A");
    }
}
