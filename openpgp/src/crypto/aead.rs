//! Authenticated encryption with additional data, and the chunked
//! AEAD stream used by the AEAD encrypted data packet.
//!
//! Plaintext is processed in chunks of `2^(c + 6)` bytes.  Every
//! chunk is sealed with its own nonce (the IV XORed with the chunk
//! index) and its own associated data (the packet prologue followed
//! by the chunk index).  A final tag over the empty string, whose
//! associated data additionally includes the total plaintext length,
//! authenticates the end of the stream.

use std::cmp;
use std::io;

use aes_gcm::AesGcm;
use aes_gcm::aead::AeadInPlace;
use cipher::KeyInit;
use eax::Eax;
use generic_array::GenericArray;
use generic_array::typenum::{U12, U15, Unsigned};
use ocb3::Ocb3;

use crate::{Error, Result};
use crate::types::{AEADAlgorithm, SymmetricAlgorithm};
use crate::crypto::SessionKey;

/// Maximum size of any Nonce used by an AEAD mode.
pub const MAX_NONCE_LEN: usize = 16;

/// Disables authentication checks.
///
/// This is DANGEROUS, and is only useful for debugging problems with
/// malformed AEAD-encrypted messages.
const DANGER_DISABLE_AUTHENTICATION: bool = false;

impl AEADAlgorithm {
    /// Returns whether this algorithm is supported.
    pub fn is_supported(&self) -> bool {
        use self::AEADAlgorithm::*;
        matches!(self, EAX | OCB | GCM)
    }

    /// Returns the digest size of the AEAD algorithm.
    pub fn digest_size(&self) -> Result<usize> {
        use self::AEADAlgorithm::*;
        match self {
            // All modes use a 128-bit tag.
            EAX | OCB | GCM => Ok(16),
            _ => Err(Error::UnsupportedAEADAlgorithm(*self).into()),
        }
    }

    /// Returns the initialization vector size of the AEAD algorithm.
    pub fn iv_size(&self) -> Result<usize> {
        use self::AEADAlgorithm::*;
        match self {
            EAX => Ok(16),
            OCB => Ok(15),
            GCM => Ok(12),
            _ => Err(Error::UnsupportedAEADAlgorithm(*self).into()),
        }
    }

    /// Creates an AEAD context for one chunk.
    pub(crate) fn context(&self, sym_algo: SymmetricAlgorithm, key: &[u8],
                          nonce: &[u8])
                          -> Result<Box<dyn Aead>> {
        use self::AEADAlgorithm::*;
        use self::SymmetricAlgorithm::*;

        match (self, sym_algo) {
            (EAX, AES128) =>
                Ok(Box::new(AeadCipher {
                    cipher: Eax::<aes::Aes128>::new_from_slice(key)
                        .map_err(invalid_key_length)?,
                    nonce: GenericArray::from_exact_iter(nonce.iter().copied())
                        .ok_or_else(|| bad_nonce(nonce.len()))?,
                })),
            (EAX, AES192) =>
                Ok(Box::new(AeadCipher {
                    cipher: Eax::<aes::Aes192>::new_from_slice(key)
                        .map_err(invalid_key_length)?,
                    nonce: GenericArray::from_exact_iter(nonce.iter().copied())
                        .ok_or_else(|| bad_nonce(nonce.len()))?,
                })),
            (EAX, AES256) =>
                Ok(Box::new(AeadCipher {
                    cipher: Eax::<aes::Aes256>::new_from_slice(key)
                        .map_err(invalid_key_length)?,
                    nonce: GenericArray::from_exact_iter(nonce.iter().copied())
                        .ok_or_else(|| bad_nonce(nonce.len()))?,
                })),
            (OCB, AES128) =>
                Ok(Box::new(AeadCipher {
                    cipher: Ocb3::<aes::Aes128, U15>::new_from_slice(key)
                        .map_err(invalid_key_length)?,
                    nonce: GenericArray::from_exact_iter(nonce.iter().copied())
                        .ok_or_else(|| bad_nonce(nonce.len()))?,
                })),
            (OCB, AES192) =>
                Ok(Box::new(AeadCipher {
                    cipher: Ocb3::<aes::Aes192, U15>::new_from_slice(key)
                        .map_err(invalid_key_length)?,
                    nonce: GenericArray::from_exact_iter(nonce.iter().copied())
                        .ok_or_else(|| bad_nonce(nonce.len()))?,
                })),
            (OCB, AES256) =>
                Ok(Box::new(AeadCipher {
                    cipher: Ocb3::<aes::Aes256, U15>::new_from_slice(key)
                        .map_err(invalid_key_length)?,
                    nonce: GenericArray::from_exact_iter(nonce.iter().copied())
                        .ok_or_else(|| bad_nonce(nonce.len()))?,
                })),
            (GCM, AES128) =>
                Ok(Box::new(AeadCipher {
                    cipher: AesGcm::<aes::Aes128, U12>::new_from_slice(key)
                        .map_err(invalid_key_length)?,
                    nonce: GenericArray::from_exact_iter(nonce.iter().copied())
                        .ok_or_else(|| bad_nonce(nonce.len()))?,
                })),
            (GCM, AES192) =>
                Ok(Box::new(AeadCipher {
                    cipher: AesGcm::<aes::Aes192, U12>::new_from_slice(key)
                        .map_err(invalid_key_length)?,
                    nonce: GenericArray::from_exact_iter(nonce.iter().copied())
                        .ok_or_else(|| bad_nonce(nonce.len()))?,
                })),
            (GCM, AES256) =>
                Ok(Box::new(AeadCipher {
                    cipher: AesGcm::<aes::Aes256, U12>::new_from_slice(key)
                        .map_err(invalid_key_length)?,
                    nonce: GenericArray::from_exact_iter(nonce.iter().copied())
                        .ok_or_else(|| bad_nonce(nonce.len()))?,
                })),
            (EAX, _) | (OCB, _) | (GCM, _) =>
                Err(Error::UnsupportedSymmetricAlgorithm(sym_algo).into()),
            _ =>
                Err(Error::UnsupportedAEADAlgorithm(*self).into()),
        }
    }
}

fn invalid_key_length(_: cipher::InvalidLength) -> anyhow::Error {
    Error::InvalidKey("invalid key length".into()).into()
}

fn bad_nonce(len: usize) -> anyhow::Error {
    Error::InvalidArgument(format!("invalid nonce length {}", len)).into()
}

/// An AEAD mode of operation for one chunk.
pub(crate) trait Aead: Send + Sync {
    /// Length of the digest in bytes.
    fn digest_size(&self) -> usize;

    /// Encrypts `src`, appending the ciphertext and the digest to
    /// `dst`.
    fn encrypt_seal(&mut self, dst: &mut Vec<u8>, src: &[u8],
                    ad: &[u8]) -> Result<()>;

    /// Decrypts `src` (ciphertext followed by digest), appending the
    /// plaintext to `dst`.
    ///
    /// The digest comparison is performed in constant time by the
    /// underlying mode implementations.
    fn decrypt_verify(&mut self, dst: &mut Vec<u8>, src: &[u8],
                      ad: &[u8]) -> Result<()>;
}

struct AeadCipher<C: AeadInPlace> {
    cipher: C,
    nonce: GenericArray<u8, C::NonceSize>,
}

impl<C> Aead for AeadCipher<C>
where
    C: AeadInPlace + Send + Sync,
{
    fn digest_size(&self) -> usize {
        C::TagSize::to_usize()
    }

    fn encrypt_seal(&mut self, dst: &mut Vec<u8>, src: &[u8],
                    ad: &[u8]) -> Result<()> {
        let offset = dst.len();
        dst.extend_from_slice(src);
        let tag = self.cipher
            .encrypt_in_place_detached(&self.nonce, ad, &mut dst[offset..])
            .map_err(|_| Error::InvalidOperation("AEAD sealing failed".into()))?;
        dst.extend_from_slice(&tag);
        Ok(())
    }

    fn decrypt_verify(&mut self, dst: &mut Vec<u8>, src: &[u8],
                      ad: &[u8]) -> Result<()> {
        let digest_size = self.digest_size();
        if src.len() < digest_size {
            return Err(Error::ManipulatedMessage.into());
        }

        let l = src.len() - digest_size;
        let offset = dst.len();
        dst.extend_from_slice(&src[..l]);
        let tag = GenericArray::from_slice(&src[l..]);
        let r = self.cipher
            .decrypt_in_place_detached(&self.nonce, ad, &mut dst[offset..],
                                       tag);
        if r.is_err() && !DANGER_DISABLE_AUTHENTICATION {
            crate::vec_truncate(dst, offset);
            return Err(Error::ManipulatedMessage.into());
        }
        Ok(())
    }
}

/// The chunked AEAD schedule: nonces and associated data for each
/// chunk.
///
/// This is shared between the AEAD encrypted data packet and the v5
/// SKESK packet's single-shot use.
pub(crate) struct Schedule {
    sym_algo: SymmetricAlgorithm,
    aead: AEADAlgorithm,
    key: SessionKey,
    iv: Vec<u8>,
    /// The packet prologue: CTB, version, cipher, mode, chunk size
    /// octet.
    ad: Vec<u8>,
}
assert_send_and_sync!(Schedule);

impl Schedule {
    /// Creates a new schedule.
    ///
    /// `ad_prologue` is the associated data prefix, i.e. the packet
    /// tag and the fixed header fields.
    pub fn new(sym_algo: SymmetricAlgorithm, aead: AEADAlgorithm,
               key: SessionKey, iv: &[u8], ad_prologue: &[u8])
               -> Result<Self> {
        if iv.len() != aead.iv_size()? {
            return Err(Error::InvalidArgument(
                format!("IV length {} does not match mode {}",
                        iv.len(), aead)).into());
        }

        Ok(Schedule {
            sym_algo,
            aead,
            key,
            iv: iv.to_vec(),
            ad: ad_prologue.to_vec(),
        })
    }

    /// Returns the context and associated data for the given chunk.
    fn chunk_context(&self, index: u64, final_digest: Option<u64>)
                     -> Result<(Box<dyn Aead>, Vec<u8>)> {
        // The nonce is the IV XORed with the chunk index, big endian,
        // into its final eight octets.
        let mut nonce = self.iv.clone();
        let index_be = index.to_be_bytes();
        let l = nonce.len();
        for (o, i) in nonce[l - 8..].iter_mut().zip(index_be.iter()) {
            *o ^= i;
        }

        let mut ad = self.ad.clone();
        ad.extend_from_slice(&index_be);
        if let Some(total_bytes) = final_digest {
            ad.extend_from_slice(&total_bytes.to_be_bytes());
        }

        let ctx = self.aead.context(self.sym_algo, &self.key, &nonce)?;
        Ok((ctx, ad))
    }

    /// Seals one chunk.
    pub fn encrypt_chunk(&self, index: u64, dst: &mut Vec<u8>, src: &[u8])
                         -> Result<()> {
        let (mut ctx, ad) = self.chunk_context(index, None)?;
        ctx.encrypt_seal(dst, src, &ad)
    }

    /// Opens one chunk.
    pub fn decrypt_chunk(&self, index: u64, dst: &mut Vec<u8>, src: &[u8])
                         -> Result<()> {
        let (mut ctx, ad) = self.chunk_context(index, None)?;
        ctx.decrypt_verify(dst, src, &ad)
    }

    /// Seals the final, empty chunk authenticating the total
    /// plaintext length.
    pub fn encrypt_final(&self, index: u64, total_bytes: u64,
                         dst: &mut Vec<u8>) -> Result<()> {
        let (mut ctx, ad) = self.chunk_context(index, Some(total_bytes))?;
        ctx.encrypt_seal(dst, &[], &ad)
    }

    /// Verifies the final tag.
    pub fn decrypt_final(&self, index: u64, total_bytes: u64, src: &[u8])
                         -> Result<()> {
        let (mut ctx, ad) = self.chunk_context(index, Some(total_bytes))?;
        let mut sink = Vec::new();
        ctx.decrypt_verify(&mut sink, src, &ad)?;
        if !sink.is_empty() {
            return Err(Error::ManipulatedMessage.into());
        }
        Ok(())
    }

    /// The mode's digest size.
    pub fn digest_size(&self) -> Result<usize> {
        self.aead.digest_size()
    }
}

/// A `Read`er for decrypting a chunked AEAD stream.
///
/// Plaintext from chunk `k` is surfaced only after chunk `k`'s tag
/// has been validated; a single tag failure aborts the stream with
/// [`Error::ManipulatedMessage`].
///
/// [`Error::ManipulatedMessage`]: ../../enum.Error.html
pub struct Decryptor<R: io::Read> {
    source: R,
    schedule: Schedule,
    chunk_size: usize,
    digest_size: usize,
    chunk_index: u64,
    total_bytes: u64,
    /// Raw ciphertext that has been read but not yet processed.
    raw: Vec<u8>,
    /// Decrypted plaintext ready to be handed out.
    plaintext: Vec<u8>,
    eof: bool,
    failed: bool,
}
assert_send_and_sync!(Decryptor<R> where R: io::Read);

impl<R: io::Read> Decryptor<R> {
    /// Creates a new chunked-AEAD decryptor.
    pub(crate) fn new(schedule: Schedule, chunk_size: usize, source: R)
                      -> Result<Self> {
        let digest_size = schedule.digest_size()?;
        Ok(Decryptor {
            source,
            schedule,
            chunk_size,
            digest_size,
            chunk_index: 0,
            total_bytes: 0,
            raw: Vec::new(),
            plaintext: Vec::new(),
            eof: false,
            failed: false,
        })
    }

    /// Reads from the source until `self.raw` holds at least `want`
    /// bytes, or EOF is reached.
    fn fill_raw(&mut self, want: usize) -> io::Result<()> {
        let mut buf = [0u8; 4096];
        while !self.eof && self.raw.len() < want {
            let n = self.source.read(&mut buf)?;
            if n == 0 {
                self.eof = true;
            } else {
                self.raw.extend_from_slice(&buf[..n]);
            }
        }
        Ok(())
    }

    fn process(&mut self) -> Result<()> {
        // To distinguish the final partial chunk and trailing final
        // tag from a full chunk, we keep a lookahead of one full
        // chunk, one chunk digest, and the final digest.
        let full = self.chunk_size + self.digest_size;
        let lookahead = full + self.digest_size;

        self.fill_raw(lookahead)
            .map_err(|e| anyhow::Error::from(e))?;

        while self.raw.len() >= full + self.digest_size {
            // Definitely a full chunk; the final digest cannot be
            // part of it.
            let rest = self.raw.split_off(full);
            let chunk = std::mem::replace(&mut self.raw, rest);
            self.schedule.decrypt_chunk(self.chunk_index,
                                        &mut self.plaintext, &chunk)?;
            self.chunk_index += 1;
            self.total_bytes += (chunk.len() - self.digest_size) as u64;

            self.fill_raw(lookahead)
                .map_err(|e| anyhow::Error::from(e))?;
        }

        if !self.eof {
            return Ok(());
        }

        // The stream is exhausted.  What is left is the final partial
        // chunk (if any) followed by the final digest.
        if self.raw.len() == self.digest_size {
            // Just the final digest.
            let raw = std::mem::take(&mut self.raw);
            self.schedule.decrypt_final(self.chunk_index, self.total_bytes,
                                        &raw)?;
        } else if self.raw.len() >= 2 * self.digest_size {
            let final_digest = self.raw.split_off(
                self.raw.len() - self.digest_size);
            let chunk = std::mem::take(&mut self.raw);
            self.schedule.decrypt_chunk(self.chunk_index,
                                        &mut self.plaintext, &chunk)?;
            self.chunk_index += 1;
            self.total_bytes += (chunk.len() - self.digest_size) as u64;
            self.schedule.decrypt_final(self.chunk_index, self.total_bytes,
                                        &final_digest)?;
        } else {
            return Err(Error::ManipulatedMessage.into());
        }

        Ok(())
    }
}

impl<R: io::Read> io::Read for Decryptor<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.failed {
            return Err(io::Error::new(io::ErrorKind::InvalidData,
                                      "AEAD stream is corrupt"));
        }

        while self.plaintext.is_empty() && !(self.eof && self.raw.is_empty()) {
            if let Err(e) = self.process() {
                self.failed = true;
                return Err(io::Error::new(io::ErrorKind::InvalidData, e));
            }
        }

        let n = cmp::min(buf.len(), self.plaintext.len());
        buf[..n].copy_from_slice(&self.plaintext[..n]);
        crate::vec_drain_prefix(&mut self.plaintext, n);
        Ok(n)
    }
}

/// A `Write`r sealing data using a chunked AEAD stream.
pub struct Encryptor<W: io::Write> {
    inner: Option<W>,
    schedule: Schedule,
    chunk_size: usize,
    chunk_index: u64,
    total_bytes: u64,
    /// Plaintext buffered until a full chunk is available.
    buffer: Vec<u8>,
    /// Scratch space for the sealed chunk.
    scratch: Vec<u8>,
}
assert_send_and_sync!(Encryptor<W> where W: io::Write);

impl<W: io::Write> Encryptor<W> {
    /// Creates a new chunked-AEAD encryptor.
    pub(crate) fn new(schedule: Schedule, chunk_size: usize, sink: W)
                      -> Result<Self> {
        Ok(Encryptor {
            inner: Some(sink),
            schedule,
            chunk_size,
            chunk_index: 0,
            total_bytes: 0,
            buffer: Vec::with_capacity(chunk_size),
            scratch: Vec::new(),
        })
    }

    fn seal_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        let inner = self.inner.as_mut().expect("sink vanished");
        self.scratch.clear();
        self.schedule.encrypt_chunk(self.chunk_index, &mut self.scratch,
                                    chunk)?;
        inner.write_all(&self.scratch)?;
        self.chunk_index += 1;
        self.total_bytes += chunk.len() as u64;
        Ok(())
    }

    /// Writes the final partial chunk and the final tag, and returns
    /// the sink.
    pub fn finish(&mut self) -> Result<W> {
        if self.inner.is_none() {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe,
                                      "Inner writer was taken").into());
        }

        if !self.buffer.is_empty() {
            let chunk = std::mem::take(&mut self.buffer);
            self.seal_chunk(&chunk)?;
        }

        self.scratch.clear();
        self.schedule.encrypt_final(self.chunk_index, self.total_bytes,
                                    &mut self.scratch)?;
        let mut inner = self.inner.take().expect("checked above");
        inner.write_all(&self.scratch)?;
        Ok(inner)
    }
}

impl<W: io::Write> io::Write for Encryptor<W> {
    fn write(&mut self, mut buf: &[u8]) -> io::Result<usize> {
        if self.inner.is_none() {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe,
                                      "Inner writer was taken"));
        }

        let written = buf.len();
        while !buf.is_empty() {
            let missing = self.chunk_size - self.buffer.len();
            let n = cmp::min(missing, buf.len());
            self.buffer.extend_from_slice(&buf[..n]);
            buf = &buf[n..];

            if self.buffer.len() == self.chunk_size {
                let chunk = std::mem::take(&mut self.buffer);
                self.seal_chunk(&chunk)
                    .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
            }
        }
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        // We cannot flush a partial chunk: doing so would fix the
        // chunk boundary in a way that does not match the chunk size
        // octet.  Only flush the inner writer.
        if let Some(inner) = self.inner.as_mut() {
            inner.flush()
        } else {
            Ok(())
        }
    }
}

impl<W: io::Write> Drop for Encryptor<W> {
    fn drop(&mut self) {
        // Called in a finished state, this is a no-op; otherwise the
        // stream is truncated, and decryption will fail to verify the
        // final tag, which is the best we can signal from drop().
        if self.inner.is_some() {
            let _ = self.finish();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use crate::types::{AEADAlgorithm, SymmetricAlgorithm};

    fn schedule(aead: AEADAlgorithm) -> Schedule {
        let key = SessionKey::from(&[0x42u8; 32][..]);
        let iv = vec![0x23; aead.iv_size().unwrap()];
        // The prologue of an AEAD encrypted data packet with chunk
        // size octet 6.
        let ad = [0xd4, 0x01, SymmetricAlgorithm::AES256.into(),
                  aead.into(), 6];
        Schedule::new(SymmetricAlgorithm::AES256, aead, key, &iv, &ad)
            .unwrap()
    }

    fn roundtrip(aead: AEADAlgorithm, text: &[u8]) {
        // Chunk size octet 6 => 4096 byte chunks.  Use a small chunk
        // size to exercise the chunking logic.
        let chunk_size = 64;

        let mut ciphertext = Vec::new();
        let mut enc = Encryptor::new(schedule(aead), chunk_size,
                                     &mut ciphertext).unwrap();
        enc.write_all(text).unwrap();
        enc.finish().unwrap();

        assert!(ciphertext.len() > text.len());

        let mut dec = Decryptor::new(schedule(aead), chunk_size,
                                     io::Cursor::new(&ciphertext)).unwrap();
        let mut plaintext = Vec::new();
        dec.read_to_end(&mut plaintext).unwrap();
        assert_eq!(&plaintext[..], text);

        // Flipping any bit must break the stream.
        let mut tampered = ciphertext.clone();
        let idx = tampered.len() / 2;
        tampered[idx] ^= 1;
        let mut dec = Decryptor::new(schedule(aead), chunk_size,
                                     io::Cursor::new(&tampered)).unwrap();
        let mut plaintext = Vec::new();
        assert!(dec.read_to_end(&mut plaintext).is_err());
    }

    #[test]
    fn eax_roundtrip() {
        roundtrip(AEADAlgorithm::EAX, b"Hello, World!\n");
        roundtrip(AEADAlgorithm::EAX, &vec![0x55; 1000]);
        roundtrip(AEADAlgorithm::EAX, &[]);
        // Exact multiple of the chunk size.
        roundtrip(AEADAlgorithm::EAX, &vec![0xaa; 128]);
    }

    #[test]
    fn ocb_roundtrip() {
        roundtrip(AEADAlgorithm::OCB, b"Hello, World!\n");
        roundtrip(AEADAlgorithm::OCB, &vec![0x55; 129]);
    }

    #[test]
    fn gcm_roundtrip() {
        roundtrip(AEADAlgorithm::GCM, b"Hello, World!\n");
        roundtrip(AEADAlgorithm::GCM, &vec![0x55; 63]);
    }

    #[test]
    fn truncation_is_detected() {
        let chunk_size = 64;
        let mut ciphertext = Vec::new();
        let mut enc = Encryptor::new(schedule(AEADAlgorithm::EAX), chunk_size,
                                     &mut ciphertext).unwrap();
        enc.write_all(&vec![0x77; 200]).unwrap();
        enc.finish().unwrap();

        // Drop the final tag.
        let truncated = &ciphertext[..ciphertext.len() - 16];
        let mut dec = Decryptor::new(schedule(AEADAlgorithm::EAX), chunk_size,
                                     io::Cursor::new(truncated)).unwrap();
        let mut plaintext = Vec::new();
        assert!(dec.read_to_end(&mut plaintext).is_err());
    }
}
