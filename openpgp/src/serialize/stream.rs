//! Streaming packet serialization.
//!
//! This interface serializes OpenPGP messages of arbitrary size: the
//! writers are stacked the way the packets nest, and plaintext
//! written to the top of the stack flows through the signer, the
//! compressor, and the encryptor incrementally.  Packet bodies whose
//! length is unknown in advance are framed using partial body
//! lengths.
//!
//! The stack is built from the outside in:
//!
//! ```text
//! Message::new(sink)          the bare message
//!   Encryptor::*              PKESK/SKESK packets, SEIP or AED packet
//!     Compressor::new         a compressed data packet
//!       Signer::new           one-pass signature packets, trailing sigs
//!         LiteralWriter::new  the literal data packet
//! ```

use std::io::{self, Write};
use std::time::SystemTime;

use crate::{
    Error,
    Packet,
    Result,
    cert::Cert,
    crypto::{self, Password, SessionKey},
    crypto::aead::Schedule,
    packet::prelude::*,
    policy::Config,
    serialize::Marshal,
    types::{
        CompressionAlgorithm,
        DataFormat,
        HashAlgorithm,
        SignatureType,
        Timestamp,
    },
};

pub(crate) mod writer {
    //! The writer stack underlying the streaming serializers.

    use std::io;

    use crate::Result;

    /// A writer stack layer.
    pub trait Stackable<'a>: io::Write + Send + Sync {
        /// Feeds document content to the hashing layers without
        /// writing it.
        ///
        /// The literal data writer announces its content through this
        /// channel; a signing layer updates its hash contexts, all
        /// other layers pass the call down the stack.
        fn hash_content(&mut self, buf: &[u8]) -> io::Result<()>;

        /// Finalizes this layer, writing any trailers, and returns
        /// the inner layer, if any.
        fn finalize_one(self: Box<Self>) -> Result<Option<BoxStack<'a>>>;
    }

    /// A boxed stack layer.
    pub type BoxStack<'a> = Box<dyn Stackable<'a> + 'a>;

    /// A writer stack.
    ///
    /// The stack is constructed by the streaming serializers, and
    /// consumed with [`Stack::finalize`].
    ///
    ///   [`Stack::finalize`]: #method.finalize
    pub struct Stack<'a>(pub(crate) BoxStack<'a>);

    impl<'a> Stack<'a> {
        /// Finalizes the whole stack, writing all trailers.
        pub fn finalize(self) -> Result<()> {
            let mut layer = Some(self.0);
            while let Some(l) = layer {
                layer = l.finalize_one()?;
            }
            Ok(())
        }

        pub(crate) fn into_inner(self) -> BoxStack<'a> {
            self.0
        }
    }

    impl<'a> io::Write for Stack<'a> {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            self.0.flush()
        }
    }
}

pub use self::writer::Stack;
use self::writer::{BoxStack, Stackable};

/// The chunk size used when framing packet bodies with partial body
/// lengths.
const PARTIAL_BODY_CHUNK: usize = 1 << 14;

/// Streams an OpenPGP message.
///
/// This is the bottom of every writer stack.
pub struct Message {
}

impl Message {
    /// Streams an OpenPGP message into `w`.
    pub fn new<'a, W: io::Write + Send + Sync + 'a>(w: W) -> Stack<'a> {
        Stack(Box::new(Generic { inner: w }))
    }
}

struct Generic<W: io::Write> {
    inner: W,
}

impl<W: io::Write> io::Write for Generic<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<'a, W: io::Write + Send + Sync> Stackable<'a> for Generic<W> {
    fn hash_content(&mut self, _buf: &[u8]) -> io::Result<()> {
        // The sink does not hash.
        Ok(())
    }

    fn finalize_one(self: Box<Self>) -> Result<Option<BoxStack<'a>>> {
        let mut this = self;
        this.inner.flush()?;
        Ok(None)
    }
}

/// Frames a packet body using partial body lengths.
///
/// Data is buffered into power-of-two chunks.  If the whole body fits
/// into one buffer, a definite length is used instead.
struct PartialBody<'a> {
    inner: BoxStack<'a>,
    buffer: Vec<u8>,
}

impl<'a> PartialBody<'a> {
    /// Starts a packet with the given tag.
    fn new(mut inner: BoxStack<'a>, tag: Tag) -> Result<Self> {
        inner.write_all(&[0b1100_0000 | u8::from(tag)])?;
        Ok(PartialBody {
            inner,
            buffer: Vec::with_capacity(PARTIAL_BODY_CHUNK),
        })
    }

    fn hash_content(&mut self, buf: &[u8]) -> io::Result<()> {
        self.inner.hash_content(buf)
    }

    /// Writes all buffered full chunks.
    fn flush_chunks(&mut self) -> io::Result<()> {
        while self.buffer.len() >= PARTIAL_BODY_CHUNK {
            // 2^14 byte chunks: 224 + 14.
            self.inner.write_all(&[224 + 14])?;
            self.inner.write_all(&self.buffer[..PARTIAL_BODY_CHUNK])?;
            crate::vec_drain_prefix(&mut self.buffer, PARTIAL_BODY_CHUNK);
        }
        Ok(())
    }

    /// Writes the final chunk with a definite length and returns the
    /// inner layer.
    fn finalize(mut self) -> Result<BoxStack<'a>> {
        // The remaining data is emitted with a definite length.  If
        // no partial chunk was emitted, the whole packet uses a
        // definite length; otherwise this closes the chunk series,
        // possibly with a zero-length final chunk.
        let l = self.buffer.len();
        if l < 192 {
            self.inner.write_all(&[l as u8])?;
        } else if l < 8384 {
            let v = l - 192;
            self.inner.write_all(&[(v >> 8) as u8 + 192,
                                   (v & 0xff) as u8])?;
        } else {
            self.inner.write_all(&[0xff])?;
            self.inner.write_all(&(l as u32).to_be_bytes())?;
        }
        self.inner.write_all(&self.buffer)?;
        Ok(self.inner)
    }
}

impl<'a> io::Write for PartialBody<'a> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        self.flush_chunks()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        // Partial chunks cannot be flushed early; only forward the
        // flush.
        self.inner.flush()
    }
}

/// Writes a literal data packet.
///
/// The literal data packet is an OpenPGP message's payload.  The
/// packet's body is streamed using partial body lengths, and the
/// content is announced to any signing layer below.
pub struct LiteralWriter<'a> {
    inner: Stack<'a>,
    format: DataFormat,
    filename: Option<Vec<u8>>,
    date: Option<SystemTime>,
}

impl<'a> LiteralWriter<'a> {
    /// Creates a new literal writer.
    pub fn new(inner: Stack<'a>) -> Self {
        LiteralWriter {
            inner,
            format: DataFormat::Binary,
            filename: None,
            date: None,
        }
    }

    /// Sets the data format.
    pub fn format(mut self, format: DataFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets the filename.
    ///
    /// The standard does not specify the encoding.  Filenames must
    /// not be longer than 255 bytes.
    pub fn filename<B: AsRef<[u8]>>(mut self, filename: B) -> Result<Self> {
        let filename = filename.as_ref();
        if filename.len() > 255 {
            return Err(Error::InvalidArgument(
                "filename too long".into()).into());
        }
        self.filename = Some(filename.to_vec());
        Ok(self)
    }

    /// Sets the date.
    pub fn date(mut self, timestamp: SystemTime) -> Result<Self> {
        Timestamp::try_from(timestamp)?;
        self.date = Some(timestamp);
        Ok(self)
    }

    /// Builds the literal writer, returning the writer stack.
    pub fn build(self) -> Result<Stack<'a>> {
        let mut pb = PartialBody::new(self.inner.into_inner(),
                                      Tag::Literal)?;

        // The fixed fields are part of the packet body, but not of
        // the signed content.
        let mut l = Literal::new(self.format);
        if let Some(f) = &self.filename {
            l.set_filename(f)?;
        }
        l.set_date(self.date)?;
        l.serialize_headers(&mut pb)?;

        Ok(Stack(Box::new(LiteralLayer { pb })))
    }
}

struct LiteralLayer<'a> {
    pb: PartialBody<'a>,
}

impl<'a> io::Write for LiteralLayer<'a> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // Announce the content to the hashing layers, then emit it
        // as part of the packet body.
        self.pb.hash_content(buf)?;
        self.pb.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.pb.flush()
    }
}

impl<'a> Stackable<'a> for LiteralLayer<'a> {
    fn hash_content(&mut self, _buf: &[u8]) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::InvalidInput,
                           "the literal writer is the top of the stack"))
    }

    fn finalize_one(self: Box<Self>) -> Result<Option<BoxStack<'a>>> {
        Ok(Some(self.pb.finalize()?))
    }
}

/// Signs a message.
///
/// Writes one-pass signature packets ahead of the data, hashes the
/// content as it flows by, and emits the trailing signature packets
/// when the stack is finalized.  Nested one-pass signatures are
/// evaluated LIFO: the first one-pass signature packet corresponds to
/// the last signature packet.
pub struct Signer<'a> {
    inner: Stack<'a>,
    signers: Vec<Box<dyn crypto::Signer + Send + Sync + 'a>>,
    mode: SignatureType,
    hash_algo: HashAlgorithm,
}

impl<'a> Signer<'a> {
    /// Creates a signer for a binary signature.
    pub fn new<S>(inner: Stack<'a>, signer: S) -> Self
        where S: crypto::Signer + Send + Sync + 'a,
    {
        Signer {
            inner,
            signers: vec![Box::new(signer)],
            mode: SignatureType::Binary,
            hash_algo: HashAlgorithm::SHA256,
        }
    }

    /// Adds an additional signer.
    pub fn add_signer<S>(mut self, signer: S) -> Self
        where S: crypto::Signer + Send + Sync + 'a,
    {
        self.signers.push(Box::new(signer));
        self
    }

    /// Signs a canonical text document: line endings are normalized
    /// to CRLF while hashing.
    pub fn text_mode(mut self) -> Self {
        self.mode = SignatureType::Text;
        self
    }

    /// Sets the hash algorithm.
    pub fn hash_algo(mut self, algo: HashAlgorithm) -> Result<Self> {
        if !algo.is_supported() {
            return Err(Error::UnsupportedHashAlgorithm(algo).into());
        }
        self.hash_algo = algo;
        Ok(self)
    }

    /// Builds the signer, writing the one-pass signature packets.
    pub fn build(self) -> Result<Stack<'a>> {
        let mut inner = self.inner.into_inner();

        // Emit one one-pass signature packet per signer; only the
        // innermost (last emitted) carries the last flag.
        let n = self.signers.len();
        let mut hashes = Vec::with_capacity(n);
        for (i, signer) in self.signers.iter().enumerate() {
            let mut ops = OnePassSig3::new(self.mode);
            ops.set_hash_algo(self.hash_algo);
            ops.set_pk_algo(signer.public().pk_algo());
            ops.set_issuer(signer.public().keyid());
            ops.set_last(i == n - 1);
            Packet::from(crate::packet::OnePassSig::V3(ops))
                .serialize(&mut inner)?;

            hashes.push(self.hash_algo.context()?);
        }

        Ok(Stack(Box::new(SignerLayer {
            inner,
            signers: self.signers,
            hashes,
            mode: self.mode,
            pending_cr: false,
        })))
    }
}

struct SignerLayer<'a> {
    inner: BoxStack<'a>,
    signers: Vec<Box<dyn crypto::Signer + Send + Sync + 'a>>,
    hashes: Vec<crate::crypto::hash::Context>,
    mode: SignatureType,
    /// Canonicalization state: a CR was seen, a LF may follow.
    pending_cr: bool,
}

impl<'a> SignerLayer<'a> {
    fn update(&mut self, buf: &[u8]) {
        if self.mode == SignatureType::Text {
            // Convert line endings to CRLF while hashing.
            let mut start = 0;
            for (i, &b) in buf.iter().enumerate() {
                match b {
                    b'\n' if !self.pending_cr => {
                        for h in &mut self.hashes {
                            h.update(&buf[start..i]);
                            h.update(b"\r\n");
                        }
                        start = i + 1;
                    }
                    _ => (),
                }
                self.pending_cr = b == b'\r';
            }
            for h in &mut self.hashes {
                h.update(&buf[start..]);
            }
        } else {
            for h in &mut self.hashes {
                h.update(buf);
            }
        }
    }
}

impl<'a> io::Write for SignerLayer<'a> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<'a> Stackable<'a> for SignerLayer<'a> {
    fn hash_content(&mut self, buf: &[u8]) -> io::Result<()> {
        self.update(buf);
        // Forward the announcement to support nested signers.
        self.inner.hash_content(buf)
    }

    fn finalize_one(self: Box<Self>) -> Result<Option<BoxStack<'a>>> {
        let mut this = *self;

        // The trailing signature packets mirror the one-pass
        // packets: last one-pass signature first.
        for i in (0..this.signers.len()).rev() {
            let sig = SignatureBuilder::new(this.mode)
                .sign_hash(&mut *this.signers[i],
                           this.hashes[i].clone())?;
            Packet::from(sig)
                .serialize(&mut this.inner)?;
        }

        Ok(Some(this.inner))
    }
}

/// Compresses a message.
pub struct Compressor<'a> {
    inner: Stack<'a>,
    algo: CompressionAlgorithm,
    level: u32,
}

impl<'a> Compressor<'a> {
    /// Creates a new compressor using the given algorithm.
    pub fn new(inner: Stack<'a>) -> Self {
        Compressor {
            inner,
            algo: CompressionAlgorithm::Zip,
            level: 6,
        }
    }

    /// Sets the compression algorithm.
    pub fn algo(mut self, algo: CompressionAlgorithm) -> Self {
        self.algo = algo;
        self
    }

    /// Sets the deflate compression level from the configuration.
    pub fn with_config(mut self, config: &Config) -> Self {
        self.algo = config.preferred_compression_algorithm();
        self.level = config.deflate_level();
        self
    }

    /// Builds the compressor, writing the packet headers.
    pub fn build(self) -> Result<Stack<'a>> {
        let mut pb = PartialBody::new(self.inner.into_inner(),
                                      Tag::CompressedData)?;
        pb.write_all(&[self.algo.into()])?;

        let enc = match self.algo {
            CompressionAlgorithm::Uncompressed =>
                CompEncoder::Uncompressed(pb),
            #[cfg(feature = "compression-deflate")]
            CompressionAlgorithm::Zip =>
                CompEncoder::Zip(flate2::write::DeflateEncoder::new(
                    pb, flate2::Compression::new(self.level))),
            #[cfg(feature = "compression-deflate")]
            CompressionAlgorithm::Zlib =>
                CompEncoder::Zlib(flate2::write::ZlibEncoder::new(
                    pb, flate2::Compression::new(self.level))),
            #[cfg(feature = "compression-bzip2")]
            CompressionAlgorithm::BZip2 =>
                CompEncoder::BZip2(bzip2::write::BzEncoder::new(
                    pb, bzip2::Compression::default())),
            a => return Err(
                Error::UnsupportedCompressionAlgorithm(a).into()),
        };

        Ok(Stack(Box::new(CompressorLayer { enc })))
    }
}

enum CompEncoder<'a> {
    Uncompressed(PartialBody<'a>),
    #[cfg(feature = "compression-deflate")]
    Zip(flate2::write::DeflateEncoder<PartialBody<'a>>),
    #[cfg(feature = "compression-deflate")]
    Zlib(flate2::write::ZlibEncoder<PartialBody<'a>>),
    #[cfg(feature = "compression-bzip2")]
    BZip2(bzip2::write::BzEncoder<PartialBody<'a>>),
}

impl<'a> CompEncoder<'a> {
    fn get_mut(&mut self) -> &mut PartialBody<'a> {
        match self {
            CompEncoder::Uncompressed(w) => w,
            #[cfg(feature = "compression-deflate")]
            CompEncoder::Zip(w) => w.get_mut(),
            #[cfg(feature = "compression-deflate")]
            CompEncoder::Zlib(w) => w.get_mut(),
            #[cfg(feature = "compression-bzip2")]
            CompEncoder::BZip2(w) => w.get_mut(),
        }
    }

    fn finish(self) -> Result<PartialBody<'a>> {
        Ok(match self {
            CompEncoder::Uncompressed(w) => w,
            #[cfg(feature = "compression-deflate")]
            CompEncoder::Zip(w) => w.finish()?,
            #[cfg(feature = "compression-deflate")]
            CompEncoder::Zlib(w) => w.finish()?,
            #[cfg(feature = "compression-bzip2")]
            CompEncoder::BZip2(w) => w.finish()?,
        })
    }

    fn write_data(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            CompEncoder::Uncompressed(w) => w.write(buf),
            #[cfg(feature = "compression-deflate")]
            CompEncoder::Zip(w) => w.write(buf),
            #[cfg(feature = "compression-deflate")]
            CompEncoder::Zlib(w) => w.write(buf),
            #[cfg(feature = "compression-bzip2")]
            CompEncoder::BZip2(w) => w.write(buf),
        }
    }

    fn flush_data(&mut self) -> io::Result<()> {
        match self {
            CompEncoder::Uncompressed(w) => w.flush(),
            #[cfg(feature = "compression-deflate")]
            CompEncoder::Zip(w) => w.flush(),
            #[cfg(feature = "compression-deflate")]
            CompEncoder::Zlib(w) => w.flush(),
            #[cfg(feature = "compression-bzip2")]
            CompEncoder::BZip2(w) => w.flush(),
        }
    }
}

struct CompressorLayer<'a> {
    enc: CompEncoder<'a>,
}

impl<'a> io::Write for CompressorLayer<'a> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.enc.write_data(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.enc.flush_data()
    }
}

impl<'a> Stackable<'a> for CompressorLayer<'a> {
    fn hash_content(&mut self, buf: &[u8]) -> io::Result<()> {
        self.enc.get_mut().hash_content(buf)
    }

    fn finalize_one(self: Box<Self>) -> Result<Option<BoxStack<'a>>> {
        let pb = self.enc.finish()?;
        Ok(Some(pb.finalize()?))
    }
}

/// Encrypts a message.
///
/// Writes the encrypted session key packets, then encrypts everything
/// written to it into a SEIP packet (with an MDC trailer), or, if
/// AEAD is requested, into an AEAD encrypted data packet.
pub struct Encryptor<'a> {
    inner: Stack<'a>,
    config: Config,
    recipients: Vec<&'a Cert>,
    passwords: Vec<Password>,
    session_key: Option<SessionKey>,
}

impl<'a> Encryptor<'a> {
    /// Creates an encryptor for the given recipient certificates.
    pub fn for_recipients(inner: Stack<'a>, config: &Config,
                          recipients: Vec<&'a Cert>) -> Self {
        Encryptor {
            inner,
            config: config.clone(),
            recipients,
            passwords: Vec::new(),
            session_key: None,
        }
    }

    /// Creates an encryptor for the given passwords.
    pub fn with_passwords(inner: Stack<'a>, config: &Config,
                          passwords: Vec<Password>) -> Self {
        Encryptor {
            inner,
            config: config.clone(),
            recipients: Vec::new(),
            passwords,
            session_key: None,
        }
    }

    /// Adds passwords to encrypt with.
    pub fn add_passwords(mut self, passwords: Vec<Password>) -> Self {
        self.passwords.extend(passwords);
        self
    }

    /// Uses the given session key instead of generating one.
    pub fn session_key(mut self, sk: SessionKey) -> Self {
        self.session_key = Some(sk);
        self
    }

    /// Builds the encryptor, writing the session key packets and the
    /// encryption container's headers.
    pub fn build(self) -> Result<Stack<'a>> {
        if self.recipients.is_empty() && self.passwords.is_empty()
            && self.session_key.is_none()
        {
            return Err(Error::InvalidOperation(
                "neither recipients, passwords, nor session key given"
                    .into()).into());
        }

        let config = &self.config;
        let sym_algo = config.preferred_symmetric_algorithm();
        config.check_symmetric(sym_algo)?;

        let sk = match &self.session_key {
            Some(sk) => sk.clone(),
            None => SessionKey::new(sym_algo.key_size()?),
        };

        let mut inner = self.inner.into_inner();

        // Emit one PKESK per recipient key.
        let now = SystemTime::now();
        for cert in &self.recipients {
            let ka = cert.encryption_key(config, now, None)?;
            let key = ka.key().clone();
            let pkesk = PKESK3::for_recipient(sym_algo, &sk, &key)?;
            Packet::from(crate::packet::PKESK::V3(pkesk))
                .serialize(&mut inner)?;
        }

        // Emit one SKESK per password.
        for password in &self.passwords {
            let s2k = crate::crypto::S2K::default();
            if config.aead_protect() {
                let aead = config.preferred_aead_algorithm();
                config.check_aead(aead)?;
                let skesk = SKESK5::with_password(
                    sym_algo, sym_algo, aead, s2k, &sk, password)?;
                Packet::from(crate::packet::SKESK::V5(skesk))
                    .serialize(&mut inner)?;
            } else {
                let skesk = SKESK4::with_password(
                    sym_algo, sym_algo, s2k, &sk, password)?;
                Packet::from(crate::packet::SKESK::V4(skesk))
                    .serialize(&mut inner)?;
            }
        }

        if config.aead_protect() {
            let aead = config.preferred_aead_algorithm();
            config.check_aead(aead)?;
            let chunk_size_octet = config.aead_chunk_size_byte();
            let chunk_size: u64 = 1 << (chunk_size_octet + 6);

            let mut iv = vec![0u8; aead.iv_size()?];
            crypto::random(&mut iv);

            let mut pb = PartialBody::new(inner, Tag::AED)?;
            pb.write_all(&[1, // Version.
                           sym_algo.into(),
                           aead.into(),
                           chunk_size_octet])?;
            pb.write_all(&iv)?;

            let schedule = Schedule::new(
                sym_algo, aead, sk, &iv,
                &[0xc0 | u8::from(Tag::AED),
                  1, // Version.
                  sym_algo.into(),
                  aead.into(),
                  chunk_size_octet])?;

            let enc = crypto::aead::Encryptor::new(
                schedule, chunk_size as usize, pb)?;

            Ok(Stack(Box::new(AeadLayer { enc: Some(enc) })))
        } else {
            let mut pb = PartialBody::new(inner, Tag::SEIP)?;
            pb.write_all(&[1 /* Version. */])?;

            let mut enc =
                crypto::symmetric::Encryptor::new(sym_algo, &sk, pb)?;

            // The random prefix, with the last two bytes repeated.
            let bs = sym_algo.block_size()?;
            let mut prefix = vec![0u8; bs + 2];
            crypto::random(&mut prefix[..bs]);
            prefix[bs] = prefix[bs - 2];
            prefix[bs + 1] = prefix[bs - 1];

            let mut hash = HashAlgorithm::SHA1.context()?;
            hash.update(&prefix);
            enc.write_all(&prefix)?;

            Ok(Stack(Box::new(SeipLayer {
                enc: Some(enc),
                hash,
            })))
        }
    }
}

struct SeipLayer<'a> {
    enc: Option<crypto::symmetric::Encryptor<PartialBody<'a>>>,
    hash: crate::crypto::hash::Context,
}

impl<'a> io::Write for SeipLayer<'a> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.hash.update(buf);
        self.enc.as_mut().expect("valid until finalized").write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.enc.as_mut().expect("valid until finalized").flush()
    }
}

impl<'a> Stackable<'a> for SeipLayer<'a> {
    fn hash_content(&mut self, _buf: &[u8]) -> io::Result<()> {
        // Anything below the encryption container is opaque.
        Ok(())
    }

    fn finalize_one(self: Box<Self>) -> Result<Option<BoxStack<'a>>> {
        let mut this = *self;
        let mut enc = this.enc.take().expect("valid until finalized");

        // The MDC packet: CTB, length, and the SHA-1 over everything
        // including its own header.
        this.hash.update(&[0xd3, 0x14]);
        let mut digest = vec![0u8; 20];
        this.hash.digest(&mut digest);

        enc.write_all(&[0xd3, 0x14])?;
        enc.write_all(&digest)?;

        let pb = enc.finish()?;
        Ok(Some(pb.finalize()?))
    }
}

struct AeadLayer<'a> {
    enc: Option<crypto::aead::Encryptor<PartialBody<'a>>>,
}

impl<'a> io::Write for AeadLayer<'a> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.enc.as_mut().expect("valid until finalized").write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.enc.as_mut().expect("valid until finalized").flush()
    }
}

impl<'a> Stackable<'a> for AeadLayer<'a> {
    fn hash_content(&mut self, _buf: &[u8]) -> io::Result<()> {
        // Anything below the encryption container is opaque.
        Ok(())
    }

    fn finalize_one(self: Box<Self>) -> Result<Option<BoxStack<'a>>> {
        let mut this = *self;
        let pb = this.enc.take().expect("valid until finalized")
            .finish()?;
        Ok(Some(pb.finalize()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::Parse;
    use crate::PacketPile;

    #[test]
    fn literal_message() {
        let mut sink = Vec::new();
        let message = Message::new(&mut sink);
        let mut message = LiteralWriter::new(message).build().unwrap();
        message.write_all(b"Hello world.").unwrap();
        message.finalize().unwrap();

        let pile = PacketPile::from_bytes(&sink).unwrap();
        match pile.path_ref(&[0]).unwrap() {
            Packet::Literal(l) => assert_eq!(l.body(), b"Hello world."),
            p => panic!("unexpected packet: {:?}", p),
        }
    }

    #[test]
    fn literal_message_with_long_body() {
        let mut sink = Vec::new();
        let message = Message::new(&mut sink);
        let mut message = LiteralWriter::new(message).build().unwrap();
        let body = vec![0x5au8; 100_000];
        message.write_all(&body).unwrap();
        message.finalize().unwrap();

        // The body is framed using partial body lengths.
        let pile = PacketPile::from_bytes(&sink).unwrap();
        match pile.path_ref(&[0]).unwrap() {
            Packet::Literal(l) => assert_eq!(l.body(), &body[..]),
            p => panic!("unexpected packet: {:?}", p),
        }
    }

    #[test]
    fn compressed_literal_message() {
        let mut sink = Vec::new();
        let message = Message::new(&mut sink);
        let message = Compressor::new(message)
            .algo(CompressionAlgorithm::Zip)
            .build().unwrap();
        let mut message = LiteralWriter::new(message).build().unwrap();
        message.write_all(b"Hello compression.").unwrap();
        message.finalize().unwrap();

        let pile = PacketPile::from_bytes(&sink).unwrap();
        match pile.path_ref(&[0, 0]).unwrap() {
            Packet::Literal(l) =>
                assert_eq!(l.body(), b"Hello compression."),
            p => panic!("unexpected packet: {:?}", p),
        }
    }
}
