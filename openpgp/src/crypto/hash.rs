//! Hash functions, and hashing of OpenPGP data structures.
//!
//! Signatures are not computed over the raw serialization of a
//! packet, but over a well-defined function of it: keys are hashed
//! with a synthetic header, user IDs with a constant prefix, and
//! signatures append their own trailer to the hashed data.  The
//! [`Hash`] trait captures these per-type hashing rules; the
//! [`Context`] struct abstracts over the hash function implementations.
//!
//!   [`Hash`]: trait.Hash.html
//!   [`Context`]: struct.Context.html

use std::convert::TryFrom;
use std::io;

use dyn_clone::DynClone;

use crate::HashAlgorithm;
use crate::packet::Key;
use crate::packet::UserID;
use crate::packet::UserAttribute;
use crate::packet::key;
use crate::packet::key::Key4;
use crate::packet::Signature;
use crate::packet::signature::SignatureFields;
use crate::Error;
use crate::Result;
use crate::types::Timestamp;

/// The digest abstraction the hash contexts are built on.
///
/// This allows us to store differently-typed RustCrypto digests
/// behind one pointer, and to clone them.
pub(crate) trait Digest: DynClone + Send + Sync {
    /// Size of the digest in bytes.
    fn digest_size(&self) -> usize;

    /// Writes data into the hash function.
    fn update(&mut self, data: &[u8]);

    /// Finalizes the hash function and writes the digest into the
    /// provided slice, then resets the context.
    ///
    /// `digest` must be at least `self.digest_size()` bytes large,
    /// otherwise the digest will be truncated.
    fn digest(&mut self, digest: &mut [u8]);
}

dyn_clone::clone_trait_object!(Digest);

#[derive(Clone)]
struct RustCryptoDigest<D>(D);

impl<D> Digest for RustCryptoDigest<D>
where
    D: digest::Digest + digest::Reset + Clone + Send + Sync,
{
    fn digest_size(&self) -> usize {
        <D as digest::Digest>::output_size()
    }

    fn update(&mut self, data: &[u8]) {
        digest::Digest::update(&mut self.0, data);
    }

    fn digest(&mut self, digest: &mut [u8]) {
        let d = digest::Digest::finalize(self.0.clone());
        digest::Digest::reset(&mut self.0);
        let n = digest.len().min(d.len());
        digest[..n].copy_from_slice(&d[..n]);
    }
}

/// State of a hash function.
#[derive(Clone)]
pub struct Context {
    algo: HashAlgorithm,
    ctx: Box<dyn Digest>,
}
assert_send_and_sync!(Context);

impl Context {
    /// Returns the algorithm.
    pub fn algo(&self) -> HashAlgorithm {
        self.algo
    }

    /// Size of the digest in bytes.
    pub fn digest_size(&self) -> usize {
        self.ctx.digest_size()
    }

    /// Writes data into the hash function.
    pub fn update<D: AsRef<[u8]>>(&mut self, data: D) {
        self.ctx.update(data.as_ref());
    }

    /// Finalizes the hash function and writes the digest into the
    /// provided slice.
    ///
    /// Resets the hash function context.
    ///
    /// `digest` must be at least `self.digest_size()` bytes large,
    /// otherwise the digest will be truncated.
    pub fn digest<D: AsMut<[u8]>>(&mut self, mut digest: D) {
        self.ctx.digest(digest.as_mut());
    }

    /// Finalizes the hash function and returns the digest.
    pub fn into_digest(mut self) -> Vec<u8> {
        let mut digest = vec![0u8; self.digest_size()];
        self.digest(&mut digest);
        digest
    }
}

impl io::Write for Context {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl HashAlgorithm {
    /// Whether this algorithm is supported by the cryptographic
    /// backend.
    pub fn is_supported(self) -> bool {
        match self {
            HashAlgorithm::MD5 => true,
            HashAlgorithm::SHA1 => true,
            HashAlgorithm::RipeMD => true,
            HashAlgorithm::SHA224 => true,
            HashAlgorithm::SHA256 => true,
            HashAlgorithm::SHA384 => true,
            HashAlgorithm::SHA512 => true,
            HashAlgorithm::Private(_) => false,
            HashAlgorithm::Unknown(_) => false,
        }
    }

    /// Creates a new hash context for this algorithm.
    ///
    /// # Errors
    ///
    /// Fails with `Error::UnsupportedHashAlgorithm` if the selected
    /// crypto backend does not support this algorithm.  See
    /// [`HashAlgorithm::is_supported`].
    ///
    ///   [`HashAlgorithm::is_supported`]: #method.is_supported
    pub fn context(self) -> Result<Context> {
        let ctx: Box<dyn Digest> = match self {
            HashAlgorithm::MD5 =>
                Box::new(RustCryptoDigest(md5::Md5::default())),
            HashAlgorithm::SHA1 =>
                // SHA-1 is broken.  We use a combination of SHA-1 and
                // the Counter-cryptanalysis technique to detect
                // collision attacks, and treat them as failures.
                Box::new(RustCryptoDigest(
                    sha1collisiondetection::Sha1CD::default())),
            HashAlgorithm::RipeMD =>
                Box::new(RustCryptoDigest(ripemd::Ripemd160::default())),
            HashAlgorithm::SHA224 =>
                Box::new(RustCryptoDigest(sha2::Sha224::default())),
            HashAlgorithm::SHA256 =>
                Box::new(RustCryptoDigest(sha2::Sha256::default())),
            HashAlgorithm::SHA384 =>
                Box::new(RustCryptoDigest(sha2::Sha384::default())),
            HashAlgorithm::SHA512 =>
                Box::new(RustCryptoDigest(sha2::Sha512::default())),
            HashAlgorithm::Private(_) | HashAlgorithm::Unknown(_) =>
                return Err(Error::UnsupportedHashAlgorithm(self).into()),
        };

        Ok(Context { algo: self, ctx })
    }

    /// Returns the size of the digest in bytes.
    pub fn digest_size(self) -> Result<usize> {
        match self {
            HashAlgorithm::MD5 => Ok(16),
            HashAlgorithm::SHA1 => Ok(20),
            HashAlgorithm::RipeMD => Ok(20),
            HashAlgorithm::SHA224 => Ok(28),
            HashAlgorithm::SHA256 => Ok(32),
            HashAlgorithm::SHA384 => Ok(48),
            HashAlgorithm::SHA512 => Ok(64),
            HashAlgorithm::Private(_) | HashAlgorithm::Unknown(_) =>
                Err(Error::UnsupportedHashAlgorithm(self).into()),
        }
    }
}

/// Hashes OpenPGP packets and related types.
///
/// Some OpenPGP data structures need to be hashed to be covered by
/// OpenPGP signatures.  Hashing is often based on the serialized
/// form, with some aspects fixed to ensure consistent results.  This
/// trait implements hashing as specified by OpenPGP.
pub trait Hash {
    /// Updates the given hash with this object.
    fn hash(&self, hash: &mut Context);
}

impl Hash for UserID {
    fn hash(&self, hash: &mut Context) {
        let mut header = [0; 5];

        header[0] = 0xB4;
        let len = self.value().len() as u32;
        header[1..5].copy_from_slice(&len.to_be_bytes());

        hash.update(&header[..]);
        hash.update(self.value());
    }
}

impl Hash for UserAttribute {
    fn hash(&self, hash: &mut Context) {
        let mut header = [0; 5];

        header[0] = 0xD1;
        let len = self.value().len() as u32;
        header[1..5].copy_from_slice(&len.to_be_bytes());

        hash.update(&header[..]);
        hash.update(self.value());
    }
}

impl<P, R> Hash for Key4<P, R>
    where P: key::KeyParts,
          R: key::KeyRole,
{
    fn hash(&self, hash: &mut Context) {
        use crate::serialize::MarshalInto;

        // We hash 6 bytes plus the MPIs.  But, the len doesn't
        // include the tag (1 byte) or the length (2 bytes).
        let len = (9 - 3) + self.mpis().serialized_len();

        let mut header: Vec<u8> = Vec::with_capacity(9);

        // Tag.  Note: we use this whether the key is a primary key
        // or a subkey, and whether it contains secrets.
        header.push(0x99);

        // Length (big endian).
        header.extend_from_slice(&(len as u16).to_be_bytes());

        // Version.
        header.push(4);

        // Creation time.
        let creation_time: u32 =
            Timestamp::try_from(self.creation_time())
            .unwrap_or_else(|_| Timestamp::from(0))
            .into();
        header.extend_from_slice(&creation_time.to_be_bytes());

        // Algorithm.
        header.push(self.pk_algo().into());

        hash.update(&header[..]);

        // MPIs.
        self.mpis().hash(hash);
    }
}

impl Hash for Signature {
    fn hash(&self, hash: &mut Context) {
        match self {
            Signature::V4(sig) => sig.fields().hash(hash),
        }
    }
}

impl Hash for SignatureFields {
    fn hash(&self, hash: &mut Context) {
        use crate::serialize::MarshalInto;

        // A version 4 signature packet is laid out as follows:
        //
        //   version - 1 byte                    \
        //   type - 1 byte                        \
        //   pk_algo - 1 byte                      \
        //   hash_algo - 1 byte                      Included in the hash
        //   hashed_area_len - 2 bytes (big endian)/
        //   hashed_area                         _/
        //   ...                                 <- Not included in the hash
        let hashed_area = self.hashed_area().to_vec()
            .expect("subpacket area serialization is infallible");

        let mut header = [0u8; 6];

        // Version.
        header[0] = 4;
        header[1] = self.typ().into();
        header[2] = self.pk_algo().into();
        header[3] = self.hash_algo().into();

        // The length of the hashed area, as a 16-bit big endian
        // number.
        let len = hashed_area.len() as u16;
        header[4..6].copy_from_slice(&len.to_be_bytes());

        hash.update(&header[..]);
        hash.update(&hashed_area);

        // A version 4 signature trailer is:
        //
        //   version - 1 byte
        //   0xFF (constant) - 1 byte
        //   amount - 4 bytes (big endian)
        //
        // The amount field is the amount of hashed from this packet
        // (this excludes the message content, and this trailer).
        //
        // See https://tools.ietf.org/html/rfc4880#section-5.2.4
        let mut trailer = [0u8; 6];

        trailer[0] = 0x4;
        trailer[1] = 0xff;
        // The signature packet's length, not including the previous
        // two bytes and the length.
        let len = (header.len() + hashed_area.len()) as u32;
        trailer[2..6].copy_from_slice(&len.to_be_bytes());

        hash.update(&trailer[..]);
    }
}

/// Hashing-related functionality.
///
/// <a id="hashing-functions"></a>
impl Signature {
    /// Computes the message digest of standalone signatures.
    pub fn hash_standalone(fields: &SignatureFields) -> Result<Vec<u8>> {
        let mut h = fields.hash_algo().context()?;

        fields.hash(&mut h);
        Ok(h.into_digest())
    }

    /// Computes the message digest of timestamp signatures.
    pub fn hash_timestamp(fields: &SignatureFields) -> Result<Vec<u8>> {
        Self::hash_standalone(fields)
    }

    /// Returns the message digest of the direct key signature over
    /// the specified primary key.
    pub fn hash_direct_key<P>(fields: &SignatureFields,
                              key: &Key4<P, key::PrimaryRole>)
                              -> Result<Vec<u8>>
        where P: key::KeyParts,
    {
        let mut h = fields.hash_algo().context()?;

        key.hash(&mut h);
        fields.hash(&mut h);
        Ok(h.into_digest())
    }

    /// Returns the message digest of the subkey binding over the
    /// specified primary key and subkey.
    pub fn hash_subkey_binding<P, Q>(fields: &SignatureFields,
                                     key: &Key4<P, key::PrimaryRole>,
                                     subkey: &Key4<Q, key::SubordinateRole>)
                                     -> Result<Vec<u8>>
        where P: key::KeyParts,
              Q: key::KeyParts,
    {
        let mut h = fields.hash_algo().context()?;

        key.hash(&mut h);
        subkey.hash(&mut h);
        fields.hash(&mut h);
        Ok(h.into_digest())
    }

    /// Returns the message digest of the primary key binding over the
    /// specified primary key and subkey.
    ///
    /// This is the back signature (type 0x19) embedded in a signing
    /// subkey's binding signature: it hashes the same data as the
    /// subkey binding itself.
    pub fn hash_primary_key_binding<P, Q>(
        fields: &SignatureFields,
        key: &Key4<P, key::PrimaryRole>,
        subkey: &Key4<Q, key::SubordinateRole>)
        -> Result<Vec<u8>>
        where P: key::KeyParts,
              Q: key::KeyParts,
    {
        Self::hash_subkey_binding(fields, key, subkey)
    }

    /// Returns the message digest of the user ID binding over the
    /// specified primary key, user ID, and signature.
    pub fn hash_userid_binding<P>(fields: &SignatureFields,
                                  key: &Key4<P, key::PrimaryRole>,
                                  userid: &UserID)
                                  -> Result<Vec<u8>>
        where P: key::KeyParts,
    {
        let mut h = fields.hash_algo().context()?;

        key.hash(&mut h);
        userid.hash(&mut h);
        fields.hash(&mut h);
        Ok(h.into_digest())
    }

    /// Returns the message digest of the user attribute binding over
    /// the specified primary key, user attribute, and signature.
    pub fn hash_user_attribute_binding<P>(
        fields: &SignatureFields,
        key: &Key4<P, key::PrimaryRole>,
        ua: &UserAttribute)
        -> Result<Vec<u8>>
        where P: key::KeyParts,
    {
        let mut h = fields.hash_algo().context()?;

        key.hash(&mut h);
        ua.hash(&mut h);
        fields.hash(&mut h);
        Ok(h.into_digest())
    }
}

impl<P, R> Hash for Key<P, R>
    where P: key::KeyParts,
          R: key::KeyRole,
{
    fn hash(&self, hash: &mut Context) {
        match self {
            Key::V4(k) => k.hash(hash),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_digests_are_stable() {
        // Make sure the dispatch table produces working contexts,
        // and pin the well-known empty-input digests.
        let sha256 = HashAlgorithm::SHA256.context().unwrap().into_digest();
        assert_eq!(crate::fmt::hex::encode(&sha256),
                   "E3B0C44298FC1C149AFBF4C8996FB92427AE41E4649B934CA495991B7852B855");

        let sha1 = HashAlgorithm::SHA1.context().unwrap().into_digest();
        assert_eq!(crate::fmt::hex::encode(&sha1),
                   "DA39A3EE5E6B4B0D3255BFEF95601890AFD80709");

        let md5 = HashAlgorithm::MD5.context().unwrap().into_digest();
        assert_eq!(crate::fmt::hex::encode(&md5),
                   "D41D8CD98F00B204E9800998ECF8427E");
    }

    #[test]
    fn digest_sizes() {
        for algo in [HashAlgorithm::MD5, HashAlgorithm::SHA1,
                     HashAlgorithm::RipeMD, HashAlgorithm::SHA224,
                     HashAlgorithm::SHA256, HashAlgorithm::SHA384,
                     HashAlgorithm::SHA512] {
            let ctx = algo.context().unwrap();
            assert_eq!(ctx.digest_size(), algo.digest_size().unwrap());
        }
    }

    #[test]
    fn contexts_are_resumable_after_clone() {
        let mut a = HashAlgorithm::SHA256.context().unwrap();
        a.update(b"hello");
        let mut b = a.clone();
        a.update(b" world");
        b.update(b" world");
        assert_eq!(a.into_digest(), b.into_digest());
    }
}
