//! Memory protection and encryption.
//!
//! Sensitive data like secret keys, session keys, and passwords need
//! additional protection: they are stored in buffers that are
//! zeroized on drop, and compared in constant time.

use std::cmp::{min, Ordering};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Deref, DerefMut};

/// Protected memory.
///
/// The memory is guaranteed not to be copied around, and is cleared
/// when the object is dropped.
#[derive(Clone)]
pub struct Protected(Box<[u8]>);
assert_send_and_sync!(Protected);

impl PartialEq for Protected {
    fn eq(&self, other: &Self) -> bool {
        secure_cmp(&self.0, &other.0) == Ordering::Equal
    }
}

impl Eq for Protected {}

impl Hash for Protected {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl Protected {
    /// Allocates a chunk of protected memory.
    pub fn new(size: usize) -> Protected {
        vec![0; size].into()
    }

    /// Converts to a buffer for modification.
    ///
    /// Don't expose `Protected` values unless you know what you're
    /// doing.
    pub(crate) fn expose_into_unprotected_vec(self) -> Vec<u8> {
        let mut p = Vec::with_capacity(self.len());
        p.extend_from_slice(&self);
        p
    }
}

impl Deref for Protected {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<[u8]> for Protected {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl AsMut<[u8]> for Protected {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

impl DerefMut for Protected {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

impl From<Vec<u8>> for Protected {
    fn from(mut v: Vec<u8>) -> Self {
        // Make a vanilla copy of the data.  The byte buffers will not
        // be reallocated anymore, hence will not be copied around by
        // the allocator behind our back.
        let p = Protected(v.as_slice().into());
        unsafe {
            memsec::memzero(v.as_mut_ptr(), v.len());
        }
        drop(v);
        p
    }
}

impl From<Box<[u8]>> for Protected {
    fn from(mut v: Box<[u8]>) -> Self {
        // Make a vanilla copy of the data.
        let p = Protected(v.as_ref().into());
        unsafe {
            memsec::memzero(v.as_mut_ptr(), v.len());
        }
        drop(v);
        p
    }
}

impl From<&[u8]> for Protected {
    fn from(v: &[u8]) -> Self {
        Protected(v.into())
    }
}

impl<const N: usize> From<[u8; N]> for Protected {
    fn from(mut v: [u8; N]) -> Self {
        let p = Protected(v.as_ref().into());
        unsafe {
            memsec::memzero(v.as_mut_ptr(), v.len());
        }
        p
    }
}

impl Drop for Protected {
    fn drop(&mut self) {
        unsafe {
            memsec::memzero(self.0.as_mut_ptr(), self.0.len());
        }
    }
}

impl fmt::Debug for Protected {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if cfg!(debug_assertions) {
            write!(f, "{:?}", self.0)
        } else {
            f.write_str("[<Redacted>]")
        }
    }
}

/// Time-constant comparison.
pub fn secure_cmp(a: &[u8], b: &[u8]) -> Ordering {
    let ord1 = a.len().cmp(&b.len());
    let ord2 = unsafe {
        memsec::memcmp(a.as_ptr(), b.as_ptr(), min(a.len(), b.len()))
    };
    let ord2 = match ord2 {
        0 => Ordering::Equal,
        a if a < 0 => Ordering::Less,
        a if a > 0 => Ordering::Greater,
        _ => unreachable!(),
    };

    if ord1 == Ordering::Equal { ord2 } else { ord1 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protected_retains_value() {
        let p: Protected = vec![1u8, 2, 3].into();
        assert_eq!(&p[..], &[1, 2, 3]);
        assert_eq!(p, Protected::from(&[1u8, 2, 3][..]));
        assert!(p != Protected::from(&[1u8, 2, 4][..]));
    }

    #[test]
    fn ordering() {
        assert_eq!(secure_cmp(b"ab", b"ab"), Ordering::Equal);
        assert_eq!(secure_cmp(b"ab", b"ac"), Ordering::Less);
        assert_eq!(secure_cmp(b"b", b"aa"), Ordering::Less);
    }
}
