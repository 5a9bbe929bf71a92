//! Partial body length support.
//!
//! New-format packets may split their body into chunks using partial
//! body lengths ([Section 4.2.2.4 of RFC 4880]).  This module
//! provides a `BufferedReader` filter that presents such a chunked
//! body as one contiguous stream, reading the interleaved length
//! headers as it goes.
//!
//!   [Section 4.2.2.4 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-4.2.2.4

use std::cmp;
use std::fmt;
use std::io;

use buffered_reader::{BufferedReader, buffered_reader_generic_read_impl};

use crate::packet::header::BodyLength;
use crate::parse::Cookie;

/// A `BufferedReader` that transparently handles OpenPGP's chunking
/// scheme.
pub(crate) struct PartialBodyFilter<T: BufferedReader<Cookie>> {
    /// The underlying reader.
    inner: T,

    /// Number of bytes in the current chunk that still have to be
    /// pulled from `inner`.
    chunk_remaining: u32,

    /// Whether the current chunk is the last one.
    last: bool,

    /// Data pulled from `inner`, possibly spanning chunk headers.
    buffer: Vec<u8>,
    /// Position of the read cursor in `buffer`.
    cursor: usize,

    /// The reader's cookie.
    cookie: Cookie,
}

impl<T: BufferedReader<Cookie>> fmt::Display for PartialBodyFilter<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "PartialBodyFilter")
    }
}

impl<T: BufferedReader<Cookie>> fmt::Debug for PartialBodyFilter<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PartialBodyFilter")
            .field("chunk_remaining", &self.chunk_remaining)
            .field("last", &self.last)
            .field("buffered", &(self.buffer.len() - self.cursor))
            .field("inner", &self.inner)
            .finish()
    }
}

impl<T: BufferedReader<Cookie>> PartialBodyFilter<T> {
    /// Creates a partial body filter whose first chunk is
    /// `first_chunk_length` bytes long.
    pub fn with_cookie(inner: T, first_chunk_length: u32, cookie: Cookie)
                       -> Self {
        PartialBodyFilter {
            inner,
            chunk_remaining: first_chunk_length,
            last: false,
            buffer: Vec::new(),
            cursor: 0,
            cookie,
        }
    }

    /// Reads the next length header from the underlying reader.
    fn read_next_header(&mut self) -> io::Result<()> {
        debug_assert_eq!(self.chunk_remaining, 0);
        debug_assert!(!self.last);

        match BodyLength::parse_new_format(&mut self.inner)? {
            BodyLength::Full(l) => {
                self.chunk_remaining = l;
                self.last = true;
            }
            BodyLength::Partial(l) => {
                self.chunk_remaining = l;
            }
            BodyLength::Indeterminate => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "invalid length header in partial body"));
            }
        }
        Ok(())
    }

    fn data_helper(&mut self, amount: usize) -> io::Result<&[u8]> {
        // Compact the buffer.
        if self.cursor > 0 {
            crate::vec_drain_prefix(&mut self.buffer, self.cursor);
            self.cursor = 0;
        }

        while self.buffer.len() < amount
            && !(self.chunk_remaining == 0 && self.last)
        {
            if self.chunk_remaining == 0 {
                self.read_next_header()?;
                continue;
            }

            let want = cmp::max(
                1, cmp::min(self.chunk_remaining as usize,
                            amount - self.buffer.len()));
            let data = self.inner.data(want)?;
            if data.is_empty() {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "truncated partial body"));
            }

            let n = cmp::min(data.len(), self.chunk_remaining as usize);
            self.buffer.extend_from_slice(&data[..n]);
            self.inner.consume(n);
            self.chunk_remaining -= n as u32;
        }

        Ok(&self.buffer[..])
    }
}

impl<T: BufferedReader<Cookie>> io::Read for PartialBodyFilter<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        buffered_reader_generic_read_impl(self, buf)
    }
}

impl<T: BufferedReader<Cookie>> BufferedReader<Cookie>
    for PartialBodyFilter<T>
{
    fn buffer(&self) -> &[u8] {
        &self.buffer[self.cursor..]
    }

    fn data(&mut self, amount: usize) -> io::Result<&[u8]> {
        self.data_helper(amount)
    }

    fn consume(&mut self, amount: usize) -> &[u8] {
        assert!(amount <= self.buffer.len() - self.cursor,
                "consuming unbuffered data");
        let o = self.cursor;
        self.cursor += amount;
        &self.buffer[o..]
    }

    fn data_consume(&mut self, amount: usize) -> io::Result<&[u8]> {
        let amount = cmp::min(amount, self.data_helper(amount)?.len());
        Ok(self.consume(amount))
    }

    fn data_consume_hard(&mut self, amount: usize) -> io::Result<&[u8]> {
        let len = self.data_helper(amount)?.len();
        if len < amount {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "truncated partial body"));
        }
        Ok(self.consume(amount))
    }

    fn get_mut(&mut self) -> Option<&mut dyn BufferedReader<Cookie>> {
        Some(&mut self.inner)
    }

    fn get_ref(&self) -> Option<&dyn BufferedReader<Cookie>> {
        Some(&self.inner)
    }

    fn into_inner<'b>(self: Box<Self>)
                      -> Option<Box<dyn BufferedReader<Cookie> + 'b>>
        where Self: 'b,
    {
        Some(Box::new(self.inner))
    }

    fn cookie_set(&mut self, cookie: Cookie) -> Cookie {
        std::mem::replace(&mut self.cookie, cookie)
    }

    fn cookie_ref(&self) -> &Cookie {
        &self.cookie
    }

    fn cookie_mut(&mut self) -> &mut Cookie {
        &mut self.cookie
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Builds a partial-body encoded stream: chunks of 512 bytes,
    // closed by a five-octet final length.
    fn chunked(data: &[u8]) -> (u32, Vec<u8>) {
        let mut out = Vec::new();
        let mut chunks = data.chunks(512).peekable();
        let mut first = None;
        while let Some(chunk) = chunks.next() {
            let last = chunks.peek().is_none() || chunk.len() < 512;
            if first.is_none() {
                assert!(!last);
                first = Some(chunk.len() as u32);
            } else if last {
                out.push(255);
                out.extend_from_slice(&(chunk.len() as u32).to_be_bytes());
            } else {
                // 512 = 2^9.
                out.push(224 + 9);
            }
            out.extend_from_slice(chunk);
            if last {
                break;
            }
        }
        (first.expect("at least two chunks"), out)
    }

    #[test]
    fn dechunking() {
        let data = (0..2000u32).map(|i| i as u8).collect::<Vec<_>>();
        let (first, encoded) = chunked(&data);
        assert_eq!(first, 512);

        let inner = buffered_reader::Memory::with_cookie(
            &encoded, Cookie::default());
        let mut pbf = PartialBodyFilter::with_cookie(
            inner, first, Cookie::default());

        let got = pbf.steal_eof().unwrap();
        assert_eq!(got, data);
    }

    #[test]
    fn truncation_is_an_error() {
        let data = vec![0u8; 1024];
        let (first, mut encoded) = chunked(&data);
        encoded.truncate(encoded.len() - 10);

        let inner = buffered_reader::Memory::with_cookie(
            &encoded, Cookie::default());
        let mut pbf = PartialBodyFilter::with_cookie(
            inner, first, Cookie::default());

        assert!(pbf.steal_eof().is_err());
    }
}
