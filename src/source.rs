//! The byte-source seam between the decoder and the outside world. The
//! decoder only ever asks for "the next N bytes".

/// An ordered byte stream with sequential read semantics.
pub trait ByteSource {
    /// Read up to `buf.len()` bytes into `buf`, returning how many were
    /// produced. Returning fewer than requested means the stream has ended;
    /// the decoder reports that as [`FormatError::Truncated`] when it happens
    /// mid-record.
    ///
    /// [`FormatError::Truncated`]: crate::FormatError::Truncated
    fn fill(&mut self, buf: &mut [u8]) -> usize;
}

impl ByteSource for &[u8] {
    fn fill(&mut self, buf: &mut [u8]) -> usize {
        let n = self.len().min(buf.len());
        buf[..n].copy_from_slice(&self[..n]);
        *self = &self[n..];
        n
    }
}

/// Adapter lifting any [`std::io::Read`] into a [`ByteSource`].
///
/// Read errors other than `Interrupted` are treated as end of stream, which
/// the decoder then reports as a truncation at the point it hit.
#[cfg(feature = "std")]
pub struct ReadSource<R> {
    inner: R,
}

#[cfg(feature = "std")]
impl<R: std::io::Read> ReadSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

#[cfg(feature = "std")]
impl<R: std::io::Read> ByteSource for ReadSource<R> {
    fn fill(&mut self, buf: &mut [u8]) -> usize {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
        filled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_source_consumes_from_the_front() {
        let mut source: &[u8] = &[1, 2, 3, 4, 5];
        let mut buf = [0u8; 2];

        assert_eq!(source.fill(&mut buf), 2);
        assert_eq!(buf, [1, 2]);
        assert_eq!(source.fill(&mut buf), 2);
        assert_eq!(buf, [3, 4]);
        assert_eq!(source.fill(&mut buf), 1);
        assert_eq!(buf[0], 5);
        assert_eq!(source.fill(&mut buf), 0);
    }

    #[cfg(feature = "std")]
    #[test]
    fn read_source_fills_across_short_reads() {
        // io::Read over a slice is allowed to return short counts; the
        // adapter must keep pulling until the buffer is full or the stream
        // ends.
        struct OneByteAtATime<'a>(&'a [u8]);

        impl std::io::Read for OneByteAtATime<'_> {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                if self.0.is_empty() || buf.is_empty() {
                    return Ok(0);
                }
                buf[0] = self.0[0];
                self.0 = &self.0[1..];
                Ok(1)
            }
        }

        let mut source = ReadSource::new(OneByteAtATime(&[9, 8, 7]));
        let mut buf = [0u8; 8];
        assert_eq!(source.fill(&mut buf), 3);
        assert_eq!(&buf[..3], &[9, 8, 7]);
    }
}
