//! Byte input for the Symphonia backend.
//!
//! Symphonia reads the container through a [`MediaSource`]. Its byte length
//! is what [`average_bitrate`](crate::BlockDecoder::average_bitrate) divides
//! by the stream duration, so it is carried along with the reader.

use std::io::{Read, Result, Seek, SeekFrom};

use symphonia::core::io::MediaSource;

/// A `Read + Seek` input of known length. When the caller does not know the
/// length, [`measure`](Self::measure) finds it by seeking to the end.
pub struct ReadSeekSource<T: Read + Seek + Send + Sync> {
    inner: T,
    byte_len: Option<u64>,
}

impl<T: Read + Seek + Send + Sync> ReadSeekSource<T> {
    #[inline]
    pub fn new(inner: T, byte_len: Option<u64>) -> Self {
        ReadSeekSource { inner, byte_len }
    }

    /// Wraps `inner` and determines its length. The read position is
    /// restored afterwards.
    pub fn measure(mut inner: T) -> Result<Self> {
        let current = inner.stream_position()?;
        let end = inner.seek(SeekFrom::End(0))?;
        if current != end {
            inner.seek(SeekFrom::Start(current))?;
        }
        Ok(Self::new(inner, Some(end)))
    }
}

impl<T: Read + Seek + Send + Sync> MediaSource for ReadSeekSource<T> {
    #[inline]
    fn is_seekable(&self) -> bool {
        true
    }

    #[inline]
    fn byte_len(&self) -> Option<u64> {
        self.byte_len
    }
}

impl<T: Read + Seek + Send + Sync> Read for ReadSeekSource<T> {
    #[inline]
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.inner.read(buf)
    }
}

impl<T: Read + Seek + Send + Sync> Seek for ReadSeekSource<T> {
    #[inline]
    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        self.inner.seek(pos)
    }
}
