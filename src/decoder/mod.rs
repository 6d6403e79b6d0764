//! The block decoder capability consumed by [`SeekableDecoder`](crate::SeekableDecoder).
//!
//! A block decoder is a stateful engine that, once positioned, hands out
//! decoded PCM in blocks of arbitrary size, each stamped with an approximate
//! position in the decoder's native time unit. It knows nothing about frame
//! indices; all exact accounting happens in the adapter.
//!
//! The trait is deliberately narrow so the seek and read algorithms can be
//! exercised against deterministic stubs. A [Symphonia](https://github.com/pdeljanov/Symphonia)
//! backed implementation is available with the `symphonia` feature.

use std::ops::Deref;
use std::sync::Arc;

use crate::common::assert_error_traits;
use crate::{ChannelCount, NativePosition, NativeTimeBase, Sample, SampleRate};

mod builder;
#[cfg(feature = "symphonia")]
mod read_seek_source;
#[cfg(feature = "symphonia")]
pub mod symphonia;

pub use builder::{DecoderBuilder, OpenParams, Settings};
#[cfg(feature = "symphonia")]
pub use read_seek_source::ReadSeekSource;

/// PCM layout negotiated with a decoder. Samples are always interleaved [`Sample`]s.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NativeFormat {
    pub channels: ChannelCount,
    pub sample_rate: SampleRate,
}

/// Outcome of pulling the next block from a [`BlockDecoder`].
#[derive(Debug)]
pub enum BlockResult<B> {
    /// A block of decoded samples.
    Block(B),
    /// The stream has no more data. Not an error.
    EndOfStream,
    /// The stream is broken; the decoder must not be used again.
    Error(DecoderError),
    /// The output format changed mid-stream, which cannot be handled once opened.
    FormatChanged,
}

/// One block of decoded audio, possibly split over several physical sub-buffers.
pub trait DecodedBlock {
    /// Scoped access to the samples of one sub-buffer. Releasing the guard
    /// (dropping it) releases the underlying native buffer.
    type Locked<'a>: Deref<Target = [Sample]>
    where
        Self: 'a;

    /// Approximate stream position of the first frame, in native units.
    fn timestamp(&self) -> NativePosition;

    fn sub_buffer_count(&self) -> usize;

    /// Number of interleaved samples over all sub-buffers.
    fn total_samples(&self) -> usize;

    /// Acquires sub-buffer `index` for reading.
    fn lock(&self, index: usize) -> Result<Self::Locked<'_>, DecoderError>;
}

/// A stateful decoder restricted to a single elementary audio stream.
///
/// Dropping the decoder releases every resource it holds.
pub trait BlockDecoder {
    type Block: DecodedBlock;

    /// Restricts decoding to the first audio stream.
    fn select_stream(&mut self) -> Result<(), DecoderError>;

    /// The PCM format the decoder currently produces.
    fn current_format(&self) -> Result<NativeFormat, DecoderError>;

    /// Requests a channel count and/or sample rate. Decoders that cannot
    /// convert only accept requests matching what they already produce.
    fn set_output_format(&mut self, params: &OpenParams) -> Result<(), DecoderError> {
        let current = self.current_format()?;
        let channels_match = params.channels.is_none_or(|c| c == current.channels);
        let rate_match = params.sample_rate.is_none_or(|r| r == current.sample_rate);
        if channels_match && rate_match {
            Ok(())
        } else {
            Err(DecoderError::UnsupportedOutputFormat {
                channels: params.channels,
                sample_rate: params.sample_rate,
            })
        }
    }

    /// Length of one native position unit.
    fn time_base(&self) -> NativeTimeBase;

    /// Duration of the stream in native units.
    fn duration(&self) -> Result<NativePosition, DecoderError>;

    /// Average bitrate in kbit/s, if known.
    fn average_bitrate(&self) -> Option<u32> {
        None
    }

    /// Typical number of interleaved samples per block, used to size the
    /// look-ahead buffer up front.
    fn preferred_block_samples(&self) -> Option<usize> {
        None
    }

    /// Repositions the decoder. The position actually reached is only
    /// known once the next block reports its timestamp.
    fn set_position(&mut self, position: NativePosition) -> Result<(), DecoderError>;

    fn read_next_block(&mut self) -> BlockResult<Self::Block>;
}

/// Errors reported by a [`BlockDecoder`].
#[derive(Debug, thiserror::Error, Clone)]
pub enum DecoderError {
    /// The input contains no audio stream that can be decoded.
    #[error("No audio stream available")]
    NoStreams,

    /// The input format is not recognized or not supported.
    #[error("Unrecognized or unsupported format")]
    UnrecognizedFormat,

    /// Sample rate or channel layout are not reported by the stream.
    #[error("The output format of the stream is unknown")]
    UnknownFormat,

    /// The requested output format cannot be produced.
    #[error("Cannot produce {channels:?} channels at {sample_rate:?} Hz")]
    UnsupportedOutputFormat {
        channels: Option<ChannelCount>,
        sample_rate: Option<SampleRate>,
    },

    /// The duration of the stream cannot be determined.
    #[error("The duration of the stream is unknown")]
    UnknownDuration,

    /// Repositioning the decoder failed.
    #[error("Failed to set position {position}: {reason}")]
    Seek {
        position: NativePosition,
        reason: String,
    },

    /// The stream contained malformed data.
    #[error("Decoding failed: {0}")]
    Decode(String),

    /// A sub-buffer of a decoded block could not be acquired.
    #[error("Failed to lock sub-buffer {index} of decoded block")]
    BufferLock { index: usize },

    /// Reading from the underlying data source failed.
    #[error("I/O failure")]
    Io(#[source] Arc<std::io::Error>),
}
assert_error_traits!(DecoderError);

impl From<std::io::Error> for DecoderError {
    fn from(err: std::io::Error) -> Self {
        DecoderError::Io(Arc::new(err))
    }
}
