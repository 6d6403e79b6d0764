//! Frame-exact, randomly seekable reading on top of a [`BlockDecoder`].
//!
//! Block-transform decoders (AAC in particular) cannot start decoding at an
//! arbitrary frame: their output only becomes bit-exact after a run-up of
//! prior frames, their native seek is approximate, and they produce blocks
//! that do not line up with the ranges callers ask for. [`SeekableDecoder`]
//! hides all three behind [`read`](SeekableDecoder::read) and
//! [`seek`](SeekableDecoder::seek) addressed by [`FrameIndex`].
//!
//! Failures never cross the read/seek API. A read that comes back shorter
//! than requested, together with [`position`](SeekableDecoder::position)
//! being [`FramePosition::Unknown`], [`is_alive`](SeekableDecoder::is_alive)
//! turning false or [`format_changed`](SeekableDecoder::format_changed)
//! turning true, is how callers observe them. Every failure is logged where
//! it is detected.

use std::time::Duration;

use crate::common::{assert_error_traits, samples_to_frames};
use crate::decoder::{DecoderBuilder, DecoderError, Settings};
use crate::math::frames_to_duration;
use crate::read_ahead::ReadAheadSampleBuffer;
use crate::{
    BlockDecoder, ChannelCount, FrameIndex, FrameIndexRange, FramePosition, NativeFormat,
    SampleRate, StreamUnitConverter,
};

mod read;
mod seek;

/// Error opening a [`SeekableDecoder`]. No adapter is returned on failure.
#[derive(Debug, thiserror::Error, Clone)]
pub enum OpenError {
    /// The builder was not given a block decoder.
    #[error("No block decoder was provided")]
    NoDecoder,
    /// The decoder could not restrict itself to an audio stream.
    #[error("Failed to select an audio stream")]
    SelectStream(#[source] DecoderError),
    /// Output format negotiation failed.
    #[error("Failed to configure the output format")]
    Format(#[source] DecoderError),
    /// Duration or other stream properties could not be read.
    #[error("Failed to read stream properties")]
    Properties(#[source] DecoderError),
    /// The decoder could not be positioned at the start of the stream.
    #[error("Failed to position the decoder at the start of the stream")]
    Positioning,
}
assert_error_traits!(OpenError);

/// Owning wrapper around the block decoder. Once released the decoder is
/// gone for good; dropping the handle releases it as well.
#[derive(Debug)]
struct DecoderHandle<D> {
    inner: Option<D>,
}

impl<D> DecoderHandle<D> {
    fn new(decoder: D) -> Self {
        Self {
            inner: Some(decoder),
        }
    }

    #[inline]
    fn get(&self) -> Option<&D> {
        self.inner.as_ref()
    }

    #[inline]
    fn get_mut(&mut self) -> Option<&mut D> {
        self.inner.as_mut()
    }

    #[inline]
    fn is_alive(&self) -> bool {
        self.inner.is_some()
    }

    fn release(&mut self) {
        if let Some(decoder) = self.inner.take() {
            drop(decoder);
            tracing::debug!("released block decoder");
        }
    }
}

impl<D> Drop for DecoderHandle<D> {
    fn drop(&mut self) {
        self.release();
    }
}

/// A sample-accurate, seekable frame reader.
///
/// Single threaded and blocking: every call runs on the caller's thread until
/// the decoder responds. Share an instance between threads only behind
/// external synchronization.
#[derive(Debug)]
pub struct SeekableDecoder<D: BlockDecoder> {
    decoder: DecoderHandle<D>,
    format: NativeFormat,
    converter: StreamUnitConverter,
    frame_index_range: FrameIndexRange,
    bitrate_kbps: Option<u32>,
    prefetch_frames: usize,
    buffer: ReadAheadSampleBuffer,
    position: FramePosition,
    /// Set once the decoder reported a format change. The decoder is kept but
    /// never called again.
    format_changed: bool,
}

impl<D: BlockDecoder> SeekableDecoder<D> {
    /// Starts configuring an adapter, see [`DecoderBuilder`].
    pub fn builder() -> DecoderBuilder<D> {
        DecoderBuilder::new()
    }

    /// Opens an adapter with default [`Settings`].
    pub fn new(decoder: D) -> Result<Self, OpenError> {
        Self::open(decoder, Settings::default())
    }

    /// Takes over an opened decoder: selects its audio stream, negotiates the
    /// output format, reads the stream extent and positions at the first frame.
    pub fn open(mut decoder: D, settings: Settings) -> Result<Self, OpenError> {
        decoder.select_stream().map_err(|err| {
            tracing::warn!(%err, "failed to select audio stream");
            OpenError::SelectStream(err)
        })?;

        let params = settings.params;
        decoder.set_output_format(&params).map_err(|err| {
            tracing::warn!(%err, ?params, "failed to configure output format");
            OpenError::Format(err)
        })?;
        let format = decoder.current_format().map_err(|err| {
            tracing::warn!(%err, "failed to retrieve negotiated output format");
            OpenError::Format(err)
        })?;
        let channels_honored = params.channels.is_none_or(|c| c == format.channels);
        let rate_honored = params.sample_rate.is_none_or(|r| r == format.sample_rate);
        if !channels_honored || !rate_honored {
            tracing::warn!(?params, ?format, "decoder ignored requested output format");
            return Err(OpenError::Format(DecoderError::UnsupportedOutputFormat {
                channels: params.channels,
                sample_rate: params.sample_rate,
            }));
        }

        let converter = StreamUnitConverter::new(format.sample_rate, decoder.time_base());
        let duration = decoder.duration().map_err(|err| {
            tracing::warn!(%err, "failed to read stream duration");
            OpenError::Properties(err)
        })?;
        let frame_index_range = FrameIndexRange::between(0, converter.to_frame_index(duration));
        let bitrate_kbps = decoder.average_bitrate();

        let capacity = settings
            .buffer_capacity
            .max(decoder.preferred_block_samples().unwrap_or(0))
            .max(1);
        tracing::debug!(
            channels = format.channels.get(),
            sample_rate = format.sample_rate.get(),
            range = %frame_index_range,
            capacity,
            "opened block decoder"
        );

        let mut adapter = Self {
            decoder: DecoderHandle::new(decoder),
            format,
            converter,
            frame_index_range,
            bitrate_kbps,
            prefetch_frames: settings.prefetch_frames,
            buffer: ReadAheadSampleBuffer::with_capacity(capacity),
            position: FramePosition::Unknown,
            format_changed: false,
        };

        // Positioning from an unknown state forces a native seek, which
        // skips over any header or priming data in front of the first frame.
        let first = adapter.frame_index_min();
        adapter.seek(first);
        if adapter.position != FramePosition::Known(first) {
            return Err(OpenError::Positioning);
        }
        Ok(adapter)
    }

    /// Releases the decoder and discards buffered frames. Safe to call repeatedly;
    /// afterwards every read returns an empty range.
    pub fn close(&mut self) {
        if self.decoder.is_alive() {
            tracing::debug!("closing seekable decoder");
        }
        self.decoder.release();
        self.invalidate_position();
    }

    /// The addressable frames of the stream, fixed at open time.
    #[inline]
    pub fn frame_index_range(&self) -> FrameIndexRange {
        self.frame_index_range
    }

    #[inline]
    pub fn frame_index_min(&self) -> FrameIndex {
        self.frame_index_range.start()
    }

    /// One past the last frame.
    #[inline]
    pub fn frame_index_max(&self) -> FrameIndex {
        self.frame_index_range.end()
    }

    #[inline]
    pub fn channels(&self) -> ChannelCount {
        self.format.channels
    }

    #[inline]
    pub fn sample_rate(&self) -> SampleRate {
        self.format.sample_rate
    }

    /// Length of the stream.
    pub fn duration(&self) -> Duration {
        frames_to_duration(self.frame_index_range.len() as FrameIndex, self.sample_rate())
    }

    /// Average bitrate in kbit/s as reported when opening.
    #[inline]
    pub fn bitrate_kbps(&self) -> Option<u32> {
        self.bitrate_kbps
    }

    /// Index of the frame the next read continues from.
    #[inline]
    pub fn position(&self) -> FramePosition {
        self.position
    }

    /// False once the decoder was released, by [`close`](Self::close) or after
    /// an unrecoverable error.
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.decoder.is_alive()
    }

    /// True after the decoder changed its output format mid-stream. Reads and
    /// seeks produce nothing from then on.
    #[inline]
    pub fn format_changed(&self) -> bool {
        self.format_changed
    }

    /// The wrapped decoder, while it is alive.
    pub fn decoder(&self) -> Option<&D> {
        self.decoder.get()
    }

    #[inline]
    pub fn prefetch_frames(&self) -> usize {
        self.prefetch_frames
    }

    /// Capacity of the look-ahead buffer in samples.
    #[inline]
    pub fn read_ahead_capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Frames decoded ahead of [`position`](Self::position).
    #[inline]
    pub fn buffered_frames(&self) -> usize {
        samples_to_frames(self.buffer.readable_len(), self.format.channels)
    }

    /// Forgets where the decoder is and everything decoded ahead.
    fn invalidate_position(&mut self) {
        self.buffer.clear();
        self.position = FramePosition::Unknown;
    }

    /// Stops using the decoder after it changed its output format, without
    /// releasing it.
    fn stop_on_format_change(&mut self) {
        tracing::warn!(
            position = %self.position,
            "output format of the decoder changed, abort decoding"
        );
        self.format_changed = true;
        self.invalidate_position();
    }

    /// Releases the decoder after an unrecoverable failure.
    fn kill_decoder(&mut self) {
        tracing::warn!(position = %self.position, "stop decoding permanently");
        self.decoder.release();
        self.invalidate_position();
    }
}
