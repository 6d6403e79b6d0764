//! Pull-style access to a [`SeekableDecoder`] as a stream of samples.

use std::time::Duration;

use crate::common::{assert_error_traits, frames_to_samples};
use crate::math::duration_to_frames;
use crate::{
    BlockDecoder, ChannelCount, FrameIndex, FrameIndexRange, FramePosition, Sample, SampleRate,
    SeekableDecoder,
};

/// Frames decoded per refill of [`SeekableSource`].
pub const DEFAULT_CHUNK_FRAMES: usize = 1024;

/// A source of interleaved samples.
pub trait Source: Iterator<Item = Sample> {
    /// Returns the number of samples before the current span ends. `None` means
    /// "infinite" or "until the sound ends". Channel count and sample rate
    /// only change between spans.
    fn current_span_len(&self) -> Option<usize>;

    /// Returns the number of channels. Channels are always interleaved.
    fn channels(&self) -> ChannelCount;

    /// Returns the rate at which the source should be played. In number of samples per second.
    fn sample_rate(&self) -> SampleRate;

    /// Returns the total duration of this source, if known.
    fn total_duration(&self) -> Option<Duration>;

    /// Attempts to seek to a given position in the current source.
    ///
    /// On success the next sample is the first channel of the frame at `pos`.
    fn try_seek(&mut self, pos: Duration) -> Result<(), SeekError>;
}

/// Occurs when [`try_seek`](Source::try_seek) fails.
#[derive(Debug, thiserror::Error, Clone)]
pub enum SeekError {
    /// The decoder has been released and cannot seek anymore.
    #[error("The decoder has been released after an unrecoverable error")]
    DecoderDead,
    /// The decoder could not be positioned on the requested frame.
    #[error("Seeking did not reach frame {target}")]
    NotReached { target: FrameIndex },
}
assert_error_traits!(SeekError);

/// Iterates over the samples of a [`SeekableDecoder`], decoding a chunk of
/// frames at a time.
#[derive(Debug)]
pub struct SeekableSource<D: BlockDecoder> {
    decoder: SeekableDecoder<D>,
    chunk: Vec<Sample>,
    chunk_offset: usize,
    chunk_frames: usize,
    next_frame: FrameIndex,
}

impl<D: BlockDecoder> SeekableSource<D> {
    /// Starts iterating at the first frame of the stream.
    pub fn new(decoder: SeekableDecoder<D>) -> Self {
        let next_frame = decoder.frame_index_min();
        Self {
            decoder,
            chunk: Vec::new(),
            chunk_offset: 0,
            chunk_frames: DEFAULT_CHUNK_FRAMES,
            next_frame,
        }
    }

    /// Sets how many frames are decoded per refill. Zero is raised to one.
    pub fn with_chunk_frames(mut self, frames: usize) -> Self {
        self.chunk_frames = frames.max(1);
        self
    }

    #[inline]
    pub fn inner(&self) -> &SeekableDecoder<D> {
        &self.decoder
    }

    #[inline]
    pub fn into_inner(self) -> SeekableDecoder<D> {
        self.decoder
    }

    fn refill(&mut self) -> bool {
        let samples = frames_to_samples(self.chunk_frames, self.decoder.channels());
        self.chunk.resize(samples, 0.0);
        let range = FrameIndexRange::forward(self.next_frame, self.chunk_frames);
        let produced = self.decoder.read(range, Some(self.chunk.as_mut_slice()));
        self.chunk
            .truncate(frames_to_samples(produced.len(), self.decoder.channels()));
        self.chunk_offset = 0;
        self.next_frame += produced.len() as FrameIndex;
        !self.chunk.is_empty()
    }
}

impl<D: BlockDecoder> Iterator for SeekableSource<D> {
    type Item = Sample;

    #[inline]
    fn next(&mut self) -> Option<Sample> {
        if self.chunk_offset >= self.chunk.len() && !self.refill() {
            return None;
        }
        let sample = self.chunk[self.chunk_offset];
        self.chunk_offset += 1;
        Some(sample)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let buffered = self.chunk.len() - self.chunk_offset;
        let remaining = (self.decoder.frame_index_max() - self.next_frame).max(0) as usize;
        let upper = buffered + frames_to_samples(remaining, self.decoder.channels());
        (buffered, Some(upper))
    }
}

impl<D: BlockDecoder> Source for SeekableSource<D> {
    #[inline]
    fn current_span_len(&self) -> Option<usize> {
        None
    }

    #[inline]
    fn channels(&self) -> ChannelCount {
        self.decoder.channels()
    }

    #[inline]
    fn sample_rate(&self) -> SampleRate {
        self.decoder.sample_rate()
    }

    #[inline]
    fn total_duration(&self) -> Option<Duration> {
        Some(self.decoder.duration())
    }

    fn try_seek(&mut self, pos: Duration) -> Result<(), SeekError> {
        // saturate pos at the end of the source
        let target = self
            .decoder
            .frame_index_min()
            .saturating_add(duration_to_frames(pos, self.sample_rate()))
            .min(self.decoder.frame_index_max());

        self.chunk.clear();
        self.chunk_offset = 0;
        self.decoder.seek(target);

        if !self.decoder.is_alive() {
            return Err(SeekError::DecoderDead);
        }
        if self.decoder.position() != FramePosition::Known(target) {
            return Err(SeekError::NotReached { target });
        }
        self.next_frame = target;
        Ok(())
    }
}
