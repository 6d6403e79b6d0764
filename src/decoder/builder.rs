//! Builder pattern for configuring and opening a [`SeekableDecoder`].
//!
//! # Examples
//!
//! ```no_run
//! # #[cfg(feature = "symphonia")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use std::fs::File;
//! use seekable_decoder::decoder::symphonia::SymphoniaBlockDecoder;
//! use seekable_decoder::{math::nz, SeekableDecoder};
//!
//! let file = File::open("audio.m4a")?;
//! let decoder = SymphoniaBlockDecoder::builder()
//!     .with_byte_len(file.metadata()?.len())
//!     .with_hint("m4a")
//!     .build(file)?;
//!
//! let mut seekable = SeekableDecoder::builder()
//!     .with_decoder(decoder)
//!     .with_channels(nz!(2))   // Ask for stereo output
//!     .with_prefetch_frames(2112)
//!     .build()?;
//! # let _ = &mut seekable;
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "symphonia"))]
//! # fn main() {}
//! ```
//!
//! # Settings
//!
//! - `channels` / `sample_rate` - Output format overrides passed to the decoder
//! - `prefetch_frames` - Frames decoded and discarded before a seek target
//! - `buffer_capacity` - Initial look-ahead capacity in samples

use crate::{BlockDecoder, ChannelCount, OpenError, SampleRate, SeekableDecoder};

/// Decoder delay of AAC family decoders.
///
/// "AAC Audio - Encoder Delay and Synchronization: The 2112 Sample Assumption":
/// without an explicit value, playback trims 2112 samples of decoder output
/// when starting from any point in the bitstream.
pub const DEFAULT_PREFETCH_FRAMES: usize = 2112;

/// Initial look-ahead capacity in samples. This is about what an AAC
/// decoder emits per block.
pub const DEFAULT_BUFFER_CAPACITY: usize = 4096;

/// Requested output format. Absent values keep what the decoder negotiates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OpenParams {
    pub channels: Option<ChannelCount>,
    pub sample_rate: Option<SampleRate>,
}

/// Configuration applied when opening a [`SeekableDecoder`].
#[derive(Clone, Debug)]
pub struct Settings {
    /// Overrides passed on to the decoder.
    pub(crate) params: OpenParams,

    /// Number of frames decoded and discarded ahead of a seek target before the
    /// decoder reproduces output at that position bit-exactly.
    /// Skipping forward is preferred over a native seek for any distance up to
    /// the buffered frames plus twice this value.
    pub(crate) prefetch_frames: usize,

    /// Initial capacity of the look-ahead buffer in samples.
    pub(crate) buffer_capacity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            params: OpenParams::default(),
            prefetch_frames: DEFAULT_PREFETCH_FRAMES,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

impl Settings {
    pub fn params(&self) -> &OpenParams {
        &self.params
    }

    pub fn prefetch_frames(&self) -> usize {
        self.prefetch_frames
    }

    pub fn buffer_capacity(&self) -> usize {
        self.buffer_capacity
    }
}

/// Builder for opening a [`SeekableDecoder`] on top of a [`BlockDecoder`].
#[derive(Clone, Debug)]
#[must_use]
pub struct DecoderBuilder<D> {
    decoder: Option<D>,
    settings: Settings,
}

impl<D> Default for DecoderBuilder<D> {
    fn default() -> Self {
        Self {
            decoder: None,
            settings: Settings::default(),
        }
    }
}

impl<D: BlockDecoder> DecoderBuilder<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the block decoder to wrap. The builder takes ownership; it is
    /// released when the resulting adapter is closed or dropped.
    pub fn with_decoder(mut self, decoder: D) -> Self {
        self.decoder = Some(decoder);
        self
    }

    /// Requests a specific number of output channels.
    pub fn with_channels(mut self, channels: ChannelCount) -> Self {
        self.settings.params.channels = Some(channels);
        self
    }

    /// Requests a specific output sample rate.
    pub fn with_sample_rate(mut self, sample_rate: SampleRate) -> Self {
        self.settings.params.sample_rate = Some(sample_rate);
        self
    }

    /// Sets both output format overrides at once.
    pub fn with_params(mut self, params: OpenParams) -> Self {
        self.settings.params = params;
        self
    }

    /// Sets the decoder delay to compensate for after native seeks.
    /// Defaults to [`DEFAULT_PREFETCH_FRAMES`]. Zero disables prefetching,
    /// which is only exact for decoders without inter-block state.
    pub fn with_prefetch_frames(mut self, prefetch_frames: usize) -> Self {
        self.settings.prefetch_frames = prefetch_frames;
        self
    }

    /// Sets the initial look-ahead capacity in samples. Values below one are
    /// raised to one; the buffer grows on demand regardless.
    pub fn with_buffer_capacity(mut self, samples: usize) -> Self {
        self.settings.buffer_capacity = samples.max(1);
        self
    }

    /// Opens the adapter.
    ///
    /// # Errors
    ///
    /// Returns [`OpenError::NoDecoder`] if no decoder was set, otherwise any
    /// configuration failure reported while opening.
    pub fn build(self) -> Result<SeekableDecoder<D>, OpenError> {
        let decoder = self.decoder.ok_or(OpenError::NoDecoder)?;
        SeekableDecoder::open(decoder, self.settings)
    }
}
