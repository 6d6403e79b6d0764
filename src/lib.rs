//! Sample-accurate, randomly seekable reading of compressed audio.
//!
//! Block-transform codecs such as AAC are decoded in blocks whose boundaries
//! rarely match what a caller asks for, their native seek only lands close to
//! the requested position, and their output after a seek only becomes exact
//! after a run-up of prior frames. This crate wraps such a decoder (anything
//! implementing [`BlockDecoder`]) in a [`SeekableDecoder`] that hands out any
//! range of frames, addressed by [`FrameIndex`], exactly as a sequential
//! decode from the start of the stream would have produced them.
//!
//! # Usage
//!
//! ```no_run
//! # #[cfg(feature = "symphonia")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use std::fs::File;
//! use seekable_decoder::decoder::symphonia::SymphoniaBlockDecoder;
//! use seekable_decoder::{FrameIndexRange, SeekableDecoder};
//!
//! let file = File::open("track.m4a")?;
//! let decoder = SymphoniaBlockDecoder::builder()
//!     .with_byte_len(file.metadata()?.len())
//!     .build(file)?;
//! let mut seekable = SeekableDecoder::new(decoder)?;
//!
//! // Read one second of audio starting ten seconds in.
//! let rate = seekable.sample_rate().get() as i64;
//! let channels = seekable.channels().get() as usize;
//! let mut samples = vec![0.0; rate as usize * channels];
//! let range = FrameIndexRange::forward(10 * rate, rate as usize);
//! let read = seekable.read(range, Some(samples.as_mut_slice()));
//! println!("decoded frames {read}");
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "symphonia"))]
//! # fn main() {}
//! ```
//!
//! A [`SeekableSource`] turns the adapter into an iterator of interleaved
//! samples for consumers that pull audio sample by sample.
//!
//! # Optional Features
//!
//! - `symphonia`: the [`decoder::symphonia`] backend, without any codec.
//! - `mp4` (default): MP4 demuxing and AAC decoding through Symphonia.
//! - `wav`: uncompressed WAV through Symphonia.
//! - `symphonia-*`: individual Symphonia demuxers and codecs.
//!
//! # Logging
//!
//! Failures never surface through [`SeekableDecoder::read`] or
//! [`SeekableDecoder::seek`]. They are reported through [`tracing`] events
//! where they are detected; install a subscriber to see them.

#![cfg_attr(docsrs, feature(doc_cfg))]

mod common;
mod index_range;
mod read_ahead;
mod seekable;
mod stream_unit;

pub mod decoder;
pub mod math;
pub mod source;

pub use crate::common::{ChannelCount, FrameIndex, NativePosition, Sample, SampleRate};
pub use crate::decoder::{
    BlockDecoder, BlockResult, DecodedBlock, DecoderBuilder, DecoderError, NativeFormat,
    OpenParams, Settings,
};
pub use crate::index_range::{FrameIndexRange, FramePosition};
pub use crate::read_ahead::ReadAheadSampleBuffer;
pub use crate::seekable::{OpenError, SeekableDecoder};
pub use crate::source::{SeekError, SeekableSource, Source};
pub use crate::stream_unit::{NativeTimeBase, StreamUnitConverter};
