//! [`BlockDecoder`] backed by Symphonia's demuxers and codecs.
//!
//! Native positions are track timestamps in units of the track's time base.
//! Every decoded packet becomes one block with a single sub-buffer.

use std::fmt;
use std::io::{ErrorKind, Read, Seek};
use std::num::NonZero;
use std::sync::Arc;

use symphonia::{
    core::{
        audio::SampleBuffer,
        codecs::{CodecParameters, Decoder, DecoderOptions, CODEC_TYPE_NULL},
        errors::Error,
        formats::{FormatOptions, FormatReader, SeekMode, SeekTo},
        io::{MediaSource, MediaSourceStream},
        meta::MetadataOptions,
        probe::Hint,
    },
    default::{get_codecs, get_probe},
};

use super::{BlockDecoder, BlockResult, DecodedBlock, DecoderError, NativeFormat, ReadSeekSource};
use crate::{NativePosition, NativeTimeBase, Sample};

// Decoder errors are not considered fatal.
// The correct action is to just get a new packet and try again.
// But a decode error in more than 3 consecutive packets is fatal.
const MAX_DECODE_RETRIES: usize = 3;

/// Configures how the input is probed before decoding starts.
#[derive(Clone, Debug, Default)]
#[must_use]
pub struct SymphoniaBlockDecoderBuilder {
    byte_len: Option<u64>,
    hint: Option<String>,
    mime_type: Option<String>,
}

impl SymphoniaBlockDecoderBuilder {
    /// Length of the input in bytes. Measured by seeking to the end if not given.
    pub fn with_byte_len(mut self, byte_len: u64) -> Self {
        self.byte_len = Some(byte_len);
        self
    }

    /// File extension that helps picking the container format, like `"m4a"`.
    pub fn with_hint(mut self, hint: &str) -> Self {
        self.hint = Some(hint.to_string());
        self
    }

    /// MIME type that helps picking the container format, like `"audio/mp4"`.
    pub fn with_mime_type(mut self, mime_type: &str) -> Self {
        self.mime_type = Some(mime_type.to_string());
        self
    }

    /// Probes the container of `data` and picks the track to decode.
    ///
    /// # Errors
    ///
    /// [`DecoderError::UnrecognizedFormat`] if no demuxer accepts the input and
    /// [`DecoderError::NoStreams`] if it has no decodable track.
    pub fn build<R>(self, data: R) -> Result<SymphoniaBlockDecoder, DecoderError>
    where
        R: Read + Seek + Send + Sync + 'static,
    {
        let source = match self.byte_len {
            Some(byte_len) => ReadSeekSource::new(data, Some(byte_len)),
            None => ReadSeekSource::measure(data)?,
        };
        let byte_len = source.byte_len();
        let mss = MediaSourceStream::new(Box::new(source), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = self.hint.as_ref() {
            hint.with_extension(ext);
        }
        if let Some(typ) = self.mime_type.as_ref() {
            hint.mime_type(typ);
        }
        // Gapless trimming would shift packet timestamps against the decoded
        // frames; the adapter does its own positioning.
        let format_opts = FormatOptions {
            enable_gapless: false,
            ..Default::default()
        };
        let probed = get_probe()
            .format(&hint, mss, &format_opts, &MetadataOptions::default())
            .map_err(|err| match err {
                // Ran out of data before any demuxer recognized the input.
                Error::IoError(err) if err.kind() == ErrorKind::UnexpectedEof => {
                    DecoderError::UnrecognizedFormat
                }
                err => err.into(),
            })?;

        let track = probed
            .format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(DecoderError::NoStreams)?;
        tracing::debug!(track_id = track.id, codec = ?track.codec_params.codec, "probed input");

        Ok(SymphoniaBlockDecoder {
            track_id: track.id,
            params: track.codec_params.clone(),
            format: probed.format,
            decoder: None,
            byte_len,
        })
    }
}

/// Decodes one track of any container and codec compiled into Symphonia.
pub struct SymphoniaBlockDecoder {
    format: Box<dyn FormatReader>,
    /// Created by [`select_stream`](BlockDecoder::select_stream).
    decoder: Option<Box<dyn Decoder>>,
    track_id: u32,
    params: CodecParameters,
    byte_len: Option<u64>,
}

impl SymphoniaBlockDecoder {
    pub fn builder() -> SymphoniaBlockDecoderBuilder {
        SymphoniaBlockDecoderBuilder::default()
    }

    #[inline]
    pub fn track_id(&self) -> u32 {
        self.track_id
    }

    fn seconds_per_unit(&self) -> Option<(u64, u64)> {
        let time_base = self.params.time_base?;
        Some((u64::from(time_base.numer), u64::from(time_base.denom)))
    }
}

impl fmt::Debug for SymphoniaBlockDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymphoniaBlockDecoder")
            .field("track_id", &self.track_id)
            .field("codec", &self.params.codec)
            .field("selected", &self.decoder.is_some())
            .field("byte_len", &self.byte_len)
            .finish()
    }
}

impl BlockDecoder for SymphoniaBlockDecoder {
    type Block = SymphoniaBlock;

    fn select_stream(&mut self) -> Result<(), DecoderError> {
        let decoder = get_codecs().make(&self.params, &DecoderOptions::default())?;
        self.decoder = Some(decoder);
        Ok(())
    }

    fn current_format(&self) -> Result<NativeFormat, DecoderError> {
        let channels = self
            .params
            .channels
            .and_then(|channels| u16::try_from(channels.count()).ok())
            .and_then(NonZero::new)
            .ok_or(DecoderError::UnknownFormat)?;
        let sample_rate = self
            .params
            .sample_rate
            .and_then(NonZero::new)
            .ok_or(DecoderError::UnknownFormat)?;
        Ok(NativeFormat {
            channels,
            sample_rate,
        })
    }

    fn time_base(&self) -> NativeTimeBase {
        match (self.params.time_base, self.params.sample_rate) {
            (Some(time_base), _) => NativeTimeBase::new(time_base.numer, time_base.denom),
            (None, Some(rate)) if rate > 0 => NativeTimeBase::new(1, rate),
            _ => NativeTimeBase::HUNDRED_NANOS,
        }
    }

    fn duration(&self) -> Result<NativePosition, DecoderError> {
        self.params
            .n_frames
            .and_then(|frames| NativePosition::try_from(frames).ok())
            .ok_or(DecoderError::UnknownDuration)
    }

    fn average_bitrate(&self) -> Option<u32> {
        let bits = u128::from(self.byte_len?) * 8;
        let (numer, denom) = self.seconds_per_unit()?;
        let units = u128::from(self.params.n_frames?);
        // bits / (units * numer / denom) / 1000
        let divisor = units * u128::from(numer) * 1000;
        if divisor == 0 {
            return None;
        }
        u32::try_from(bits * u128::from(denom) / divisor).ok()
    }

    fn preferred_block_samples(&self) -> Option<usize> {
        let frames = self.params.max_frames_per_packet?;
        let channels = self.params.channels?.count() as u64;
        usize::try_from(frames * channels).ok()
    }

    fn set_position(&mut self, position: NativePosition) -> Result<(), DecoderError> {
        let ts = u64::try_from(position).map_err(|_| DecoderError::Seek {
            position,
            reason: "negative timestamp".into(),
        })?;
        let seeked = self
            .format
            .seek(
                SeekMode::Accurate,
                SeekTo::TimeStamp {
                    ts,
                    track_id: self.track_id,
                },
            )
            .map_err(|err| DecoderError::Seek {
                position,
                reason: err.to_string(),
            })?;
        tracing::trace!(
            required = seeked.required_ts,
            actual = seeked.actual_ts,
            "seeked demuxer"
        );
        if let Some(decoder) = self.decoder.as_mut() {
            decoder.reset();
        }
        Ok(())
    }

    fn read_next_block(&mut self) -> BlockResult<SymphoniaBlock> {
        let Some(decoder) = self.decoder.as_mut() else {
            return BlockResult::Error(DecoderError::NoStreams);
        };

        let mut decode_errors: usize = 0;
        loop {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(Error::IoError(err)) if err.kind() == ErrorKind::UnexpectedEof => {
                    return BlockResult::EndOfStream
                }
                Err(Error::ResetRequired) => return BlockResult::FormatChanged,
                Err(err) => return BlockResult::Error(err.into()),
            };

            // If the packet does not belong to the selected track, skip over it
            if packet.track_id() != self.track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    if decoded.frames() == 0 {
                        continue;
                    }
                    let spec = *decoded.spec();
                    let rate_changed = self.params.sample_rate.is_some_and(|r| r != spec.rate);
                    let channels_changed = self
                        .params
                        .channels
                        .is_some_and(|c| c.count() != spec.channels.count());
                    if rate_changed || channels_changed {
                        return BlockResult::FormatChanged;
                    }
                    let mut buffer = SampleBuffer::<Sample>::new(decoded.capacity() as u64, spec);
                    buffer.copy_interleaved_ref(decoded);
                    return BlockResult::Block(SymphoniaBlock {
                        timestamp: packet.ts() as NativePosition,
                        buffer,
                    });
                }
                Err(Error::DecodeError(reason)) => {
                    decode_errors += 1;
                    if decode_errors > MAX_DECODE_RETRIES {
                        return BlockResult::Error(DecoderError::Decode(reason.to_string()));
                    }
                    tracing::debug!(reason, decode_errors, "dropping undecodable packet");
                }
                Err(Error::ResetRequired) => return BlockResult::FormatChanged,
                Err(err) => return BlockResult::Error(err.into()),
            }
        }
    }
}

/// Samples decoded from one packet.
pub struct SymphoniaBlock {
    timestamp: NativePosition,
    buffer: SampleBuffer<Sample>,
}

impl fmt::Debug for SymphoniaBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymphoniaBlock")
            .field("timestamp", &self.timestamp)
            .field("samples", &self.buffer.len())
            .finish()
    }
}

impl DecodedBlock for SymphoniaBlock {
    type Locked<'a>
        = &'a [Sample]
    where
        Self: 'a;

    #[inline]
    fn timestamp(&self) -> NativePosition {
        self.timestamp
    }

    #[inline]
    fn sub_buffer_count(&self) -> usize {
        1
    }

    #[inline]
    fn total_samples(&self) -> usize {
        self.buffer.len()
    }

    fn lock(&self, index: usize) -> Result<&[Sample], DecoderError> {
        match index {
            0 => Ok(self.buffer.samples()),
            _ => Err(DecoderError::BufferLock { index }),
        }
    }
}

impl From<Error> for DecoderError {
    fn from(err: Error) -> Self {
        match err {
            Error::IoError(err) => DecoderError::Io(Arc::new(err)),
            Error::DecodeError(reason) => DecoderError::Decode(reason.to_string()),
            Error::Unsupported(_) => DecoderError::UnrecognizedFormat,
            other => DecoderError::Decode(other.to_string()),
        }
    }
}
