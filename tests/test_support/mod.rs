#![allow(dead_code)]
//! In a separate folder so it is not run as an integration test.
//!
//! A deterministic [`BlockDecoder`] whose every sample encodes its own
//! position: sample `ch` of frame `f` has the value `f * channels + ch`.
//! Behavior that real decoders show (approximate seeking, run-up after a seek,
//! odd block sizes, failures) can be switched on per test.
use std::cell::{Cell, RefCell};
use std::num::NonZero;
use std::rc::Rc;

use seekable_decoder::{
    BlockDecoder, BlockResult, ChannelCount, DecodedBlock, DecoderError, FrameIndex,
    FrameIndexRange, NativeFormat, NativePosition, NativeTimeBase, OpenParams, Sample, SampleRate,
    SeekableDecoder, StreamUnitConverter,
};

/// Value produced for frames decoded while the stub is still priming.
pub const PRIMING_SAMPLE: Sample = -1.0;

pub fn sample_value(frame: FrameIndex, channel: u16, channels: ChannelCount) -> Sample {
    (frame * channels.get() as FrameIndex + channel as FrameIndex) as Sample
}

/// The samples an exact decoder returns for `range`.
pub fn expected_samples(range: FrameIndexRange, channels: ChannelCount) -> Vec<Sample> {
    (range.start()..range.end())
        .flat_map(|frame| (0..channels.get()).map(move |ch| sample_value(frame, ch, channels)))
        .collect()
}

/// Counters and switches shared between a test and the stub it handed over.
#[derive(Debug, Default)]
pub struct StubStats {
    /// Calls of `read_next_block`.
    pub block_reads: Cell<usize>,
    /// Blocks actually handed out.
    pub blocks: Cell<usize>,
    /// Positions passed to `set_position`.
    pub seeks: RefCell<Vec<NativePosition>>,
    /// Frame the decoder continued from after the last `set_position`.
    pub landed_at: Cell<Option<FrameIndex>>,
    /// Largest block handed out so far, in samples.
    pub max_block_samples: Cell<usize>,
    /// Makes every following `set_position` fail.
    pub fail_seeks: Cell<bool>,
    pub released: Cell<bool>,
}

impl StubStats {
    pub fn seek_count(&self) -> usize {
        self.seeks.borrow().len()
    }
}

#[derive(Clone, Debug)]
pub struct StubConfig {
    pub channels: ChannelCount,
    pub sample_rate: SampleRate,
    pub time_base: NativeTimeBase,
    /// Frames covered by the reported duration.
    pub total_frames: FrameIndex,
    /// Frames after which decoding stops, if earlier than `total_frames`.
    pub end_of_stream_at: Option<FrameIndex>,
    /// Block sizes in frames, repeated from the start of the stream.
    pub block_frames: Vec<usize>,
    /// Number of sub-buffers each block is split into.
    pub sub_buffers: usize,
    /// Frames after a native seek that come out as [`PRIMING_SAMPLE`].
    pub priming_frames: usize,
    pub report_duration: bool,
    pub fail_select_stream: bool,
    /// Whether output format requests are applied.
    pub convert_output: bool,
    /// Accepts output format requests but keeps producing the native format.
    pub ignore_output_format: bool,
    pub preferred_block_samples: Option<usize>,
    /// Block number (counted from open) that reports a stream error.
    pub error_at_block: Option<usize>,
    /// Block number in front of which a format change is reported, once.
    /// Decoding carries on normally afterwards.
    pub format_change_at_block: Option<usize>,
    /// Block number whose timestamp is off by the given number of frames.
    pub timestamp_offset_at_block: Option<(usize, FrameIndex)>,
    /// Block number whose last sub-buffer cannot be locked.
    pub lock_failure_at_block: Option<usize>,
    /// Block number that carries an extra, partial frame.
    pub partial_frame_at_block: Option<usize>,
}

impl Default for StubConfig {
    fn default() -> Self {
        Self {
            channels: NonZero::new(2).unwrap(),
            sample_rate: NonZero::new(44_100).unwrap(),
            time_base: NativeTimeBase::per_frame(NonZero::new(44_100).unwrap()),
            total_frames: 100_000,
            end_of_stream_at: None,
            block_frames: vec![1024],
            sub_buffers: 1,
            priming_frames: 0,
            report_duration: true,
            fail_select_stream: false,
            convert_output: false,
            ignore_output_format: false,
            preferred_block_samples: None,
            error_at_block: None,
            format_change_at_block: None,
            timestamp_offset_at_block: None,
            lock_failure_at_block: None,
            partial_frame_at_block: None,
        }
    }
}

impl StubConfig {
    pub fn with_total_frames(mut self, frames: FrameIndex) -> Self {
        self.total_frames = frames;
        self
    }

    pub fn with_block_frames(mut self, frames: &[usize]) -> Self {
        self.block_frames = frames.to_vec();
        self
    }

    pub fn with_priming_frames(mut self, frames: usize) -> Self {
        self.priming_frames = frames;
        self
    }

    pub fn with_time_base(mut self, time_base: NativeTimeBase) -> Self {
        self.time_base = time_base;
        self
    }

    pub fn build(self) -> (StubDecoder, Rc<StubStats>) {
        let stats = Rc::new(StubStats::default());
        let decoder = StubDecoder {
            format: NativeFormat {
                channels: self.channels,
                sample_rate: self.sample_rate,
            },
            converter: StreamUnitConverter::new(self.sample_rate, self.time_base),
            config: self,
            next_frame: 0,
            primed_from: 0,
            blocks: 0,
            format_change_reported: false,
            stats: Rc::clone(&stats),
        };
        (decoder, stats)
    }

    /// Builds the stub and opens an adapter with default settings on it.
    pub fn open(self) -> (SeekableDecoder<StubDecoder>, Rc<StubStats>) {
        let (decoder, stats) = self.build();
        let adapter = SeekableDecoder::new(decoder).unwrap();
        (adapter, stats)
    }
}

#[derive(Debug)]
pub struct StubDecoder {
    config: StubConfig,
    format: NativeFormat,
    converter: StreamUnitConverter,
    next_frame: FrameIndex,
    /// Frames before this index are decoded exactly.
    primed_from: FrameIndex,
    blocks: usize,
    format_change_reported: bool,
    stats: Rc<StubStats>,
}

impl StubDecoder {
    fn data_end(&self) -> FrameIndex {
        self.config
            .end_of_stream_at
            .unwrap_or(self.config.total_frames)
            .min(self.config.total_frames)
    }

    /// Start and length of the block containing `frame`.
    fn block_at(&self, frame: FrameIndex) -> (FrameIndex, usize) {
        let mut start = 0;
        for &len in self.config.block_frames.iter().cycle() {
            if frame < start + len as FrameIndex {
                return (start, len);
            }
            start += len as FrameIndex;
        }
        unreachable!("block sizes must not be empty")
    }

    fn sample(&self, frame: FrameIndex, channel: u16) -> Sample {
        if frame < self.primed_from {
            PRIMING_SAMPLE
        } else {
            sample_value(frame, channel, self.format.channels)
        }
    }
}

impl Drop for StubDecoder {
    fn drop(&mut self) {
        self.stats.released.set(true);
    }
}

impl BlockDecoder for StubDecoder {
    type Block = StubBlock;

    fn select_stream(&mut self) -> Result<(), DecoderError> {
        if self.config.fail_select_stream {
            return Err(DecoderError::NoStreams);
        }
        Ok(())
    }

    fn current_format(&self) -> Result<NativeFormat, DecoderError> {
        Ok(self.format)
    }

    fn set_output_format(&mut self, params: &OpenParams) -> Result<(), DecoderError> {
        if self.config.ignore_output_format {
            return Ok(());
        }
        if !self.config.convert_output {
            let channels_match = params.channels.is_none_or(|c| c == self.format.channels);
            let rate_match = params.sample_rate.is_none_or(|r| r == self.format.sample_rate);
            if channels_match && rate_match {
                return Ok(());
            }
            return Err(DecoderError::UnsupportedOutputFormat {
                channels: params.channels,
                sample_rate: params.sample_rate,
            });
        }
        if let Some(channels) = params.channels {
            self.format.channels = channels;
        }
        if let Some(sample_rate) = params.sample_rate {
            self.format.sample_rate = sample_rate;
        }
        Ok(())
    }

    fn time_base(&self) -> NativeTimeBase {
        self.config.time_base
    }

    fn duration(&self) -> Result<NativePosition, DecoderError> {
        if !self.config.report_duration {
            return Err(DecoderError::UnknownDuration);
        }
        Ok(self.converter.from_frame_index(self.config.total_frames))
    }

    fn average_bitrate(&self) -> Option<u32> {
        Some(128)
    }

    fn preferred_block_samples(&self) -> Option<usize> {
        self.config.preferred_block_samples
    }

    fn set_position(&mut self, position: NativePosition) -> Result<(), DecoderError> {
        self.stats.seeks.borrow_mut().push(position);
        if self.stats.fail_seeks.get() {
            return Err(DecoderError::Seek {
                position,
                reason: "seeking disabled".into(),
            });
        }
        let frame = self
            .converter
            .to_frame_index(position)
            .clamp(0, self.data_end());
        let (landing, _) = self.block_at(frame);
        self.next_frame = landing;
        self.primed_from = if landing > 0 {
            landing + self.config.priming_frames as FrameIndex
        } else {
            0
        };
        self.stats.landed_at.set(Some(landing));
        Ok(())
    }

    fn read_next_block(&mut self) -> BlockResult<StubBlock> {
        self.stats.block_reads.set(self.stats.block_reads.get() + 1);
        let number = self.blocks;
        if self.config.format_change_at_block == Some(number) && !self.format_change_reported {
            self.format_change_reported = true;
            return BlockResult::FormatChanged;
        }
        if self.config.error_at_block == Some(number) {
            return BlockResult::Error(DecoderError::Decode("corrupt block".into()));
        }
        if self.next_frame >= self.data_end() {
            return BlockResult::EndOfStream;
        }

        let (start, len) = self.block_at(self.next_frame);
        debug_assert_eq!(start, self.next_frame);
        let end = (start + len as FrameIndex).min(self.data_end());
        let channels = self.format.channels.get();
        let mut samples: Vec<Sample> = (start..end)
            .flat_map(|frame| (0..channels).map(move |ch| (frame, ch)))
            .map(|(frame, ch)| self.sample(frame, ch))
            .collect();
        if self.config.partial_frame_at_block == Some(number) {
            samples.push(0.0);
        }

        let parts = self.config.sub_buffers.max(1);
        let frames = (end - start) as usize;
        let mut sub_buffers = Vec::with_capacity(parts);
        let mut rest = samples.as_slice();
        for part in 0..parts {
            let take = if part + 1 == parts {
                rest.len()
            } else {
                (frames / parts) * channels as usize
            };
            let (head, tail) = rest.split_at(take);
            sub_buffers.push(head.to_vec());
            rest = tail;
        }

        self.stats
            .max_block_samples
            .set(self.stats.max_block_samples.get().max(samples.len()));
        self.stats.blocks.set(number + 1);
        self.blocks += 1;
        self.next_frame = end;
        let offset = match self.config.timestamp_offset_at_block {
            Some((n, offset)) if n == number => offset,
            _ => 0,
        };
        BlockResult::Block(StubBlock {
            timestamp: self.converter.from_frame_index(start + offset),
            locked_parts: if self.config.lock_failure_at_block == Some(number) {
                parts - 1
            } else {
                parts
            },
            sub_buffers,
        })
    }
}

#[derive(Debug)]
pub struct StubBlock {
    timestamp: NativePosition,
    sub_buffers: Vec<Vec<Sample>>,
    /// Sub-buffers from this index on fail to lock.
    locked_parts: usize,
}

impl DecodedBlock for StubBlock {
    type Locked<'a>
        = &'a [Sample]
    where
        Self: 'a;

    fn timestamp(&self) -> NativePosition {
        self.timestamp
    }

    fn sub_buffer_count(&self) -> usize {
        self.sub_buffers.len()
    }

    fn total_samples(&self) -> usize {
        self.sub_buffers.iter().map(Vec::len).sum()
    }

    fn lock(&self, index: usize) -> Result<&[Sample], DecoderError> {
        if index >= self.locked_parts {
            return Err(DecoderError::BufferLock { index });
        }
        Ok(&self.sub_buffers[index])
    }
}

/// Reads `range` into a fresh buffer and returns the produced range together
/// with the samples written.
pub fn read_samples(
    adapter: &mut SeekableDecoder<StubDecoder>,
    range: FrameIndexRange,
) -> (FrameIndexRange, Vec<Sample>) {
    let channels = adapter.channels().get() as usize;
    let mut output = vec![f32::NAN; range.len() * channels];
    let produced = adapter.read(range, Some(output.as_mut_slice()));
    output.truncate(produced.len() * channels);
    (produced, output)
}
