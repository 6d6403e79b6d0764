use crate::common::{frames_to_samples, samples_to_frames};
use crate::decoder::{BlockResult, DecodedBlock};
use crate::{BlockDecoder, FrameIndexRange, FramePosition, Sample, SeekableDecoder};

impl<D: BlockDecoder> SeekableDecoder<D> {
    /// Reads the frames of `range` that lie inside
    /// [`frame_index_range`](Self::frame_index_range), seeking first if needed.
    ///
    /// With an output buffer the request is further limited to the frames that
    /// fit into it; samples are written interleaved from its start. Without one
    /// the frames are decoded and dropped.
    ///
    /// Returns the frames actually produced. The range starts where the
    /// request starts and is shorter only at the end of the stream or after a
    /// decoder failure. It is empty if the reader could not be positioned,
    /// in which case it is placed at the current position (or at
    /// [`frame_index_max`](Self::frame_index_max) while that is unknown).
    pub fn read(
        &mut self,
        range: FrameIndexRange,
        output: Option<&mut [Sample]>,
    ) -> FrameIndexRange {
        let mut range = range.intersect(&self.frame_index_range);
        if let Some(output) = output.as_deref() {
            range = range.truncated(samples_to_frames(output.len(), self.format.channels));
        }
        self.read_clamped(range, output)
    }

    /// [`read`](Self::read) for a range already inside the stream and fitting `output`.
    pub(crate) fn read_clamped(
        &mut self,
        range: FrameIndexRange,
        output: Option<&mut [Sample]>,
    ) -> FrameIndexRange {
        let first = range.start();
        self.seek(first);
        if self.position != FramePosition::Known(first) {
            tracing::warn!(
                %range,
                position = %self.position,
                "failed to position reader at beginning of decoding range"
            );
            let at = self.position.known().unwrap_or(self.frame_index_max());
            return FrameIndexRange::empty_at(at);
        }

        let frames = self.decode_frames(range.len(), output);
        let produced = FrameIndexRange::forward(first, frames);
        debug_assert!(
            !self.position.is_known() || self.position == FramePosition::Known(produced.end())
        );
        produced
    }

    /// Delivers up to `frame_count` frames from the current position, first
    /// from the look-ahead buffer and then from freshly decoded blocks.
    ///
    /// The position may be unknown on entry (right after a native seek); it is
    /// then taken from the first decoded block.
    ///
    /// Returns the number of frames delivered.
    pub(super) fn decode_frames(
        &mut self,
        frame_count: usize,
        mut output: Option<&mut [Sample]>,
    ) -> usize {
        let channels = self.format.channels;
        let requested = frames_to_samples(frame_count, channels);
        let mut produced = 0;

        while produced < requested {
            let buffered = self.buffer.read_front(requested - produced);
            if !buffered.is_empty() {
                debug_assert!(self.position.is_known());
                let len = buffered.len();
                if let Some(output) = output.as_deref_mut() {
                    output[produced..produced + len].copy_from_slice(buffered);
                }
                produced += len;
                self.position.advance(samples_to_frames(len, channels));
                continue;
            }

            if self.format_changed {
                tracing::trace!("decoder changed its output format");
                break;
            }
            let Some(decoder) = self.decoder.get_mut() else {
                tracing::trace!("decoder is dead");
                break;
            };
            match decoder.read_next_block() {
                BlockResult::Block(block) => {
                    let consumed =
                        self.consume_block(&block, requested, &mut produced, output.as_deref_mut());
                    if !consumed {
                        tracing::warn!("failed to read all sub-buffers of decoded block");
                        self.kill_decoder();
                        break;
                    }
                }
                BlockResult::EndOfStream => {
                    tracing::debug!(position = %self.position, "end of stream");
                    break;
                }
                BlockResult::Error(err) => {
                    tracing::warn!(%err, "decoder detected stream errors");
                    self.kill_decoder();
                    break;
                }
                BlockResult::FormatChanged => {
                    self.stop_on_format_change();
                    break;
                }
            }
        }

        samples_to_frames(produced, channels)
    }

    /// Copies the head of `block` into `output` until `requested` samples have
    /// been produced and appends the rest to the look-ahead buffer.
    ///
    /// Returns false if a sub-buffer could not be acquired. Samples delivered
    /// before that are kept.
    fn consume_block(
        &mut self,
        block: &D::Block,
        requested: usize,
        produced: &mut usize,
        mut output: Option<&mut [Sample]>,
    ) -> bool {
        let channels = self.format.channels;
        debug_assert!(self.buffer.is_empty());

        let reader_index = self.converter.to_frame_index(block.timestamp());
        match self.position {
            FramePosition::Unknown => self.position = FramePosition::Known(reader_index),
            FramePosition::Known(tracked) if tracked != reader_index => {
                tracing::warn!(
                    tracked,
                    reported = reader_index,
                    "decoder position out of sync with tracked position"
                );
            }
            FramePosition::Known(_) => {}
        }

        let total = block.total_samples();
        if total % channels.get() as usize != 0 {
            tracing::warn!(
                samples = total,
                channels = channels.get(),
                "decoded block does not contain whole frames"
            );
            return false;
        }
        self.buffer.reserve_capacity(total);

        let mut delivered = 0;
        let mut complete = true;
        for index in 0..block.sub_buffer_count() {
            let locked = match block.lock(index) {
                Ok(locked) => locked,
                Err(err) => {
                    tracing::warn!(%err, index, "failed to lock sub-buffer");
                    complete = false;
                    break;
                }
            };
            let copy = (requested - *produced).min(locked.len());
            if copy > 0 {
                if let Some(output) = output.as_deref_mut() {
                    output[*produced..*produced + copy].copy_from_slice(&locked[..copy]);
                }
                *produced += copy;
                delivered += copy;
            }
            let surplus = &locked[copy..];
            if !surplus.is_empty() {
                self.buffer.write(surplus.len()).copy_from_slice(surplus);
            }
        }

        self.position.advance(samples_to_frames(delivered, channels));
        complete
    }
}
