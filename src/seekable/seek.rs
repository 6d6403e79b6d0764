use crate::{BlockDecoder, FrameIndex, FrameIndexRange, FramePosition, SeekableDecoder};

impl<D: BlockDecoder> SeekableDecoder<D> {
    /// Positions the reader so the next read starts at `frame_index`.
    ///
    /// Short forward distances are covered by decoding through the gap. Anything
    /// else clears the look-ahead buffer, issues a native seek
    /// [`prefetch_frames`](Self::prefetch_frames) before the target and decodes
    /// forward to it, so the first frame returned afterwards is bit-exact.
    ///
    /// Landing anywhere else leaves [`position`](Self::position) unknown until
    /// a later seek succeeds. A failing native seek releases the decoder.
    pub fn seek(&mut self, frame_index: FrameIndex) {
        debug_assert!(
            self.frame_index_min() <= frame_index && frame_index <= self.frame_index_max(),
            "frame index {frame_index} outside of {}",
            self.frame_index_range
        );
        let target = frame_index.clamp(self.frame_index_min(), self.frame_index_max());

        if let FramePosition::Known(current) = self.position {
            if current < target {
                let skip = FrameIndexRange::between(current, target);
                // Decoding buffered frames costs nothing, and a native seek has
                // to decode at least `prefetch_frames` on its own. Only seek if
                // skipping would decode more than twice that.
                let max_skip = self.buffered_frames() + 2 * self.prefetch_frames;
                if skip.len() <= max_skip {
                    let skipped = self.decode_frames(skip.len(), None);
                    if skipped != skip.len() {
                        tracing::warn!(%skip, skipped, "failed to skip frames before decoding");
                        self.invalidate_position();
                        return;
                    }
                }
            }
        }
        if self.position == FramePosition::Known(target) {
            return;
        }

        self.invalidate_position();
        if self.format_changed {
            tracing::trace!(frame = target, "cannot seek, decoder changed its output format");
            return;
        }
        let seek_index = (target - self.prefetch_frames as FrameIndex).max(self.frame_index_min());
        let seek_position = self.converter.from_frame_index(seek_index);
        debug_assert!(seek_position >= 0);

        let Some(decoder) = self.decoder.get_mut() else {
            tracing::trace!(frame = target, "cannot seek, decoder is dead");
            return;
        };
        tracing::debug!(frame = target, seek_index, seek_position, "seeking decoder");
        if let Err(err) = decoder.set_position(seek_position) {
            tracing::warn!(%err, seek_position, "failed to set decoder position");
            self.kill_decoder();
            return;
        }

        // The decoder position is approximate and only resolved by the next
        // decoded block, which may start before `seek_index`.
        let skip = FrameIndexRange::between(seek_index, target);
        if skip.is_empty() {
            self.position = FramePosition::Known(target);
            return;
        }
        if !self.skip_while_seeking(skip) {
            return;
        }
        if let FramePosition::Known(current) = self.position {
            let remaining = FrameIndexRange::between(current, target);
            if !remaining.is_empty() && !self.skip_while_seeking(remaining) {
                return;
            }
        }
        if self.position != FramePosition::Known(target) {
            tracing::warn!(frame = target, position = %self.position, "seeking to frame failed");
            self.invalidate_position();
        }
    }

    fn skip_while_seeking(&mut self, skip: FrameIndexRange) -> bool {
        let skipped = self.decode_frames(skip.len(), None);
        if skipped == skip.len() {
            return true;
        }
        tracing::warn!(%skip, skipped, "failed to skip frames while seeking");
        self.invalidate_position();
        false
    }
}
