//! Frame addressing: half-open frame ranges and the tracked stream position.

use std::fmt;

use crate::FrameIndex;

/// A half-open interval `[start, end)` of frame indices.
///
/// The length is never negative: constructors clamp `end` to `start`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FrameIndexRange {
    start: FrameIndex,
    end: FrameIndex,
}

impl FrameIndexRange {
    /// Range of `len` frames beginning at `start`.
    #[inline]
    pub fn forward(start: FrameIndex, len: usize) -> Self {
        let len = FrameIndex::try_from(len).unwrap_or(FrameIndex::MAX);
        Self {
            start,
            end: start.saturating_add(len),
        }
    }

    /// Range from `start` up to (excluding) `end`. Empty if `end <= start`.
    #[inline]
    pub fn between(start: FrameIndex, end: FrameIndex) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    /// An empty range located at `index`.
    #[inline]
    pub fn empty_at(index: FrameIndex) -> Self {
        Self {
            start: index,
            end: index,
        }
    }

    #[inline]
    pub fn start(&self) -> FrameIndex {
        self.start
    }

    #[inline]
    pub fn end(&self) -> FrameIndex {
        self.end
    }

    /// Number of frames in the range.
    #[inline]
    pub fn len(&self) -> usize {
        (self.end - self.start) as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether `index` addresses a frame inside the range.
    #[inline]
    pub fn contains(&self, index: FrameIndex) -> bool {
        self.start <= index && index < self.end
    }

    /// The overlapping part of both ranges. If they do not overlap the result
    /// is empty and placed at the clamped start of `self`.
    pub fn intersect(&self, other: &Self) -> Self {
        let start = self.start.clamp(other.start, other.end);
        let end = self.end.clamp(other.start, other.end);
        Self::between(start, end)
    }

    /// The same start with the length shortened to at most `len` frames.
    pub fn truncated(&self, len: usize) -> Self {
        Self::forward(self.start, self.len().min(len))
    }
}

impl fmt::Display for FrameIndexRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Where the next decoded frame will come from.
///
/// `Unknown` right after a native seek (until the first decoded block
/// reports its timestamp), after a skip or seek failed to land on its
/// target, and after the decoder has been released.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FramePosition {
    Known(FrameIndex),
    #[default]
    Unknown,
}

impl FramePosition {
    #[inline]
    pub fn known(&self) -> Option<FrameIndex> {
        match *self {
            FramePosition::Known(index) => Some(index),
            FramePosition::Unknown => None,
        }
    }

    #[inline]
    pub fn is_known(&self) -> bool {
        matches!(self, FramePosition::Known(_))
    }

    /// Moves a known position forward by `frames`. Unknown stays unknown.
    #[inline]
    pub(crate) fn advance(&mut self, frames: usize) {
        if let FramePosition::Known(index) = self {
            *index += frames as FrameIndex;
        }
    }
}

impl fmt::Display for FramePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FramePosition::Known(index) => write!(f, "{index}"),
            FramePosition::Unknown => f.write_str("unknown"),
        }
    }
}
