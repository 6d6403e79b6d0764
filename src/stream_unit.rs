//! Conversion between the decoder's native time unit and frame indices.

use num_rational::Ratio;

use crate::{FrameIndex, NativePosition, SampleRate};

/// Duration of one native position unit: `numer / denom` seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NativeTimeBase {
    pub numer: u32,
    pub denom: u32,
}

impl NativeTimeBase {
    /// 100-nanosecond ticks, as used by Media Foundation style source readers.
    pub const HUNDRED_NANOS: NativeTimeBase = NativeTimeBase::new(1, 10_000_000);

    /// # Panics
    /// If either `numer` or `denom` is zero.
    pub const fn new(numer: u32, denom: u32) -> Self {
        assert!(numer != 0, "time base numerator must not be zero");
        assert!(denom != 0, "time base denominator must not be zero");
        Self { numer, denom }
    }

    /// One native unit per frame.
    pub const fn per_frame(sample_rate: SampleRate) -> Self {
        Self::new(1, sample_rate.get())
    }
}

/// Maps native decoder positions onto frame indices and back.
///
/// Both directions round half away from zero on exact rational values, so
/// `to_frame_index(from_frame_index(f)) == f` whenever a native unit is not
/// longer than a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamUnitConverter {
    /// Frames per native unit.
    frames_per_unit: Ratio<i64>,
}

impl StreamUnitConverter {
    pub fn new(sample_rate: SampleRate, time_base: NativeTimeBase) -> Self {
        let frames_per_unit = Ratio::new(
            i64::from(sample_rate.get()) * i64::from(time_base.numer),
            i64::from(time_base.denom),
        );
        Self { frames_per_unit }
    }

    #[inline]
    pub fn to_frame_index(&self, position: NativePosition) -> FrameIndex {
        (Ratio::from_integer(position) * self.frames_per_unit)
            .round()
            .to_integer()
    }

    #[inline]
    pub fn from_frame_index(&self, frame_index: FrameIndex) -> NativePosition {
        (Ratio::from_integer(frame_index) / self.frames_per_unit)
            .round()
            .to_integer()
    }
}
