//! Math utilities for frame and time arithmetic.

use std::time::Duration;

use crate::{FrameIndex, SampleRate};

/// Nanoseconds per second, used for time conversions.
pub(crate) const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Utility macro for getting a `NonZero` from a literal. Especially
/// useful for passing in `ChannelCount` and `SampleRate`.
/// Equivalent to: `const { core::num::NonZero::new($n).unwrap() }`
///
/// # Example
/// ```
/// use seekable_decoder::math::nz;
/// use seekable_decoder::SampleRate;
///
/// let rate: SampleRate = nz!(44_100);
/// assert_eq!(rate.get(), 44_100);
/// ```
///
/// # Panics
/// If the literal passed in is zero this panicks.
#[macro_export]
macro_rules! nz {
    ($n:literal) => {
        const { core::num::NonZero::new($n).unwrap() }
    };
}

pub use nz;

/// Duration spanned by `frames` frames at `sample_rate`, rounded up to the next nanosecond
/// so that [`duration_to_frames`] maps it back onto the same frame.
///
/// Negative frame counts saturate to [`Duration::ZERO`].
pub fn frames_to_duration(frames: FrameIndex, sample_rate: SampleRate) -> Duration {
    let Ok(frames) = u64::try_from(frames) else {
        return Duration::ZERO;
    };
    let rate = sample_rate.get() as u64;
    let secs = frames / rate;
    let nanos = ((frames % rate) * NANOS_PER_SEC).div_ceil(rate);
    Duration::new(secs, nanos as u32)
}

/// Index of the frame that is playing at `duration`, rounded down.
pub fn duration_to_frames(duration: Duration, sample_rate: SampleRate) -> FrameIndex {
    let rate = sample_rate.get() as u128;
    let frames = duration.as_nanos() * rate / NANOS_PER_SEC as u128;
    FrameIndex::try_from(frames).unwrap_or(FrameIndex::MAX)
}
