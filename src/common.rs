use std::num::NonZero;

/// Stream sample rate (a frame rate or samples per second per channel).
pub type SampleRate = NonZero<u32>;

/// Number of channels in a stream. Can never be Zero
pub type ChannelCount = NonZero<u16>;

/// Represents value of a single sample.
/// Silence corresponds to the value `0.0`. The expected amplitude range is  -1.0...1.0.
/// Values below and above this range are clipped in conversion to other sample types.
pub type Sample = f32;

/// Zero based ordinal of a frame (one sample per channel) within the decoded stream.
pub type FrameIndex = i64;

/// Position as reported by the underlying decoder, in units of its
/// [`NativeTimeBase`](crate::NativeTimeBase).
pub type NativePosition = i64;

/// Converts a frame count into the number of interleaved samples.
#[inline]
pub(crate) fn frames_to_samples(frames: usize, channels: ChannelCount) -> usize {
    frames * channels.get() as usize
}

/// Converts a number of interleaved samples into whole frames.
#[inline]
pub(crate) fn samples_to_frames(samples: usize, channels: ChannelCount) -> usize {
    samples / channels.get() as usize
}

macro_rules! assert_error_traits {
    ($to_test:path) => {
        const _: () = {
            $crate::common::assert_error_traits_fn::<$to_test>();
        };
    };
}

pub(crate) use assert_error_traits;

#[allow(dead_code)]
pub(crate) const fn assert_error_traits_fn<T: Send + Sync + Clone + std::error::Error + 'static>() {}
