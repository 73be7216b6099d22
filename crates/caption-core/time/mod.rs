//! Microsecond time model
//!
//! [`MicroTime`] is the single time representation shared by every codec.
//! Each wire format has its own textual or frame based encoding, found in
//! the submodules:
//!
//! - [`text`] for the fixed width SRT and VTT clock strings and MicroDVD
//!   frame numbers
//! - [`ttml`] for TTML clock and offset times with frame, sub-frame and tick
//!   time bases
//!
//! Time never goes negative. Subtraction that would underflow clamps to zero
//! and logs a warning instead of failing.
//!
//! # Example
//!
//! ```rust
//! use caption_core::MicroTime;
//!
//! let start = MicroTime::from_srt_time("00:00:01,500")?;
//! let end = start + MicroTime::from_millis(2_000);
//! assert_eq!(end.to_vtt_time(), "00:00:03.500");
//! assert_eq!(MicroTime::ZERO - end, MicroTime::ZERO);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod text;
pub mod ttml;

use core::fmt;
use core::ops::{Add, AddAssign, Sub, SubAssign};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub use text::DEFAULT_FRAME_RATE;
pub use ttml::TtmlTimeBase;

const MICROS_PER_MILLI: u64 = 1_000;
const MICROS_PER_SECOND: u64 = 1_000_000;
const MICROS_PER_MINUTE: u64 = 60 * MICROS_PER_SECOND;
const MICROS_PER_HOUR: u64 = 60 * MICROS_PER_MINUTE;

/// Non-negative time with microsecond precision
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct MicroTime(u64);

impl MicroTime {
    /// Time zero
    pub const ZERO: Self = Self(0);

    /// Create from a raw microsecond count
    #[must_use]
    pub const fn from_micros(micros: u64) -> Self {
        Self(micros)
    }

    /// Create from milliseconds
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis.saturating_mul(MICROS_PER_MILLI))
    }

    /// Create from a component breakdown
    ///
    /// Components are not range checked, so `from_parts(0, 90, 0, 0, 0)` is
    /// one and a half hours.
    #[must_use]
    pub const fn from_parts(hours: u64, minutes: u64, seconds: u64, millis: u64, micros: u64) -> Self {
        Self(
            hours
                .saturating_mul(MICROS_PER_HOUR)
                .saturating_add(minutes.saturating_mul(MICROS_PER_MINUTE))
                .saturating_add(seconds.saturating_mul(MICROS_PER_SECOND))
                .saturating_add(millis.saturating_mul(MICROS_PER_MILLI))
                .saturating_add(micros),
        )
    }

    /// Create from fractional seconds, rounding to the nearest microsecond
    ///
    /// Negative and non-finite inputs clamp to zero.
    #[must_use]
    pub fn from_secs_f64(seconds: f64) -> Self {
        if !seconds.is_finite() || seconds <= 0.0 {
            return Self::ZERO;
        }
        Self((seconds * MICROS_PER_SECOND as f64).round() as u64)
    }

    /// Total microseconds
    #[must_use]
    pub const fn as_micros(self) -> u64 {
        self.0
    }

    /// Total whole milliseconds
    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0 / MICROS_PER_MILLI
    }

    /// Fractional seconds
    #[must_use]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / MICROS_PER_SECOND as f64
    }

    /// Whole hours
    #[must_use]
    pub const fn hours(self) -> u64 {
        self.0 / MICROS_PER_HOUR
    }

    /// Minutes component (0-59)
    #[must_use]
    pub const fn minutes(self) -> u64 {
        self.0 % MICROS_PER_HOUR / MICROS_PER_MINUTE
    }

    /// Seconds component (0-59)
    #[must_use]
    pub const fn seconds(self) -> u64 {
        self.0 % MICROS_PER_MINUTE / MICROS_PER_SECOND
    }

    /// Milliseconds component (0-999)
    #[must_use]
    pub const fn millis(self) -> u64 {
        self.0 % MICROS_PER_SECOND / MICROS_PER_MILLI
    }

    /// Microseconds component (0-999)
    #[must_use]
    pub const fn micros(self) -> u64 {
        self.0 % MICROS_PER_MILLI
    }

    /// Subtract, clamping at zero and reporting the clamp
    #[must_use]
    pub fn clamped_sub(self, other: Self) -> Self {
        if other.0 > self.0 {
            log::warn!("Negative time {self} - {other} clamped to zero");
            return Self::ZERO;
        }
        Self(self.0 - other.0)
    }

    /// Move by a signed microsecond delta, clamping at zero
    #[must_use]
    pub fn shifted(self, delta_micros: i64) -> Self {
        if delta_micros >= 0 {
            Self(self.0.saturating_add(delta_micros.unsigned_abs()))
        } else {
            self.clamped_sub(Self(delta_micros.unsigned_abs()))
        }
    }
}

impl Add for MicroTime {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for MicroTime {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for MicroTime {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.clamped_sub(rhs)
    }
}

impl SubAssign for MicroTime {
    fn sub_assign(&mut self, rhs: Self) {
        *self = self.clamped_sub(rhs);
    }
}

impl fmt::Display for MicroTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}.{:03}",
            self.hours(),
            self.minutes(),
            self.seconds(),
            self.millis()
        )?;
        if self.micros() != 0 {
            write!(f, "{:03}", self.micros())?;
        }
        Ok(())
    }
}

impl From<core::time::Duration> for MicroTime {
    fn from(duration: core::time::Duration) -> Self {
        Self(u64::try_from(duration.as_micros()).unwrap_or(u64::MAX))
    }
}

impl From<MicroTime> for core::time::Duration {
    fn from(time: MicroTime) -> Self {
        Self::from_micros(time.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn components_round_trip() {
        let time = MicroTime::from_parts(1, 2, 3, 456, 789);
        assert_eq!(time.hours(), 1);
        assert_eq!(time.minutes(), 2);
        assert_eq!(time.seconds(), 3);
        assert_eq!(time.millis(), 456);
        assert_eq!(time.micros(), 789);
        assert_eq!(time.as_micros(), 3_723_456_789);
    }

    #[test]
    fn subtraction_clamps_at_zero() {
        let small = MicroTime::from_millis(10);
        let large = MicroTime::from_millis(20);
        assert_eq!(small - large, MicroTime::ZERO);
        assert_eq!(large - small, MicroTime::from_millis(10));

        let mut time = small;
        time -= large;
        assert_eq!(time, MicroTime::ZERO);
    }

    #[test]
    fn shifted_handles_both_signs() {
        let time = MicroTime::from_millis(500);
        assert_eq!(time.shifted(250_000), MicroTime::from_millis(750));
        assert_eq!(time.shifted(-250_000), MicroTime::from_millis(250));
        assert_eq!(time.shifted(-1_000_000), MicroTime::ZERO);
    }

    #[test]
    fn display_uses_clock_form() {
        assert_eq!(MicroTime::from_millis(61_001).to_string(), "00:01:01.001");
        assert_eq!(MicroTime::from_micros(1_500).to_string(), "00:00:00.001500");
    }

    #[test]
    fn secs_f64_rounds_and_clamps() {
        assert_eq!(MicroTime::from_secs_f64(1.000_000_4), MicroTime::from_micros(1_000_000));
        assert_eq!(MicroTime::from_secs_f64(-3.0), MicroTime::ZERO);
        assert_eq!(MicroTime::from_secs_f64(f64::NAN), MicroTime::ZERO);
    }
}
