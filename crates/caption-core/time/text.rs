//! Clock strings and frame numbers used by the line oriented formats

use super::MicroTime;
use crate::utils::{CoreError, Result};

/// Frame rate assumed when a frame based file does not declare one
pub const DEFAULT_FRAME_RATE: f64 = 25.0;

/// Parse `digits` as a fixed width decimal field
fn fixed_field(time: &str, digits: &str, width: usize, what: &str) -> Result<u64> {
    if digits.len() != width || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CoreError::invalid_time(
            time,
            &format!("{what} must be {width} digits"),
        ));
    }
    digits
        .parse()
        .map_err(|_| CoreError::invalid_time(time, &format!("{what} out of range")))
}

fn hours_field(time: &str, digits: &str) -> Result<u64> {
    if digits.len() < 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CoreError::invalid_time(time, "hours must be at least 2 digits"));
    }
    digits
        .parse()
        .map_err(|_| CoreError::invalid_time(time, "hours out of range"))
}

fn sexagesimal(time: &str, value: u64, what: &str) -> Result<u64> {
    if value >= 60 {
        return Err(CoreError::invalid_time(time, &format!("{what} must be below 60")));
    }
    Ok(value)
}

/// Decode `MM:SS<sep>mmm` preceded by `hours`
fn clock_tail(time: &str, hours: u64, rest: &str, separators: &[char]) -> Result<MicroTime> {
    let (minutes, rest) = rest
        .split_once(':')
        .ok_or_else(|| CoreError::invalid_time(time, "expected ':' after minutes"))?;
    let (seconds, millis) = rest
        .split_once(separators)
        .ok_or_else(|| CoreError::invalid_time(time, "expected fractional seconds"))?;
    let minutes = sexagesimal(time, fixed_field(time, minutes, 2, "minutes")?, "minutes")?;
    let seconds = sexagesimal(time, fixed_field(time, seconds, 2, "seconds")?, "seconds")?;
    let millis = fixed_field(time, millis, 3, "milliseconds")?;
    Ok(MicroTime::from_parts(hours, minutes, seconds, millis, 0))
}

impl MicroTime {
    /// Parse an SRT time `HH:MM:SS,mmm`
    ///
    /// A `.` is accepted in place of the comma since many files in the wild
    /// use it.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTime`] when a field is missing, has the
    /// wrong width or is out of range.
    pub fn from_srt_time(time: &str) -> Result<Self> {
        let trimmed = time.trim();
        let (hours, rest) = trimmed
            .split_once(':')
            .ok_or_else(|| CoreError::invalid_time(time, "expected HH:MM:SS,mmm"))?;
        clock_tail(time, hours_field(time, hours)?, rest, &[',', '.'])
    }

    /// Format as an SRT time `HH:MM:SS,mmm`
    #[must_use]
    pub fn to_srt_time(self) -> String {
        format!(
            "{:02}:{:02}:{:02},{:03}",
            self.hours(),
            self.minutes(),
            self.seconds(),
            self.millis()
        )
    }

    /// Parse a VTT time `[HH:]MM:SS.mmm`
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTime`] for malformed input.
    pub fn from_vtt_time(time: &str) -> Result<Self> {
        let trimmed = time.trim();
        match trimmed.matches(':').count() {
            1 => clock_tail(time, 0, trimmed, &['.']),
            2 => {
                let (hours, rest) = trimmed
                    .split_once(':')
                    .ok_or_else(|| CoreError::invalid_time(time, "expected HH:MM:SS.mmm"))?;
                clock_tail(time, hours_field(time, hours)?, rest, &['.'])
            }
            _ => Err(CoreError::invalid_time(time, "expected [HH:]MM:SS.mmm")),
        }
    }

    /// Format as a VTT time, always including hours
    #[must_use]
    pub fn to_vtt_time(self) -> String {
        format!(
            "{:02}:{:02}:{:02}.{:03}",
            self.hours(),
            self.minutes(),
            self.seconds(),
            self.millis()
        )
    }

    /// Time of frame `frame` at `frame_rate` frames per second
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTime`] when the rate is not a positive
    /// finite number.
    pub fn from_sub_frames(frame: u64, frame_rate: f64) -> Result<Self> {
        check_frame_rate(frame_rate)?;
        Ok(Self::from_micros(
            (frame as f64 * 1_000_000.0 / frame_rate).round() as u64,
        ))
    }

    /// Parse a MicroDVD frame number
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTime`] when `frame` is not a number or the
    /// rate is invalid.
    pub fn from_sub_time(frame: &str, frame_rate: f64) -> Result<Self> {
        let frame = frame
            .trim()
            .parse::<u64>()
            .map_err(|_| CoreError::invalid_time(frame, "frame number expected"))?;
        Self::from_sub_frames(frame, frame_rate)
    }

    /// Nearest frame number at `frame_rate`
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTime`] when the rate is not a positive
    /// finite number.
    pub fn to_sub_frames(self, frame_rate: f64) -> Result<u64> {
        check_frame_rate(frame_rate)?;
        Ok((self.as_micros() as f64 * frame_rate / 1_000_000.0).round() as u64)
    }
}

fn check_frame_rate(frame_rate: f64) -> Result<()> {
    if frame_rate.is_finite() && frame_rate > 0.0 {
        Ok(())
    } else {
        Err(CoreError::invalid_time(
            frame_rate,
            "frame rate must be positive",
        ))
    }
}
