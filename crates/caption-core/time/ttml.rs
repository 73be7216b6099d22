//! TTML time expressions
//!
//! TTML accepts two shapes of time expression:
//!
//! - clock time `hh:mm:ss[.fraction]` or `hh:mm:ss:frames[.subframes]`
//! - offset time `<number><metric>` with metric `h`, `m`, `s`, `ms`, `f`
//!   (frames) or `t` (ticks)
//!
//! Frame and tick based values depend on parameters declared on the `<tt>`
//! element. When a value needs a parameter that was never declared, parsing
//! fails with [`CoreError::MissingParameter`] naming it.

use super::MicroTime;
use crate::utils::{CoreError, Result};

/// Time base parameters declared on a TTML document
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TtmlTimeBase {
    /// Effective frames per second (`ttp:frameRate` times the multiplier)
    pub frame_rate: Option<f64>,
    /// Sub-frames per frame (`ttp:subFrameRate`)
    pub sub_frame_rate: Option<f64>,
    /// Ticks per second (`ttp:tickRate`)
    pub tick_rate: Option<f64>,
}

impl TtmlTimeBase {
    /// Build from raw `ttp:*` attribute values
    ///
    /// `frameRateMultiplier` is written as `"numerator denominator"` and
    /// scales the declared frame rate.
    #[must_use]
    pub fn from_attributes(
        frame_rate: Option<&str>,
        sub_frame_rate: Option<&str>,
        tick_rate: Option<&str>,
        frame_rate_multiplier: Option<&str>,
    ) -> Self {
        let positive = |value: Option<&str>| {
            value
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite() && *v > 0.0)
        };

        let multiplier = frame_rate_multiplier
            .and_then(|value| {
                let mut parts = value.split_whitespace().map(str::parse::<f64>);
                match (parts.next(), parts.next()) {
                    (Some(Ok(num)), Some(Ok(den))) if num > 0.0 && den > 0.0 => Some(num / den),
                    (Some(Ok(num)), None) if num > 0.0 => Some(num),
                    _ => None,
                }
            })
            .unwrap_or(1.0);

        Self {
            frame_rate: positive(frame_rate).map(|rate| rate * multiplier),
            sub_frame_rate: positive(sub_frame_rate),
            tick_rate: positive(tick_rate),
        }
    }

    /// Override the frame rate
    #[must_use]
    pub fn with_frame_rate(mut self, frame_rate: f64) -> Self {
        self.frame_rate = Some(frame_rate);
        self
    }

    /// Override the sub-frame rate
    #[must_use]
    pub fn with_sub_frame_rate(mut self, sub_frame_rate: f64) -> Self {
        self.sub_frame_rate = Some(sub_frame_rate);
        self
    }

    fn require_frame_rate(&self, time: &str) -> Result<f64> {
        self.frame_rate
            .ok_or_else(|| CoreError::missing_parameter("frameRate", &format!("TTML time '{time}'")))
    }

    fn require_sub_frame_rate(&self, time: &str) -> Result<f64> {
        self.sub_frame_rate.ok_or_else(|| {
            CoreError::missing_parameter("subFrameRate", &format!("TTML time '{time}'"))
        })
    }

    fn effective_tick_rate(&self) -> f64 {
        self.tick_rate
            .or_else(|| self.frame_rate.map(|rate| rate * self.sub_frame_rate.unwrap_or(1.0)))
            .unwrap_or(1.0)
    }
}

fn number(time: &str, digits: &str) -> Result<f64> {
    let value: f64 = digits
        .parse()
        .map_err(|_| CoreError::invalid_time(time, "number expected"))?;
    if !value.is_finite() || value < 0.0 {
        return Err(CoreError::invalid_time(time, "time cannot be negative"));
    }
    Ok(value)
}

fn integer(time: &str, digits: &str) -> Result<u64> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CoreError::invalid_time(time, "integer field expected"));
    }
    digits
        .parse()
        .map_err(|_| CoreError::invalid_time(time, "field out of range"))
}

/// Parse one TTML time expression
///
/// # Errors
///
/// Returns [`CoreError::InvalidTime`] for malformed expressions and
/// [`CoreError::MissingParameter`] when frames, sub-frames or ticks are
/// used without the rate they need.
pub fn parse_ttml_time(time: &str, base: &TtmlTimeBase) -> Result<MicroTime> {
    let trimmed = time.trim();
    if trimmed.contains(':') {
        return parse_clock_time(time, trimmed, base);
    }

    let split = trimmed
        .find(|c: char| c.is_ascii_alphabetic())
        .ok_or_else(|| CoreError::invalid_time(time, "missing time metric"))?;
    let (value, metric) = trimmed.split_at(split);
    let value = number(time, value)?;
    let seconds = match metric {
        "h" => value * 3_600.0,
        "m" => value * 60.0,
        "s" => value,
        "ms" => value / 1_000.0,
        "f" => value / base.require_frame_rate(time)?,
        "t" => value / base.effective_tick_rate(),
        _ => return Err(CoreError::invalid_time(time, "unknown time metric")),
    };
    Ok(MicroTime::from_secs_f64(seconds))
}

fn parse_clock_time(time: &str, trimmed: &str, base: &TtmlTimeBase) -> Result<MicroTime> {
    let fields: Vec<&str> = trimmed.split(':').collect();
    let (hours, minutes, seconds) = match fields.as_slice() {
        [h, m, s] | [h, m, s, _] => (*h, *m, *s),
        _ => return Err(CoreError::invalid_time(time, "expected hh:mm:ss")),
    };
    let hours = integer(time, hours)?;
    let minutes = integer(time, minutes)?;

    let mut total = MicroTime::from_parts(hours, minutes, 0, 0, 0);
    if let Some(frames) = fields.get(3) {
        let seconds = integer(time, seconds)?;
        total += MicroTime::from_parts(0, 0, seconds, 0, 0);
        let frame_rate = base.require_frame_rate(time)?;
        let frame_seconds = match frames.split_once('.') {
            Some((whole, sub)) => {
                let sub_frame_rate = base.require_sub_frame_rate(time)?;
                integer(time, whole)? as f64 / frame_rate
                    + integer(time, sub)? as f64 / (frame_rate * sub_frame_rate)
            }
            None => integer(time, frames)? as f64 / frame_rate,
        };
        total += MicroTime::from_secs_f64(frame_seconds);
    } else {
        total += MicroTime::from_secs_f64(number(time, seconds)?);
    }
    Ok(total)
}

/// Resolve a `begin`/`dur`/`end` triple into a start and optional end
///
/// A missing `begin` is zero. The end is `begin + dur` when a duration is
/// present, capped by an explicit `end`; `None` means the element is
/// unbounded.
///
/// # Errors
///
/// Propagates errors from [`parse_ttml_time`].
pub fn from_ttml_times(
    begin: Option<&str>,
    dur: Option<&str>,
    end: Option<&str>,
    base: &TtmlTimeBase,
) -> Result<(MicroTime, Option<MicroTime>)> {
    let start = begin
        .map(|value| parse_ttml_time(value, base))
        .transpose()?
        .unwrap_or_default();
    let explicit_end = end.map(|value| parse_ttml_time(value, base)).transpose()?;
    let from_dur = dur
        .map(|value| parse_ttml_time(value, base).map(|d| start + d))
        .transpose()?;

    let end = match (from_dur, explicit_end) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    };
    Ok((start, end))
}

impl MicroTime {
    /// Format as a TTML clock time `HH:MM:SS.mmm`
    #[must_use]
    pub fn to_ttml_time(self) -> String {
        self.to_vtt_time()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_metrics() {
        let base = TtmlTimeBase::default();
        assert_eq!(parse_ttml_time("1.5s", &base).unwrap(), MicroTime::from_millis(1_500));
        assert_eq!(parse_ttml_time("250ms", &base).unwrap(), MicroTime::from_millis(250));
        assert_eq!(parse_ttml_time("2m", &base).unwrap(), MicroTime::from_millis(120_000));
        assert_eq!(parse_ttml_time("0.5h", &base).unwrap(), MicroTime::from_parts(0, 30, 0, 0, 0));
        assert!(parse_ttml_time("3x", &base).is_err());
        assert!(parse_ttml_time("-3s", &base).is_err());
    }

    #[test]
    fn frames_need_frame_rate() {
        let base = TtmlTimeBase::default();
        let err = parse_ttml_time("00:00:01:12", &base).unwrap_err();
        assert!(matches!(err, CoreError::MissingParameter { ref parameter, .. } if parameter == "frameRate"));

        let base = base.with_frame_rate(24.0);
        assert_eq!(
            parse_ttml_time("00:00:01:12", &base).unwrap(),
            MicroTime::from_millis(1_500)
        );
        assert_eq!(parse_ttml_time("48f", &base).unwrap(), MicroTime::from_millis(2_000));
    }

    #[test]
    fn sub_frames_need_both_rates() {
        let base = TtmlTimeBase::default().with_frame_rate(25.0);
        let err = parse_ttml_time("00:00:00:01.1", &base).unwrap_err();
        assert!(matches!(err, CoreError::MissingParameter { ref parameter, .. } if parameter == "subFrameRate"));

        let base = base.with_sub_frame_rate(2.0);
        assert_eq!(
            parse_ttml_time("00:00:00:01.1", &base).unwrap(),
            MicroTime::from_millis(60)
        );
    }

    #[test]
    fn clock_fraction() {
        let base = TtmlTimeBase::default();
        assert_eq!(
            parse_ttml_time("01:02:03.25", &base).unwrap(),
            MicroTime::from_parts(1, 2, 3, 250, 0)
        );
        assert_eq!(MicroTime::from_parts(1, 2, 3, 250, 0).to_ttml_time(), "01:02:03.250");
    }

    #[test]
    fn ticks_and_multiplier() {
        let base = TtmlTimeBase::from_attributes(Some("30"), None, Some("10000000"), Some("1000 1001"));
        let rate = base.frame_rate.unwrap();
        assert!((rate - 29.970_03).abs() < 0.001);
        assert_eq!(parse_ttml_time("10000000t", &base).unwrap(), MicroTime::from_millis(1_000));
    }

    #[test]
    fn begin_dur_end() {
        let base = TtmlTimeBase::default();
        let (start, end) = from_ttml_times(Some("1s"), Some("2s"), None, &base).unwrap();
        assert_eq!(start, MicroTime::from_millis(1_000));
        assert_eq!(end, Some(MicroTime::from_millis(3_000)));

        let (_, end) = from_ttml_times(Some("1s"), Some("5s"), Some("4s"), &base).unwrap();
        assert_eq!(end, Some(MicroTime::from_millis(4_000)));

        let (start, end) = from_ttml_times(None, None, None, &base).unwrap();
        assert_eq!(start, MicroTime::ZERO);
        assert_eq!(end, None);
    }
}
