use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Div, Mul, Sub};

// ---------------------------------------------------------------------------
// TimeUs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeUs(pub i64);

impl TimeUs {
    pub const ZERO: Self = Self(0);
    pub const SECOND: Self = Self(1_000_000);

    /// Converts float seconds, rounding to the nearest microsecond.
    /// Non-finite input maps to zero.
    pub fn from_seconds(s: f64) -> Self {
        if !s.is_finite() {
            return Self::ZERO;
        }
        Self((s * 1_000_000.0).round() as i64)
    }

    pub fn as_seconds(&self) -> f64 {
        self.0 as f64 / 1_000_000.0
    }

    pub fn clamp_within(self, min: Self, max: Self) -> Self {
        // Degenerate ranges (max < min) resolve to min.
        if self > max {
            max.max(min)
        } else if self < min {
            min
        } else {
            self
        }
    }
}

impl Add for TimeUs {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for TimeUs {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Mul<i64> for TimeUs {
    type Output = Self;
    fn mul(self, rhs: i64) -> Self {
        Self(self.0 * rhs)
    }
}

impl Div<i64> for TimeUs {
    type Output = Self;
    fn div(self, rhs: i64) -> Self {
        Self(self.0 / rhs)
    }
}

impl fmt::Display for TimeUs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total_us = self.0.unsigned_abs();
        let total_ms = total_us / 1_000;
        let ms = total_ms % 1_000;
        let total_secs = total_ms / 1_000;
        let secs = total_secs % 60;
        let total_mins = total_secs / 60;
        let mins = total_mins % 60;
        let hours = total_mins / 60;
        if self.0 < 0 {
            write!(f, "-{:02}:{:02}:{:02}.{:03}", hours, mins, secs, ms)
        } else {
            write!(f, "{:02}:{:02}:{:02}.{:03}", hours, mins, secs, ms)
        }
    }
}

// ---------------------------------------------------------------------------
// ClipId
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ClipId(pub String);

impl ClipId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClipId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ClipId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ---------------------------------------------------------------------------
// Clip
// ---------------------------------------------------------------------------

/// An occupied interval `[start_us, start_us + duration_us)` on the timeline.
/// `label` and `color` are carried through to rendering only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Clip {
    pub id: ClipId,
    pub start_us: TimeUs,
    pub duration_us: TimeUs,
    pub label: String,
    pub color: String,
}

impl Clip {
    pub fn new(
        id: impl Into<ClipId>,
        start_us: TimeUs,
        duration_us: TimeUs,
        label: impl Into<String>,
        color: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            start_us,
            duration_us,
            label: label.into(),
            color: color.into(),
        }
    }

    pub fn end_us(&self) -> TimeUs {
        self.start_us + self.duration_us
    }

    pub fn overlaps(&self, start_us: TimeUs, duration_us: TimeUs) -> bool {
        intervals_overlap(self.start_us, self.duration_us, start_us, duration_us)
    }
}

/// Half-open interval intersection: `[a, a+a_len)` vs `[b, b+b_len)`.
pub fn intervals_overlap(a: TimeUs, a_len: TimeUs, b: TimeUs, b_len: TimeUs) -> bool {
    a < b + b_len && b < a + a_len
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_us_add_sub() {
        let a = TimeUs(5_000_000);
        let b = TimeUs(3_000_000);
        assert_eq!(a + b, TimeUs(8_000_000));
        assert_eq!(a - b, TimeUs(2_000_000));
    }

    #[test]
    fn time_us_from_seconds_rounds() {
        assert_eq!(TimeUs::from_seconds(2.5), TimeUs(2_500_000));
        assert_eq!(TimeUs::from_seconds(42.5), TimeUs(42_500_000));
        // 0.1 * 1e6 is not exact in binary, rounding keeps it on the microsecond
        assert_eq!(TimeUs::from_seconds(0.1), TimeUs(100_000));
        assert!((TimeUs(2_500_000).as_seconds() - 2.5).abs() < 1e-9);
    }

    #[test]
    fn time_us_from_non_finite_is_zero() {
        assert_eq!(TimeUs::from_seconds(f64::NAN), TimeUs::ZERO);
        assert_eq!(TimeUs::from_seconds(f64::INFINITY), TimeUs::ZERO);
    }

    #[test]
    fn time_us_display() {
        assert_eq!(TimeUs(0).to_string(), "00:00:00.000");
        assert_eq!(TimeUs(1_500_000).to_string(), "00:00:01.500");
        assert_eq!(TimeUs::from_seconds(3661.5).to_string(), "01:01:01.500");
        assert_eq!(TimeUs(-2_000_000).to_string(), "-00:00:02.000");
    }

    #[test]
    fn time_us_clamp() {
        let lo = TimeUs::ZERO;
        let hi = TimeUs(60_000_000);
        assert_eq!(TimeUs(-5).clamp_within(lo, hi), lo);
        assert_eq!(TimeUs(70_000_000).clamp_within(lo, hi), hi);
        assert_eq!(TimeUs(30_000_000).clamp_within(lo, hi), TimeUs(30_000_000));
        // max below min collapses to min
        assert_eq!(TimeUs(10).clamp_within(lo, TimeUs(-1)), lo);
    }

    #[test]
    fn time_us_mul_div() {
        let t = TimeUs(2_000_000);
        assert_eq!(t * 3, TimeUs(6_000_000));
        assert_eq!(t / 2, TimeUs(1_000_000));
    }

    #[test]
    fn clip_id_serializes_as_plain_string() {
        let id = ClipId::new("main-video");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"main-video\"");
        let back: ClipId = serde_json::from_str("\"main-video\"").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn clip_end_and_overlap() {
        let clip = Clip::new("a", TimeUs(0), TimeUs(10_000_000), "A", "red");
        assert_eq!(clip.end_us(), TimeUs(10_000_000));
        assert!(clip.overlaps(TimeUs(9_999_999), TimeUs(5_000_000)));
        // half-open: touching intervals do not overlap
        assert!(!clip.overlaps(TimeUs(10_000_000), TimeUs(5_000_000)));
        assert!(!clip.overlaps(TimeUs(-5_000_000), TimeUs(5_000_000)));
    }

    #[test]
    fn contained_interval_overlaps() {
        assert!(intervals_overlap(
            TimeUs(0),
            TimeUs(30_000_000),
            TimeUs(10_000_000),
            TimeUs(1_000_000)
        ));
    }
}
