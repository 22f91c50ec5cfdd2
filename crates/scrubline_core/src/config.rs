use crate::error::{CoreError, Result};
use crate::types::TimeUs;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Longest accepted timeline. Keeps the ruler and all time arithmetic bounded.
pub const MAX_TOTAL_DURATION_SECS: f64 = 24.0 * 60.0 * 60.0;

/// Order in which the other clips are visited when resolving a clip-drag collision.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CollisionOrder {
    /// Collection order. Results may depend on it when three or more clips are close.
    #[default]
    Store,
    /// Ascending start time, ties broken by collection order.
    ByStart,
}

/// Per-session timeline settings, fixed once the session is built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimelineConfig {
    pub total_duration_secs: f64,
    pub snap_interval_secs: f64,
    pub frame_step_secs: f64,
    pub collision_order: CollisionOrder,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            total_duration_secs: 60.0,
            snap_interval_secs: 1.0,
            frame_step_secs: 1.0 / 60.0,
            collision_order: CollisionOrder::Store,
        }
    }
}

impl TimelineConfig {
    pub fn with_total_duration(total_duration_secs: f64) -> Self {
        Self {
            total_duration_secs,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        check_positive("total_duration_secs", self.total_duration_secs)?;
        check_positive("snap_interval_secs", self.snap_interval_secs)?;
        check_positive("frame_step_secs", self.frame_step_secs)?;
        if self.total_duration_secs > MAX_TOTAL_DURATION_SECS {
            return Err(CoreError::InvalidConfig(format!(
                "total_duration_secs must be at most {MAX_TOTAL_DURATION_SECS}, got {}",
                self.total_duration_secs
            )));
        }
        for (name, value) in [
            ("snap_interval_secs", self.snap_interval_secs),
            ("frame_step_secs", self.frame_step_secs),
        ] {
            if value > self.total_duration_secs {
                return Err(CoreError::InvalidConfig(format!(
                    "{name} must not exceed total_duration_secs, got {value}"
                )));
            }
        }
        if self.total_duration() <= TimeUs::ZERO || self.snap_interval() <= TimeUs::ZERO {
            return Err(CoreError::InvalidConfig(
                "durations must be at least one microsecond".into(),
            ));
        }
        Ok(())
    }

    pub fn total_duration(&self) -> TimeUs {
        TimeUs::from_seconds(self.total_duration_secs)
    }

    pub fn snap_interval(&self) -> TimeUs {
        TimeUs::from_seconds(self.snap_interval_secs)
    }

    pub fn frame_step(&self) -> TimeUs {
        TimeUs::from_seconds(self.frame_step_secs)
    }

    /// Save as pretty-printed JSON.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    /// Load and validate. Missing fields take their defaults.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config: TimelineConfig = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }
}

fn check_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(CoreError::InvalidConfig(format!(
            "{name} must be a positive number, got {value}"
        )))
    }
}
