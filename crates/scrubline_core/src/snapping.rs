use crate::types::TimeUs;

/// Round `position_us` to the nearest multiple of `interval_us`.
/// Halfway points round towards positive infinity.
pub fn snap_to_grid(position_us: TimeUs, interval_us: TimeUs) -> TimeUs {
    if interval_us <= TimeUs::ZERO {
        return position_us;
    }
    let half = interval_us.0 / 2;
    TimeUs((position_us.0 + half).div_euclid(interval_us.0) * interval_us.0)
}

/// Clamp a clip start so the clip stays inside `[0, total_duration]`.
/// A clip longer than the timeline is pinned to 0.
pub fn clamp_clip_start(start_us: TimeUs, duration_us: TimeUs, total_duration: TimeUs) -> TimeUs {
    start_us.clamp_within(TimeUs::ZERO, total_duration - duration_us)
}
