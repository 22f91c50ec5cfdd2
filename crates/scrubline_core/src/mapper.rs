use crate::types::TimeUs;
use std::cell::Cell;
use std::rc::Rc;

/// The host container the timeline is rendered into.
///
/// Read on every coordinate conversion; implementations must report the
/// current width, not a cached one. `None` means the container has not been
/// measured yet.
pub trait Viewport {
    fn width_px(&self) -> Option<f64>;
}

/// A width cell shared between the host (which writes it on layout/resize)
/// and the timeline view (which reads it on every conversion).
#[derive(Debug, Clone, Default)]
pub struct SharedWidth(Rc<Cell<Option<f64>>>);

impl SharedWidth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn measured(width_px: f64) -> Self {
        let shared = Self::new();
        shared.set(width_px);
        shared
    }

    pub fn set(&self, width_px: f64) {
        self.0.set(Some(width_px));
    }

    pub fn clear(&self) {
        self.0.set(None);
    }
}

impl Viewport for SharedWidth {
    fn width_px(&self) -> Option<f64> {
        self.0.get()
    }
}

/// Time <-> pixel conversion for one measurement of the viewport.
///
/// Build a fresh one per conversion batch via [`CoordinateMapper::measure`];
/// do not keep it across renders.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    total_duration: TimeUs,
    width_px: Option<f64>,
}

impl CoordinateMapper {
    pub fn new(total_duration: TimeUs, width_px: Option<f64>) -> Self {
        let width_px = width_px.filter(|w| w.is_finite() && *w > 0.0);
        let width_px = if total_duration > TimeUs::ZERO { width_px } else { None };
        Self {
            total_duration,
            width_px,
        }
    }

    pub fn measure(total_duration: TimeUs, viewport: &dyn Viewport) -> Self {
        Self::new(total_duration, viewport.width_px())
    }

    pub fn is_measured(&self) -> bool {
        self.width_px.is_some()
    }

    /// Measured width, or 0 when unmeasured.
    pub fn width_px(&self) -> f64 {
        self.width_px.unwrap_or(0.0)
    }

    pub fn total_duration(&self) -> TimeUs {
        self.total_duration
    }

    pub fn time_to_pixel(&self, time: TimeUs) -> f64 {
        match self.width_px {
            Some(width) => time.as_seconds() * width / self.total_duration.as_seconds(),
            None => 0.0,
        }
    }

    pub fn pixel_to_time(&self, pixel: f64) -> TimeUs {
        match self.width_px {
            Some(width) => TimeUs::from_seconds(pixel * self.total_duration.as_seconds() / width),
            None => TimeUs::ZERO,
        }
    }

    /// Like [`pixel_to_time`](Self::pixel_to_time) but clamped to `[0, total_duration]`.
    pub fn pixel_to_clamped_time(&self, pixel: f64) -> TimeUs {
        self.pixel_to_time(pixel)
            .clamp_within(TimeUs::ZERO, self.total_duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIXTY: TimeUs = TimeUs(60_000_000);

    #[test]
    fn unmeasured_viewport_maps_to_zero() {
        let mapper = CoordinateMapper::measure(SIXTY, &SharedWidth::new());
        assert!(!mapper.is_measured());
        assert_eq!(mapper.time_to_pixel(TimeUs(30_000_000)), 0.0);
        assert_eq!(mapper.pixel_to_time(300.0), TimeUs::ZERO);
    }

    #[test]
    fn zero_or_negative_width_is_unmeasured() {
        assert!(!CoordinateMapper::new(SIXTY, Some(0.0)).is_measured());
        assert!(!CoordinateMapper::new(SIXTY, Some(-10.0)).is_measured());
        assert!(!CoordinateMapper::new(SIXTY, Some(f64::NAN)).is_measured());
    }

    #[test]
    fn maps_linearly() {
        let mapper = CoordinateMapper::new(SIXTY, Some(600.0));
        assert_eq!(mapper.time_to_pixel(TimeUs(30_000_000)), 300.0);
        assert_eq!(mapper.pixel_to_time(300.0), TimeUs(30_000_000));
        assert_eq!(mapper.time_to_pixel(SIXTY), 600.0);
    }

    #[test]
    fn unclamped_outside_viewport() {
        let mapper = CoordinateMapper::new(SIXTY, Some(600.0));
        assert_eq!(mapper.pixel_to_time(-100.0), TimeUs(-10_000_000));
        assert_eq!(mapper.pixel_to_time(700.0), TimeUs(70_000_000));
        assert_eq!(mapper.pixel_to_clamped_time(-100.0), TimeUs::ZERO);
        assert_eq!(mapper.pixel_to_clamped_time(700.0), SIXTY);
    }

    #[test]
    fn round_trip_within_a_microsecond() {
        for width in [1.0, 333.0, 600.0, 1919.5, 4096.0] {
            let mapper = CoordinateMapper::new(SIXTY, Some(width));
            for us in [0, 1, 999_999, 12_345_678, 42_500_000, 59_999_999, 60_000_000] {
                let t = TimeUs(us);
                let back = mapper.pixel_to_time(mapper.time_to_pixel(t));
                assert!((back.0 - t.0).abs() <= 1, "width {width}: {t:?} -> {back:?}");
            }
        }
    }

    #[test]
    fn reads_width_at_measure_time() {
        let width = SharedWidth::measured(600.0);
        let before = CoordinateMapper::measure(SIXTY, &width);
        width.set(1200.0);
        let after = CoordinateMapper::measure(SIXTY, &width);
        assert_eq!(before.time_to_pixel(TimeUs(30_000_000)), 300.0);
        assert_eq!(after.time_to_pixel(TimeUs(30_000_000)), 600.0);
        width.clear();
        assert!(!CoordinateMapper::measure(SIXTY, &width).is_measured());
    }
}
