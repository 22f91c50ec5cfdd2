use crate::drag::DragKind;
use crate::types::{ClipId, TimeUs};
use serde::Serialize;

/// Everything a front end needs to draw the timeline once.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TimelineFrame {
    pub width_px: f64,
    pub header: HeaderFrame,
    pub ruler: Vec<TickFrame>,
    /// Grid line offsets, one per ruler tick.
    pub grid_px: Vec<f64>,
    pub clips: Vec<ClipFrame>,
    pub playhead: PlayheadFrame,
    pub drag: Option<DragKind>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HeaderFrame {
    pub total_duration_label: String,
    pub current_label: String,
    pub is_playing: bool,
    /// Label of the play/pause affordance: the action a press would take.
    pub toggle_label: &'static str,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TickFrame {
    pub time_us: TimeUs,
    pub left_px: f64,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ClipFrame {
    pub id: ClipId,
    pub label: String,
    pub color: String,
    pub left_px: f64,
    pub width_px: f64,
    pub is_dragged: bool,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlayheadFrame {
    pub time_us: TimeUs,
    pub left_px: f64,
    pub title: String,
}

/// Ruler tick spacing for a timeline of the given length.
pub fn tick_interval(total_duration: TimeUs) -> TimeUs {
    let secs = if total_duration <= TimeUs::SECOND * 60 {
        5
    } else if total_duration <= TimeUs::SECOND * 300 {
        15
    } else {
        30
    };
    TimeUs::SECOND * secs
}

/// Tick times from zero up to and including `total_duration` when it lands on the grid.
pub fn time_markers(total_duration: TimeUs) -> Vec<TimeUs> {
    let interval = tick_interval(total_duration);
    let mut markers = Vec::new();
    let mut t = TimeUs::ZERO;
    while t <= total_duration {
        markers.push(t);
        t = t + interval;
    }
    markers
}

/// `"12.3s"`
pub fn seconds_label(time: TimeUs) -> String {
    format!("{:.1}s", time.as_seconds())
}
