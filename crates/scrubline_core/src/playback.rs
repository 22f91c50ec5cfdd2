use crate::config::TimelineConfig;
use crate::types::TimeUs;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

/// Per-frame callback scheduling provided by the host (an animation-frame
/// queue, a fixed-rate interval, ...).
pub trait FrameScheduler {
    fn request_frame(&mut self) -> FrameHandle;
    fn cancel_frame(&mut self, handle: FrameHandle);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Stale or unexpected frame; nothing changed.
    Ignored,
    /// Playhead advanced and the next frame is scheduled.
    Advanced(TimeUs),
    /// Reached the end: stopped and rewound to zero.
    Finished,
}

/// Advances the playhead while playing, one scheduled frame at a time.
///
/// Holds at most one pending frame. Every way out of `Playing` (pause,
/// reaching the end, drop) cancels it.
pub struct PlaybackClock {
    state: PlaybackState,
    pending: Option<FrameHandle>,
    last_tick: Option<Duration>,
    frame_step: TimeUs,
    total_duration: TimeUs,
    scheduler: Box<dyn FrameScheduler>,
}

impl std::fmt::Debug for PlaybackClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackClock")
            .field("state", &self.state)
            .field("pending", &self.pending)
            .field("last_tick", &self.last_tick)
            .finish_non_exhaustive()
    }
}

impl PlaybackClock {
    pub fn new(config: &TimelineConfig, scheduler: Box<dyn FrameScheduler>) -> Self {
        Self {
            state: PlaybackState::Stopped,
            pending: None,
            last_tick: None,
            frame_step: config.frame_step(),
            total_duration: config.total_duration(),
            scheduler,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn pending_frame(&self) -> Option<FrameHandle> {
        self.pending
    }

    /// Start playing. A playhead at or past the end is rewound to zero first.
    /// Returns false (and changes nothing) if already playing.
    pub fn play(&mut self, playhead: &mut TimeUs) -> bool {
        if self.is_playing() {
            return false;
        }
        if *playhead >= self.total_duration {
            *playhead = TimeUs::ZERO;
        }
        self.state = PlaybackState::Playing;
        self.last_tick = None;
        self.pending = Some(self.scheduler.request_frame());
        true
    }

    /// Stop playing. Returns false if already stopped.
    pub fn pause(&mut self) -> bool {
        if !self.is_playing() {
            return false;
        }
        self.stop();
        true
    }

    /// Handle a scheduled frame at monotonic timestamp `now`.
    ///
    /// The playhead moves by the time elapsed since the previous frame. The
    /// first frame after `play`, or one whose timestamp does not move
    /// forward, advances by the configured nominal step instead.
    pub fn tick(&mut self, handle: FrameHandle, now: Duration, playhead: &mut TimeUs) -> Tick {
        if !self.is_playing() || self.pending != Some(handle) {
            return Tick::Ignored;
        }
        self.pending = None;

        let elapsed = self
            .last_tick
            .and_then(|last| now.checked_sub(last))
            .filter(|d| !d.is_zero())
            .map(|d| TimeUs(d.as_micros() as i64))
            .unwrap_or(self.frame_step);

        let next = *playhead + elapsed;
        if next >= self.total_duration {
            self.stop();
            *playhead = TimeUs::ZERO;
            tracing::debug!("playback reached the end, rewinding");
            return Tick::Finished;
        }

        *playhead = next;
        self.last_tick = Some(now);
        self.pending = Some(self.scheduler.request_frame());
        tracing::trace!(playhead = %next, "tick");
        Tick::Advanced(next)
    }

    fn stop(&mut self) {
        self.state = PlaybackState::Stopped;
        self.last_tick = None;
        if let Some(handle) = self.pending.take() {
            self.scheduler.cancel_frame(handle);
        }
    }
}

impl Drop for PlaybackClock {
    fn drop(&mut self) {
        self.stop();
    }
}
