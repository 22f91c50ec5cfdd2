use crate::clip_store::ClipStore;
use crate::config::TimelineConfig;
use crate::drag::{DragController, DragState, DragUpdate, PointerSurface};
use crate::error::Result;
use crate::frame::*;
use crate::mapper::{CoordinateMapper, Viewport};
use crate::media::MediaElement;
use crate::playback::{FrameHandle, FrameScheduler, PlaybackClock, PlaybackState, Tick};
use crate::types::*;
use std::time::Duration;

/// One editing session: the clips, the playhead, and everything that moves them.
///
/// Pointer coordinates passed in are relative to the container's left edge.
/// Every playhead change is pushed to the bound media element.
pub struct TimelineView {
    config: TimelineConfig,
    clips: ClipStore,
    playhead: TimeUs,
    drag: DragController,
    clock: PlaybackClock,
    viewport: Box<dyn Viewport>,
    media: Option<Box<dyn MediaElement>>,
}

impl std::fmt::Debug for TimelineView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimelineView")
            .field("config", &self.config)
            .field("clips", &self.clips)
            .field("playhead", &self.playhead)
            .field("drag", &self.drag)
            .field("clock", &self.clock)
            .field("media_bound", &self.media.is_some())
            .finish_non_exhaustive()
    }
}

impl TimelineView {
    pub fn new(
        config: TimelineConfig,
        viewport: Box<dyn Viewport>,
        surface: Box<dyn PointerSurface>,
        scheduler: Box<dyn FrameScheduler>,
    ) -> Result<Self> {
        config.validate()?;
        let clock = PlaybackClock::new(&config, scheduler);
        Ok(Self {
            config,
            clips: ClipStore::new(),
            playhead: TimeUs::ZERO,
            drag: DragController::new(surface),
            clock,
            viewport,
            media: None,
        })
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    pub fn clips(&self) -> &ClipStore {
        &self.clips
    }

    pub fn playhead(&self) -> TimeUs {
        self.playhead
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.clock.state()
    }

    pub fn is_playing(&self) -> bool {
        self.clock.is_playing()
    }

    pub fn drag_state(&self) -> &DragState {
        self.drag.state()
    }

    pub fn pending_frame(&self) -> Option<FrameHandle> {
        self.clock.pending_frame()
    }

    // -----------------------------------------------------------------------
    // media binding
    // -----------------------------------------------------------------------

    pub fn bind_media(&mut self, media: Box<dyn MediaElement>) {
        self.media = Some(media);
        tracing::info!("media element bound");
        self.mirror_playhead();
    }

    /// Metadata-available notification from the bound media: pulls its
    /// duration once and seeds the clip store. Returns false if no duration
    /// is available yet.
    pub fn on_media_metadata(&mut self) -> bool {
        let Some(duration) = self.media.as_ref().and_then(|m| m.duration()) else {
            tracing::debug!("metadata notification without a known duration");
            return false;
        };
        self.on_media_duration(duration.as_seconds())
    }

    /// Seed the clip store with one clip spanning the media's duration.
    pub fn on_media_duration(&mut self, duration_secs: f64) -> bool {
        match self.clips.seed_from_media(duration_secs) {
            Ok(id) => {
                tracing::info!(clip = %id, duration_secs, "media duration known, clip seeded");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "ignoring media duration");
                false
            }
        }
    }

    // -----------------------------------------------------------------------
    // pointer input
    // -----------------------------------------------------------------------

    /// Click on the timeline background. Ignored while a drag is active.
    pub fn click_background(&mut self, pointer_x: f64) -> bool {
        let mapper = self.mapper();
        match self.drag.background_click(pointer_x, &mapper) {
            Some(time) => {
                self.set_playhead(time);
                true
            }
            None => false,
        }
    }

    pub fn press_playhead(&mut self) -> bool {
        self.drag.begin_playhead_drag()
    }

    pub fn press_clip(&mut self, id: &ClipId, pointer_x: f64) -> bool {
        let mapper = self.mapper();
        self.drag.begin_clip_drag(id, pointer_x, &self.clips, &mapper)
    }

    pub fn pointer_move(&mut self, pointer_x: f64) -> DragUpdate {
        let mapper = self.mapper();
        let update = self
            .drag
            .pointer_move(pointer_x, &mut self.clips, &mapper, &self.config);
        if let DragUpdate::Playhead(time) = update {
            self.set_playhead(time);
        }
        update
    }

    pub fn pointer_up(&mut self) -> bool {
        self.drag.pointer_up()
    }

    // -----------------------------------------------------------------------
    // playback
    // -----------------------------------------------------------------------

    pub fn play(&mut self) -> bool {
        let mut playhead = self.playhead;
        if !self.clock.play(&mut playhead) {
            return false;
        }
        if playhead != self.playhead {
            self.set_playhead(playhead);
        }
        if let Some(media) = self.media.as_mut() {
            if let Err(e) = media.play() {
                tracing::warn!(error = %e, "media play request failed, playhead keeps running");
            }
        }
        tracing::info!(from = %self.playhead, "playback started");
        true
    }

    pub fn pause(&mut self) -> bool {
        if !self.clock.pause() {
            return false;
        }
        self.pause_media();
        tracing::info!(at = %self.playhead, "playback paused");
        true
    }

    pub fn toggle_playback(&mut self) -> bool {
        if self.is_playing() {
            self.pause()
        } else {
            self.play()
        }
    }

    /// Scheduled frame callback. Returns true if the playhead moved.
    pub fn on_frame(&mut self, handle: FrameHandle, now: Duration) -> bool {
        let mut playhead = self.playhead;
        match self.clock.tick(handle, now, &mut playhead) {
            Tick::Ignored => false,
            Tick::Advanced(_) => {
                self.set_playhead(playhead);
                true
            }
            Tick::Finished => {
                self.set_playhead(playhead);
                self.pause_media();
                tracing::info!("playback finished");
                true
            }
        }
    }

    // -----------------------------------------------------------------------
    // rendering
    // -----------------------------------------------------------------------

    pub fn time_markers(&self) -> Vec<TimeUs> {
        time_markers(self.config.total_duration())
    }

    pub fn render(&self) -> TimelineFrame {
        let mapper = self.mapper();
        let markers = self.time_markers();

        let ruler = markers
            .iter()
            .map(|&t| TickFrame {
                time_us: t,
                left_px: mapper.time_to_pixel(t),
                label: format!("{}s", t.as_seconds()),
            })
            .collect();
        let grid_px = markers.iter().map(|&t| mapper.time_to_pixel(t)).collect();

        let dragged = self.drag.dragged_clip();
        let clips = self
            .clips
            .iter()
            .map(|clip| ClipFrame {
                id: clip.id.clone(),
                label: clip.label.clone(),
                color: clip.color.clone(),
                left_px: mapper.time_to_pixel(clip.start_us),
                width_px: mapper.time_to_pixel(clip.duration_us),
                is_dragged: dragged == Some(&clip.id),
                title: format!(
                    "{}: {:.1}s - {:.1}s",
                    clip.label,
                    clip.start_us.as_seconds(),
                    clip.end_us().as_seconds()
                ),
            })
            .collect();

        let is_playing = self.is_playing();
        TimelineFrame {
            width_px: mapper.width_px(),
            header: HeaderFrame {
                total_duration_label: format!("{}s", self.config.total_duration_secs),
                current_label: seconds_label(self.playhead),
                is_playing,
                toggle_label: if is_playing { "Pause" } else { "Play" },
            },
            ruler,
            grid_px,
            clips,
            playhead: PlayheadFrame {
                time_us: self.playhead,
                left_px: mapper.time_to_pixel(self.playhead),
                title: format!("Playhead: {}", seconds_label(self.playhead)),
            },
            drag: self.drag.state().kind(),
        }
    }

    // -----------------------------------------------------------------------
    // internals
    // -----------------------------------------------------------------------

    fn mapper(&self) -> CoordinateMapper {
        CoordinateMapper::measure(self.config.total_duration(), self.viewport.as_ref())
    }

    fn set_playhead(&mut self, time: TimeUs) {
        self.playhead = time.clamp_within(TimeUs::ZERO, self.config.total_duration());
        self.mirror_playhead();
    }

    fn mirror_playhead(&mut self) {
        let time = self.playhead;
        if let Some(media) = self.media.as_mut() {
            if let Err(e) = media.seek(time) {
                tracing::warn!(error = %e, at = %time, "media seek failed");
            }
        }
    }

    fn pause_media(&mut self) {
        if let Some(media) = self.media.as_mut() {
            if let Err(e) = media.pause() {
                tracing::warn!(error = %e, "media pause request failed");
            }
        }
    }
}
