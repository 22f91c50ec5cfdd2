use crate::clip_store::ClipStore;
use crate::collision::resolve_collision;
use crate::config::TimelineConfig;
use crate::error::CoreError;
use crate::mapper::CoordinateMapper;
use crate::snapping::{clamp_clip_start, snap_to_grid};
use crate::types::*;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DragKind {
    Playhead,
    Clip,
}

/// The global input surface a drag gesture takes over.
///
/// `capture` attaches the window-wide move/up listeners and applies the
/// grab cursor and selection suppression; `release` removes all of it.
/// Calls always alternate, starting with `capture`.
pub trait PointerSurface {
    fn capture(&mut self, kind: DragKind);
    fn release(&mut self);
}

/// Surface for hosts that deliver pointer events without listener management.
#[derive(Debug, Default)]
pub struct NoopSurface;

impl PointerSurface for NoopSurface {
    fn capture(&mut self, _kind: DragKind) {}
    fn release(&mut self) {}
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Playhead,
    Clip {
        id: ClipId,
        /// Pointer x minus the clip's left edge at grab time.
        offset_px: f64,
    },
}

impl DragState {
    pub fn kind(&self) -> Option<DragKind> {
        match self {
            DragState::Idle => None,
            DragState::Playhead => Some(DragKind::Playhead),
            DragState::Clip { .. } => Some(DragKind::Clip),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, DragState::Idle)
    }
}

/// What a pointer move produced.
#[derive(Debug, Clone, PartialEq)]
pub enum DragUpdate {
    None,
    Playhead(TimeUs),
    Clip { id: ClipId, start_us: TimeUs },
}

/// Owns the single active gesture and the surface capture that goes with it.
pub struct DragController {
    state: DragState,
    surface: Box<dyn PointerSurface>,
}

impl std::fmt::Debug for DragController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DragController")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl DragController {
    pub fn new(surface: Box<dyn PointerSurface>) -> Self {
        Self {
            state: DragState::Idle,
            surface,
        }
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state.is_idle()
    }

    pub fn dragged_clip(&self) -> Option<&ClipId> {
        match &self.state {
            DragState::Clip { id, .. } => Some(id),
            _ => None,
        }
    }

    /// Pointer-down on the playhead handle. Returns false if a drag is already active.
    pub fn begin_playhead_drag(&mut self) -> bool {
        self.enter(DragState::Playhead)
    }

    /// Pointer-down on a clip. Ignored when a drag is active, the clip is
    /// unknown, or the viewport has not been measured.
    pub fn begin_clip_drag(
        &mut self,
        id: &ClipId,
        pointer_x: f64,
        store: &ClipStore,
        mapper: &CoordinateMapper,
    ) -> bool {
        if !self.is_idle() {
            return false;
        }
        if !mapper.is_measured() {
            tracing::debug!(clip = %id, "clip drag ignored: viewport not measured");
            return false;
        }
        let Some(clip) = store.find_by_id(id) else {
            tracing::debug!(clip = %id, "clip drag ignored: no such clip");
            return false;
        };
        let offset_px = pointer_x - mapper.time_to_pixel(clip.start_us);
        self.enter(DragState::Clip {
            id: id.clone(),
            offset_px,
        })
    }

    /// Global pointer-move while a drag is active.
    ///
    /// Clip moves are committed to `store` here; a resolved position that still
    /// overlaps another clip is dropped and the clip stays where it was.
    pub fn pointer_move(
        &mut self,
        pointer_x: f64,
        store: &mut ClipStore,
        mapper: &CoordinateMapper,
        config: &TimelineConfig,
    ) -> DragUpdate {
        if self.is_idle() || !mapper.is_measured() {
            return DragUpdate::None;
        }
        let x = pointer_x.clamp(0.0, mapper.width_px());

        match &self.state {
            DragState::Idle => DragUpdate::None,
            DragState::Playhead => DragUpdate::Playhead(mapper.pixel_to_clamped_time(x)),
            DragState::Clip { id, offset_px } => {
                let Some(clip) = store.find_by_id(id) else {
                    return DragUpdate::None;
                };
                let duration = clip.duration_us;
                let total = config.total_duration();

                let candidate = mapper.pixel_to_time(x - offset_px);
                let snapped = snap_to_grid(candidate, config.snap_interval());
                let clamped = clamp_clip_start(snapped, duration, total);
                let resolved = resolve_collision(
                    clamped,
                    duration,
                    store.all_except(id),
                    total,
                    config.collision_order,
                );

                match store.move_clip(id, resolved) {
                    Ok(()) => DragUpdate::Clip {
                        id: id.clone(),
                        start_us: resolved,
                    },
                    Err(CoreError::OverlapDetected) => {
                        tracing::debug!(clip = %id, start = %resolved, "no free slot, clip left in place");
                        DragUpdate::None
                    }
                    Err(e) => {
                        tracing::debug!(clip = %id, error = %e, "clip move dropped");
                        DragUpdate::None
                    }
                }
            }
        }
    }

    /// Global pointer-up. Returns true if a drag was ended.
    pub fn pointer_up(&mut self) -> bool {
        self.end()
    }

    /// Background click: the clamped seek target, or `None` while dragging
    /// or before the viewport is measured.
    pub fn background_click(&self, pointer_x: f64, mapper: &CoordinateMapper) -> Option<TimeUs> {
        if !self.is_idle() || !mapper.is_measured() {
            return None;
        }
        Some(mapper.pixel_to_clamped_time(pointer_x))
    }

    /// End any active drag and release the surface. Safe to call repeatedly.
    pub fn end(&mut self) -> bool {
        if self.is_idle() {
            return false;
        }
        let previous = std::mem::take(&mut self.state);
        self.surface.release();
        tracing::debug!(kind = ?previous.kind(), "drag ended");
        true
    }

    fn enter(&mut self, next: DragState) -> bool {
        if !self.is_idle() {
            tracing::debug!(active = ?self.state.kind(), "drag start ignored: another drag is active");
            return false;
        }
        let Some(kind) = next.kind() else {
            return false;
        };
        self.surface.capture(kind);
        self.state = next;
        tracing::debug!(?kind, "drag started");
        true
    }
}

impl Drop for DragController {
    fn drop(&mut self) {
        self.end();
    }
}
