use crate::protocol::HostCommand;
use scrubline_core::{
    DragKind, FrameHandle, FrameScheduler, MediaElement, MediaError, PointerSurface, SharedWidth,
    TimeUs, TimelineConfig, TimelineView,
};
use scrubline_preview::{MpvOptions, MpvPlayer};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// IntervalFrames
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct FrameQueue {
    next_id: u64,
    pending: Option<FrameHandle>,
}

/// Frame scheduler fed by the host's fixed-rate interval: a requested frame
/// is delivered on the next interval tick.
#[derive(Debug, Clone, Default)]
pub struct IntervalFrames(Rc<RefCell<FrameQueue>>);

impl IntervalFrames {
    pub fn take_due(&self) -> Option<FrameHandle> {
        self.0.borrow_mut().pending.take()
    }
}

impl FrameScheduler for IntervalFrames {
    fn request_frame(&mut self) -> FrameHandle {
        let mut queue = self.0.borrow_mut();
        queue.next_id += 1;
        let handle = FrameHandle(queue.next_id);
        queue.pending = Some(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        let mut queue = self.0.borrow_mut();
        if queue.pending == Some(handle) {
            queue.pending = None;
        }
    }
}

// ---------------------------------------------------------------------------
// TracingSurface
// ---------------------------------------------------------------------------

/// The front end owns the real listeners and cursor; it follows the `drag`
/// field of each frame. This side only records the capture for diagnostics.
#[derive(Debug, Default)]
struct TracingSurface {
    captured: Option<DragKind>,
}

impl PointerSurface for TracingSurface {
    fn capture(&mut self, kind: DragKind) {
        self.captured = Some(kind);
        tracing::debug!(?kind, "pointer captured");
    }

    fn release(&mut self) {
        tracing::debug!(kind = ?self.captured.take(), "pointer released");
    }
}

// ---------------------------------------------------------------------------
// SharedPlayer
// ---------------------------------------------------------------------------

/// mpv handle shared between the session (which loads media) and the view
/// (which plays, pauses, and seeks it).
#[derive(Clone)]
struct SharedPlayer(Rc<RefCell<MpvPlayer>>);

impl MediaElement for SharedPlayer {
    fn play(&mut self) -> Result<(), MediaError> {
        self.0.borrow_mut().play()
    }

    fn pause(&mut self) -> Result<(), MediaError> {
        self.0.borrow_mut().pause()
    }

    fn seek(&mut self, time: TimeUs) -> Result<(), MediaError> {
        self.0.borrow_mut().seek(time)
    }

    fn duration(&self) -> Option<TimeUs> {
        self.0.borrow().duration()
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// What the run loop should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Emit,
    Quit,
}

/// A timeline view and the host resources wired to it.
pub struct Session {
    pub id: Uuid,
    view: TimelineView,
    width: SharedWidth,
    frames: IntervalFrames,
    player: Option<SharedPlayer>,
    awaiting_metadata: bool,
    started: Instant,
}

impl Session {
    pub fn new(config: TimelineConfig) -> scrubline_core::Result<Self> {
        let width = SharedWidth::new();
        let frames = IntervalFrames::default();
        let view = TimelineView::new(
            config,
            Box::new(width.clone()),
            Box::new(TracingSurface::default()),
            Box::new(frames.clone()),
        )?;
        let id = Uuid::new_v4();
        tracing::info!(session = %id, "session created");
        Ok(Self {
            id,
            view,
            width,
            frames,
            player: None,
            awaiting_metadata: false,
            started: Instant::now(),
        })
    }

    /// Spawn mpv and bind it as the session's media element.
    pub fn attach_mpv(&mut self, options: &MpvOptions) -> scrubline_preview::error::Result<()> {
        let mut player = MpvPlayer::new();
        player.start(options)?;
        let shared = SharedPlayer(Rc::new(RefCell::new(player)));
        self.view.bind_media(Box::new(shared.clone()));
        self.player = Some(shared);
        Ok(())
    }

    pub fn view(&self) -> &TimelineView {
        &self.view
    }

    pub fn awaiting_metadata(&self) -> bool {
        self.awaiting_metadata
    }

    pub fn apply(&mut self, command: HostCommand) -> Step {
        match command {
            HostCommand::Resize { width } => {
                self.width.set(width);
            }
            HostCommand::Load { url } => self.load(&url),
            HostCommand::Metadata { duration } => {
                self.awaiting_metadata = false;
                self.view.on_media_duration(duration);
            }
            HostCommand::Click { x } => {
                self.view.click_background(x);
            }
            HostCommand::PlayheadDown => {
                self.view.press_playhead();
            }
            HostCommand::ClipDown { id, x } => {
                self.view.press_clip(&id, x);
            }
            HostCommand::Move { x } => {
                self.view.pointer_move(x);
            }
            HostCommand::Up => {
                self.view.pointer_up();
            }
            HostCommand::Play => {
                self.view.play();
            }
            HostCommand::Pause => {
                self.view.pause();
            }
            HostCommand::Toggle => {
                self.view.toggle_playback();
            }
            HostCommand::Render => {}
            HostCommand::Quit => return Step::Quit,
        }
        Step::Emit
    }

    /// Deliver the pending frame, if any. Returns true if the playhead moved.
    pub fn on_interval(&mut self) -> bool {
        match self.frames.take_due() {
            Some(handle) => self.view.on_frame(handle, self.started.elapsed()),
            None => false,
        }
    }

    /// Poll the bound player for its duration after a load. Returns true once
    /// the clip store has been seeded.
    pub fn poll_metadata(&mut self) -> bool {
        if !self.awaiting_metadata {
            return false;
        }
        if self.view.on_media_metadata() {
            self.awaiting_metadata = false;
            return true;
        }
        false
    }

    fn load(&mut self, url: &str) {
        let Some(player) = &self.player else {
            tracing::warn!(url, "no player bound; send a metadata command with the duration");
            return;
        };
        match player.0.borrow().load(url) {
            Ok(()) => {
                tracing::info!(url, "media loading");
                self.awaiting_metadata = true;
            }
            Err(e) => tracing::warn!(url, error = %e, "media load failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrubline_core::{ClipId, DragState, PlaybackState};

    fn make_session() -> Session {
        let mut session = Session::new(TimelineConfig::default()).unwrap();
        session.apply(HostCommand::Resize { width: 600.0 });
        session
    }

    #[test]
    fn interval_frames_deliver_once() {
        let mut frames = IntervalFrames::default();
        let h = frames.request_frame();
        assert_eq!(frames.take_due(), Some(h));
        assert_eq!(frames.take_due(), None);
    }

    #[test]
    fn cancel_only_drops_matching_frame() {
        let mut frames = IntervalFrames::default();
        let old = frames.request_frame();
        let new = frames.request_frame();
        frames.cancel_frame(old);
        assert_eq!(frames.take_due(), Some(new));
        let h = frames.request_frame();
        frames.cancel_frame(h);
        assert_eq!(frames.take_due(), None);
    }

    #[test]
    fn metadata_then_drag_moves_clip() {
        let mut session = make_session();
        session.apply(HostCommand::Metadata { duration: 20.0 });
        session.apply(HostCommand::ClipDown {
            id: ClipId::from("main-video"),
            x: 10.0,
        });
        assert!(matches!(session.view().drag_state(), DragState::Clip { .. }));
        session.apply(HostCommand::Move { x: 110.0 });
        session.apply(HostCommand::Up);
        assert_eq!(
            session.view().clips().clips()[0].start_us,
            TimeUs::SECOND * 10
        );
        assert!(session.view().drag_state().is_idle());
    }

    #[test]
    fn click_seeks() {
        let mut session = make_session();
        assert_eq!(session.apply(HostCommand::Click { x: 300.0 }), Step::Emit);
        assert_eq!(session.view().playhead(), TimeUs::SECOND * 30);
    }

    #[test]
    fn play_runs_on_interval_and_pause_stops() {
        let mut session = make_session();
        session.apply(HostCommand::Play);
        assert!(session.on_interval());
        assert!(session.view().playhead() > TimeUs::ZERO);
        session.apply(HostCommand::Toggle);
        assert_eq!(session.view().playback_state(), PlaybackState::Stopped);
        assert!(!session.on_interval());
    }

    #[test]
    fn load_without_player_does_not_wait() {
        let mut session = make_session();
        session.apply(HostCommand::Load {
            url: "anim.mp4".into(),
        });
        assert!(!session.awaiting_metadata());
        assert!(!session.poll_metadata());
    }

    #[test]
    fn quit_stops_the_loop() {
        let mut session = make_session();
        assert_eq!(session.apply(HostCommand::Quit), Step::Quit);
    }
}
