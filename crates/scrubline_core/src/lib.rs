//! Timeline interaction engine: maps time to pixels, relocates clips on a
//! single occupancy track, and drives a playhead kept in step with a bound
//! media element.

pub mod clip_store;
pub mod collision;
pub mod config;
pub mod drag;
pub mod error;
pub mod frame;
pub mod mapper;
pub mod media;
pub mod playback;
pub mod snapping;
pub mod types;
pub mod view;

pub use clip_store::ClipStore;
pub use config::{CollisionOrder, TimelineConfig};
pub use drag::{DragKind, DragState, DragUpdate, NoopSurface, PointerSurface};
pub use error::{CoreError, MediaError, Result};
pub use frame::TimelineFrame;
pub use mapper::{CoordinateMapper, SharedWidth, Viewport};
pub use media::MediaElement;
pub use playback::{FrameHandle, FrameScheduler, PlaybackState};
pub use types::{Clip, ClipId, TimeUs};
pub use view::TimelineView;
