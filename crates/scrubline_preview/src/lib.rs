//! Preview playback through an external mpv process, exposed as the media
//! element a timeline session binds to.

pub mod error;
mod ipc;
pub mod mpv;

pub use error::PreviewError;
pub use mpv::{MpvOptions, MpvPlayer};
