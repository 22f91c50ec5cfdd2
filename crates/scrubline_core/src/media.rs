use crate::error::MediaError;
use crate::types::TimeUs;

/// The playable media element bound to a timeline session.
///
/// The session only pushes into it (play, pause, seek) and pulls its duration
/// once metadata is available. Loading and error reporting stay with the host.
pub trait MediaElement {
    fn play(&mut self) -> Result<(), MediaError>;
    fn pause(&mut self) -> Result<(), MediaError>;
    fn seek(&mut self, time: TimeUs) -> Result<(), MediaError>;
    /// `None` until the media's metadata has loaded.
    fn duration(&self) -> Option<TimeUs>;
}
