use scrubline_core::{ClipId, TimelineFrame};
use serde::{Deserialize, Serialize};

/// One line of input from the front end. Pointer `x` values are relative to
/// the timeline container's left edge.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostCommand {
    Resize { width: f64 },
    Load { url: String },
    Metadata { duration: f64 },
    Click { x: f64 },
    PlayheadDown,
    ClipDown { id: ClipId, x: f64 },
    Move { x: f64 },
    Up,
    Play,
    Pause,
    Toggle,
    Render,
    Quit,
}

/// One line of output.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    Frame(TimelineFrame),
    Error { message: String },
}

impl HostEvent {
    pub fn to_line(&self) -> serde_json::Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

pub fn parse_command(line: &str) -> serde_json::Result<HostCommand> {
    serde_json::from_str(line.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_unit_commands() {
        assert_eq!(parse_command(r#"{"type":"play"}"#).unwrap(), HostCommand::Play);
        assert_eq!(
            parse_command(r#"{"type":"playhead_down"}"#).unwrap(),
            HostCommand::PlayheadDown
        );
        assert_eq!(parse_command("  {\"type\":\"up\"}\n").unwrap(), HostCommand::Up);
    }

    #[test]
    fn parses_commands_with_fields() {
        assert_eq!(
            parse_command(r#"{"type":"clip_down","id":"main-video","x":12.5}"#).unwrap(),
            HostCommand::ClipDown {
                id: ClipId::from("main-video"),
                x: 12.5
            }
        );
        assert_eq!(
            parse_command(r#"{"type":"resize","width":800}"#).unwrap(),
            HostCommand::Resize { width: 800.0 }
        );
        assert_eq!(
            parse_command(r#"{"type":"load","url":"https://cdn.example/anim.mp4"}"#).unwrap(),
            HostCommand::Load {
                url: "https://cdn.example/anim.mp4".into()
            }
        );
    }

    #[test]
    fn rejects_unknown_or_incomplete() {
        assert!(parse_command(r#"{"type":"explode"}"#).is_err());
        assert!(parse_command(r#"{"type":"click"}"#).is_err());
        assert!(parse_command("not json").is_err());
    }

    #[test]
    fn error_event_line() {
        let line = HostEvent::Error {
            message: "bad".into(),
        }
        .to_line()
        .unwrap();
        assert_eq!(line, "{\"type\":\"error\",\"message\":\"bad\"}\n");
    }
}
