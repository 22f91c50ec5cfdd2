use crate::error::{PreviewError, Result};
use crate::ipc::IpcConnection;
use scrubline_core::{MediaElement, MediaError, TimeUs};
use serde_json::json;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

const SOCKET_POLL_INTERVAL: Duration = Duration::from_millis(100);
const SOCKET_POLL_ATTEMPTS: u32 = 50;
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct MpvOptions {
    pub binary: String,
    /// `WxH+X+Y`; mpv picks its own placement when `None`.
    pub geometry: Option<String>,
    pub title: String,
}

impl Default for MpvOptions {
    fn default() -> Self {
        Self {
            binary: "mpv".to_string(),
            geometry: None,
            title: "scrubline-preview".to_string(),
        }
    }
}

/// An mpv process driven over one persistent JSON IPC connection.
///
/// Starts idle and paused; the timeline decides when it plays and where it
/// seeks. Play, pause, seek and load only queue a request, and the duration
/// is the one mpv reported for the current file.
pub struct MpvPlayer {
    process: Option<Child>,
    ipc: Option<IpcConnection>,
    socket_path: PathBuf,
}

impl MpvPlayer {
    pub fn new() -> Self {
        let socket_path =
            std::env::temp_dir().join(format!("scrubline-mpv-{}", std::process::id()));
        Self {
            process: None,
            ipc: None,
            socket_path,
        }
    }

    pub fn start(&mut self, options: &MpvOptions) -> Result<()> {
        self.stop();

        let mut args = vec![
            "--idle=yes".to_string(),
            "--keep-open=yes".to_string(),
            "--pause=yes".to_string(),
            "--osc=no".to_string(),
            "--force-window=yes".to_string(),
            format!("--title={}", options.title),
            format!("--input-ipc-server={}", self.socket_path.display()),
        ];
        if let Some(geometry) = &options.geometry {
            args.push(format!("--geometry={geometry}"));
        }
        tracing::info!(binary = %options.binary, socket = %self.socket_path.display(), "starting mpv");

        let child = Command::new(&options.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(PreviewError::Spawn)?;
        self.process = Some(child);

        if let Err(e) = self.connect() {
            self.stop();
            return Err(e);
        }
        Ok(())
    }

    fn connect(&mut self) -> Result<()> {
        let mut attempts = 0;
        while !self.socket_path.exists() {
            attempts += 1;
            if attempts > SOCKET_POLL_ATTEMPTS {
                return Err(PreviewError::SocketTimeout(self.socket_path.clone()));
            }
            std::thread::sleep(SOCKET_POLL_INTERVAL);
        }
        let ipc = IpcConnection::connect(&self.socket_path)?;
        let version = ipc.call(json!(["get_property", "mpv-version"]), HANDSHAKE_TIMEOUT)?;
        tracing::info!(version = %version["data"], "mpv connected");
        self.ipc = Some(ipc);
        Ok(())
    }

    /// Open a media URL or path. The duration becomes available once mpv has
    /// loaded that file.
    pub fn load(&self, url: &str) -> Result<()> {
        self.ipc()?.load(url)
    }

    pub fn is_running(&self) -> bool {
        self.process.is_some() && self.ipc.is_some()
    }

    pub fn stop(&mut self) {
        self.ipc = None;
        if let Some(mut child) = self.process.take() {
            let _ = child.kill();
            let _ = child.wait();
            tracing::info!("mpv stopped");
        }
        let _ = std::fs::remove_file(&self.socket_path);
    }

    fn ipc(&self) -> Result<&IpcConnection> {
        self.ipc.as_ref().ok_or(PreviewError::NotRunning)
    }
}

impl Default for MpvPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MpvPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}

impl MediaElement for MpvPlayer {
    fn play(&mut self) -> std::result::Result<(), MediaError> {
        Ok(self.ipc()?.send(json!(["set_property", "pause", false]))?)
    }

    fn pause(&mut self) -> std::result::Result<(), MediaError> {
        Ok(self.ipc()?.send(json!(["set_property", "pause", true]))?)
    }

    fn seek(&mut self, time: TimeUs) -> std::result::Result<(), MediaError> {
        Ok(self
            .ipc()?
            .send(json!(["seek", time.as_seconds(), "absolute+exact"]))?)
    }

    fn duration(&self) -> Option<TimeUs> {
        self.ipc
            .as_ref()?
            .duration_secs()
            .map(TimeUs::from_seconds)
    }
}
