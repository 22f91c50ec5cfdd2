use crate::error::{PreviewError, Result};
use crossbeam_channel::{bounded, unbounded, RecvTimeoutError, Sender};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// What happens to the reply of one request.
enum Purpose {
    /// A caller is blocked in [`IpcConnection::call`].
    Caller(Sender<Result<Value>>),
    /// Nobody waits; a failure is logged.
    Detached,
    LoadedPath { generation: u64 },
    LoadedDuration { generation: u64 },
}

struct Pending {
    command: String,
    purpose: Purpose,
}

/// The media most recently handed to `loadfile`. Its duration is only taken
/// once mpv reports `file-loaded` with a matching `path`.
#[derive(Debug, Default)]
struct LoadedMedia {
    generation: u64,
    url: Option<String>,
    duration_secs: Option<f64>,
}

#[derive(Default)]
struct Shared {
    next_request_id: u64,
    pending: HashMap<u64, Pending>,
    media: LoadedMedia,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Queues request lines for the writer thread and routes what the reader
/// thread receives: replies by `request_id`, events by name.
#[derive(Clone)]
struct Dispatcher {
    outgoing: Sender<String>,
    shared: Arc<Mutex<Shared>>,
}

impl Dispatcher {
    fn submit(&self, command: Value, purpose: Purpose) -> Result<u64> {
        let label = command.to_string();
        let id = {
            let mut shared = lock(&self.shared);
            shared.next_request_id += 1;
            let id = shared.next_request_id;
            shared.pending.insert(
                id,
                Pending {
                    command: label,
                    purpose,
                },
            );
            id
        };
        let line = format!("{}\n", json!({ "command": command, "request_id": id }));
        if self.outgoing.send(line).is_err() {
            lock(&self.shared).pending.remove(&id);
            return Err(PreviewError::Disconnected);
        }
        Ok(id)
    }

    fn handle_line(&self, line: &str) {
        let message: Value = match serde_json::from_str(line) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(error = %e, line, "unparseable mpv IPC line");
                return;
            }
        };
        if let Some(event) = message.get("event").and_then(Value::as_str) {
            self.handle_event(event);
            return;
        }
        let Some(id) = message.get("request_id").and_then(Value::as_u64) else {
            tracing::debug!(%message, "mpv reply without a request id");
            return;
        };
        let Some(pending) = lock(&self.shared).pending.remove(&id) else {
            tracing::debug!(id, "reply for an abandoned mpv request");
            return;
        };

        let result = check_reply(&pending.command, message);
        match pending.purpose {
            Purpose::Caller(reply) => {
                let _ = reply.send(result);
            }
            Purpose::Detached => {
                if let Err(e) = result {
                    tracing::warn!(error = %e, "mpv command failed");
                }
            }
            Purpose::LoadedPath { generation } => self.on_loaded_path(generation, result),
            Purpose::LoadedDuration { generation } => self.on_loaded_duration(generation, result),
        }
    }

    fn handle_event(&self, event: &str) {
        if event != "file-loaded" {
            tracing::trace!(event, "mpv event");
            return;
        }
        let generation = {
            let shared = lock(&self.shared);
            if shared.media.url.is_none() {
                return;
            }
            shared.media.generation
        };
        let query = json!(["get_property", "path"]);
        if let Err(e) = self.submit(query, Purpose::LoadedPath { generation }) {
            tracing::warn!(error = %e, "could not query the loaded path");
        }
    }

    fn on_loaded_path(&self, generation: u64, result: Result<Value>) {
        let path = match result {
            Ok(reply) => reply.get("data").and_then(Value::as_str).map(str::to_owned),
            Err(e) => {
                tracing::warn!(error = %e, "loaded path unavailable");
                return;
            }
        };
        let current = {
            let shared = lock(&self.shared);
            shared.media.generation == generation
                && path.is_some()
                && shared.media.url == path
        };
        if !current {
            tracing::debug!(?path, "file-loaded for superseded media");
            return;
        }
        let query = json!(["get_property", "duration"]);
        if let Err(e) = self.submit(query, Purpose::LoadedDuration { generation }) {
            tracing::warn!(error = %e, "could not query the loaded duration");
        }
    }

    fn on_loaded_duration(&self, generation: u64, result: Result<Value>) {
        let duration = match result {
            Ok(reply) => reply_f64(&reply).filter(|d| d.is_finite() && *d > 0.0),
            Err(e) => {
                tracing::warn!(error = %e, "loaded duration unavailable");
                return;
            }
        };
        let Some(duration) = duration else {
            tracing::debug!("loaded media reports no duration");
            return;
        };
        let mut shared = lock(&self.shared);
        if shared.media.generation == generation {
            shared.media.duration_secs = Some(duration);
            tracing::info!(duration_secs = duration, "mpv reported media duration");
        }
    }

    fn fail_pending(&self) {
        let pending: Vec<Pending> = lock(&self.shared).pending.drain().map(|(_, p)| p).collect();
        for p in pending {
            if let Purpose::Caller(reply) = p.purpose {
                let _ = reply.send(Err(PreviewError::Disconnected));
            }
        }
    }
}

/// One persistent connection to mpv's JSON IPC socket.
///
/// A writer thread drains the request queue and a reader thread routes
/// replies and events, so [`send`](Self::send) and [`load`](Self::load) never
/// block on the socket.
pub(crate) struct IpcConnection {
    dispatcher: Dispatcher,
    stream: UnixStream,
    reader: Option<JoinHandle<()>>,
}

impl IpcConnection {
    pub(crate) fn connect(socket_path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(socket_path)?;
        let (outgoing, queue) = unbounded::<String>();
        let dispatcher = Dispatcher {
            outgoing,
            shared: Arc::default(),
        };

        let mut write_half = stream.try_clone()?;
        thread::Builder::new()
            .name("mpv-ipc-writer".into())
            .spawn(move || {
                while let Ok(line) = queue.recv() {
                    if let Err(e) = write_half.write_all(line.as_bytes()) {
                        tracing::debug!(error = %e, "mpv IPC write failed");
                        break;
                    }
                }
            })?;

        let read_half = stream.try_clone()?;
        let routes = dispatcher.clone();
        let reader = thread::Builder::new()
            .name("mpv-ipc-reader".into())
            .spawn(move || {
                for line in BufReader::new(read_half).lines() {
                    match line {
                        Ok(line) if line.trim().is_empty() => {}
                        Ok(line) => routes.handle_line(&line),
                        Err(e) => {
                            tracing::debug!(error = %e, "mpv IPC read ended");
                            break;
                        }
                    }
                }
                routes.fail_pending();
            })?;

        Ok(Self {
            dispatcher,
            stream,
            reader: Some(reader),
        })
    }

    /// Send a command and wait up to `timeout` for its reply.
    pub(crate) fn call(&self, command: Value, timeout: Duration) -> Result<Value> {
        let label = command.to_string();
        let (reply, answer) = bounded(1);
        let id = self.dispatcher.submit(command, Purpose::Caller(reply))?;
        match answer.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                lock(&self.dispatcher.shared).pending.remove(&id);
                Err(PreviewError::NoReply(label))
            }
            Err(RecvTimeoutError::Disconnected) => Err(PreviewError::Disconnected),
        }
    }

    /// Queue a command without waiting for its reply.
    pub(crate) fn send(&self, command: Value) -> Result<()> {
        self.dispatcher.submit(command, Purpose::Detached).map(|_| ())
    }

    /// Queue `loadfile` and forget any duration known for earlier media.
    pub(crate) fn load(&self, url: &str) -> Result<()> {
        {
            let mut shared = lock(&self.dispatcher.shared);
            shared.media.generation += 1;
            shared.media.url = Some(url.to_owned());
            shared.media.duration_secs = None;
        }
        self.send(json!(["loadfile", url]))
    }

    /// Duration of the most recently loaded media, once mpv has loaded it.
    pub(crate) fn duration_secs(&self) -> Option<f64> {
        lock(&self.dispatcher.shared).media.duration_secs
    }
}

impl Drop for IpcConnection {
    fn drop(&mut self) {
        let _ = self.stream.shutdown(Shutdown::Both);
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
    }
}

/// mpv answers every request with `{"error": "success", ...}` or an error string.
fn check_reply(command: &str, reply: Value) -> Result<Value> {
    match reply.get("error").and_then(Value::as_str) {
        Some("success") => Ok(reply),
        Some(reason) => Err(PreviewError::Rejected {
            command: command.to_owned(),
            reason: reason.to_owned(),
        }),
        None => Err(PreviewError::MalformedReply(reply.to_string())),
    }
}

pub(crate) fn reply_f64(reply: &Value) -> Option<f64> {
    reply.get("data").and_then(Value::as_f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::net::UnixListener;
    use tempfile::TempDir;

    const WAIT: Duration = Duration::from_secs(2);

    // ---------------------------------------------------------------------------
    // Fake mpv
    // ---------------------------------------------------------------------------

    /// Accepts one connection and answers each request line with whatever
    /// `respond` returns.
    fn fake_mpv<F>(mut respond: F) -> (TempDir, IpcConnection)
    where
        F: FnMut(&Value) -> Vec<Value> + Send + 'static,
    {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mpv.sock");
        let listener = UnixListener::bind(&path).unwrap();
        thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut out = stream.try_clone().unwrap();
            for line in BufReader::new(stream).lines() {
                let Ok(line) = line else { break };
                let request: Value = serde_json::from_str(&line).unwrap();
                for message in respond(&request) {
                    if writeln!(out, "{message}").is_err() {
                        return;
                    }
                }
            }
        });
        let conn = IpcConnection::connect(&path).unwrap();
        (dir, conn)
    }

    fn success(request: &Value, data: Value) -> Value {
        json!({ "request_id": request["request_id"], "error": "success", "data": data })
    }

    fn verb(request: &Value) -> String {
        let command = &request["command"];
        match command[0].as_str() {
            Some("get_property") => format!("get {}", command[1].as_str().unwrap_or("")),
            Some(other) => other.to_string(),
            None => String::new(),
        }
    }

    /// Round-trip enough requests that everything the reader thread queued
    /// from earlier traffic has been answered and handled.
    fn settle(conn: &IpcConnection) {
        for _ in 0..3 {
            conn.call(json!(["get_property", "mpv-version"]), WAIT)
                .unwrap();
        }
    }

    // ---------------------------------------------------------------------------
    // Replies
    // ---------------------------------------------------------------------------

    #[test]
    fn event_lines_before_a_reply_are_skipped() {
        let (_dir, conn) = fake_mpv(|req| {
            vec![
                json!({ "event": "playback-restart" }),
                success(req, json!(42.5)),
            ]
        });
        let reply = conn
            .call(json!(["get_property", "duration"]), WAIT)
            .unwrap();
        assert_eq!(reply_f64(&reply), Some(42.5));
    }

    #[test]
    fn reply_without_error_field_is_malformed() {
        let (_dir, conn) = fake_mpv(|req| vec![json!({ "request_id": req["request_id"], "data": 1 })]);
        let err = conn
            .call(json!(["get_property", "duration"]), WAIT)
            .unwrap_err();
        assert!(matches!(err, PreviewError::MalformedReply(_)), "{err}");
    }

    #[test]
    fn rejected_reply_carries_reason() {
        let (_dir, conn) = fake_mpv(|req| {
            vec![json!({ "request_id": req["request_id"], "error": "property unavailable" })]
        });
        match conn.call(json!(["get_property", "duration"]), WAIT) {
            Err(PreviewError::Rejected { command, reason }) => {
                assert!(command.contains("duration"));
                assert_eq!(reason, "property unavailable");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn replies_are_matched_by_request_id() {
        // Hold the first request and answer both in reverse order.
        let mut held: Vec<Value> = Vec::new();
        let (_dir, conn) = fake_mpv(move |req| {
            held.push(req.clone());
            if held.len() < 2 {
                return Vec::new();
            }
            held.drain(..)
                .rev()
                .map(|r| success(&r, r["command"][1].clone()))
                .collect()
        });
        let conn = &conn;
        let (a, b) = thread::scope(|s| {
            let a = s.spawn(|| conn.call(json!(["get_property", "a"]), WAIT));
            let b = s.spawn(|| conn.call(json!(["get_property", "b"]), WAIT));
            (a.join().unwrap(), b.join().unwrap())
        });
        assert_eq!(a.unwrap()["data"], "a");
        assert_eq!(b.unwrap()["data"], "b");
    }

    #[test]
    fn detached_send_returns_without_a_reply() {
        let (_dir, conn) = fake_mpv(|_| Vec::new());
        conn.send(json!(["set_property", "pause", false])).unwrap();
        conn.send(json!(["seek", 3.0, "absolute+exact"])).unwrap();
        let err = conn
            .call(json!(["get_property", "pause"]), Duration::from_millis(100))
            .unwrap_err();
        assert!(matches!(err, PreviewError::NoReply(_)), "{err}");
    }

    // ---------------------------------------------------------------------------
    // Loaded media
    // ---------------------------------------------------------------------------

    #[test]
    fn duration_known_after_file_loaded_for_current_url() {
        let mut loaded = String::new();
        let (_dir, conn) = fake_mpv(move |req| match verb(req).as_str() {
            "loadfile" => {
                loaded = req["command"][1].as_str().unwrap_or("").to_string();
                vec![success(req, Value::Null), json!({ "event": "file-loaded" })]
            }
            "get path" => vec![success(req, json!(loaded))],
            "get duration" => vec![success(req, json!(42.5))],
            _ => vec![success(req, json!("mpv 0.38.0"))],
        });
        assert_eq!(conn.duration_secs(), None);
        conn.load("anim.mp4").unwrap();
        settle(&conn);
        assert_eq!(conn.duration_secs(), Some(42.5));
    }

    #[test]
    fn no_duration_before_file_loaded() {
        // The old file's duration is still readable but no file-loaded arrives.
        let (_dir, conn) = fake_mpv(|req| match verb(req).as_str() {
            "get duration" => vec![success(req, json!(10.0))],
            _ => vec![success(req, json!("mpv 0.38.0"))],
        });
        conn.load("anim.mp4").unwrap();
        settle(&conn);
        assert_eq!(conn.duration_secs(), None);
    }

    #[test]
    fn file_loaded_for_other_media_is_ignored() {
        let (_dir, conn) = fake_mpv(|req| match verb(req).as_str() {
            "loadfile" => vec![success(req, Value::Null), json!({ "event": "file-loaded" })],
            "get path" => vec![success(req, json!("previous.mp4"))],
            "get duration" => vec![success(req, json!(10.0))],
            _ => vec![success(req, json!("mpv 0.38.0"))],
        });
        conn.load("anim.mp4").unwrap();
        settle(&conn);
        assert_eq!(conn.duration_secs(), None);
    }

    #[test]
    fn new_load_clears_previous_duration() {
        let mut loaded = String::new();
        let mut announce = true;
        let (_dir, conn) = fake_mpv(move |req| match verb(req).as_str() {
            "loadfile" => {
                loaded = req["command"][1].as_str().unwrap_or("").to_string();
                let mut out = vec![success(req, Value::Null)];
                if announce {
                    out.push(json!({ "event": "file-loaded" }));
                }
                announce = false;
                out
            }
            "get path" => vec![success(req, json!(loaded))],
            "get duration" => vec![success(req, json!(42.5))],
            _ => vec![success(req, json!("mpv 0.38.0"))],
        });
        conn.load("first.mp4").unwrap();
        settle(&conn);
        assert_eq!(conn.duration_secs(), Some(42.5));
        conn.load("second.mp4").unwrap();
        settle(&conn);
        assert_eq!(conn.duration_secs(), None);
    }
}
