//! Line-oriented host for a timeline session: JSON commands on stdin, one
//! rendered frame per line on stdout, logs on stderr.

pub mod protocol;
pub mod state;

use anyhow::{bail, Context};
use protocol::{parse_command, HostEvent};
use scrubline_core::TimelineConfig;
use scrubline_preview::MpvOptions;
use state::{Session, Step};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdout};
use tracing::Instrument;

const FRAME_INTERVAL: Duration = Duration::from_millis(16);
const METADATA_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Default, PartialEq)]
pub struct HostArgs {
    pub config: Option<PathBuf>,
    pub mpv: bool,
}

impl HostArgs {
    pub fn parse<I: IntoIterator<Item = String>>(args: I) -> anyhow::Result<Self> {
        let mut parsed = Self::default();
        for arg in args {
            match arg.as_str() {
                "--mpv" => parsed.mpv = true,
                flag if flag.starts_with("--") => bail!("unknown flag: {flag}"),
                path => {
                    if parsed.config.is_some() {
                        bail!("more than one config path given");
                    }
                    parsed.config = Some(PathBuf::from(path));
                }
            }
        }
        Ok(parsed)
    }
}

fn check_mpv(binary: &str) -> anyhow::Result<()> {
    let found = std::process::Command::new(binary)
        .arg("--version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false);
    if !found {
        bail!("{binary} not found on PATH; install it or run without --mpv");
    }
    Ok(())
}

async fn emit(stdout: &mut Stdout, event: &HostEvent) -> anyhow::Result<()> {
    let line = event.to_line().context("encoding output line")?;
    stdout.write_all(line.as_bytes()).await?;
    stdout.flush().await?;
    Ok(())
}

async fn emit_frame(stdout: &mut Stdout, session: &Session) -> anyhow::Result<()> {
    emit(stdout, &HostEvent::Frame(session.view().render())).await
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = HostArgs::parse(std::env::args().skip(1))?;
    let config = match &args.config {
        Some(path) => TimelineConfig::load_from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => TimelineConfig::default(),
    };

    let mut session = Session::new(config).context("creating session")?;
    if args.mpv {
        let options = MpvOptions::default();
        check_mpv(&options.binary)?;
        session.attach_mpv(&options).context("starting mpv")?;
    }

    let span = tracing::info_span!("session", id = %session.id);
    serve(session).instrument(span).await
}

async fn serve(mut session: Session) -> anyhow::Result<()> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut frames = tokio::time::interval(FRAME_INTERVAL);
    let mut metadata = tokio::time::interval(METADATA_POLL_INTERVAL);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin")? else {
                    tracing::info!("stdin closed");
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match parse_command(&line) {
                    Ok(command) => {
                        tracing::debug!(?command, "command");
                        if session.apply(command) == Step::Quit {
                            break;
                        }
                        emit_frame(&mut stdout, &session).await?;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "bad command line");
                        let message = format!("bad command: {e}");
                        emit(&mut stdout, &HostEvent::Error { message }).await?;
                    }
                }
            }
            _ = frames.tick() => {
                if session.on_interval() {
                    emit_frame(&mut stdout, &session).await?;
                }
            }
            _ = metadata.tick(), if session.awaiting_metadata() => {
                if session.poll_metadata() {
                    emit_frame(&mut stdout, &session).await?;
                }
            }
        }
    }

    tracing::info!("session closed");
    Ok(())
}
