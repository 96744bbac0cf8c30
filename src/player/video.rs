//! External player host: one `mpv` process per track.
//!
//! Process exit is the "ended" signal. Pause/resume go through mpv's JSON IPC
//! socket. Dropping the instance kills the process.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::{Completion, PlaybackOutcome, VideoHost, VideoInstance};
use crate::config::MusicConfig;
use crate::error::PlaybackError;
use crate::models::MusicTrack;

static NEXT_SOCKET: AtomicU64 = AtomicU64::new(0);

pub struct MpvHost {
    config: MusicConfig,
}

impl MpvHost {
    pub fn new(config: MusicConfig) -> Self {
        Self { config }
    }

    fn args(&self, ipc_path: &std::path::Path, url: &str, paused: bool) -> Vec<String> {
        let mut args = self.config.player_args.clone();
        if paused {
            args.push("--pause".into());
        }
        args.push(format!("--input-ipc-server={}", ipc_path.display()));
        args.push(url.to_string());
        args
    }
}

pub struct MpvInstance {
    ipc_path: PathBuf,
    // Dropping the sender tells the watcher to kill the process.
    _kill: oneshot::Sender<()>,
}

impl MpvInstance {
    fn set_pause(&self, paused: bool) {
        let path = self.ipc_path.clone();
        tokio::spawn(async move {
            if let Err(e) = send_ipc(&path, paused).await {
                warn!("mpv IPC failed: {e}");
            }
        });
    }
}

impl VideoInstance for MpvInstance {
    fn pause(&self) {
        self.set_pause(true);
    }

    fn resume(&self) {
        self.set_pause(false);
    }
}

impl Drop for MpvInstance {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.ipc_path);
    }
}

#[cfg(unix)]
async fn send_ipc(path: &std::path::Path, paused: bool) -> std::io::Result<()> {
    use tokio::io::AsyncWriteExt;

    let command = serde_json::json!({ "command": ["set_property", "pause", paused] });
    let mut stream = tokio::net::UnixStream::connect(path).await?;
    stream.write_all(format!("{command}\n").as_bytes()).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn send_ipc(_path: &std::path::Path, _paused: bool) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "mpv IPC needs unix sockets",
    ))
}

impl VideoHost for MpvHost {
    type Instance = MpvInstance;

    fn create(&mut self, track: &MusicTrack, paused: bool, done: Completion) -> Result<MpvInstance, PlaybackError> {
        let n = NEXT_SOCKET.fetch_add(1, Ordering::Relaxed);
        let ipc_path = std::env::temp_dir().join(format!("commute-radio-mpv-{}-{n}.sock", std::process::id()));
        let url = format!("{}{}", self.config.watch_url, track.id);

        let mut child = Command::new(&self.config.player_command)
            .args(self.args(&ipc_path, &url, paused))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| PlaybackError::Launch {
                command: self.config.player_command.clone(),
                source,
            })?;
        debug!("Started {} for {url}", self.config.player_command);

        let (kill_tx, kill_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            tokio::select! {
                status = child.wait() => {
                    let outcome = match status {
                        Ok(status) if status.success() => PlaybackOutcome::Ended,
                        Ok(status) => PlaybackOutcome::Failed(format!("player exited with {status}")),
                        Err(e) => PlaybackOutcome::Failed(e.to_string()),
                    };
                    done.finish(outcome);
                }
                _ = kill_rx => {
                    let _ = child.kill().await;
                    debug!("Player for run {} destroyed", done.run());
                }
            }
        });

        Ok(MpvInstance {
            ipc_path,
            _kill: kill_tx,
        })
    }
}
