//! External audio player subprocess. Encoded audio is fed to the player's
//! stdin; ffplay decodes anything, aplay and paplay handle WAV.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::SpeakError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlayerKind {
    Ffplay,
    Aplay,
    Paplay,
}

#[derive(Debug, Clone)]
pub struct Player {
    bin: PathBuf,
    kind: PlayerKind,
}

/// Picks the first player binary found on PATH. ffplay is preferred since it
/// decodes mp3 as well as WAV.
pub fn select_player() -> Option<Player> {
    for (name, kind) in [
        ("ffplay", PlayerKind::Ffplay),
        ("aplay", PlayerKind::Aplay),
        ("paplay", PlayerKind::Paplay),
    ] {
        if let Some(bin) = find_in_path(name) {
            return Some(Player { bin, kind });
        }
    }
    None
}

fn find_in_path(bin: &str) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&paths) {
        let candidate = dir.join(bin);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

impl Player {
    fn args(&self) -> &'static [&'static str] {
        match self.kind {
            PlayerKind::Ffplay => &["-autoexit", "-nodisp", "-"],
            PlayerKind::Aplay => &["-q"],
            PlayerKind::Paplay => &[],
        }
    }

    /// Feeds the audio to the player's stdin and waits for it to exit.
    pub async fn play(&self, audio: &[u8]) -> Result<(), SpeakError> {
        debug!(player = %self.bin.display(), bytes = audio.len(), "Playing audio");

        let mut child = Command::new(&self.bin)
            .args(self.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                SpeakError::PlaybackUnavailable(format!(
                    "failed to start {}: {e}",
                    self.bin.display()
                ))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(audio).await.map_err(|e| {
                SpeakError::PlaybackUnavailable(format!("failed to feed audio to player: {e}"))
            })?;
            // Closing stdin lets the player see end-of-stream and exit.
            drop(stdin);
        }

        let status = child.wait().await.map_err(|e| {
            SpeakError::PlaybackUnavailable(format!("failed waiting for player: {e}"))
        })?;
        if !status.success() {
            return Err(SpeakError::PlaybackUnavailable(format!(
                "{} exited with {status}",
                self.bin.display()
            )));
        }
        Ok(())
    }
}
