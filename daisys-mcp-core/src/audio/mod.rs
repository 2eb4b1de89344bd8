//! Local audio output. Synthesized audio can be played through an external
//! player process fed on stdin, or decoded and written to the default output
//! device when the `playback` feature is enabled. Either backend can be
//! absent at runtime; playback problems never fail synthesis, the audio file
//! still lands on disk.

pub mod player;

#[cfg(feature = "playback")]
pub mod device;

use std::path::Path;

use tracing::debug;

use crate::config::DaisysConfig;
use crate::error::SpeakError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackMode {
    /// External decode-and-play subprocess (ffplay, aplay or paplay).
    Player,
    /// Direct device output through rodio. Requires the `playback` feature.
    Device,
    Disabled,
}

impl PlaybackMode {
    /// Device output when this build carries it, external player otherwise.
    pub fn from_config(config: &DaisysConfig) -> Self {
        if config.disable_audio_playback {
            PlaybackMode::Disabled
        } else if cfg!(feature = "playback") {
            PlaybackMode::Device
        } else {
            PlaybackMode::Player
        }
    }
}

/// Plays one finished piece of encoded audio (wav or mp3) through the chosen
/// backend, blocking until playback completes.
pub async fn play_encoded(audio: Vec<u8>, mode: PlaybackMode) -> Result<(), SpeakError> {
    match mode {
        PlaybackMode::Disabled => {
            debug!("Audio playback disabled; skipping");
            Ok(())
        }
        PlaybackMode::Player => {
            let player = player::select_player().ok_or_else(|| {
                SpeakError::PlaybackUnavailable(
                    "no audio player found on PATH; install ffmpeg (ffplay), \
                     alsa-utils (aplay) or pulseaudio-utils (paplay)"
                        .to_string(),
                )
            })?;
            player.play(&audio).await
        }
        PlaybackMode::Device => play_on_device(audio).await,
    }
}

#[cfg(feature = "playback")]
async fn play_on_device(audio: Vec<u8>) -> Result<(), SpeakError> {
    tokio::task::spawn_blocking(move || device::play_wav_blocking(&audio))
        .await
        .map_err(|e| SpeakError::PlaybackUnavailable(format!("playback task failed: {e}")))?
}

#[cfg(not(feature = "playback"))]
async fn play_on_device(_audio: Vec<u8>) -> Result<(), SpeakError> {
    Err(SpeakError::PlaybackUnavailable(
        "device playback requires building with the playback feature".to_string(),
    ))
}

/// Live output sink for streamed PCM. The streaming session writes chunks in
/// delivery order, then either drains the sink (success) or stops it cold
/// (error or timeout).
pub trait PcmSink: Send {
    fn write(&mut self, pcm: &[u8]) -> Result<(), SpeakError>;
    /// Blocks until queued audio finishes playing, then releases the device.
    fn finish(self: Box<Self>);
    /// Drops queued audio and releases the device immediately.
    fn stop(self: Box<Self>);
}

/// Opens the live device sink for a streaming session, or `None` when
/// playback is disabled, unsupported by this build, or the device cannot be
/// opened. The session keeps running either way.
pub fn open_pcm_sink(config: &DaisysConfig) -> Option<Box<dyn PcmSink>> {
    if config.disable_audio_playback {
        debug!("Audio playback disabled; streaming without live output");
        return None;
    }
    #[cfg(feature = "playback")]
    {
        match device::DeviceSink::open() {
            Ok(sink) => Some(Box::new(sink)),
            Err(e) => {
                tracing::warn!(error = %e, "Audio device unavailable; streaming without live output");
                None
            }
        }
    }
    #[cfg(not(feature = "playback"))]
    {
        debug!("Built without the playback feature; streaming without live output");
        None
    }
}

pub fn i16_bytes_to_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]) as f32 / 32768.0)
        .collect()
}

/// Encodes raw 16-bit mono PCM as a WAV file.
pub fn write_pcm_wav(path: &Path, pcm: &[u8], sample_rate: u32) -> Result<(), SpeakError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let not_writeable = |e: hound::Error| SpeakError::NotWriteable {
        path: path.display().to_string(),
        reason: e.to_string(),
    };
    let mut writer = hound::WavWriter::create(path, spec).map_err(not_writeable)?;
    for sample in pcm.chunks_exact(2) {
        writer
            .write_sample(i16::from_le_bytes([sample[0], sample[1]]))
            .map_err(not_writeable)?;
    }
    writer.finalize().map_err(not_writeable)?;
    Ok(())
}
