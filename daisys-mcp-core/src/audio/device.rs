//! Direct device playback through rodio. The output stream is not `Send`,
//! so a dedicated thread owns it and takes commands over a channel; the
//! handle held by async code stays `Send`.

use std::io::Cursor;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use rodio::buffer::SamplesBuffer;
use rodio::{OutputStreamBuilder, Sink};
use tracing::debug;

use crate::audio::{i16_bytes_to_f32, PcmSink};
use crate::error::SpeakError;
use crate::speech::wire::{CHANNELS, SAMPLE_RATE};

enum SinkCommand {
    Write(Vec<f32>),
    Finish,
    Stop,
}

/// Streams raw PCM to the default output device as it arrives.
pub struct DeviceSink {
    tx: mpsc::Sender<SinkCommand>,
    thread: Option<JoinHandle<()>>,
}

impl DeviceSink {
    pub fn open() -> Result<Self, SpeakError> {
        let (tx, rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("daisys-playback".to_string())
            .spawn(move || {
                let stream = match OutputStreamBuilder::open_default_stream() {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };
                let sink = Sink::connect_new(stream.mixer());
                let _ = ready_tx.send(Ok(()));

                while let Ok(command) = rx.recv() {
                    match command {
                        SinkCommand::Write(samples) => {
                            sink.append(SamplesBuffer::new(CHANNELS, SAMPLE_RATE, samples));
                        }
                        SinkCommand::Finish => {
                            sink.sleep_until_end();
                            break;
                        }
                        SinkCommand::Stop => {
                            sink.stop();
                            break;
                        }
                    }
                }
            })
            .map_err(|e| {
                SpeakError::PlaybackUnavailable(format!("failed to spawn playback thread: {e}"))
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                debug!("Opened audio output device");
                Ok(Self {
                    tx,
                    thread: Some(handle),
                })
            }
            Ok(Err(reason)) => Err(SpeakError::PlaybackUnavailable(format!(
                "no audio output device: {reason}"
            ))),
            Err(_) => Err(SpeakError::PlaybackUnavailable(
                "playback thread exited before the device opened".to_string(),
            )),
        }
    }
}

impl PcmSink for DeviceSink {
    fn write(&mut self, pcm: &[u8]) -> Result<(), SpeakError> {
        self.tx
            .send(SinkCommand::Write(i16_bytes_to_f32(pcm)))
            .map_err(|_| SpeakError::PlaybackUnavailable("playback thread stopped".to_string()))
    }

    fn finish(mut self: Box<Self>) {
        let _ = self.tx.send(SinkCommand::Finish);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }

    fn stop(mut self: Box<Self>) {
        let _ = self.tx.send(SinkCommand::Stop);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for DeviceSink {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = self.tx.send(SinkCommand::Stop);
            let _ = thread.join();
        }
    }
}

/// Decodes a WAV file and plays it to the default device, blocking until
/// playback completes. Call from a blocking context.
pub fn play_wav_blocking(audio: &[u8]) -> Result<(), SpeakError> {
    let mut reader = hound::WavReader::new(Cursor::new(audio))
        .map_err(|e| SpeakError::PlaybackUnavailable(format!("audio is not playable WAV: {e}")))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => reader
            .samples::<i16>()
            .filter_map(|s| s.ok())
            .map(|s| s as f32 / 32768.0)
            .collect(),
        hound::SampleFormat::Float => reader.samples::<f32>().filter_map(|s| s.ok()).collect(),
    };

    let stream = OutputStreamBuilder::open_default_stream()
        .map_err(|e| SpeakError::PlaybackUnavailable(format!("no audio output device: {e}")))?;
    let sink = Sink::connect_new(stream.mixer());
    sink.append(SamplesBuffer::new(
        spec.channels,
        spec.sample_rate,
        samples,
    ));
    sink.sleep_until_end();
    Ok(())
}
