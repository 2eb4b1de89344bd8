//! Streaming synthesis session.
//!
//! One request goes out over the websocket, then a single cooperative loop
//! pumps server notifications. Two flags decide success: the take must
//! report READY status and the audio stream must deliver its terminal empty
//! chunk. Either alone is not enough; status can arrive before the audio
//! finishes streaming, or after.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::{timeout, Instant};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::api::types::{AudioFormat, SimpleProsody, TakeGenerateRequest, TakeStatus};
use crate::api::DaisysClient;
use crate::audio::{self, PcmSink};
use crate::config::DaisysConfig;
use crate::error::SpeakError;
use crate::output::output_file_path;
use crate::speech::wire::{self, AudioChunk, TakeEvent, SAMPLE_RATE};
use crate::speech::{normalize_text, resolve_voice_id, SpeechResult};

/// Timing knobs for the drive loop. Tests shrink these; production uses the
/// defaults.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Wall-clock budget for the whole session.
    pub budget: Duration,
    /// Upper bound on one poll of the channel.
    pub poll_interval: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            budget: Duration::from_secs(60),
            poll_interval: Duration::from_secs(5),
        }
    }
}

/// The bidirectional channel the session pumps. Abstracted so tests can
/// script status and audio deliveries without a server.
#[async_trait]
pub trait SpeechChannel: Send {
    async fn submit(&mut self, request: &TakeGenerateRequest) -> Result<(), SpeakError>;

    /// Next server notification. `Ok(None)` means the channel closed.
    async fn recv(&mut self) -> Result<Option<TakeEvent>, SpeakError>;

    async fn close(&mut self);
}

pub struct WebsocketChannel {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    next_request_id: u64,
}

impl WebsocketChannel {
    /// Connects to a signed websocket URL obtained from the API.
    pub async fn connect(url: &str) -> Result<Self, SpeakError> {
        let request = url
            .into_client_request()
            .map_err(|e| SpeakError::Transport(format!("invalid websocket URL: {e}")))?;
        let (stream, _) = connect_async(request)
            .await
            .map_err(|e| SpeakError::Transport(format!("websocket connect failed: {e}")))?;
        debug!("Connected to speech websocket");
        Ok(Self {
            stream,
            next_request_id: 1,
        })
    }
}

#[async_trait]
impl SpeechChannel for WebsocketChannel {
    async fn submit(&mut self, request: &TakeGenerateRequest) -> Result<(), SpeakError> {
        let frame = wire::encode_generate(self.next_request_id, request)?;
        self.next_request_id += 1;
        self.stream
            .send(Message::Text(frame))
            .await
            .map_err(|e| SpeakError::Transport(format!("websocket send failed: {e}")))
    }

    async fn recv(&mut self) -> Result<Option<TakeEvent>, SpeakError> {
        loop {
            let message = match self.stream.next().await {
                None => return Ok(None),
                Some(Err(e)) => {
                    return Err(SpeakError::Transport(format!("websocket read failed: {e}")))
                }
                Some(Ok(message)) => message,
            };
            match message {
                Message::Text(text) => return wire::decode_text_frame(&text).map(Some),
                Message::Binary(bytes) => {
                    return wire::decode_binary_frame(&bytes).map(|c| Some(TakeEvent::Audio(c)))
                }
                Message::Close(_) => return Ok(None),
                // tungstenite answers pings itself
                _ => continue,
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.stream.close(None).await;
    }
}

#[derive(Debug, Default)]
struct SessionState {
    status_ready: bool,
    chunks_done: bool,
    take_id: Option<String>,
    audio: Vec<u8>,
}

fn apply_event(
    state: &mut SessionState,
    sink: &mut Option<Box<dyn PcmSink>>,
    event: TakeEvent,
) -> Result<(), SpeakError> {
    match event {
        TakeEvent::Status(take) => {
            debug!(take_id = %take.take_id, status = %take.status, "Take status update");
            // Each update overwrites the flag; only READY counts as ready.
            state.status_ready = take.status == TakeStatus::Ready;
            state.take_id = Some(take.take_id);
            Ok(())
        }
        TakeEvent::Error(message) => Err(SpeakError::Generation(message)),
        TakeEvent::Audio(chunk) => {
            apply_audio(state, sink, chunk);
            Ok(())
        }
    }
}

fn apply_audio(state: &mut SessionState, sink: &mut Option<Box<dyn PcmSink>>, chunk: AudioChunk) {
    if state.take_id.is_none() {
        state.take_id = chunk.take_id.clone();
    }
    if chunk.payload.is_empty() {
        if chunk.is_terminal() {
            debug!("Audio stream complete");
            state.chunks_done = true;
        }
        // Empty payloads with a nonzero chunk id carry nothing; drop them.
        return;
    }

    state.audio.extend_from_slice(&chunk.payload);
    if let Some(active) = sink.as_mut() {
        // Chunks go to the device in delivery order; no re-sequencing here.
        if let Err(e) = active.write(&chunk.payload) {
            warn!(error = %e, "Live playback failed; continuing without it");
            if let Some(dead) = sink.take() {
                dead.stop();
            }
        }
    }
}

/// Submits the request and pumps the channel until both completion flags are
/// set, the budget runs out, or the provider reports an error.
async fn run_session<C: SpeechChannel>(
    channel: &mut C,
    request: &TakeGenerateRequest,
    sink: &mut Option<Box<dyn PcmSink>>,
    options: &SessionOptions,
    state: &mut SessionState,
) -> Result<(), SpeakError> {
    channel.submit(request).await?;

    let deadline = Instant::now() + options.budget;
    loop {
        if state.status_ready && state.chunks_done {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(SpeakError::Incomplete {
                status_ready: state.status_ready,
                chunks_done: state.chunks_done,
            });
        }

        match timeout(options.poll_interval, channel.recv()).await {
            // One poll expired; loop around and re-check the budget.
            Err(_) => continue,
            Ok(Err(e)) => return Err(e),
            Ok(Ok(None)) => {
                return Err(SpeakError::Transport(format!(
                    "websocket closed before synthesis completed \
                     (status_ready: {}, chunks_done: {})",
                    state.status_ready, state.chunks_done
                )));
            }
            Ok(Ok(Some(event))) => apply_event(state, sink, event)?,
        }
    }
}

async fn settle_sink(sink: Option<Box<dyn PcmSink>>, success: bool) {
    let Some(sink) = sink else { return };
    if success {
        // Draining blocks until the device finishes the queued audio.
        let _ = tokio::task::spawn_blocking(move || sink.finish()).await;
    } else {
        sink.stop();
    }
}

/// Full streaming synthesis: resolve the voice, connect, drive the session,
/// tear everything down, and persist the streamed audio as a WAV file.
///
/// The take created on the provider side is deleted best-effort after the
/// channel closes; a failed delete only logs.
pub async fn synthesize_streaming(
    client: &DaisysClient,
    config: &DaisysConfig,
    text: &str,
    voice_id: Option<&str>,
    output_dir: &Path,
    options: &SessionOptions,
) -> Result<SpeechResult, SpeakError> {
    let text = normalize_text(text)?;
    let voice_id = resolve_voice_id(client, voice_id).await?;

    let url = client.websocket_url(&voice_id).await?;
    let mut channel = WebsocketChannel::connect(&url).await?;
    let mut sink = audio::open_pcm_sink(config);

    let request = TakeGenerateRequest {
        voice_id: voice_id.clone(),
        text: text.clone(),
        prosody: Some(SimpleProsody::default()),
    };

    let mut state = SessionState::default();
    let outcome = run_session(&mut channel, &request, &mut sink, options, &mut state).await;

    settle_sink(sink.take(), outcome.is_ok()).await;
    channel.close().await;

    if let Some(take_id) = state.take_id.as_deref() {
        if let Err(e) = client.delete_take(take_id).await {
            warn!(take_id = %take_id, error = %e, "Failed to delete take after session");
        }
    }

    outcome?;

    let take_id = state.take_id.ok_or_else(|| {
        SpeakError::Transport("session completed without learning its take id".to_string())
    })?;
    let output_path = output_file_path(output_dir, &text, AudioFormat::Wav);
    audio::write_pcm_wav(&output_path, &state.audio, SAMPLE_RATE)?;

    info!(
        take_id = %take_id,
        voice_id = %voice_id,
        bytes = state.audio.len(),
        output = %output_path.display(),
        "Streaming synthesis complete"
    );

    Ok(SpeechResult {
        take_id,
        voice_id,
        status: TakeStatus::Ready,
        output_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::Take;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    enum Step {
        Event(TakeEvent),
        Closed,
        Fail(String),
    }

    #[derive(Default)]
    struct FakeChannel {
        script: VecDeque<Step>,
        submitted: usize,
        closed: bool,
    }

    impl FakeChannel {
        fn scripted(steps: Vec<Step>) -> Self {
            Self {
                script: steps.into(),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl SpeechChannel for FakeChannel {
        async fn submit(&mut self, _request: &TakeGenerateRequest) -> Result<(), SpeakError> {
            self.submitted += 1;
            Ok(())
        }

        async fn recv(&mut self) -> Result<Option<TakeEvent>, SpeakError> {
            match self.script.pop_front() {
                Some(Step::Event(event)) => Ok(Some(event)),
                Some(Step::Fail(message)) => Err(SpeakError::Transport(message)),
                Some(Step::Closed) => Ok(None),
                // Script exhausted: the server has gone quiet.
                None => std::future::pending().await,
            }
        }

        async fn close(&mut self) {
            self.closed = true;
        }
    }

    #[derive(Clone, Default)]
    struct RecordingSink {
        writes: Arc<Mutex<Vec<Vec<u8>>>>,
        finished: Arc<AtomicBool>,
        stopped: Arc<AtomicBool>,
    }

    impl PcmSink for RecordingSink {
        fn write(&mut self, pcm: &[u8]) -> Result<(), SpeakError> {
            self.writes.lock().unwrap().push(pcm.to_vec());
            Ok(())
        }

        fn finish(self: Box<Self>) {
            self.finished.store(true, Ordering::SeqCst);
        }

        fn stop(self: Box<Self>) {
            self.stopped.store(true, Ordering::SeqCst);
        }
    }

    fn status(take_id: &str, status: TakeStatus) -> Step {
        Step::Event(TakeEvent::Status(Take {
            take_id: take_id.to_string(),
            status,
            voice_id: None,
            text: None,
            prosody: None,
        }))
    }

    fn audio(chunk_id: Option<u32>, payload: &[u8]) -> Step {
        Step::Event(TakeEvent::Audio(AudioChunk {
            request_id: Some(1),
            take_id: Some("t1".to_string()),
            part_id: Some(0),
            chunk_id,
            payload: payload.to_vec(),
        }))
    }

    fn request() -> TakeGenerateRequest {
        TakeGenerateRequest {
            voice_id: "v1".into(),
            text: "hello".into(),
            prosody: None,
        }
    }

    fn fast_options() -> SessionOptions {
        SessionOptions {
            budget: Duration::from_millis(200),
            poll_interval: Duration::from_millis(25),
        }
    }

    async fn drive(mut channel: FakeChannel) -> (Result<(), SpeakError>, SessionState, usize) {
        let mut state = SessionState::default();
        let mut sink = None;
        let result = run_session(
            &mut channel,
            &request(),
            &mut sink,
            &fast_options(),
            &mut state,
        )
        .await;
        (result, state, channel.submitted)
    }

    #[tokio::test]
    async fn succeeds_when_ready_arrives_before_final_chunk() {
        let channel = FakeChannel::scripted(vec![
            status("t1", TakeStatus::Waiting),
            audio(Some(1), &[1, 2]),
            status("t1", TakeStatus::Ready),
            audio(Some(2), &[3, 4]),
            audio(Some(0), &[]),
        ]);
        let (result, state, submitted) = drive(channel).await;
        result.unwrap();
        assert_eq!(submitted, 1);
        assert!(state.status_ready);
        assert!(state.chunks_done);
        assert_eq!(state.audio, vec![1, 2, 3, 4]);
        assert_eq!(state.take_id.as_deref(), Some("t1"));
    }

    #[tokio::test]
    async fn succeeds_when_final_chunk_arrives_before_ready() {
        let channel = FakeChannel::scripted(vec![
            audio(Some(1), &[9]),
            audio(None, &[]),
            status("t1", TakeStatus::Ready),
        ]);
        let (result, state, _) = drive(channel).await;
        result.unwrap();
        assert_eq!(state.audio, vec![9]);
    }

    #[tokio::test]
    async fn chunks_accumulate_in_delivery_order() {
        let channel = FakeChannel::scripted(vec![
            audio(Some(2), &[20]),
            audio(Some(1), &[10]),
            status("t1", TakeStatus::Ready),
            audio(Some(0), &[]),
        ]);
        let (result, state, _) = drive(channel).await;
        result.unwrap();
        // Out-of-order chunk ids are accepted as delivered.
        assert_eq!(state.audio, vec![20, 10]);
    }

    #[tokio::test]
    async fn empty_chunk_with_nonzero_id_is_not_terminal() {
        let channel = FakeChannel::scripted(vec![
            audio(Some(5), &[]),
            audio(Some(1), &[7]),
            status("t1", TakeStatus::Ready),
            audio(Some(0), &[]),
        ]);
        let (result, state, _) = drive(channel).await;
        result.unwrap();
        assert_eq!(state.audio, vec![7]);
    }

    #[tokio::test]
    async fn ready_without_final_chunk_times_out_incomplete() {
        let channel = FakeChannel::scripted(vec![status("t1", TakeStatus::Ready)]);
        let (result, state, _) = drive(channel).await;
        match result {
            Err(SpeakError::Incomplete {
                status_ready,
                chunks_done,
            }) => {
                assert!(status_ready);
                assert!(!chunks_done);
            }
            other => panic!("expected incomplete, got {other:?}"),
        }
        assert!(state.status_ready);
        assert!(!state.chunks_done);
    }

    #[tokio::test]
    async fn final_chunk_without_ready_times_out_incomplete() {
        let channel = FakeChannel::scripted(vec![
            status("t1", TakeStatus::Started),
            audio(Some(1), &[1]),
            audio(Some(0), &[]),
        ]);
        let (result, _, _) = drive(channel).await;
        match result {
            Err(SpeakError::Incomplete {
                status_ready,
                chunks_done,
            }) => {
                assert!(!status_ready);
                assert!(chunks_done);
            }
            other => panic!("expected incomplete, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_ready_status_overwrites_the_flag() {
        // READY followed by a late non-terminal update clears the flag and
        // the session must not report success.
        let channel = FakeChannel::scripted(vec![
            status("t1", TakeStatus::Ready),
            status("t1", TakeStatus::Started),
            audio(Some(0), &[]),
        ]);
        let (result, state, _) = drive(channel).await;
        assert!(matches!(result, Err(SpeakError::Incomplete { .. })));
        assert!(!state.status_ready);
    }

    #[tokio::test]
    async fn generation_error_aborts_immediately() {
        let channel = FakeChannel::scripted(vec![
            status("t1", TakeStatus::Waiting),
            Step::Event(TakeEvent::Error("voice does not exist".to_string())),
            // Never reached.
            status("t1", TakeStatus::Ready),
        ]);
        let (result, _, _) = drive(channel).await;
        match result {
            Err(SpeakError::Generation(message)) => {
                assert_eq!(message, "voice does not exist");
            }
            other => panic!("expected generation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn transport_error_aborts_immediately() {
        let channel = FakeChannel::scripted(vec![Step::Fail("connection reset".to_string())]);
        let (result, _, _) = drive(channel).await;
        assert!(matches!(result, Err(SpeakError::Transport(_))));
    }

    #[tokio::test]
    async fn closed_channel_before_completion_is_a_transport_error() {
        let channel = FakeChannel::scripted(vec![status("t1", TakeStatus::Ready), Step::Closed]);
        let (result, _, _) = drive(channel).await;
        match result {
            Err(SpeakError::Transport(message)) => {
                assert!(message.contains("closed before synthesis completed"));
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn audio_reaches_the_sink_in_delivery_order() {
        let recorder = RecordingSink::default();
        let writes = recorder.writes.clone();
        let mut sink: Option<Box<dyn PcmSink>> = Some(Box::new(recorder));

        let mut channel = FakeChannel::scripted(vec![
            audio(Some(1), &[1, 1]),
            audio(Some(2), &[2, 2]),
            status("t1", TakeStatus::Ready),
            audio(Some(0), &[]),
        ]);
        let mut state = SessionState::default();
        run_session(
            &mut channel,
            &request(),
            &mut sink,
            &fast_options(),
            &mut state,
        )
        .await
        .unwrap();

        let written = writes.lock().unwrap().clone();
        assert_eq!(written, vec![vec![1, 1], vec![2, 2]]);
    }

    #[tokio::test]
    async fn sink_drains_on_success_and_stops_on_failure() {
        let recorder = RecordingSink::default();
        let finished = recorder.finished.clone();
        settle_sink(Some(Box::new(recorder)), true).await;
        assert!(finished.load(Ordering::SeqCst));

        let recorder = RecordingSink::default();
        let stopped = recorder.stopped.clone();
        settle_sink(Some(Box::new(recorder)), false).await;
        assert!(stopped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn failing_sink_is_dropped_but_session_continues() {
        struct FailingSink {
            stopped: Arc<AtomicBool>,
        }
        impl PcmSink for FailingSink {
            fn write(&mut self, _pcm: &[u8]) -> Result<(), SpeakError> {
                Err(SpeakError::PlaybackUnavailable("device gone".to_string()))
            }
            fn finish(self: Box<Self>) {}
            fn stop(self: Box<Self>) {
                self.stopped.store(true, Ordering::SeqCst);
            }
        }

        let stopped = Arc::new(AtomicBool::new(false));
        let mut sink: Option<Box<dyn PcmSink>> = Some(Box::new(FailingSink {
            stopped: stopped.clone(),
        }));

        let mut channel = FakeChannel::scripted(vec![
            audio(Some(1), &[5, 5]),
            audio(Some(2), &[6, 6]),
            status("t1", TakeStatus::Ready),
            audio(Some(0), &[]),
        ]);
        let mut state = SessionState::default();
        run_session(
            &mut channel,
            &request(),
            &mut sink,
            &fast_options(),
            &mut state,
        )
        .await
        .unwrap();

        assert!(stopped.load(Ordering::SeqCst));
        assert!(sink.is_none());
        // The accumulator kept everything even though playback died.
        assert_eq!(state.audio, vec![5, 5, 6, 6]);
    }
}
