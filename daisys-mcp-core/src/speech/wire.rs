//! Frame codec for the Daisys streaming speech websocket.
//!
//! Text frames carry JSON commands and take status updates. Binary frames
//! carry audio: a little-endian u32 header length, a JSON header naming the
//! request/take/part/chunk, then the raw PCM payload. An empty payload whose
//! chunk id is zero or absent marks the end of a take's audio.

use serde::{Deserialize, Serialize};

use crate::api::types::{Take, TakeGenerateRequest};
use crate::error::SpeakError;

/// Streamed audio is raw signed 16-bit little-endian PCM, mono, 22050 Hz.
pub const SAMPLE_RATE: u32 = 22050;
pub const CHANNELS: u16 = 1;

#[derive(Serialize)]
struct GenerateCommand<'a> {
    command: &'static str,
    request_id: u64,
    data: &'a TakeGenerateRequest,
}

pub fn encode_generate(
    request_id: u64,
    request: &TakeGenerateRequest,
) -> Result<String, SpeakError> {
    let command = GenerateCommand {
        command: "takes/generate",
        request_id,
        data: request,
    };
    serde_json::to_string(&command)
        .map_err(|e| SpeakError::Transport(format!("failed to encode generate command: {e}")))
}

/// One notification from the server, already classified.
#[derive(Debug)]
pub enum TakeEvent {
    Status(Take),
    Error(String),
    Audio(AudioChunk),
}

#[derive(Debug)]
pub struct AudioChunk {
    pub request_id: Option<u64>,
    pub take_id: Option<String>,
    pub part_id: Option<u32>,
    pub chunk_id: Option<u32>,
    pub payload: Vec<u8>,
}

impl AudioChunk {
    /// End-of-audio marker. Empty payloads with a nonzero chunk id are not
    /// terminal; the loop drops those.
    pub fn is_terminal(&self) -> bool {
        self.payload.is_empty() && matches!(self.chunk_id, None | Some(0))
    }
}

#[derive(Deserialize)]
struct StatusFrame {
    #[serde(default)]
    #[allow(dead_code)]
    request_id: Option<u64>,
    #[serde(default)]
    data: Option<Take>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct ChunkHeader {
    #[serde(default)]
    request_id: Option<u64>,
    #[serde(default)]
    take_id: Option<String>,
    #[serde(default)]
    part_id: Option<u32>,
    #[serde(default)]
    chunk_id: Option<u32>,
}

pub fn decode_text_frame(text: &str) -> Result<TakeEvent, SpeakError> {
    let frame: StatusFrame = serde_json::from_str(text)
        .map_err(|e| SpeakError::Transport(format!("unparseable status frame: {e}")))?;
    if let Some(error) = frame.error {
        return Ok(TakeEvent::Error(error));
    }
    match frame.data {
        Some(take) => Ok(TakeEvent::Status(take)),
        None => Err(SpeakError::Transport(
            "status frame carried neither data nor error".to_string(),
        )),
    }
}

pub fn decode_binary_frame(bytes: &[u8]) -> Result<AudioChunk, SpeakError> {
    if bytes.len() < 4 {
        return Err(SpeakError::Transport(format!(
            "binary frame too short for header length: {} bytes",
            bytes.len()
        )));
    }
    let mut length = [0u8; 4];
    length.copy_from_slice(&bytes[0..4]);
    let header_len = u32::from_le_bytes(length) as usize;

    let body = &bytes[4..];
    if body.len() < header_len {
        return Err(SpeakError::Transport(format!(
            "binary frame header truncated: expected {header_len} bytes, have {}",
            body.len()
        )));
    }

    let header: ChunkHeader = serde_json::from_slice(&body[..header_len])
        .map_err(|e| SpeakError::Transport(format!("unparseable chunk header: {e}")))?;

    Ok(AudioChunk {
        request_id: header.request_id,
        take_id: header.take_id,
        part_id: header.part_id,
        chunk_id: header.chunk_id,
        payload: body[header_len..].to_vec(),
    })
}
