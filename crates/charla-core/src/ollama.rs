use std::collections::VecDeque;

use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::chat::Message;
use crate::error::ChatError;

/// A model installed on the Ollama server, as reported by `/api/tags`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub size: u64,
    pub modified_at: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    stream: bool,
}

/// One newline-delimited JSON object from the Ollama chat stream. Only the
/// text delta is of interest; everything else (timings, done flag) is ignored.
#[derive(Deserialize)]
struct ChatChunk {
    #[serde(default)]
    message: Option<ChunkMessage>,
}

#[derive(Deserialize)]
struct ChunkMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.to_string(),
        }
    }

    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, ChatError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ChatError::UpstreamUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ChatError::UpstreamUnavailable(format!(
                "model listing failed with status: {}",
                response.status()
            )));
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| ChatError::UpstreamUnavailable(e.to_string()))?;

        Ok(tags.models)
    }

    /// Start a streamed chat completion. The returned [`ChatStream`] yields
    /// text deltas until the upstream closes its connection.
    pub async fn chat_stream(
        &self,
        model: &str,
        messages: &[Message],
    ) -> Result<ChatStream, ChatError> {
        if model.is_empty() {
            return Err(ChatError::InvalidInput("model must not be empty".to_string()));
        }
        if messages.is_empty() {
            return Err(ChatError::InvalidInput(
                "messages must not be empty".to_string(),
            ));
        }

        let url = format!("{}/api/chat", self.base_url);
        let request = ChatRequest {
            model,
            messages: to_wire(messages),
            stream: true,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ChatError::UpstreamUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ChatError::UpstreamUnavailable(format!(
                "chat request failed with status: {}",
                response.status()
            )));
        }

        let chunks = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| ChatError::StreamInterrupted(e.to_string())))
            .boxed();

        Ok(ChatStream::new(chunks))
    }
}

/// Ollama expects raw base64 in the `images` field, while the client side
/// carries data URLs. Strings without the data-URL prefix pass through
/// unchanged, which makes the conversion idempotent.
pub fn strip_data_url_prefix(image: &str) -> &str {
    let Some(rest) = image.strip_prefix("data:image/") else {
        return image;
    };
    match rest.split_once(";base64,") {
        Some((subtype, payload))
            if !subtype.is_empty() && !subtype.contains(';') && !payload.is_empty() =>
        {
            payload
        }
        _ => image,
    }
}

fn to_wire(messages: &[Message]) -> Vec<Message> {
    messages
        .iter()
        .map(|msg| Message {
            role: msg.role,
            content: msg.content.clone(),
            images: msg.images.as_ref().map(|images| {
                images
                    .iter()
                    .map(|img| strip_data_url_prefix(img).to_string())
                    .collect()
            }),
        })
        .collect()
}

/// Lazy sequence of text deltas decoded from Ollama's newline-delimited JSON
/// stream. Not restartable: once the upstream closes or drops, the sequence
/// is exhausted.
pub struct ChatStream {
    chunks: BoxStream<'static, Result<Bytes, ChatError>>,
    buf: String,
    pending: VecDeque<String>,
    closed: bool,
}

impl ChatStream {
    fn new(chunks: BoxStream<'static, Result<Bytes, ChatError>>) -> Self {
        Self {
            chunks,
            buf: String::new(),
            pending: VecDeque::new(),
            closed: false,
        }
    }

    /// Next text delta. `None` once the upstream has closed its stream. A
    /// mid-stream transport failure yields one `Err(StreamInterrupted)` and
    /// ends the sequence; deltas handed out before the failure stand.
    pub async fn next_delta(&mut self) -> Option<Result<String, ChatError>> {
        loop {
            if let Some(delta) = self.pending.pop_front() {
                return Some(Ok(delta));
            }
            if self.closed {
                return None;
            }
            match self.chunks.next().await {
                Some(Ok(bytes)) => {
                    self.buf.push_str(&String::from_utf8_lossy(&bytes));
                    while let Some(pos) = self.buf.find('\n') {
                        let line: String = self.buf.drain(..=pos).collect();
                        if let Some(delta) = parse_chunk_line(line.trim()) {
                            self.pending.push_back(delta);
                        }
                    }
                }
                Some(Err(err)) => {
                    self.closed = true;
                    return Some(Err(err));
                }
                None => {
                    // Upstream closed; a final line may lack the trailing newline.
                    self.closed = true;
                    let tail = std::mem::take(&mut self.buf);
                    if let Some(delta) = parse_chunk_line(tail.trim()) {
                        self.pending.push_back(delta);
                    }
                }
            }
        }
    }
}

fn parse_chunk_line(line: &str) -> Option<String> {
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str::<ChatChunk>(line) {
        Ok(chunk) => chunk
            .message
            .and_then(|m| m.content)
            .filter(|content| !content.is_empty()),
        Err(err) => {
            log::debug!("skipping malformed stream line: {}", err);
            None
        }
    }
}
