pub mod session;

use futures_util::StreamExt;
use reqwest::Client as HttpClient;

use crate::error::{ AgentError, ErrorEnvelope };
use crate::models::chat::{ ChatMessage, ConsultRequest, ConsultResponse };

/// Incremental UTF-8 decoder for the streamed body. The server emits chunks
/// on character boundaries, but the transport may still split a multi-byte
/// sequence across reads; the tail is held back until the rest arrives.
struct Utf8ChunkDecoder {
    pending: Vec<u8>,
}

impl Utf8ChunkDecoder {
    fn new() -> Self {
        Self { pending: Vec::new() }
    }

    fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut out = String::new();
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(s) => {
                    out.push_str(s);
                    self.pending.clear();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    self.pending.drain(..valid);
                    match e.error_len() {
                        Some(len) => {
                            out.push('\u{fffd}');
                            self.pending.drain(..len);
                        }
                        None => break,
                    }
                }
            }
        }
        out
    }
}

/// HTTP transport for the consult endpoints. The full conversation is resent
/// on every call; the server holds no session state.
pub struct ConsultClient {
    http: HttpClient,
    base_url: String,
}

impl ConsultClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: HttpClient::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn post_messages(
        &self,
        route: &str,
        messages: &[ChatMessage]
    ) -> Result<reqwest::Response, AgentError> {
        let url = format!("{}{}", self.base_url, route);
        let body = ConsultRequest { messages: messages.to_vec() };
        self.http
            .post(&url)
            .json(&body)
            .send().await
            .map_err(|e| AgentError::provider(format!("Request to {} failed: {}", route, e)))
    }

    async fn decode_error(resp: reqwest::Response) -> AgentError {
        let status = resp.status().as_u16();
        match resp.json::<ErrorEnvelope>().await {
            Ok(envelope) => envelope.into_agent_error(),
            Err(_) => AgentError::Provider {
                message: format!("Server error: HTTP {}", status),
                status,
                details: None,
            },
        }
    }

    /// Batch mode: one round trip, the complete reply as a string.
    pub async fn consult(&self, messages: &[ChatMessage]) -> Result<String, AgentError> {
        let resp = self.post_messages("/api/consult", messages).await?;
        if !resp.status().is_success() {
            return Err(Self::decode_error(resp).await);
        }
        let body = resp
            .json::<ConsultResponse>().await
            .map_err(|e| AgentError::InvalidResponse(format!("Malformed consult response: {}", e)))?;
        Ok(body.response)
    }

    /// Streaming mode: `on_chunk` fires for each decoded piece as it
    /// arrives. Returns once the server closes the stream; a transport
    /// failure mid-stream is the caller's to surface (there is no server
    /// error channel once the body has started).
    pub async fn consult_stream<F>(
        &self,
        messages: &[ChatMessage],
        mut on_chunk: F
    ) -> Result<(), AgentError>
        where F: FnMut(&str)
    {
        let resp = self.post_messages("/api/consult/stream", messages).await?;
        if !resp.status().is_success() {
            return Err(Self::decode_error(resp).await);
        }

        let mut decoder = Utf8ChunkDecoder::new();
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(|e|
                AgentError::provider(format!("Stream transport error: {}", e))
            )?;
            let text = decoder.push(&bytes);
            if !text.is_empty() {
                on_chunk(&text);
            }
        }
        Ok(())
    }
}
