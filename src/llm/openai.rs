//! `OpenAI`-compatible streaming chat completions

use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::sse::SseDecoder;
use super::{CompletionProvider, FragmentStream};
use crate::config::Config;
use crate::transcript::Message;
use crate::{Error, Result};

/// Streaming chat completion request body
#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
}

/// One `chat.completion.chunk` event
#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
}

/// Error object returned in bodies and in-stream
#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

/// What one SSE payload means for the reply
#[derive(Debug, PartialEq, Eq)]
enum ChunkEvent {
    /// Text to append, possibly with the finish marker
    Delta { content: Option<String>, finished: bool },
    /// `[DONE]` sentinel
    Done,
}

/// Chat completion client for `/chat/completions`
pub struct OpenAiChat {
    client: reqwest::Client,
    api_key: SecretString,
    url: String,
}

impl OpenAiChat {
    /// Create a client for an `OpenAI`-compatible API root
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing or the HTTP client cannot be built
    pub fn new(api_key: SecretString, base_url: &str) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config(
                "OpenAI API key required for chat completion".to_string(),
            ));
        }

        // No overall timeout here: a reply may stream for a long time, the
        // turn processor bounds the whole reply instead
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
        })
    }

    /// Create a client from configuration
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.api_keys.openai.clone(), &config.llm.base_url)
    }
}

#[async_trait]
impl CompletionProvider for OpenAiChat {
    async fn stream_completion(
        &self,
        model: &str,
        messages: &[Message],
    ) -> Result<FragmentStream> {
        tracing::debug!(model, messages = messages.len(), "starting chat completion");

        let request = ChatCompletionRequest {
            model,
            messages,
            stream: true,
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "chat completion request failed");
                Error::Completion(format!("request failed: {e}"))
            })?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "chat completion API error");
            return Err(Error::Completion(format!(
                "API error {status}: {}",
                error_message(&body)
            )));
        }

        Ok(fragments(response.bytes_stream()))
    }
}

/// Pull the human-readable message out of an error body
fn error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map_or_else(|_| body.trim().to_string(), |b| b.error.message)
}

/// Interpret one SSE payload
fn parse_chunk(data: &str) -> Result<ChunkEvent> {
    if data.trim() == "[DONE]" {
        return Ok(ChunkEvent::Done);
    }

    let chunk: ChatCompletionChunk = serde_json::from_str(data)
        .map_err(|e| Error::Completion(format!("malformed stream chunk: {e}")))?;

    if let Some(err) = chunk.error {
        return Err(Error::Completion(err.message));
    }

    // Only the first choice is requested
    let Some(choice) = chunk.choices.into_iter().next() else {
        return Ok(ChunkEvent::Delta {
            content: None,
            finished: false,
        });
    };

    Ok(ChunkEvent::Delta {
        content: choice.delta.content.filter(|c| !c.is_empty()),
        finished: choice.finish_reason.is_some(),
    })
}

struct DecodeState<S> {
    bytes: Pin<Box<S>>,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    finished: bool,
    eof: bool,
    done: bool,
}

/// Turn a raw SSE byte stream into reply fragments
///
/// The stream ends cleanly at `[DONE]`, or at end of body once a choice has
/// reported a finish reason. A body that stops before either is an error so a
/// truncated reply is never mistaken for a complete one.
pub(crate) fn fragments<S, B, E>(bytes: S) -> FragmentStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = DecodeState {
        bytes: Box::pin(bytes),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
        eof: false,
        done: false,
    };

    futures::stream::unfold(state, |mut st| async move {
        loop {
            if st.done {
                return None;
            }

            if let Some(data) = st.pending.pop_front() {
                match parse_chunk(&data) {
                    Ok(ChunkEvent::Done) => {
                        tracing::trace!("stream complete");
                        return None;
                    }
                    Ok(ChunkEvent::Delta { content, finished }) => {
                        st.finished |= finished;
                        if let Some(text) = content {
                            return Some((Ok(text), st));
                        }
                        continue;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "chat completion stream error");
                        st.done = true;
                        return Some((Err(e), st));
                    }
                }
            }

            if st.eof {
                st.done = true;
                if st.finished {
                    return None;
                }
                return Some((
                    Err(Error::Completion(
                        "stream ended before the reply was complete".to_string(),
                    )),
                    st,
                ));
            }

            match st.bytes.next().await {
                Some(Ok(chunk)) => {
                    let events = st.decoder.push(chunk.as_ref());
                    st.pending.extend(events);
                }
                Some(Err(e)) => {
                    tracing::error!(error = %e, "chat completion stream interrupted");
                    st.done = true;
                    let err = Error::Completion(format!("stream interrupted: {e}"));
                    return Some((Err(err), st));
                }
                None => {
                    st.eof = true;
                    st.pending.extend(st.decoder.finish());
                }
            }
        }
    })
    .boxed()
}
