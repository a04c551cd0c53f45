//! Turn processing
//!
//! One turn takes an input event, stores it as a user message, streams the
//! model reply to the view and stores the finished reply. Collaborator
//! failures never escape: they become a [`Notice`] and the turn is dropped.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;

use crate::config::Config;
use crate::llm::CompletionProvider;
use crate::session::Session;
use crate::transcript::Message;
use crate::view::{ChatView, Notice};
use crate::voice::Transcriber;
use crate::{Error, Result};

/// One input event from the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// Typed text
    Text(String),
    /// Recorded audio to transcribe
    Audio(Vec<u8>),
}

/// Result of handling one input event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Both messages were appended to the transcript
    Completed { prompt: String, reply: String },
    /// Blank input; nothing happened
    Ignored,
    /// The turn stopped early; the notice has already been shown
    Aborted(Notice),
}

/// Drives input events through transcription and completion
pub struct TurnProcessor {
    transcriber: Arc<dyn Transcriber>,
    completion: Arc<dyn CompletionProvider>,
    model: String,
    timeout: Option<Duration>,
}

impl TurnProcessor {
    #[must_use]
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        completion: Arc<dyn CompletionProvider>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            transcriber,
            completion,
            model: model.into(),
            timeout: None,
        }
    }

    /// Bound the time one streamed reply may take
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build a processor using the model and timeout from configuration
    #[must_use]
    pub fn from_config(
        config: &Config,
        transcriber: Arc<dyn Transcriber>,
        completion: Arc<dyn CompletionProvider>,
    ) -> Self {
        Self::new(transcriber, completion, config.llm.model.clone())
            .with_timeout(config.llm.timeout)
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Handle one input event for `session`
    ///
    /// The user message is stored before the reply is requested. A failed
    /// reply leaves it in place but stores no assistant message.
    pub async fn handle_input(
        &self,
        session: &mut Session,
        input: InputEvent,
        view: &mut (dyn ChatView + Send),
    ) -> TurnOutcome {
        let session_id = session.id();

        let text = match input {
            InputEvent::Text(text) => text,
            InputEvent::Audio(audio) => match self.transcriber.transcribe(&audio).await {
                Ok(text) => {
                    if !text.trim().is_empty() {
                        view.show_notice(&Notice::Transcribed(text.clone()));
                    }
                    text
                }
                Err(e) => {
                    tracing::warn!(%session_id, error = %e, "transcription failed, dropping turn");
                    let notice = Notice::TranscriptionFailed(reason(&e));
                    view.show_notice(&notice);
                    return TurnOutcome::Aborted(notice);
                }
            },
        };

        let Ok(user) = Message::user(text) else {
            tracing::debug!(%session_id, "ignoring blank input");
            return TurnOutcome::Ignored;
        };
        let prompt = user.content().to_string();

        session.initialize();
        if let Err(e) = session.append(user.clone()) {
            // Unreachable for a validated user message
            tracing::error!(%session_id, error = %e, "failed to store user message");
            let notice = Notice::CompletionFailed(reason(&e));
            view.show_notice(&notice);
            return TurnOutcome::Aborted(notice);
        }
        view.show_message(&user);

        tracing::info!(
            %session_id,
            model = %self.model,
            messages = session.all().len(),
            "requesting reply"
        );

        view.begin_reply();
        let streamed = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.stream_reply(session, view))
                .await
                .unwrap_or_else(|_| {
                    Err(Error::Completion(format!(
                        "no complete reply within {limit:?}"
                    )))
                }),
            None => self.stream_reply(session, view).await,
        };

        let stored = streamed.and_then(|reply| {
            let message = Message::assistant(reply)
                .map_err(|_| Error::Completion("model returned an empty reply".to_string()))?;
            let reply = message.content().to_string();
            session.append(message)?;
            Ok(reply)
        });

        match stored {
            Ok(reply) => {
                view.end_reply(true);
                tracing::info!(%session_id, reply_chars = reply.len(), "turn complete");
                TurnOutcome::Completed { prompt, reply }
            }
            Err(e) => {
                view.end_reply(false);
                tracing::warn!(%session_id, error = %e, "completion failed, reply discarded");
                let notice = Notice::CompletionFailed(reason(&e));
                view.show_notice(&notice);
                TurnOutcome::Aborted(notice)
            }
        }
    }

    /// Consume the reply stream, echoing fragments, and return the full text
    async fn stream_reply(
        &self,
        session: &Session,
        view: &mut (dyn ChatView + Send),
    ) -> Result<String> {
        let mut stream = self
            .completion
            .stream_completion(&self.model, session.all())
            .await?;

        let mut reply = String::new();
        let mut fragments = 0usize;
        while let Some(fragment) = stream.next().await {
            let fragment = fragment?;
            view.show_fragment(&fragment);
            reply.push_str(&fragment);
            fragments += 1;
        }

        tracing::debug!(fragments, "reply stream ended");
        Ok(reply)
    }
}

/// Notice text for an error, without the variant prefix
fn reason(error: &Error) -> String {
    match error {
        Error::Transcription(msg) | Error::Completion(msg) | Error::Config(msg) => msg.clone(),
        other => other.to_string(),
    }
}
