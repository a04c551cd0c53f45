//! Chat completion providers
//!
//! A provider takes the full transcript and yields the reply as a stream of
//! text fragments in arrival order.

mod openai;
pub mod sse;

use async_trait::async_trait;
use futures::stream::BoxStream;

pub use openai::OpenAiChat;

use crate::Result;
use crate::transcript::Message;

/// Incremental reply: fragments in arrival order, ending at end-of-stream
pub type FragmentStream = BoxStream<'static, Result<String>>;

/// Produces a streamed reply for a transcript
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Start a streamed completion for `messages` using `model`
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Completion`] if the request cannot be started;
    /// failures after that arrive as `Err` items in the stream
    async fn stream_completion(
        &self,
        model: &str,
        messages: &[Message],
    ) -> Result<FragmentStream>;
}
