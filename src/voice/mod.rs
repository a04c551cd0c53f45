//! Voice dictation
//!
//! Audio arrives already recorded; this module only turns it into text.

mod stt;

use async_trait::async_trait;

pub use stt::{SpeechToText, SttProvider};

use crate::Result;

/// Converts one recorded audio payload to text
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe raw audio bytes
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Transcription`] or a transport error on failure
    async fn transcribe(&self, audio: &[u8]) -> Result<String>;
}
