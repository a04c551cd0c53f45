//! grafit-chat - streaming chat client for Grafit circuit modelling
//!
//! This library provides the conversation core behind the `grafit-chat` binary:
//! - Per-session transcripts seeded with a fixed system instruction
//! - A turn processor that transcribes audio, streams the model reply and
//!   records both sides of the exchange
//! - `OpenAI` chat completion and Whisper/Deepgram transcription clients
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │            Front end (ChatView)              │
//! │     text input  │  audio input  │  render    │
//! └──────────────────────┬───────────────────────┘
//!                        │ InputEvent
//! ┌──────────────────────▼───────────────────────┐
//! │               TurnProcessor                  │
//! │   Session / Transcript  │  timeout  │ notices│
//! └──────────┬────────────────────────┬──────────┘
//!            │                        │
//! ┌──────────▼─────────┐   ┌──────────▼──────────┐
//! │  Transcriber (STT) │   │ CompletionProvider  │
//! │  Whisper, Deepgram │   │  SSE chat stream    │
//! └────────────────────┘   └─────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod llm;
pub mod prompt;
pub mod session;
pub mod transcript;
pub mod turn;
pub mod view;
pub mod voice;

pub use config::Config;
pub use error::{Error, Result};
pub use llm::{CompletionProvider, FragmentStream, OpenAiChat};
pub use session::{Session, SessionRegistry};
pub use transcript::{Message, Role, Transcript};
pub use turn::{InputEvent, TurnOutcome, TurnProcessor};
pub use view::{ChatView, Notice, TerminalView};
pub use voice::{SpeechToText, SttProvider, Transcriber};
