//! Chat display
//!
//! The turn processor talks to the screen only through [`ChatView`], so the
//! same turn logic drives the terminal front end and the test recorder.

use std::io::Write;

use crate::transcript::{Message, Role};

/// User-visible notice produced while processing a turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Audio was transcribed to this text
    Transcribed(String),
    /// Transcription failed; the turn was dropped
    TranscriptionFailed(String),
    /// The reply could not be completed; nothing was stored for it
    CompletionFailed(String),
}

impl Notice {
    /// Whether the notice reports a failure
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::TranscriptionFailed(_) | Self::CompletionFailed(_))
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transcribed(text) => write!(f, "Transcription: {text}"),
            Self::TranscriptionFailed(reason) => {
                write!(f, "Erreur lors de la transcription audio: {reason}")
            }
            Self::CompletionFailed(reason) => {
                write!(f, "Erreur lors de la génération de la réponse: {reason}")
            }
        }
    }
}

/// Display collaborator for one chat
pub trait ChatView {
    /// Render a finished message
    fn show_message(&mut self, message: &Message);

    /// Open the assistant reply area before fragments arrive
    fn begin_reply(&mut self);

    /// Render one reply fragment as soon as it arrives
    fn show_fragment(&mut self, fragment: &str);

    /// Close the reply area; `completed` is false when the reply was abandoned
    fn end_reply(&mut self, completed: bool);

    /// Render a notice
    fn show_notice(&mut self, notice: &Notice);
}

/// Render every visible message, e.g. when a chat is redrawn
pub fn show_history<'a, V, I>(view: &mut V, messages: I)
where
    V: ChatView + ?Sized,
    I: IntoIterator<Item = &'a Message>,
{
    for message in messages {
        view.show_message(message);
    }
}

/// Plain-text chat view over any writer
///
/// Write errors are ignored: a closed terminal must not abort a turn that
/// is already updating the transcript.
pub struct TerminalView<W: Write> {
    out: W,
}

impl<W: Write> TerminalView<W> {
    #[must_use]
    pub const fn new(out: W) -> Self {
        Self { out }
    }

    #[must_use]
    pub fn into_inner(self) -> W {
        self.out
    }

    const fn label(role: Role) -> &'static str {
        match role {
            Role::System => "system",
            Role::User => "you",
            Role::Assistant => "assistant",
        }
    }
}

impl<W: Write> ChatView for TerminalView<W> {
    fn show_message(&mut self, message: &Message) {
        let _ = writeln!(
            self.out,
            "{}> {}",
            Self::label(message.role()),
            message.content()
        );
        let _ = self.out.flush();
    }

    fn begin_reply(&mut self) {
        let _ = write!(self.out, "{}> ", Self::label(Role::Assistant));
        let _ = self.out.flush();
    }

    fn show_fragment(&mut self, fragment: &str) {
        let _ = write!(self.out, "{fragment}");
        let _ = self.out.flush();
    }

    fn end_reply(&mut self, completed: bool) {
        if completed {
            let _ = writeln!(self.out);
        } else {
            let _ = writeln!(self.out, " [interrupted]");
        }
        let _ = self.out.flush();
    }

    fn show_notice(&mut self, notice: &Notice) {
        let tag = if notice.is_error() { "error" } else { "info" };
        let _ = writeln!(self.out, "[{tag}] {notice}");
        let _ = self.out.flush();
    }
}
