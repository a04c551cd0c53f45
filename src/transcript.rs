//! Conversation transcript
//!
//! A transcript is an append-only log of role-tagged messages. The first entry
//! is always the system instruction; it is sent to the model but never shown.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Wire name of the role
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One role-tagged utterance
///
/// Fields are private so a message cannot change once it is in a transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    role: Role,
    content: String,
}

impl Message {
    /// Create a system instruction message
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a user message
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyMessage`] if the content is blank
    pub fn user(content: impl Into<String>) -> Result<Self> {
        Self::non_empty(Role::User, content.into())
    }

    /// Create an assistant message
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyMessage`] if the content is blank
    pub fn assistant(content: impl Into<String>) -> Result<Self> {
        Self::non_empty(Role::Assistant, content.into())
    }

    fn non_empty(role: Role, content: String) -> Result<Self> {
        if content.trim().is_empty() {
            return Err(Error::EmptyMessage);
        }
        Ok(Self { role, content })
    }

    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Ordered message log seeded with a system instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Create a transcript holding only the system instruction
    #[must_use]
    pub fn new(system_instruction: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(system_instruction)],
        }
    }

    /// Append a user or assistant message
    ///
    /// System messages are rejected after seeding: the instruction slot is
    /// fixed for the lifetime of the transcript.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyMessage`] for blank content and
    /// [`Error::Config`] for a second system message
    pub fn append(&mut self, message: Message) -> Result<()> {
        match message.role {
            Role::System => {
                return Err(Error::Config(
                    "system instruction is fixed once the transcript exists".to_string(),
                ));
            }
            Role::User | Role::Assistant if message.content.trim().is_empty() => {
                return Err(Error::EmptyMessage);
            }
            Role::User | Role::Assistant => {}
        }
        self.messages.push(message);
        Ok(())
    }

    /// Messages shown to the user, in insertion order
    pub fn visible(&self) -> impl Iterator<Item = &Message> + '_ {
        self.messages.iter().filter(|m| m.role != Role::System)
    }

    /// Every message including the system instruction
    #[must_use]
    pub fn all(&self) -> &[Message] {
        &self.messages
    }

    /// The seeded system instruction
    #[must_use]
    pub fn system_instruction(&self) -> &str {
        // Always seeded by `new`, never removed
        self.messages.first().map_or("", |m| m.content.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
