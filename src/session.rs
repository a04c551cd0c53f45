//! Per-user chat sessions
//!
//! A [`Session`] is the transcript store for one UI session. It is created
//! empty and seeds its transcript on first use. Nothing is written to disk:
//! dropping the session (or closing it in a [`SessionRegistry`]) ends it.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use uuid::Uuid;

use crate::transcript::{Message, Transcript};
use crate::{Error, Result};

/// One conversation and the transcript it owns
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    created_at: DateTime<Utc>,
    instruction: Arc<str>,
    transcript: Option<Transcript>,
}

impl Session {
    /// Create a session that will seed its transcript with `instruction`
    #[must_use]
    pub fn new(instruction: impl Into<Arc<str>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            instruction: instruction.into(),
            transcript: None,
        }
    }

    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Time elapsed since the session was created
    #[must_use]
    pub fn age(&self) -> TimeDelta {
        Utc::now() - self.created_at
    }

    /// Seed the transcript with the system instruction if it does not exist yet
    ///
    /// Calling this again is a no-op; existing history is never reset.
    pub fn initialize(&mut self) -> &mut Transcript {
        let instruction = &self.instruction;
        self.transcript.get_or_insert_with(|| {
            tracing::debug!("seeding session transcript");
            Transcript::new(instruction.as_ref())
        })
    }

    /// Whether the transcript has been seeded
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.transcript.is_some()
    }

    /// Append a message, seeding the transcript first if needed
    ///
    /// # Errors
    ///
    /// Returns error if the message is blank or a system message
    pub fn append(&mut self, message: Message) -> Result<()> {
        let id = self.id;
        let role = message.role();
        self.initialize().append(message)?;
        tracing::trace!(session_id = %id, %role, "appended message");
        Ok(())
    }

    /// Messages shown to the user, in insertion order
    ///
    /// Empty before the transcript is seeded.
    pub fn visible(&self) -> impl Iterator<Item = &Message> + '_ {
        self.transcript.iter().flat_map(Transcript::visible)
    }

    /// Every message including the system instruction
    ///
    /// Empty before the transcript is seeded.
    #[must_use]
    pub fn all(&self) -> &[Message] {
        match &self.transcript {
            Some(transcript) => transcript.all(),
            None => &[],
        }
    }

    #[must_use]
    pub const fn transcript(&self) -> Option<&Transcript> {
        self.transcript.as_ref()
    }
}

/// Independent sessions keyed by id
#[derive(Debug)]
pub struct SessionRegistry {
    instruction: Arc<str>,
    sessions: HashMap<Uuid, Session>,
}

impl SessionRegistry {
    /// Create a registry whose sessions share one system instruction
    #[must_use]
    pub fn new(instruction: impl Into<Arc<str>>) -> Self {
        Self {
            instruction: instruction.into(),
            sessions: HashMap::new(),
        }
    }

    /// Open a new session and return its id
    pub fn open(&mut self) -> Uuid {
        let session = Session::new(Arc::clone(&self.instruction));
        let id = session.id();
        tracing::info!(
            session_id = %id,
            created_at = %session.created_at(),
            "session opened"
        );
        self.sessions.insert(id, session);
        id
    }

    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<&Session> {
        self.sessions.get(&id)
    }

    /// Borrow a session for one turn
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionNotFound`] for unknown or closed sessions
    pub fn get_mut(&mut self, id: Uuid) -> Result<&mut Session> {
        self.sessions.get_mut(&id).ok_or(Error::SessionNotFound(id))
    }

    /// End a session, dropping its transcript
    pub fn close(&mut self, id: Uuid) -> Option<Session> {
        let session = self.sessions.remove(&id);
        if let Some(s) = &session {
            tracing::info!(
                session_id = %id,
                messages = s.visible().count(),
                age_secs = s.age().num_seconds(),
                "session closed"
            );
        }
        session
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
