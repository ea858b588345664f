use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which side of the conversation produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    User,
    /// The assistant side.
    Opponent,
}

/// Image downloaded from a link found in a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub url: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Domain model for a single chat line.
///
/// Sender and content are fixed at construction; only the optional
/// timestamp and attachment can be supplied through the builder methods.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    id: Uuid,
    sender: Sender,
    content: String,
    timestamp: Option<DateTime<Utc>>,
    attachment: Option<Attachment>,
}

impl Message {
    pub fn new(sender: Sender, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            content: content.into(),
            timestamp: None,
            attachment: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Sender::User, content).stamped()
    }

    pub fn opponent(content: impl Into<String>) -> Self {
        Self::new(Sender::Opponent, content).stamped()
    }

    pub fn stamped(mut self) -> Self {
        self.timestamp = Some(Utc::now());
        self
    }

    pub fn with_attachment(mut self, attachment: Option<Attachment>) -> Self {
        self.attachment = attachment;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn sender(&self) -> Sender {
        self.sender
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }
}

/// Text returned by the dialogue backend for one utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub speech_text: String,
}

/// Reply plus whatever the pipeline managed to attach to it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedReply {
    pub speech_text: String,
    pub attachment: Option<Attachment>,
}
