use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::backend::{BackendError, Speaker};
use crate::common::{Message, ResolvedReply};

use super::store::MessageStore;
use super::surface::RenderSurface;

/// Identifies one outbound backend round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Work handed to the dispatcher once a submission is accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyRequest {
    pub id: RequestId,
    pub utterance: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingReply { request: RequestId },
}

impl SessionState {
    fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::AwaitingReply { .. } => "awaiting a reply",
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("submission is empty")]
    InvalidSubmission,
    #[error("submission rejected: {0}")]
    Rejected(String),
    #[error("a reply is still pending; submission ignored")]
    Busy,
    #[error("{event} is not valid while {state}")]
    InvalidTransition {
        event: &'static str,
        state: &'static str,
    },
    #[error("reply for request {0} arrived after it was abandoned")]
    StaleReply(RequestId),
    #[error("no reply within {}s", .0.as_secs())]
    ReplyTimedOut(Duration),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

pub enum Verdict {
    Accept,
    Reject(String),
}

/// Pure approval step run on a candidate user message before anything is
/// stored or sent.
pub trait SubmissionGate: Send {
    fn validate(&self, candidate: &Message) -> Verdict;
}

pub struct AcceptAll;

impl SubmissionGate for AcceptAll {
    fn validate(&self, _candidate: &Message) -> Verdict {
        Verdict::Accept
    }
}

/// Side-effecting step: starts the backend round trip for an accepted
/// submission. The completion must come back through the controller's
/// `on_reply_*` methods on the same thread that owns the controller.
pub trait ReplyDispatcher: Send {
    fn dispatch(&mut self, request: ReplyRequest);
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub greeting: String,
    pub speech_language: String,
}

/// Owns the transcript and the Idle/AwaitingReply state. Store and state
/// are only ever changed together, inside one method call.
pub struct ChatSessionController {
    store: MessageStore,
    state: SessionState,
    next_request: u64,
    settings: SessionSettings,
    gate: Box<dyn SubmissionGate>,
    dispatcher: Box<dyn ReplyDispatcher>,
    speaker: Arc<dyn Speaker>,
    surface: Box<dyn RenderSurface>,
}

impl ChatSessionController {
    pub fn new(
        settings: SessionSettings,
        gate: Box<dyn SubmissionGate>,
        dispatcher: Box<dyn ReplyDispatcher>,
        speaker: Arc<dyn Speaker>,
        surface: Box<dyn RenderSurface>,
    ) -> Self {
        let mut controller = Self {
            store: MessageStore::new(),
            state: SessionState::Idle,
            next_request: 0,
            settings,
            gate,
            dispatcher,
            speaker,
            surface,
        };
        controller.seed_greeting();
        controller
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    /// Checks a submission without touching any state.
    pub fn validate(&self, text: &str) -> Result<Message, SessionError> {
        if matches!(self.state, SessionState::AwaitingReply { .. }) {
            return Err(SessionError::Busy);
        }

        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::InvalidSubmission);
        }

        let candidate = Message::user(text);
        match self.gate.validate(&candidate) {
            Verdict::Accept => Ok(candidate),
            Verdict::Reject(reason) => Err(SessionError::Rejected(reason)),
        }
    }

    /// Accepts a user utterance: appends it, enters `AwaitingReply` and
    /// dispatches the backend request. Rejected submissions change nothing.
    pub fn submit(&mut self, text: &str) -> Result<RequestId, SessionError> {
        let message = self.validate(text)?;
        let utterance = message.content().to_string();

        self.store.append(message);
        self.refresh();

        let id = RequestId(self.next_request);
        self.next_request += 1;
        self.state = SessionState::AwaitingReply { request: id };
        self.surface.set_busy(true);

        log::info!("Dispatching request {id}: {utterance}");
        self.dispatcher.dispatch(ReplyRequest { id, utterance });
        Ok(id)
    }

    /// Appends the assistant reply and returns to `Idle`. Returns the index
    /// of the appended message.
    pub fn on_reply_received(
        &mut self,
        id: RequestId,
        reply: ResolvedReply,
    ) -> Result<usize, SessionError> {
        self.finish(id, "reply received")?;

        let message = Message::opponent(reply.speech_text).with_attachment(reply.attachment);
        Ok(self.append_opponent(message))
    }

    /// Returns to `Idle` without appending anything.
    pub fn on_reply_failed(&mut self, id: RequestId, error: BackendError) -> Result<(), SessionError> {
        self.finish(id, "reply failed")?;

        log::warn!("Request {id} failed: {error}");
        self.surface.notice(&format!("The assistant is unavailable: {error}"));
        Ok(())
    }

    /// Abandons the pending request; a late completion becomes stale.
    pub fn on_reply_timeout(&mut self, id: RequestId, after: Duration) -> Result<(), SessionError> {
        self.finish(id, "reply timeout")?;

        let error = SessionError::ReplyTimedOut(after);
        log::warn!("Request {id} abandoned: {error}");
        self.surface.notice(&format!("The assistant did not answer: {error}"));
        Ok(())
    }

    /// Drops the transcript and starts over from the greeting. A pending
    /// request is abandoned.
    pub fn reset(&mut self) {
        if let SessionState::AwaitingReply { request } = self.state {
            log::info!("Session reset abandons request {request}");
        }
        self.store.clear();
        self.state = SessionState::Idle;
        self.surface.set_busy(false);
        self.seed_greeting();
    }

    fn finish(&mut self, id: RequestId, event: &'static str) -> Result<(), SessionError> {
        let state = self.state;
        match state {
            SessionState::AwaitingReply { request } if request == id => {
                self.state = SessionState::Idle;
                self.surface.set_busy(false);
                Ok(())
            }
            _ if id.0 < self.next_request => Err(SessionError::StaleReply(id)),
            state => Err(SessionError::InvalidTransition {
                event,
                state: state.name(),
            }),
        }
    }

    fn seed_greeting(&mut self) {
        let greeting = Message::opponent(self.settings.greeting.clone());
        self.append_opponent(greeting);
    }

    fn append_opponent(&mut self, message: Message) -> usize {
        self.speaker
            .speak(message.content(), &self.settings.speech_language);
        let index = self.store.append(message);
        self.refresh();
        index
    }

    fn refresh(&mut self) {
        self.surface.reload_and_scroll_to_bottom(&self.store.snapshot());
    }
}
