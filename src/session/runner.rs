use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::backend::{BackendError, DialogueBackend, ImageFetcher, Speaker};
use crate::common::{ResolvedReply, SessionCommand};

use super::controller::{
    ChatSessionController, ReplyDispatcher, ReplyRequest, RequestId, SessionError, SessionSettings,
    SubmissionGate,
};
use super::link::first_link;
use super::surface::RenderSurface;

/// External services a session talks to.
pub struct Collaborators {
    pub backend: Arc<dyn DialogueBackend>,
    pub fetcher: Arc<dyn ImageFetcher>,
    pub speaker: Arc<dyn Speaker>,
    pub gate: Box<dyn SubmissionGate>,
}

/// Result of one backend round trip, marshaled back to the runner.
#[derive(Debug)]
struct Completion {
    id: RequestId,
    outcome: Result<ResolvedReply, BackendError>,
}

/// Runs each request on its own task and reports back over a channel.
struct TaskDispatcher {
    backend: Arc<dyn DialogueBackend>,
    fetcher: Arc<dyn ImageFetcher>,
    completion_sender: mpsc::UnboundedSender<Completion>,
}

impl ReplyDispatcher for TaskDispatcher {
    fn dispatch(&mut self, request: ReplyRequest) {
        let backend = Arc::clone(&self.backend);
        let fetcher = Arc::clone(&self.fetcher);
        let completion_sender = self.completion_sender.clone();

        tokio::spawn(async move {
            let outcome = resolve_reply(backend.as_ref(), fetcher.as_ref(), &request.utterance).await;
            let completion = Completion {
                id: request.id,
                outcome,
            };
            if completion_sender.send(completion).is_err() {
                log::debug!("Session closed before request {} completed", request.id);
            }
        });
    }
}

/// Asks the backend, then tries to attach the image behind the first link
/// in the reply. A failed download only drops the attachment.
pub async fn resolve_reply(
    backend: &dyn DialogueBackend,
    fetcher: &dyn ImageFetcher,
    utterance: &str,
) -> Result<ResolvedReply, BackendError> {
    let reply = backend.ask(utterance).await?;

    let attachment = match first_link(&reply.speech_text) {
        Some(url) => match fetcher.fetch(url).await {
            Ok(attachment) => Some(attachment),
            Err(err) => {
                log::warn!("Could not attach {url}: {err}");
                None
            }
        },
        None => None,
    };

    Ok(ResolvedReply {
        speech_text: reply.speech_text,
        attachment,
    })
}

/// Single task that owns the controller. UI commands, backend completions
/// and reply timeouts are all applied here, one at a time.
pub struct SessionRunner {
    controller: ChatSessionController,
    command_receiver: mpsc::Receiver<SessionCommand>,
    completion_receiver: mpsc::UnboundedReceiver<Completion>,
    reply_timeout: Duration,
    deadline: Option<(RequestId, Instant)>,
}

impl SessionRunner {
    pub fn new(
        settings: SessionSettings,
        collaborators: Collaborators,
        surface: Box<dyn RenderSurface>,
        command_receiver: mpsc::Receiver<SessionCommand>,
        reply_timeout: Duration,
    ) -> Self {
        let (completion_sender, completion_receiver) = mpsc::unbounded_channel();
        let dispatcher = TaskDispatcher {
            backend: collaborators.backend,
            fetcher: collaborators.fetcher,
            completion_sender,
        };
        let controller = ChatSessionController::new(
            settings,
            collaborators.gate,
            Box::new(dispatcher),
            collaborators.speaker,
            surface,
        );

        Self {
            controller,
            command_receiver,
            completion_receiver,
            reply_timeout,
            deadline: None,
        }
    }

    pub async fn run(mut self) {
        log::info!("Session loop started");

        loop {
            let sleep_at = self
                .deadline
                .map(|(_, at)| at)
                .unwrap_or_else(Instant::now);

            tokio::select! {
                command = self.command_receiver.recv() => {
                    match command {
                        Some(SessionCommand::Shutdown) | None => break,
                        Some(command) => self.handle_command(command),
                    }
                }
                Some(completion) = self.completion_receiver.recv() => {
                    self.handle_completion(completion);
                }
                _ = tokio::time::sleep_until(sleep_at), if self.deadline.is_some() => {
                    self.handle_timeout();
                }
            }
        }

        log::info!(
            "Session loop stopped with {} messages",
            self.controller.store().count()
        );
    }

    fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Submit(text) => match self.controller.submit(&text) {
                Ok(id) => {
                    self.deadline = Some((id, Instant::now() + self.reply_timeout));
                }
                Err(err) => log::debug!("Submission ignored: {err}"),
            },
            SessionCommand::Reset => {
                self.deadline = None;
                self.controller.reset();
            }
            SessionCommand::Shutdown => {}
        }
    }

    fn handle_completion(&mut self, completion: Completion) {
        let Completion { id, outcome } = completion;
        if self.deadline.is_some_and(|(pending, _)| pending == id) {
            self.deadline = None;
        }

        let applied = match outcome {
            Ok(reply) => self.controller.on_reply_received(id, reply).map(|_| ()),
            Err(err) => self.controller.on_reply_failed(id, err),
        };
        log_rejected(applied);
    }

    fn handle_timeout(&mut self) {
        if let Some((id, _)) = self.deadline.take() {
            log_rejected(self.controller.on_reply_timeout(id, self.reply_timeout));
        }
    }
}

fn log_rejected(result: Result<(), SessionError>) {
    match result {
        Ok(()) => {}
        Err(err @ SessionError::StaleReply(_)) => log::debug!("{err}"),
        Err(err) => log::error!("Session transition rejected: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::FutureExt;
    use futures::future::BoxFuture;

    use super::*;
    use crate::backend::{FetchError, MutedSpeaker};
    use crate::common::{Attachment, Message, Reply, Sender, SessionEvent};
    use crate::session::controller::AcceptAll;
    use crate::session::surface::ChannelSurface;

    const GREETING: &str = "Hi There, Welcome To The land of deserts";

    enum Script {
        Answer(&'static str),
        Fail,
        Hang,
    }

    struct FakeBackend {
        script: Script,
        calls: Arc<AtomicUsize>,
        utterances: Arc<std::sync::Mutex<Vec<String>>>,
    }

    impl FakeBackend {
        fn new(script: Script) -> Self {
            Self {
                script,
                calls: Arc::new(AtomicUsize::new(0)),
                utterances: Arc::default(),
            }
        }
    }

    impl DialogueBackend for FakeBackend {
        fn ask(&self, utterance: &str) -> BoxFuture<'static, Result<Reply, BackendError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.utterances.lock().unwrap().push(utterance.to_string());
            match self.script {
                Script::Answer(text) => futures::future::ready(Ok(Reply {
                    speech_text: text.to_string(),
                }))
                .boxed(),
                Script::Fail => futures::future::ready(Err(BackendError::EmptyReply)).boxed(),
                Script::Hang => futures::future::pending::<Result<Reply, BackendError>>().boxed(),
            }
        }
    }

    struct FakeFetcher {
        succeed: bool,
        calls: Arc<AtomicUsize>,
    }

    impl FakeFetcher {
        fn new(succeed: bool) -> Self {
            Self {
                succeed,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl ImageFetcher for FakeFetcher {
        fn fetch(&self, url: &str) -> BoxFuture<'static, Result<Attachment, FetchError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let result = if self.succeed {
                Ok(Attachment {
                    url: url.to_string(),
                    content_type: Some("image/png".to_string()),
                    bytes: vec![1, 2, 3],
                })
            } else {
                Err(FetchError::Status(404))
            };
            futures::future::ready(result).boxed()
        }
    }

    struct Harness {
        commands: mpsc::Sender<SessionCommand>,
        events: mpsc::Receiver<SessionEvent>,
        backend_calls: Arc<AtomicUsize>,
        utterances: Arc<std::sync::Mutex<Vec<String>>>,
    }

    impl Harness {
        fn start(script: Script, fetch_succeeds: bool) -> Self {
            let backend = FakeBackend::new(script);
            let backend_calls = Arc::clone(&backend.calls);
            let utterances = Arc::clone(&backend.utterances);
            let (commands, command_receiver) = mpsc::channel(16);
            let (event_sender, events) = mpsc::channel(64);

            let runner = SessionRunner::new(
                SessionSettings {
                    greeting: GREETING.to_string(),
                    speech_language: "en-AU".to_string(),
                },
                Collaborators {
                    backend: Arc::new(backend),
                    fetcher: Arc::new(FakeFetcher::new(fetch_succeeds)),
                    speaker: Arc::new(MutedSpeaker),
                    gate: Box::new(AcceptAll),
                },
                Box::new(ChannelSurface::new(event_sender)),
                command_receiver,
                Duration::from_secs(30),
            );
            tokio::spawn(runner.run());

            Self {
                commands,
                events,
                backend_calls,
                utterances,
            }
        }

        async fn submit(&self, text: &str) {
            self.commands
                .send(SessionCommand::Submit(text.to_string()))
                .await
                .unwrap();
        }

        async fn next_event(&mut self) -> SessionEvent {
            tokio::time::timeout(Duration::from_secs(300), self.events.recv())
                .await
                .expect("session event")
                .expect("session still running")
        }

        async fn next_refresh(&mut self) -> Vec<Message> {
            loop {
                if let SessionEvent::Refresh(rows) = self.next_event().await {
                    return rows;
                }
            }
        }

        async fn next_notice(&mut self) -> String {
            loop {
                if let SessionEvent::Notice(text) = self.next_event().await {
                    return text;
                }
            }
        }
    }

    #[tokio::test]
    async fn greeting_is_rendered_before_any_input() {
        let mut harness = Harness::start(Script::Answer("unused"), true);

        let rows = harness.next_refresh().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].sender(), Sender::Opponent);
        assert_eq!(rows[0].content(), GREETING);
    }

    #[tokio::test]
    async fn round_trip_appends_user_line_then_reply() {
        let mut harness = Harness::start(Script::Answer("Visit Jaipur"), true);
        harness.next_refresh().await;

        harness.submit("Hello").await;
        let after_submit = harness.next_refresh().await;
        assert_eq!(after_submit.len(), 2);
        assert_eq!(after_submit[1].content(), "Hello");

        let after_reply = harness.next_refresh().await;
        assert_eq!(after_reply.len(), 3);
        assert_eq!(after_reply[2].sender(), Sender::Opponent);
        assert_eq!(after_reply[2].content(), "Visit Jaipur");
        assert!(after_reply[2].attachment().is_none());

        assert_eq!(harness.backend_calls.load(Ordering::SeqCst), 1);
        assert_eq!(*harness.utterances.lock().unwrap(), vec!["Hello".to_string()]);
    }

    #[tokio::test]
    async fn blank_submission_never_reaches_backend() {
        let mut harness = Harness::start(Script::Answer("Visit Jaipur"), true);
        harness.next_refresh().await;

        harness.submit("   ").await;
        harness.submit("Hello").await;

        // The first refresh after the blank submit is the one for "Hello".
        let rows = harness.next_refresh().await;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].content(), "Hello");
        assert_eq!(harness.next_refresh().await.len(), 3);
        assert_eq!(harness.backend_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_request_returns_to_idle() {
        let mut harness = Harness::start(Script::Fail, true);
        harness.next_refresh().await;

        harness.submit("Hello").await;
        assert_eq!(harness.next_refresh().await.len(), 2);
        let notice = harness.next_notice().await;
        assert!(notice.contains("unavailable"));

        // Idle again: the next submission is dispatched.
        harness.submit("Hello again").await;
        assert_eq!(harness.next_refresh().await.len(), 3);
        harness.next_notice().await;
        assert_eq!(harness.backend_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_backend_times_out_and_ignores_second_submit() {
        let mut harness = Harness::start(Script::Hang, true);
        harness.next_refresh().await;

        harness.submit("Hello").await;
        harness.submit("Are you there").await;
        assert_eq!(harness.next_refresh().await.len(), 2);

        let notice = harness.next_notice().await;
        assert!(notice.contains("did not answer"));
        assert_eq!(harness.backend_calls.load(Ordering::SeqCst), 1);

        harness.submit("Hello again").await;
        assert_eq!(harness.next_refresh().await.len(), 3);
        assert_eq!(harness.backend_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn linked_image_is_attached_when_download_succeeds() {
        let backend = FakeBackend::new(Script::Answer("See http://x.test/a.png here"));
        let fetcher = FakeFetcher::new(true);

        let reply = resolve_reply(&backend, &fetcher, "Show me").await.unwrap();

        assert_eq!(reply.speech_text, "See http://x.test/a.png here");
        let attachment = reply.attachment.expect("attachment");
        assert_eq!(attachment.url, "http://x.test/a.png");
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_download_keeps_reply_without_attachment() {
        let backend = FakeBackend::new(Script::Answer("See http://x.test/a.png here"));
        let fetcher = FakeFetcher::new(false);

        let reply = resolve_reply(&backend, &fetcher, "Show me").await.unwrap();

        assert_eq!(reply.speech_text, "See http://x.test/a.png here");
        assert!(reply.attachment.is_none());
    }

    #[tokio::test]
    async fn reply_without_link_skips_fetch() {
        let backend = FakeBackend::new(Script::Answer("Visit Jaipur"));
        let fetcher = FakeFetcher::new(true);

        let reply = resolve_reply(&backend, &fetcher, "Hello").await.unwrap();

        assert!(reply.attachment.is_none());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn reset_restores_greeting() {
        let mut harness = Harness::start(Script::Answer("Visit Jaipur"), true);
        harness.next_refresh().await;
        harness.submit("Hello").await;
        harness.next_refresh().await;
        harness.next_refresh().await;

        harness.commands.send(SessionCommand::Reset).await.unwrap();

        let rows = harness.next_refresh().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].content(), GREETING);
    }
}
