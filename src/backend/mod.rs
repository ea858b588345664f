//! Outbound collaborators of a chat session: the dialogue API, image
//! downloads and speech output.

pub mod apiai;
pub mod image;
pub mod speech;

use futures::future::BoxFuture;
use thiserror::Error;

use crate::common::{Attachment, Reply};

pub use apiai::ApiAiBackend;
pub use image::HttpImageFetcher;
pub use speech::{CommandSpeaker, LogSpeaker, MutedSpeaker, SpeechCommand};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("dialogue request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("dialogue service returned status {status}: {detail}")]
    Status { status: u16, detail: String },
    #[error("dialogue service answered without speech text")]
    EmptyReply,
    #[error("no access token configured")]
    MissingToken,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("image request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("image request returned status {0}")]
    Status(u16),
    #[error("resource is not an image ({0})")]
    NotAnImage(String),
    #[error("image is larger than {limit} bytes")]
    TooLarge { limit: usize },
}

/// Natural-language service that turns an utterance into a reply.
pub trait DialogueBackend: Send + Sync {
    fn ask(&self, utterance: &str) -> BoxFuture<'static, Result<Reply, BackendError>>;
}

pub trait ImageFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> BoxFuture<'static, Result<Attachment, FetchError>>;
}

/// Fire-and-forget speech output.
pub trait Speaker: Send + Sync {
    fn speak(&self, text: &str, language_tag: &str);
}
