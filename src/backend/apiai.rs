use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::Reply;

use super::{BackendError, DialogueBackend};

pub const DEFAULT_BASE_URL: &str = "https://api.api.ai/v1";
const PROTOCOL_VERSION: &str = "20150910";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    query: &'a str,
    lang: &'a str,
    session_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    result: Option<QueryResult>,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    #[serde(default)]
    fulfillment: Option<Fulfillment>,
}

#[derive(Debug, Deserialize)]
struct Fulfillment {
    #[serde(default)]
    speech: Option<String>,
}

/// Text query client for the API.AI v1 `query` endpoint.
#[derive(Clone)]
pub struct ApiAiBackend {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
    language: String,
    session_id: String,
}

impl ApiAiBackend {
    pub fn new(
        base_url: impl Into<String>,
        access_token: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            language: language.into(),
            session_id: Uuid::new_v4().to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/query?v={PROTOCOL_VERSION}", self.base_url)
    }
}

impl DialogueBackend for ApiAiBackend {
    fn ask(&self, utterance: &str) -> BoxFuture<'static, Result<Reply, BackendError>> {
        let this = self.clone();
        let utterance = utterance.to_string();

        async move {
            if this.access_token.trim().is_empty() {
                return Err(BackendError::MissingToken);
            }

            let body = QueryRequest {
                query: &utterance,
                lang: &this.language,
                session_id: &this.session_id,
            };
            log::debug!("Querying dialogue service at {}", this.endpoint());

            let response = this
                .http
                .post(this.endpoint())
                .bearer_auth(&this.access_token)
                .json(&body)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let detail = response.text().await.unwrap_or_default();
                return Err(BackendError::Status {
                    status: status.as_u16(),
                    detail,
                });
            }

            let payload: QueryResponse = response.json().await?;
            speech_of(payload).map(|speech_text| Reply { speech_text })
        }
        .boxed()
    }
}

fn speech_of(payload: QueryResponse) -> Result<String, BackendError> {
    payload
        .result
        .and_then(|result| result.fulfillment)
        .and_then(|fulfillment| fulfillment.speech)
        .filter(|speech| !speech.trim().is_empty())
        .ok_or(BackendError::EmptyReply)
}
