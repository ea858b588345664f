use futures::FutureExt;
use futures::future::BoxFuture;
use reqwest::header::CONTENT_TYPE;

use crate::common::Attachment;

use super::{FetchError, ImageFetcher};

#[derive(Clone)]
pub struct HttpImageFetcher {
    http: reqwest::Client,
    max_bytes: usize,
}

impl HttpImageFetcher {
    pub fn new(max_bytes: usize) -> Self {
        Self {
            http: reqwest::Client::new(),
            max_bytes,
        }
    }
}

impl ImageFetcher for HttpImageFetcher {
    fn fetch(&self, url: &str) -> BoxFuture<'static, Result<Attachment, FetchError>> {
        let this = self.clone();
        let url = url.to_string();

        async move {
            let response = this.http.get(&url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status(status.as_u16()));
            }

            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);
            check_content_type(content_type.as_deref())?;

            if response
                .content_length()
                .is_some_and(|length| length as usize > this.max_bytes)
            {
                return Err(FetchError::TooLarge {
                    limit: this.max_bytes,
                });
            }

            let bytes = response.bytes().await?;
            if bytes.len() > this.max_bytes {
                return Err(FetchError::TooLarge {
                    limit: this.max_bytes,
                });
            }

            log::debug!("Fetched {} bytes from {url}", bytes.len());
            Ok(Attachment {
                url,
                content_type,
                bytes: bytes.to_vec(),
            })
        }
        .boxed()
    }
}

/// Servers that omit the header get the benefit of the doubt.
fn check_content_type(content_type: Option<&str>) -> Result<(), FetchError> {
    match content_type {
        Some(value) if !value.trim_start().to_ascii_lowercase().starts_with("image/") => {
            Err(FetchError::NotAnImage(value.to_string()))
        }
        _ => Ok(()),
    }
}
