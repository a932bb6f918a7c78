use std::time::Duration;

use chat_stream::body::{self, ByteStream};
use chat_stream::ChatRequest;
use serde::Deserialize;

use crate::prelude::*;

/// HTTP client for the relay.
#[derive(Debug, Clone)]
pub struct RelayClient {
    http: reqwest::Client,
    url: String,
    read_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl RelayClient {
    /// Creates a client for the relay's streaming endpoint at `url`.
    pub fn new(url: impl Into<String>, read_timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            url: url.into(),
            read_timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Sends `request` and returns the raw answer body.
    ///
    /// # Errors
    ///
    /// Rejected requests come back as `InvalidRequest`. An unreachable relay
    /// or any other failure status is `UpstreamUnavailable`.
    pub async fn query_stream(&self, request: &ChatRequest) -> Result<ByteStream> {
        request.validate()?;

        log::info!(
            "POST {} model={} messages={}",
            self.url,
            request.model,
            request.messages.len()
        );

        let response = self
            .http
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                chat_stream::Error::UpstreamUnavailable(format!(
                    "unable to reach the relay at {}: {e}",
                    self.url
                ))
            })?;

        let status = response.status();
        if status.is_client_error() {
            let message = error_message(response).await;
            return Err(chat_stream::Error::InvalidRequest(message).into());
        }
        if !status.is_success() {
            let message = error_message(response).await;
            return Err(
                chat_stream::Error::UpstreamUnavailable(format!("{status}: {message}")).into(),
            );
        }

        Ok(body::with_read_timeout(
            response.bytes_stream(),
            self.read_timeout,
        ))
    }

    /// Lists the models installed in the runtime behind the relay.
    pub async fn models(&self) -> Result<Vec<String>> {
        let url = models_url(&self.url);
        log::debug!("GET {url}");

        let response = self.http.get(&url).send().await?.error_for_status()?;
        let models: Vec<String> = response.json().await?;

        Ok(models)
    }
}

/// The relay serves `/models` next to its streaming endpoint.
fn models_url(url: &str) -> String {
    let url = url.trim_end_matches('/');
    match url.rsplit_once('/') {
        Some((base, _)) if base.contains("://") && !base.ends_with('/') => {
            format!("{base}/models")
        }
        _ => format!("{url}/models"),
    }
}

async fn error_message(response: reqwest::Response) -> String {
    let text = response.text().await.unwrap_or_default();

    match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => body.error.message,
        Err(_) => text,
    }
}
