use std::time::Duration;

use async_trait::async_trait;
use futures::stream::StreamExt;
use serde::{Deserialize, Serialize};

use crate::body::{self, ByteStream};
use crate::error::Error;
use crate::message::{ChatRequest, Message};
use crate::requests::{ChunkStream, Upstream};

/// Default address of a local Ollama server.
pub const DEFAULT_URL: &str = "http://localhost:11434";

// Chat API
const CHAT_API: &str = "/api/chat";
// List local models API
const TAGS_API: &str = "/api/tags";

const OLLAMA_HINT: &str = "Make sure Ollama is running with: ollama serve";

#[derive(Debug, Serialize)]
struct MessageBody<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
}

/// One line of the newline-delimited JSON response.
#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    message: Option<ChunkMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct Model {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<Model>,
}

#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    read_timeout: Duration,
}

impl Client {
    /// # Errors
    ///
    /// Will return `Err` if the HTTP client can't be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            read_timeout: body::DEFAULT_READ_TIMEOUT,
        })
    }

    /// Maximum time to wait for the next piece of a streamed response.
    #[must_use]
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, api: &str) -> String {
        format!("{}{api}", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl Upstream for Client {
    async fn chat_stream(&self, request: &ChatRequest) -> Result<ChunkStream, Error> {
        let body = MessageBody {
            model: &request.model,
            messages: &request.messages,
            stream: true,
        };
        log::debug!("body: {:#?}", body);

        let url = self.url(CHAT_API);
        log::info!("POST {url}");

        let response = self.http.post(&url).json(&body).send().await.map_err(|e| {
            Error::UpstreamUnavailable(format!(
                "unable to reach the model runtime at {}: {e}. {OLLAMA_HINT}",
                self.base_url
            ))
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::UpstreamUnavailable(format!(
                "model runtime answered {status}: {}",
                error_message(&text)
            )));
        }

        let bytes = body::with_read_timeout(response.bytes_stream(), self.read_timeout);

        Ok(fragments(bytes))
    }

    async fn list_models(&self) -> Result<Vec<String>, Error> {
        let url = self.url(TAGS_API);
        log::info!("GET {url}");

        let response = self.http.get(&url).send().await.map_err(|e| {
            Error::UpstreamUnavailable(format!(
                "unable to reach the model runtime at {}: {e}",
                self.base_url
            ))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::UpstreamUnavailable(format!(
                "failed to list models: {status}"
            )));
        }

        let models: ModelsResponse = response.json().await?;

        Ok(models.models.into_iter().map(|model| model.name).collect())
    }
}

/// Pulls the `error` field out of an Ollama error body, if there is one.
fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: String,
    }

    serde_json::from_str::<ErrorBody>(body)
        .map(|body| body.error)
        .unwrap_or_else(|_| body.trim().to_string())
}

struct Lines {
    bytes: ByteStream,
    buffer: Vec<u8>,
    eof: bool,
    done: bool,
}

impl Lines {
    fn next_line(&mut self) -> Option<Vec<u8>> {
        let newline = self.buffer.iter().position(|b| *b == b'\n')?;
        let mut line: Vec<u8> = self.buffer.drain(..=newline).collect();
        line.pop();
        Some(line)
    }
}

enum Parsed {
    Skip,
    Text(String),
    Last(String),
}

fn parse_line(line: &[u8]) -> Result<Parsed, Error> {
    if line.iter().all(u8::is_ascii_whitespace) {
        return Ok(Parsed::Skip);
    }

    let chunk: ChatChunk = serde_json::from_slice(line)?;

    if let Some(error) = chunk.error {
        return Err(Error::ApiError(error));
    }

    let content = chunk.message.map(|m| m.content).unwrap_or_default();

    if chunk.done {
        Ok(Parsed::Last(content))
    } else if content.is_empty() {
        Ok(Parsed::Skip)
    } else {
        Ok(Parsed::Text(content))
    }
}

/// Turns a newline-delimited JSON body into content fragments.
///
/// Lines may be split across body chunks; the stream ends at the `done`
/// line, at the end of the body, or right after the first error.
fn fragments(bytes: ByteStream) -> ChunkStream {
    let lines = Lines {
        bytes,
        buffer: Vec::new(),
        eof: false,
        done: false,
    };

    futures::stream::unfold(lines, |mut lines| async move {
        loop {
            if lines.done {
                return None;
            }

            if let Some(line) = lines.next_line() {
                match parse_line(&line) {
                    Ok(Parsed::Skip) => continue,
                    Ok(Parsed::Text(text)) => return Some((Ok(text), lines)),
                    Ok(Parsed::Last(text)) => {
                        log::debug!("stream done");
                        lines.done = true;
                        if text.is_empty() {
                            return None;
                        }
                        return Some((Ok(text), lines));
                    }
                    Err(e) => {
                        log::error!("unable to parse stream line: {e}");
                        lines.done = true;
                        return Some((Err(e), lines));
                    }
                }
            }

            if lines.eof {
                return None;
            }

            match lines.bytes.next().await {
                Some(Ok(chunk)) => lines.buffer.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    lines.done = true;
                    return Some((Err(e), lines));
                }
                None => {
                    lines.eof = true;
                    if !lines.buffer.is_empty() {
                        lines.buffer.push(b'\n');
                    }
                }
            }
        }
    })
    .boxed()
}
