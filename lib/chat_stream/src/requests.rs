use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Error;
use crate::message::ChatRequest;

/// Lazy sequence of generated text fragments.
pub type ChunkStream = BoxStream<'static, Result<String, Error>>;

/// A model runtime that can stream chat completions.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// # Errors
    ///
    /// Will return `Err` if:
    ///
    /// - The request body can't be serialized.
    /// - The runtime can't be reached.
    /// - The runtime answers with a non-success status.
    async fn chat_stream(&self, request: &ChatRequest) -> Result<ChunkStream, Error>;

    /// Names of the models installed on the runtime.
    async fn list_models(&self) -> Result<Vec<String>, Error>;
}
