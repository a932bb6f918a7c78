//! Streaming plumbing for a local LLM chat: the request/message types, a
//! relay that forwards chat requests to an Ollama runtime and passes its
//! output through as text fragments, and the segmenter that separates
//! `<think>` blocks from the answer on the consuming side.

pub mod body;
pub mod error;
pub mod message;
pub mod ollama;
pub mod relay;
pub mod requests;
pub mod segmenter;
pub mod utf8;

pub use error::Error;
pub use message::{ChatRequest, Conversation, Message, Role};
pub use requests::{ChunkStream, Upstream};
pub use segmenter::{Segmenter, Update};
pub use utf8::Utf8Decoder;
