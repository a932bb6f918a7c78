use std::path::PathBuf;

use clap::Parser;

/// Models offered when the relay can't list the installed ones.
pub const DEFAULT_MODELS: [&str; 3] = ["llama3.1", "qwen2.5-coder", "deepseek-r1"];

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful and concise assistant.";

#[derive(Debug, Parser)]
#[command(name = "chat")]
#[command(about = "Chat with a local LLM through the relay")]
pub struct Args {
    /// Url of the relay's streaming endpoint.
    #[clap(
        long,
        env = "CHAT_RELAY_URL",
        default_value = "http://localhost:8000/query_llm_stream"
    )]
    pub relay_url: String,

    /// The LLM model to use.
    #[clap(short, long, env = "CHAT_MODEL", default_value = DEFAULT_MODELS[0])]
    pub model: String,

    /// Customize the assistant's behavior.
    #[clap(short, long, env = "CHAT_SYSTEM", default_value = DEFAULT_SYSTEM_PROMPT)]
    pub system: String,

    /// Seconds to wait for the next piece of an answer before giving up.
    #[clap(long, env = "CHAT_READ_TIMEOUT", default_value_t = 300)]
    pub read_timeout: u64,

    /// Directory where `/export` writes its files.
    #[clap(long, env = "CHAT_EXPORT_DIR", default_value = ".")]
    pub export_dir: PathBuf,
}
