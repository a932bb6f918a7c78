use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "relay")]
#[command(about = "Relay chat requests to a local Ollama runtime and stream the answer back")]
pub struct Args {
    /// Address to bind to.
    #[clap(long, env = "RELAY_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on.
    #[clap(short, long, env = "RELAY_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Base url of the Ollama runtime.
    #[clap(long, env = "RELAY_OLLAMA_URL", default_value = chat_stream::ollama::DEFAULT_URL)]
    pub ollama_url: String,

    /// Seconds to wait for the next piece of a streamed answer before giving up.
    #[clap(long, env = "RELAY_READ_TIMEOUT", default_value_t = 300)]
    pub read_timeout: u64,

    /// Allowed CORS origins. `*` allows every origin.
    #[clap(
        long = "cors-origin",
        env = "RELAY_CORS_ORIGINS",
        value_delimiter = ',',
        default_value = "*"
    )]
    pub cors_origins: Vec<String>,
}
