use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use relay::prelude::*;
use relay::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    log::info!("args: {:#?}", args);

    let upstream = chat_stream::ollama::Client::new(args.ollama_url.as_str())?
        .with_read_timeout(Duration::from_secs(args.read_timeout));

    let app = build_router(AppState::new(Arc::new(upstream)), &args.cors_origins);

    let listener = tokio::net::TcpListener::bind((args.host.as_str(), args.port)).await?;
    log::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(relay::shutdown::signal())
        .await?;

    log::info!("relay stopped");

    Ok(())
}
