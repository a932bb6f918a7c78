use clap::Parser;

use chat::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    chat::repl::run(args).await
}
