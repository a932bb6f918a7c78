use std::future::Future;
use std::io::Write;
use std::time::Duration;

use chrono::Local;
use crossterm::style::Stylize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

use crate::args::DEFAULT_MODELS;
use crate::client::RelayClient;
use crate::commands::{Command, HELP};
use crate::export;
use crate::prelude::*;
use crate::render::{Renderer, Terminal};
use crate::session::Session;

/// Reads commands from stdin until `/quit` or end of input.
pub async fn run(args: Args) -> Result<()> {
    let client = RelayClient::new(&args.relay_url, Duration::from_secs(args.read_timeout))?;
    let mut session = Session::new(args.model, args.system);
    let mut renderer = Terminal::new(std::io::stdout());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    log::info!("using relay at {}", client.url());
    println!("{}", "💬 LLM Chat".bold());
    print_settings(&session);
    println!("Type /help for the list of commands.\n");

    loop {
        print!("{} ", ">".bold());
        std::io::stdout().flush()?;

        let Some(line) = next_input(&mut lines, tokio::signal::ctrl_c()).await? else {
            println!();
            break;
        };

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                println!("{}", e.to_string().red());
                continue;
            }
        };

        match command {
            Command::Empty => {}
            Command::Quit => break,
            Command::Help => println!("{HELP}\n"),
            Command::Prompt(prompt) => {
                let cancelled = tokio::select! {
                    result = session.send(&client, &prompt, &mut renderer) => {
                        if let Err(e) = result {
                            log::debug!("turn failed: {e:?}");
                        }
                        false
                    }
                    _ = tokio::signal::ctrl_c() => true,
                };

                if cancelled {
                    log::info!("turn cancelled");
                    renderer.draw_error("cancelled")?;
                    renderer.finish()?;
                }
                println!();
            }
            Command::Clear => {
                session.clear();
                println!("Conversation cleared.\n");
            }
            Command::Export { format, dir } => {
                let export = export::export(
                    session.history(),
                    &session.model,
                    &session.system_prompt,
                    format,
                    Local::now(),
                )?;
                let dir = dir.unwrap_or_else(|| args.export_dir.clone());

                match export.write_to(&dir) {
                    Ok(path) => println!("Saved {} ({})\n", path.display(), export.mime),
                    Err(e) => println!("{}\n", format!("Unable to export: {e}").red()),
                }
            }
            Command::Model(None) => {
                println!("Model: {}\n", session.model);
            }
            Command::Model(Some(model)) => {
                session.model = model;
                print_settings(&session);
            }
            Command::Models => {
                let models = match client.models().await {
                    Ok(models) if !models.is_empty() => models,
                    Ok(_) => default_models(),
                    Err(e) => {
                        log::warn!("unable to list models: {e}");
                        default_models()
                    }
                };
                for model in models {
                    let marker = if model == session.model { "*" } else { " " };
                    println!("{marker} {model}");
                }
                println!();
            }
            Command::System(None) => {
                println!("System prompt: {}\n", session.system_prompt);
            }
            Command::System(Some(system_prompt)) => {
                session.system_prompt = system_prompt;
                print_settings(&session);
            }
            Command::History => {
                if session.history().is_empty() {
                    println!("{}\n", export::NO_MESSAGES);
                }
                for message in session.history() {
                    println!("{}\n{}\n", message.role.title().bold(), message.content);
                }
            }
        }
    }

    Ok(())
}

/// Next line of input, or `None` at end of input or once `interrupt` resolves.
///
/// While the runtime listens for Ctrl-C the default SIGINT handler is off, so
/// the prompt treats `interrupt` as the end of input.
pub async fn next_input<R, F>(lines: &mut Lines<R>, interrupt: F) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
    F: Future,
{
    tokio::select! {
        line = lines.next_line() => Ok(line?),
        _ = interrupt => {
            log::info!("interrupted at the prompt");
            Ok(None)
        }
    }
}

fn default_models() -> Vec<String> {
    DEFAULT_MODELS.iter().map(|model| model.to_string()).collect()
}

fn print_settings(session: &Session) {
    println!("Model: {}", session.model.as_str().bold());
    if session.has_custom_system_prompt() {
        println!("Active system prompt: {}", session.system_prompt.as_str().italic());
    }
    println!();
}
