use std::path::PathBuf;
use std::str::FromStr;

use crate::export::Format;
use crate::prelude::*;

pub const HELP: &str = "\
Type a message and press enter to send it.

Commands:
  /clear                        Start a new conversation
  /export [txt|md|json] [dir]   Save the conversation to a file
  /model [name]                 Show or change the model
  /models                       List the models the relay can serve
  /system [text]                Show or change the system prompt
  /history                      Print the conversation
  /help                         Show this message
  /quit                         Exit (Ctrl-D works too)

Ctrl-C cancels the answer being streamed, or exits at the prompt.";

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Prompt(String),
    Clear,
    Export {
        format: Format,
        dir: Option<PathBuf>,
    },
    Model(Option<String>),
    Models,
    System(Option<String>),
    History,
    Help,
    Quit,
    Empty,
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();

        if line.is_empty() {
            return Ok(Command::Empty);
        }

        let Some(command) = line.strip_prefix('/') else {
            return Ok(Command::Prompt(line.to_string()));
        };

        let (name, rest) = match command.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (command, ""),
        };
        let argument = (!rest.is_empty()).then(|| rest.to_string());

        match name {
            "clear" => Ok(Command::Clear),
            "export" => {
                let mut words = rest.split_whitespace();
                let format = match words.next() {
                    Some(format) => format.parse()?,
                    None => Format::default(),
                };
                let dir = words.next().map(PathBuf::from);
                Ok(Command::Export { format, dir })
            }
            "model" => Ok(Command::Model(argument)),
            "models" => Ok(Command::Models),
            "system" => Ok(Command::System(argument)),
            "history" => Ok(Command::History),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            other => Err(Error::UnknownCommand(other.to_string())),
        }
    }
}
