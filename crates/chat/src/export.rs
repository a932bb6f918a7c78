use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chat_stream::{Conversation, Message};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::prelude::*;

/// Body exported for a conversation without messages.
pub const NO_MESSAGES: &str = "No messages yet.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Format {
    #[default]
    Txt,
    Markdown,
    Json,
}

impl Format {
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Txt => "txt",
            Format::Markdown => "md",
            Format::Json => "json",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            Format::Txt => "text/plain",
            Format::Markdown => "text/markdown",
            Format::Json => "application/json",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "txt" | "text" => Ok(Format::Txt),
            "md" | "markdown" => Ok(Format::Markdown),
            "json" => Ok(Format::Json),
            _ => Err(Error::InvalidFormat(s.to_string())),
        }
    }
}

/// JSON export document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub model: String,
    pub system_prompt: String,
    pub messages: Vec<Message>,
}

/// A rendered export, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    pub file_name: String,
    pub mime: &'static str,
    pub body: String,
}

impl Export {
    /// Writes the export into `dir`, creating it when missing.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.body)?;

        log::info!("exported {} bytes to {}", self.body.len(), path.display());
        Ok(path)
    }
}

/// Renders `history` in `format`.
///
/// An empty conversation always exports as plain text.
pub fn export(
    history: &Conversation,
    model: &str,
    system_prompt: &str,
    format: Format,
    now: DateTime<Local>,
) -> Result<Export> {
    let (format, body) = if history.is_empty() {
        (Format::Txt, NO_MESSAGES.to_string())
    } else {
        (format, render(history, model, system_prompt, format)?)
    };

    Ok(Export {
        file_name: file_name(model, format, &now),
        mime: format.mime(),
        body,
    })
}

/// `chat_{model}_{YYYY-MM-DD_HH-MM}.{ext}`
pub fn file_name(model: &str, format: Format, now: &DateTime<Local>) -> String {
    let model = model.replace(['/', '\\'], "-");
    format!(
        "chat_{model}_{}.{}",
        now.format("%Y-%m-%d_%H-%M"),
        format.extension()
    )
}

fn render(
    history: &Conversation,
    model: &str,
    system_prompt: &str,
    format: Format,
) -> Result<String> {
    let system_prompt = system_prompt.trim();

    let body = match format {
        Format::Txt => {
            let system_prompt = if system_prompt.is_empty() {
                String::new()
            } else {
                format!("System Prompt:\n{system_prompt}\n\n")
            };
            let content = join(history, |m| format!("{}:\n{}", m.role.title(), m.content));

            format!("Model Used: {model}\n\n{system_prompt}\n{content}")
        }
        Format::Markdown => {
            let content = join(history, |m| format!("### {}\n{}", m.role.title(), m.content));

            format!("# Model Used: {model}\n\n## System Prompt\n{system_prompt}\n\n{content}")
        }
        Format::Json => serde_json::to_string_pretty(&Document {
            model: model.to_string(),
            system_prompt: system_prompt.to_string(),
            messages: history.messages().to_vec(),
        })?,
    };

    Ok(body)
}

fn join(history: &Conversation, entry: impl Fn(&Message) -> String) -> String {
    history.iter().map(entry).collect::<Vec<_>>().join("\n\n")
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap()
    }

    fn history() -> Conversation {
        Conversation::from(vec![
            Message::user("What is 2+2?"),
            Message::assistant("Thinking hidden\n\n4"),
        ])
    }

    #[test]
    fn txt_export() {
        let export = export(&history(), "deepseek-r1", " Be brief. ", Format::Txt, now()).unwrap();

        assert_eq!(
            export.body,
            "Model Used: deepseek-r1\n\nSystem Prompt:\nBe brief.\n\n\nUser:\nWhat is 2+2?\n\nAssistant:\nThinking hidden\n\n4"
        );
        assert_eq!(export.file_name, "chat_deepseek-r1_2025-03-14_09-26.txt");
        assert_eq!(export.mime, "text/plain");
    }

    #[test]
    fn txt_export_without_system_prompt() {
        let export = export(&history(), "llama3.1", "  ", Format::Txt, now()).unwrap();

        assert!(export
            .body
            .starts_with("Model Used: llama3.1\n\n\nUser:\nWhat is 2+2?"));
    }

    #[test]
    fn markdown_export() {
        let export = export(&history(), "llama3.1", "Be brief.", Format::Markdown, now()).unwrap();

        assert_eq!(
            export.body,
            "# Model Used: llama3.1\n\n## System Prompt\nBe brief.\n\n### User\nWhat is 2+2?\n\n### Assistant\nThinking hidden\n\n4"
        );
        assert_eq!(export.file_name, "chat_llama3.1_2025-03-14_09-26.md");
        assert_eq!(export.mime, "text/markdown");
    }

    #[test]
    fn json_export_reads_back() {
        let export = export(&history(), "llama3.1", " Be brief.\n", Format::Json, now()).unwrap();
        let document: Document = serde_json::from_str(&export.body).unwrap();

        assert_eq!(document.model, "llama3.1");
        assert_eq!(document.system_prompt, "Be brief.");
        assert_eq!(document.messages, history().messages());
        assert!(export.body.contains("\n  \"model\""));
        assert_eq!(export.mime, "application/json");
    }

    #[test]
    fn empty_conversation_is_plain_text() {
        let export = export(&Conversation::new(), "llama3.1", "", Format::Json, now()).unwrap();

        assert_eq!(export.body, NO_MESSAGES);
        assert_eq!(export.file_name, "chat_llama3.1_2025-03-14_09-26.txt");
        assert_eq!(export.mime, "text/plain");
    }

    #[test]
    fn model_names_are_safe_file_names() {
        assert_eq!(
            file_name("library/llama3.1", Format::Txt, &now()),
            "chat_library-llama3.1_2025-03-14_09-26.txt"
        );
    }

    #[test]
    fn formats_parse() {
        assert_eq!("MD".parse::<Format>().unwrap(), Format::Markdown);
        assert_eq!("text".parse::<Format>().unwrap(), Format::Txt);
        assert!(matches!("pdf".parse::<Format>(), Err(Error::InvalidFormat(_))));
    }

    #[test]
    fn writes_into_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let export = export(&history(), "llama3.1", "", Format::Txt, now()).unwrap();

        let path = export.write_to(&dir.path().join("exports")).unwrap();

        assert_eq!(std::fs::read_to_string(path).unwrap(), export.body);
    }
}
