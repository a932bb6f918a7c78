use chat_stream::{ChatRequest, Conversation, Message};

use crate::args::DEFAULT_SYSTEM_PROMPT;
use crate::client::RelayClient;
use crate::prelude::*;
use crate::render::Renderer;
use crate::turn;

/// The conversation and the settings used for the next turn.
#[derive(Debug, Clone)]
pub struct Session {
    pub model: String,
    pub system_prompt: String,
    history: Conversation,
}

impl Session {
    pub fn new(model: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_prompt: system_prompt.into(),
            history: Conversation::new(),
        }
    }

    pub fn history(&self) -> &Conversation {
        &self.history
    }

    /// Whether the system prompt differs from the stock one.
    pub fn has_custom_system_prompt(&self) -> bool {
        self.system_prompt.trim() != DEFAULT_SYSTEM_PROMPT
    }

    /// Empties the conversation. Model and system prompt are kept.
    pub fn clear(&mut self) {
        log::info!("clearing {} messages", self.history.len());
        self.history.clear();
    }

    /// The request sent for `prompt`: system prompt, history, then the prompt.
    pub fn request_for(&self, prompt: &Message) -> ChatRequest {
        ChatRequest::for_turn(
            &self.model,
            &self.system_prompt,
            self.history.iter().chain(std::iter::once(prompt)),
        )
    }

    /// Runs one turn.
    ///
    /// The prompt and the answer are appended to the history together, and
    /// only when the answer streamed to completion. A failed or cancelled turn
    /// leaves the history as it was.
    pub async fn send(
        &mut self,
        client: &RelayClient,
        prompt: &str,
        renderer: &mut dyn Renderer,
    ) -> Result<()> {
        let prompt = Message::user(prompt.trim());
        let request = self.request_for(&prompt);

        renderer.typing()?;

        let bytes = match client.query_stream(&request).await {
            Ok(bytes) => bytes,
            Err(e) => {
                log::error!("turn failed before streaming: {e}");
                renderer.draw_error(&e.to_string())?;
                renderer.finish()?;
                return Err(e);
            }
        };

        let answer = turn::run(bytes, renderer).await?;

        self.history.push(prompt);
        self.history.push(answer);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chat_stream::Role;

    use super::*;

    #[test]
    fn request_puts_the_system_prompt_first() {
        let mut session = Session::new("llama3.1", "  Be brief.  ");
        session.history.push(Message::user("hi"));
        session.history.push(Message::assistant("hello"));

        let request = session.request_for(&Message::user("again"));

        assert_eq!(request.model, "llama3.1");
        let roles: Vec<Role> = request.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::User]
        );
        assert_eq!(request.messages[0].content, "Be brief.");
        assert_eq!(request.messages[3].content, "again");
    }

    #[test]
    fn blank_system_prompt_is_left_out() {
        let session = Session::new("llama3.1", "   ");

        let request = session.request_for(&Message::user("hi"));

        assert_eq!(request.messages, vec![Message::user("hi")]);
    }

    #[test]
    fn clear_keeps_the_settings() {
        let mut session = Session::new("deepseek-r1", "Talk like a pirate.");
        session.history.push(Message::user("hi"));

        session.clear();

        assert!(session.history().is_empty());
        assert_eq!(session.model, "deepseek-r1");
        assert!(session.has_custom_system_prompt());
    }

    #[test]
    fn stock_system_prompt_is_not_custom() {
        let session = Session::new("llama3.1", DEFAULT_SYSTEM_PROMPT);

        assert!(!session.has_custom_system_prompt());
    }
}
