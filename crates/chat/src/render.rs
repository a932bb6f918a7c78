use std::borrow::Cow;
use std::io::{self, Write};

use chat_stream::{Segmenter, Update};
use crossterm::cursor::MoveToColumn;
use crossterm::queue;
use crossterm::style::{Print, Stylize};
use crossterm::terminal::{Clear, ClearType};

/// Live view of one turn.
///
/// The `draw_*` methods always receive the complete accumulated text of a
/// panel, never a diff. Drawing the text a panel already shows must not
/// change what is displayed.
pub trait Renderer {
    /// Line break representation used inside the thinking panel.
    fn line_break(&self) -> &'static str {
        "\n"
    }

    /// Shows that the assistant is about to answer.
    fn typing(&mut self) -> io::Result<()>;

    fn draw_thinking(&mut self, text: &str) -> io::Result<()>;

    fn draw_answer(&mut self, text: &str) -> io::Result<()>;

    /// Replaces the answer with an error indicator.
    fn draw_error(&mut self, description: &str) -> io::Result<()>;

    /// Closes the turn; the next draw starts a new one.
    fn finish(&mut self) -> io::Result<()>;
}

/// Converts `\n` to `line_break`.
pub fn with_line_breaks<'a>(text: &'a str, line_break: &str) -> Cow<'a, str> {
    if line_break == "\n" || !text.contains('\n') {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.replace('\n', line_break))
    }
}

/// Redraws the panels named by `update` from the segmenter's buffers.
pub fn redraw(
    segmenter: &Segmenter,
    update: Update,
    renderer: &mut dyn Renderer,
) -> io::Result<()> {
    if update.thinking {
        let text = with_line_breaks(segmenter.thinking(), renderer.line_break());
        renderer.draw_thinking(&text)?;
    }

    if update.answer {
        renderer.draw_answer(&segmenter.visible_answer())?;
    }

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Panel {
    Thinking,
    Answer,
}

/// Renders a turn to a terminal, appending to the panel that is being
/// extended and starting a new section when the stream switches panels.
pub struct Terminal<W: Write> {
    out: W,
    thinking: String,
    answer: String,
    current: Option<Panel>,
    typing: bool,
}

impl<W: Write> Terminal<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            thinking: String::new(),
            answer: String::new(),
            current: None,
            typing: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn clear_typing(&mut self) -> io::Result<()> {
        if self.typing {
            queue!(self.out, MoveToColumn(0), Clear(ClearType::CurrentLine))?;
            self.typing = false;
        }
        Ok(())
    }

    fn header(&mut self, panel: Panel) -> io::Result<()> {
        if self.current.is_some() {
            queue!(self.out, Print("\n\n"))?;
        }
        match panel {
            Panel::Thinking => queue!(self.out, Print("🤔 Thinking:".dim()), Print("\n"))?,
            Panel::Answer => queue!(self.out, Print("Assistant:".bold()), Print("\n"))?,
        }
        self.current = Some(panel);
        Ok(())
    }

    fn draw(&mut self, panel: Panel, text: &str) -> io::Result<()> {
        let last = match panel {
            Panel::Thinking => &self.thinking,
            Panel::Answer => &self.answer,
        };
        if last == text {
            return Ok(());
        }

        let extends = text.starts_with(last.as_str());
        let shown = if extends { last.len() } else { 0 };

        self.clear_typing()?;
        if !extends || self.current != Some(panel) {
            self.header(panel)?;
        }

        let rest = &text[shown..];
        match panel {
            Panel::Thinking => queue!(self.out, Print(rest.dim()))?,
            Panel::Answer => queue!(self.out, Print(rest))?,
        }
        self.out.flush()?;

        match panel {
            Panel::Thinking => self.thinking = text.to_string(),
            Panel::Answer => self.answer = text.to_string(),
        }
        Ok(())
    }
}

impl<W: Write> Renderer for Terminal<W> {
    fn typing(&mut self) -> io::Result<()> {
        queue!(self.out, Print("💬 Assistant is typing...".dim().italic()))?;
        self.typing = true;
        self.out.flush()
    }

    fn draw_thinking(&mut self, text: &str) -> io::Result<()> {
        self.draw(Panel::Thinking, text)
    }

    fn draw_answer(&mut self, text: &str) -> io::Result<()> {
        self.draw(Panel::Answer, text)
    }

    fn draw_error(&mut self, description: &str) -> io::Result<()> {
        self.clear_typing()?;
        if self.current.is_some() {
            queue!(self.out, Print("\n\n"))?;
        }
        queue!(self.out, Print(format!("❌ Error: {description}").red()))?;
        self.current = Some(Panel::Answer);
        self.out.flush()
    }

    fn finish(&mut self) -> io::Result<()> {
        self.clear_typing()?;
        if self.current.is_some() {
            queue!(self.out, Print("\n"))?;
        }
        self.thinking.clear();
        self.answer.clear();
        self.current = None;
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(terminal: Terminal<Vec<u8>>) -> String {
        String::from_utf8(terminal.into_inner()).unwrap()
    }

    #[test]
    fn redrawing_the_same_text_is_a_no_op() {
        let mut terminal = Terminal::new(Vec::new());
        terminal.draw_answer("Hello").unwrap();
        let before = terminal.out.len();

        terminal.draw_answer("Hello").unwrap();

        assert_eq!(terminal.out.len(), before);
    }

    #[test]
    fn extending_a_panel_prints_only_the_new_text() {
        let mut terminal = Terminal::new(Vec::new());
        terminal.draw_answer("Hel").unwrap();
        terminal.draw_answer("Hello").unwrap();
        terminal.draw_answer("Hello world").unwrap();

        let text = output(terminal);
        assert_eq!(text.matches("Assistant:").count(), 1);
        assert!(text.contains("Hel"));
        assert!(text.contains("lo"));
        assert!(text.contains(" world"));
        assert_eq!(text.matches("Hel").count(), 1);
    }

    #[test]
    fn switching_panels_starts_new_sections() {
        let mut terminal = Terminal::new(Vec::new());
        terminal.draw_thinking("pondering").unwrap();
        terminal.draw_answer("42").unwrap();
        terminal.finish().unwrap();

        let text = output(terminal);
        let thinking = text.find("Thinking:").unwrap();
        let answer = text.find("Assistant:").unwrap();
        assert!(thinking < answer);
        assert!(text.contains("pondering"));
        assert!(text.contains("42"));
    }

    #[test]
    fn error_indicator_carries_the_description() {
        let mut terminal = Terminal::new(Vec::new());
        terminal.typing().unwrap();
        terminal.draw_error("upstream unavailable: refused").unwrap();

        assert!(output(terminal).contains("Error: upstream unavailable: refused"));
    }

    #[test]
    fn finish_resets_the_panels() {
        let mut terminal = Terminal::new(Vec::new());
        terminal.draw_answer("first").unwrap();
        terminal.finish().unwrap();
        terminal.draw_answer("first").unwrap();

        assert_eq!(output(terminal).matches("first").count(), 2);
    }

    #[test]
    fn line_breaks_are_converted_for_the_thinking_panel() {
        assert_eq!(with_line_breaks("a\nb", "<br>"), "a<br>b");
        assert!(matches!(with_line_breaks("a\nb", "\n"), Cow::Borrowed(_)));
    }
}
