//! Splits a streamed model response into "thinking" and "answer" text.
//!
//! Models such as `deepseek-r1` wrap their reasoning in `<think>` ... `</think>`.
//! The [`Segmenter`] consumes fragments of arbitrary size, so a marker may
//! arrive split across several fragments (`"<th"`, `"ink>"`). The text that
//! could still turn out to be the start of a marker is held back until the
//! next fragment decides it, and is released by [`Segmenter::finish`] if the
//! stream ends first. Several markers inside one fragment are handled in order.
//! A marker that does not end the current mode (`</think>` while answering,
//! `<think>` while thinking) is dropped without a transition.

use crate::message::Message;

/// Opens a thinking block.
pub const THINK_OPEN: &str = "<think>";
/// Closes a thinking block.
pub const THINK_CLOSE: &str = "</think>";
/// Stands in for the thinking text in the committed transcript.
pub const THINKING_HIDDEN: &str = "Thinking hidden";

/// Channel the next non-marker text belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Answer,
    Thinking,
}

/// Which panels need a redraw after a call to [`Segmenter::push`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Update {
    pub thinking: bool,
    pub answer: bool,
}

impl Update {
    pub fn is_empty(&self) -> bool {
        !self.thinking && !self.answer
    }
}

/// Per-turn segmenter state.
///
/// `preamble`, `answer`, `thinking` and `pending` always partition the
/// non-marker text received so far.
#[derive(Debug, Default)]
pub struct Segmenter {
    mode: Mode,
    thinking: String,
    // Answer text that came before the latest thinking block.
    preamble: String,
    answer: String,
    // Tail that may be the beginning of the next marker.
    pending: String,
    seen_thinking: bool,
}

impl Segmenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifies one fragment.
    pub fn push(&mut self, fragment: &str) -> Update {
        let mut update = Update::default();
        if fragment.is_empty() {
            return update;
        }

        self.pending.push_str(fragment);

        loop {
            match self.next_marker() {
                Some((index, marker)) => {
                    let before: String = self.pending.drain(..index).collect();
                    self.pending.drain(..marker.len());
                    self.append(&before, &mut update);

                    if marker == self.marker() {
                        self.toggle();
                    } else {
                        log::debug!("dropping stray {marker} in {:?} mode", self.mode);
                    }
                }
                None => {
                    let keep = partial_marker_len(&self.pending, THINK_OPEN)
                        .max(partial_marker_len(&self.pending, THINK_CLOSE));
                    let split = self.pending.len() - keep;
                    let ready: String = self.pending.drain(..split).collect();
                    self.append(&ready, &mut update);
                    return update;
                }
            }
        }
    }

    /// Releases the held-back tail once the stream has ended.
    pub fn finish(&mut self) -> Update {
        let mut update = Update::default();
        let rest = std::mem::take(&mut self.pending);
        self.append(&rest, &mut update);
        update
    }

    /// Folds the turn into the assistant message that goes into history.
    ///
    /// The thinking text is dropped; only the answer that follows the last
    /// thinking block is kept.
    pub fn into_message(mut self) -> Message {
        self.finish();

        let answer = self.answer.trim();
        if self.seen_thinking {
            Message::assistant(format!("{THINKING_HIDDEN}\n\n{answer}"))
        } else {
            Message::assistant(answer)
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn seen_thinking(&self) -> bool {
        self.seen_thinking
    }

    /// Accumulated thinking text.
    pub fn thinking(&self) -> &str {
        &self.thinking
    }

    /// Answer text after the latest thinking block.
    pub fn answer(&self) -> &str {
        &self.answer
    }

    /// All answer text shown so far, including what preceded a thinking block.
    pub fn visible_answer(&self) -> String {
        format!("{}{}", self.preamble, self.answer)
    }

    /// Earliest marker of either kind in the pending text.
    fn next_marker(&self) -> Option<(usize, &'static str)> {
        [THINK_OPEN, THINK_CLOSE]
            .into_iter()
            .filter_map(|marker| self.pending.find(marker).map(|index| (index, marker)))
            .min_by_key(|(index, _)| *index)
    }

    /// Marker that ends the current mode.
    fn marker(&self) -> &'static str {
        match self.mode {
            Mode::Answer => THINK_OPEN,
            Mode::Thinking => THINK_CLOSE,
        }
    }

    fn toggle(&mut self) {
        match self.mode {
            Mode::Answer => {
                self.seen_thinking = true;
                let answer = std::mem::take(&mut self.answer);
                self.preamble.push_str(&answer);
                self.mode = Mode::Thinking;
            }
            Mode::Thinking => self.mode = Mode::Answer,
        }
    }

    fn append(&mut self, text: &str, update: &mut Update) {
        if text.is_empty() {
            return;
        }

        match self.mode {
            Mode::Answer => {
                self.answer.push_str(text);
                update.answer = true;
            }
            Mode::Thinking => {
                self.thinking.push_str(text);
                update.thinking = true;
            }
        }
    }
}

/// Length of the longest proper prefix of `marker` that `text` ends with.
fn partial_marker_len(text: &str, marker: &str) -> usize {
    (1..marker.len())
        .rev()
        .find(|len| text.ends_with(&marker[..*len]))
        .unwrap_or(0)
}
