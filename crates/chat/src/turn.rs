use chat_stream::body::ByteStream;
use chat_stream::{Message, Segmenter, Utf8Decoder};
use futures::stream::StreamExt;

use crate::prelude::*;
use crate::render::{self, Renderer};

/// Drives one streamed answer through the decoder, the segmenter and the
/// renderer, and returns the message to keep in history.
///
/// # Errors
///
/// A broken stream is drawn as an error and returned. No message is
/// produced for it.
pub async fn run(mut bytes: ByteStream, renderer: &mut dyn Renderer) -> Result<Message> {
    let mut decoder = Utf8Decoder::new();
    let mut segmenter = Segmenter::new();

    while let Some(chunk) = bytes.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                log::error!("answer stream broke: {e}");
                renderer.draw_error(&e.to_string())?;
                renderer.finish()?;
                return Err(e.into());
            }
        };

        let update = segmenter.push(&decoder.decode(&chunk));
        render::redraw(&segmenter, update, renderer)?;
    }

    let mut update = segmenter.push(&decoder.finish());
    let flushed = segmenter.finish();
    update.thinking |= flushed.thinking;
    update.answer |= flushed.answer;
    render::redraw(&segmenter, update, renderer)?;
    renderer.finish()?;

    log::debug!(
        "turn finished, thinking: {} bytes, answer: {} bytes",
        segmenter.thinking().len(),
        segmenter.answer().len()
    );

    Ok(segmenter.into_message())
}

#[cfg(test)]
mod tests {
    use std::io;

    use bytes::Bytes;

    use super::*;

    /// Records every draw call, with `<br>` line breaks.
    #[derive(Debug, Default)]
    struct Recorder {
        pub thinking: Vec<String>,
        pub answer: Vec<String>,
        pub errors: Vec<String>,
        pub finished: usize,
    }

    impl Renderer for Recorder {
        fn line_break(&self) -> &'static str {
            "<br>"
        }

        fn typing(&mut self) -> io::Result<()> {
            Ok(())
        }

        fn draw_thinking(&mut self, text: &str) -> io::Result<()> {
            self.thinking.push(text.to_string());
            Ok(())
        }

        fn draw_answer(&mut self, text: &str) -> io::Result<()> {
            self.answer.push(text.to_string());
            Ok(())
        }

        fn draw_error(&mut self, description: &str) -> io::Result<()> {
            self.errors.push(description.to_string());
            Ok(())
        }

        fn finish(&mut self) -> io::Result<()> {
            self.finished += 1;
            Ok(())
        }
    }

    fn ok(chunks: &[&[u8]]) -> ByteStream {
        let chunks: Vec<_> = chunks
            .iter()
            .map(|chunk| Ok::<_, chat_stream::Error>(Bytes::copy_from_slice(chunk)))
            .collect();
        futures::stream::iter(chunks).boxed()
    }

    #[tokio::test]
    async fn thinking_is_hidden_from_the_final_message() {
        let mut recorder = Recorder::default();
        let stream = ok(&[b"Hello <th", b"ink>ponder\ning</think>", b" final answer "]);

        let message = run(stream, &mut recorder).await.unwrap();

        assert_eq!(message.content, "Thinking hidden\n\nfinal answer");
        assert_eq!(recorder.thinking.last().unwrap(), "ponder<br>ing");
        assert_eq!(recorder.answer.first().unwrap(), "Hello ");
        assert_eq!(recorder.finished, 1);
        assert!(recorder.errors.is_empty());
    }

    #[tokio::test]
    async fn plain_answers_are_trimmed() {
        let mut recorder = Recorder::default();

        let message = run(ok(&[b"  just ", b"text\n"]), &mut recorder).await.unwrap();

        assert_eq!(message.content, "just text");
        assert!(recorder.thinking.is_empty());
    }

    #[tokio::test]
    async fn characters_split_across_chunks_are_kept_whole() {
        let mut recorder = Recorder::default();
        let snowman = "☃".as_bytes();
        let (head, tail) = snowman.split_at(1);

        let message = run(ok(&[head, tail]), &mut recorder).await.unwrap();

        assert_eq!(message.content, "☃");
        assert!(recorder.answer.iter().all(|text| !text.contains('\u{FFFD}')));
    }

    #[tokio::test]
    async fn a_broken_stream_draws_an_error_and_yields_no_message() {
        let mut recorder = Recorder::default();
        let stream = futures::stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(chat_stream::Error::StreamInterrupted("connection reset".into())),
        ])
        .boxed();

        let result = run(stream, &mut recorder).await;

        assert!(matches!(
            result,
            Err(Error::ChatStream(chat_stream::Error::StreamInterrupted(_)))
        ));
        assert_eq!(recorder.errors.len(), 1);
        assert!(recorder.errors[0].contains("connection reset"));
        assert_eq!(recorder.finished, 1);
    }
}
