use futures::stream::{StreamExt, TryStreamExt};

use crate::error::Error;
use crate::message::ChatRequest;
use crate::requests::{ChunkStream, Upstream};

/// Validates `request`, starts the upstream call and hands back its fragments.
///
/// The call fails with `Error::InvalidRequest` before touching the upstream
/// when the request has no model or no messages, and with
/// `Error::UpstreamUnavailable` when the upstream fails before producing any
/// text. Once text is flowing, a failure is yielded once as
/// `Error::StreamInterrupted` and the stream ends.
///
/// Nothing is buffered: fragments are pulled from the upstream only as the
/// returned stream is polled. Dropping the stream closes the upstream
/// connection.
///
/// # Errors
///
/// See above.
pub async fn open(upstream: &dyn Upstream, request: &ChatRequest) -> Result<ChunkStream, Error> {
    request.validate()?;

    log::info!(
        "relaying {} messages to model `{}`",
        request.messages.len(),
        request.model
    );

    let mut stream = upstream.chat_stream(request).await.map_err(unavailable)?;

    let first = loop {
        match stream.next().await {
            None => {
                log::info!("upstream finished without output");
                return Ok(futures::stream::empty().boxed());
            }
            Some(Err(e)) => {
                log::error!("upstream failed before producing output: {e}");
                return Err(unavailable(e));
            }
            Some(Ok(text)) if text.is_empty() => continue,
            Some(Ok(text)) => break text,
        }
    };

    let rest = stream
        .map_err(interrupted)
        .try_filter(|text| futures::future::ready(!text.is_empty()))
        .scan(false, |failed, item| {
            if *failed {
                return futures::future::ready(None);
            }
            if let Err(e) = &item {
                log::warn!("upstream stream broke: {e}");
                *failed = true;
            }
            futures::future::ready(Some(item))
        });

    Ok(futures::stream::once(futures::future::ready(Ok(first)))
        .chain(rest)
        .boxed())
}

fn unavailable(e: Error) -> Error {
    match e {
        Error::InvalidRequest(_) | Error::UpstreamUnavailable(_) => e,
        other => Error::UpstreamUnavailable(other.to_string()),
    }
}

fn interrupted(e: Error) -> Error {
    match e {
        Error::StreamInterrupted(_) => e,
        other => Error::StreamInterrupted(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::message::Message;

    /// Upstream that replays a scripted response once.
    struct Scripted {
        calls: AtomicUsize,
        response: Mutex<Option<Result<Vec<Result<String, Error>>, Error>>>,
    }

    impl Scripted {
        fn new(response: Result<Vec<Result<String, Error>>, Error>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                response: Mutex::new(Some(response)),
            }
        }

        fn fragments(texts: &[&str]) -> Self {
            Self::new(Ok(texts.iter().map(|t| Ok(t.to_string())).collect()))
        }
    }

    #[async_trait]
    impl Upstream for Scripted {
        async fn chat_stream(&self, _request: &ChatRequest) -> Result<ChunkStream, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let response = self
                .response
                .lock()
                .unwrap()
                .take()
                .expect("scripted upstream called twice");
            response.map(|items| futures::stream::iter(items).boxed())
        }

        async fn list_models(&self) -> Result<Vec<String>, Error> {
            Ok(vec![])
        }
    }

    fn request() -> ChatRequest {
        ChatRequest::new("llama3.1", vec![Message::user("hello")])
    }

    #[tokio::test]
    async fn streams_fragments_in_order() {
        let upstream = Scripted::fragments(&["Hel", "", "lo", " world"]);

        let texts: Vec<String> = open(&upstream, &request())
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(texts, vec!["Hel", "lo", " world"]);
    }

    #[tokio::test]
    async fn empty_model_never_reaches_upstream() {
        let upstream = Scripted::fragments(&["unused"]);
        let request = ChatRequest::new("", vec![Message::user("hello")]);

        let result = open(&upstream, &request).await;

        assert!(matches!(result, Err(Error::InvalidRequest(_))));
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_messages_never_reach_upstream() {
        let upstream = Scripted::fragments(&["unused"]);
        let request = ChatRequest::new("llama3.1", vec![]);

        let result = open(&upstream, &request).await;

        assert!(matches!(result, Err(Error::InvalidRequest(_))));
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn connection_failure_is_upstream_unavailable() {
        let upstream = Scripted::new(Err(Error::IO(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        ))));

        let result = open(&upstream, &request()).await;

        assert!(matches!(result, Err(Error::UpstreamUnavailable(_))));
    }

    #[tokio::test]
    async fn error_before_output_is_upstream_unavailable() {
        let upstream = Scripted::new(Ok(vec![
            Ok(String::new()),
            Err(Error::ApiError("model not loaded".into())),
        ]));

        let result = open(&upstream, &request()).await;

        assert!(matches!(
            result,
            Err(Error::UpstreamUnavailable(message)) if message.contains("model not loaded")
        ));
    }

    #[tokio::test]
    async fn error_after_output_interrupts_and_ends_the_stream() {
        let upstream = Scripted::new(Ok(vec![
            Ok("partial".to_string()),
            Err(Error::ApiError("boom".into())),
            Ok("never".to_string()),
        ]));

        let items: Vec<_> = open(&upstream, &request()).await.unwrap().collect().await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "partial");
        assert!(matches!(items[1], Err(Error::StreamInterrupted(_))));
    }

    #[tokio::test]
    async fn empty_upstream_gives_empty_stream() {
        let upstream = Scripted::fragments(&[]);

        let texts: Vec<String> = open(&upstream, &request())
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        assert!(texts.is_empty());
    }
}
