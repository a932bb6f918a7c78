use std::fmt::Display;
use std::time::Duration;

use bytes::Bytes;
use futures::stream::{BoxStream, Stream, StreamExt};

use crate::error::Error;

/// Raw HTTP body chunks.
pub type ByteStream = BoxStream<'static, Result<Bytes, Error>>;

/// Default time to wait for the next body chunk before giving up on a stream.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(300);

/// Wraps a body stream so that each read waits at most `timeout`.
///
/// A stalled read or a transport error is reported once as
/// `Error::StreamInterrupted` and ends the stream. Dropping the returned
/// stream drops `stream`, which releases its connection.
pub fn with_read_timeout<S, E>(stream: S, timeout: Duration) -> ByteStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + 'static,
{
    futures::stream::unfold(Some(stream.boxed()), move |state| async move {
        let mut stream = state?;

        match tokio::time::timeout(timeout, stream.next()).await {
            Err(_) => {
                log::warn!("no data received for {timeout:?}, closing stream");
                Some((
                    Err(Error::StreamInterrupted(format!(
                        "no data received for {} seconds",
                        timeout.as_secs()
                    ))),
                    None,
                ))
            }
            Ok(None) => None,
            Ok(Some(Ok(chunk))) => Some((Ok(chunk), Some(stream))),
            Ok(Some(Err(e))) => {
                log::error!("error reading stream: {e}");
                Some((Err(Error::StreamInterrupted(e.to_string())), None))
            }
        }
    })
    .boxed()
}
