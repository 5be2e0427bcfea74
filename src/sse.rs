//! Server-Sent Events (SSE) decoding for streaming responses.
//!
//! The API frames every event as a single `data: <json>` line and ends the
//! stream with `data: [DONE]`.  Anything else on the wire (blank keep-alive
//! lines, `:` comments, `event:` lines) is skipped.

use serde::de::DeserializeOwned;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::observability::{STREAM_BYTES, STREAM_EVENTS};

/// Prefix of every line that carries an event payload.
pub const DATA_PREFIX: &[u8] = b"data: ";

/// Payload that marks the end of the stream.
pub const DONE_SENTINEL: &[u8] = b"[DONE]";

/// Longest line, terminator included, the decoder buffers before giving up.
pub const MAX_LINE_BYTES: usize = 1 << 20;

/// Classification of one line of an event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame<'a> {
    /// Not a data line; skip it.
    Ignored,
    /// The terminal sentinel.
    Done,
    /// The JSON payload of one event.
    Data(&'a [u8]),
}

/// Classify one raw line (terminator included or not).
pub fn classify_line(line: &[u8]) -> Frame<'_> {
    let Some(payload) = line.trim_ascii().strip_prefix(DATA_PREFIX) else {
        return Frame::Ignored;
    };
    if payload.starts_with(DONE_SENTINEL) {
        Frame::Done
    } else {
        Frame::Data(payload)
    }
}

pub(crate) fn cancelled() -> Error {
    Error::abort("request cancelled")
}

/// Decode an event stream from `reader`, publishing every event on `out`.
///
/// Returns `Ok(())` only when the `[DONE]` sentinel is seen.  End of input
/// before the sentinel, a read failure, a frame that is not valid JSON for
/// `T`, cancellation, and a dropped receiver all end the loop with an error;
/// nothing is resynchronized.  `inspect` sees every data payload before it is
/// decoded.
///
/// `out` should be a small channel: each send waits for room, so the decoder
/// reads no further ahead than the consumer allows.  Lines longer than
/// [`MAX_LINE_BYTES`] fail with [`Error::InvalidStreamFrame`].
pub async fn decode_stream<R, T, F>(
    reader: R,
    out: &mpsc::Sender<T>,
    cancel: &CancellationToken,
    inspect: F,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    T: DeserializeOwned,
    F: FnMut(&[u8]),
{
    decode_stream_with_limit(reader, out, cancel, MAX_LINE_BYTES, inspect).await
}

/// [`decode_stream`] with a caller-chosen line length limit.
pub async fn decode_stream_with_limit<R, T, F>(
    mut reader: R,
    out: &mpsc::Sender<T>,
    cancel: &CancellationToken,
    max_line_bytes: usize,
    mut inspect: F,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    T: DeserializeOwned,
    F: FnMut(&[u8]),
{
    let mut line = Vec::new();
    loop {
        line.clear();
        let mut limited = (&mut reader).take(max_line_bytes as u64 + 1);
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled()),
            read = limited.read_until(b'\n', &mut line) => read,
        };
        let read = read.map_err(|e| {
            Error::transport(
                format!("failed to read the event stream: {e}"),
                Some(Box::new(e)),
            )
        })?;
        STREAM_BYTES.count(read as u64);
        if line.len() > max_line_bytes {
            let preview = String::from_utf8_lossy(&line[..line.len().min(64)]);
            return Err(Error::invalid_stream_frame(
                format!("line exceeds {max_line_bytes} bytes"),
                preview,
                None,
            ));
        }
        if line.last() != Some(&b'\n') {
            return Err(Error::transport("stream closed before [DONE]", None));
        }

        let payload = match classify_line(&line) {
            Frame::Ignored => continue,
            Frame::Done => return Ok(()),
            Frame::Data(payload) => payload,
        };
        inspect(payload);
        let event: T = serde_json::from_slice(payload).map_err(|e| {
            Error::invalid_stream_frame(
                e.to_string(),
                String::from_utf8_lossy(payload),
                Some(Box::new(e)),
            )
        })?;
        STREAM_EVENTS.click();

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled()),
            sent = out.send(event) => {
                if sent.is_err() {
                    return Err(Error::abort("event receiver dropped"));
                }
            }
        }
    }
}
