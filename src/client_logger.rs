//! Logging trait for client operations.
//!
//! This module provides the [`ClientLogger`] trait that allows users to capture
//! every request and response passing through the [`OpenAi`](crate::OpenAi)
//! client.  Payloads are handed over as the raw bytes that went over the wire,
//! so one logger serves every endpoint.

use crate::Error;

/// A trait for logging client operations.
///
/// # Example
///
/// ```rust
/// use std::sync::Mutex;
///
/// use chatter::{ClientLogger, Error};
///
/// #[derive(Default)]
/// struct MemoryLogger {
///     lines: Mutex<Vec<String>>,
/// }
///
/// impl ClientLogger for MemoryLogger {
///     fn log_response(&self, url: &str, status: u16, body: &[u8]) {
///         let line = format!("{url} {status} {}", String::from_utf8_lossy(body));
///         self.lines.lock().unwrap().push(line);
///     }
///
///     fn log_stream_frame(&self, url: &str, payload: &[u8]) {
///         let line = format!("{url} frame {}", String::from_utf8_lossy(payload));
///         self.lines.lock().unwrap().push(line);
///     }
///
///     fn log_error(&self, url: &str, error: &Error) {
///         self.lines.lock().unwrap().push(format!("{url} error {error}"));
///     }
/// }
/// ```
pub trait ClientLogger: Send + Sync {
    /// Log the serialized body of an outgoing request.
    fn log_request(&self, url: &str, body: &[u8]) {
        _ = url;
        _ = body;
    }

    /// Log a fully buffered response, successful or not.
    fn log_response(&self, url: &str, status: u16, body: &[u8]) {
        _ = url;
        _ = status;
        _ = body;
    }

    /// Log the payload of one `data:` frame of an event stream.
    ///
    /// This is called before the payload is decoded, so frames that turn out
    /// to be malformed are logged too.
    fn log_stream_frame(&self, url: &str, payload: &[u8]) {
        _ = url;
        _ = payload;
    }

    /// Log a failed request or stream.
    fn log_error(&self, url: &str, error: &Error) {
        _ = url;
        _ = error;
    }
}
