//! Logging hook for Bedrock client operations.
//!
//! The [`Bedrock`](crate::Bedrock) client calls a [`ClientLogger`] for every
//! request it sends, every whole response it receives and every streamed
//! chunk.  [`StderrLogger`] is the implementation behind `--verbose`.

use std::io::Write;

use crate::{CompletionChunk, TextCompletion, TextCompletionParams};

/// A trait for logging Bedrock client operations.
///
/// # Example
///
/// ```rust,ignore
/// use bedrock_chat::{ClientLogger, CompletionChunk, TextCompletion, TextCompletionParams};
/// use std::sync::Mutex;
///
/// struct FileLogger {
///     file: Mutex<std::fs::File>,
/// }
///
/// impl ClientLogger for FileLogger {
///     fn log_request(&self, model: &str, params: &TextCompletionParams) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "{model}: {}", serde_json::to_string(params).unwrap()).unwrap();
///     }
///
///     fn log_response(&self, completion: &TextCompletion) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "{}", serde_json::to_string(completion).unwrap()).unwrap();
///     }
///
///     fn log_stream_chunk(&self, chunk: &CompletionChunk) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "{}", serde_json::to_string(chunk).unwrap()).unwrap();
///     }
/// }
/// ```
pub trait ClientLogger: Send + Sync {
    /// Log a request body before it is signed and sent.
    fn log_request(&self, model: &str, params: &TextCompletionParams);

    /// Log a complete response from a non-streaming invocation.
    fn log_response(&self, completion: &TextCompletion);

    /// Log one chunk of a streaming invocation, in arrival order.
    fn log_stream_chunk(&self, chunk: &CompletionChunk);
}

/// Writes one JSON line per operation to standard error.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrLogger;

impl StderrLogger {
    fn emit(&self, kind: &str, body: serde_json::Result<String>) {
        let body = body.unwrap_or_else(|err| format!("<unserializable: {err}>"));
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "[bedrock] {kind} {body}");
    }
}

impl ClientLogger for StderrLogger {
    fn log_request(&self, model: &str, params: &TextCompletionParams) {
        self.emit(&format!("request {model}"), serde_json::to_string(params));
    }

    fn log_response(&self, completion: &TextCompletion) {
        self.emit("response", serde_json::to_string(completion));
    }

    fn log_stream_chunk(&self, chunk: &CompletionChunk) {
        self.emit("chunk", serde_json::to_string(chunk));
    }
}
