//! Logging trait for completion client operations.
//!
//! This module provides the [`ClientLogger`] trait that allows users to capture
//! and log all API interactions passing through the [`OpenRouter`](crate::OpenRouter) client.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use crate::Error;
use crate::types::ChatCompletionRequest;

/// A trait for logging completion client operations.
///
/// Implement this trait to capture and record all API interactions, including
/// the outgoing request body and each streamed fragment.
///
/// [`FileLogger`] appends every interaction to a file.  Other sinks implement
/// the trait directly:
///
/// ```
/// use std::sync::Arc;
/// use multichat::{ChatCompletionRequest, ClientLogger, Error, OpenRouter};
///
/// struct StderrLogger;
///
/// impl ClientLogger for StderrLogger {
///     fn log_request(&self, request: &ChatCompletionRequest) {
///         eprintln!("request for {}", request.model);
///     }
///
///     fn log_fragment(&self, fragment: &str) {
///         eprintln!("fragment: {fragment:?}");
///     }
///
///     fn log_error(&self, error: &Error) {
///         eprintln!("error: {error}");
///     }
/// }
///
/// # fn main() -> Result<(), Error> {
/// let client = OpenRouter::new()?.with_logger(Arc::new(StderrLogger));
/// # let _ = client;
/// # Ok(())
/// # }
/// ```
pub trait ClientLogger: Send + Sync {
    /// Log the body of an outgoing request.
    ///
    /// Called once per request, before it is sent.  Image data URIs are part
    /// of the body and may be large.
    fn log_request(&self, request: &ChatCompletionRequest);

    /// Log an individual streamed text fragment.
    fn log_fragment(&self, fragment: &str);

    /// Log a failure of the request or its stream.
    fn log_error(&self, error: &Error);
}

/// A [`ClientLogger`] that appends one line per interaction to a file.
///
/// Requests are written as their JSON body; fragments are written quoted so
/// embedded newlines stay on one line.
pub struct FileLogger {
    file: Mutex<File>,
}

impl FileLogger {
    /// Open `path` for appending, creating it if needed.
    pub fn append<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|err| Error::io(format!("failed to open log {}", path.display()), err))?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    fn write_line(&self, line: &str) {
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{line}");
        }
    }
}

impl ClientLogger for FileLogger {
    fn log_request(&self, request: &ChatCompletionRequest) {
        match serde_json::to_string(request) {
            Ok(body) => self.write_line(&format!("request: {body}")),
            Err(err) => self.write_line(&format!("request: <unserializable: {err}>")),
        }
    }

    fn log_fragment(&self, fragment: &str) {
        self.write_line(&format!("fragment: {fragment:?}"));
    }

    fn log_error(&self, error: &Error) {
        self.write_line(&format!("error: {error}"));
    }
}
