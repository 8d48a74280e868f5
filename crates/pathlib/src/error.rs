use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use tracing_error::{SpanTrace, SpanTraceStatus};

/* 📖 # Why a custom error type and not anyhow/eyre/thiserror?

Path operations mostly surface the backend's own `io::Error`. The error type only has to
carry that cause, the path it happened at, and a few context phrases, so it is kept
small and local instead of pulling in an error crate.
 */

/// Error variants that can occur in path operations.
#[derive(Debug)]
pub enum ErrorKind {
    /// A filesystem primitive failed; `source` is the backend's native error.
    FileError { path: PathBuf, source: io::Error },

    /// The backend accepted fewer bytes than were supplied.
    ShortWrite {
        path: PathBuf,
        written: usize,
        expected: usize,
    },

    /// Rename target belongs to another backend or filesystem instance.
    IncompatibleTarget { path: String, target: String },

    /// Catch-all for other errors with a message
    Message { message: String },
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::FileError { path, source } => {
                write!(f, "File error at {}: {}", path.display(), source)
            }
            ErrorKind::ShortWrite {
                path,
                written,
                expected,
            } => write!(
                f,
                "Short write to {}: wrote {} of {} bytes",
                path.display(),
                written,
                expected
            ),
            ErrorKind::IncompatibleTarget { path, target } => write!(
                f,
                "Cannot rename {} to {}: target is on a different filesystem",
                path, target
            ),
            ErrorKind::Message { message } => write!(f, "{}", message),
        }
    }
}

/* 📖 # Why separate ErrorKind and PathlibError?

ErrorKind holds the structural variant callers match on. PathlibError wraps it with the
context phrases attached during propagation, an optional cause and the span trace
captured where the error was created.
*/

/// Error returned by every fallible path operation.
pub struct PathlibError {
    kind: ErrorKind,
    context: Vec<String>,
    cause: Option<Box<PathlibError>>,
    span_trace: SpanTrace,
}

impl PathlibError {
    /// Creates a new error from an ErrorKind, capturing the current span trace.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: vec![],
            cause: None,
            span_trace: SpanTrace::capture(),
        }
    }

    /// Creates a `Message` error.
    pub fn message(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Message {
            message: message.into(),
        })
    }

    /// Creates a `FileError` for a failed primitive at `path`.
    pub fn file(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::new(ErrorKind::FileError {
            path: path.as_ref().to_path_buf(),
            source,
        })
    }

    /// Attaches context to an error.
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Attaches context using lazy evaluation.
    pub fn with_context<F>(mut self, f: F) -> Self
    where
        F: FnOnce() -> String,
    {
        self.context.push(f());
        self
    }

    /// Records the error that led to this one.
    pub fn caused_by(mut self, cause: PathlibError) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Returns a reference to the underlying ErrorKind.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Context phrases in the order they were attached.
    pub fn get_context(&self) -> &[String] {
        &self.context
    }

    /// The native error kind, if this error (or its cause) wraps an `io::Error`.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match &self.kind {
            ErrorKind::FileError { source, .. } => Some(source.kind()),
            _ => self.cause.as_ref().and_then(|cause| cause.io_kind()),
        }
    }

    /// Returns the innermost error in the chain.
    pub fn root_cause(&self) -> &(dyn StdError + 'static) {
        let mut current: &(dyn StdError + 'static) = self;
        while let Some(next) = current.source() {
            current = next;
        }
        current
    }

    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, indent: &str) -> fmt::Result {
        let entries = self.context.len() + usize::from(self.cause.is_some());
        for (i, ctx) in self.context.iter().enumerate() {
            let branch = if i + 1 == entries { "└─" } else { "├─" };
            writeln!(f, "{}{} {}", indent, branch, ctx)?;
        }
        if let Some(cause) = &self.cause {
            writeln!(f, "{}└─ cause: {}", indent, cause.kind)?;
            cause.fmt_tree(f, &format!("{}   ", indent))?;
        }
        Ok(())
    }
}

impl From<ErrorKind> for PathlibError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl StdError for PathlibError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.kind {
            ErrorKind::FileError { source, .. } => Some(source),
            _ => self
                .cause
                .as_deref()
                .map(|cause| cause as &(dyn StdError + 'static)),
        }
    }
}

impl fmt::Display for PathlibError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ctx in &self.context {
            write!(f, "{}: ", ctx)?;
        }
        write!(f, "{}", self.kind)
    }
}

impl fmt::Debug for PathlibError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.kind)?;
        self.fmt_tree(f, "")?;
        if self.span_trace.status() == SpanTraceStatus::CAPTURED {
            writeln!(f, "Trace: {}", self.span_trace)?;
        }
        Ok(())
    }
}

/// Standard result type for path operations.
pub type PathlibResult<T> = std::result::Result<T, Box<PathlibError>>;

/// Extension trait for attaching context to Results.
pub trait ResultExt<T> {
    /// Attaches context to an error, consuming and re-wrapping it.
    fn context(self, context: impl Into<String>) -> PathlibResult<T>;

    /// Attaches context using lazy evaluation.
    /// Context is only evaluated if the result is an error.
    fn with_context<F>(self, f: F) -> PathlibResult<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for PathlibResult<T> {
    fn context(self, context: impl Into<String>) -> PathlibResult<T> {
        self.map_err(|err| Box::new(err.context(context)))
    }

    fn with_context<F>(self, f: F) -> PathlibResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|err| Box::new(err.with_context(f)))
    }
}

/// Builds a boxed `Message` error from format arguments.
#[macro_export]
macro_rules! err {
    ($($arg:tt)*) => {
        Box::new($crate::PathlibError::message(format!($($arg)*)))
    };
}

/// Returns early with an `err!`.
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::err!($($arg)*))
    };
}
