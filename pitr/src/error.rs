//! Error types and result definitions for the merge engine.
//!
//! Provides a classified error system with captured diagnostic metadata.
//! [`PitrError`] supports single errors, errors with additional detail, and
//! multiple aggregated errors (for example when several map workers fail).

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::error;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Convenient result type for merge engine operations.
pub type PitrResult<T> = Result<T, PitrError>;

/// Detailed payload stored for single [`PitrError`] instances.
#[derive(Debug, Clone)]
struct ErrorPayload {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
    backtrace: Arc<Backtrace>,
}

/// Main error type for merge engine operations.
#[derive(Debug, Clone)]
pub struct PitrError {
    repr: ErrorRepr,
}

/// Internal representation of error data.
#[derive(Debug, Clone)]
enum ErrorRepr {
    /// Single error payload holding rich metadata.
    Single(ErrorPayload),
    /// Multiple aggregated errors, mainly from concurrent map workers.
    Many {
        errors: Vec<PitrError>,
        location: &'static Location<'static>,
    },
}

/// Categories of errors that can occur during a recovery run.
///
/// Fatal kinds abort the pipeline; the non-fatal conditions of the merge
/// (orphan commits, unresolved prepares) are counted in the run summary and
/// never surface as errors.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// No binlog file overlaps the requested window; there is nothing to
    /// recover.
    NoInputFiles,
    /// A binlog record could not be decoded. Fatal: skipping records would
    /// silently produce an incomplete merge.
    DecodeError,
    /// The input violated the two-phase-commit protocol, e.g. two prepare
    /// records for the same start timestamp.
    ProtocolViolation,
    /// Reading or writing a temporary segment failed. Fatal: a missing or
    /// partial segment would corrupt the merge order.
    SegmentIo,
    /// A DDL statement could not be applied to the schema state. Fatal:
    /// downstream interpretation of row data would be wrong.
    DdlApply,
    /// The downstream sink reported a failure.
    SinkError,
    /// The pipeline was driven into an unexpected state, including
    /// cancellation of an in-flight run.
    InvalidState,
    /// Invalid engine configuration.
    ConfigError,
    /// Generic I/O failure outside segment handling.
    IoError,
    /// Serialization of an in-memory value failed.
    SerializationError,
    /// Deserialization of persisted data failed.
    DeserializationError,
    /// Unknown or uncategorized failure.
    Unknown,
}

impl PitrError {
    /// Returns the [`ErrorKind`] of this error.
    ///
    /// For aggregated errors, returns the kind of the first error or
    /// [`ErrorKind::Unknown`] if the aggregation is empty.
    pub fn kind(&self) -> ErrorKind {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.kind,
            ErrorRepr::Many { ref errors, .. } => errors
                .first()
                .map(|err| err.kind())
                .unwrap_or(ErrorKind::Unknown),
        }
    }

    /// Returns all [`ErrorKind`]s present in this error.
    pub fn kinds(&self) -> Vec<ErrorKind> {
        match self.repr {
            ErrorRepr::Single(ref payload) => vec![payload.kind],
            ErrorRepr::Many { ref errors, .. } => {
                errors.iter().flat_map(|err| err.kinds()).collect()
            }
        }
    }

    /// Returns the detailed error information if available.
    pub fn detail(&self) -> Option<&str> {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.detail.as_deref(),
            ErrorRepr::Many { ref errors, .. } => errors.iter().find_map(|e| e.detail()),
        }
    }

    /// Returns the captured backtrace for this error.
    pub fn backtrace(&self) -> Option<&Backtrace> {
        match self.repr {
            ErrorRepr::Single(ref payload) => Some(payload.backtrace.as_ref()),
            ErrorRepr::Many { .. } => None,
        }
    }

    /// Returns the captured callsite location for this error.
    pub fn location(&self) -> &'static Location<'static> {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.location,
            ErrorRepr::Many { location, .. } => location,
        }
    }

    /// Attaches an originating [`error::Error`] and returns the modified
    /// instance.
    ///
    /// Has no effect on aggregated errors, which forward the first contained
    /// error as their source.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        if let ErrorRepr::Single(ref mut payload) = self.repr {
            payload.source = Some(Arc::new(source));
        }
        self
    }

    /// Creates a [`PitrError`] from its components.
    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    ) -> Self {
        PitrError {
            repr: ErrorRepr::Single(ErrorPayload {
                kind,
                description,
                detail,
                source,
                location: Location::caller(),
                backtrace: Arc::new(Backtrace::capture()),
            }),
        }
    }
}

impl PartialEq for PitrError {
    fn eq(&self, other: &PitrError) -> bool {
        match (&self.repr, &other.repr) {
            (ErrorRepr::Single(a), ErrorRepr::Single(b)) => a.kind == b.kind,
            (ErrorRepr::Many { errors: a, .. }, ErrorRepr::Many { errors: b, .. }) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(a, b)| a == b)
            }
            _ => false,
        }
    }
}

impl fmt::Display for PitrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match &self.repr {
            ErrorRepr::Single(payload) => {
                let location = payload.location;
                write!(
                    f,
                    "[{:?}] {} @ {}:{}:{}",
                    payload.kind,
                    payload.description,
                    location.file(),
                    location.line(),
                    location.column()
                )?;

                if let Some(detail) = payload.detail.as_deref() {
                    write!(f, "\n  Detail: {detail}")?;
                }

                Ok(())
            }
            ErrorRepr::Many { errors, location } => {
                let count = errors.len();
                write!(
                    f,
                    "[Many] {} error{} aggregated @ {}:{}:{}",
                    count,
                    if count == 1 { "" } else { "s" },
                    location.file(),
                    location.line(),
                    location.column()
                )?;

                for (index, error) in errors.iter().enumerate() {
                    let rendered = format!("{error}");
                    for (line_index, line) in rendered.lines().enumerate() {
                        if line_index == 0 {
                            write!(f, "\n  {}. {}", index + 1, line)?;
                        } else {
                            write!(f, "\n     {line}")?;
                        }
                    }
                }

                Ok(())
            }
        }
    }
}

impl error::Error for PitrError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.repr {
            ErrorRepr::Single(payload) => payload
                .source
                .as_ref()
                .map(|source| source as &(dyn error::Error + 'static)),
            // Aggregated errors forward the first contained error.
            ErrorRepr::Many { errors, .. } => errors
                .first()
                .map(|error| error as &(dyn error::Error + 'static)),
        }
    }
}

/// Creates a [`PitrError`] from an error kind and static description.
impl From<(ErrorKind, &'static str)> for PitrError {
    #[track_caller]
    fn from((kind, desc): (ErrorKind, &'static str)) -> PitrError {
        PitrError::from_components(kind, Cow::Borrowed(desc), None, None)
    }
}

/// Creates a [`PitrError`] from an error kind, static description, and
/// dynamic detail.
impl<D> From<(ErrorKind, &'static str, D)> for PitrError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, desc, detail): (ErrorKind, &'static str, D)) -> PitrError {
        PitrError::from_components(kind, Cow::Borrowed(desc), Some(detail.into()), None)
    }
}

/// Aggregates a vector of errors.
///
/// A single-element vector unwraps to that error directly.
impl<E> From<Vec<E>> for PitrError
where
    E: Into<PitrError>,
{
    #[track_caller]
    fn from(errors: Vec<E>) -> PitrError {
        let location = Location::caller();

        let mut errors: Vec<PitrError> = errors.into_iter().map(Into::into).collect();
        if errors.len() == 1 {
            return errors.pop().expect("just checked length is 1");
        }

        PitrError {
            repr: ErrorRepr::Many { errors, location },
        }
    }
}

/// Converts [`std::io::Error`] to [`PitrError`] with [`ErrorKind::IoError`].
impl From<std::io::Error> for PitrError {
    #[track_caller]
    fn from(err: std::io::Error) -> PitrError {
        let detail = err.to_string();
        PitrError::from_components(
            ErrorKind::IoError,
            Cow::Borrowed("I/O operation failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Converts [`serde_json::Error`] to [`PitrError`] with the appropriate kind.
impl From<serde_json::Error> for PitrError {
    #[track_caller]
    fn from(err: serde_json::Error) -> PitrError {
        let kind = match err.classify() {
            serde_json::error::Category::Io => ErrorKind::IoError,
            serde_json::error::Category::Syntax
            | serde_json::error::Category::Data
            | serde_json::error::Category::Eof => ErrorKind::DeserializationError,
        };

        let detail = err.to_string();
        PitrError::from_components(
            kind,
            Cow::Borrowed("JSON conversion failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}
