use std::{borrow::Cow, fmt, sync::Arc, time::Duration};

/// Broad classification of a failure reported by the store driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFailureKind {
    /// Primary key or unique constraint violation.
    DuplicateKey,
    /// Any other integrity constraint (not null, foreign key, check).
    ConstraintViolation,
    /// The connection could not be established or was lost.
    Connection,
    /// The statement could not be parsed or prepared.
    Syntax,
    Other,
}

/// A failure reported by the store while executing a statement.
///
/// The core never retries, the failure is surfaced as is through the deferred result.
#[derive(Clone, thiserror::Error)]
#[error("{cause:#}")]
pub struct StoreFailure {
    pub kind: StoreFailureKind,
    /// Store specific error code (sqlite extended result code, postgres SQLSTATE).
    pub code: Option<Cow<'static, str>>,
    cause: Arc<anyhow::Error>,
}

impl StoreFailure {
    pub fn new(kind: StoreFailureKind, cause: impl Into<anyhow::Error>) -> Self {
        Self {
            kind,
            code: None,
            cause: Arc::new(cause.into()),
        }
    }
    pub fn with_code(mut self, code: impl Into<Cow<'static, str>>) -> Self {
        self.code = Some(code.into());
        self
    }
    pub fn msg(kind: StoreFailureKind, message: impl fmt::Display + fmt::Debug + Send + Sync + 'static) -> Self {
        Self::new(kind, anyhow::Error::msg(message))
    }
    pub fn cause(&self) -> &anyhow::Error {
        &self.cause
    }
    pub fn is_duplicate_key(&self) -> bool {
        self.kind == StoreFailureKind::DuplicateKey
    }
}

impl fmt::Debug for StoreFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreFailure")
            .field("kind", &self.kind)
            .field("code", &self.code)
            .field("cause", &format_args!("{:#}", self.cause))
            .finish()
    }
}

/// Every failure that can travel through a [`Deferred`](crate::Deferred).
///
/// It is `Clone` so that several observers of the same result can each receive it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// A singular fetch matched more than one row.
    #[error("Found more than one row: {0}")]
    TooManyRows(usize),
    #[error(transparent)]
    Store(#[from] StoreFailure),
    /// A value has no known conversion for the target store or column.
    #[error("Cannot map a value of type {type_name} for {column}")]
    UnmappableColumn {
        column: Cow<'static, str>,
        type_name: Cow<'static, str>,
    },
    /// The first failing child of an `all` combinator.
    #[error("Combined result failed at child {index}: {cause}")]
    ConcurrentChildFailure { index: usize, cause: Box<Error> },
    /// Row or document content could not be converted.
    #[error("{0:#}")]
    Conversion(Arc<anyhow::Error>),
    #[error("The operation did not settle within {0:?}")]
    Timeout(Duration),
    #[error("A continuation panicked: {0}")]
    Panicked(Arc<str>),
    /// Every promise was dropped before the result settled.
    #[error("The result was abandoned before settling")]
    Abandoned,
    #[error("Invalid configuration: {0}")]
    Config(Cow<'static, str>),
}

impl Error {
    pub fn msg(message: impl fmt::Display + fmt::Debug + Send + Sync + 'static) -> Self {
        Error::Conversion(Arc::new(anyhow::Error::msg(message)))
    }

    /// Cause of the failure, looking through `ConcurrentChildFailure` wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Error::ConcurrentChildFailure { cause, .. } => cause.root(),
            _ => self,
        }
    }

    pub fn store_failure(&self) -> Option<&StoreFailure> {
        match self.root() {
            Error::Store(failure) => Some(failure),
            _ => None,
        }
    }

    pub fn is_duplicate_key(&self) -> bool {
        self.store_failure()
            .map(StoreFailure::is_duplicate_key)
            .unwrap_or(false)
    }

    pub fn is_too_many_rows(&self) -> bool {
        matches!(self.root(), Error::TooManyRows(..))
    }
}

impl From<anyhow::Error> for Error {
    fn from(value: anyhow::Error) -> Self {
        match value.downcast::<Error>() {
            Ok(error) => error,
            Err(value) => Error::Conversion(Arc::new(value)),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
