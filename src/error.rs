//! Unified error type for all store operations.

/// Things that can go wrong when using the store.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// File system problem (missing file, permissions, disk failure, rename).
    Io(String),
    /// The backing file (or a stored value) is not valid for the JSON
    /// document model: bad syntax, empty input, or a non-object root.
    Format(String),
    /// Get or delete of a key that isn't in the document.
    KeyNotFound(String),
    /// Failed to encode the document or a value as JSON.
    Serialize(String),
    /// Bad configuration (invalid path, etc.).
    Config(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(msg) => write!(f, "i/o error: {msg}"),
            Error::Format(msg) => write!(f, "format error: {msg}"),
            Error::KeyNotFound(key) => write!(f, "key not found: {key:?}"),
            Error::Serialize(msg) => write!(f, "serialization error: {msg}"),
            Error::Config(msg) => write!(f, "config error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// `true` for [`Error::KeyNotFound`].
    #[must_use]
    pub fn is_key_not_found(&self) -> bool {
        matches!(self, Error::KeyNotFound(_))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        use serde_json::error::Category;
        match err.classify() {
            Category::Io => Error::Io(err.to_string()),
            Category::Syntax | Category::Eof | Category::Data => Error::Format(err.to_string()),
        }
    }
}

/// Result alias using our [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;
