use bytes::Bytes;
use futures_core::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// Stream of bytes for file content
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Opaque identifier for a file in the remote store (a message id for chat backends)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileId(pub String);

impl FileId {
    /// Create from existing string
    pub fn from_string(id: String) -> Self {
        Self(id)
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FileId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<i64> for FileId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Backend-specific reference to where the bytes live.
///
/// The gateway never interprets it; only the [`ChunkReader`](crate::ChunkReader)
/// that produced it through the resolver does.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteLocation(pub String);

impl RemoteLocation {
    pub fn new<S: Into<String>>(location: S) -> Self {
        Self(location.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RemoteLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Resolved, read-only metadata for one remote object.
///
/// Produced fresh by the resolver on every request and never cached here:
/// stored objects are immutable but access handles can expire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileHandle {
    pub id: FileId,
    pub total_size: u64,
    pub location: RemoteLocation,
    pub mime_type: Option<String>,
    pub filename: Option<String>,
}

impl FileHandle {
    pub fn new(id: FileId, total_size: u64, location: RemoteLocation) -> Self {
        Self {
            id,
            total_size,
            location,
            mime_type: None,
            filename: None,
        }
    }

    pub fn with_mime_type<S: Into<String>>(mut self, mime_type: S) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_filename<S: Into<String>>(mut self, filename: S) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Name offered to clients; falls back to `file_<id>` when the store has none
    pub fn display_name(&self) -> String {
        match &self.filename {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => format!("file_{}", self.id),
        }
    }
}

/// Half-open byte interval `[start, end)` over a file's bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// The whole object
    pub fn full(total_size: u64) -> Self {
        Self {
            start: 0,
            end: total_size,
        }
    }

    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether this range covers exactly `[0, total_size)`
    pub fn is_full(&self, total_size: u64) -> bool {
        self.start == 0 && self.end == total_size
    }

    /// Inclusive last byte offset, as used in `Content-Range`
    pub fn last(&self) -> u64 {
        self.end.saturating_sub(1)
    }

    pub fn fits_within(&self, total_size: u64) -> bool {
        self.start <= self.end && self.end <= total_size
    }
}

/// Outcome of parsing a `Range` header against a known size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeRequest {
    /// No `Range` header: serve everything with 200
    Full(ByteRange),
    /// Explicit single range: serve with 206
    Partial(ByteRange),
}

impl RangeRequest {
    pub fn range(&self) -> ByteRange {
        match self {
            Self::Full(range) | Self::Partial(range) => *range,
        }
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, Self::Partial(_))
    }
}
