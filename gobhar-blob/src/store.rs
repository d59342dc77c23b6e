use async_trait::async_trait;
use bytes::Bytes;

use crate::{FileHandle, FileId, GatewayResult, RemoteLocation, UpstreamError};

/// Looks up remote object metadata for a file id.
///
/// Implementations talk to the remote backend (or its index) on every call;
/// the gateway does not cache handles.
#[async_trait]
pub trait FileResolver: Send + Sync {
    /// Resolve a file id, failing with `GatewayError::NotFound` for unknown ids
    async fn resolve(&self, id: &FileId) -> GatewayResult<FileHandle>;
}

/// Authenticated read primitive of the remote backend.
///
/// One call is one remote request. The gateway never asks for bytes outside
/// `[0, total_size)` of the object behind `location`, and always honors
/// [`ReaderCapabilities`] when choosing `offset` and `len`.
#[async_trait]
pub trait ChunkReader: Send + Sync {
    /// Read exactly `len` bytes starting at `offset`, or fewer only when the
    /// object ends first
    async fn read_chunk(
        &self,
        location: &RemoteLocation,
        offset: u64,
        len: u64,
    ) -> Result<Bytes, UpstreamError>;

    /// Get reader capabilities
    fn capabilities(&self) -> ReaderCapabilities {
        ReaderCapabilities::default()
    }
}

/// Constraints a backend places on individual reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderCapabilities {
    /// Largest `len` a single call may request
    pub max_read_size: Option<u64>,
    /// `offset` and `len` must be multiples of this (1 = unaligned reads are fine)
    pub alignment: u64,
}

impl Default for ReaderCapabilities {
    fn default() -> Self {
        Self {
            max_read_size: None,
            alignment: 1,
        }
    }
}

impl ReaderCapabilities {
    pub fn basic() -> Self {
        Self::default()
    }

    pub fn with_max_read_size(mut self, bytes: u64) -> Self {
        self.max_read_size = Some(bytes);
        self
    }

    pub fn with_alignment(mut self, bytes: u64) -> Self {
        self.alignment = bytes.max(1);
        self
    }

    /// Message-store style limits: 4KiB aligned reads of at most 1MiB
    pub fn message_store() -> Self {
        Self::basic()
            .with_alignment(4 * 1024)
            .with_max_read_size(1024 * 1024)
    }
}
