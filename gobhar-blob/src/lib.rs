//! # gobhar-blob: range streaming for files held in a remote message store
//!
//! `gobhar-blob` serves byte ranges of remote objects as lazily fetched,
//! backpressured streams. It knows nothing about HTTP: the transport crate
//! turns an [`OpenedFile`] into a response.
//!
//! ## Key Features
//!
//! - **Range parsing**: single `bytes=` ranges, open-ended and suffix forms
//! - **Chunked fetching**: bounded reads in ascending order, aligned to backend limits
//! - **Retry**: transient read failures retried with exponential backoff and a per-read timeout
//! - **Backpressure**: at most one chunk fetched ahead of the one being delivered
//! - **Cancellation**: dropping the body drops in-flight reads
//!
//! ## Quick Start
//!
//! ```rust
//! use gobhar_blob::prelude::*;
//! use futures::StreamExt;
//!
//! # #[tokio::main]
//! # async fn main() -> GatewayResult<()> {
//! let store = MemoryStore::new();
//! store.insert("42", b"hello, world".to_vec(), Some("text/plain"), Some("hello.txt"));
//!
//! let gateway = GatewayAdapter::from_store(store, GatewayConfig::default())?;
//! let opened = gateway.open(&FileId::from("42"), Some("bytes=7-")).await?;
//! assert_eq!(opened.file.content_range().as_deref(), Some("bytes 7-11/12"));
//!
//! let (_, mut body) = opened.into_parts();
//! while let Some(chunk) = body.next().await {
//!     print!("{}", String::from_utf8_lossy(&chunk?));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │  GatewayAdapter  │  ← resolve, parse range, open session
//! ├──────────────────┤
//! │ StreamAssembler  │  ← ordered body, session bookkeeping
//! ├──────────────────┤
//! │   ChunkFetcher   │  ← bounded reads, retry, look-ahead
//! ├──────────────────┤
//! │ Resolver/Reader  │  ← remote backend collaborators
//! └──────────────────┘
//! ```

pub mod adapter;
mod config;
mod error;
pub mod fetcher;
mod fs_store;
mod memory_store;
pub mod range;
mod receipt;
mod session;
pub mod store;
pub mod stream;
mod types;

#[cfg(test)]
mod testing;

// Re-export main types for clean API
pub use adapter::GatewayAdapter;
pub use config::{GatewayConfig, MAX_CHUNK_SIZE};
pub use error::{ErrorKind, GatewayError, GatewayResult, UpstreamError};
pub use fetcher::{ChunkFetcher, ChunkPlan, ChunkPlanner};
pub use fs_store::{mime_from_name, DirectoryStore};
pub use memory_store::MemoryStore;
pub use range::parse_range;
pub use receipt::{unsatisfied_range, OpenedFile, ResolvedFile};
pub use session::{SessionState, StreamSession};
pub use store::{ChunkReader, FileResolver, ReaderCapabilities};
pub use stream::StreamAssembler;
pub use types::{ByteRange, ByteStream, FileHandle, FileId, RangeRequest, RemoteLocation};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        ChunkReader, FileHandle, FileId, FileResolver, GatewayAdapter, GatewayConfig,
        GatewayError, GatewayResult, MemoryStore, OpenedFile, ResolvedFile,
    };
}
