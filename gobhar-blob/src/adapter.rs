use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::fetcher::ChunkFetcher;
use crate::range::parse_range;
use crate::stream::StreamAssembler;
use crate::{
    ChunkReader, FileId, FileResolver, GatewayConfig, GatewayResult, OpenedFile, ResolvedFile,
    StreamSession,
};

/// The range-streaming gateway: resolves a file, validates the requested
/// range and hands back a lazily fetched body
#[derive(Clone)]
pub struct GatewayAdapter {
    resolver: Arc<dyn FileResolver>,
    reader: Arc<dyn ChunkReader>,
    config: GatewayConfig,
}

impl GatewayAdapter {
    /// Create from separate resolver and reader collaborators
    pub fn new<R, C>(resolver: R, reader: C, config: GatewayConfig) -> GatewayResult<Self>
    where
        R: FileResolver + 'static,
        C: ChunkReader + 'static,
    {
        config.validate()?;
        Ok(Self {
            resolver: Arc::new(resolver),
            reader: Arc::new(reader),
            config,
        })
    }

    /// Create from a store that both resolves and reads
    pub fn from_store<S>(store: S, config: GatewayConfig) -> GatewayResult<Self>
    where
        S: FileResolver + ChunkReader + 'static,
    {
        config.validate()?;
        let store = Arc::new(store);
        Ok(Self {
            resolver: store.clone(),
            reader: store,
            config,
        })
    }

    /// Resolve a file and validate a range without fetching any content
    #[instrument(skip(self, id), fields(file_id = %id))]
    pub async fn describe(&self, id: &FileId, range: Option<&str>) -> GatewayResult<ResolvedFile> {
        let handle = self.resolver.resolve(id).await?;
        let request = parse_range(range, handle.total_size)?;
        debug!(
            total_size = handle.total_size,
            start = request.range().start,
            end = request.range().end,
            partial = request.is_partial(),
            "range resolved"
        );
        Ok(ResolvedFile::new(handle, request))
    }

    /// Open a file for streaming.
    ///
    /// The first chunk is fetched before returning, so upstream failure is an
    /// `Err` here rather than a broken body later.
    #[instrument(skip(self, id), fields(file_id = %id))]
    pub async fn open(&self, id: &FileId, range: Option<&str>) -> GatewayResult<OpenedFile> {
        let file = self.describe(id, range).await?;

        let fetcher = ChunkFetcher::new(
            Arc::clone(&self.reader),
            &file.handle,
            file.range(),
            self.config.clone(),
        );
        let session = StreamSession::new(file.handle.clone(), file.range());
        info!(
            session_id = %session.id,
            start = file.range().start,
            end = file.range().end,
            total_size = file.total_size(),
            "stream session opened"
        );

        let mut assembler = StreamAssembler::new(session, fetcher);
        assembler.prime().await?;

        Ok(OpenedFile::new(file, assembler.into_byte_stream()))
    }

    /// Get configuration
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}
