use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::{
    ChunkReader, FileHandle, FileId, FileResolver, GatewayError, GatewayResult, ReaderCapabilities,
    RemoteLocation, UpstreamError,
};

#[derive(Clone)]
struct StoredFile {
    data: Bytes,
    mime_type: Option<String>,
    filename: Option<String>,
}

/// In-process store: resolves and reads files kept in memory
#[derive(Clone, Default)]
pub struct MemoryStore {
    files: Arc<RwLock<HashMap<String, StoredFile>>>,
    capabilities: ReaderCapabilities,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Impose backend read limits, e.g. to mimic a message store
    pub fn with_capabilities(mut self, capabilities: ReaderCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn insert(
        &self,
        id: &str,
        data: impl Into<Bytes>,
        mime_type: Option<&str>,
        filename: Option<&str>,
    ) {
        let file = StoredFile {
            data: data.into(),
            mime_type: mime_type.map(str::to_string),
            filename: filename.map(str::to_string),
        };
        self.files
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(id.to_string(), file);
    }

    pub fn remove(&self, id: &str) -> bool {
        self.files
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(id)
            .is_some()
    }

    fn get(&self, key: &str) -> Option<StoredFile> {
        self.files
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(key)
            .cloned()
    }
}

#[async_trait]
impl FileResolver for MemoryStore {
    async fn resolve(&self, id: &FileId) -> GatewayResult<FileHandle> {
        let file = self
            .get(id.as_str())
            .ok_or_else(|| GatewayError::not_found(id.as_str()))?;

        let mut handle = FileHandle::new(
            id.clone(),
            file.data.len() as u64,
            RemoteLocation::new(id.as_str()),
        );
        if let Some(mime) = file.mime_type {
            handle = handle.with_mime_type(mime);
        }
        if let Some(name) = file.filename {
            handle = handle.with_filename(name);
        }
        Ok(handle)
    }
}

#[async_trait]
impl ChunkReader for MemoryStore {
    async fn read_chunk(
        &self,
        location: &RemoteLocation,
        offset: u64,
        len: u64,
    ) -> Result<Bytes, UpstreamError> {
        let file = self
            .get(location.as_str())
            .ok_or_else(|| UpstreamError::permanent(format!("no object at {location}")))?;

        let size = file.data.len() as u64;
        if offset > size {
            return Err(UpstreamError::permanent(format!(
                "offset {offset} beyond object size {size}"
            )));
        }
        let end = offset.saturating_add(len).min(size);
        Ok(file.data.slice(offset as usize..end as usize))
    }

    fn capabilities(&self) -> ReaderCapabilities {
        self.capabilities
    }
}
