use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::path::{Component, Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::{
    ChunkReader, FileHandle, FileId, FileResolver, GatewayError, GatewayResult, ReaderCapabilities,
    RemoteLocation, UpstreamError,
};

/// Serves files from a local directory; the file id is the file name.
///
/// Useful for development and for deployments where a sync job mirrors the
/// remote store to disk.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
    capabilities: ReaderCapabilities,
}

impl DirectoryStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            capabilities: ReaderCapabilities::basic(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: ReaderCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map an id onto a path under the root; ids that would escape it map to nothing
    fn path_for(&self, name: &str) -> Option<PathBuf> {
        let relative = Path::new(name);
        let mut components = relative.components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Some(self.root.join(relative)),
            _ => None,
        }
    }
}

#[async_trait]
impl FileResolver for DirectoryStore {
    async fn resolve(&self, id: &FileId) -> GatewayResult<FileHandle> {
        let path = self
            .path_for(id.as_str())
            .ok_or_else(|| GatewayError::not_found(id.as_str()))?;

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Err(GatewayError::not_found(id.as_str())),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(GatewayError::not_found(id.as_str()))
            }
            Err(err) => return Err(err.into()),
        };

        let mut handle = FileHandle::new(
            id.clone(),
            metadata.len(),
            RemoteLocation::new(id.as_str()),
        )
        .with_filename(id.as_str());
        if let Some(mime) = mime_from_name(id.as_str()) {
            handle = handle.with_mime_type(mime);
        }
        Ok(handle)
    }
}

#[async_trait]
impl ChunkReader for DirectoryStore {
    async fn read_chunk(
        &self,
        location: &RemoteLocation,
        offset: u64,
        len: u64,
    ) -> Result<Bytes, UpstreamError> {
        let path = self
            .path_for(location.as_str())
            .ok_or_else(|| UpstreamError::permanent(format!("invalid location {location}")))?;

        let mut file = tokio::fs::File::open(&path).await?;
        file.seek(std::io::SeekFrom::Start(offset)).await?;

        let mut buf = BytesMut::with_capacity(len as usize);
        let mut limited = file.take(len);
        while limited.read_buf(&mut buf).await? > 0 {}
        Ok(buf.freeze())
    }

    fn capabilities(&self) -> ReaderCapabilities {
        self.capabilities
    }
}

/// Content type from a file extension, for the media types browsers can play inline
pub fn mime_from_name(name: &str) -> Option<&'static str> {
    let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "ts" => "video/mp2t",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "ogg" | "oga" => "audio/ogg",
        "flac" => "audio/flac",
        "wav" => "audio/wav",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "zip" => "application/zip",
        _ => return None,
    };
    Some(mime)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("gobhar-fs-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn resolves_and_reads_files() {
        let root = temp_root();
        std::fs::write(root.join("movie.mp4"), b"0123456789").unwrap();
        let store = DirectoryStore::new(&root);

        let handle = store.resolve(&FileId::from("movie.mp4")).await.unwrap();
        assert_eq!(handle.total_size, 10);
        assert_eq!(handle.mime_type.as_deref(), Some("video/mp4"));

        let bytes = store.read_chunk(&handle.location, 3, 4).await.unwrap();
        assert_eq!(bytes, "3456");
        let tail = store.read_chunk(&handle.location, 8, 100).await.unwrap();
        assert_eq!(tail, "89");

        std::fs::remove_dir_all(root).unwrap();
    }

    #[tokio::test]
    async fn traversal_and_missing_files_are_not_found() {
        let root = temp_root();
        let store = DirectoryStore::new(&root);

        for id in ["../etc/passwd", "/etc/passwd", "a/b", "", "missing.bin"] {
            assert!(
                matches!(
                    store.resolve(&FileId::from(id)).await,
                    Err(GatewayError::NotFound { .. })
                ),
                "{id:?}"
            );
        }

        std::fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn mime_lookup_is_case_insensitive() {
        assert_eq!(mime_from_name("A.MKV"), Some("video/x-matroska"));
        assert_eq!(mime_from_name("noext"), None);
    }
}
