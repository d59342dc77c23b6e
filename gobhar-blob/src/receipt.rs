use crate::{ByteRange, ByteStream, FileHandle, RangeRequest};

/// A resolved file plus the range a request asked for; everything needed to
/// write response headers
#[derive(Debug, Clone)]
pub struct ResolvedFile {
    pub handle: FileHandle,
    pub request: RangeRequest,
}

impl ResolvedFile {
    pub fn new(handle: FileHandle, request: RangeRequest) -> Self {
        Self { handle, request }
    }

    pub fn range(&self) -> ByteRange {
        self.request.range()
    }

    pub fn total_size(&self) -> u64 {
        self.handle.total_size
    }

    /// 206 rather than 200
    pub fn is_partial(&self) -> bool {
        self.request.is_partial()
    }

    /// Value for `Content-Length`
    pub fn content_length(&self) -> u64 {
        self.range().len()
    }

    /// Value for `Content-Range`, present only for partial responses
    pub fn content_range(&self) -> Option<String> {
        self.is_partial().then(|| {
            let range = self.range();
            format!("bytes {}-{}/{}", range.start, range.last(), self.total_size())
        })
    }
}

/// Result of opening a file for reading: headers are known and the first
/// chunk has already arrived
pub struct OpenedFile {
    pub file: ResolvedFile,
    pub body: ByteStream,
}

impl OpenedFile {
    pub fn new(file: ResolvedFile, body: ByteStream) -> Self {
        Self { file, body }
    }

    pub fn into_parts(self) -> (ResolvedFile, ByteStream) {
        (self.file, self.body)
    }
}

impl std::fmt::Debug for OpenedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedFile")
            .field("file", &self.file)
            .finish_non_exhaustive()
    }
}

/// `Content-Range` for a 416 response
pub fn unsatisfied_range(total_size: u64) -> String {
    format!("bytes */{total_size}")
}
