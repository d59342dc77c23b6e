use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_core::Stream;
use futures_util::StreamExt;

use crate::fetcher::ChunkFetcher;
use crate::{ByteStream, GatewayError, GatewayResult, StreamSession};

type ChunkStream = Pin<Box<dyn Stream<Item = GatewayResult<Bytes>> + Send>>;

/// Turns fetched chunks into the response body for one session.
///
/// Chunks are passed through in the order the fetcher yields them and the
/// session cursor checks they tile the range exactly. The first failure ends
/// the stream; dropping the assembler before the end aborts the session and
/// drops any in-flight reads with it.
pub struct StreamAssembler {
    session: StreamSession,
    chunks: ChunkStream,
    primed: Option<Bytes>,
    finished: bool,
}

impl StreamAssembler {
    pub fn new(session: StreamSession, fetcher: ChunkFetcher) -> Self {
        Self::from_chunks(session, Box::pin(fetcher.into_stream()))
    }

    pub(crate) fn from_chunks(session: StreamSession, chunks: ChunkStream) -> Self {
        Self {
            session,
            chunks,
            primed: None,
            finished: false,
        }
    }

    /// Fetch the first chunk ahead of time so an upstream failure can still
    /// become an error status instead of a cut-off body
    pub async fn prime(&mut self) -> GatewayResult<()> {
        if self.primed.is_some() || self.finished {
            return Ok(());
        }
        match self.chunks.next().await {
            Some(Ok(chunk)) => {
                self.primed = Some(chunk);
                Ok(())
            }
            Some(Err(err)) => {
                self.finished = true;
                self.session.abort(err.to_string());
                Err(err)
            }
            None => {
                self.finish_or_abort();
                Ok(())
            }
        }
    }

    pub fn session(&self) -> &StreamSession {
        &self.session
    }

    pub fn into_byte_stream(self) -> ByteStream {
        Box::pin(self)
    }

    fn deliver(&mut self, chunk: Bytes) -> Option<std::io::Result<Bytes>> {
        if let Err(err) = self.session.advance(chunk.len() as u64) {
            return Some(Err(self.fail(err)));
        }
        if self.session.remaining() == 0 {
            self.finished = true;
            self.session.complete();
        }
        Some(Ok(chunk))
    }

    fn fail(&mut self, err: GatewayError) -> std::io::Error {
        self.finished = true;
        self.session.abort(err.to_string());
        match err {
            GatewayError::Io { source } => source,
            other => std::io::Error::other(other),
        }
    }

    /// The chunk source ran dry: fine at the range end, a gap anywhere else
    fn finish_or_abort(&mut self) -> Option<std::io::Result<Bytes>> {
        self.finished = true;
        if self.session.remaining() == 0 {
            self.session.complete();
            return None;
        }
        let missing = self.session.remaining();
        Some(Err(self.fail(GatewayError::Io {
            source: std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("chunk source ended {missing} bytes early"),
            ),
        })))
    }
}

impl Stream for StreamAssembler {
    type Item = std::io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if let Some(chunk) = this.primed.take() {
            return Poll::Ready(this.deliver(chunk));
        }
        if this.finished {
            return Poll::Ready(None);
        }

        match this.chunks.as_mut().poll_next(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Some(Ok(chunk))) => Poll::Ready(this.deliver(chunk)),
            Poll::Ready(Some(Err(err))) => Poll::Ready(Some(Err(this.fail(err)))),
            Poll::Ready(None) => Poll::Ready(this.finish_or_abort()),
        }
    }
}

impl Drop for StreamAssembler {
    fn drop(&mut self) {
        if self.session.is_active() {
            self.session.abort(GatewayError::ClientDisconnected.to_string());
        }
    }
}
