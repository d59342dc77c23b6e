//! Remote chunk fetching.
//!
//! A requested span is split into bounded reads issued in ascending offset
//! order. Each read is retried on transient failure with exponential backoff
//! and bounded by a timeout. The resulting stream is lazy: reads are only
//! driven while the consumer polls, and at most `prefetch_chunks + 1` reads
//! exist at a time. Dropping the stream drops every in-flight read.

use std::sync::Arc;

use bytes::Bytes;
use futures_core::Stream;
use futures_util::StreamExt;
use tracing::{debug, warn};

use crate::{
    ByteRange, ChunkReader, FileHandle, GatewayConfig, GatewayError, GatewayResult,
    ReaderCapabilities, RemoteLocation, UpstreamError,
};

/// One planned sub-fetch: the remote read to issue and the slice of it the client wants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    pub index: u64,
    pub read_offset: u64,
    pub read_len: u64,
    pub wanted: ByteRange,
}

impl ChunkPlan {
    /// Cut the wanted bytes out of a read result, rejecting short reads
    fn extract(&self, bytes: Bytes) -> Result<Bytes, UpstreamError> {
        let got = bytes.len() as u64;
        if got < self.read_len {
            return Err(UpstreamError::transient(format!(
                "short read at offset {}: expected {} bytes, got {}",
                self.read_offset, self.read_len, got
            )));
        }
        let from = (self.wanted.start - self.read_offset) as usize;
        let to = (self.wanted.end - self.read_offset) as usize;
        Ok(bytes.slice(from..to))
    }
}

/// Lazily yields the reads that cover a range, honoring reader limits
#[derive(Debug, Clone)]
pub struct ChunkPlanner {
    range: ByteRange,
    total_size: u64,
    step: u64,
    alignment: u64,
    next_offset: u64,
    index: u64,
}

impl ChunkPlanner {
    pub fn new(
        range: ByteRange,
        total_size: u64,
        chunk_size: u64,
        capabilities: ReaderCapabilities,
    ) -> Self {
        let alignment = capabilities.alignment.max(1);
        let mut step = chunk_size.max(1);
        if let Some(max) = capabilities.max_read_size {
            step = step.min(max.max(1));
        }
        // Keep every read aligned; never smaller than one block
        step = (step / alignment).max(1) * alignment;

        Self {
            range,
            total_size,
            step,
            alignment,
            next_offset: range.start - range.start % alignment,
            index: 0,
        }
    }

    /// Bytes requested per read (before tail truncation)
    pub fn step(&self) -> u64 {
        self.step
    }

    fn round_up(&self, offset: u64) -> u64 {
        offset.div_ceil(self.alignment).saturating_mul(self.alignment)
    }
}

impl Iterator for ChunkPlanner {
    type Item = ChunkPlan;

    fn next(&mut self) -> Option<Self::Item> {
        if self.range.is_empty() || self.next_offset >= self.range.end {
            return None;
        }

        let read_offset = self.next_offset;
        let read_end = read_offset
            .saturating_add(self.step)
            .min(self.round_up(self.range.end))
            .min(self.total_size);
        let plan = ChunkPlan {
            index: self.index,
            read_offset,
            read_len: read_end - read_offset,
            wanted: ByteRange::new(
                read_offset.max(self.range.start),
                read_end.min(self.range.end),
            ),
        };

        self.next_offset = read_offset.saturating_add(self.step);
        self.index += 1;
        Some(plan)
    }
}

/// Fetches a byte range of one remote object as an ordered chunk stream
pub struct ChunkFetcher {
    reader: Arc<dyn ChunkReader>,
    location: RemoteLocation,
    range: ByteRange,
    total_size: u64,
    config: GatewayConfig,
}

impl ChunkFetcher {
    pub fn new(
        reader: Arc<dyn ChunkReader>,
        handle: &FileHandle,
        range: ByteRange,
        config: GatewayConfig,
    ) -> Self {
        debug_assert!(range.fits_within(handle.total_size));
        Self {
            reader,
            location: handle.location.clone(),
            range,
            total_size: handle.total_size,
            config,
        }
    }

    /// Reads this fetcher will issue, in order
    pub fn plan(&self) -> ChunkPlanner {
        ChunkPlanner::new(
            self.range,
            self.total_size,
            self.config.chunk_size,
            self.reader.capabilities(),
        )
    }

    /// Ordered, lazily driven stream of the range's bytes
    pub fn into_stream(self) -> impl Stream<Item = GatewayResult<Bytes>> + Send + 'static {
        let plans = self.plan();
        let limit = self.config.in_flight_limit();
        let reader = self.reader;
        let location = Arc::new(self.location);
        let config = Arc::new(self.config);

        futures_util::stream::iter(plans)
            .map(move |plan| {
                let reader = Arc::clone(&reader);
                let location = Arc::clone(&location);
                let config = Arc::clone(&config);
                async move { fetch_with_retry(reader.as_ref(), &location, plan, &config).await }
            })
            .buffered(limit)
    }
}

enum Failure {
    Upstream(UpstreamError),
    Timeout,
}

/// Issue one planned read, retrying transient failures
pub async fn fetch_with_retry(
    reader: &dyn ChunkReader,
    location: &RemoteLocation,
    plan: ChunkPlan,
    config: &GatewayConfig,
) -> GatewayResult<Bytes> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        let outcome = tokio::time::timeout(
            config.fetch_timeout,
            reader.read_chunk(location, plan.read_offset, plan.read_len),
        )
        .await;

        let failure = match outcome {
            Ok(Ok(bytes)) => match plan.extract(bytes) {
                Ok(chunk) => {
                    debug!(
                        %location,
                        chunk = plan.index,
                        offset = plan.wanted.start,
                        len = chunk.len(),
                        attempt,
                        "chunk fetched"
                    );
                    return Ok(chunk);
                }
                Err(err) => Failure::Upstream(err),
            },
            Ok(Err(err)) if !err.is_transient() => {
                warn!(%location, chunk = plan.index, error = %err, "permanent upstream failure");
                return Err(GatewayError::UpstreamUnavailable {
                    attempts: attempt,
                    reason: err.message().to_string(),
                });
            }
            Ok(Err(err)) => Failure::Upstream(err),
            Err(_elapsed) => Failure::Timeout,
        };

        if attempt >= config.max_attempts {
            warn!(%location, chunk = plan.index, attempts = attempt, "giving up on chunk");
            return Err(match failure {
                Failure::Timeout => GatewayError::UpstreamTimeout { attempts: attempt },
                Failure::Upstream(err) => GatewayError::UpstreamUnavailable {
                    attempts: attempt,
                    reason: err.message().to_string(),
                },
            });
        }

        let delay = config.backoff_for(attempt);
        match &failure {
            Failure::Timeout => warn!(
                %location,
                chunk = plan.index,
                attempt,
                timeout_ms = config.fetch_timeout.as_millis() as u64,
                retry_in_ms = delay.as_millis() as u64,
                "chunk read timed out"
            ),
            Failure::Upstream(err) => warn!(
                %location,
                chunk = plan.index,
                attempt,
                error = %err,
                retry_in_ms = delay.as_millis() as u64,
                "chunk read failed"
            ),
        }
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedReader, Step};
    use crate::{FileId, MemoryStore};
    use std::time::Duration;

    fn handle(size: u64) -> FileHandle {
        FileHandle::new(FileId::from(7), size, RemoteLocation::new("7"))
    }

    fn quick_config(chunk: u64) -> GatewayConfig {
        GatewayConfig::new()
            .with_chunk_size(chunk)
            .with_backoff(Duration::from_millis(10), Duration::from_millis(40))
            .with_fetch_timeout(Duration::from_millis(500))
    }

    async fn collect(fetcher: ChunkFetcher) -> GatewayResult<Vec<u8>> {
        let mut out = Vec::new();
        let mut stream = Box::pin(fetcher.into_stream());
        while let Some(chunk) = stream.next().await {
            out.extend_from_slice(&chunk?);
        }
        Ok(out)
    }

    #[test]
    fn planner_covers_range_without_gaps() {
        let range = ByteRange::new(3, 25);
        let plans: Vec<_> =
            ChunkPlanner::new(range, 100, 10, ReaderCapabilities::basic()).collect();

        assert_eq!(plans.len(), 3);
        assert_eq!(plans[0].wanted, ByteRange::new(3, 13));
        assert_eq!(plans[1].wanted, ByteRange::new(13, 23));
        assert_eq!(plans[2].wanted, ByteRange::new(23, 25));
        assert_eq!(plans[2].read_len, 2);
        for pair in plans.windows(2) {
            assert_eq!(pair[0].wanted.end, pair[1].wanted.start);
        }
    }

    #[test]
    fn planner_aligns_reads_and_stays_inside_object() {
        let caps = ReaderCapabilities::basic()
            .with_alignment(8)
            .with_max_read_size(16);
        let plans: Vec<_> = ChunkPlanner::new(ByteRange::new(5, 45), 45, 100, caps).collect();

        assert!(plans.iter().all(|p| p.read_offset % 8 == 0));
        assert!(plans.iter().all(|p| p.read_len <= 16));
        assert!(plans.iter().all(|p| p.read_offset + p.read_len <= 45));
        assert_eq!(plans.first().map(|p| p.read_offset), Some(0));
        assert_eq!(plans.first().map(|p| p.wanted.start), Some(5));
        assert_eq!(plans.last().map(|p| p.wanted.end), Some(45));
    }

    #[test]
    fn oversized_chunk_is_one_read_to_the_end() {
        let plans: Vec<_> = ChunkPlanner::new(
            ByteRange::new(10, 100),
            100,
            u64::MAX,
            ReaderCapabilities::basic().with_alignment(4096),
        )
        .collect();

        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].read_offset, 0);
        assert_eq!(plans[0].read_len, 100);
        assert_eq!(plans[0].wanted, ByteRange::new(10, 100));
    }

    #[test]
    fn empty_range_plans_nothing() {
        let plans: Vec<_> =
            ChunkPlanner::new(ByteRange::full(0), 0, 10, ReaderCapabilities::basic()).collect();
        assert!(plans.is_empty());
    }

    #[tokio::test]
    async fn fetches_exact_span_in_order() {
        let data: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        let store = MemoryStore::new();
        store.insert("7", data.clone(), None, None);

        for (start, end) in [(0, 10_000), (1, 2), (4095, 4097), (9_000, 10_000), (123, 7_777)] {
            let fetcher = ChunkFetcher::new(
                Arc::new(store.clone()),
                &handle(10_000),
                ByteRange::new(start, end),
                quick_config(1000),
            );
            let bytes = collect(fetcher).await.unwrap();
            assert_eq!(bytes, &data[start as usize..end as usize], "range {start}..{end}");
        }
    }

    #[tokio::test]
    async fn aligned_backend_still_yields_exact_bytes() {
        let data: Vec<u8> = (0..=255u8).cycle().take(20_000).collect();
        let store = MemoryStore::new().with_capabilities(
            ReaderCapabilities::basic()
                .with_alignment(4096)
                .with_max_read_size(8192),
        );
        store.insert("7", data.clone(), None, None);

        let fetcher = ChunkFetcher::new(
            Arc::new(store),
            &handle(20_000),
            ByteRange::new(5_000, 19_999),
            quick_config(1024 * 1024),
        );
        assert_eq!(collect(fetcher).await.unwrap(), &data[5_000..19_999]);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried_transparently() {
        let data = b"0123456789".to_vec();
        let reader = ScriptedReader::new(data.clone())
            .script(0, vec![Step::Transient, Step::Transient, Step::Ok]);
        let calls = reader.calls();

        let fetcher = ChunkFetcher::new(
            Arc::new(reader),
            &handle(10),
            ByteRange::full(10),
            quick_config(4),
        );
        assert_eq!(collect(fetcher).await.unwrap(), data);
        // chunk 0 took three attempts, chunks 1 and 2 one each
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_fail_as_unavailable() {
        let reader = ScriptedReader::new(vec![0; 10]).script(0, vec![Step::Transient; 5]);
        let calls = reader.calls();

        let fetcher = ChunkFetcher::new(
            Arc::new(reader),
            &handle(10),
            ByteRange::full(10),
            quick_config(10),
        );
        let err = collect(fetcher).await.unwrap_err();
        assert!(matches!(err, GatewayError::UpstreamUnavailable { attempts: 3, .. }));
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_failures_do_not_retry() {
        let reader = ScriptedReader::new(vec![0; 10]).script(0, vec![Step::Permanent]);
        let calls = reader.calls();

        let fetcher = ChunkFetcher::new(
            Arc::new(reader),
            &handle(10),
            ByteRange::full(10),
            quick_config(10),
        );
        let err = collect(fetcher).await.unwrap_err();
        assert!(matches!(err, GatewayError::UpstreamUnavailable { attempts: 1, .. }));
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_reads_time_out() {
        let reader = ScriptedReader::new(vec![0; 10]).script(0, vec![Step::Hang; 3]);

        let fetcher = ChunkFetcher::new(
            Arc::new(reader),
            &handle(10),
            ByteRange::full(10),
            quick_config(10),
        );
        let err = collect(fetcher).await.unwrap_err();
        assert!(matches!(err, GatewayError::UpstreamTimeout { attempts: 3 }));
    }

    #[tokio::test(start_paused = true)]
    async fn short_reads_are_not_passed_through() {
        let reader = ScriptedReader::new(vec![1; 10]).script(0, vec![Step::Short; 3]);

        let fetcher = ChunkFetcher::new(
            Arc::new(reader),
            &handle(10),
            ByteRange::full(10),
            quick_config(10),
        );
        assert!(matches!(
            collect(fetcher).await,
            Err(GatewayError::UpstreamUnavailable { .. })
        ));
    }
}
