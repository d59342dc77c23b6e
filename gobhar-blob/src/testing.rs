//! Fault-injecting readers for unit tests.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::{ChunkReader, RemoteLocation, UpstreamError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Ok,
    Transient,
    Permanent,
    Short,
    Hang,
}

/// Serves `data`, but reads at scripted offsets follow their script first
#[derive(Clone)]
pub struct ScriptedReader {
    data: Bytes,
    scripts: Arc<Mutex<HashMap<u64, VecDeque<Step>>>>,
    calls: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
    cancelled: Arc<AtomicUsize>,
}

impl ScriptedReader {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            scripts: Arc::default(),
            calls: Arc::default(),
            in_flight: Arc::default(),
            peak_in_flight: Arc::default(),
            cancelled: Arc::default(),
        }
    }

    pub fn script(self, offset: u64, steps: Vec<Step>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(offset, steps.into_iter().collect());
        self
    }

    /// Every offset from `offset` onwards hangs forever
    pub fn hang_from(self, offset: u64, chunk: u64) -> Self {
        let mut at = offset;
        while at < self.data.len() as u64 {
            self.scripts
                .lock()
                .unwrap()
                .insert(at, std::iter::repeat(Step::Hang).take(16).collect());
            at += chunk;
        }
        self
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    pub fn peak_in_flight(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.peak_in_flight)
    }

    pub fn cancelled(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.cancelled)
    }

    fn next_step(&self, offset: u64) -> Step {
        self.scripts
            .lock()
            .unwrap()
            .get_mut(&offset)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Step::Ok)
    }
}

/// Tracks a read from start to finish; a drop before `finish` means it was cancelled
struct InFlight {
    reader: ScriptedReader,
    finished: bool,
}

impl InFlight {
    fn start(reader: &ScriptedReader) -> Self {
        let now = reader.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        reader.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        Self {
            reader: reader.clone(),
            finished: false,
        }
    }

    fn finish(mut self) {
        self.finished = true;
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.reader.in_flight.fetch_sub(1, Ordering::SeqCst);
        if !self.finished {
            self.reader.cancelled.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl ChunkReader for ScriptedReader {
    async fn read_chunk(
        &self,
        _location: &RemoteLocation,
        offset: u64,
        len: u64,
    ) -> Result<Bytes, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let guard = InFlight::start(self);
        // Yield once so concurrent reads overlap observably
        tokio::task::yield_now().await;

        let end = (offset + len).min(self.data.len() as u64);
        let result = match self.next_step(offset) {
            Step::Ok => Ok(self.data.slice(offset as usize..end as usize)),
            Step::Transient => Err(UpstreamError::transient("flood wait")),
            Step::Permanent => Err(UpstreamError::permanent("file reference expired")),
            Step::Short => Ok(self.data.slice(offset as usize..(end - 1).max(offset) as usize)),
            Step::Hang => std::future::pending().await,
        };
        guard.finish();
        result
    }
}
