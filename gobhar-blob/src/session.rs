use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ByteRange, FileHandle, GatewayError, GatewayResult};

/// Lifecycle of a single streamed response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Active,
    Completed,
    Aborted { reason: String },
}

/// Per-request streaming state.
///
/// Owned by exactly one response body; there is no registry of sessions, so
/// dropping the body is all it takes to end one.
#[derive(Debug, Clone)]
pub struct StreamSession {
    pub id: Uuid,
    pub handle: FileHandle,
    pub range: ByteRange,
    pub position: u64,
    pub state: SessionState,
    pub started_at: DateTime<Utc>,
}

impl StreamSession {
    pub fn new(handle: FileHandle, range: ByteRange) -> Self {
        Self {
            id: Uuid::new_v4(),
            position: range.start,
            handle,
            range,
            state: SessionState::Active,
            started_at: Utc::now(),
        }
    }

    /// Bytes already handed to the client
    pub fn delivered(&self) -> u64 {
        self.position - self.range.start
    }

    pub fn remaining(&self) -> u64 {
        self.range.end - self.position
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// Move the cursor past `len` delivered bytes; refuses to run past the range end
    pub fn advance(&mut self, len: u64) -> GatewayResult<()> {
        if len > self.remaining() {
            return Err(GatewayError::Io {
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!(
                        "chunk of {len} bytes overruns range end {} at position {}",
                        self.range.end, self.position
                    ),
                ),
            });
        }
        self.position += len;
        Ok(())
    }

    pub fn complete(&mut self) {
        if !self.is_active() {
            return;
        }
        self.state = SessionState::Completed;
        tracing::info!(
            session_id = %self.id,
            file_id = %self.handle.id,
            bytes = self.delivered(),
            elapsed_ms = self.elapsed_ms(),
            "stream completed"
        );
    }

    pub fn abort<S: Into<String>>(&mut self, reason: S) {
        if !self.is_active() {
            return;
        }
        let reason = reason.into();
        tracing::warn!(
            session_id = %self.id,
            file_id = %self.handle.id,
            delivered = self.delivered(),
            remaining = self.remaining(),
            elapsed_ms = self.elapsed_ms(),
            %reason,
            "stream aborted"
        );
        self.state = SessionState::Aborted { reason };
    }

    fn elapsed_ms(&self) -> i64 {
        (Utc::now() - self.started_at).num_milliseconds()
    }
}
