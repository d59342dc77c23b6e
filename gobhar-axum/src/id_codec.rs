//! Link id obfuscation.
//!
//! Public links carry `message_id XOR secret` in lowercase hex instead of the
//! raw message id, so ids in the store cannot be enumerated by counting.

use thiserror::Error;

/// Default secret, matching links already handed out by the bot
pub const DEFAULT_SECRET: u64 = 742_658_931;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid ID format: {id} ({reason})")]
pub struct InvalidId {
    pub id: String,
    pub reason: &'static str,
}

impl InvalidId {
    pub fn new(id: &str, reason: &'static str) -> Self {
        Self {
            id: id.to_string(),
            reason,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdCodec {
    secret: u64,
}

impl Default for IdCodec {
    fn default() -> Self {
        Self::new(DEFAULT_SECRET)
    }
}

impl IdCodec {
    pub fn new(secret: u64) -> Self {
        Self { secret }
    }

    pub fn encode(&self, message_id: u64) -> String {
        format!("{:x}", message_id ^ self.secret)
    }

    pub fn decode(&self, encoded: &str) -> Result<u64, InvalidId> {
        if encoded.is_empty() || encoded.len() > 16 {
            return Err(InvalidId::new(encoded, "expected 1-16 hex digits"));
        }
        if !encoded.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(InvalidId::new(encoded, "not hexadecimal"));
        }
        let obfuscated = u64::from_str_radix(encoded, 16)
            .map_err(|_| InvalidId::new(encoded, "not hexadecimal"))?;

        match obfuscated ^ self.secret {
            0 => Err(InvalidId::new(encoded, "no such message")),
            message_id => Ok(message_id),
        }
    }
}
