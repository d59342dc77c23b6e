use std::sync::Arc;

use gobhar_blob::{FileId, GatewayAdapter};

use crate::{IdCodec, InvalidId};

#[derive(Clone)]
pub struct GatewayState {
    pub gateway: Arc<GatewayAdapter>,
    pub ids: Option<IdCodec>,
}

impl GatewayState {
    pub fn new(gateway: GatewayAdapter) -> Self {
        Self {
            gateway: Arc::new(gateway),
            ids: None,
        }
    }

    pub fn with_id_codec(mut self, codec: IdCodec) -> Self {
        self.ids = Some(codec);
        self
    }

    /// Turn a path segment into a file id, undoing obfuscation when configured
    pub fn file_id(&self, raw: &str) -> Result<FileId, InvalidId> {
        match &self.ids {
            Some(codec) => codec.decode(raw).map(|message_id| FileId(message_id.to_string())),
            None if raw.is_empty() => Err(InvalidId::new(raw, "empty id")),
            None => Ok(FileId::from(raw)),
        }
    }
}
