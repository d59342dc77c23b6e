//! gobhar-axum: Axum adapter for gobhar-blob.
//!
//! Exposes `GET /stream/{id}` and `GET /download/{id}` with single-range
//! support, plus `/` and `/health`.

pub mod app;
pub mod id_codec;
pub mod routes;
pub mod state;
mod error;
pub use error::GobharAxumError;
pub use id_codec::{IdCodec, InvalidId};
pub use state::GatewayState;

pub use app::{gateway_app, GatewayApp};
