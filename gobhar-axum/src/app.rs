use axum::{http::header, Router};
use gobhar_blob::GatewayAdapter;
use tokio::net::{TcpListener, ToSocketAddrs};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::{routes, GatewayState, IdCodec};

#[derive(Clone)]
pub struct GatewayApp {
    pub state: GatewayState,
    pub router: Router<()>,
}

impl GatewayApp {
    pub fn new(gateway: GatewayAdapter) -> Self {
        Self::from_state(GatewayState::new(gateway))
    }

    /// Accept obfuscated ids in paths instead of raw ones
    pub fn with_id_codec(self, codec: IdCodec) -> Self {
        Self::from_state(self.state.with_id_codec(codec))
    }

    fn from_state(state: GatewayState) -> Self {
        let router = routes::gateway_router(state.clone())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any)
                    .expose_headers([
                        header::CONTENT_RANGE,
                        header::ACCEPT_RANGES,
                        header::CONTENT_LENGTH,
                        header::CONTENT_DISPOSITION,
                    ]),
            );
        Self { state, router }
    }

    pub async fn listen<A>(self, addr: A) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "gateway listening");
        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

pub fn gateway_app(gateway: GatewayAdapter) -> GatewayApp {
    GatewayApp::new(gateway)
}
