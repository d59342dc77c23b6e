//! StreamGobhar server: wires a file directory into the range-streaming
//! gateway and serves it over HTTP.

pub mod config;

use anyhow::{Context, Result};
use gobhar_axum::{gateway_app, GatewayApp, IdCodec};
use gobhar_blob::{DirectoryStore, GatewayAdapter};

pub use config::ServerConfig;

pub fn build(config: &ServerConfig) -> Result<GatewayApp> {
    if !config.store_dir.is_dir() {
        tracing::warn!(
            store_dir = %config.store_dir.display(),
            "store directory does not exist; every file will be not found"
        );
    }

    let store = DirectoryStore::new(&config.store_dir);
    let gateway = GatewayAdapter::from_store(store, config.gateway.clone())
        .context("failed to build gateway")?;

    let app = gateway_app(gateway);
    Ok(match config.secret {
        Some(secret) => app.with_id_codec(IdCodec::new(secret)),
        None => app,
    })
}

/// Public link for a file stored under a numeric message id
pub fn public_link(config: &ServerConfig, endpoint: &str, message_id: u64) -> String {
    let id = match config.secret {
        Some(secret) => IdCodec::new(secret).encode(message_id),
        None => message_id.to_string(),
    };
    format!("{}/{endpoint}/{id}", config.base_url)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;

    fn config(pairs: &[(&'static str, &'static str)]) -> ServerConfig {
        ServerConfig::from_lookup(|key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        })
        .unwrap()
    }

    #[test]
    fn links_use_obfuscated_ids() {
        let cfg = config(&[("BASE_URL", "https://gobhar.example"), ("SECRET_KEY", "default")]);
        assert_eq!(
            public_link(&cfg, "stream", 123),
            "https://gobhar.example/stream/2c441308"
        );
    }

    #[test]
    fn links_use_raw_ids_without_secret() {
        let cfg = config(&[("BASE_URL", "https://gobhar.example")]);
        assert_eq!(
            public_link(&cfg, "download", 123),
            "https://gobhar.example/download/123"
        );
    }

    #[test]
    fn builds_against_missing_directory() {
        let cfg = config(&[("STORE_DIR", "/nonexistent/gobhar")]);
        assert!(build(&cfg).is_ok());
    }

    #[tokio::test]
    async fn default_config_serves_files_by_name() {
        let dir = std::env::temp_dir().join(format!("gobhar-server-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("clip.webm"), b"0123456789").unwrap();

        let store_dir = dir.to_string_lossy().into_owned();
        let cfg = ServerConfig::from_lookup(|key| (key == "STORE_DIR").then(|| store_dir.clone()))
            .unwrap();
        let app = build(&cfg).unwrap();

        let res = app
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/stream/clip.webm")
                    .header("range", "bytes=2-5")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(res.headers()["content-type"], "video/webm");
        assert_eq!(res.headers()["content-range"], "bytes 2-5/10");
        let body = res.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"2345");

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
