use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{history, recognition};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api/v1",
            Router::new()
                .merge(recognition::router())
                .merge(history::router())
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod app_tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use tower::ServiceExt;

    use crate::history::dto::HistoryEntry;
    use crate::recognition::mock::MOCK_FOOD_NAMES;

    const BOUNDARY: &str = "nutriscan-test-boundary";

    fn multipart_request(field: &str, body: &[u8]) -> Request<Body> {
        let mut payload = Vec::new();
        payload.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"dinner.png\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        payload.extend_from_slice(body);
        payload.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/api/v1/scans")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(payload))
            .unwrap()
    }

    async fn json<T: serde::de::DeserializeOwned>(res: axum::response::Response) -> T {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let app = build_app(AppState::fake());
        let res = app
            .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn scan_records_history_entry() {
        let state = AppState::fake();
        let app = build_app(state.clone());

        let res = app
            .clone()
            .oneshot(multipart_request("image", b"\x89PNGfake"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let entry: HistoryEntry = json(res).await;
        assert!(MOCK_FOOD_NAMES.contains(&entry.result.name.as_str()));
        assert!(entry.image_url.starts_with("data:image/png;base64,"));
        assert!(entry.result.dietary_compatibility.is_some());

        let res = app
            .clone()
            .oneshot(Request::get("/api/v1/history").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let listed: Vec<HistoryEntry> = json(res).await;
        assert_eq!(listed, vec![entry.clone()]);

        let res = app
            .oneshot(
                Request::get(format!("/api/v1/history/{}", entry.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn scan_without_image_is_rejected() {
        let app = build_app(AppState::fake());
        let res = app.oneshot(multipart_request("notes", b"hello")).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn media_and_file_fields_are_accepted() {
        for field in ["media", "file"] {
            let app = build_app(AppState::fake());
            let res = app.oneshot(multipart_request(field, b"\x89PNGfake")).await.unwrap();
            assert_eq!(res.status(), StatusCode::CREATED, "field {field}");
        }
    }

    #[tokio::test]
    async fn empty_image_part_is_rejected() {
        let state = AppState::fake();
        let app = build_app(state.clone());
        let res = app.oneshot(multipart_request("image", b"")).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(state.history.list().await.is_empty());
    }

    struct SigningStorage;

    #[async_trait::async_trait]
    impl crate::storage::StorageClient for SigningStorage {
        async fn put_object(&self, _k: &str, _b: bytes::Bytes, _ct: &str) -> anyhow::Result<()> {
            Ok(())
        }
        async fn presign_get(&self, k: &str, s: u64) -> anyhow::Result<String> {
            Ok(format!("https://bucket.local/{k}?ttl={s}"))
        }
    }

    #[tokio::test]
    async fn stored_scans_are_presigned_on_read() {
        let state = AppState::fake().with_storage(std::sync::Arc::new(SigningStorage));
        let app = build_app(state.clone());

        let res = app
            .clone()
            .oneshot(multipart_request("image", b"\x89PNGfake"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let created: HistoryEntry = json(res).await;
        assert!(created.image_url.starts_with("https://bucket.local/scans/"));

        let stored = state.history.get(created.id).await.unwrap().image_url;
        assert!(stored.starts_with("scans/") && stored.ends_with(".png"));

        let res = app
            .oneshot(Request::get("/api/v1/history").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let listed: Vec<HistoryEntry> = json(res).await;
        assert_eq!(listed[0].image_url, format!("https://bucket.local/{stored}?ttl=1800"));
    }

    #[tokio::test]
    async fn clear_then_missing_entry_is_not_found() {
        let state = AppState::fake();
        let app = build_app(state.clone());
        let entry = state
            .history
            .record("x".into(), crate::recognition::mock::random_mock_food())
            .await;

        let res = app
            .clone()
            .oneshot(
                Request::delete("/api/v1/history")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NO_CONTENT);

        let res = app
            .oneshot(
                Request::get(format!("/api/v1/history/{}", entry.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
