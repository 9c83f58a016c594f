use anyhow::Context;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::warn;
use uuid::Uuid;

use crate::history::dto::HistoryEntry;
use crate::recognition::dto::ScanImage;
use crate::state::AppState;

const SCAN_KEY_PREFIX: &str = "scans/";

/// Returns the image reference recorded in history: the object key when
/// storage is configured, otherwise an inline data URL. Keys are turned
/// into URLs on read by [`resolve_image_url`].
pub async fn store_scan_image(st: &AppState, image: &ScanImage) -> String {
    if st.storage.is_some() {
        match upload(st, image).await {
            Ok(key) => return key,
            Err(e) => warn!(error = %e, "scan image upload failed; inlining it instead"),
        }
    }
    data_url(image)
}

async fn upload(st: &AppState, image: &ScanImage) -> anyhow::Result<String> {
    let storage = st.storage.as_ref().context("storage not configured")?;
    let ext = ext_from_mime(&image.content_type).unwrap_or("bin");
    let key = format!("{}{}.{}", SCAN_KEY_PREFIX, Uuid::new_v4(), ext);
    storage
        .put_object(&key, image.body.clone(), &image.content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;
    Ok(key)
}

/// Presigns stored object keys; inline data URLs pass through. On presign
/// failure the key is returned unchanged.
pub async fn resolve_image_url(st: &AppState, stored: &str) -> String {
    let Some(storage) = st.storage.as_ref() else {
        return stored.to_string();
    };
    if !stored.starts_with(SCAN_KEY_PREFIX) {
        return stored.to_string();
    }
    match storage
        .presign_get(stored, st.config.image_url_ttl_secs)
        .await
        .with_context(|| format!("presign url for {}", stored))
    {
        Ok(url) => url,
        Err(e) => {
            warn!(error = %e, key = %stored, "presign failed; returning the object key");
            stored.to_string()
        }
    }
}

pub async fn with_fresh_image_url(st: &AppState, mut entry: HistoryEntry) -> HistoryEntry {
    entry.image_url = resolve_image_url(st, &entry.image_url).await;
    entry
}

fn data_url(image: &ScanImage) -> String {
    format!("data:{};base64,{}", image.content_type, STANDARD.encode(&image.body))
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

#[cfg(test)]
mod image_tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use bytes::Bytes;

    use super::*;
    use crate::storage::StorageClient;

    fn image(ct: &str) -> ScanImage {
        ScanImage {
            body: Bytes::from_static(b"hi"),
            file_name: "x".into(),
            content_type: ct.into(),
        }
    }

    #[derive(Default)]
    struct RecordingStorage {
        keys: Mutex<Vec<String>>,
        fail: bool,
        fail_presign: bool,
        presigned: AtomicUsize,
    }

    #[async_trait]
    impl StorageClient for RecordingStorage {
        async fn put_object(&self, k: &str, _b: Bytes, _ct: &str) -> anyhow::Result<()> {
            anyhow::ensure!(!self.fail, "bucket unavailable");
            self.keys.lock().unwrap().push(k.to_string());
            Ok(())
        }
        async fn presign_get(&self, k: &str, s: u64) -> anyhow::Result<String> {
            anyhow::ensure!(!self.fail_presign, "signer unavailable");
            let n = self.presigned.fetch_add(1, Ordering::SeqCst);
            Ok(format!("https://fake.local/{}?ttl={}&sig={}", k, s, n))
        }
    }

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("image/webp"), Some("webp"));
        assert_eq!(ext_from_mime("image/heic"), Some("heic"));
        assert_eq!(ext_from_mime("application/octet-stream"), None);
    }

    #[tokio::test]
    async fn without_storage_the_image_is_inlined() {
        let state = AppState::fake();
        let url = store_scan_image(&state, &image("image/png")).await;
        assert_eq!(url, "data:image/png;base64,aGk=");
        assert_eq!(resolve_image_url(&state, &url).await, url);
    }

    #[tokio::test]
    async fn with_storage_the_object_key_is_recorded() {
        let storage = Arc::new(RecordingStorage::default());
        let state = AppState::fake().with_storage(storage.clone());
        let stored = store_scan_image(&state, &image("image/webp")).await;

        let keys = storage.keys.lock().unwrap().clone();
        assert_eq!(keys, vec![stored.clone()]);
        assert!(stored.starts_with("scans/") && stored.ends_with(".webp"));
        assert_eq!(storage.presigned.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn presign_failure_leaves_no_orphaned_upload() {
        let storage = Arc::new(RecordingStorage {
            fail_presign: true,
            ..Default::default()
        });
        let state = AppState::fake().with_storage(storage.clone());
        let stored = store_scan_image(&state, &image("image/png")).await;

        assert_eq!(*storage.keys.lock().unwrap(), vec![stored.clone()]);
        assert_eq!(resolve_image_url(&state, &stored).await, stored);
    }

    #[tokio::test]
    async fn entry_read_back_gets_a_fresh_url() {
        let storage = Arc::new(RecordingStorage::default());
        let state = AppState::fake().with_storage(storage.clone());
        let stored = store_scan_image(&state, &image("image/jpeg")).await;
        let entry = state
            .history
            .record(stored.clone(), crate::recognition::mock::random_mock_food())
            .await;

        let first = with_fresh_image_url(&state, state.history.get(entry.id).await.unwrap()).await;
        let second = with_fresh_image_url(&state, state.history.get(entry.id).await.unwrap()).await;

        let expected = format!("https://fake.local/{}?ttl=1800", stored);
        assert!(first.image_url.starts_with(&expected));
        assert!(second.image_url.starts_with(&expected));
        assert_ne!(first.image_url, second.image_url);
        assert_eq!(state.history.get(entry.id).await.unwrap().image_url, stored);
    }

    #[tokio::test]
    async fn storage_failure_falls_back_to_inline() {
        let storage = Arc::new(RecordingStorage {
            fail: true,
            ..Default::default()
        });
        let state = AppState::fake().with_storage(storage);
        let url = store_scan_image(&state, &image("image/jpeg")).await;
        assert!(url.starts_with("data:image/jpeg;base64,"));
        assert_eq!(resolve_image_url(&state, &url).await, url);
    }
}
