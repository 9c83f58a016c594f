//! Single-key blob stores backing the scan history.

use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::RwLock;

pub const HISTORY_KEY: &str = "nutriscan_history";

#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn load(&self) -> anyhow::Result<Option<String>>;
    /// Fails when the blob is larger than the store's quota.
    async fn save(&self, blob: String) -> anyhow::Result<()>;
    async fn remove(&self) -> anyhow::Result<()>;
}

fn check_quota(blob: &str, max_bytes: usize) -> anyhow::Result<()> {
    anyhow::ensure!(
        blob.len() <= max_bytes,
        "history blob of {} bytes exceeds quota of {} bytes",
        blob.len(),
        max_bytes
    );
    Ok(())
}

/// One row of the `kv_store` table.
#[derive(Clone)]
pub struct PgHistoryStore {
    db: PgPool,
    max_bytes: usize,
}

impl PgHistoryStore {
    pub fn new(db: PgPool, max_bytes: usize) -> Self {
        Self { db, max_bytes }
    }
}

#[async_trait]
impl HistoryStore for PgHistoryStore {
    async fn load(&self) -> anyhow::Result<Option<String>> {
        let value = sqlx::query_scalar::<_, String>(
            r#"
            SELECT value::text
              FROM kv_store
             WHERE key = $1
            "#,
        )
        .bind(HISTORY_KEY)
        .fetch_optional(&self.db)
        .await
        .context("load history blob")?;
        Ok(value)
    }

    async fn save(&self, blob: String) -> anyhow::Result<()> {
        check_quota(&blob, self.max_bytes)?;
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES ($1, $2::jsonb, now())
            ON CONFLICT (key) DO UPDATE
               SET value = EXCLUDED.value,
                   updated_at = now()
            "#,
        )
        .bind(HISTORY_KEY)
        .bind(blob)
        .execute(&self.db)
        .await
        .context("save history blob")?;
        Ok(())
    }

    async fn remove(&self) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM kv_store WHERE key = $1")
            .bind(HISTORY_KEY)
            .execute(&self.db)
            .await
            .context("remove history blob")?;
        Ok(())
    }
}

/// In-process store, used without a database and in tests.
pub struct MemoryHistoryStore {
    blob: RwLock<Option<String>>,
    max_bytes: usize,
}

impl MemoryHistoryStore {
    pub fn new(max_bytes: usize) -> Self {
        Self {
            blob: RwLock::new(None),
            max_bytes,
        }
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn load(&self) -> anyhow::Result<Option<String>> {
        Ok(self.blob.read().await.clone())
    }

    async fn save(&self, blob: String) -> anyhow::Result<()> {
        check_quota(&blob, self.max_bytes)?;
        *self.blob.write().await = Some(blob);
        Ok(())
    }

    async fn remove(&self) -> anyhow::Result<()> {
        *self.blob.write().await = None;
        Ok(())
    }
}

#[cfg(test)]
mod store_tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_roundtrips_and_removes() {
        let store = MemoryHistoryStore::new(1024);
        assert_eq!(store.load().await.unwrap(), None);
        store.save("[]".into()).await.unwrap();
        assert_eq!(store.load().await.unwrap().as_deref(), Some("[]"));
        store.remove().await.unwrap();
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn oversized_write_is_rejected_and_keeps_old_blob() {
        let store = MemoryHistoryStore::new(8);
        store.save("[1]".into()).await.unwrap();
        let err = store.save("[1,2,3,4,5,6]".into()).await.unwrap_err();
        assert!(err.to_string().contains("exceeds quota"));
        assert_eq!(store.load().await.unwrap().as_deref(), Some("[1]"));
    }
}
