use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use crate::advisory::{
    allergens::AllergenAdvisor,
    client::{AdvisoryClient, ChatCompletionsClient},
    compatibility::CompatibilityAdvisor,
};
use crate::config::AppConfig;
use crate::history::{
    repo::{HistoryStore, MemoryHistoryStore, PgHistoryStore},
    services::HistoryService,
};
use crate::recognition::{
    provider::{CalorieMamaClient, RecognitionClient},
    services::Recognizer,
};
use crate::storage::{Storage, StorageClient};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub recognizer: Arc<Recognizer>,
    pub history: Arc<HistoryService>,
    pub storage: Option<Arc<dyn StorageClient>>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);
        let timeout = Duration::from_secs(config.http_timeout_secs);

        let provider = match &config.recognition.api_key {
            Some(key) => Some(Arc::new(CalorieMamaClient::new(
                &config.recognition.endpoint,
                key,
                timeout,
            )?) as Arc<dyn RecognitionClient>),
            None => {
                tracing::warn!("RECOGNITION_API_KEY not set; every scan will use mock food profiles");
                None
            }
        };

        let advisor = match &config.advisory.api_key {
            Some(key) => Some(Arc::new(ChatCompletionsClient::new(
                &config.advisory.base_url,
                key,
                timeout,
            )?) as Arc<dyn AdvisoryClient>),
            None => {
                tracing::warn!("ADVISORY_API_KEY not set; allergen and diet advice use local fallbacks");
                None
            }
        };

        let recognizer = Recognizer::new(
            provider,
            AllergenAdvisor::new(advisor.clone(), &config.advisory.allergen_model),
            CompatibilityAdvisor::new(advisor, &config.advisory.compatibility_model),
            Duration::from_millis(config.fallback_delay_ms),
        );

        let store: Arc<dyn HistoryStore> = match &config.database_url {
            Some(url) => {
                let db = sqlx::postgres::PgPoolOptions::new()
                    .max_connections(10)
                    .connect(url)
                    .await
                    .context("connect to database")?;

                if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
                    tracing::warn!(error = %e, "migration failed; continuing");
                }
                Arc::new(PgHistoryStore::new(db, config.history_max_bytes))
            }
            None => {
                tracing::warn!("DATABASE_URL not set; history is kept in memory only");
                Arc::new(MemoryHistoryStore::new(config.history_max_bytes))
            }
        };

        let storage = match &config.storage {
            Some(cfg) => Some(Arc::new(Storage::new(cfg, "us-east-1").await?) as Arc<dyn StorageClient>),
            None => None,
        };

        Ok(Self {
            history: Arc::new(HistoryService::new(store, config.history_cap)),
            recognizer: Arc::new(recognizer),
            storage,
            config,
        })
    }

    /// Offline state: no credentials, in-memory history, no fallback delay.
    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::config::{AdvisoryConfig, RecognitionConfig};

        let config = Arc::new(AppConfig {
            database_url: None,
            recognition: RecognitionConfig {
                endpoint: "http://fake.local/v1/foodrecognition".into(),
                api_key: None,
            },
            advisory: AdvisoryConfig {
                base_url: "http://fake.local".into(),
                api_key: None,
                allergen_model: "test".into(),
                compatibility_model: "test".into(),
            },
            storage: None,
            http_timeout_secs: 5,
            fallback_delay_ms: 0,
            history_cap: 50,
            history_max_bytes: 1 << 20,
            image_url_ttl_secs: 1800,
        });

        let recognizer = Recognizer::new(
            None,
            AllergenAdvisor::new(None, "test"),
            CompatibilityAdvisor::new(None, "test"),
            Duration::ZERO,
        );
        let store = Arc::new(MemoryHistoryStore::new(config.history_max_bytes));

        Self {
            history: Arc::new(HistoryService::new(store, config.history_cap)),
            recognizer: Arc::new(recognizer),
            storage: None,
            config,
        }
    }

    #[cfg(test)]
    pub fn with_storage(mut self, storage: Arc<dyn StorageClient>) -> Self {
        self.storage = Some(storage);
        self
    }
}
