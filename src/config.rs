use serde::Deserialize;

const DEFAULT_RECOGNITION_URL: &str =
    "https://api-2445582032290.production.gw.apicast.io/v1/foodrecognition";
const DEFAULT_ADVISORY_URL: &str = "https://api.openai.com";

#[derive(Debug, Clone, Deserialize)]
pub struct RecognitionConfig {
    pub endpoint: String,
    /// Absent key means fallback-only recognition.
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdvisoryConfig {
    pub base_url: String,
    /// Absent key means the advisory adapters only use their local fallbacks.
    pub api_key: Option<String>,
    pub allergen_model: String,
    pub compatibility_model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub recognition: RecognitionConfig,
    pub advisory: AdvisoryConfig,
    pub storage: Option<StorageConfig>,
    pub http_timeout_secs: u64,
    pub fallback_delay_ms: u64,
    pub history_cap: usize,
    pub history_max_bytes: usize,
    pub image_url_ttl_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let storage = match (
            optional("MINIO_ENDPOINT"),
            optional("MINIO_BUCKET"),
            optional("MINIO_ACCESS_KEY"),
            optional("MINIO_SECRET_KEY"),
        ) {
            (Some(endpoint), Some(bucket), Some(access_key), Some(secret_key)) => {
                Some(StorageConfig {
                    endpoint,
                    bucket,
                    access_key,
                    secret_key,
                })
            }
            (None, None, None, None) => None,
            _ => anyhow::bail!(
                "MINIO_ENDPOINT, MINIO_BUCKET, MINIO_ACCESS_KEY and MINIO_SECRET_KEY must be set together"
            ),
        };

        Ok(Self {
            database_url: optional("DATABASE_URL"),
            recognition: RecognitionConfig {
                endpoint: std::env::var("RECOGNITION_API_URL")
                    .unwrap_or_else(|_| DEFAULT_RECOGNITION_URL.into()),
                api_key: optional("RECOGNITION_API_KEY"),
            },
            advisory: AdvisoryConfig {
                base_url: std::env::var("ADVISORY_API_URL")
                    .unwrap_or_else(|_| DEFAULT_ADVISORY_URL.into()),
                api_key: optional("ADVISORY_API_KEY"),
                allergen_model: std::env::var("ALLERGEN_MODEL").unwrap_or_else(|_| "gpt-4o".into()),
                compatibility_model: std::env::var("COMPATIBILITY_MODEL")
                    .unwrap_or_else(|_| "gpt-4.1-2025-04-14".into()),
            },
            storage,
            http_timeout_secs: parsed("HTTP_TIMEOUT_SECS", 30),
            fallback_delay_ms: parsed("FALLBACK_DELAY_MS", 1500),
            history_cap: parsed("HISTORY_CAP", 50),
            history_max_bytes: parsed("HISTORY_MAX_BYTES", 5 * 1024 * 1024),
            image_url_ttl_secs: parsed("IMAGE_URL_TTL_SECS", 7 * 24 * 60 * 60),
        })
    }
}

/// Unset and blank variables are both treated as absent.
fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod config_tests {
    use super::*;

    #[test]
    fn parsed_falls_back_on_garbage() {
        std::env::set_var("NUTRISCAN_TEST_CAP", "not-a-number");
        assert_eq!(parsed::<usize>("NUTRISCAN_TEST_CAP", 50), 50);
        std::env::set_var("NUTRISCAN_TEST_CAP", "12");
        assert_eq!(parsed::<usize>("NUTRISCAN_TEST_CAP", 50), 12);
        std::env::remove_var("NUTRISCAN_TEST_CAP");
    }

    #[test]
    fn blank_credentials_are_absent() {
        std::env::set_var("NUTRISCAN_TEST_KEY", "   ");
        assert_eq!(optional("NUTRISCAN_TEST_KEY"), None);
        std::env::remove_var("NUTRISCAN_TEST_KEY");
    }
}
