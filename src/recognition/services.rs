use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};

use super::dto::{RecognitionResult, ScanImage};
use super::mapper::map_payload;
use super::mock::random_mock_food;
use super::provider::RecognitionClient;
use crate::advisory::{allergens::AllergenAdvisor, compatibility::CompatibilityAdvisor};
use crate::error::RecognitionError;

/// Runs one scan: recognition, mapping, then allergen and compatibility
/// enrichment. Every stage degrades instead of failing.
#[derive(Clone)]
pub struct Recognizer {
    provider: Option<Arc<dyn RecognitionClient>>,
    allergens: AllergenAdvisor,
    compatibility: CompatibilityAdvisor,
    fallback_delay: Duration,
}

impl Recognizer {
    pub fn new(
        provider: Option<Arc<dyn RecognitionClient>>,
        allergens: AllergenAdvisor,
        compatibility: CompatibilityAdvisor,
        fallback_delay: Duration,
    ) -> Self {
        Self {
            provider,
            allergens,
            compatibility,
            fallback_delay,
        }
    }

    #[instrument(skip(self, image), fields(file = %image.file_name, bytes = image.body.len()))]
    pub async fn recognize(&self, image: &ScanImage) -> RecognitionResult {
        let mut result = match self.identify(image).await {
            Ok(result) => {
                info!(food = %result.name, score = result.score, "food recognized");
                result
            }
            Err(e) => {
                warn!(error = %e, "recognition failed; substituting a mock profile");
                tokio::time::sleep(self.fallback_delay).await;
                random_mock_food()
            }
        };

        let allergens = self.allergens.lookup(&result.name).await;
        let compatibility = self
            .compatibility
            .assess(&result.name, result.nutrition.as_ref(), Some(&allergens))
            .await;

        result.allergen_info = Some(allergens);
        result.dietary_compatibility = Some(compatibility);
        result
    }

    async fn identify(&self, image: &ScanImage) -> Result<RecognitionResult, RecognitionError> {
        let provider = self
            .provider
            .as_ref()
            .ok_or(RecognitionError::MissingCredential)?;
        let payload = provider.recognize(image).await?;
        map_payload(&payload)
    }
}
