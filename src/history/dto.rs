use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::recognition::dto::RecognitionResult;

/// One past scan. Serialized as part of the single history blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: Uuid,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub image_url: String,
    pub result: RecognitionResult,
}
