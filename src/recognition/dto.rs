use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// An uploaded food photo on its way to the recognition provider.
#[derive(Debug, Clone)]
pub struct ScanImage {
    pub body: Bytes,
    pub file_name: String,
    pub content_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionResult {
    pub name: String,
    /// Normalized to 0..=1.
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutrition: Option<NutritionRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allergen_info: Option<AllergenRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dietary_compatibility: Option<CompatibilityRecord>,
}

/// Macro amounts are always grams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionRecord {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    #[serde(default)]
    pub nutrients: Vec<Nutrient>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nutrient {
    pub name: String,
    pub amount: f64,
    pub unit: String,
}

impl Nutrient {
    pub fn new(name: &str, amount: f64, unit: &str) -> Self {
        Self {
            name: name.to_string(),
            amount,
            unit: unit.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllergenRecord {
    #[serde(default)]
    pub allergens: Vec<String>,
    #[serde(default)]
    pub cautions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompatibilityRecord {
    pub keto: DietStatus,
    pub vegan: DietStatus,
    pub vegetarian: DietStatus,
    pub gluten_free: DietStatus,
    pub diabetic_safe: DietStatus,
    pub heart_healthy: DietStatus,
    pub summary: String,
}

impl CompatibilityRecord {
    pub fn categories(&self) -> [(&'static str, &DietStatus); 6] {
        [
            ("keto", &self.keto),
            ("vegan", &self.vegan),
            ("vegetarian", &self.vegetarian),
            ("glutenFree", &self.gluten_free),
            ("diabeticSafe", &self.diabetic_safe),
            ("heartHealthy", &self.heart_healthy),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DietVerdict {
    Compatible,
    NotCompatible,
    Caution,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DietStatus {
    pub compatible: bool,
    pub status: DietVerdict,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl DietStatus {
    pub fn compatible() -> Self {
        Self {
            compatible: true,
            status: DietVerdict::Compatible,
            reason: None,
        }
    }

    pub fn not_compatible(reason: &str) -> Self {
        Self {
            compatible: false,
            status: DietVerdict::NotCompatible,
            reason: Some(reason.to_string()),
        }
    }

    pub fn caution(reason: &str) -> Self {
        Self {
            compatible: false,
            status: DietVerdict::Caution,
            reason: Some(reason.to_string()),
        }
    }

    /// `compatible` must be true exactly when the verdict is `compatible`.
    pub fn is_consistent(&self) -> bool {
        self.compatible == (self.status == DietVerdict::Compatible)
    }
}

#[cfg(test)]
mod dto_tests {
    use super::*;

    #[test]
    fn result_serializes_camel_case_and_skips_missing() {
        let result = RecognitionResult {
            name: "Apple".into(),
            score: 0.9,
            nutrition: None,
            allergen_info: Some(AllergenRecord::default()),
            dietary_compatibility: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("allergenInfo").is_some());
        assert!(json.get("nutrition").is_none());
        assert!(json.get("dietaryCompatibility").is_none());
    }

    #[test]
    fn diet_verdict_uses_kebab_case() {
        let status = DietStatus::not_compatible("Contains gluten");
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["status"], "not-compatible");
        assert_eq!(json["compatible"], false);
        assert!(status.is_consistent());
    }

    #[test]
    fn inconsistent_status_is_detected() {
        let status = DietStatus {
            compatible: true,
            status: DietVerdict::Caution,
            reason: None,
        };
        assert!(!status.is_consistent());
    }
}
