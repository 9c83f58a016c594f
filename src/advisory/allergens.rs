use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use super::client::{AdvisoryClient, CompletionParams};
use crate::error::AdvisoryError;
use crate::recognition::dto::AllergenRecord;

/// Known foods, matched in order by case-insensitive substring.
const FALLBACK_TABLE: [(&str, &[&str], &[&str]); 10] = [
    ("Apple", &["Oral Allergy Syndrome"], &["Pesticides"]),
    ("Banana", &["Latex-fruit syndrome"], &["High in sugar"]),
    ("Burger", &["Wheat", "Dairy", "Soy"], &["High fat", "High sodium"]),
    ("Pizza", &["Wheat", "Dairy"], &["High sodium", "High fat"]),
    ("Salad", &[], &["Potential pesticides"]),
    ("Pasta", &["Wheat", "Gluten"], &["High carbohydrates"]),
    ("Chocolate", &["Dairy", "Soy"], &["Caffeine", "High sugar"]),
    ("Sushi", &["Fish", "Shellfish"], &["Raw food"]),
    ("Bread", &["Wheat", "Gluten"], &[]),
    ("Ice Cream", &["Dairy", "Eggs"], &["High sugar"]),
];

const DEFAULT_CAUTION: &str = "Check ingredients list";

#[derive(Clone)]
pub struct AllergenAdvisor {
    client: Option<Arc<dyn AdvisoryClient>>,
    params: CompletionParams,
}

impl AllergenAdvisor {
    pub fn new(client: Option<Arc<dyn AdvisoryClient>>, model: &str) -> Self {
        Self {
            client,
            params: CompletionParams {
                model: model.to_string(),
                temperature: 0.3,
                max_tokens: 150,
            },
        }
    }

    /// Never fails: any network or parse problem yields the static table.
    pub async fn lookup(&self, food_name: &str) -> AllergenRecord {
        let Some(client) = &self.client else {
            return fallback_allergens(food_name);
        };

        let outcome = match client.complete(&prompt(food_name), &self.params).await {
            Ok(content) => parse_allergens(&content),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(record) => {
                debug!(food = %food_name, allergens = record.allergens.len(), "allergen advisory received");
                record
            }
            Err(e) => {
                warn!(error = %e, food = %food_name, "allergen advisory failed; using fallback table");
                fallback_allergens(food_name)
            }
        }
    }
}

fn prompt(food_name: &str) -> String {
    format!(
        "As a nutritional expert, analyze \"{food_name}\" and provide a JSON response with two arrays:\n\
         1. \"allergens\": Common allergens present (e.g., dairy, eggs, nuts, gluten, shellfish, soy)\n\
         2. \"cautions\": Dietary cautions (e.g., high sodium, sulfites, FODMAPs)\n\n\
         Include only relevant, factual information. If uncertain about specific allergens, include only \
         those that are commonly associated with this food. Return only the JSON without explanations."
    )
}

#[derive(Deserialize)]
struct RawAllergens {
    #[serde(default)]
    allergens: Option<Vec<String>>,
    #[serde(default)]
    cautions: Option<Vec<String>>,
}

fn parse_allergens(content: &str) -> Result<AllergenRecord, AdvisoryError> {
    let value: serde_json::Value = serde_json::from_str(content.trim())?;
    if !value.is_object() {
        return Err(AdvisoryError::Invalid("expected a JSON object".into()));
    }
    let raw: RawAllergens = serde_json::from_value(value)?;
    Ok(AllergenRecord {
        allergens: raw.allergens.unwrap_or_default(),
        cautions: raw.cautions.unwrap_or_default(),
    })
}

pub fn fallback_allergens(food_name: &str) -> AllergenRecord {
    let needle = food_name.to_lowercase();
    FALLBACK_TABLE
        .iter()
        .find(|(known, _, _)| needle.contains(&known.to_lowercase()))
        .map(|(_, allergens, cautions)| AllergenRecord {
            allergens: allergens.iter().map(|s| s.to_string()).collect(),
            cautions: cautions.iter().map(|s| s.to_string()).collect(),
        })
        .unwrap_or_else(|| AllergenRecord {
            allergens: Vec::new(),
            cautions: vec![DEFAULT_CAUTION.to_string()],
        })
}
