use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use super::client::{AdvisoryClient, CompletionParams};
use crate::error::AdvisoryError;
use crate::recognition::dto::{AllergenRecord, CompatibilityRecord, DietStatus, NutritionRecord};

const SUMMARY_MAX_CHARS: usize = 100;
const HIGH_CARBS_G: f64 = 20.0;
const HIGH_FAT_G: f64 = 15.0;

#[derive(Clone)]
pub struct CompatibilityAdvisor {
    client: Option<Arc<dyn AdvisoryClient>>,
    params: CompletionParams,
}

impl CompatibilityAdvisor {
    pub fn new(client: Option<Arc<dyn AdvisoryClient>>, model: &str) -> Self {
        Self {
            client,
            params: CompletionParams {
                model: model.to_string(),
                temperature: 0.3,
                max_tokens: 300,
            },
        }
    }

    /// Never fails: an unusable model answer is replaced by the local rules.
    pub async fn assess(
        &self,
        food_name: &str,
        nutrition: Option<&NutritionRecord>,
        allergens: Option<&AllergenRecord>,
    ) -> CompatibilityRecord {
        let Some(client) = &self.client else {
            return fallback_compatibility(nutrition, allergens);
        };

        let prompt = prompt(food_name, nutrition, allergens);
        let outcome = match client.complete(&prompt, &self.params).await {
            Ok(content) => parse_compatibility(&content),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(record) => {
                debug!(food = %food_name, summary = %record.summary, "compatibility advisory received");
                record
            }
            Err(e) => {
                warn!(error = %e, food = %food_name, "compatibility advisory failed; using local rules");
                fallback_compatibility(nutrition, allergens)
            }
        }
    }
}

fn prompt(
    food_name: &str,
    nutrition: Option<&NutritionRecord>,
    allergens: Option<&AllergenRecord>,
) -> String {
    let nutrition_text = match nutrition {
        Some(n) => format!(
            "Calories: {}, Protein: {}g, Carbs: {}g, Fat: {}g",
            n.calories, n.protein, n.carbs, n.fat
        ),
        None => "Nutrition data not available".to_string(),
    };
    let allergen_text = match allergens {
        Some(a) if !a.allergens.is_empty() => format!("Allergens: {}", a.allergens.join(", ")),
        _ => "No known allergens".to_string(),
    };

    format!(
        r#"Analyze the dietary compatibility of "{food_name}" based on:
- Nutrition: {nutrition_text}
- {allergen_text}

Return a JSON response with:
1. Boolean compatibility for: keto, vegan, vegetarian, glutenFree, diabeticSafe, heartHealthy
2. Status for each: "compatible", "not-compatible", or "caution"
3. Brief reason for non-compatible items
4. A summary message (max 100 characters)

Format:
{{
  "keto": {{"compatible": true, "status": "compatible"}},
  "vegan": {{"compatible": false, "status": "not-compatible", "reason": "Contains dairy"}},
  "vegetarian": {{"compatible": true, "status": "compatible"}},
  "glutenFree": {{"compatible": true, "status": "compatible"}},
  "diabeticSafe": {{"compatible": false, "status": "caution", "reason": "High carbs"}},
  "heartHealthy": {{"compatible": true, "status": "compatible"}},
  "summary": "High protein, keto-friendly but contains dairy"
}}"#
    )
}

/// Strict parse of the model's answer, then the per-category invariant check.
fn parse_compatibility(content: &str) -> Result<CompatibilityRecord, AdvisoryError> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Raw {
        keto: DietStatus,
        vegan: DietStatus,
        vegetarian: DietStatus,
        gluten_free: DietStatus,
        diabetic_safe: DietStatus,
        heart_healthy: DietStatus,
        summary: String,
    }

    let raw: Raw = serde_json::from_str(content.trim())?;
    let record = CompatibilityRecord {
        keto: raw.keto,
        vegan: raw.vegan,
        vegetarian: raw.vegetarian,
        gluten_free: raw.gluten_free,
        diabetic_safe: raw.diabetic_safe,
        heart_healthy: raw.heart_healthy,
        summary: raw.summary.chars().take(SUMMARY_MAX_CHARS).collect(),
    };

    if let Some((name, _)) = record.categories().into_iter().find(|(_, s)| !s.is_consistent()) {
        return Err(AdvisoryError::Invalid(format!(
            "{name}: compatible flag disagrees with status"
        )));
    }
    Ok(record)
}

fn mentions(allergens: Option<&AllergenRecord>, needles: &[&str]) -> bool {
    allergens.is_some_and(|a| {
        a.allergens.iter().any(|allergen| {
            let allergen = allergen.to_lowercase();
            needles.iter().any(|n| allergen.contains(n))
        })
    })
}

/// Deterministic rules derived from the facts already at hand.
pub fn fallback_compatibility(
    nutrition: Option<&NutritionRecord>,
    allergens: Option<&AllergenRecord>,
) -> CompatibilityRecord {
    let high_carbs = nutrition.is_some_and(|n| n.carbs > HIGH_CARBS_G);
    let high_fat = nutrition.is_some_and(|n| n.fat > HIGH_FAT_G);
    let has_dairy = mentions(allergens, &["dairy", "milk"]);
    let has_animal_products = has_dairy || mentions(allergens, &["egg", "meat", "fish"]);
    let has_meat_or_fish = mentions(allergens, &["meat", "fish"]);
    let has_gluten = mentions(allergens, &["gluten", "wheat"]);

    let keto = if high_carbs {
        DietStatus::not_compatible("High in carbohydrates")
    } else if !high_fat {
        DietStatus::caution("Not high enough in fat")
    } else {
        DietStatus::compatible()
    };

    let vegan = if has_animal_products {
        DietStatus::not_compatible("Contains animal products")
    } else {
        DietStatus::compatible()
    };

    let vegetarian = if has_meat_or_fish {
        DietStatus::not_compatible("Contains meat or fish")
    } else {
        DietStatus::compatible()
    };

    let gluten_free = if has_gluten {
        DietStatus::not_compatible("Contains gluten")
    } else {
        DietStatus::compatible()
    };

    let diabetic_safe = if high_carbs {
        DietStatus::caution("High in carbohydrates")
    } else {
        DietStatus::compatible()
    };

    // TODO: heartHealthy has no rule yet (always compatible); needs a
    // product decision on saturated fat / sodium thresholds.
    let heart_healthy = DietStatus::compatible();

    let summary = format!(
        "{}, {}",
        if has_animal_products { "Not vegan" } else { "Plant-based" },
        if high_carbs { "high carb" } else { "low carb" }
    );

    CompatibilityRecord {
        keto,
        vegan,
        vegetarian,
        gluten_free,
        diabetic_safe,
        heart_healthy,
        summary,
    }
}
