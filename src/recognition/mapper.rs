//! Maps a recognition provider payload into a [`RecognitionResult`].
//!
//! The provider reports nutrition in SI units (kilograms per serving), so
//! macros are scaled to grams and the optional nutrients to whatever unit a
//! reader expects on a label.

use std::collections::HashMap;

use serde::Deserialize;

use super::dto::{Nutrient, NutritionRecord, RecognitionResult};
use crate::error::RecognitionError;

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderPayload {
    #[serde(default)]
    pub results: Option<Vec<ResultGroup>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResultGroup {
    #[serde(default)]
    pub items: Vec<ScoredItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoredItem {
    #[serde(default)]
    pub name: Option<String>,
    /// 0..=100 as reported by the provider.
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub nutrition: Option<HashMap<String, serde_json::Value>>,
}

/// (provider key, display name, multiplier, unit). Order is output order.
const NUTRIENT_TABLE: [(&str, &str, f64, &str); 12] = [
    ("saturatedFat", "Saturated Fat", 1e3, "g"),
    ("cholesterol", "Cholesterol", 1e3, "mg"),
    ("sodium", "Sodium", 1e3, "mg"),
    ("dietaryFiber", "Fiber", 1e3, "g"),
    ("sugars", "Sugar", 1e3, "g"),
    ("monounsaturatedFat", "Monounsaturated Fat", 1e3, "g"),
    ("polyunsaturatedFat", "Polyunsaturated Fat", 1e3, "g"),
    ("vitaminA", "Vitamin A", 1e6, "mcg"),
    ("vitaminC", "Vitamin C", 1e6, "mcg"),
    ("iron", "Iron", 1e6, "mg"),
    ("potassium", "Potassium", 1e3, "mg"),
    ("calcium", "Calcium", 1e6, "mg"),
];

const KG_TO_G: f64 = 1000.0;

pub fn map_payload(payload: &ProviderPayload) -> Result<RecognitionResult, RecognitionError> {
    let group = payload
        .results
        .as_deref()
        .and_then(|groups| groups.first())
        .ok_or(RecognitionError::NoFoodRecognized)?;

    let best = pick_best(&group.items).ok_or(RecognitionError::NoFoodRecognized)?;

    let empty = HashMap::new();
    let raw = best.nutrition.as_ref().unwrap_or(&empty);
    let field = |key: &str| raw.get(key).and_then(serde_json::Value::as_f64);

    let nutrients = NUTRIENT_TABLE
        .iter()
        .filter_map(|&(key, name, factor, unit)| {
            field(key).map(|value| Nutrient::new(name, round2(value * factor), unit))
        })
        .collect();

    let nutrition = NutritionRecord {
        calories: field("calories").unwrap_or(0.0),
        protein: field("protein").unwrap_or(0.0) * KG_TO_G,
        carbs: field("totalCarbs").unwrap_or(0.0) * KG_TO_G,
        fat: field("totalFat").unwrap_or(0.0) * KG_TO_G,
        nutrients,
    };

    Ok(RecognitionResult {
        name: best
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| "Unknown Food".to_string()),
        score: best.score / 100.0,
        nutrition: Some(nutrition),
        allergen_info: None,
        dietary_compatibility: None,
    })
}

/// Highest score wins; ties keep the earliest item.
fn pick_best(items: &[ScoredItem]) -> Option<&ScoredItem> {
    items.iter().fold(None, |best, item| match best {
        Some(b) if item.score <= b.score => Some(b),
        _ => Some(item),
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
