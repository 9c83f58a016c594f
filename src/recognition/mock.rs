//! Canned food profiles served when the recognition provider is unavailable.

use rand::seq::SliceRandom;

use super::dto::{Nutrient, NutritionRecord, RecognitionResult};

#[cfg(test)]
pub const MOCK_FOOD_NAMES: [&str; 5] = ["Apple", "Banana", "Burger", "Salad", "Pizza"];

pub fn mock_foods() -> Vec<RecognitionResult> {
    vec![
        profile(
            "Apple",
            0.95,
            (52.0, 0.3, 14.0, 0.2),
            vec![
                Nutrient::new("Fiber", 2.4, "g"),
                Nutrient::new("Sugar", 10.3, "g"),
                Nutrient::new("Vitamin C", 4.6, "mg"),
            ],
        ),
        profile(
            "Banana",
            0.92,
            (89.0, 1.1, 22.8, 0.3),
            vec![
                Nutrient::new("Fiber", 2.6, "g"),
                Nutrient::new("Sugar", 12.2, "g"),
                Nutrient::new("Potassium", 358.0, "mg"),
            ],
        ),
        profile(
            "Burger",
            0.94,
            (354.0, 20.0, 29.0, 17.0),
            vec![
                Nutrient::new("Sodium", 497.0, "mg"),
                Nutrient::new("Cholesterol", 45.0, "mg"),
                Nutrient::new("Calcium", 127.0, "mg"),
            ],
        ),
        profile(
            "Salad",
            0.91,
            (89.0, 1.8, 6.9, 6.2),
            vec![
                Nutrient::new("Fiber", 2.3, "g"),
                Nutrient::new("Vitamin A", 146.0, "mcg"),
                Nutrient::new("Vitamin K", 93.0, "mcg"),
            ],
        ),
        profile(
            "Pizza",
            0.93,
            (285.0, 12.0, 36.0, 10.0),
            vec![
                Nutrient::new("Sodium", 640.0, "mg"),
                Nutrient::new("Calcium", 189.0, "mg"),
                Nutrient::new("Iron", 2.3, "mg"),
            ],
        ),
    ]
}

/// Pseudo-random pick. The rng is dropped before returning so callers can
/// hold the result across `.await`.
pub fn random_mock_food() -> RecognitionResult {
    let foods = mock_foods();
    foods
        .choose(&mut rand::thread_rng())
        .cloned()
        .unwrap_or_else(|| foods[0].clone())
}

fn profile(
    name: &str,
    score: f64,
    (calories, protein, carbs, fat): (f64, f64, f64, f64),
    nutrients: Vec<Nutrient>,
) -> RecognitionResult {
    RecognitionResult {
        name: name.to_string(),
        score,
        nutrition: Some(NutritionRecord {
            calories,
            protein,
            carbs,
            fat,
            nutrients,
        }),
        allergen_info: None,
        dietary_compatibility: None,
    }
}
