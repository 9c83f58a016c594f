//! Allergen and dietary-compatibility enrichment. Both adapters ask a
//! language model first and fall back to local data; neither ever fails.

pub mod allergens;
pub mod client;
pub mod compatibility;
