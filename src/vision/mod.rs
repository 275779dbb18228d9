mod anthropic;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use anthropic::AnthropicVision;
pub(crate) use anthropic::split_data_url;

/// One estimated item from the vision model. Missing numeric fields come
/// back as 0 so the rest of the pipeline never sees nulls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodEstimate {
    pub name: String,
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub fat: f64,
    #[serde(default)]
    pub protein: f64,
}

/// The model's verdict for one image. `food_items: None` means no food was
/// detected (or the reply could not be understood).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodScan {
    #[serde(default)]
    pub food_items: Option<Vec<FoodEstimate>>,
}

impl FoodScan {
    pub fn items(&self) -> &[FoodEstimate] {
        self.food_items.as_deref().unwrap_or(&[])
    }
}

#[async_trait]
pub trait VisionClient: Send + Sync {
    /// Estimate the food in a base64 data-URL image.
    async fn analyze_image(&self, data_url: &str) -> anyhow::Result<FoodScan>;
}
