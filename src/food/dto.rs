use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::history::{FoodRecord, MacroTargets, MacroValues};

/// One stored food item on the wire. Field names follow the mobile client's
/// JSON contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodItemDto {
    pub id: Uuid,
    pub name: String,
    pub calories: f64,
    pub carbs: f64,
    pub fat: f64,
    pub protein: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<FoodItemDto> for FoodRecord {
    fn from(dto: FoodItemDto) -> Self {
        FoodRecord {
            id: dto.id,
            name: dto.name,
            macros: MacroValues {
                calories: dto.calories,
                carbs: dto.carbs,
                fat: dto.fat,
                protein: dto.protein,
            },
            created_at: dto.created_at,
        }
    }
}

/// One capture event's items, as nested in the history payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDto {
    pub food_items: Vec<FoodItemDto>,
}

/// `GET /user-food-history` payload: the four targets plus every capture
/// with its items, newest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodHistory {
    pub calorie_target: Option<f64>,
    pub protein_target: Option<f64>,
    pub carb_target: Option<f64>,
    pub fat_target: Option<f64>,
    #[serde(default)]
    pub images: Vec<ImageDto>,
}

impl FoodHistory {
    pub fn targets(&self) -> MacroTargets {
        MacroTargets {
            calories: self.calorie_target,
            protein: self.protein_target,
            carbs: self.carb_target,
            fat: self.fat_target,
        }
    }

    /// Flatten captures into the record list the aggregation pipeline takes.
    pub fn into_records(self) -> Vec<FoodRecord> {
        self.images
            .into_iter()
            .flat_map(|image| image.food_items)
            .map(FoodRecord::from)
            .collect()
    }
}

/// Envelope every endpoint responds with; clients read `data`.
#[derive(Debug, Serialize, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub image: String,
}

/// The capture created by an analyze call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureDto {
    pub id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub food_items: Vec<FoodItemDto>,
}

/// `POST /update-targets` body, matching the home screen's save payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct TargetsRequest {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetsDto {
    pub calorie_target: Option<f64>,
    pub protein_target: Option<f64>,
    pub carb_target: Option<f64>,
    pub fat_target: Option<f64>,
}

/// `POST /update-macros` body: one record's corrected values.
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateMacrosRequest {
    pub id: Uuid,
    pub calories: f64,
    pub carbs: f64,
    pub fat: f64,
    pub protein: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn history_serializes_with_camel_case_keys() {
        let history = FoodHistory {
            calorie_target: Some(2000.0),
            protein_target: Some(150.0),
            carb_target: None,
            fat_target: Some(65.0),
            images: vec![ImageDto {
                food_items: vec![FoodItemDto {
                    id: Uuid::nil(),
                    name: "Chicken Salad".into(),
                    calories: 320.0,
                    carbs: 10.0,
                    fat: 15.0,
                    protein: 25.0,
                    created_at: datetime!(2024 - 03 - 20 12:30 UTC),
                }],
            }],
        };

        let json = serde_json::to_value(&history).unwrap();
        assert_eq!(json["calorieTarget"], 2000.0);
        assert!(json["carbTarget"].is_null());
        let item = &json["images"][0]["foodItems"][0];
        assert_eq!(item["name"], "Chicken Salad");
        assert_eq!(item["createdAt"], "2024-03-20T12:30:00Z");
    }

    #[test]
    fn history_round_trips_through_the_envelope() {
        let raw = r#"{
            "data": {
                "calorieTarget": 2000,
                "proteinTarget": null,
                "carbTarget": 250,
                "fatTarget": 65,
                "images": [
                    { "foodItems": [
                        { "id": "00000000-0000-0000-0000-000000000001",
                          "name": "Yogurt", "calories": 200, "carbs": 25,
                          "fat": 5, "protein": 15,
                          "createdAt": "2024-03-19T08:00:00Z" }
                    ] }
                ]
            }
        }"#;

        let envelope: DataEnvelope<FoodHistory> = serde_json::from_str(raw).unwrap();
        let history = envelope.data;
        assert_eq!(history.targets().calories, Some(2000.0));
        assert_eq!(history.targets().protein, None);

        let records = history.into_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Yogurt");
        assert_eq!(records[0].macros.carbs, 25.0);
    }

    #[test]
    fn missing_images_key_means_no_records() {
        let history: FoodHistory = serde_json::from_str(
            r#"{"calorieTarget":null,"proteinTarget":null,"carbTarget":null,"fatTarget":null}"#,
        )
        .unwrap();
        assert!(history.into_records().is_empty());
    }
}
