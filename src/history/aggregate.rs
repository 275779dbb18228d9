use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime, UtcOffset};
use uuid::Uuid;

use super::label::{day_label, local_date};

/// One logged food item as the pipeline sees it, regardless of which
/// capture it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodRecord {
    pub id: Uuid,
    pub name: String,
    pub macros: MacroValues,
    pub created_at: OffsetDateTime,
}

/// Calories, carbs, fat and protein carried as one unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroValues {
    pub calories: f64,
    pub carbs: f64,
    pub fat: f64,
    pub protein: f64,
}

impl MacroValues {
    fn accumulate(&mut self, other: MacroValues) {
        self.calories += other.calories;
        self.carbs += other.carbs;
        self.fat += other.fat;
        self.protein += other.protein;
    }
}

/// Daily goals; a missing value means the user never set one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroTargets {
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
}

/// Percent-of-target per macro. `None` means the target is unset or zero
/// and the percentage cannot be shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MacroPercentages {
    pub calories: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    pub protein: Option<f64>,
}

/// Everything one history section needs: the day's records newest first,
/// their summed macros and the percent-of-target values.
#[derive(Debug, Clone, Serialize)]
pub struct DaySummary {
    pub date: Date,
    pub label: String,
    pub records: Vec<FoodRecord>,
    pub totals: MacroValues,
    pub percentages: MacroPercentages,
}

/// Group records by calendar day (in the display offset) and compute per-day
/// totals and percent-of-target values.
///
/// Days come back newest first no matter how the input was ordered; records
/// inside a day newest first, ties broken by name. Empty input yields an
/// empty vec.
pub fn summarize_by_day(
    records: &[FoodRecord],
    targets: MacroTargets,
    today: Date,
    offset: UtcOffset,
) -> Vec<DaySummary> {
    let mut buckets: BTreeMap<Date, Vec<FoodRecord>> = BTreeMap::new();
    for record in records {
        buckets
            .entry(local_date(record.created_at, offset))
            .or_default()
            .push(record.clone());
    }

    buckets
        .into_iter()
        .rev()
        .map(|(date, mut day_records)| {
            day_records.sort_by(|a, b| {
                b.created_at
                    .cmp(&a.created_at)
                    .then_with(|| a.name.cmp(&b.name))
            });

            let mut totals = MacroValues::default();
            for record in &day_records {
                totals.accumulate(record.macros);
            }

            let percentages = MacroPercentages {
                calories: percent_of(totals.calories, targets.calories),
                carbs: percent_of(totals.carbs, targets.carbs),
                fat: percent_of(totals.fat, targets.fat),
                protein: percent_of(totals.protein, targets.protein),
            };

            DaySummary {
                date,
                label: day_label(date, today),
                records: day_records,
                totals,
                percentages,
            }
        })
        .collect()
}

/// `total / (target / 100)`. Unset or non-positive targets yield `None`, so
/// a zero target can never surface as NaN or infinity.
fn percent_of(total: f64, target: Option<f64>) -> Option<f64> {
    match target {
        Some(t) if t > 0.0 => Some(total / (t / 100.0)),
        _ => None,
    }
}
