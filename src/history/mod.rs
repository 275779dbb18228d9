pub mod aggregate;
pub mod label;

pub use aggregate::{
    summarize_by_day, DaySummary, FoodRecord, MacroPercentages, MacroTargets, MacroValues,
};
pub use label::{day_label, local_date};
