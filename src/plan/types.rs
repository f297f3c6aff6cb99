//! Typed plan content
//!
//! These are the shapes persisted in the plans table (as JSON columns) and
//! returned to callers. All numeric fields are recomputed bottom-up by the
//! sanitizer; model-reported totals are never trusted.

use serde::{Deserialize, Serialize};

/// One food item inside a meal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FoodItem {
    pub food: String,
    pub portion: String,
    pub calories: f64,
    pub carbs: f64,
    pub protein: f64,
    pub fat: f64,
    pub fiber: f64,
}

/// A meal with its items and recomputed calorie total
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Meal {
    pub name: String,
    pub timing: String,
    pub items: Vec<FoodItem>,
    pub total_calories: f64,
}

/// Full-day diet plan content
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DietPlanContent {
    pub meals: Vec<Meal>,
}

/// Day-level nutrition totals, summed from retained items only
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NutritionTotals {
    pub calories: f64,
    pub carbs: f64,
    pub protein: f64,
    pub fat: f64,
    pub fiber: f64,
}

/// One exercise inside a session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExerciseItem {
    pub exercise: String,
    pub category: String,
    pub intensity: String,
    pub duration_min: f64,
    pub mets: f64,
    pub estimated_calories: f64,
    pub notes: String,
    pub precautions: String,
}

/// An exercise session (e.g. morning walk, evening strength work)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub name: String,
    pub time: String,
    pub kind: String,
    pub items: Vec<ExerciseItem>,
    pub total_duration_min: f64,
    pub total_estimated_calories: f64,
}

/// Full-day exercise plan content
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExercisePlanContent {
    pub sessions: Vec<Session>,
}

/// Day-level exercise totals
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExerciseTotals {
    pub duration_total_min: f64,
    pub calories_total: f64,
    pub sessions_count: usize,
}
