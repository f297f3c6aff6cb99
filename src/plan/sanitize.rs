//! Sanitization of recovered plan JSON
//!
//! Model output is treated as untrusted: numbers arrive as strings or ranges,
//! items lack identity fields, totals disagree with their parts. Sanitization
//! drops what cannot be repaired and recomputes every aggregate bottom-up so
//! the persisted plan is internally consistent.

use crate::error::{Error, Result};
use crate::plan::calorie;
use crate::plan::types::{
    DietPlanContent, ExerciseItem, ExercisePlanContent, ExerciseTotals, FoodItem, Meal,
    NutritionTotals, Session,
};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::{debug, warn};

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+(?:\.\d+)?").expect("static regex"))
}

/// Coerce a JSON value to f64, tolerating strings and ranges.
///
/// "180-270" averages to 225; "about 30 min" yields 30; anything with no
/// digits at all yields 0.
pub fn parse_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => {
            let trimmed = s.trim();
            if let Ok(n) = trimmed.parse::<f64>() {
                return n;
            }
            let nums: Vec<f64> = number_re()
                .find_iter(trimmed)
                .filter_map(|m| m.as_str().parse::<f64>().ok())
                .collect();
            match nums.len() {
                0 => 0.0,
                1 => nums[0],
                _ => ((nums[0] + nums[1]) / 2.0).round(),
            }
        }
        _ => 0.0,
    }
}

fn field_str(obj: &Value, key: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string()
}

fn field_num(obj: &Value, key: &str) -> f64 {
    obj.get(key).map(parse_number).unwrap_or(0.0)
}

/// Round to whole calories
fn round_cal(v: f64) -> f64 {
    v.round()
}

/// Round grams to one decimal
fn round_gram(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Validate and repair a recovered diet plan object.
///
/// Returns the cleaned content, totals recomputed from the surviving items,
/// and any tips the model attached.
pub fn sanitize_diet(value: &Value) -> Result<(DietPlanContent, NutritionTotals, Vec<String>)> {
    let raw_meals = value
        .get("meals")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::Parse("Diet plan JSON has no 'meals' array".into()))?;

    let mut meals = Vec::new();
    let mut totals = NutritionTotals::default();

    for raw_meal in raw_meals {
        let name = field_str(raw_meal, "name");
        if name.is_empty() {
            warn!("Dropping meal with no name");
            continue;
        }

        let mut items = Vec::new();
        if let Some(raw_items) = raw_meal.get("items").and_then(Value::as_array) {
            for raw_item in raw_items {
                let food = field_str(raw_item, "food");
                let portion = field_str(raw_item, "portion");
                if food.is_empty() || portion.is_empty() {
                    debug!(meal = %name, "Dropping food item missing food or portion");
                    continue;
                }
                items.push(FoodItem {
                    food,
                    portion,
                    calories: round_cal(field_num(raw_item, "calories")),
                    carbs: round_gram(field_num(raw_item, "carbs")),
                    protein: round_gram(field_num(raw_item, "protein")),
                    fat: round_gram(field_num(raw_item, "fat")),
                    fiber: round_gram(field_num(raw_item, "fiber")),
                });
            }
        }

        if items.is_empty() {
            warn!(meal = %name, "Dropping meal with no usable items");
            continue;
        }

        let meal_calories = round_cal(items.iter().map(|i| i.calories).sum());
        for item in &items {
            totals.calories += item.calories;
            totals.carbs += item.carbs;
            totals.protein += item.protein;
            totals.fat += item.fat;
            totals.fiber += item.fiber;
        }

        meals.push(Meal {
            name,
            timing: field_str(raw_meal, "timing"),
            items,
            total_calories: meal_calories,
        });
    }

    if meals.is_empty() {
        return Err(Error::EmptyResult(
            "Model produced a diet plan with no usable meals".into(),
        ));
    }

    totals.calories = round_cal(totals.calories);
    totals.carbs = round_gram(totals.carbs);
    totals.protein = round_gram(totals.protein);
    totals.fat = round_gram(totals.fat);
    totals.fiber = round_gram(totals.fiber);

    Ok((DietPlanContent { meals }, totals, extract_tips(value)))
}

/// Validate and repair a recovered exercise plan object.
///
/// Missing calorie estimates are filled from METs and the user's weight when
/// both are available.
pub fn sanitize_exercise(
    value: &Value,
    weight_kg: f64,
) -> Result<(ExercisePlanContent, ExerciseTotals, Vec<String>)> {
    let raw_sessions = value
        .get("sessions")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::Parse("Exercise plan JSON has no 'sessions' array".into()))?;

    let mut sessions = Vec::new();
    let mut totals = ExerciseTotals::default();

    for raw_session in raw_sessions {
        let name = field_str(raw_session, "name");
        if name.is_empty() {
            warn!("Dropping session with no name");
            continue;
        }

        let mut items = Vec::new();
        if let Some(raw_items) = raw_session.get("items").and_then(Value::as_array) {
            for raw_item in raw_items {
                let exercise = field_str(raw_item, "exercise");
                if exercise.is_empty() {
                    debug!(session = %name, "Dropping exercise item with no name");
                    continue;
                }
                let duration_min = field_num(raw_item, "duration_min");
                let mets = field_num(raw_item, "mets");
                let mut estimated_calories = round_cal(field_num(raw_item, "estimated_calories"));
                if estimated_calories <= 0.0 && mets > 0.0 && weight_kg > 0.0 {
                    estimated_calories = round_cal(calorie::mets_calories(
                        mets,
                        weight_kg,
                        duration_min,
                    ));
                }
                items.push(ExerciseItem {
                    exercise,
                    category: field_str(raw_item, "category"),
                    intensity: field_str(raw_item, "intensity"),
                    duration_min,
                    mets,
                    estimated_calories,
                    notes: field_str(raw_item, "notes"),
                    precautions: field_str(raw_item, "precautions"),
                });
            }
        }

        if items.is_empty() {
            warn!(session = %name, "Dropping session with no usable items");
            continue;
        }

        let session_duration = items.iter().map(|i| i.duration_min).sum::<f64>();
        let session_calories = round_cal(items.iter().map(|i| i.estimated_calories).sum());
        totals.duration_total_min += session_duration;
        totals.calories_total += session_calories;
        totals.sessions_count += 1;

        sessions.push(Session {
            name,
            time: field_str(raw_session, "time"),
            kind: field_str(raw_session, "kind"),
            items,
            total_duration_min: session_duration,
            total_estimated_calories: session_calories,
        });
    }

    if sessions.is_empty() {
        return Err(Error::EmptyResult(
            "Model produced an exercise plan with no usable sessions".into(),
        ));
    }

    totals.calories_total = round_cal(totals.calories_total);

    Ok((ExercisePlanContent { sessions }, totals, extract_tips(value)))
}

fn extract_tips(value: &Value) -> Vec<String> {
    value
        .get("tips")
        .and_then(Value::as_array)
        .map(|tips| {
            tips.iter()
                .filter_map(Value::as_str)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_number_variants() {
        assert_eq!(parse_number(&json!(42)), 42.0);
        assert_eq!(parse_number(&json!(12.5)), 12.5);
        assert_eq!(parse_number(&json!("30")), 30.0);
        assert_eq!(parse_number(&json!("about 30 min")), 30.0);
        assert_eq!(parse_number(&json!("180-270")), 225.0);
        assert_eq!(parse_number(&json!("no digits here")), 0.0);
        assert_eq!(parse_number(&json!(null)), 0.0);
        assert_eq!(parse_number(&json!([1, 2])), 0.0);
    }

    #[test]
    fn test_sanitize_diet_recomputes_totals() {
        let raw = json!({
            "meals": [{
                "name": "Breakfast",
                "timing": "8:00 AM",
                "total_calories": "9999",
                "items": [
                    {"food": "Oats", "portion": "40g", "calories": 150, "carbs": 27, "protein": 5, "fat": 3, "fiber": 4},
                    {"food": "Apple", "portion": "1 medium", "calories": "90-110", "carbs": 25, "protein": 0.5, "fat": 0.3, "fiber": 4.4}
                ]
            }],
            "tips": ["Drink water before meals", ""]
        });
        let (content, totals, tips) = sanitize_diet(&raw).unwrap();
        assert_eq!(content.meals.len(), 1);
        // Model's claimed total is ignored; 150 + round(avg(90,110)) = 250
        assert_eq!(content.meals[0].total_calories, 250.0);
        assert_eq!(totals.calories, 250.0);
        assert_eq!(totals.carbs, 52.0);
        assert_eq!(totals.fiber, 8.4);
        assert_eq!(tips, vec!["Drink water before meals".to_string()]);
    }

    #[test]
    fn test_sanitize_diet_drops_invalid_items_and_meals() {
        let raw = json!({
            "meals": [
                {"name": "Lunch", "items": [
                    {"food": "Rice", "portion": "", "calories": 200},
                    {"food": "", "portion": "1 cup"},
                    {"food": "Dal", "portion": "1 bowl", "calories": 180}
                ]},
                {"name": "", "items": [{"food": "Ghost", "portion": "1"}]},
                {"name": "Snack", "items": []}
            ]
        });
        let (content, totals, _) = sanitize_diet(&raw).unwrap();
        assert_eq!(content.meals.len(), 1);
        assert_eq!(content.meals[0].items.len(), 1);
        assert_eq!(content.meals[0].items[0].food, "Dal");
        assert_eq!(totals.calories, 180.0);
    }

    #[test]
    fn test_sanitize_diet_empty_is_error() {
        let raw = json!({"meals": [{"name": "Lunch", "items": []}]});
        let err = sanitize_diet(&raw).unwrap_err();
        assert!(matches!(err, Error::EmptyResult(_)));

        let err = sanitize_diet(&json!({"not_meals": []})).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_sanitize_exercise_fills_calories_from_mets() {
        let raw = json!({
            "sessions": [{
                "name": "Morning Walk",
                "time": "7:00 AM",
                "kind": "aerobic",
                "items": [{
                    "exercise": "Brisk walking",
                    "intensity": "moderate",
                    "duration_min": 30,
                    "mets": 3.5
                }]
            }]
        });
        let (content, totals, _) = sanitize_exercise(&raw, 80.0).unwrap();
        // 3.5 * 3.5 * 80 / 200 * 30 = 147
        assert_eq!(content.sessions[0].items[0].estimated_calories, 147.0);
        assert_eq!(totals.duration_total_min, 30.0);
        assert_eq!(totals.calories_total, 147.0);
        assert_eq!(totals.sessions_count, 1);
    }

    #[test]
    fn test_sanitize_exercise_keeps_model_calories_when_present() {
        let raw = json!({
            "sessions": [{
                "name": "Evening",
                "items": [{"exercise": "Yoga", "duration_min": 20, "mets": 2.5, "estimated_calories": 60}]
            }]
        });
        let (content, _, _) = sanitize_exercise(&raw, 70.0).unwrap();
        assert_eq!(content.sessions[0].items[0].estimated_calories, 60.0);
    }

    #[test]
    fn test_sanitize_exercise_empty_is_error() {
        let err = sanitize_exercise(&json!({"sessions": []}), 70.0).unwrap_err();
        assert!(matches!(err, Error::EmptyResult(_)));
    }
}
