//! Calorie and macro baselines
//!
//! Pure arithmetic feeding the diet prompt: Harris-Benedict BMR, activity
//! multipliers, diabetes-aware calorie targets, a 47/23/30 macro split and a
//! five-meal calorie distribution.

use serde::Serialize;

/// Calories below which a daily target is never pushed
const MIN_DAILY_CALORIES: f64 = 1200.0;

/// Daily macro targets in grams
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MacroTargets {
    pub carbs_g: f64,
    pub protein_g: f64,
    pub fat_g: f64,
}

/// Everything the diet prompt needs about calories
#[derive(Debug, Clone, Serialize)]
pub struct CalorieTargets {
    pub bmr: f64,
    pub tdee: f64,
    pub target_calories: f64,
    pub macros: MacroTargets,
    /// (meal name, calories) in day order
    pub meal_distribution: Vec<(String, f64)>,
}

/// Harris-Benedict basal metabolic rate
pub fn bmr(gender: &str, weight_kg: f64, height_cm: f64, age_years: f64) -> f64 {
    if gender.eq_ignore_ascii_case("male") {
        88.362 + 13.397 * weight_kg + 4.799 * height_cm - 5.677 * age_years
    } else {
        447.593 + 9.247 * weight_kg + 3.098 * height_cm - 4.330 * age_years
    }
}

/// Activity multiplier; unknown levels fall back to moderate
pub fn activity_multiplier(level: &str) -> f64 {
    match level.to_lowercase().as_str() {
        "sedentary" => 1.2,
        "light" => 1.375,
        "moderate" => 1.55,
        "active" => 1.725,
        "very_active" => 1.9,
        _ => 1.55,
    }
}

/// Body mass index from metric inputs
pub fn bmi(weight_kg: f64, height_cm: f64) -> f64 {
    let height_m = height_cm / 100.0;
    if height_m <= 0.0 {
        return 0.0;
    }
    weight_kg / (height_m * height_m)
}

/// Diabetes-aware daily calorie target.
///
/// Applies the weight goal, caps overweight non-gain targets at TDEE - 200,
/// adds a small allowance for Type 1 (hypoglycemia risk) and never goes below
/// the 1200 kcal floor.
pub fn diabetic_target(tdee: f64, bmi: f64, diabetes_type: Option<&str>, goal: &str) -> f64 {
    let goal = goal.to_lowercase();
    let mut target = match goal.as_str() {
        "lose" | "lose_weight" => tdee - 500.0,
        "gain" | "gain_weight" => tdee + 300.0,
        _ => tdee,
    };

    if bmi > 25.0 && !goal.starts_with("gain") {
        target = target.min(tdee - 200.0);
    }

    if diabetes_type
        .map(|t| t.to_lowercase().contains('1'))
        .unwrap_or(false)
    {
        target += 50.0;
    }

    target.max(MIN_DAILY_CALORIES).round()
}

/// 47% carbs / 23% protein / 30% fat, converted to grams (4/4/9 kcal per gram)
pub fn macro_split(calories: f64) -> MacroTargets {
    MacroTargets {
        carbs_g: (calories * 0.47 / 4.0).round(),
        protein_g: (calories * 0.23 / 4.0).round(),
        fat_g: (calories * 0.30 / 9.0).round(),
    }
}

/// Distribute daily calories over five meals
pub fn meal_distribution(calories: f64) -> Vec<(String, f64)> {
    [
        ("breakfast", 0.25),
        ("mid_morning_snack", 0.10),
        ("lunch", 0.30),
        ("evening_snack", 0.10),
        ("dinner", 0.25),
    ]
    .iter()
    .map(|(name, share)| (name.to_string(), (calories * share).round()))
    .collect()
}

/// Calories burned by an activity: METs x 3.5 x kg / 200 per minute
pub fn mets_calories(mets: f64, weight_kg: f64, duration_min: f64) -> f64 {
    (mets * 3.5 * weight_kg / 200.0 * duration_min).round()
}

/// Compute the full target bundle for a profile
pub fn compute_targets(
    gender: &str,
    weight_kg: f64,
    height_cm: f64,
    age_years: f64,
    activity_level: &str,
    diabetes_type: Option<&str>,
    goal: &str,
) -> CalorieTargets {
    let bmr_value = bmr(gender, weight_kg, height_cm, age_years);
    let tdee = bmr_value * activity_multiplier(activity_level);
    let target = diabetic_target(tdee, bmi(weight_kg, height_cm), diabetes_type, goal);

    CalorieTargets {
        bmr: bmr_value.round(),
        tdee: tdee.round(),
        target_calories: target,
        macros: macro_split(target),
        meal_distribution: meal_distribution(target),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bmr_male() {
        // 80kg, 175cm, 40y: 88.362 + 1071.76 + 839.825 - 227.08 = 1772.867
        let value = bmr("male", 80.0, 175.0, 40.0);
        assert!((value - 1772.867).abs() < 0.01);
    }

    #[test]
    fn test_bmr_female() {
        // 68kg, 162cm, 41y: 447.593 + 628.796 + 501.876 - 177.53 = 1400.735
        let value = bmr("female", 68.0, 162.0, 41.0);
        assert!((value - 1400.735).abs() < 0.01);
    }

    #[test]
    fn test_activity_multiplier_fallback() {
        assert_eq!(activity_multiplier("sedentary"), 1.2);
        assert_eq!(activity_multiplier("very_active"), 1.9);
        assert_eq!(activity_multiplier("couch"), 1.55);
    }

    #[test]
    fn test_bmi() {
        assert!((bmi(80.0, 175.0) - 26.12).abs() < 0.01);
        assert_eq!(bmi(80.0, 0.0), 0.0);
    }

    #[test]
    fn test_diabetic_target_overweight_cap() {
        // BMI over 25 with maintain goal: capped at tdee - 200
        assert_eq!(diabetic_target(2400.0, 27.0, Some("Type 2"), "maintain"), 2200.0);
        // Lose goal already below the cap
        assert_eq!(diabetic_target(2400.0, 27.0, Some("Type 2"), "lose"), 1900.0);
        // Gain goal is exempt from the cap
        assert_eq!(diabetic_target(2400.0, 27.0, None, "gain"), 2700.0);
    }

    #[test]
    fn test_diabetic_target_type1_allowance_and_floor() {
        assert_eq!(diabetic_target(2000.0, 22.0, Some("Type 1"), "maintain"), 2050.0);
        // Deficit never drops below the floor
        assert_eq!(diabetic_target(1500.0, 22.0, None, "lose"), 1200.0);
    }

    #[test]
    fn test_macro_split() {
        let macros = macro_split(2000.0);
        assert_eq!(macros.carbs_g, 235.0);
        assert_eq!(macros.protein_g, 115.0);
        assert_eq!(macros.fat_g, 67.0);
    }

    #[test]
    fn test_meal_distribution_sums_to_day() {
        let meals = meal_distribution(2000.0);
        assert_eq!(meals.len(), 5);
        assert_eq!(meals[0], ("breakfast".to_string(), 500.0));
        assert_eq!(meals[2], ("lunch".to_string(), 600.0));
        let total: f64 = meals.iter().map(|(_, c)| c).sum();
        assert_eq!(total, 2000.0);
    }

    #[test]
    fn test_mets_calories() {
        // Brisk walking ~4.3 METs, 70kg, 30 min: 4.3*3.5*70/200*30 = 158.025
        assert_eq!(mets_calories(4.3, 70.0, 30.0), 158.0);
    }
}
