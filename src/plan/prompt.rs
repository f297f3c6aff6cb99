//! Prompt construction for plan generation
//!
//! Prompts are deterministic functions of the patient summary, calorie
//! targets and retrieved context. The JSON schema embedded in each prompt
//! matches the structs in [`crate::plan::types`] field for field.

use crate::plan::calorie::CalorieTargets;
use crate::retrieval::RetrievedChunk;

/// Maximum avoid-list entries spelled out in a prompt
const MAX_AVOID_FOODS: usize = 15;

/// Profile fields the prompts interpolate, pre-resolved by the orchestrator
#[derive(Debug, Clone)]
pub struct PatientSummary {
    pub age_years: u32,
    pub gender: String,
    pub weight_kg: f64,
    pub height_cm: f64,
    pub country: String,
    pub activity_level: String,
    pub diabetes_type: String,
    pub medications: Vec<String>,
    pub dietary_preference: Option<String>,
}

impl PatientSummary {
    fn medications_line(&self) -> String {
        if self.medications.is_empty() {
            "None specified".to_string()
        } else {
            self.medications.join(", ")
        }
    }
}

fn context_block(chunks: &[RetrievedChunk], max_chunks: usize) -> String {
    if chunks.is_empty() {
        return "(no regional guideline excerpts available)".to_string();
    }
    chunks
        .iter()
        .take(max_chunks)
        .enumerate()
        .map(|(i, chunk)| format!("[Source {}]\n{}", i + 1, chunk.text))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

fn avoid_block(avoid_foods: &[String]) -> String {
    if avoid_foods.is_empty() {
        return String::new();
    }
    format!(
        "\nIMPORTANT: Provide variety by avoiding recent foods: {}\n",
        avoid_foods
            .iter()
            .take(MAX_AVOID_FOODS)
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    )
}

/// Build the (system, user) message pair for a diet plan
pub fn build_diet_prompt(
    patient: &PatientSummary,
    targets: &CalorieTargets,
    target_date: &str,
    chunks: &[RetrievedChunk],
    avoid_foods: &[String],
    max_chunks: usize,
) -> (String, String) {
    let system = "You are a specialized diabetes dietitian AI. You must respond with ONLY \
                  valid JSON format for diet plans. Do not include any markdown formatting \
                  or explanations."
        .to_string();

    let distribution = targets
        .meal_distribution
        .iter()
        .map(|(name, kcal)| format!("- {}: {} kcal", name, kcal))
        .collect::<Vec<_>>()
        .join("\n");

    let preference = patient
        .dietary_preference
        .as_deref()
        .filter(|p| !p.is_empty())
        .map(|p| format!("- Dietary Preference: {}\n", p))
        .unwrap_or_default();

    let user = format!(
        r#"You are an expert diabetes dietitian creating a personalized meal plan based on evidence-based dietary guidelines.

PATIENT PROFILE:
- Age: {age} years
- Gender: {gender}
- Weight: {weight}kg, Height: {height}cm
- Region: {country}
- Diabetes Type: {diabetes}
- Medications: {medications}
- Activity Level: {activity}
{preference}- Daily Calorie Target: {calories} kcal
- Macro Targets: {carbs}g carbs, {protein}g protein, {fat}g fat

MEAL CALORIE DISTRIBUTION:
{distribution}

TARGET DATE: {date}

REGIONAL DIETARY GUIDELINES AND FOOD DATABASE ({country}):
{context}
{avoid}
CRITICAL INSTRUCTIONS:
1. Create exactly 5 meals: Breakfast, Mid-Morning Snack, Lunch, Evening Snack, Dinner
2. Use ONLY foods mentioned in the guideline excerpts above
3. Match the per-meal calorie targets listed in the distribution
4. Total calories must equal {calories} kcal (within 50 kcal)
5. Include exact portions (e.g., "1 cup", "150g", "2 medium")
6. Provide a nutritional breakdown per food item (calories, carbs, protein, fat, fiber)
7. Follow diabetic principles: low GI foods, high fiber, balanced macros
8. Add a timing window for each meal (e.g., "7:00 AM - 9:00 AM")
9. Generate 3-5 personalized tips based on the patient profile

RESPONSE FORMAT (strict JSON):
{{
  "meals": [
    {{
      "name": "Breakfast",
      "timing": "7:00 AM - 9:00 AM",
      "items": [
        {{
          "food": "Whole Wheat Paratha",
          "portion": "1 medium (6 inch)",
          "calories": 120,
          "carbs": 20,
          "protein": 3,
          "fat": 3,
          "fiber": 2
        }}
      ],
      "total_calories": 450
    }}
  ],
  "tips": [
    "Check blood glucose before breakfast and 2 hours after meals"
  ]
}}

Generate the complete meal plan now in valid JSON format:"#,
        age = patient.age_years,
        gender = patient.gender,
        weight = patient.weight_kg,
        height = patient.height_cm,
        country = patient.country,
        diabetes = patient.diabetes_type,
        medications = patient.medications_line(),
        activity = patient.activity_level,
        preference = preference,
        calories = targets.target_calories,
        carbs = targets.macros.carbs_g,
        protein = targets.macros.protein_g,
        fat = targets.macros.fat_g,
        distribution = distribution,
        date = target_date,
        context = context_block(chunks, max_chunks),
        avoid = avoid_block(avoid_foods),
    );

    (system, user)
}

/// Build the (system, user) message pair for an exercise plan
pub fn build_exercise_prompt(
    patient: &PatientSummary,
    target_date: &str,
    chunks: &[RetrievedChunk],
    avoid_exercises: &[String],
    max_chunks: usize,
) -> (String, String) {
    let system = "You are a specialized exercise physiologist AI for diabetes patients. \
                  Respond with ONLY valid JSON without any markdown or extra text."
        .to_string();

    let user = format!(
        r#"You are an exercise physiologist creating a daily exercise plan for a diabetes patient.

PATIENT PROFILE:
- Age: {age} years
- Gender: {gender}
- Weight: {weight}kg, Height: {height}cm
- Region: {country}
- Diabetes Type: {diabetes}
- Medications: {medications}
- Activity Level: {activity}

TARGET DATE: {date}

REGIONAL EXERCISE RECOMMENDATIONS ({country}):
{context}
{avoid}
CRITICAL INSTRUCTIONS:
1. Create 2-3 sessions across the day with aerobic, resistance and flexibility work
2. Keep the moderate-intensity total between 45 and 90 minutes
3. Give each exercise a MET value and duration in minutes
4. Include diabetes precautions (glucose checks, foot care, hypoglycemia signs)
5. Generate 3-5 personalized tips based on the patient profile

RESPONSE FORMAT (strict JSON):
{{
  "sessions": [
    {{
      "name": "Morning Session",
      "time": "7:00 AM",
      "kind": "aerobic",
      "items": [
        {{
          "exercise": "Brisk walking",
          "category": "aerobic",
          "intensity": "moderate",
          "duration_min": 30,
          "mets": 3.5,
          "estimated_calories": 150,
          "notes": "Maintain a pace where talking is possible",
          "precautions": "Carry fast-acting carbs"
        }}
      ]
    }}
  ],
  "tips": [
    "Check blood glucose before and after each session"
  ]
}}

Generate the complete exercise plan now in valid JSON format:"#,
        age = patient.age_years,
        gender = patient.gender,
        weight = patient.weight_kg,
        height = patient.height_cm,
        country = patient.country,
        diabetes = patient.diabetes_type,
        medications = patient.medications_line(),
        activity = patient.activity_level,
        date = target_date,
        context = context_block(chunks, max_chunks),
        avoid = avoid_block(avoid_exercises),
    );

    (system, user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::calorie;
    use crate::retrieval::RetrievedChunk;

    fn patient() -> PatientSummary {
        PatientSummary {
            age_years: 41,
            gender: "female".to_string(),
            weight_kg: 68.0,
            height_cm: 162.0,
            country: "India".to_string(),
            activity_level: "moderate".to_string(),
            diabetes_type: "Type 2".to_string(),
            medications: vec!["Metformin".to_string()],
            dietary_preference: Some("vegetarian".to_string()),
        }
    }

    fn chunk(text: &str) -> RetrievedChunk {
        RetrievedChunk {
            id: "doc_chunk_0".to_string(),
            document_id: "doc".to_string(),
            chunk_index: 0,
            text: text.to_string(),
            similarity: 0.9,
            title: "ICMR Dietary Guidelines".to_string(),
            source: String::new(),
            country: "India".to_string(),
            doc_type: "diet_chart".to_string(),
            version: String::new(),
            page_no: 1,
        }
    }

    #[test]
    fn test_diet_prompt_is_deterministic_and_complete() {
        let targets =
            calorie::compute_targets("female", 68.0, 162.0, 41.0, "moderate", Some("Type 2"), "maintain");
        let chunks = vec![chunk("Millet dosa with sambar is a low GI breakfast.")];
        let avoid = vec!["Oats".to_string()];

        let (system, user) =
            build_diet_prompt(&patient(), &targets, "2026-09-01", &chunks, &avoid, 10);
        let (_, user2) =
            build_diet_prompt(&patient(), &targets, "2026-09-01", &chunks, &avoid, 10);

        assert_eq!(user, user2);
        assert!(system.contains("ONLY valid JSON"));
        assert!(user.contains("[Source 1]"));
        assert!(user.contains("Millet dosa"));
        assert!(user.contains("avoiding recent foods: Oats"));
        assert!(user.contains("Dietary Preference: vegetarian"));
        assert!(user.contains("2026-09-01"));
        assert!(user.contains("\"meals\""));
    }

    #[test]
    fn test_context_cap_and_empty_avoid() {
        let chunks: Vec<RetrievedChunk> = (0..12)
            .map(|i| chunk(&format!("excerpt number {}", i)))
            .collect();
        let (_, user) = build_exercise_prompt(&patient(), "2026-09-01", &chunks, &[], 5);

        assert!(user.contains("[Source 5]"));
        assert!(!user.contains("[Source 6]"));
        assert!(!user.contains("avoiding recent"));
        assert!(user.contains("\"sessions\""));
    }

    #[test]
    fn test_empty_context_placeholder() {
        let (_, user) = build_exercise_prompt(&patient(), "2026-09-01", &[], &[], 5);
        assert!(user.contains("no regional guideline excerpts"));
    }
}
