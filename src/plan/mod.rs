//! Plan generation orchestrator
//!
//! Ties the pipeline together: profile gate, region resolution, retrieval
//! with a filter relaxation ladder, prompt construction, model call, layered
//! JSON recovery, sanitization and idempotent persistence. A plan is only
//! ever persisted when the model produced usable content; there is no
//! synthetic fallback plan.

pub mod calorie;
pub mod prompt;
pub mod recover;
pub mod sanitize;
pub mod types;

use crate::config::Config;
use crate::embed::Embedder;
use crate::error::{Error, Result};
use crate::llm::ChatClient;
use crate::region::{self, RegionCoverage, GLOBAL_REGION};
use crate::registry::{PlanRecord, PlanType, ProfileRecord, Registry};
use crate::retrieval::{self, ContextBundle};
use crate::store::{SearchFilter, VectorStore};
use chrono::{Datelike, NaiveDate, Utc};
use prompt::PatientSummary;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// A generated plan plus the coverage that backed it
#[derive(Debug)]
pub struct GeneratedPlan {
    pub record: PlanRecord,
    pub coverage: RegionCoverage,
}

pub struct Planner<'a> {
    config: &'a Config,
    registry: &'a Registry,
    store: &'a VectorStore,
    embedder: Arc<dyn Embedder>,
    llm: ChatClient,
}

impl<'a> Planner<'a> {
    pub fn new(
        config: &'a Config,
        registry: &'a Registry,
        store: &'a VectorStore,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        let llm = ChatClient::new(&config.llm)?;
        Ok(Self {
            config,
            registry,
            store,
            embedder,
            llm,
        })
    }

    /// Generate and persist a plan for one user and date.
    ///
    /// Fails with `Duplicate` when a plan of this type already exists for the
    /// date, `Validation` when the date is out of range or the profile is
    /// incomplete, and `EmptyResult` when no guideline context exists at any
    /// relaxation level.
    pub async fn generate(
        &self,
        user_id: &str,
        target_date: &str,
        plan_type: PlanType,
    ) -> Result<GeneratedPlan> {
        let today = Utc::now().date_naive();
        let date = validate_target_date(target_date, today, self.config.plan.max_days_ahead)?;
        let date_str = date.format("%Y-%m-%d").to_string();

        let profile = self
            .registry
            .get_profile(user_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("No profile found for user '{}'", user_id)))?;
        let missing = profile.missing_fields();
        if !missing.is_empty() {
            return Err(Error::Validation(format!(
                "Profile incomplete, missing: {}",
                missing.join(", ")
            )));
        }

        if self
            .registry
            .get_plan(user_id, &date_str, plan_type)
            .await?
            .is_some()
        {
            return Err(Error::Duplicate(format!(
                "A {} plan for {} already exists for this user",
                plan_type, date_str
            )));
        }

        let requested = profile
            .country
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or(GLOBAL_REGION);
        let doc_type = plan_type.doc_type();
        let resolved = region::resolve_region(&self.registry, requested, doc_type).await?;
        let coverage = region::check_coverage(&self.registry, &resolved, doc_type).await?;
        info!(
            "Generating {} plan for user '{}' on {} (region {}, {})",
            plan_type, user_id, date_str, resolved, coverage.tier
        );

        let patient = patient_summary(&profile, today)?;
        let context = self
            .retrieve_with_relaxation(&resolved, plan_type, &patient)
            .await?;

        let avoid = self.avoid_list(user_id, plan_type, date).await?;

        let (system, user) = match plan_type {
            PlanType::Diet => {
                let targets = calorie::compute_targets(
                    &patient.gender,
                    patient.weight_kg,
                    patient.height_cm,
                    patient.age_years as f64,
                    &patient.activity_level,
                    Some(&patient.diabetes_type),
                    profile.weight_goal.as_deref().unwrap_or("maintain"),
                );
                prompt::build_diet_prompt(
                    &patient,
                    &targets,
                    &date_str,
                    &context.chunks,
                    &avoid,
                    self.config.plan.diet_context_chunks,
                )
            }
            PlanType::Exercise => prompt::build_exercise_prompt(
                &patient,
                &date_str,
                &context.chunks,
                &avoid,
                self.config.plan.exercise_context_chunks,
            ),
        };

        let raw = self.llm.complete(&system, &user).await?;

        let (content_json, totals_json, tips) = match plan_type {
            PlanType::Diet => {
                let recovered = recover::recover_json(&raw, "meals")?;
                info!("Diet plan JSON recovered via {:?}", recovered.stage);
                let (content, totals, tips) = sanitize::sanitize_diet(&recovered.value)?;
                (
                    serde_json::to_string(&content)?,
                    serde_json::to_string(&totals)?,
                    tips,
                )
            }
            PlanType::Exercise => {
                let recovered = recover::recover_json(&raw, "sessions")?;
                info!("Exercise plan JSON recovered via {:?}", recovered.stage);
                let (content, totals, tips) =
                    sanitize::sanitize_exercise(&recovered.value, patient.weight_kg)?;
                (
                    serde_json::to_string(&content)?,
                    serde_json::to_string(&totals)?,
                    tips,
                )
            }
        };

        let record = PlanRecord::new(
            user_id.to_string(),
            date_str,
            plan_type,
            resolved,
            content_json,
            totals_json,
            serde_json::to_string(&context.sources)?,
            serde_json::to_string(&tips)?,
        );
        self.registry.insert_plan(&record).await?;
        info!("Persisted {} plan {}", plan_type, record.id);

        Ok(GeneratedPlan { record, coverage })
    }

    /// Retrieve context, relaxing the filter step by step when a stricter
    /// one returns nothing: region+type, type only, region only, unfiltered.
    async fn retrieve_with_relaxation(
        &self,
        region: &str,
        plan_type: PlanType,
        patient: &PatientSummary,
    ) -> Result<ContextBundle> {
        let doc_type = plan_type.doc_type().to_string();
        let queries = context_queries(region, plan_type, patient);
        let per_query_k = self.config.query.default_k;

        let ladder = [
            SearchFilter {
                country: Some(region.to_string()),
                doc_type: Some(doc_type.clone()),
            },
            SearchFilter {
                country: None,
                doc_type: Some(doc_type),
            },
            SearchFilter {
                country: Some(region.to_string()),
                doc_type: None,
            },
            SearchFilter::default(),
        ];

        for (step, filter) in ladder.into_iter().enumerate() {
            let bundle = retrieval::gather_context(
                &self.registry,
                &self.store,
                self.embedder.as_ref(),
                &queries,
                filter,
                per_query_k,
                self.config.query.min_score,
                &self.config.query,
            )
            .await?;
            if !bundle.chunks.is_empty() {
                if step > 0 {
                    warn!(
                        "Context found only after relaxing filters ({} of 4)",
                        step + 1
                    );
                }
                return Ok(bundle);
            }
        }

        Err(Error::EmptyResult(format!(
            "No guideline content available for region '{}' at any filter level",
            region
        )))
    }

    /// Item names from recent plans of the same type feed the variety hint
    async fn avoid_list(
        &self,
        user_id: &str,
        plan_type: PlanType,
        target_date: NaiveDate,
    ) -> Result<Vec<String>> {
        let window = self.config.plan.avoid_window_days;
        if window <= 0 {
            return Ok(Vec::new());
        }
        let from = (target_date - chrono::Duration::days(window)).format("%Y-%m-%d");
        let to = (target_date - chrono::Duration::days(1)).format("%Y-%m-%d");
        let recent = self
            .registry
            .plans_between(user_id, plan_type, &from.to_string(), &to.to_string())
            .await?;

        let mut items = Vec::new();
        for plan in &recent {
            match serde_json::from_str::<Value>(&plan.content_json) {
                Ok(content) => extract_item_names(&content, plan_type, &mut items),
                Err(e) => warn!("Skipping unreadable plan {} content: {}", plan.id, e),
            }
        }
        items.sort();
        items.dedup();
        Ok(items)
    }
}

/// Reject dates in the past or beyond the configured horizon
fn validate_target_date(raw: &str, today: NaiveDate, max_days_ahead: i64) -> Result<NaiveDate> {
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| Error::Validation(format!("Invalid date '{}', expected YYYY-MM-DD", raw)))?;
    if date < today {
        return Err(Error::Validation(format!(
            "Target date {} is in the past",
            raw
        )));
    }
    let horizon = today + chrono::Duration::days(max_days_ahead);
    if date > horizon {
        return Err(Error::Validation(format!(
            "Target date {} is more than {} days ahead",
            raw, max_days_ahead
        )));
    }
    Ok(date)
}

/// Resolve the profile into the flat summary the prompts interpolate
fn patient_summary(profile: &ProfileRecord, today: NaiveDate) -> Result<PatientSummary> {
    let birth_raw = profile
        .birth_date
        .as_deref()
        .ok_or_else(|| Error::Validation("Profile has no birth date".into()))?;
    let weight_kg = profile
        .weight_kg
        .ok_or_else(|| Error::Validation("Profile has no weight".into()))?;
    let height_cm = profile
        .height_cm
        .ok_or_else(|| Error::Validation("Profile has no height".into()))?;
    let gender = profile
        .gender
        .clone()
        .ok_or_else(|| Error::Validation("Profile has no gender".into()))?;

    let medications = profile
        .medications_json
        .as_deref()
        .and_then(|raw| serde_json::from_str::<Vec<String>>(raw).ok())
        .unwrap_or_default();

    Ok(PatientSummary {
        age_years: age_years(birth_raw, today)?,
        gender,
        weight_kg,
        height_cm,
        country: profile
            .country
            .clone()
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| GLOBAL_REGION.to_string()),
        activity_level: profile
            .activity_level
            .clone()
            .unwrap_or_else(|| "moderate".to_string()),
        diabetes_type: profile
            .diabetes_type
            .clone()
            .unwrap_or_else(|| "Type 2".to_string()),
        medications,
        dietary_preference: profile.dietary_preference.clone(),
    })
}

/// Completed years between a YYYY-MM-DD birth date and today
fn age_years(birth_date: &str, today: NaiveDate) -> Result<u32> {
    let birth = NaiveDate::parse_from_str(birth_date, "%Y-%m-%d").map_err(|_| {
        Error::Validation(format!(
            "Invalid birth date '{}', expected YYYY-MM-DD",
            birth_date
        ))
    })?;
    if birth > today {
        return Err(Error::Validation(format!(
            "Birth date {} is in the future",
            birth_date
        )));
    }
    let mut years = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    Ok(years as u32)
}

/// Diversified retrieval queries per plan type
fn context_queries(region: &str, plan_type: PlanType, patient: &PatientSummary) -> Vec<String> {
    match plan_type {
        PlanType::Diet => vec![
            format!("{} dietary guidelines diabetes meal planning", region),
            format!(
                "{} traditional foods portion sizes {} diabetes",
                region, patient.diabetes_type
            ),
            format!("{} low glycemic index foods carbohydrate counting", region),
            format!("{} diabetic diet chart calories breakfast lunch dinner", region),
        ],
        PlanType::Exercise => vec![
            format!("{} physical activity recommendations adults diabetes", region),
            format!(
                "{} exercise guidelines intensity duration frequency diabetes",
                region
            ),
            format!(
                "{} moderate vigorous aerobic activity minutes per week",
                region
            ),
            format!("{} resistance training flexibility diabetes safety", region),
        ],
    }
}

/// Collect the identity field of every item in a plan's content
fn extract_item_names(content: &Value, plan_type: PlanType, out: &mut Vec<String>) {
    let (groups_key, items_field) = match plan_type {
        PlanType::Diet => ("meals", "food"),
        PlanType::Exercise => ("sessions", "exercise"),
    };
    let Some(groups) = content.get(groups_key).and_then(Value::as_array) else {
        return;
    };
    for group in groups {
        let Some(items) = group.get("items").and_then(Value::as_array) else {
            continue;
        };
        for item in items {
            if let Some(name) = item.get(items_field).and_then(Value::as_str) {
                let name = name.trim();
                if !name.is_empty() {
                    out.push(name.to_string());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_validate_target_date_window() {
        let today = d("2026-08-30");
        assert!(validate_target_date("2026-08-30", today, 5).is_ok());
        assert!(validate_target_date("2026-09-04", today, 5).is_ok());
        assert!(matches!(
            validate_target_date("2026-09-05", today, 5),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            validate_target_date("2026-08-29", today, 5),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            validate_target_date("tomorrow", today, 5),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_age_years_counts_completed_years() {
        let today = d("2026-08-30");
        assert_eq!(age_years("1985-04-12", today).unwrap(), 41);
        // Birthday not yet reached this year
        assert_eq!(age_years("1985-09-12", today).unwrap(), 40);
        assert!(age_years("2030-01-01", today).is_err());
        assert!(age_years("12/04/1985", today).is_err());
    }

    #[test]
    fn test_extract_item_names_diet_and_exercise() {
        let diet = json!({"meals": [
            {"name": "Breakfast", "items": [{"food": "Oats", "portion": "40g"}, {"food": " ", "portion": "x"}]},
            {"name": "Lunch", "items": [{"food": "Dal", "portion": "1 bowl"}]}
        ]});
        let mut names = Vec::new();
        extract_item_names(&diet, PlanType::Diet, &mut names);
        assert_eq!(names, vec!["Oats", "Dal"]);

        let exercise = json!({"sessions": [
            {"name": "AM", "items": [{"exercise": "Brisk walking"}]}
        ]});
        let mut names = Vec::new();
        extract_item_names(&exercise, PlanType::Exercise, &mut names);
        assert_eq!(names, vec!["Brisk walking"]);

        // Malformed content contributes nothing
        let mut names = Vec::new();
        extract_item_names(&json!({"meals": "oops"}), PlanType::Diet, &mut names);
        assert!(names.is_empty());
    }

    #[test]
    fn test_context_queries_mention_region() {
        let patient = PatientSummary {
            age_years: 41,
            gender: "female".to_string(),
            weight_kg: 68.0,
            height_cm: 162.0,
            country: "India".to_string(),
            activity_level: "moderate".to_string(),
            diabetes_type: "Type 2".to_string(),
            medications: vec![],
            dietary_preference: None,
        };
        for q in context_queries("India", PlanType::Diet, &patient) {
            assert!(q.contains("India"));
        }
        assert_eq!(context_queries("Global", PlanType::Exercise, &patient).len(), 4);
    }
}
