//! Plan command implementation

use crate::config::Config;
use crate::embed::Embedder;
use crate::error::{Error, Result};
use crate::plan::types::{DietPlanContent, ExercisePlanContent};
use crate::plan::{GeneratedPlan, Planner};
use crate::registry::{PlanRecord, PlanStatus, PlanType, Registry};
use crate::store::VectorStore;
use std::sync::Arc;

pub async fn cmd_generate_plan(
    config: &Config,
    registry: &Registry,
    store: &VectorStore,
    embedder: Arc<dyn Embedder>,
    user_id: &str,
    target_date: &str,
    plan_type: PlanType,
) -> Result<GeneratedPlan> {
    store.health_check().await?;
    let planner = Planner::new(config, registry, store, embedder)?;
    planner.generate(user_id, target_date, plan_type).await
}

pub async fn cmd_show_plan(
    registry: &Registry,
    user_id: &str,
    target_date: &str,
    plan_type: PlanType,
) -> Result<PlanRecord> {
    registry
        .get_plan(user_id, target_date, plan_type)
        .await?
        .ok_or_else(|| {
            Error::NotFound(format!(
                "No {} plan for user '{}' on {}",
                plan_type, user_id, target_date
            ))
        })
}

pub async fn cmd_set_plan_status(
    registry: &Registry,
    user_id: &str,
    target_date: &str,
    plan_type: PlanType,
    status: PlanStatus,
) -> Result<PlanRecord> {
    let plan = cmd_show_plan(registry, user_id, target_date, plan_type).await?;
    registry.update_plan_status(&plan.id, status).await?;
    cmd_show_plan(registry, user_id, target_date, plan_type).await
}

pub async fn cmd_delete_plan(
    registry: &Registry,
    user_id: &str,
    target_date: &str,
    plan_type: PlanType,
) -> Result<()> {
    let deleted = registry.delete_plan(user_id, target_date, plan_type).await?;
    if !deleted {
        return Err(Error::NotFound(format!(
            "No {} plan for user '{}' on {}",
            plan_type, user_id, target_date
        )));
    }
    Ok(())
}

pub fn print_plan(plan: &PlanRecord) {
    println!(
        "\n📋 {} plan for {} ({}, region {}, status {})",
        plan.plan_type, plan.user_id, plan.target_date, plan.region, plan.status
    );

    match plan.plan_type.parse::<PlanType>() {
        Ok(PlanType::Diet) => print_diet_content(plan),
        Ok(PlanType::Exercise) => print_exercise_content(plan),
        Err(_) => println!("  (unrecognized plan type)"),
    }

    if let Ok(tips) = serde_json::from_str::<Vec<String>>(&plan.tips_json) {
        if !tips.is_empty() {
            println!("\nTips:");
            for tip in tips {
                println!("  • {}", tip);
            }
        }
    }
}

fn print_diet_content(plan: &PlanRecord) {
    let Ok(content) = serde_json::from_str::<DietPlanContent>(&plan.content_json) else {
        println!("  (stored content is unreadable)");
        return;
    };
    for meal in &content.meals {
        println!("\n  {} ({}) - {} kcal", meal.name, meal.timing, meal.total_calories);
        for item in &meal.items {
            println!(
                "    • {} - {} ({} kcal, {}g carbs, {}g protein, {}g fat, {}g fiber)",
                item.food, item.portion, item.calories, item.carbs, item.protein, item.fat,
                item.fiber
            );
        }
    }
}

fn print_exercise_content(plan: &PlanRecord) {
    let Ok(content) = serde_json::from_str::<ExercisePlanContent>(&plan.content_json) else {
        println!("  (stored content is unreadable)");
        return;
    };
    for session in &content.sessions {
        println!(
            "\n  {} ({}, {}) - {} min, ~{} kcal",
            session.name,
            session.time,
            session.kind,
            session.total_duration_min,
            session.total_estimated_calories
        );
        for item in &session.items {
            println!(
                "    • {} [{}] {} min at {} METs (~{} kcal)",
                item.exercise, item.intensity, item.duration_min, item.mets,
                item.estimated_calories
            );
            if !item.precautions.is_empty() {
                println!("      ⚠ {}", item.precautions);
            }
        }
    }
}
