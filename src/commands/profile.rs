//! Profile command implementation

use crate::error::{Error, Result};
use crate::registry::{ProfileRecord, Registry};

/// Field updates applied over the stored profile (or an empty one)
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub gender: Option<String>,
    pub birth_date: Option<String>,
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    pub activity_level: Option<String>,
    pub country: Option<String>,
    pub diabetes_type: Option<String>,
    pub medications: Option<Vec<String>>,
    pub dietary_preference: Option<String>,
    pub weight_goal: Option<String>,
}

pub async fn cmd_set_profile(
    registry: &Registry,
    user_id: &str,
    update: ProfileUpdate,
) -> Result<ProfileRecord> {
    let mut profile =
        registry
            .get_profile(user_id)
            .await?
            .unwrap_or_else(|| ProfileRecord {
                user_id: user_id.to_string(),
                gender: None,
                birth_date: None,
                weight_kg: None,
                height_cm: None,
                activity_level: None,
                country: None,
                diabetes_type: None,
                medications_json: None,
                dietary_preference: None,
                weight_goal: None,
            });

    if let Some(v) = update.gender {
        profile.gender = Some(v);
    }
    if let Some(v) = update.birth_date {
        profile.birth_date = Some(v);
    }
    if let Some(v) = update.weight_kg {
        if v <= 0.0 {
            return Err(Error::Validation("weight must be positive".into()));
        }
        profile.weight_kg = Some(v);
    }
    if let Some(v) = update.height_cm {
        if v <= 0.0 {
            return Err(Error::Validation("height must be positive".into()));
        }
        profile.height_cm = Some(v);
    }
    if let Some(v) = update.activity_level {
        profile.activity_level = Some(v);
    }
    if let Some(v) = update.country {
        profile.country = Some(v);
    }
    if let Some(v) = update.diabetes_type {
        profile.diabetes_type = Some(v);
    }
    if let Some(v) = update.medications {
        profile.medications_json = Some(serde_json::to_string(&v)?);
    }
    if let Some(v) = update.dietary_preference {
        profile.dietary_preference = Some(v);
    }
    if let Some(v) = update.weight_goal {
        profile.weight_goal = Some(v);
    }

    registry.upsert_profile(&profile).await?;
    Ok(profile)
}

pub async fn cmd_show_profile(registry: &Registry, user_id: &str) -> Result<ProfileRecord> {
    registry
        .get_profile(user_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("No profile found for user '{}'", user_id)))
}

pub fn print_profile(profile: &ProfileRecord) {
    println!("\n👤 Profile: {}\n", profile.user_id);
    let field = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
    println!("  Gender: {}", field(&profile.gender));
    println!("  Birth date: {}", field(&profile.birth_date));
    println!(
        "  Weight: {}",
        profile
            .weight_kg
            .map(|v| format!("{} kg", v))
            .unwrap_or_else(|| "-".to_string())
    );
    println!(
        "  Height: {}",
        profile
            .height_cm
            .map(|v| format!("{} cm", v))
            .unwrap_or_else(|| "-".to_string())
    );
    println!("  Activity level: {}", field(&profile.activity_level));
    println!("  Country: {}", field(&profile.country));
    println!("  Diabetes type: {}", field(&profile.diabetes_type));
    println!("  Dietary preference: {}", field(&profile.dietary_preference));
    println!("  Weight goal: {}", field(&profile.weight_goal));

    let missing = profile.missing_fields();
    if missing.is_empty() {
        println!("\n  ✓ Profile complete, plan generation available");
    } else {
        println!("\n  ⚠ Missing for plan generation: {}", missing.join(", "));
    }
}
