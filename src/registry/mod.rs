//! Document, plan and profile registry backed by SQLite
//!
//! This module holds all relational metadata:
//! - Documents (the knowledge base, deduplicated by checksum)
//! - Generated plans (unique per user, date and plan type)
//! - User profiles

mod schema;

pub use schema::*;

use crate::error::{Error, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

/// Document types in the knowledge base
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocType {
    Guideline,
    ResearchPaper,
    DietChart,
    ExerciseRecommendation,
    ClinicalMaterial,
    Other,
}

impl std::fmt::Display for DocType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocType::Guideline => write!(f, "guideline"),
            DocType::ResearchPaper => write!(f, "research_paper"),
            DocType::DietChart => write!(f, "diet_chart"),
            DocType::ExerciseRecommendation => write!(f, "exercise_recommendation"),
            DocType::ClinicalMaterial => write!(f, "clinical_material"),
            DocType::Other => write!(f, "other"),
        }
    }
}

impl FromStr for DocType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "guideline" => Ok(DocType::Guideline),
            "research_paper" => Ok(DocType::ResearchPaper),
            "diet_chart" => Ok(DocType::DietChart),
            "exercise_recommendation" => Ok(DocType::ExerciseRecommendation),
            "clinical_material" => Ok(DocType::ClinicalMaterial),
            "other" => Ok(DocType::Other),
            _ => Err(Error::Validation(format!(
                "Unknown document type: {} (expected guideline, research_paper, diet_chart, exercise_recommendation, clinical_material or other)",
                s
            ))),
        }
    }
}

/// Document ingestion lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Processing,
    Ingested,
    Failed,
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentStatus::Pending => write!(f, "pending"),
            DocumentStatus::Processing => write!(f, "processing"),
            DocumentStatus::Ingested => write!(f, "ingested"),
            DocumentStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for DocumentStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(DocumentStatus::Pending),
            "processing" => Ok(DocumentStatus::Processing),
            "ingested" => Ok(DocumentStatus::Ingested),
            "failed" => Ok(DocumentStatus::Failed),
            _ => Err(Error::Validation(format!("Unknown document status: {}", s))),
        }
    }
}

/// Kind of generated plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    Diet,
    Exercise,
}

impl PlanType {
    /// The document type that feeds this plan's retrieval context
    pub fn doc_type(&self) -> DocType {
        match self {
            PlanType::Diet => DocType::DietChart,
            PlanType::Exercise => DocType::ExerciseRecommendation,
        }
    }
}

impl std::fmt::Display for PlanType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanType::Diet => write!(f, "diet"),
            PlanType::Exercise => write!(f, "exercise"),
        }
    }
}

impl FromStr for PlanType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "diet" => Ok(PlanType::Diet),
            "exercise" => Ok(PlanType::Exercise),
            _ => Err(Error::Validation(format!(
                "Unknown plan type: {} (expected diet or exercise)",
                s
            ))),
        }
    }
}

/// Plan lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    Pending,
    Active,
    Completed,
    Skipped,
}

impl std::fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanStatus::Pending => write!(f, "pending"),
            PlanStatus::Active => write!(f, "active"),
            PlanStatus::Completed => write!(f, "completed"),
            PlanStatus::Skipped => write!(f, "skipped"),
        }
    }
}

impl FromStr for PlanStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(PlanStatus::Pending),
            "active" => Ok(PlanStatus::Active),
            "completed" => Ok(PlanStatus::Completed),
            "skipped" => Ok(PlanStatus::Skipped),
            _ => Err(Error::Validation(format!("Unknown plan status: {}", s))),
        }
    }
}

/// A registered document
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub checksum: String,
    pub original_filename: String,
    pub title: String,
    pub source: String,
    pub country: String,
    pub doc_type: String,
    pub version: String,
    pub original_path: Option<String>,
    pub text_path: Option<String>,
    pub page_count: i32,
    pub chunk_count: i32,
    pub ingested_by: Option<String>,
    pub ingested_on: String,
    pub status: String,
    pub error_message: Option<String>,
}

impl DocumentRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        checksum: String,
        original_filename: String,
        title: String,
        source: String,
        country: String,
        doc_type: DocType,
        version: String,
        ingested_by: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            checksum,
            original_filename,
            title,
            source,
            country,
            doc_type: doc_type.to_string(),
            version,
            original_path: None,
            text_path: None,
            page_count: 0,
            chunk_count: 0,
            ingested_by,
            ingested_on: Utc::now().to_rfc3339(),
            status: DocumentStatus::Pending.to_string(),
            error_message: None,
        }
    }

    pub fn get_doc_type(&self) -> Result<DocType> {
        self.doc_type.parse()
    }

    pub fn get_status(&self) -> Result<DocumentStatus> {
        self.status.parse()
    }
}

/// A generated plan row
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PlanRecord {
    pub id: String,
    pub user_id: String,
    pub target_date: String,
    pub plan_type: String,
    pub region: String,
    pub content_json: String,
    pub totals_json: String,
    pub sources_json: String,
    pub tips_json: String,
    pub status: String,
    pub generated_at: String,
}

impl PlanRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: String,
        target_date: String,
        plan_type: PlanType,
        region: String,
        content_json: String,
        totals_json: String,
        sources_json: String,
        tips_json: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            target_date,
            plan_type: plan_type.to_string(),
            region,
            content_json,
            totals_json,
            sources_json,
            tips_json,
            status: PlanStatus::Pending.to_string(),
            generated_at: Utc::now().to_rfc3339(),
        }
    }
}

/// A user profile row
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub user_id: String,
    pub gender: Option<String>,
    pub birth_date: Option<String>,
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    pub activity_level: Option<String>,
    pub country: Option<String>,
    pub diabetes_type: Option<String>,
    pub medications_json: Option<String>,
    pub dietary_preference: Option<String>,
    pub weight_goal: Option<String>,
}

impl ProfileRecord {
    /// Plan generation needs these four fields; name what is missing
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.gender.as_deref().map_or(true, str::is_empty) {
            missing.push("gender");
        }
        if self.birth_date.as_deref().map_or(true, str::is_empty) {
            missing.push("birth_date");
        }
        if self.weight_kg.is_none() {
            missing.push("weight_kg");
        }
        if self.height_cm.is_none() {
            missing.push("height_cm");
        }
        missing
    }
}

/// Per-region document count (status = ingested)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct RegionCount {
    pub country: String,
    pub document_count: i64,
}

/// Registry database handle
#[derive(Clone)]
pub struct Registry {
    pool: SqlitePool,
}

impl Registry {
    /// Open (and if needed create) the registry database
    pub async fn new(db_path: &std::path::Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        debug!("Connecting to SQLite database at {:?}", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let db = Self { pool };

        if !db.is_initialized().await? {
            db.init_schema().await?;
        }

        Ok(db)
    }

    /// Initialize the database schema
    pub async fn init_schema(&self) -> Result<()> {
        info!("Initializing registry schema");
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    /// Check if the schema has been created
    pub async fn is_initialized(&self) -> Result<bool> {
        let result: Option<(i32,)> =
            sqlx::query_as("SELECT 1 FROM sqlite_master WHERE type='table' AND name='documents'")
                .fetch_optional(&self.pool)
                .await?;
        Ok(result.is_some())
    }

    // ===== Document Operations =====

    /// Insert a new document row.
    ///
    /// The checksum UNIQUE constraint backs the dedup invariant even when two
    /// ingests race past the checksum pre-check; its violation becomes a
    /// Duplicate error.
    pub async fn insert_document(&self, doc: &DocumentRecord) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO documents (id, checksum, original_filename, title, source, country,
                doc_type, version, original_path, text_path, page_count, chunk_count,
                ingested_by, ingested_on, status, error_message)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&doc.id)
        .bind(&doc.checksum)
        .bind(&doc.original_filename)
        .bind(&doc.title)
        .bind(&doc.source)
        .bind(&doc.country)
        .bind(&doc.doc_type)
        .bind(&doc.version)
        .bind(&doc.original_path)
        .bind(&doc.text_path)
        .bind(doc.page_count)
        .bind(doc.chunk_count)
        .bind(&doc.ingested_by)
        .bind(&doc.ingested_on)
        .bind(&doc.status)
        .bind(&doc.error_message)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(Error::Duplicate(format!(
                    "A document with checksum {} already exists",
                    doc.checksum
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Get document by ID
    pub async fn get_document(&self, id: &str) -> Result<Option<DocumentRecord>> {
        let doc = sqlx::query_as::<_, DocumentRecord>("SELECT * FROM documents WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(doc)
    }

    /// Get document by content checksum
    pub async fn get_document_by_checksum(&self, checksum: &str) -> Result<Option<DocumentRecord>> {
        let doc = sqlx::query_as::<_, DocumentRecord>("SELECT * FROM documents WHERE checksum = ?")
            .bind(checksum)
            .fetch_optional(&self.pool)
            .await?;
        Ok(doc)
    }

    /// Fetch several documents by id
    pub async fn get_documents_by_ids(&self, ids: &[String]) -> Result<Vec<DocumentRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let query = format!("SELECT * FROM documents WHERE id IN ({})", placeholders);

        let mut query_builder = sqlx::query_as::<_, DocumentRecord>(&query);
        for id in ids {
            query_builder = query_builder.bind(id);
        }
        let docs = query_builder.fetch_all(&self.pool).await?;
        Ok(docs)
    }

    /// List documents, optionally filtered by type and/or country
    pub async fn list_documents(
        &self,
        doc_type: Option<DocType>,
        country: Option<&str>,
    ) -> Result<Vec<DocumentRecord>> {
        let mut query = String::from("SELECT * FROM documents WHERE 1=1");
        if doc_type.is_some() {
            query.push_str(" AND doc_type = ?");
        }
        if country.is_some() {
            query.push_str(" AND country = ?");
        }
        query.push_str(" ORDER BY ingested_on DESC");

        let mut query_builder = sqlx::query_as::<_, DocumentRecord>(&query);
        if let Some(t) = doc_type {
            query_builder = query_builder.bind(t.to_string());
        }
        if let Some(c) = country {
            query_builder = query_builder.bind(c.to_string());
        }

        let docs = query_builder.fetch_all(&self.pool).await?;
        Ok(docs)
    }

    /// Update a document's lifecycle status
    pub async fn update_document_status(
        &self,
        id: &str,
        status: DocumentStatus,
        error_message: Option<&str>,
    ) -> Result<()> {
        sqlx::query("UPDATE documents SET status = ?, error_message = ? WHERE id = ?")
            .bind(status.to_string())
            .bind(error_message)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Mark a document fully ingested with its final counts and file paths
    pub async fn finalize_document(
        &self,
        id: &str,
        page_count: i32,
        chunk_count: i32,
        original_path: &str,
        text_path: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE documents SET
                status = ?, page_count = ?, chunk_count = ?,
                original_path = ?, text_path = ?, error_message = NULL
            WHERE id = ?
            "#,
        )
        .bind(DocumentStatus::Ingested.to_string())
        .bind(page_count)
        .bind(chunk_count)
        .bind(original_path)
        .bind(text_path)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Delete a document row
    pub async fn delete_document(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Count ingested documents for a country/type pair
    pub async fn count_region_documents(&self, country: &str, doc_type: DocType) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM documents WHERE country = ? AND doc_type = ? AND status = 'ingested'",
        )
        .bind(country)
        .bind(doc_type.to_string())
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Ingested document counts per region, most covered first
    pub async fn region_counts(&self, doc_type: Option<DocType>) -> Result<Vec<RegionCount>> {
        let query = if doc_type.is_some() {
            "SELECT country, COUNT(*) AS document_count FROM documents \
             WHERE status = 'ingested' AND doc_type = ? \
             GROUP BY country ORDER BY document_count DESC, country"
        } else {
            "SELECT country, COUNT(*) AS document_count FROM documents \
             WHERE status = 'ingested' \
             GROUP BY country ORDER BY document_count DESC, country"
        };

        let mut query_builder = sqlx::query_as::<_, RegionCount>(query);
        if let Some(t) = doc_type {
            query_builder = query_builder.bind(t.to_string());
        }
        let counts = query_builder.fetch_all(&self.pool).await?;
        Ok(counts)
    }

    /// Total number of ingested documents
    pub async fn count_ingested_documents(&self) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE status = 'ingested'")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    // ===== Plan Operations =====

    /// Insert a generated plan.
    ///
    /// The UNIQUE(user_id, target_date, plan_type) index is the only
    /// concurrency control for plan creation; its violation is translated to
    /// a Duplicate error here.
    pub async fn insert_plan(&self, plan: &PlanRecord) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO plans (id, user_id, target_date, plan_type, region, content_json,
                totals_json, sources_json, tips_json, status, generated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&plan.id)
        .bind(&plan.user_id)
        .bind(&plan.target_date)
        .bind(&plan.plan_type)
        .bind(&plan.region)
        .bind(&plan.content_json)
        .bind(&plan.totals_json)
        .bind(&plan.sources_json)
        .bind(&plan.tips_json)
        .bind(&plan.status)
        .bind(&plan.generated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(Error::Duplicate(format!(
                    "A {} plan for {} already exists for this user",
                    plan.plan_type, plan.target_date
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Get a plan by its natural key
    pub async fn get_plan(
        &self,
        user_id: &str,
        target_date: &str,
        plan_type: PlanType,
    ) -> Result<Option<PlanRecord>> {
        let plan = sqlx::query_as::<_, PlanRecord>(
            "SELECT * FROM plans WHERE user_id = ? AND target_date = ? AND plan_type = ?",
        )
        .bind(user_id)
        .bind(target_date)
        .bind(plan_type.to_string())
        .fetch_optional(&self.pool)
        .await?;
        Ok(plan)
    }

    /// Plans for a user and type within a date range (inclusive)
    pub async fn plans_between(
        &self,
        user_id: &str,
        plan_type: PlanType,
        from_date: &str,
        to_date: &str,
    ) -> Result<Vec<PlanRecord>> {
        let plans = sqlx::query_as::<_, PlanRecord>(
            "SELECT * FROM plans WHERE user_id = ? AND plan_type = ? \
             AND target_date >= ? AND target_date <= ? ORDER BY target_date",
        )
        .bind(user_id)
        .bind(plan_type.to_string())
        .bind(from_date)
        .bind(to_date)
        .fetch_all(&self.pool)
        .await?;
        Ok(plans)
    }

    /// Update a plan's lifecycle status
    pub async fn update_plan_status(&self, id: &str, status: PlanStatus) -> Result<()> {
        sqlx::query("UPDATE plans SET status = ? WHERE id = ?")
            .bind(status.to_string())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Delete a plan by its natural key; Ok(true) if a row was removed
    pub async fn delete_plan(
        &self,
        user_id: &str,
        target_date: &str,
        plan_type: PlanType,
    ) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM plans WHERE user_id = ? AND target_date = ? AND plan_type = ?",
        )
        .bind(user_id)
        .bind(target_date)
        .bind(plan_type.to_string())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // ===== Profile Operations =====

    /// Insert or replace a user profile
    pub async fn upsert_profile(&self, profile: &ProfileRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO profiles (user_id, gender, birth_date, weight_kg, height_cm,
                activity_level, country, diabetes_type, medications_json, dietary_preference,
                weight_goal)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                gender = excluded.gender,
                birth_date = excluded.birth_date,
                weight_kg = excluded.weight_kg,
                height_cm = excluded.height_cm,
                activity_level = excluded.activity_level,
                country = excluded.country,
                diabetes_type = excluded.diabetes_type,
                medications_json = excluded.medications_json,
                dietary_preference = excluded.dietary_preference,
                weight_goal = excluded.weight_goal
            "#,
        )
        .bind(&profile.user_id)
        .bind(&profile.gender)
        .bind(&profile.birth_date)
        .bind(profile.weight_kg)
        .bind(profile.height_cm)
        .bind(&profile.activity_level)
        .bind(&profile.country)
        .bind(&profile.diabetes_type)
        .bind(&profile.medications_json)
        .bind(&profile.dietary_preference)
        .bind(&profile.weight_goal)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Get a user profile
    pub async fn get_profile(&self, user_id: &str) -> Result<Option<ProfileRecord>> {
        let profile = sqlx::query_as::<_, ProfileRecord>("SELECT * FROM profiles WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn setup_test_db() -> (Registry, TempDir) {
        let tmp = TempDir::new().unwrap();
        let db = Registry::new(&tmp.path().join("test.db")).await.unwrap();
        (db, tmp)
    }

    fn test_document(checksum: &str, country: &str, doc_type: DocType) -> DocumentRecord {
        DocumentRecord::new(
            checksum.to_string(),
            "guide.pdf".to_string(),
            "Diet guide".to_string(),
            "WHO".to_string(),
            country.to_string(),
            doc_type,
            "1.0".to_string(),
            Some("admin".to_string()),
        )
    }

    #[tokio::test]
    async fn test_document_crud() {
        let (db, _tmp) = setup_test_db().await;

        let doc = test_document("abc123", "India", DocType::DietChart);
        db.insert_document(&doc).await.unwrap();

        let loaded = db.get_document(&doc.id).await.unwrap().unwrap();
        assert_eq!(loaded.checksum, "abc123");
        assert_eq!(loaded.get_status().unwrap(), DocumentStatus::Pending);

        let by_checksum = db.get_document_by_checksum("abc123").await.unwrap();
        assert!(by_checksum.is_some());

        db.finalize_document(&doc.id, 12, 40, "/u/doc.pdf", "/t/doc.txt")
            .await
            .unwrap();
        let loaded = db.get_document(&doc.id).await.unwrap().unwrap();
        assert_eq!(loaded.get_status().unwrap(), DocumentStatus::Ingested);
        assert_eq!(loaded.chunk_count, 40);

        db.delete_document(&doc.id).await.unwrap();
        assert!(db.get_document(&doc.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_checksum_is_unique() {
        let (db, _tmp) = setup_test_db().await;

        db.insert_document(&test_document("same", "India", DocType::DietChart))
            .await
            .unwrap();
        let err = db
            .insert_document(&test_document("same", "India", DocType::DietChart))
            .await
            .unwrap_err();
        match err {
            Error::Duplicate(msg) => assert!(msg.contains("same")),
            other => panic!("expected duplicate error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_region_counts() {
        let (db, _tmp) = setup_test_db().await;

        for (i, country) in ["India", "India", "Global"].iter().enumerate() {
            let doc = test_document(&format!("c{}", i), country, DocType::DietChart);
            db.insert_document(&doc).await.unwrap();
            db.finalize_document(&doc.id, 1, 1, "/u", "/t").await.unwrap();
        }
        // A pending document never counts toward coverage
        db.insert_document(&test_document("c9", "India", DocType::DietChart))
            .await
            .unwrap();

        assert_eq!(
            db.count_region_documents("India", DocType::DietChart)
                .await
                .unwrap(),
            2
        );
        assert_eq!(
            db.count_region_documents("India", DocType::ExerciseRecommendation)
                .await
                .unwrap(),
            0
        );

        let counts = db.region_counts(Some(DocType::DietChart)).await.unwrap();
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].country, "India");
        assert_eq!(counts[0].document_count, 2);
    }

    #[tokio::test]
    async fn test_plan_unique_violation_becomes_duplicate() {
        let (db, _tmp) = setup_test_db().await;

        let plan = PlanRecord::new(
            "user-1".to_string(),
            "2026-09-01".to_string(),
            PlanType::Diet,
            "India".to_string(),
            "{}".to_string(),
            "{}".to_string(),
            "[]".to_string(),
            "[]".to_string(),
        );
        db.insert_plan(&plan).await.unwrap();

        let again = PlanRecord::new(
            "user-1".to_string(),
            "2026-09-01".to_string(),
            PlanType::Diet,
            "India".to_string(),
            "{}".to_string(),
            "{}".to_string(),
            "[]".to_string(),
            "[]".to_string(),
        );
        let err = db.insert_plan(&again).await.unwrap_err();
        assert!(matches!(err, Error::Duplicate(_)));

        // A different plan type on the same date is fine
        let exercise = PlanRecord::new(
            "user-1".to_string(),
            "2026-09-01".to_string(),
            PlanType::Exercise,
            "India".to_string(),
            "{}".to_string(),
            "{}".to_string(),
            "[]".to_string(),
            "[]".to_string(),
        );
        db.insert_plan(&exercise).await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_plan_writers_exactly_one_wins() {
        let (db, _tmp) = setup_test_db().await;

        let make_plan = || {
            PlanRecord::new(
                "user-1".to_string(),
                "2026-09-01".to_string(),
                PlanType::Diet,
                "India".to_string(),
                "{}".to_string(),
                "{}".to_string(),
                "[]".to_string(),
                "[]".to_string(),
            )
        };
        let first = make_plan();
        let second = make_plan();

        let (a, b) = tokio::join!(db.insert_plan(&first), db.insert_plan(&second));
        assert_ne!(a.is_ok(), b.is_ok());
        let loser = if a.is_ok() { b } else { a };
        assert!(matches!(loser.unwrap_err(), Error::Duplicate(_)));

        // Exactly one row landed
        let stored = db
            .get_plan("user-1", "2026-09-01", PlanType::Diet)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.id == first.id || stored.id == second.id);
    }

    #[tokio::test]
    async fn test_plans_between() {
        let (db, _tmp) = setup_test_db().await;

        for date in ["2026-08-28", "2026-08-29", "2026-08-31"] {
            let plan = PlanRecord::new(
                "user-1".to_string(),
                date.to_string(),
                PlanType::Diet,
                "Global".to_string(),
                "{}".to_string(),
                "{}".to_string(),
                "[]".to_string(),
                "[]".to_string(),
            );
            db.insert_plan(&plan).await.unwrap();
        }

        let window = db
            .plans_between("user-1", PlanType::Diet, "2026-08-28", "2026-08-30")
            .await
            .unwrap();
        assert_eq!(window.len(), 2);
    }

    #[tokio::test]
    async fn test_profile_roundtrip_and_missing_fields() {
        let (db, _tmp) = setup_test_db().await;

        let mut profile = ProfileRecord {
            user_id: "user-1".to_string(),
            gender: Some("female".to_string()),
            birth_date: Some("1985-04-12".to_string()),
            weight_kg: Some(68.0),
            height_cm: None,
            activity_level: Some("moderate".to_string()),
            country: Some("India".to_string()),
            diabetes_type: Some("Type 2".to_string()),
            medications_json: None,
            dietary_preference: Some("vegetarian".to_string()),
            weight_goal: Some("maintain".to_string()),
        };
        db.upsert_profile(&profile).await.unwrap();

        let loaded = db.get_profile("user-1").await.unwrap().unwrap();
        assert_eq!(loaded.missing_fields(), vec!["height_cm"]);

        profile.height_cm = Some(162.0);
        db.upsert_profile(&profile).await.unwrap();
        let loaded = db.get_profile("user-1").await.unwrap().unwrap();
        assert!(loaded.missing_fields().is_empty());
    }

    #[test]
    fn test_doc_type_roundtrip() {
        for t in [
            DocType::Guideline,
            DocType::ResearchPaper,
            DocType::DietChart,
            DocType::ExerciseRecommendation,
            DocType::ClinicalMaterial,
            DocType::Other,
        ] {
            assert_eq!(t.to_string().parse::<DocType>().unwrap(), t);
        }
        assert!(matches!(
            "workout".parse::<DocType>(),
            Err(Error::Validation(_))
        ));
    }
}
