//! SQLite schema definition

/// SQL schema for the registry database
pub const SCHEMA_SQL: &str = r#"
-- Documents: ingested knowledge-base files
CREATE TABLE IF NOT EXISTS documents (
    id TEXT PRIMARY KEY,
    checksum TEXT NOT NULL UNIQUE,
    original_filename TEXT NOT NULL,
    title TEXT NOT NULL,
    source TEXT NOT NULL,
    country TEXT NOT NULL,
    doc_type TEXT NOT NULL,
    version TEXT NOT NULL DEFAULT '1.0',
    original_path TEXT,
    text_path TEXT,
    page_count INTEGER NOT NULL DEFAULT 0,
    chunk_count INTEGER NOT NULL DEFAULT 0,
    ingested_by TEXT,
    ingested_on TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    error_message TEXT
);

-- Generated plans: one per (user, date, type)
CREATE TABLE IF NOT EXISTS plans (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    target_date TEXT NOT NULL,
    plan_type TEXT NOT NULL,
    region TEXT NOT NULL,
    content_json TEXT NOT NULL,
    totals_json TEXT NOT NULL,
    sources_json TEXT NOT NULL,
    tips_json TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    generated_at TEXT NOT NULL,
    UNIQUE(user_id, target_date, plan_type)
);

-- User profiles: the inputs plan generation needs
CREATE TABLE IF NOT EXISTS profiles (
    user_id TEXT PRIMARY KEY,
    gender TEXT,
    birth_date TEXT,
    weight_kg REAL,
    height_cm REAL,
    activity_level TEXT,
    country TEXT,
    diabetes_type TEXT,
    medications_json TEXT,
    dietary_preference TEXT,
    weight_goal TEXT
);

-- Indexes for performance
CREATE INDEX IF NOT EXISTS idx_documents_type_country ON documents(doc_type, country);
CREATE INDEX IF NOT EXISTS idx_documents_status ON documents(status);
CREATE INDEX IF NOT EXISTS idx_plans_user_date ON plans(user_id, target_date);
"#;
