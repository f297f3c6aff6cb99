//! Default values for configuration

/// Default Qdrant gRPC URL for local development (port 6334, not 6333 REST)
pub fn default_qdrant_url() -> String {
    std::env::var("QDRANT_URL").unwrap_or_else(|_| "http://127.0.0.1:6334".to_string())
}

/// Default collection name
pub fn default_collection_name() -> String {
    "nutriplan_chunks".to_string()
}

/// Default embedding model (BAAI/bge-small-en-v1.5)
pub fn default_embedding_model() -> String {
    "BAAI/bge-small-en-v1.5".to_string()
}

/// Default embedding dimension
pub fn default_embedding_dimension() -> usize {
    384
}

/// Default batch size for embedding
pub fn default_embedding_batch_size() -> usize {
    32
}

/// Default words per chunk
pub fn default_chunk_size_words() -> usize {
    350
}

/// Default overlap words between chunks
pub fn default_chunk_overlap_words() -> usize {
    80
}

/// Default number of query results
pub fn default_query_k() -> usize {
    5
}

/// Default maximum query results
pub fn default_query_max_k() -> usize {
    50
}

/// Default minimum similarity score
pub fn default_query_min_score() -> f32 {
    0.0
}

/// Default OpenAI-compatible chat endpoint (LM Studio)
pub fn default_llm_base_url() -> String {
    std::env::var("LLM_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:1234".to_string())
}

/// Default chat model identifier
pub fn default_llm_model() -> String {
    std::env::var("LLM_MODEL").unwrap_or_else(|_| "local-model".to_string())
}

/// Default sampling temperature
pub fn default_llm_temperature() -> f32 {
    0.7
}

/// Default LLM request timeout in seconds
pub fn default_llm_timeout_secs() -> u64 {
    90
}

/// Default furthest plan date (days ahead of today)
pub fn default_plan_max_days_ahead() -> i64 {
    5
}

/// Default lookback window for the variety avoid-list (days)
pub fn default_plan_avoid_window_days() -> i64 {
    3
}

/// Default context chunks included in a diet prompt
pub fn default_plan_diet_context_chunks() -> usize {
    10
}

/// Default context chunks included in an exercise prompt
pub fn default_plan_exercise_context_chunks() -> usize {
    5
}
