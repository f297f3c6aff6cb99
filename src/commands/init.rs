//! Init command implementation

use crate::config::Config;
use crate::error::{Error, Result};
use crate::registry::Registry;
use crate::store::VectorStore;
use std::path::PathBuf;
use tracing::{info, warn};

/// Initialize configuration, data directories and the registry database.
///
/// Qdrant is probed but unreachable is not fatal here; ingestion will fail
/// later with a pointed message if it is still down.
pub async fn cmd_init(base_dir: Option<PathBuf>, force: bool) -> Result<Config> {
    let base_dir = base_dir.unwrap_or_else(Config::default_base_dir);
    let config_path = base_dir.join("config.toml");

    if config_path.exists() && !force {
        return Err(Error::Config(format!(
            "Config already exists at {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    let mut config = Config::default();
    config.paths.base_dir = base_dir.clone();
    config.paths.config_file = config_path.clone();
    config.paths.db_file = base_dir.join("registry.db");
    config.paths.uploads_dir = base_dir.join("uploads");
    config.paths.texts_dir = base_dir.join("texts");
    config.validate()?;
    config.ensure_dirs()?;
    config.save()?;
    info!("Wrote config to {}", config_path.display());

    // Creates the schema as a side effect
    let registry = Registry::new(&config.paths.db_file).await?;
    drop(registry);
    info!("Registry database ready at {}", config.paths.db_file.display());

    // Building the client never touches the network, so probe before the
    // collection bootstrap
    let store = VectorStore::connect(&config).await?;
    match store.health_check().await {
        Ok(()) => {
            store.ensure_collection().await?;
            info!("Qdrant collection '{}' ready", config.collection_name);
        }
        Err(e) => {
            warn!("Qdrant not reachable yet: {}", e.user_message(true));
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_succeeds_without_qdrant() {
        let tmp = TempDir::new().unwrap();

        let config = cmd_init(Some(tmp.path().to_path_buf()), false)
            .await
            .unwrap();
        assert!(config.paths.config_file.exists());
        assert!(config.paths.db_file.exists());

        // Re-running without --force refuses to overwrite
        let err = cmd_init(Some(tmp.path().to_path_buf()), false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        cmd_init(Some(tmp.path().to_path_buf()), true).await.unwrap();
    }
}
