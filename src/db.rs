use anyhow::{Context, Result};
use directories::ProjectDirs;
use sqlx::{any::AnyConnectOptions, AnyPool, ConnectOptions, migrate::Migrator};
use sqlx::any::AnyPoolOptions;
use std::{path::PathBuf, str::FromStr};
use std::sync::Once;
use tracing::debug;

use crate::dao;
use crate::storage::Storage;

// Ensure drivers are installed exactly once for sqlx::any
static INSTALL_DRIVERS: Once = Once::new();

// Embed SQL migrations from the migrations/ directory
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// SQLite-backed key-value store.
#[derive(Clone)]
pub struct Database {
    pool: AnyPool,
}

impl Database {
    // Create a connection pool. If database_url is None, use a sensible default
    // (SQLite file in the user's data directory).
    pub async fn connect(database_url: Option<&str>) -> Result<Self> {
        INSTALL_DRIVERS.call_once(sqlx::any::install_default_drivers);

        let url = match database_url {
            Some(u) if !u.trim().is_empty() => u.to_string(),
            _ => default_sqlite_url()?,
        };
        debug!(%url, "opening storage database");

        let opts = AnyConnectOptions::from_str(&url)
            .with_context(|| format!("invalid database URL: {url}"))?;
        // Quiet by default; callers can enable SQLX_LOG if they want
        let opts = opts.disable_statement_logging();

        let pool = AnyPoolOptions::new()
            .max_connections(4)
            .connect_with(opts)
            .await
            .with_context(|| format!("failed to connect to database: {url}"))?;

        Ok(Self { pool })
    }

    /// Connect and bring the schema up to date.
    pub async fn open(database_url: Option<&str>) -> Result<Self> {
        let db = Self::connect(database_url).await?;
        db.run_migrations().await?;
        Ok(db)
    }

    pub async fn run_migrations(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.context("running migrations")
    }

    pub fn pool(&self) -> &AnyPool { &self.pool }
}

#[async_trait::async_trait]
impl Storage for Database {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        dao::get_value(&self.pool, key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        dao::put_value(&self.pool, key, value).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let removed = dao::delete_value(&self.pool, key).await?;
        debug!(key, removed, "deleted storage key");
        Ok(())
    }
}

fn default_sqlite_url() -> Result<String> {
    let proj = ProjectDirs::from("pro", "img", "imgpro")
        .context("unable to determine data directory for default sqlite path")?;
    let mut path: PathBuf = proj.data_dir().to_path_buf();
    std::fs::create_dir_all(&path).with_context(|| format!("creating data dir: {}", path.display()))?;
    path.push("imgpro.db");
    Ok(sqlite_url_for(&path))
}

/// `sqlite://` URL for a file path, creating the file on first open.
pub fn sqlite_url_for(path: &std::path::Path) -> String {
    // Encode spaces in the path for a valid sqlite URL
    let path_str = path.to_string_lossy().replace(' ', "%20");
    format!("sqlite://{path_str}?mode=rwc")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{HISTORY_KEY, TOKEN_KEY};

    async fn temp_db(dir: &tempfile::TempDir) -> Database {
        let url = sqlite_url_for(&dir.path().join("test.db"));
        Database::open(Some(&url)).await.unwrap()
    }

    #[tokio::test]
    async fn values_survive_reconnect() {
        let dir = tempfile::tempdir().unwrap();
        {
            let db = temp_db(&dir).await;
            db.set(TOKEN_KEY, "42|secret").await.unwrap();
            db.pool().close().await;
        }
        let db = temp_db(&dir).await;
        assert_eq!(db.get(TOKEN_KEY).await.unwrap().as_deref(), Some("42|secret"));
    }

    #[tokio::test]
    async fn set_overwrites_and_delete_removes() {
        let dir = tempfile::tempdir().unwrap();
        let db = temp_db(&dir).await;
        db.set(HISTORY_KEY, "[]").await.unwrap();
        db.set(HISTORY_KEY, "[1]").await.unwrap();
        assert_eq!(db.get(HISTORY_KEY).await.unwrap().as_deref(), Some("[1]"));
        db.delete(HISTORY_KEY).await.unwrap();
        assert_eq!(db.get(HISTORY_KEY).await.unwrap(), None);
        // second delete is a no-op
        db.delete(HISTORY_KEY).await.unwrap();
    }

    #[test]
    fn sqlite_url_encodes_spaces() {
        let url = sqlite_url_for(std::path::Path::new("/tmp/my dir/x.db"));
        assert_eq!(url, "sqlite:///tmp/my%20dir/x.db?mode=rwc");
    }
}
