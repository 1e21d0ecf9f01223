//! PostgreSQL staging database bootstrap.
//!
//! Connects with the `postgres_db` settings and makes sure the `stage`
//! schema exists. The returned handle owns the pool for the rest of the run.

use std::time::Duration;

use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{PgPool, Postgres};
use tracing::info;

use landsat_common::{DatabaseConfig, PreprocessError, PreprocessResult};

/// Name of the schema staged rasters are loaded into.
pub const STAGING_SCHEMA: &str = "stage";

const SCHEMA_SQL: &str = "CREATE SCHEMA IF NOT EXISTS stage;";

/// Connection pool with the staging schema in place.
#[derive(Debug, Clone)]
pub struct StagingDatabase {
    pool: PgPool,
}

impl StagingDatabase {
    /// Open a pool for `config`. Does not touch the schema.
    pub async fn connect(config: &DatabaseConfig) -> PreprocessResult<Self> {
        info!(url = %config.redacted_url(), "Connecting to staging database");

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect_with(connect_options(config))
            .await
            .map_err(|e| PreprocessError::Database(format!("Connection failed: {}", e)))?;

        Ok(Self { pool })
    }

    /// Create the staging schema. Safe to run repeatedly.
    pub async fn migrate(&self) -> PreprocessResult<()> {
        for statement in SCHEMA_SQL.split(';') {
            let trimmed = statement.trim();
            if !trimmed.is_empty() {
                sqlx::query(trimmed)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| PreprocessError::Database(format!("Migration failed: {}", e)))?;
            }
        }

        Ok(())
    }

    /// The shared connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check out a single connection from the pool.
    pub async fn acquire(&self) -> PreprocessResult<PoolConnection<Postgres>> {
        self.pool
            .acquire()
            .await
            .map_err(|e| PreprocessError::Database(format!("Acquire failed: {}", e)))
    }
}

/// Connection options built field by field so the password never passes
/// through a URL string.
pub fn connect_options(config: &DatabaseConfig) -> PgConnectOptions {
    PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.db_name)
}

/// Connect and ensure the `stage` schema exists.
pub async fn ensure_staging_schema(config: &DatabaseConfig) -> PreprocessResult<StagingDatabase> {
    let db = StagingDatabase::connect(config).await?;
    db.migrate().await?;
    info!(schema = STAGING_SCHEMA, db_name = %config.db_name, "Staging schema ready");
    Ok(db)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_config() -> DatabaseConfig {
        DatabaseConfig {
            host: std::env::var("POSTGRES_HOST").unwrap_or_else(|_| "localhost".into()),
            port: std::env::var("POSTGRES_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5432),
            db_name: std::env::var("POSTGRES_DB").unwrap_or_else(|_| "landsat".into()),
            user: std::env::var("POSTGRES_USER").unwrap_or_else(|_| "postgres".into()),
            password: std::env::var("POSTGRES_PASSWORD").unwrap_or_else(|_| "postgres".into()),
            max_connections: 2,
            connect_timeout_secs: 5,
        }
    }

    #[test]
    fn test_connect_options_carry_settings() {
        let config = DatabaseConfig {
            host: "db.internal".into(),
            port: 6543,
            db_name: "landsat".into(),
            user: "loader".into(),
            password: "secret".into(),
            max_connections: 5,
            connect_timeout_secs: 10,
        };
        let options = connect_options(&config);
        assert_eq!(options.get_host(), "db.internal");
        assert_eq!(options.get_port(), 6543);
        assert_eq!(options.get_username(), "loader");
        assert_eq!(options.get_database(), Some("landsat"));
    }

    #[test]
    fn test_schema_sql_is_idempotent() {
        assert!(SCHEMA_SQL.contains("IF NOT EXISTS"));
        assert!(SCHEMA_SQL.contains(STAGING_SCHEMA));
    }

    #[tokio::test]
    async fn test_unreachable_database_is_database_error() {
        let config = DatabaseConfig {
            host: "127.0.0.1".into(),
            // Reserved port, nothing listens there.
            port: 1,
            connect_timeout_secs: 2,
            ..local_config()
        };
        let err = ensure_staging_schema(&config).await.unwrap_err();
        assert!(matches!(err, PreprocessError::Database(_)), "{:?}", err);
        assert!(!err.to_string().contains(&config.password));
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance"]
    async fn test_ensure_schema_twice() {
        let config = local_config();
        let db = ensure_staging_schema(&config).await.unwrap();
        db.migrate().await.unwrap();

        let mut conn = db.acquire().await.unwrap();
        let found: Option<(String,)> = sqlx::query_as(
            "SELECT schema_name::text FROM information_schema.schemata WHERE schema_name = $1",
        )
        .bind(STAGING_SCHEMA)
        .fetch_optional(&mut *conn)
        .await
        .unwrap();
        assert_eq!(found.map(|(name,)| name), Some(STAGING_SCHEMA.to_string()));
    }
}
