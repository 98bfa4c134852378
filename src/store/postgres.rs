use crate::store::{StoreError, StoreErrorKind, VersionStore};

use sqlx::pool::PoolConnection;
use sqlx::{PgPool, Postgres};


/// Advisory lock key shared by every process migrating the same database.
const LOCK_KEY: i64 = 0x0073_7765_6c6c_6f77;

const UNDEFINED_TABLE: &str = "42P01";


/// Version cursor stored in a one-row Postgres table.
pub struct PostgresStore {
    pool: PgPool,
    lock: Option<PoolConnection<Postgres>>,
}

impl PostgresStore {
    /// Parses `conn_str` without opening a connection; the first query connects.
    pub fn connect_lazy(conn_str: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect_lazy(conn_str)?;
        Ok(PostgresStore::from_pool(pool))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        PostgresStore { pool, lock: None }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn ensure_table(&self) -> Result<(), StoreError> {
        sqlx::query("CREATE SCHEMA IF NOT EXISTS swellow_methods;")
            .execute(&self.pool)
            .await?;

        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS swellow_methods.version (
                id BOOLEAN PRIMARY KEY DEFAULT TRUE CHECK (id),
                version_id BIGINT NOT NULL,
                dtm_updated_at TIMESTAMP DEFAULT now()
            );
        "#)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Take the session-level advisory lock guarding the cursor.
    ///
    /// The lock lives on a dedicated pooled connection until `release_lock`.
    pub async fn acquire_lock(&mut self) -> Result<(), StoreError> {
        if self.lock.is_some() {
            return Ok(());
        }

        let mut conn = self.pool.acquire().await?;
        let acquired: bool = sqlx::query_scalar("SELECT pg_try_advisory_lock($1)")
            .bind(LOCK_KEY)
            .fetch_one(&mut *conn)
            .await?;

        if !acquired {
            return Err(StoreError::new(StoreErrorKind::LockConflict));
        }
        self.lock = Some(conn);

        Ok(())
    }

    pub async fn release_lock(&mut self) -> Result<(), StoreError> {
        if let Some(mut conn) = self.lock.take() {
            sqlx::query("SELECT pg_advisory_unlock($1)")
                .bind(LOCK_KEY)
                .execute(&mut *conn)
                .await?;
        }
        Ok(())
    }
}

fn classify(error: sqlx::Error) -> StoreError {
    let undefined_table = matches!(
        &error,
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNDEFINED_TABLE)
    );
    if undefined_table {
        StoreError::new(StoreErrorKind::NotInitialized)
    } else {
        StoreError::from(error)
    }
}

#[async_trait::async_trait]
impl VersionStore for PostgresStore {
    async fn current_version(&mut self) -> Result<i64, StoreError> {
        let version: Option<i64> = sqlx::query_scalar(
            "SELECT version_id FROM swellow_methods.version WHERE id",
        )
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)?;

        Ok(version.unwrap_or(0))
    }

    async fn set_current_version(&mut self, version: i64) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO swellow_methods.version (id, version_id)
            VALUES (TRUE, $1)
            ON CONFLICT (id)
            DO UPDATE SET
                version_id = EXCLUDED.version_id,
                dtm_updated_at = now()
            "#,
        )
            .bind(version)
            .execute(&self.pool)
            .await
            .map_err(classify)?;

        tracing::debug!("Version cursor set to {version}");
        Ok(())
    }
}
