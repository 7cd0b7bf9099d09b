// SQLite datasource store. All operations are scoped to one organization.

mod row;

use crate::error::StoreError;
use crate::models::DataSource;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tracing::{info, instrument};

pub struct DataSourceStore {
    pool: SqlitePool,
    org_id: i64,
}

impl DataSourceStore {
    pub async fn connect(path: &str, org_id: i64) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new().connect_with(opts).await?;
        Ok(Self { pool, org_id })
    }

    pub fn org_id(&self) -> i64 {
        self.org_id
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS data_source (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                org_id INTEGER NOT NULL,
                uid TEXT NOT NULL,
                version INTEGER NOT NULL,
                name TEXT NOT NULL,
                type TEXT NOT NULL,
                access TEXT NOT NULL,
                url TEXT NOT NULL,
                password TEXT NOT NULL DEFAULT '',
                database_name TEXT NOT NULL DEFAULT '',
                user_name TEXT NOT NULL DEFAULT '',
                basic_auth INTEGER NOT NULL DEFAULT 0,
                basic_auth_user TEXT NOT NULL DEFAULT '',
                basic_auth_password TEXT NOT NULL DEFAULT '',
                with_credentials INTEGER NOT NULL DEFAULT 0,
                is_default INTEGER NOT NULL DEFAULT 0,
                json_data TEXT NOT NULL DEFAULT '{}',
                created INTEGER NOT NULL,
                updated INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_data_source_org_uid ON data_source(org_id, uid)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self), fields(repo = "datasource", operation = "get"))]
    pub async fn get(&self, uid: &str) -> Result<DataSource, StoreError> {
        let sql = format!(
            "SELECT {} FROM data_source WHERE org_id = $1 AND uid = $2",
            row::SELECT_COLUMNS
        );
        let found = sqlx::query(&sql)
            .bind(self.org_id)
            .bind(uid)
            .fetch_optional(&self.pool)
            .await?;
        let Some(found) = found else {
            return Err(StoreError::NotFound(uid.to_string()));
        };
        row::from_row(&found)
    }

    #[instrument(skip(self), fields(repo = "datasource", operation = "list"))]
    pub async fn list(&self) -> Result<Vec<DataSource>, StoreError> {
        let sql = format!(
            "SELECT {} FROM data_source WHERE org_id = $1 ORDER BY name ASC, uid ASC",
            row::SELECT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(self.org_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row::from_row).collect()
    }

    /// Inserts at version 1. The incoming resource_version is ignored.
    #[instrument(skip(self, ds), fields(repo = "datasource", operation = "insert", uid = %ds.uid))]
    pub async fn insert(&self, ds: &DataSource) -> Result<DataSource, StoreError> {
        let now = chrono::Utc::now().timestamp_millis();
        let spec = &ds.spec;
        let json_data = serde_json::to_string(&spec.json_data)?;
        let result = sqlx::query(
            "INSERT INTO data_source (org_id, uid, version, name, type, access, url, password, \
             database_name, user_name, basic_auth, basic_auth_user, basic_auth_password, \
             with_credentials, is_default, json_data, created, updated) \
             VALUES ($1, $2, 1, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)",
        )
        .bind(self.org_id)
        .bind(&ds.uid)
        .bind(&spec.name)
        .bind(&spec.type_)
        .bind(spec.access.as_str())
        .bind(&spec.url)
        .bind(&spec.password)
        .bind(&spec.database)
        .bind(&spec.user)
        .bind(spec.basic_auth)
        .bind(&spec.basic_auth_user)
        .bind(&spec.basic_auth_password)
        .bind(spec.with_credentials)
        .bind(spec.is_default)
        .bind(&json_data)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {}
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(StoreError::AlreadyExists(ds.uid.clone()));
            }
            Err(e) => return Err(e.into()),
        }
        info!(uid = %ds.uid, name = %spec.name, "datasource created");
        self.get(&ds.uid).await
    }

    /// Updates only if the stored version equals `ds.resource_version`; bumps the version.
    #[instrument(skip(self, ds), fields(repo = "datasource", operation = "update", uid = %ds.uid))]
    pub async fn update(&self, ds: &DataSource) -> Result<DataSource, StoreError> {
        let expected = row::parse_resource_version(&ds.resource_version)?;
        let now = chrono::Utc::now().timestamp_millis();
        let spec = &ds.spec;
        let json_data = serde_json::to_string(&spec.json_data)?;
        let result = sqlx::query(
            "UPDATE data_source SET version = version + 1, name = $1, type = $2, access = $3, \
             url = $4, password = $5, database_name = $6, user_name = $7, basic_auth = $8, \
             basic_auth_user = $9, basic_auth_password = $10, with_credentials = $11, \
             is_default = $12, json_data = $13, updated = $14 \
             WHERE org_id = $15 AND uid = $16 AND version = $17",
        )
        .bind(&spec.name)
        .bind(&spec.type_)
        .bind(spec.access.as_str())
        .bind(&spec.url)
        .bind(&spec.password)
        .bind(&spec.database)
        .bind(&spec.user)
        .bind(spec.basic_auth)
        .bind(&spec.basic_auth_user)
        .bind(&spec.basic_auth_password)
        .bind(spec.with_credentials)
        .bind(spec.is_default)
        .bind(&json_data)
        .bind(now)
        .bind(self.org_id)
        .bind(&ds.uid)
        .bind(expected)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Distinguish a missing row from a stale version.
            self.get(&ds.uid).await?;
            return Err(StoreError::VersionConflict {
                uid: ds.uid.clone(),
                expected,
            });
        }
        self.get(&ds.uid).await
    }

    #[instrument(skip(self), fields(repo = "datasource", operation = "delete"))]
    pub async fn delete(&self, uid: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM data_source WHERE org_id = $1 AND uid = $2")
            .bind(self.org_id)
            .bind(uid)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(uid.to_string()));
        }
        info!(uid = %uid, "datasource deleted");
        Ok(())
    }
}
