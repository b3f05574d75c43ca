use crate::config::Config;
use anyhow::Result;
use libsql::{Builder, Connection, Database as LibsqlDatabase};
use std::path::Path;
use std::time::Duration;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

const SYSTEM_MIGRATIONS: &[(&str, &str)] =
    &[("system/000_migrations_table.sql", include_str!("migrations/system/000_migrations_table.sql"))];

pub struct Database {
    db: LibsqlDatabase,
    conn: Connection,
    tx_lock: RwLock<()>,
    turso_url: Option<String>,
    turso_auth_token: Option<String>,
}

impl Database {
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn is_replica(turso_url: &Option<String>, turso_auth_token: &Option<String>) -> bool {
        turso_url.is_some() && turso_auth_token.is_some()
    }

    pub async fn sync(&self) -> Result<()> {
        if Self::is_replica(&self.turso_url, &self.turso_auth_token) {
            self.db
                .sync()
                .await
                .map_err(|e| anyhow::anyhow!("sync failed: {}", e))?;
        }
        Ok(())
    }

    async fn is_migration_applied(conn: &Connection, name: &str) -> Result<bool> {
        let query = "SELECT 1 FROM _migrations WHERE name = ?";
        match conn.query(query, libsql::params![name]).await {
            Ok(mut rows) => Ok(rows.next().await?.is_some()),
            Err(e) => {
                if e.to_string().contains("no such table") {
                    Ok(false)
                } else {
                    Err(e.into())
                }
            }
        }
    }

    async fn record_migration(conn: &Connection, name: &str) -> Result<()> {
        let query = r#"
            INSERT INTO _migrations (name, applied_at)
            VALUES (?, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        "#;
        conn.execute(query, libsql::params![name]).await?;
        Ok(())
    }

    async fn run_migration(conn: &Connection, name: &str, sql: &str) -> Result<()> {
        if Self::is_migration_applied(conn, name).await? {
            tracing::debug!("migration {} already applied, skipping", name);
            return Ok(());
        }

        tracing::info!("applying migration: {}", name);
        conn.execute_batch(sql)
            .await
            .map_err(|e| anyhow::anyhow!("failed to execute migration {name}: {e}"))?;

        Self::record_migration(conn, name).await?;
        Ok(())
    }

    async fn migrate(conn: &Connection) -> Result<()> {
        let feature_migrations = [
            crate::users::migrations(),
            crate::products::migrations(),
            crate::reviews::migrations(),
            crate::coupons::migrations(),
            crate::auth::migrations(),
        ];

        for (filename, sql) in SYSTEM_MIGRATIONS {
            Self::run_migration(conn, filename, sql).await?;
        }

        for migrations in feature_migrations {
            for (filename, sql) in migrations {
                Self::run_migration(conn, filename, sql).await?;
            }
        }

        Ok(())
    }

    pub async fn new(cfg: &Config, data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(cfg.app.get_db());
        let turso_url = cfg.app.turso_url.clone();
        let turso_auth_token = cfg.app.turso_auth_token.clone();

        let db = match (&turso_url, &turso_auth_token) {
            (Some(url), Some(token)) => {
                tracing::info!("[db] running as an embedded replica of {}", url);
                let sync_interval = Duration::from_secs(cfg.app.sync_interval_seconds);
                Builder::new_synced_database(&path, url.clone(), token.clone())
                    .sync_interval(sync_interval)
                    .build()
                    .await?
            }
            _ => {
                tracing::info!("[db] running against local file {:?}", path);
                Builder::new_local(&path).build().await?
            }
        };

        Self::open(db, turso_url, turso_auth_token).await
    }

    /// Fresh, fully migrated database that lives only as long as the value.
    pub async fn in_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:").build().await?;
        Self::open(db, None, None).await
    }

    async fn open(
        db: LibsqlDatabase,
        turso_url: Option<String>,
        turso_auth_token: Option<String>,
    ) -> Result<Self> {
        let conn = db.connect()?;
        conn.query("SELECT 1", ()).await?;

        Self::migrate(&conn).await?;

        Ok(Database {
            db,
            conn,
            tx_lock: RwLock::new(()),
            turso_url,
            turso_auth_token,
        })
    }

    /// Serializes writers on the shared connection. Single-statement writes
    /// hold it for the statement, transactions for their whole span.
    pub async fn write_lock(&self) -> RwLockWriteGuard<'_, ()> {
        self.tx_lock.write().await
    }

    /// Readers share the connection with the writer, so they wait out any open
    /// transaction instead of seeing its uncommitted rows. Never take this while
    /// already holding the write lock.
    pub async fn read_lock(&self) -> RwLockReadGuard<'_, ()> {
        self.tx_lock.read().await
    }

    /// Takes the write lock and opens a transaction. Keep the returned guard
    /// alive until [`Database::finish`] has run.
    pub async fn begin(&self) -> Result<RwLockWriteGuard<'_, ()>> {
        let guard = self.tx_lock.write().await;
        self.conn.execute("BEGIN IMMEDIATE", ()).await?;
        Ok(guard)
    }

    /// Commits on success, rolls back on failure.
    pub async fn finish<T>(&self, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => match self.conn.execute("COMMIT", ()).await {
                Ok(_) => Ok(value),
                Err(e) => {
                    let _ = self.conn.execute("ROLLBACK", ()).await;
                    Err(e.into())
                }
            },
            Err(e) => {
                let _ = self.conn.execute("ROLLBACK", ()).await;
                Err(e)
            }
        }
    }
}

/// Decodes a JSON array column (tags, member lists) into strings.
pub fn json_string_list(raw: Option<String>) -> Result<Vec<String>> {
    match raw {
        Some(raw) if !raw.is_empty() => Ok(serde_json::from_str(&raw)?),
        _ => Ok(vec![]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn migrations_are_recorded_once() -> Result<()> {
        let db = Database::in_memory().await?;
        let conn = db.connection();

        Database::migrate(conn).await?;

        let mut rows = conn
            .query("SELECT COUNT(*) FROM _migrations WHERE name = ?", libsql::params!["products_001_schema.sql"])
            .await?;
        let row = rows.next().await?.expect("count row");
        assert_eq!(row.get::<i64>(0)?, 1);
        Ok(())
    }

    async fn insert_then_fail(db: &Database) -> Result<()> {
        db.connection()
            .execute(
                "INSERT INTO users (email, name) VALUES (?, ?)",
                libsql::params!["rollback@x.com", "R"],
            )
            .await?;
        anyhow::bail!("abort")
    }

    #[tokio::test]
    async fn failed_transactions_roll_back() -> Result<()> {
        let db = Database::in_memory().await?;

        let guard = db.begin().await?;
        let result = insert_then_fail(&db).await;
        assert!(db.finish(result).await.is_err());
        drop(guard);

        let mut rows = db
            .connection()
            .query("SELECT COUNT(*) FROM users", ())
            .await?;
        let row = rows.next().await?.expect("count row");
        assert_eq!(row.get::<i64>(0)?, 0);
        Ok(())
    }

    async fn count_users(db: &Database) -> Result<i64> {
        let _guard = db.read_lock().await;
        let mut rows = db.connection().query("SELECT COUNT(*) FROM users", ()).await?;
        let row = rows.next().await?.expect("count row");
        Ok(row.get::<i64>(0)?)
    }

    #[tokio::test]
    async fn readers_wait_for_open_transactions() -> Result<()> {
        let db = std::sync::Arc::new(Database::in_memory().await?);

        let guard = db.begin().await?;
        db.connection()
            .execute(
                "INSERT INTO users (email, name) VALUES (?, ?)",
                libsql::params!["pending@x.com", "P"],
            )
            .await?;

        let reader = {
            let db = db.clone();
            tokio::spawn(async move { count_users(&db).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!reader.is_finished());

        db.finish(Ok(())).await?;
        drop(guard);

        assert_eq!(reader.await??, 1);
        Ok(())
    }

    #[test]
    fn decodes_json_lists() {
        assert_eq!(json_string_list(None).unwrap(), Vec::<String>::new());
        assert_eq!(
            json_string_list(Some(r#"["a","b"]"#.into())).unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );
        assert!(json_string_list(Some("not json".into())).is_err());
    }
}
