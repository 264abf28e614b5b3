use crate::domain::PersistableRecord;
use crate::error::Result;
use rusqlite::{params, Connection};
use std::path::Path;
use tracing::{debug, error, info};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS user_logins (
        user_id          TEXT    NOT NULL,
        device_type      TEXT    NOT NULL,
        masked_ip        TEXT    NOT NULL,
        masked_device_id TEXT    NOT NULL,
        locale           TEXT    NOT NULL,
        app_version      INTEGER NOT NULL,
        create_date      DATE    NOT NULL DEFAULT CURRENT_DATE
    );
"#;

const INSERT_LOGIN: &str = "INSERT INTO user_logins \
    (user_id, device_type, masked_ip, masked_device_id, locale, app_version) \
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

/// A row as it reads back from `user_logins`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredLogin {
    pub user_id: String,
    pub device_type: String,
    pub masked_ip: String,
    pub masked_device_id: String,
    pub locale: String,
    pub app_version: i64,
    pub create_date: String,
}

/// Owns the single store connection for the lifetime of a run.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        info!("Opened login store at {}", db_path.display());
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Inserts every record inside one transaction and commits once.
    ///
    /// Any failing insert rolls the whole batch back. Returns the number of
    /// rows committed.
    pub fn persist(&mut self, records: &[PersistableRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.transaction()?;
        let queued = {
            let mut stmt = tx.prepare_cached(INSERT_LOGIN)?;
            records.iter().try_for_each(|record| {
                stmt.execute(params![
                    record.user_id,
                    record.device_type,
                    record.masked_ip,
                    record.masked_device_id,
                    record.locale,
                    record.app_version_major,
                ])
                .map(|_| ())
            })
        };

        match queued {
            Ok(()) => {
                tx.commit()?;
                debug!("Committed {} rows", records.len());
                Ok(records.len())
            }
            Err(e) => {
                error!("Insert failed, rolling back batch of {}: {}", records.len(), e);
                tx.rollback()?;
                Err(e.into())
            }
        }
    }

    pub fn count_rows(&self) -> Result<u64> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM user_logins", [], |row| row.get(0))?;
        Ok(n as u64)
    }

    /// All stored rows in insertion order.
    pub fn rows(&self) -> Result<Vec<StoredLogin>> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, device_type, masked_ip, masked_device_id, locale, app_version, create_date \
             FROM user_logins ORDER BY rowid",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(StoredLogin {
                user_id: row.get(0)?,
                device_type: row.get(1)?,
                masked_ip: row.get(2)?,
                masked_device_id: row.get(3)?,
                locale: row.get(4)?,
                app_version: row.get(5)?,
                create_date: row.get(6)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    #[cfg(test)]
    pub(crate) fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| e)?;
        info!("Login store connection closed");
        Ok(())
    }
}
