use crate::error::Result;
use crate::pipeline::{Experiment, FormulationResult};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// One persisted row of an experiment's result table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredResult {
    pub id: i64,
    pub formulation_id: String,
    pub calculated_value: f64,
}

/// Append-only store of accepted formulation results, one table per
/// experiment type. Appends are atomic: a failing batch leaves no rows.
#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn append_batch(&self, experiment: Experiment, batch: &[FormulationResult]) -> Result<()>;
    async fn read_all(&self, experiment: Experiment) -> Result<Vec<StoredResult>>;
}

/// SQLite-backed result store. The connection is opened once at process
/// start and handed around explicitly; the mutex serializes writers so one
/// upload's transaction completes before the next begins.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database and make sure both result tables exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS Zeta (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                formulation_id TEXT NOT NULL,
                calculated_value REAL NOT NULL
            );
            CREATE TABLE IF NOT EXISTS TNS (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                formulation_id TEXT NOT NULL,
                calculated_value REAL NOT NULL
            );
            "#,
        )?;
        info!(database = %path.as_ref().display(), "opened result store");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait]
impl ResultStore for SqliteStore {
    async fn append_batch(&self, experiment: Experiment, batch: &[FormulationResult]) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        {
            // Table names come from the Experiment enum, never from input.
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} (formulation_id, calculated_value) VALUES (?1, ?2)",
                experiment.table_name()
            ))?;
            for result in batch {
                stmt.execute(params![result.formulation_id, result.calculated_value])?;
            }
        }
        tx.commit()?;

        debug!(
            experiment = experiment.table_name(),
            rows = batch.len(),
            "appended result batch"
        );
        Ok(())
    }

    async fn read_all(&self, experiment: Experiment) -> Result<Vec<StoredResult>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT id, formulation_id, calculated_value FROM {} ORDER BY id",
            experiment.table_name()
        ))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(StoredResult {
                    id: row.get(0)?,
                    formulation_id: row.get(1)?,
                    calculated_value: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

/// In-memory store for development and tests.
pub struct InMemoryStore {
    tables: Mutex<HashMap<Experiment, Vec<StoredResult>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResultStore for InMemoryStore {
    async fn append_batch(&self, experiment: Experiment, batch: &[FormulationResult]) -> Result<()> {
        let mut tables = self.tables.lock().unwrap();
        let table = tables.entry(experiment).or_default();
        let mut next_id = table.last().map_or(1, |row| row.id + 1);
        for result in batch {
            table.push(StoredResult {
                id: next_id,
                formulation_id: result.formulation_id.clone(),
                calculated_value: result.calculated_value,
            });
            next_id += 1;
        }
        Ok(())
    }

    async fn read_all(&self, experiment: Experiment) -> Result<Vec<StoredResult>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.get(&experiment).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(values: &[(&str, f64)]) -> Vec<FormulationResult> {
        values
            .iter()
            .map(|(id, value)| FormulationResult::new(*id, *value))
            .collect()
    }

    #[tokio::test]
    async fn sqlite_append_preserves_order_and_assigns_increasing_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("results.db")).unwrap();

        store
            .append_batch(Experiment::Zeta, &batch(&[("A", 0.8), ("B", 1.2)]))
            .await
            .unwrap();
        store
            .append_batch(Experiment::Zeta, &batch(&[("A", 0.9)]))
            .await
            .unwrap();

        let rows = store.read_all(Experiment::Zeta).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.windows(2).all(|w| w[0].id < w[1].id));
        // Repeated uploads may duplicate formulation ids; both rows survive.
        assert_eq!(rows[0].formulation_id, "A");
        assert_eq!(rows[2].formulation_id, "A");
    }

    #[tokio::test]
    async fn experiments_are_stored_in_separate_tables() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("results.db")).unwrap();

        store
            .append_batch(Experiment::Zeta, &batch(&[("A", 0.8)]))
            .await
            .unwrap();
        store
            .append_batch(Experiment::Tns, &batch(&[("FORMULATION1", 0.6)]))
            .await
            .unwrap();

        assert_eq!(store.read_all(Experiment::Zeta).await.unwrap().len(), 1);
        assert_eq!(store.read_all(Experiment::Tns).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reopening_the_store_keeps_existing_rows() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("results.db");

        {
            let store = SqliteStore::open(&db_path).unwrap();
            store
                .append_batch(Experiment::Tns, &batch(&[("FORMULATION1", 0.5)]))
                .await
                .unwrap();
        }

        let store = SqliteStore::open(&db_path).unwrap();
        let rows = store.read_all(Experiment::Tns).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].formulation_id, "FORMULATION1");
    }

    #[tokio::test]
    async fn in_memory_store_mirrors_sqlite_semantics() {
        let store = InMemoryStore::new();
        store
            .append_batch(Experiment::Zeta, &batch(&[("A", 0.8), ("B", 1.2)]))
            .await
            .unwrap();

        let rows = store.read_all(Experiment::Zeta).await.unwrap();
        assert_eq!(rows[0].id, 1);
        assert_eq!(rows[1].id, 2);
        assert!(store.read_all(Experiment::Tns).await.unwrap().is_empty());
    }
}
