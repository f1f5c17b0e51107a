//! Query executor
//!
//! SQL 블록은 컨테이너 없이 임베디드 SQLite 연결에서 바로 실행된다.

use mdrun_foundation::{Error, Result};
use rusqlite::types::ValueRef;
use rusqlite::{Batch, Connection};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Mutex;
use tracing::debug;

/// Rows returned by a query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows as JSON objects keyed by column name
    pub fn to_records(&self) -> Vec<serde_json::Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }
}

/// Executes declarative blocks
pub trait QueryExecutor: Send + Sync {
    fn execute(&self, query: &str) -> Result<QueryResult>;
}

/// In-process SQLite executor
pub struct SqliteExecutor {
    conn: Mutex<Connection>,
}

impl SqliteExecutor {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(Connection::open_in_memory()?))
    }
}

impl QueryExecutor for SqliteExecutor {
    /// Run every statement in `query`; the rows of the last statement that
    /// yields columns are returned.
    fn execute(&self, query: &str) -> Result<QueryResult> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| Error::Internal("query connection lock poisoned".to_string()))?;

        let mut result = QueryResult::default();
        let mut statements = 0usize;
        let mut batch = Batch::new(&conn, query);

        while let Some(mut stmt) = batch.next()? {
            statements += 1;
            let columns: Vec<String> = stmt
                .column_names()
                .into_iter()
                .map(str::to_string)
                .collect();
            let width = columns.len();

            let mut rows = Vec::new();
            let mut cursor = stmt.raw_query();
            while let Some(row) = cursor.next()? {
                let mut values = Vec::with_capacity(width);
                for i in 0..width {
                    values.push(to_json(row.get_ref(i)?));
                }
                rows.push(values);
            }

            if width > 0 {
                result = QueryResult { columns, rows };
            }
        }

        if statements == 0 {
            return Err(Error::Query("no SQL statement to execute".to_string()));
        }

        debug!(
            statements,
            rows = result.rows.len(),
            "Query executed"
        );
        Ok(result)
    }
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Value::from(f),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(format!("<{} bytes>", b.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_select_literal() {
        let executor = SqliteExecutor::in_memory().unwrap();
        let result = executor.execute("SELECT 1 AS x").unwrap();

        assert_eq!(result.columns, vec!["x"]);
        assert_eq!(result.rows, vec![vec![json!(1)]]);
    }

    #[test]
    fn test_multi_statement_returns_last_rows() {
        let executor = SqliteExecutor::in_memory().unwrap();
        let result = executor
            .execute(
                "CREATE TABLE t (id INTEGER, name TEXT);
                 INSERT INTO t VALUES (1, 'a'), (2, NULL);
                 SELECT id, name FROM t ORDER BY id;",
            )
            .unwrap();

        assert_eq!(result.columns, vec!["id", "name"]);
        assert_eq!(
            result.rows,
            vec![vec![json!(1), json!("a")], vec![json!(2), Value::Null]]
        );
        assert_eq!(result.to_records()[0]["name"], json!("a"));
    }

    #[test]
    fn test_statement_without_rows() {
        let executor = SqliteExecutor::in_memory().unwrap();
        let result = executor.execute("CREATE TABLE t (id INTEGER)").unwrap();
        assert!(result.columns.is_empty());
        assert!(result.is_empty());
    }

    #[test]
    fn test_state_persists_across_calls() {
        let executor = SqliteExecutor::in_memory().unwrap();
        executor.execute("CREATE TABLE t (v REAL); INSERT INTO t VALUES (1.5)").unwrap();
        let result = executor.execute("SELECT v FROM t").unwrap();
        assert_eq!(result.rows, vec![vec![json!(1.5)]]);
    }

    #[test]
    fn test_invalid_sql_is_error() {
        let executor = SqliteExecutor::in_memory().unwrap();
        assert!(matches!(
            executor.execute("SELEC nonsense"),
            Err(Error::Sqlite(_))
        ));
    }

    #[test]
    fn test_empty_query_is_error() {
        let executor = SqliteExecutor::in_memory().unwrap();
        assert!(matches!(executor.execute("  "), Err(Error::Query(_))));
    }
}
