//! The SQL execution seam.
//!
//! Resource adapters never talk to a driver directly. They receive an
//! [`Executor`] handle at construction and send it plain Snowflake SQL text.
//! Query results come back as positional [`Row`]s which adapters scan into
//! typed models with a strict column count.

use std::fmt;

use thiserror::Error;
use tracing::debug;

/// Errors reported by an [`Executor`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SqlError {
    /// The statement was rejected or failed on the server.
    #[error("SQL execution error: {0}")]
    Execution(String),

    /// The connection to the server could not be used.
    #[error("connection error: {0}")]
    Connection(String),
}

/// Errors raised while scanning a [`Row`] into local values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    /// The row does not have the column count the scan expected.
    #[error("expected {expected} columns in result row, got {actual}")]
    ColumnCount {
        /// Number of scan targets.
        expected: usize,
        /// Number of columns returned.
        actual: usize,
    },

    /// A column could not be converted into the requested type.
    #[error("column {index} ({name}): cannot scan {actual} into {expected}")]
    Type {
        /// Zero-based column position.
        index: usize,
        /// Column name as returned by the server.
        name: String,
        /// Target type.
        expected: &'static str,
        /// Type of the returned value.
        actual: &'static str,
    },
}

/// A single value in a result row.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL NULL.
    Null,
    /// A text value.
    Text(String),
    /// An integer value.
    Int(i64),
    /// A boolean value.
    Bool(bool),
}

impl SqlValue {
    fn type_name(&self) -> &'static str {
        match self {
            SqlValue::Null => "null",
            SqlValue::Text(_) => "text",
            SqlValue::Int(_) => "int",
            SqlValue::Bool(_) => "bool",
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// A result row: column names paired positionally with values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<SqlValue>,
}

impl Row {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column to the row.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.columns.push(column.into());
        self.values.push(value.into());
        self
    }

    /// Number of columns in the row.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Look a value up by column name.
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|name| name == column)
            .and_then(|index| self.values.get(index))
    }

    /// Begin a positional scan that requires exactly `expected` columns.
    pub fn scan(&self, expected: usize) -> Result<Scanner<'_>, ScanError> {
        if self.values.len() != expected {
            return Err(ScanError::ColumnCount {
                expected,
                actual: self.values.len(),
            });
        }
        Ok(Scanner { row: self, next: 0 })
    }
}

/// Positional reader over a [`Row`], in the order of the SELECT/SHOW columns.
pub struct Scanner<'a> {
    row: &'a Row,
    next: usize,
}

impl<'a> Scanner<'a> {
    fn advance(&mut self) -> Result<(usize, &'a SqlValue), ScanError> {
        let index = self.next;
        let value = self.row.values.get(index).ok_or(ScanError::ColumnCount {
            expected: index + 1,
            actual: self.row.values.len(),
        })?;
        self.next += 1;
        Ok((index, value))
    }

    fn mismatch(&self, index: usize, expected: &'static str, value: &SqlValue) -> ScanError {
        ScanError::Type {
            index,
            name: self.row.columns.get(index).cloned().unwrap_or_default(),
            expected,
            actual: value.type_name(),
        }
    }

    /// Skip a column.
    pub fn skip(&mut self) -> &mut Self {
        self.next += 1;
        self
    }

    /// Read a nullable text column.
    pub fn string(&mut self) -> Result<Option<String>, ScanError> {
        let (_, value) = self.advance()?;
        // Drivers report some scalar columns as numbers or booleans; their
        // text form is what the column holds.
        Ok(match value {
            SqlValue::Null => None,
            SqlValue::Text(s) => Some(s.clone()),
            SqlValue::Int(i) => Some(i.to_string()),
            SqlValue::Bool(b) => Some(b.to_string()),
        })
    }

    /// Read a nullable integer column.
    pub fn int(&mut self) -> Result<Option<i64>, ScanError> {
        let (index, value) = self.advance()?;
        match value {
            SqlValue::Null => Ok(None),
            SqlValue::Int(i) => Ok(Some(*i)),
            SqlValue::Text(s) => s
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| self.mismatch(index, "int", value)),
            SqlValue::Bool(_) => Err(self.mismatch(index, "int", value)),
        }
    }

    /// Read a non-null boolean column.
    pub fn boolean(&mut self) -> Result<bool, ScanError> {
        let (index, value) = self.advance()?;
        match value {
            SqlValue::Bool(b) => Ok(*b),
            SqlValue::Text(s) if s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("y") => {
                Ok(true)
            }
            SqlValue::Text(s) if s.eq_ignore_ascii_case("false") || s.eq_ignore_ascii_case("n") => {
                Ok(false)
            }
            _ => Err(self.mismatch(index, "bool", value)),
        }
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<String> = self
            .columns
            .iter()
            .zip(&self.values)
            .map(|(name, value)| format!("{}={:?}", name, value))
            .collect();
        write!(f, "[{}]", cells.join(", "))
    }
}

/// A handle that runs SQL text against Snowflake.
///
/// Implementations wrap a driver connection or pool. The handle is shared by
/// every resource adapter, so it must be safe to use concurrently.
#[async_trait::async_trait]
pub trait Executor: Send + Sync {
    /// Execute a statement that returns no rows; yields the affected row count.
    async fn exec(&self, sql: &str) -> Result<u64, SqlError>;

    /// Run a statement that returns rows.
    async fn query(&self, sql: &str) -> Result<Vec<Row>, SqlError>;
}

/// Execute a DDL statement, logging it first.
pub async fn db_exec(db: &dyn Executor, sql: &str) -> Result<(), SqlError> {
    debug!(statement = %redact(sql), "executing statement");
    db.exec(sql).await.map(|_| ())
}

/// Run a query, logging it first.
pub async fn db_query(db: &dyn Executor, sql: &str) -> Result<Vec<Row>, SqlError> {
    debug!(statement = %redact(sql), "running query");
    let rows = db.query(sql).await?;
    debug!(rows = rows.len(), "query returned");
    Ok(rows)
}

/// Strip password literals out of a statement before it reaches the logs.
pub fn redact(sql: &str) -> String {
    const MARKER: &str = "ADMIN_PASSWORD = '";
    let mut out = String::with_capacity(sql.len());
    let mut rest = sql;
    while let Some(start) = rest.find(MARKER) {
        let value_start = start + MARKER.len();
        out.push_str(&rest[..value_start]);
        out.push_str("***");
        rest = &rest[value_start..];

        let mut end = rest.len();
        let mut escaped = false;
        for (i, c) in rest.char_indices() {
            match c {
                '\\' if !escaped => escaped = true,
                '\'' if !escaped => {
                    end = i;
                    break;
                }
                _ => escaped = false,
            }
        }
        rest = &rest[end..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema_row() -> Row {
        Row::new()
            .with("name", "S")
            .with("comment", SqlValue::Null)
            .with("retention_time", "5")
            .with("is_reader", true)
    }

    #[test]
    fn test_scan_requires_exact_column_count() {
        let row = schema_row();
        assert!(row.scan(4).is_ok());

        let err = row.scan(5).err().unwrap();
        assert_eq!(
            err,
            ScanError::ColumnCount {
                expected: 5,
                actual: 4
            }
        );
    }

    #[test]
    fn test_scan_values_in_order() {
        let row = schema_row();
        let mut scan = row.scan(4).unwrap();
        assert_eq!(scan.string().unwrap(), Some("S".to_string()));
        assert_eq!(scan.string().unwrap(), None);
        assert_eq!(scan.int().unwrap(), Some(5));
        assert!(scan.boolean().unwrap());
    }

    #[test]
    fn test_scan_type_mismatch() {
        let row = Row::new().with("is_reader", SqlValue::Null);
        let err = row.scan(1).unwrap().boolean().unwrap_err();
        assert!(matches!(err, ScanError::Type { index: 0, .. }));
        assert!(err.to_string().contains("is_reader"));

        let row = Row::new().with("retention_time", "five");
        assert!(row.scan(1).unwrap().int().is_err());
    }

    #[test]
    fn test_row_get_by_name() {
        let row = schema_row();
        assert_eq!(row.get("name"), Some(&SqlValue::Text("S".to_string())));
        assert_eq!(row.get("missing"), None);
    }

    #[test]
    fn test_redact_password() {
        let sql = "CREATE MANAGED ACCOUNT \"a\" ADMIN_NAME = 'x' ADMIN_PASSWORD = 'Sec\\'ret1' TYPE = 'READER'";
        let redacted = redact(sql);
        assert!(!redacted.contains("Sec"));
        assert!(redacted.contains("ADMIN_PASSWORD = '***' TYPE = 'READER'"));

        assert_eq!(redact("SHOW SCHEMAS"), "SHOW SCHEMAS");
    }

    #[test]
    fn test_redact_every_password() {
        let sql = "ALTER X SET ADMIN_PASSWORD = 'First1xx' COMMENT = 'c' ADMIN_PASSWORD = 'Second2y'";
        assert_eq!(
            redact(sql),
            "ALTER X SET ADMIN_PASSWORD = '***' COMMENT = 'c' ADMIN_PASSWORD = '***'"
        );

        // An unterminated literal is masked to the end.
        assert_eq!(redact("ADMIN_PASSWORD = 'open"), "ADMIN_PASSWORD = '***");
    }
}
