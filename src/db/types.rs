//! Batch result types for run-sql.
//!
//! Defines the values, result sets and per-boundary outcomes a cursor yields.

use std::fmt;

/// A single boundary reported by the driver while draining a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementOutcome {
    /// A query produced a (possibly empty) result set.
    Rows(ResultSet),

    /// A statement without columns. `None` means the driver could not report
    /// a count for it.
    Affected(Option<u64>),
}

impl StatementOutcome {
    /// Builds an affected-row outcome from an ODBC-style row count that uses
    /// `-1` as its "not applicable" sentinel.
    pub fn from_rowcount(rowcount: isize) -> Self {
        Self::Affected(u64::try_from(rowcount).ok())
    }
}

/// Columns and rows of one query result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    /// Column names, in select-list order.
    pub columns: Vec<String>,

    /// Rows of data. Every row has `columns.len()` values.
    pub rows: Vec<Row>,
}

impl ResultSet {
    /// Creates a result set with the given columns and no rows.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Creates a result set with the given columns and rows.
    pub fn with_rows(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// Number of rows fetched.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the result set carries no columns at all.
    pub fn has_columns(&self) -> bool {
        !self.columns.is_empty()
    }
}

/// A row of data from a query result.
pub type Row = Vec<Value>;

/// Represents a single value from a database query.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    /// NULL value.
    #[default]
    Null,

    /// Boolean (`bit`) value.
    Bool(bool),

    /// Signed integer (up to i64).
    Int(i64),

    /// Floating point number.
    Float(f64),

    /// Text, and anything the driver decoded to text (decimals, dates, GUIDs, XML).
    String(String),

    /// Binary data.
    Bytes(Vec<u8>),
}

impl Value {
    /// Text shown in a table cell. NULL renders as an empty cell.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) => s.clone(),
            Value::Bytes(b) => {
                let mut hex = String::with_capacity(2 + b.len() * 2);
                hex.push_str("0x");
                for byte in b {
                    hex.push_str(&format!("{byte:02x}"));
                }
                hex
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Null.to_display_string(), "");
        assert_eq!(Value::Bool(true).to_display_string(), "true");
        assert_eq!(Value::Int(42).to_display_string(), "42");
        assert_eq!(Value::Float(2.5).to_display_string(), "2.5");
        assert_eq!(Value::from("hello").to_display_string(), "hello");
        assert_eq!(
            Value::Bytes(vec![0x01, 0xab, 0xff]).to_display_string(),
            "0x01abff"
        );
        assert_eq!(Value::Bytes(vec![]).to_display_string(), "0x");
    }

    #[test]
    fn test_value_from_conversions() {
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from(42i32), Value::Int(42));
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::String("x".to_string()));
        assert_eq!(Value::from(None::<String>), Value::Null);
    }

    #[test]
    fn test_rowcount_sentinel() {
        assert_eq!(
            StatementOutcome::from_rowcount(-1),
            StatementOutcome::Affected(None)
        );
        assert_eq!(
            StatementOutcome::from_rowcount(0),
            StatementOutcome::Affected(Some(0))
        );
        assert_eq!(
            StatementOutcome::from_rowcount(3),
            StatementOutcome::Affected(Some(3))
        );
    }

    #[test]
    fn test_result_set_shape() {
        let set = ResultSet::with_rows(
            vec!["id".to_string()],
            vec![vec![Value::Int(1)], vec![Value::Int(2)]],
        );
        assert!(set.has_columns());
        assert_eq!(set.row_count(), 2);
        assert!(!ResultSet::default().has_columns());
        assert_eq!(ResultSet::new(vec!["a".to_string()]).row_count(), 0);
    }
}
