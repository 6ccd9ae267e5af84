use crate::core::{DbError, FromValue, Result, Value};

pub type Row = Vec<Value>;

/// Rows returned by [`DatabaseClient::query`](crate::DatabaseClient::query).
///
/// `columns` holds the result-set labels; for statements built by this crate
/// those are the property names, since storage columns are aliased back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl QueryResult {
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<RowRef<'_>> {
        self.rows.get(index).map(|values| RowRef {
            columns: &self.columns,
            values,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = RowRef<'_>> {
        self.rows.iter().map(|values| RowRef {
            columns: &self.columns,
            values,
        })
    }
}

/// Borrowed view of one row together with its column labels.
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    columns: &'a [String],
    values: &'a [Value],
}

impl<'a> RowRef<'a> {
    pub fn new(columns: &'a [String], values: &'a [Value]) -> Self {
        Self { columns, values }
    }

    pub fn value(&self, name: &str) -> Result<&'a Value> {
        self.columns
            .iter()
            .position(|column| column == name)
            .and_then(|index| self.values.get(index))
            .ok_or_else(|| DbError::ColumnNotFound(name.to_string()))
    }

    /// Reads and converts the value labelled `name`.
    pub fn get<T: FromValue>(&self, name: &str) -> Result<T> {
        let value = self.value(name)?;
        T::from_value(value).map_err(|err| match err {
            DbError::TypeMismatch(msg) => {
                DbError::TypeMismatch(format!("column '{}': {}", name, msg))
            }
            other => other,
        })
    }

    pub fn columns(&self) -> &'a [String] {
        self.columns
    }

    pub fn values(&self) -> &'a [Value] {
        self.values
    }
}

/// Maps a result row into an entity.
pub trait FromRow: Sized {
    fn from_row(row: RowRef<'_>) -> Result<Self>;
}
