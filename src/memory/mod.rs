//! In-memory [`DatabaseClient`] for tests and demos.
//!
//! Understands exactly the two statement shapes this crate builds:
//! `select .. from "T" where "K" = @P` and
//! `insert into "T" (..) values (..)`. Anything else is rejected with
//! [`DbError::UnsupportedOperation`].
//!
//! A table's columns are fixed by its first insert (or by
//! [`MemoryClient::with_columns`]). Statements naming any other column fail
//! with [`DbError::ColumnNotFound`], as a real server would.

mod statement;

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::core::{DbError, Result, Value};
use crate::interface::DatabaseClient;
use crate::params::Params;
use crate::result::QueryResult;

use statement::Statement;

pub type StoredRow = HashMap<String, Value>;

#[derive(Debug, Default)]
struct Table {
    columns: Vec<String>,
    rows: Vec<StoredRow>,
    unique: Vec<String>,
}

impl Table {
    /// Fails on the first name outside the table's columns. A table whose
    /// columns are not known yet accepts anything.
    fn check_columns<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Result<()> {
        if self.columns.is_empty() {
            return Ok(());
        }
        for name in names {
            if !self.columns.iter().any(|column| column == name) {
                return Err(DbError::ColumnNotFound(name.to_string()));
            }
        }
        Ok(())
    }
}

/// One statement as received by the client.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedStatement {
    pub sql: String,
    pub params: Params,
}

#[derive(Debug, Default)]
pub struct MemoryClient {
    tables: RwLock<HashMap<String, Table>>,
    history: Mutex<Vec<ExecutedStatement>>,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates `table` if needed and rejects duplicate values in `column`.
    pub fn with_unique(mut self, table: &str, column: &str) -> Self {
        let table = self.tables.get_mut().entry(table.to_string()).or_default();
        table.unique.push(column.to_string());
        self
    }

    /// Creates an empty table so selects against it succeed before any insert.
    pub fn with_table(mut self, table: &str) -> Self {
        self.tables.get_mut().entry(table.to_string()).or_default();
        self
    }

    /// Creates `table` with a fixed column list, as if it had been declared
    /// up front.
    pub fn with_columns(mut self, table: &str, columns: &[&str]) -> Self {
        let table = self.tables.get_mut().entry(table.to_string()).or_default();
        table.columns = columns.iter().map(|column| column.to_string()).collect();
        self
    }

    /// Column names of `table`; empty until the first insert.
    pub async fn columns(&self, table: &str) -> Result<Vec<String>> {
        let tables = self.tables.read().await;
        tables
            .get(table)
            .map(|t| t.columns.clone())
            .ok_or_else(|| DbError::TableNotFound(table.to_string()))
    }

    /// Rows of `table` keyed by storage column name.
    pub async fn rows(&self, table: &str) -> Result<Vec<StoredRow>> {
        let tables = self.tables.read().await;
        tables
            .get(table)
            .map(|t| t.rows.clone())
            .ok_or_else(|| DbError::TableNotFound(table.to_string()))
    }

    /// Every statement received so far, in arrival order.
    pub async fn history(&self) -> Vec<ExecutedStatement> {
        self.history.lock().await.clone()
    }

    async fn record(&self, sql: &str, params: &Params) {
        self.history.lock().await.push(ExecutedStatement {
            sql: sql.to_string(),
            params: params.clone(),
        });
    }

    async fn run_select(
        &self,
        select: &statement::Select,
        params: &Params,
    ) -> Result<QueryResult> {
        let wanted = resolve(params, &select.parameter)?;
        let tables = self.tables.read().await;
        let table = tables
            .get(&select.table)
            .ok_or_else(|| DbError::TableNotFound(select.table.clone()))?;

        table.check_columns(
            std::iter::once(select.key.as_str())
                .chain(select.columns.iter().map(|column| column.source.as_str())),
        )?;

        let columns = select
            .columns
            .iter()
            .map(|column| column.label.clone())
            .collect();

        let rows = table
            .rows
            .iter()
            .filter(|row| row.get(&select.key).is_some_and(|value| *value == wanted))
            .map(|row| {
                select
                    .columns
                    .iter()
                    .map(|column| row.get(&column.source).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Ok(QueryResult::new(columns, rows))
    }

    async fn run_insert(&self, insert: &statement::Insert, params: &Params) -> Result<u64> {
        if insert.columns.len() != insert.parameters.len() {
            return Err(DbError::Execution(format!(
                "insert into '{}' lists {} columns but {} values",
                insert.table,
                insert.columns.len(),
                insert.parameters.len()
            )));
        }

        let mut row = StoredRow::with_capacity(insert.columns.len());
        for (column, parameter) in insert.columns.iter().zip(&insert.parameters) {
            row.insert(column.clone(), resolve(params, parameter)?);
        }

        let mut tables = self.tables.write().await;
        let table = tables.entry(insert.table.clone()).or_default();

        table.check_columns(insert.columns.iter().map(String::as_str))?;
        if table.columns.is_empty() {
            table.columns = insert.columns.clone();
        }

        for column in &table.unique {
            let Some(value) = row.get(column) else {
                continue;
            };
            if table.rows.iter().any(|existing| existing.get(column) == Some(value)) {
                return Err(DbError::ConstraintViolation(format!(
                    "duplicate value {} for unique column '{}' in '{}'",
                    value, column, insert.table
                )));
            }
        }

        table.rows.push(row);
        debug!(table = %insert.table, rows = table.rows.len(), "row inserted");
        Ok(1)
    }
}

fn resolve(params: &Params, placeholder: &str) -> Result<Value> {
    params
        .get(placeholder)
        .cloned()
        .ok_or_else(|| DbError::Execution(format!("parameter '{}' is not bound", placeholder)))
}

#[async_trait]
impl DatabaseClient for MemoryClient {
    async fn query(&self, sql: &str, params: &Params) -> Result<QueryResult> {
        self.record(sql, params).await;
        match Statement::parse(sql)? {
            Statement::Select(select) => self.run_select(&select, params).await,
            Statement::Insert(_) => Err(DbError::UnsupportedOperation(
                "insert statements must go through execute".into(),
            )),
        }
    }

    async fn execute(&self, sql: &str, params: &Params) -> Result<u64> {
        self.record(sql, params).await;
        match Statement::parse(sql)? {
            Statement::Insert(insert) => self.run_insert(&insert, params).await,
            Statement::Select(_) => Err(DbError::UnsupportedOperation(
                "select statements must go through query".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget(id: i64, name: &str) -> Params {
        Params::new().with("WidgetId", id).with("Name", name)
    }

    const INSERT: &str = r#"insert into "Widget" ("WidgetId", widget_name) values (@WidgetId, @Name)"#;
    const SELECT: &str =
        r#"select "WidgetId", widget_name as "Name" from "Widget" where "WidgetId" = @Id"#;

    #[tokio::test]
    async fn test_insert_then_select() {
        let client = MemoryClient::new();
        assert_eq!(client.execute(INSERT, &widget(7, "a")).await.unwrap(), 1);
        client.execute(INSERT, &widget(8, "b")).await.unwrap();

        let result = client
            .query(SELECT, &Params::new().with("Id", 7i64))
            .await
            .unwrap();

        assert_eq!(result.columns, vec!["WidgetId", "Name"]);
        assert_eq!(
            result.rows,
            vec![vec![Value::Integer(7), Value::Text("a".into())]]
        );

        let stored = client.rows("Widget").await.unwrap();
        assert_eq!(stored[1].get("widget_name"), Some(&Value::Text("b".into())));
    }

    #[tokio::test]
    async fn test_unique_column_rejects_duplicates() {
        let client = MemoryClient::new().with_unique("Widget", "WidgetId");
        client.execute(INSERT, &widget(7, "a")).await.unwrap();

        let err = client.execute(INSERT, &widget(7, "b")).await.unwrap_err();
        assert!(matches!(err, DbError::ConstraintViolation(_)));
        assert_eq!(client.rows("Widget").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_table_and_unbound_parameter() {
        let client = MemoryClient::new();
        let err = client
            .query(SELECT, &Params::new().with("Id", 1i64))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::TableNotFound(ref t) if t == "Widget"));

        let err = client
            .execute(INSERT, &Params::new().with("WidgetId", 1i64))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Execution(ref msg) if msg.contains("Name")));
    }

    #[tokio::test]
    async fn test_history_records_every_statement() {
        let client = MemoryClient::new().with_table("Widget");
        client
            .query(SELECT, &Params::new().with("Id", 1i64))
            .await
            .unwrap();
        let _ = client.execute("delete from \"Widget\"", &Params::new()).await;

        let history = client.history().await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].sql, SELECT);
        assert_eq!(history[0].params.get("Id"), Some(&Value::Integer(1)));
    }

    #[tokio::test]
    async fn test_rejects_wrong_entry_point() {
        let client = MemoryClient::new();
        assert!(matches!(
            client.query(INSERT, &widget(1, "a")).await,
            Err(DbError::UnsupportedOperation(_))
        ));
    }

    #[tokio::test]
    async fn test_first_insert_fixes_the_columns() {
        let client = MemoryClient::new();
        client.execute(INSERT, &widget(7, "a")).await.unwrap();
        assert_eq!(
            client.columns("Widget").await.unwrap(),
            vec!["WidgetId", "widget_name"]
        );

        let err = client
            .execute(
                r#"insert into "Widget" ("WidgetId", "Name") values (@WidgetId, @Name)"#,
                &widget(8, "b"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ColumnNotFound(ref c) if c == "Name"));
        assert_eq!(client.rows("Widget").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_select_on_unknown_column_fails() {
        let client = MemoryClient::new();
        client.execute(INSERT, &widget(7, "a")).await.unwrap();

        let by_alias = r#"select "WidgetId", widget_name as "Name" from "Widget" where "Name" = @Id"#;
        let err = client
            .query(by_alias, &Params::new().with("Id", "a"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ColumnNotFound(ref c) if c == "Name"));

        let projected = r#"select "WidgetId", "Name" from "Widget" where "WidgetId" = @Id"#;
        let err = client
            .query(projected, &Params::new().with("Id", 7i64))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ColumnNotFound(ref c) if c == "Name"));
    }

    #[tokio::test]
    async fn test_declared_columns_apply_before_any_insert() {
        let client = MemoryClient::new().with_columns("Widget", &["WidgetId", "widget_name"]);
        let result = client
            .query(SELECT, &Params::new().with("Id", 1i64))
            .await
            .unwrap();
        assert!(result.is_empty());

        let err = client
            .query(
                r#"select "Id" from "Widget" where "Id" = @Id"#,
                &Params::new().with("Id", 1i64),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ColumnNotFound(ref c) if c == "Id"));
    }
}
