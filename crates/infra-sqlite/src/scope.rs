// SQLite Record Scope
// Keyset pagination over one table: WHERE key > ? ORDER BY key LIMIT n

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use migrator_core::error::{AppError, Result};
use migrator_core::port::RecordScope;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, SqliteConnection};
use std::marker::PhantomData;

pub const DEFAULT_BATCH_SIZE: u32 = 1000;

/// Rows of `table` matching an optional filter, read in ascending key order
///
/// The key column must be an integer that is unique within the scope.
///
/// # Example
/// ```text
/// #[derive(sqlx::FromRow)]
/// struct User { id: i64, email: String }
///
/// let scope = SqliteScope::new("users", "id", |u: &User| u.id)?
///     .filter("email IS NOT NULL")
///     .batch_size(500)?;
/// ```
pub struct SqliteScope<R> {
    table: String,
    key_column: String,
    columns: String,
    filter: Option<String>,
    batch_size: u32,
    key_of: fn(&R) -> i64,
    _row: PhantomData<fn() -> R>,
}

impl<R> std::fmt::Debug for SqliteScope<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteScope")
            .field("table", &self.table)
            .field("key_column", &self.key_column)
            .field("filter", &self.filter)
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

impl<R> SqliteScope<R> {
    /// # Errors
    /// `Validation` when a name is not a plain SQL identifier
    pub fn new(table: &str, key_column: &str, key_of: fn(&R) -> i64) -> Result<Self> {
        validate_identifier(table)?;
        validate_identifier(key_column)?;

        Ok(Self {
            table: table.to_string(),
            key_column: key_column.to_string(),
            columns: "*".to_string(),
            filter: None,
            batch_size: DEFAULT_BATCH_SIZE,
            key_of,
            _row: PhantomData,
        })
    }

    /// Raw SQL condition ANDed into every query
    pub fn filter(mut self, condition: impl Into<String>) -> Self {
        self.filter = Some(condition.into());
        self
    }

    /// Restrict the selected columns
    pub fn columns(mut self, columns: &[&str]) -> Result<Self> {
        for column in columns {
            validate_identifier(column)?;
        }
        if !columns.is_empty() {
            self.columns = columns.join(", ");
        }
        Ok(self)
    }

    pub fn batch_size(mut self, batch_size: u32) -> Result<Self> {
        if batch_size == 0 {
            return Err(AppError::Validation("batch size must be positive".to_string()));
        }
        self.batch_size = batch_size;
        Ok(self)
    }

    fn where_clause(&self) -> String {
        match &self.filter {
            Some(filter) => format!("WHERE ({})", filter),
            None => String::new(),
        }
    }

    fn count_sql(&self) -> String {
        format!("SELECT COUNT(*) FROM {} {}", self.table, self.where_clause())
    }

    fn batch_sql(&self, after: Option<i64>) -> String {
        let mut conditions = Vec::new();
        if let Some(filter) = &self.filter {
            conditions.push(format!("({})", filter));
        }
        if after.is_some() {
            conditions.push(format!("{} > ?", self.key_column));
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };

        format!(
            "SELECT {} FROM {}{} ORDER BY {} ASC LIMIT {}",
            self.columns, self.table, where_clause, self.key_column, self.batch_size
        )
    }
}

#[async_trait]
impl<R> RecordScope<SqliteConnection> for SqliteScope<R>
where
    R: for<'r> FromRow<'r, SqliteRow> + Send + Unpin + 'static,
{
    type Record = R;

    async fn count(&self, conn: &mut SqliteConnection) -> Result<u64> {
        let sql = self.count_sql();
        let count: i64 = sqlx::query_scalar(&sql)
            .fetch_one(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;
        Ok(count.max(0) as u64)
    }

    async fn fetch_batch(&self, conn: &mut SqliteConnection, after: Option<i64>) -> Result<Vec<R>> {
        let sql = self.batch_sql(after);
        let mut query = sqlx::query_as::<_, R>(&sql);
        if let Some(after) = after {
            query = query.bind(after);
        }
        query.fetch_all(&mut *conn).await.map_err(map_sqlx_error)
    }

    fn cursor_key(&self, record: &R) -> i64 {
        (self.key_of)(record)
    }
}

fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(AppError::Validation(format!("invalid SQL identifier: {:?}", name)))
    }
}
