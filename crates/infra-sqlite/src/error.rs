// sqlx error mapping

use migrator_core::error::AppError;

/// Convert sqlx::Error to AppError, decoding the SQLite result code
///
/// SQLite codes: https://www.sqlite.org/rescode.html
pub fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => {
            let Some(code) = db_err.code() else {
                return AppError::Database(format!("Database error: {}", db_err.message()));
            };

            let code = code.as_ref();
            let kind = match code {
                // UNIQUE / PRIMARY KEY
                "2067" | "1555" => "Unique constraint violation",
                // FOREIGN KEY
                "787" | "3850" => "Foreign key constraint violation",
                // NOT NULL
                "1299" => "Not null constraint violation",
                "5" => "Database locked (SQLITE_BUSY)",
                "13" => "Database full",
                "1" => "SQL error",
                _ => "Database error",
            };
            AppError::Database(format!("{} [{}]: {}", kind, code, db_err.message()))
        }
        sqlx::Error::RowNotFound => AppError::Database("Row not found".to_string()),
        sqlx::Error::ColumnNotFound(col) => AppError::Database(format!("Column not found: {}", col)),
        sqlx::Error::PoolTimedOut => {
            AppError::Database("Timed out waiting for a pooled connection".to_string())
        }
        // Connection, protocol, decode errors
        _ => AppError::Database(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create_pool;

    #[tokio::test]
    async fn test_unique_violation_is_decoded() {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        sqlx::query("CREATE TABLE users (id INTEGER PRIMARY KEY, email TEXT UNIQUE)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO users (email) VALUES ('a@example.com')")
            .execute(&pool)
            .await
            .unwrap();

        let err = sqlx::query("INSERT INTO users (email) VALUES ('a@example.com')")
            .execute(&pool)
            .await
            .unwrap_err();

        let mapped = map_sqlx_error(err);
        assert!(mapped.to_string().contains("Unique constraint violation [2067]"));
    }

    #[tokio::test]
    async fn test_syntax_error_is_database_error() {
        let pool = create_pool("sqlite::memory:").await.unwrap();

        let err = sqlx::query("SELEC 1").execute(&pool).await.unwrap_err();

        assert!(matches!(map_sqlx_error(err), AppError::Database(_)));
    }

    #[test]
    fn test_row_not_found() {
        let mapped = map_sqlx_error(sqlx::Error::RowNotFound);
        assert_eq!(mapped.to_string(), "Database error: Row not found");
    }
}
