// SQLite Transaction Provider
// Hands out one pooled transaction per operator run and reports the write
// statements executed through it.

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use migrator_core::error::Result;
use migrator_core::port::{MigrationTransaction, SideEffectBus, TransactionProvider};
use sqlx::sqlite::SqliteArguments;
use sqlx::query::Query;
use sqlx::{Execute, Executor, Sqlite, SqliteConnection, SqlitePool, Transaction as SqlxTransaction};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Execute `query` on `executor` and report it to the side-effect bus
///
/// Returns the number of affected rows. Only statements that succeed are
/// reported; reads are filtered out by the bus.
pub async fn execute_tracked<'c, 'q, E>(
    executor: E,
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    side_effects: &SideEffectBus,
) -> Result<u64>
where
    E: Executor<'c, Database = Sqlite>,
{
    let sql = query.sql();
    let result = query.execute(executor).await.map_err(map_sqlx_error)?;
    side_effects.statement_executed(sql);
    Ok(result.rows_affected())
}

/// Transaction provider over a SQLite pool
///
/// Nesting is detected by counting the transactions this provider has handed
/// out and not yet finished.
#[derive(Clone)]
pub struct SqliteTransactionProvider {
    pool: SqlitePool,
    side_effects: SideEffectBus,
    open: Arc<AtomicUsize>,
}

impl SqliteTransactionProvider {
    pub fn new(pool: SqlitePool, side_effects: SideEffectBus) -> Self {
        Self {
            pool,
            side_effects,
            open: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn side_effects(&self) -> &SideEffectBus {
        &self.side_effects
    }

    /// Transactions begun and not yet committed, rolled back or dropped
    pub fn open_transactions(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransactionProvider for SqliteTransactionProvider {
    type Transaction = SqliteMigrationTransaction;

    async fn is_transaction_open(&self) -> Result<bool> {
        Ok(self.open_transactions() > 0)
    }

    async fn begin(&self) -> Result<SqliteMigrationTransaction> {
        let tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        let guard = OpenGuard::new(Arc::clone(&self.open));
        debug!(open = self.open_transactions(), "Began migration transaction");

        Ok(SqliteMigrationTransaction {
            tx,
            side_effects: self.side_effects.clone(),
            _guard: guard,
        })
    }
}

/// Decrements the provider's open count when the transaction goes away
struct OpenGuard {
    open: Arc<AtomicUsize>,
}

impl OpenGuard {
    fn new(open: Arc<AtomicUsize>) -> Self {
        open.fetch_add(1, Ordering::SeqCst);
        Self { open }
    }
}

impl Drop for OpenGuard {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}

/// The transaction a migration routine writes through
///
/// Dropped without commit, sqlx rolls it back.
pub struct SqliteMigrationTransaction {
    tx: SqlxTransaction<'static, Sqlite>,
    side_effects: SideEffectBus,
    _guard: OpenGuard,
}

impl SqliteMigrationTransaction {
    /// Execute a statement inside the transaction, reporting writes
    pub async fn execute<'q>(&mut self, query: Query<'q, Sqlite, SqliteArguments<'q>>) -> Result<u64> {
        execute_tracked(&mut *self.tx, query, &self.side_effects).await
    }

    /// Execute raw SQL without bind parameters
    pub async fn execute_sql(&mut self, sql: &str) -> Result<u64> {
        self.execute(sqlx::query(sql)).await
    }

    /// The underlying connection, for reads and record scopes
    ///
    /// Statements executed directly on it are not reported as side effects.
    pub fn connection(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }

    pub fn side_effects(&self) -> &SideEffectBus {
        &self.side_effects
    }
}

#[async_trait]
impl MigrationTransaction for SqliteMigrationTransaction {
    async fn commit(self) -> Result<()> {
        self.tx.commit().await.map_err(map_sqlx_error)?;
        debug!("Committed migration transaction");
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await.map_err(map_sqlx_error)?;
        debug!("Rolled back migration transaction");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create_pool;
    use migrator_core::domain::{SideEffect, SideEffectKind};
    use migrator_core::port::SideEffectObserver;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collect(Mutex<Vec<SideEffect>>);

    impl SideEffectObserver for Collect {
        fn observe(&self, effect: &SideEffect) {
            self.0.lock().unwrap().push(effect.clone());
        }
    }

    async fn provider() -> SqliteTransactionProvider {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        sqlx::query("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL)")
            .execute(&pool)
            .await
            .unwrap();
        SqliteTransactionProvider::new(pool, SideEffectBus::new())
    }

    async fn user_count(pool: &SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_commit_persists_writes() {
        let provider = provider().await;

        let mut tx = provider.begin().await.unwrap();
        let affected = tx
            .execute(sqlx::query("INSERT INTO users (name) VALUES (?)").bind("ada"))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(affected, 1);
        assert_eq!(user_count(provider.pool()).await, 1);
    }

    #[tokio::test]
    async fn test_rollback_discards_writes() {
        let provider = provider().await;

        let mut tx = provider.begin().await.unwrap();
        tx.execute_sql("INSERT INTO users (name) VALUES ('ada')")
            .await
            .unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(user_count(provider.pool()).await, 0);
    }

    #[tokio::test]
    async fn test_open_transactions_tracked_until_finished() {
        let provider = provider().await;
        assert!(!provider.is_transaction_open().await.unwrap());

        let tx = provider.begin().await.unwrap();
        assert!(provider.is_transaction_open().await.unwrap());
        tx.commit().await.unwrap();
        assert!(!provider.is_transaction_open().await.unwrap());

        let tx = provider.begin().await.unwrap();
        drop(tx);
        assert_eq!(provider.open_transactions(), 0);
    }

    #[tokio::test]
    async fn test_writes_reported_and_reads_ignored() {
        let provider = provider().await;
        let collect = Arc::new(Collect::default());
        let _subscription = provider.side_effects().subscribe(collect.clone());

        let mut tx = provider.begin().await.unwrap();
        tx.execute_sql("INSERT INTO users (name) VALUES ('ada')")
            .await
            .unwrap();
        tx.execute_sql("SELECT * FROM users").await.unwrap();
        tx.execute(sqlx::query("UPDATE users  SET name = ?").bind("grace"))
            .await
            .unwrap();
        tx.rollback().await.unwrap();

        let seen = collect.0.lock().unwrap().clone();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|e| e.kind == SideEffectKind::WriteStatement));
        assert_eq!(seen[1].key, "UPDATE users SET name = ?");
    }

    #[tokio::test]
    async fn test_failed_statement_not_reported() {
        let provider = provider().await;
        let collect = Arc::new(Collect::default());
        let _subscription = provider.side_effects().subscribe(collect.clone());

        let mut tx = provider.begin().await.unwrap();
        let err = tx
            .execute_sql("INSERT INTO users (name) VALUES (NULL)")
            .await
            .unwrap_err();
        tx.rollback().await.unwrap();

        assert!(err.to_string().contains("Not null constraint violation"));
        assert!(collect.0.lock().unwrap().is_empty());
    }
}
