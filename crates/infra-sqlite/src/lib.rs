// Migrator Infrastructure - SQLite Adapter
// Implements: TransactionProvider, RecordScope, DB-backed job queue

mod connection;
mod error;
mod job_queue;
mod scope;
mod transaction;

pub use connection::create_pool;
pub use error::map_sqlx_error;
pub use job_queue::{SqliteJobQueue, JOBS_TABLE};
pub use scope::{SqliteScope, DEFAULT_BATCH_SIZE};
pub use transaction::{execute_tracked, SqliteMigrationTransaction, SqliteTransactionProvider};

// Note: sqlx::Error conversion is handled by map_sqlx_error
// due to Rust's orphan rules (cannot implement From<sqlx::Error> for AppError here)
