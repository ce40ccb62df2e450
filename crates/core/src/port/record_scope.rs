// Record Scope Port - batched, keyset-paginated retrieval

use crate::error::Result;
use async_trait::async_trait;

/// A counted record source read in key order, one batch at a time
///
/// `C` is whatever the adapter queries through (a connection, a transaction).
/// It is passed per call so the routine keeps using it between batches.
#[async_trait]
pub trait RecordScope<C: Send>: Send + Sync {
    type Record: Send;

    /// Number of records in the scope, used as the progress total
    async fn count(&self, conn: &mut C) -> Result<u64>;

    /// Next batch of records with key strictly greater than `after`,
    /// ascending by key; an empty batch ends the iteration
    async fn fetch_batch(&self, conn: &mut C, after: Option<i64>) -> Result<Vec<Self::Record>>;

    /// Key used to resume after `record`
    fn cursor_key(&self, record: &Self::Record) -> i64;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;

    /// Scope over an in-memory list of keys
    pub struct VecScope {
        pub keys: Vec<i64>,
        pub batch_size: usize,
        pub fail_count: bool,
    }

    impl VecScope {
        pub fn new(keys: Vec<i64>, batch_size: usize) -> Self {
            Self {
                keys,
                batch_size,
                fail_count: false,
            }
        }
    }

    /// Connection stand-in that counts round trips
    #[derive(Default)]
    pub struct CountingConn {
        pub queries: usize,
    }

    #[async_trait]
    impl RecordScope<CountingConn> for VecScope {
        type Record = i64;

        async fn count(&self, conn: &mut CountingConn) -> Result<u64> {
            conn.queries += 1;
            if self.fail_count {
                return Err(AppError::Database("count timed out".to_string()));
            }
            Ok(self.keys.len() as u64)
        }

        async fn fetch_batch(
            &self,
            conn: &mut CountingConn,
            after: Option<i64>,
        ) -> Result<Vec<i64>> {
            conn.queries += 1;
            let mut keys: Vec<i64> = self
                .keys
                .iter()
                .copied()
                .filter(|key| after.map_or(true, |after| *key > after))
                .collect();
            keys.sort_unstable();
            keys.truncate(self.batch_size);
            Ok(keys)
        }

        fn cursor_key(&self, record: &i64) -> i64 {
            *record
        }
    }
}
