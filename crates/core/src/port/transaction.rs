// Transaction port - the operator's transactional boundary

use crate::error::Result;
use async_trait::async_trait;

/// A transaction owned by one operator run
///
/// Dropping it without `commit` must roll back.
#[async_trait]
pub trait MigrationTransaction: Send {
    /// Commit the transaction
    async fn commit(self) -> Result<()>;

    /// Rollback the transaction
    async fn rollback(self) -> Result<()>;
}

/// Pluggable transactional backend
///
/// Implementations that coordinate several stores can begin one transaction
/// per store and commit them together in `commit`.
#[async_trait]
pub trait TransactionProvider: Send + Sync {
    type Transaction: MigrationTransaction;

    /// Whether a transaction is already active on the ambient connection
    async fn is_transaction_open(&self) -> Result<bool>;

    /// Begin a new transaction
    async fn begin(&self) -> Result<Self::Transaction>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::port::side_effects::SideEffectBus;
    use std::sync::{Arc, Mutex};

    /// What happened to the transactions a mock provider handed out
    #[derive(Debug, Default, Clone, PartialEq, Eq)]
    pub struct TransactionLog {
        pub begun: usize,
        pub committed: usize,
        pub rolled_back: usize,
        /// Statements of committed transactions
        pub durable: Vec<String>,
    }

    /// In-memory provider
    pub struct MockTransactionProvider {
        open: bool,
        side_effects: SideEffectBus,
        log: Arc<Mutex<TransactionLog>>,
    }

    impl MockTransactionProvider {
        pub fn new(side_effects: SideEffectBus) -> Self {
            Self {
                open: false,
                side_effects,
                log: Arc::default(),
            }
        }

        /// Pretend some outer code already holds a transaction
        pub fn with_open_transaction(mut self) -> Self {
            self.open = true;
            self
        }

        pub fn log(&self) -> TransactionLog {
            self.log.lock().unwrap().clone()
        }
    }

    pub struct MockTransaction {
        statements: Vec<String>,
        side_effects: SideEffectBus,
        log: Arc<Mutex<TransactionLog>>,
    }

    impl MockTransaction {
        /// Record a statement and report it like a real adapter would
        pub fn execute(&mut self, sql: &str) {
            self.side_effects.statement_executed(sql);
            self.statements.push(sql.to_string());
        }
    }

    #[async_trait]
    impl MigrationTransaction for MockTransaction {
        async fn commit(self) -> Result<()> {
            let mut log = self.log.lock().unwrap();
            log.committed += 1;
            log.durable.extend(self.statements);
            Ok(())
        }

        async fn rollback(self) -> Result<()> {
            self.log.lock().unwrap().rolled_back += 1;
            Ok(())
        }
    }

    #[async_trait]
    impl TransactionProvider for MockTransactionProvider {
        type Transaction = MockTransaction;

        async fn is_transaction_open(&self) -> Result<bool> {
            Ok(self.open)
        }

        async fn begin(&self) -> Result<MockTransaction> {
            self.log.lock().unwrap().begun += 1;
            Ok(MockTransaction {
                statements: Vec::new(),
                side_effects: self.side_effects.clone(),
                log: Arc::clone(&self.log),
            })
        }
    }
}
