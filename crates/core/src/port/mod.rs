// Port Layer - Interfaces for external dependencies

pub mod confirmation;
pub mod id_provider; // For deterministic testing
pub mod logger;
pub mod output;
pub mod progress;
pub mod record_scope;
pub mod side_effects;
pub mod time_provider;
pub mod transaction;

// Re-exports
pub use confirmation::ConfirmationInput;
pub use id_provider::IdProvider;
pub use logger::{OperationLogger, TracingLogger};
pub use output::{Output, SharedBuffer};
pub use progress::{ProgressFactory, ProgressReporter};
pub use record_scope::RecordScope;
pub use side_effects::{SideEffectBus, SideEffectObserver, Subscription};
pub use time_provider::TimeProvider;
pub use transaction::{MigrationTransaction, TransactionProvider};
