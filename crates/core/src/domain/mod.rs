// Domain Layer - Pure business logic and entities

pub mod error;
pub mod report;
pub mod run;
pub mod side_effect;

// Re-exports
pub use error::DomainError;
pub use report::RunReport;
pub use run::{Outcome, Run, RunState};
pub use side_effect::{normalize_statement, SideEffect, SideEffectCounts, SideEffectKind};
