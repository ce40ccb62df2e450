// Application Layer - Operator lifecycle and the migration shim

pub mod migration;
pub mod operator;

// Re-exports
pub use migration::{run_migration, Migration};
pub use operator::{
    BatchCursor, Console, Context, Operator, OperatorOptions, ProgressIter, ProgressOptions,
};
