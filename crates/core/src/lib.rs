// Migrator Core - Operator lifecycle, domain types & ports
// NO infrastructure dependencies: adapters live in infra-* crates

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod port;

pub use application::{run_migration, Context, Migration, Operator, OperatorOptions};
pub use config::OperatorConfig;
pub use error::{AppError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
