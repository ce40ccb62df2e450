// Migrator Infrastructure - Terminal Adapters
// Implements: ProgressFactory (indicatif), ConfirmationInput (line reader)

pub mod confirmation;
pub mod progress;

pub use confirmation::ReaderConfirmation;
pub use progress::IndicatifProgressFactory;
