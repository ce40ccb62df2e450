// Operator construction options

use crate::port::{OperationLogger, Output};
use std::sync::Arc;

#[derive(Clone)]
pub struct OperatorOptions {
    /// Observe writes, job enqueues and notifications and print a summary
    pub warning_side_effects: bool,

    /// Run the routine directly: no transaction, no confirmation
    pub without_transaction: bool,

    /// Structured log sink (default: `TracingLogger`)
    pub logger: Option<Arc<dyn OperationLogger>>,

    /// Human-readable output (default: stdout)
    pub output: Option<Output>,
}

impl Default for OperatorOptions {
    fn default() -> Self {
        Self {
            warning_side_effects: true,
            without_transaction: false,
            logger: None,
            output: None,
        }
    }
}

impl OperatorOptions {
    pub fn without_transaction(mut self) -> Self {
        self.without_transaction = true;
        self
    }

    pub fn warning_side_effects(mut self, enabled: bool) -> Self {
        self.warning_side_effects = enabled;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn OperationLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_output(mut self, output: Output) -> Self {
        self.output = Some(output);
        self
    }
}

impl std::fmt::Debug for OperatorOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorOptions")
            .field("warning_side_effects", &self.warning_side_effects)
            .field("without_transaction", &self.without_transaction)
            .field("logger", &self.logger.as_ref().map(|_| "custom"))
            .field("output", &self.output)
            .finish()
    }
}
