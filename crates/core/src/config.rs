// Operator Configuration - collaborators resolved once at process start

use crate::port::time_provider::SystemTimeProvider;
use crate::port::{
    ConfirmationInput, ProgressFactory, SideEffectBus, TimeProvider, TransactionProvider,
};
use std::sync::Arc;

/// Everything an operator needs from its environment
///
/// The composition root builds one of these and hands clones to each
/// operator; nothing is read from global state.
pub struct OperatorConfig<P> {
    pub transaction_provider: Arc<P>,
    pub progress: Arc<dyn ProgressFactory>,
    pub confirmation: Arc<dyn ConfirmationInput>,
    pub side_effects: SideEffectBus,
    pub time_provider: Arc<dyn TimeProvider>,
}

impl<P: TransactionProvider> OperatorConfig<P> {
    pub fn new(
        transaction_provider: Arc<P>,
        progress: Arc<dyn ProgressFactory>,
        confirmation: Arc<dyn ConfirmationInput>,
        side_effects: SideEffectBus,
    ) -> Self {
        Self {
            transaction_provider,
            progress,
            confirmation,
            side_effects,
            time_provider: Arc::new(SystemTimeProvider),
        }
    }

    /// Replace the clock (tests)
    pub fn with_time_provider(mut self, time_provider: Arc<dyn TimeProvider>) -> Self {
        self.time_provider = time_provider;
        self
    }
}

// Manual impl: `P` itself need not be Clone
impl<P> Clone for OperatorConfig<P> {
    fn clone(&self) -> Self {
        Self {
            transaction_provider: Arc::clone(&self.transaction_provider),
            progress: Arc::clone(&self.progress),
            confirmation: Arc::clone(&self.confirmation),
            side_effects: self.side_effects.clone(),
            time_provider: Arc::clone(&self.time_provider),
        }
    }
}
