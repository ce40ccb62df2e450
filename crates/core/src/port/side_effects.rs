// Side Effect Bus
// Process-wide channel through which adapters report writes, job enqueues
// and notification dispatches. Observers subscribe for a scoped window.

use crate::domain::SideEffect;
use std::sync::{Arc, Mutex, MutexGuard};

/// Receives side effects while subscribed
pub trait SideEffectObserver: Send + Sync {
    fn observe(&self, effect: &SideEffect);
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    observers: Vec<(u64, Arc<dyn SideEffectObserver>)>,
}

/// Shared event bus; clones publish to the same observers
#[derive(Clone, Default)]
pub struct SideEffectBus {
    registry: Arc<Mutex<Registry>>,
}

impl SideEffectBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `observer` until the returned guard is dropped
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, observer: Arc<dyn SideEffectObserver>) -> Subscription {
        let mut registry = self.lock();
        registry.next_id += 1;
        let id = registry.next_id;
        registry.observers.push((id, observer));
        Subscription {
            id,
            registry: Arc::clone(&self.registry),
        }
    }

    pub fn emit(&self, effect: SideEffect) {
        // Snapshot so observers run without holding the registry lock
        let observers: Vec<Arc<dyn SideEffectObserver>> = self
            .lock()
            .observers
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        for observer in observers {
            observer.observe(&effect);
        }
    }

    /// Report an executed SQL statement; non-write statements are ignored
    pub fn statement_executed(&self, sql: &str) {
        if let Some(effect) = SideEffect::from_statement(sql) {
            self.emit(effect);
        }
    }

    pub fn job_enqueued(&self, job_type: &str) {
        self.emit(SideEffect::job_enqueue(job_type));
    }

    pub fn notification_sent(&self, name: &str) {
        self.emit(SideEffect::notification(name));
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().observers.len()
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// RAII subscription; unsubscribes on drop, including during unwinding
pub struct Subscription {
    id: u64,
    registry: Arc<Mutex<Registry>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut registry = self.registry.lock().unwrap_or_else(|p| p.into_inner());
        registry.observers.retain(|(id, _)| *id != self.id);
    }
}
