// Progress Port - textual progress indicator over an iteration

use crate::port::output::Output;
use std::sync::Arc;

/// One live progress display
///
/// Methods take `&self`: the operator context and the iteration adapter hold
/// the same reporter.
pub trait ProgressReporter: Send + Sync {
    /// Advance by one item
    fn increment(&self);

    /// Print `message` without corrupting the rendered bar
    fn log(&self, message: &str);

    fn is_finished(&self) -> bool;

    /// Stop rendering, leaving the final state visible
    fn finish(&self);
}

/// Creates progress displays bound to an output stream
pub trait ProgressFactory: Send + Sync {
    /// `total` is `None` when the size of the sequence is unknown
    fn create(&self, title: &str, total: Option<u64>, output: &Output)
        -> Arc<dyn ProgressReporter>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::Mutex;

    /// Plain-text reporter: one line on start, one on finish
    pub struct LineProgress {
        pub title: String,
        pub total: Option<u64>,
        position: AtomicU64,
        finished: AtomicBool,
        output: Output,
    }

    impl LineProgress {
        pub fn position(&self) -> u64 {
            self.position.load(Ordering::SeqCst)
        }
    }

    impl ProgressReporter for LineProgress {
        fn increment(&self) {
            self.position.fetch_add(1, Ordering::SeqCst);
        }

        fn log(&self, message: &str) {
            let _ = self.output.write_line(&format!("[progress] {}", message));
        }

        fn is_finished(&self) -> bool {
            self.finished.load(Ordering::SeqCst)
        }

        fn finish(&self) {
            if self.finished.swap(true, Ordering::SeqCst) {
                return;
            }
            let total = self
                .total
                .map(|t| t.to_string())
                .unwrap_or_else(|| "?".to_string());
            let _ = self
                .output
                .write_line(&format!("{}: {}/{}", self.title, self.position(), total));
        }
    }

    /// Factory that remembers every reporter it created
    #[derive(Default)]
    pub struct LineProgressFactory {
        created: Mutex<Vec<Arc<LineProgress>>>,
    }

    impl LineProgressFactory {
        pub fn created(&self) -> Vec<Arc<LineProgress>> {
            self.created.lock().unwrap().clone()
        }
    }

    impl ProgressFactory for LineProgressFactory {
        fn create(
            &self,
            title: &str,
            total: Option<u64>,
            output: &Output,
        ) -> Arc<dyn ProgressReporter> {
            let reporter = Arc::new(LineProgress {
                title: title.to_string(),
                total,
                position: AtomicU64::new(0),
                finished: AtomicBool::new(false),
                output: output.clone(),
            });
            self.created.lock().unwrap().push(Arc::clone(&reporter));
            reporter
        }
    }
}
