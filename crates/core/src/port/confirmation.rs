// Confirmation Input Port
// Source of the operator's answer at the commit prompt

use std::io;

/// Blocking line source
pub trait ConfirmationInput: Send + Sync {
    /// Read one line; `Ok(None)` at end of input
    ///
    /// Blocks the calling thread until a line is available.
    fn read_line(&self) -> io::Result<Option<String>>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays a fixed list of answers, then reports end of input
    pub struct ScriptedInput {
        lines: Mutex<VecDeque<String>>,
        reads: AtomicUsize,
    }

    impl ScriptedInput {
        pub fn new<I, S>(lines: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Self {
                lines: Mutex::new(lines.into_iter().map(Into::into).collect()),
                reads: AtomicUsize::new(0),
            }
        }

        /// How many times the prompt read a line
        pub fn reads(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }
    }

    impl ConfirmationInput for ScriptedInput {
        fn read_line(&self) -> io::Result<Option<String>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(self.lines.lock().unwrap().pop_front())
        }
    }
}
