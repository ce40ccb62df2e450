// Structured Logger Port
// Every operator log line is also forwarded here, independent of the text output

/// Structured log sink for operator messages
pub trait OperationLogger: Send + Sync {
    /// `message` arrives trimmed with whitespace runs collapsed
    fn log(&self, title: &str, message: &str);
}

/// Forwards operator messages as `tracing` events (default)
///
/// Where they land (file, stderr, JSON) is decided by the subscriber the
/// binary installs.
pub struct TracingLogger;

impl OperationLogger for TracingLogger {
    fn log(&self, title: &str, message: &str) {
        tracing::info!(target: "migrator::operator", migration = %title, "{}", message);
    }
}

/// Trim and collapse whitespace runs to single spaces
pub fn normalize_message(message: &str) -> String {
    message.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// Keeps every forwarded message
    #[derive(Default)]
    pub struct RecordingLogger {
        messages: Mutex<Vec<String>>,
    }

    impl RecordingLogger {
        pub fn messages(&self) -> Vec<String> {
            self.messages.lock().unwrap().clone()
        }
    }

    impl OperationLogger for RecordingLogger {
        fn log(&self, _title: &str, message: &str) {
            self.messages.lock().unwrap().push(message.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_message() {
        assert_eq!(normalize_message("  42 call:\n  UPDATE  t  "), "42 call: UPDATE t");
        assert_eq!(normalize_message("   "), "");
    }
}
