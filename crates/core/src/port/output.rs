// Output Port - human-readable text stream of a run

use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared handle to the operator's text output
///
/// Cloning shares the underlying writer, so the operator, its progress
/// renderer and the routine's context all write to one stream in order.
#[derive(Clone)]
pub struct Output {
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl Output {
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Process standard output (default)
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// In-memory output plus a handle to read back what was written
    pub fn buffer() -> (Self, SharedBuffer) {
        let buffer = SharedBuffer::default();
        (Self::new(buffer.clone()), buffer)
    }

    /// Write `line` followed by a newline
    pub fn write_line(&self, line: &str) -> io::Result<()> {
        let mut writer = self.lock();
        writeln!(writer, "{}", line)?;
        writer.flush()
    }

    /// Write `text` as-is (no newline) and flush, e.g. for prompts
    pub fn write_str(&self, text: &str) -> io::Result<()> {
        let mut writer = self.lock();
        writer.write_all(text.as_bytes())?;
        writer.flush()
    }

    pub fn flush(&self) -> io::Result<()> {
        self.lock().flush()
    }

    fn lock(&self) -> MutexGuard<'_, Box<dyn Write + Send>> {
        // A panic mid-write leaves the stream usable; keep writing
        self.writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::stdout()
    }
}

impl std::fmt::Debug for Output {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Output").finish_non_exhaustive()
    }
}

/// Cloneable in-memory writer
#[derive(Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    /// Everything written so far, lossily decoded
    pub fn contents(&self) -> String {
        let bytes = self.bytes.lock().unwrap_or_else(|p| p.into_inner());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
