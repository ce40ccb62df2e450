// Line-based confirmation input

use migrator_core::port::ConfirmationInput;
use std::io::{self, BufRead, BufReader, Stdin};
use std::sync::Mutex;
use tracing::debug;

/// Reads one answer per line from a buffered reader
///
/// Blocks the calling thread until a line arrives. End of input is `None`.
pub struct ReaderConfirmation<R> {
    reader: Mutex<R>,
}

impl<R: BufRead + Send> ReaderConfirmation<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: Mutex::new(reader),
        }
    }
}

impl ReaderConfirmation<BufReader<Stdin>> {
    /// Confirmation from the process's standard input
    pub fn stdin() -> Self {
        Self::new(BufReader::new(io::stdin()))
    }
}

impl<R: BufRead + Send> ConfirmationInput for ReaderConfirmation<R> {
    fn read_line(&self) -> io::Result<Option<String>> {
        let mut reader = self.reader.lock().unwrap_or_else(|p| p.into_inner());
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            debug!("Confirmation input reached end of file");
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}
