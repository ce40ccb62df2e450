// Console - the operator's text channel
// Owns the output stream, the structured logger and the active progress display

use super::constants::{ANSWER_NO, ANSWER_YES};
use super::progress::{ActiveProgress, BatchCursor, ProgressIter, ProgressOptions};
use crate::error::{AppError, Result};
use crate::port::logger::normalize_message;
use crate::port::{
    ConfirmationInput, OperationLogger, Output, ProgressFactory, ProgressReporter, RecordScope,
};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

struct ConsoleInner {
    title: String,
    output: Output,
    logger: Arc<dyn OperationLogger>,
    progress: Arc<dyn ProgressFactory>,
    active: Mutex<Option<Arc<dyn ProgressReporter>>>,
}

/// Cheap, cloneable handle to one run's console
#[derive(Clone)]
pub struct Console {
    inner: Arc<ConsoleInner>,
}

impl Console {
    pub(crate) fn new(
        title: String,
        output: Output,
        logger: Arc<dyn OperationLogger>,
        progress: Arc<dyn ProgressFactory>,
    ) -> Self {
        Self {
            inner: Arc::new(ConsoleInner {
                title,
                output,
                logger,
                progress,
                active: Mutex::new(None),
            }),
        }
    }

    pub fn title(&self) -> &str {
        &self.inner.title
    }

    pub fn output(&self) -> &Output {
        &self.inner.output
    }

    /// Print a line and forward it to the structured logger
    ///
    /// While a progress display is rendering, the line goes through it so the
    /// bar is redrawn below the message instead of being torn.
    pub fn log(&self, message: impl AsRef<str>) {
        let message = message.as_ref();

        let written = match self.active_progress() {
            Some(reporter) if !reporter.is_finished() => {
                reporter.log(message);
                Ok(())
            }
            _ => self.inner.output.write_line(message),
        };
        if let Err(e) = written {
            warn!(error = %e, "Failed to write operator output");
        }

        let normalized = normalize_message(message);
        if !normalized.is_empty() {
            self.inner.logger.log(&self.inner.title, &normalized);
        }
    }

    /// Ask until the answer is `yes` or `no`
    ///
    /// Blocks the calling thread on `input`. End of input counts as `no`.
    pub fn confirm(&self, prompt: &str, input: &dyn ConfirmationInput) -> Result<()> {
        loop {
            self.inner.output.write_str(prompt)?;

            let answer = match input.read_line()? {
                Some(line) => line,
                None => {
                    debug!("Confirmation input closed, treating as decline");
                    return self.cancel();
                }
            };

            match answer.trim() {
                ANSWER_YES => {
                    self.log("");
                    return Ok(());
                }
                ANSWER_NO => return self.cancel(),
                _ => continue,
            }
        }
    }

    fn cancel(&self) -> Result<()> {
        self.log(format!("Canceled: {}", self.title()));
        Err(AppError::Canceled(self.title().to_string()))
    }

    /// Wrap `items` so iterating them drives a progress display
    ///
    /// The total is `options.total` when given, else the iterator's exact
    /// size hint, else unknown. The display finishes when iteration ends or
    /// the iterator is dropped early.
    ///
    /// An item is counted when the next one is requested. Leaving the loop
    /// with `break` (or `?`) after an item therefore leaves that item
    /// uncounted on the display.
    pub fn with_progress<I>(&self, items: I, options: ProgressOptions) -> ProgressIter<I::IntoIter>
    where
        I: IntoIterator,
    {
        let items = items.into_iter();
        let total = options.total.or_else(|| exact_len(&items));
        let title = options.title.as_deref().unwrap_or(self.title());
        ProgressIter::new(items, self.start_progress(title, total))
    }

    /// Call `f` for every item, advancing a progress display
    ///
    /// Stops at the first error, which is returned as-is.
    pub fn each_with_progress<I, F, E>(
        &self,
        items: I,
        options: ProgressOptions,
        mut f: F,
    ) -> std::result::Result<(), E>
    where
        I: IntoIterator,
        F: FnMut(I::Item) -> std::result::Result<(), E>,
    {
        for item in self.with_progress(items, options) {
            f(item)?;
        }
        Ok(())
    }

    /// Iterate a batched record scope with a progress display
    ///
    /// Nothing is queried until the first `next`, which counts the scope for
    /// the total and fetches the first batch.
    pub fn find_each_with_progress<'s, C, S>(
        &self,
        scope: &'s S,
        options: ProgressOptions,
    ) -> BatchCursor<'s, C, S>
    where
        C: Send,
        S: RecordScope<C>,
    {
        BatchCursor::new(self.clone(), scope, options)
    }

    /// Start a display and make it the target of `log` until it is released
    pub(crate) fn start_progress(&self, title: &str, total: Option<u64>) -> ActiveProgress {
        let reporter = self
            .inner
            .progress
            .create(title, total, &self.inner.output);
        let previous = self.lock_active().replace(Arc::clone(&reporter));
        ActiveProgress::new(self.clone(), reporter, previous)
    }

    /// Restore the previous display if `reporter` is still the active one
    pub(crate) fn release_progress(
        &self,
        reporter: &Arc<dyn ProgressReporter>,
        previous: Option<Arc<dyn ProgressReporter>>,
    ) {
        let mut active = self.lock_active();
        if active
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, reporter))
        {
            *active = previous;
        }
    }

    fn active_progress(&self) -> Option<Arc<dyn ProgressReporter>> {
        self.lock_active().clone()
    }

    fn lock_active(&self) -> std::sync::MutexGuard<'_, Option<Arc<dyn ProgressReporter>>> {
        self.inner.active.lock().unwrap_or_else(|p| p.into_inner())
    }
}

fn exact_len<I: Iterator>(items: &I) -> Option<u64> {
    match items.size_hint() {
        (lower, Some(upper)) if lower == upper => Some(lower as u64),
        _ => None,
    }
}
