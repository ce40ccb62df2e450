// Iteration with progress
// Adapters that tie a progress display's lifetime to an iteration

use super::console::Console;
use crate::error::Result;
use crate::port::{ProgressReporter, RecordScope};
use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::warn;

/// Options for a progress display
#[derive(Debug, Clone, Default)]
pub struct ProgressOptions {
    /// Label shown next to the bar (default: the run title)
    pub title: Option<String>,

    /// Total item count when the sequence cannot report it
    pub total: Option<u64>,
}

impl ProgressOptions {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            total: None,
        }
    }

    pub fn total(mut self, total: u64) -> Self {
        self.total = Some(total);
        self
    }
}

/// A rendering progress display registered with its console
///
/// Finishing is idempotent; dropping finishes and unregisters.
pub(crate) struct ActiveProgress {
    console: Console,
    reporter: Arc<dyn ProgressReporter>,
    previous: Option<Arc<dyn ProgressReporter>>,
}

impl ActiveProgress {
    pub(crate) fn new(
        console: Console,
        reporter: Arc<dyn ProgressReporter>,
        previous: Option<Arc<dyn ProgressReporter>>,
    ) -> Self {
        Self {
            console,
            reporter,
            previous,
        }
    }

    fn increment(&self) {
        self.reporter.increment();
    }

    fn finish(&self) {
        if !self.reporter.is_finished() {
            self.reporter.finish();
        }
    }
}

impl Drop for ActiveProgress {
    fn drop(&mut self) {
        self.finish();
        self.console
            .release_progress(&self.reporter, self.previous.take());
    }
}

/// Iterator adapter advancing the display once per consumed item
///
/// An item counts as done when the next one is requested, so an item whose
/// processing fails is not counted.
pub struct ProgressIter<I> {
    items: I,
    progress: ActiveProgress,
    pending: bool,
}

impl<I> ProgressIter<I> {
    pub(crate) fn new(items: I, progress: ActiveProgress) -> Self {
        Self {
            items,
            progress,
            pending: false,
        }
    }
}

impl<I: Iterator> Iterator for ProgressIter<I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<I::Item> {
        if std::mem::take(&mut self.pending) {
            self.progress.increment();
        }
        match self.items.next() {
            Some(item) => {
                self.pending = true;
                Some(item)
            }
            None => {
                self.progress.finish();
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.items.size_hint()
    }
}

/// Cursor over a batched record scope with a progress display
///
/// The connection is lent per call, so the routine can use it for its own
/// statements between records.
pub struct BatchCursor<'s, C, S>
where
    C: Send,
    S: RecordScope<C>,
{
    console: Console,
    scope: &'s S,
    options: ProgressOptions,
    progress: Option<ActiveProgress>,
    buffer: VecDeque<S::Record>,
    after: Option<i64>,
    exhausted: bool,
    pending: bool,
    _conn: PhantomData<fn(&mut C)>,
}

impl<'s, C, S> BatchCursor<'s, C, S>
where
    C: Send,
    S: RecordScope<C>,
{
    pub(crate) fn new(console: Console, scope: &'s S, options: ProgressOptions) -> Self {
        Self {
            console,
            scope,
            options,
            progress: None,
            buffer: VecDeque::new(),
            after: None,
            exhausted: false,
            pending: false,
            _conn: PhantomData,
        }
    }

    /// Next record in key order, `None` once the scope is drained
    pub async fn next(&mut self, conn: &mut C) -> Result<Option<S::Record>> {
        if self.progress.is_none() {
            let total = match self.options.total {
                Some(total) => Some(total),
                None => self.count(conn).await,
            };
            let title = self.options.title.as_deref().unwrap_or(self.console.title());
            self.progress = Some(self.console.start_progress(title, total));
        }

        if std::mem::take(&mut self.pending) {
            if let Some(progress) = &self.progress {
                progress.increment();
            }
        }

        if self.buffer.is_empty() && !self.exhausted {
            let batch = self.scope.fetch_batch(conn, self.after).await?;
            match batch.last() {
                Some(last) => self.after = Some(self.scope.cursor_key(last)),
                None => self.exhausted = true,
            }
            self.buffer.extend(batch);
        }

        match self.buffer.pop_front() {
            Some(record) => {
                self.pending = true;
                Ok(Some(record))
            }
            None => {
                if let Some(progress) = &self.progress {
                    progress.finish();
                }
                Ok(None)
            }
        }
    }

    /// Scope size, or unknown when counting fails
    async fn count(&self, conn: &mut C) -> Option<u64> {
        match self.scope.count(conn).await {
            Ok(total) => Some(total),
            Err(e) => {
                warn!(error = %e, "Counting records failed, showing progress without a total");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::logger::mocks::RecordingLogger;
    use crate::port::progress::mocks::LineProgressFactory;
    use crate::port::record_scope::mocks::{CountingConn, VecScope};
    use crate::port::Output;

    fn console(progress: Arc<LineProgressFactory>) -> Console {
        let (output, _) = Output::buffer();
        Console::new(
            "Backfill".to_string(),
            output,
            Arc::new(RecordingLogger::default()),
            progress,
        )
    }

    #[tokio::test]
    async fn test_find_each_walks_all_batches_in_key_order() {
        let progress = Arc::new(LineProgressFactory::default());
        let console = console(progress.clone());
        let scope = VecScope::new(vec![5, 1, 4, 2, 3], 2);
        let mut conn = CountingConn::default();

        let mut cursor = console.find_each_with_progress(&scope, ProgressOptions::default());
        let mut seen = Vec::new();
        while let Some(key) = cursor.next(&mut conn).await.unwrap() {
            seen.push(key);
        }

        assert_eq!(seen, vec![1, 2, 3, 4, 5]);
        // count + 3 full/partial batches + 1 empty batch
        assert_eq!(conn.queries, 5);
        let created = progress.created();
        assert_eq!(created[0].total, Some(5));
        assert_eq!(created[0].position(), 5);
        assert!(created[0].is_finished());
    }

    #[tokio::test]
    async fn test_find_each_count_failure_degrades_to_unknown_total() {
        let progress = Arc::new(LineProgressFactory::default());
        let console = console(progress.clone());
        let mut scope = VecScope::new(vec![1, 2, 3], 10);
        scope.fail_count = true;
        let mut conn = CountingConn::default();

        let mut cursor = console.find_each_with_progress(&scope, ProgressOptions::default());
        let mut seen = 0;
        while cursor.next(&mut conn).await.unwrap().is_some() {
            seen += 1;
        }

        assert_eq!(seen, 3);
        assert_eq!(progress.created()[0].total, None);
    }

    #[tokio::test]
    async fn test_find_each_nothing_queried_before_first_next() {
        let progress = Arc::new(LineProgressFactory::default());
        let console = console(progress.clone());
        let scope = VecScope::new(vec![1], 10);

        let cursor = console.find_each_with_progress::<CountingConn, _>(
            &scope,
            ProgressOptions::titled("Users").total(1),
        );
        drop(cursor);

        assert!(progress.created().is_empty());
    }

    #[tokio::test]
    async fn test_dropping_cursor_mid_scope_finishes_display() {
        let progress = Arc::new(LineProgressFactory::default());
        let console = console(progress.clone());
        let scope = VecScope::new(vec![1, 2, 3], 10);
        let mut conn = CountingConn::default();

        {
            let mut cursor = console.find_each_with_progress(&scope, ProgressOptions::default());
            cursor.next(&mut conn).await.unwrap();
        }

        assert!(progress.created()[0].is_finished());
    }
}
