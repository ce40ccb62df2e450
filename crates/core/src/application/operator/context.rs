// Context - capabilities handed to a migration routine

use super::console::Console;
use super::progress::{BatchCursor, ProgressIter, ProgressOptions};
use crate::error::{AppError, Result};
use crate::port::{ConfirmationInput, RecordScope};
use std::sync::Arc;

/// What a running routine may do: log, iterate with progress, ask the
/// operator, and reach the run's transaction
pub struct Context<'a, T> {
    console: Console,
    transaction: Option<&'a mut T>,
    confirmation: Arc<dyn ConfirmationInput>,
}

impl<'a, T: Send> Context<'a, T> {
    pub(crate) fn new(
        console: Console,
        transaction: Option<&'a mut T>,
        confirmation: Arc<dyn ConfirmationInput>,
    ) -> Self {
        Self {
            console,
            transaction,
            confirmation,
        }
    }

    pub fn title(&self) -> &str {
        self.console.title()
    }

    /// Owned console handle, for use while the transaction is borrowed
    pub fn console(&self) -> Console {
        self.console.clone()
    }

    pub fn log(&self, message: impl AsRef<str>) {
        self.console.log(message);
    }

    /// The transaction wrapping this run
    ///
    /// # Errors
    /// `InvalidState` when the operator runs without a transaction.
    pub fn transaction(&mut self) -> Result<&mut T> {
        self.transaction.as_deref_mut().ok_or_else(|| {
            AppError::InvalidState("running without a transaction".to_string())
        })
    }

    pub fn in_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    /// Ask a yes/no question mid-run; "no" fails with `Canceled`
    pub fn confirm(&self, prompt: &str) -> Result<()> {
        self.console.confirm(prompt, self.confirmation.as_ref())
    }

    /// See [`Console::with_progress`]; an item is counted once the next one is
    /// requested
    pub fn with_progress<I>(&self, items: I, options: ProgressOptions) -> ProgressIter<I::IntoIter>
    where
        I: IntoIterator,
    {
        self.console.with_progress(items, options)
    }

    pub fn each_with_progress<I, F, E>(
        &self,
        items: I,
        options: ProgressOptions,
        f: F,
    ) -> std::result::Result<(), E>
    where
        I: IntoIterator,
        F: FnMut(I::Item) -> std::result::Result<(), E>,
    {
        self.console.each_with_progress(items, options, f)
    }

    pub fn find_each_with_progress<'s, C, S>(
        &self,
        scope: &'s S,
        options: ProgressOptions,
    ) -> BatchCursor<'s, C, S>
    where
        C: Send,
        S: RecordScope<C>,
    {
        self.console.find_each_with_progress(scope, options)
    }
}
