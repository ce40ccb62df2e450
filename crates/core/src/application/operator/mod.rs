// Operator - supervised execution of one migration run
// Transaction boundary, confirmation, duration and side-effect summary

pub mod constants;
mod console;
mod context;
mod options;
mod progress;
mod recorder;

use constants::{COMMIT_PROMPT, START_TIMESTAMP_FORMAT};
pub use console::Console;
pub use context::Context;
pub use options::OperatorOptions;
pub use progress::{BatchCursor, ProgressIter, ProgressOptions};

use crate::application::migration::Migration;
use crate::config::OperatorConfig;
use crate::domain::{Outcome, Run, RunReport, RunState, SideEffectCounts};
use crate::error::{AppError, Result};
use crate::port::{
    MigrationTransaction, OperationLogger, Output, TracingLogger, TransactionProvider,
};
use chrono::{DateTime, Local, Utc};
use recorder::SideEffectRecorder;
use std::sync::Arc;
use tracing::{debug, warn};

/// Runs one migration routine inside a transaction it owns, asks before
/// committing, and records how the run went
///
/// One operator per run: `execute` may be called once.
pub struct Operator<P: TransactionProvider> {
    options: OperatorOptions,
    config: OperatorConfig<P>,
    console: Console,
    run: Run,
    side_effect_counts: SideEffectCounts,
}

impl<P: TransactionProvider> Operator<P> {
    pub fn new(title: impl Into<String>, options: OperatorOptions, config: OperatorConfig<P>) -> Self {
        let title = title.into();
        let output = options.output.clone().unwrap_or_else(Output::stdout);
        let logger = options
            .logger
            .clone()
            .unwrap_or_else(|| Arc::new(TracingLogger) as Arc<dyn OperationLogger>);
        let console = Console::new(title.clone(), output, logger, Arc::clone(&config.progress));

        Self {
            options,
            config,
            console,
            run: Run::new(title),
            side_effect_counts: SideEffectCounts::new(),
        }
    }

    pub fn title(&self) -> &str {
        &self.run.title
    }

    pub fn options(&self) -> &OperatorOptions {
        &self.options
    }

    pub fn state(&self) -> RunState {
        self.run.state
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.run.started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.run.ended_at
    }

    /// `None` until finished, then whether the run committed
    pub fn result(&self) -> Option<bool> {
        self.run.result()
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.run.outcome.as_ref()
    }

    /// Counts observed during the routine (empty when observation is off)
    pub fn side_effect_counts(&self) -> &SideEffectCounts {
        &self.side_effect_counts
    }

    /// Elapsed seconds; measured against the clock while still running
    pub fn duration(&self) -> f64 {
        self.run.duration_secs(self.config.time_provider.now())
    }

    pub fn report(&self) -> RunReport {
        RunReport::new(
            &self.run,
            &self.side_effect_counts,
            self.config.time_provider.now(),
        )
    }

    pub fn log(&self, message: impl AsRef<str>) {
        self.console.log(message);
    }

    /// Execute `migration` and return whether it committed
    ///
    /// Every failure (nested transaction, routine error, declined commit,
    /// commit error) is recorded and logged with the total time before it is
    /// returned. A declined commit is `AppError::Canceled`.
    pub async fn execute<M>(&mut self, migration: &M) -> Result<bool>
    where
        M: Migration<P::Transaction> + ?Sized,
    {
        let started_at = self.config.time_provider.now();
        self.run
            .start(started_at)
            .map_err(|e| AppError::InvalidState(e.to_string()))?;
        self.log(format!(
            "Start: {} at {}",
            self.title(),
            format_timestamp(started_at)
        ));

        let outcome = self.execute_run(migration).await;
        self.finalize(outcome)
    }

    async fn execute_run<M>(&mut self, migration: &M) -> Result<()>
    where
        M: Migration<P::Transaction> + ?Sized,
    {
        if self.options.without_transaction {
            return self.run_routine(migration, None).await;
        }

        let provider = Arc::clone(&self.config.transaction_provider);
        if provider.is_transaction_open().await? {
            debug!(migration = %self.title(), "Refusing to run inside an open transaction");
            return Err(AppError::NestedTransaction);
        }

        let mut transaction = provider.begin().await?;
        let decision = match self.run_routine(migration, Some(&mut transaction)).await {
            Ok(()) => self.confirm_commit(),
            Err(e) => Err(e),
        };

        match decision {
            Ok(()) => transaction.commit().await,
            Err(e) => {
                if let Err(rollback_err) = transaction.rollback().await {
                    warn!(error = %rollback_err, migration = %self.title(), "Rollback failed");
                }
                Err(e)
            }
        }
    }

    /// Run the routine, observing side effects for exactly its duration
    async fn run_routine<M>(
        &mut self,
        migration: &M,
        transaction: Option<&mut P::Transaction>,
    ) -> Result<()>
    where
        M: Migration<P::Transaction> + ?Sized,
    {
        let mut ctx = Context::new(
            self.console.clone(),
            transaction,
            Arc::clone(&self.config.confirmation),
        );

        if !self.options.warning_side_effects {
            return migration.run(&mut ctx).await;
        }

        let recorder = Arc::new(SideEffectRecorder::default());
        let result = {
            let _subscription = self.config.side_effects.subscribe(recorder.clone());
            migration.run(&mut ctx).await
        };

        self.side_effect_counts = recorder.counts();
        recorder.report(&self.console);
        result
    }

    fn confirm_commit(&mut self) -> Result<()> {
        self.log(format!("Finished execution: {}", self.title()));
        self.run.await_confirmation()?;
        self.console
            .confirm(COMMIT_PROMPT, self.config.confirmation.as_ref())
    }

    fn finalize(&mut self, outcome: Result<()>) -> Result<bool> {
        let ended_at = self.config.time_provider.now();
        let (run_outcome, error) = match outcome {
            Ok(()) => (Outcome::Committed, None),
            Err(e) => (outcome_of(&e), Some(e)),
        };

        if let Err(e) = self.run.finish(run_outcome, ended_at) {
            warn!(error = %e, migration = %self.title(), "Run finished from unexpected state");
        }

        if self.result() == Some(true) {
            self.log(format!("Finished successfully: {}", self.title()));
        }
        // Always the last line
        self.log(format!("Total time: {:.2} sec", self.duration()));

        match error {
            Some(e) => Err(e),
            None => Ok(true),
        }
    }
}

fn outcome_of(error: &AppError) -> Outcome {
    match error {
        AppError::Canceled(_) => Outcome::Canceled,
        AppError::NestedTransaction => Outcome::NestedTransaction,
        other => Outcome::Failed {
            message: other.to_string(),
        },
    }
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local)
        .format(START_TIMESTAMP_FORMAT)
        .to_string()
}
