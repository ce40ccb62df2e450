// SQL script migration - runs each statement of a script under the operator

use async_trait::async_trait;
use migrator_core::application::ProgressOptions;
use migrator_core::domain::normalize_statement;
use migrator_core::error::Result;
use migrator_core::port::SideEffectBus;
use migrator_core::{Context, Migration};
use migrator_infra_sqlite::{execute_tracked, SqliteMigrationTransaction};
use sqlx::SqlitePool;
use tracing::debug;

pub struct SqlScriptMigration {
    title: String,
    statements: Vec<String>,
    pool: SqlitePool,
    side_effects: SideEffectBus,
}

impl SqlScriptMigration {
    /// `pool` and `side_effects` serve runs without a transaction
    pub fn new(
        title: impl Into<String>,
        statements: Vec<String>,
        pool: SqlitePool,
        side_effects: SideEffectBus,
    ) -> Self {
        Self {
            title: title.into(),
            statements,
            pool,
            side_effects,
        }
    }
}

#[async_trait]
impl Migration<SqliteMigrationTransaction> for SqlScriptMigration {
    fn title(&self) -> String {
        self.title.clone()
    }

    async fn run(&self, ctx: &mut Context<'_, SqliteMigrationTransaction>) -> Result<()> {
        let mut affected = 0;

        for statement in ctx.with_progress(&self.statements, ProgressOptions::titled("Statements")) {
            let rows = if ctx.in_transaction() {
                ctx.transaction()?.execute_sql(statement).await?
            } else {
                execute_tracked(&self.pool, sqlx::query(statement), &self.side_effects).await?
            };
            debug!(rows, statement = %normalize_statement(statement), "Executed statement");
            affected += rows;
        }

        ctx.log(format!(
            "Executed {} statements, {} rows affected",
            self.statements.len(),
            affected
        ));
        Ok(())
    }
}
