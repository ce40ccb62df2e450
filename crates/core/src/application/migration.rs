// Migration - a titled routine runnable under an operator

use crate::application::operator::{Context, Operator, OperatorOptions};
use crate::config::OperatorConfig;
use crate::error::Result;
use crate::port::TransactionProvider;
use async_trait::async_trait;

/// A one-off data migration
///
/// `T` is the transaction type of the provider it runs against, so the
/// routine gets typed access to the store through `Context::transaction`.
///
/// # Example
/// ```text
/// struct BackfillSlugs;
///
/// #[async_trait]
/// impl Migration<SqliteMigrationTransaction> for BackfillSlugs {
///     fn title(&self) -> String {
///         "Backfill slugs".to_string()
///     }
///
///     async fn run(&self, ctx: &mut Context<'_, SqliteMigrationTransaction>) -> Result<()> {
///         ctx.transaction()?
///             .execute(sqlx::query("UPDATE posts SET slug = lower(title) WHERE slug IS NULL"))
///             .await?;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Migration<T: Send>: Send + Sync {
    fn title(&self) -> String;

    async fn run(&self, ctx: &mut Context<'_, T>) -> Result<()>;
}

/// Run `migration` under a fresh operator titled after it
pub async fn run_migration<P, M>(
    migration: &M,
    options: OperatorOptions,
    config: OperatorConfig<P>,
) -> Result<bool>
where
    P: TransactionProvider,
    M: Migration<P::Transaction> + ?Sized,
{
    let mut operator = Operator::new(migration.title(), options, config);
    operator.execute(migration).await
}
