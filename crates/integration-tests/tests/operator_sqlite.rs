//! Operator runs against an in-memory SQLite database
//!
//! Covers commit, decline, routine failure, nesting, runs without a
//! transaction and the side-effect summary end to end.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use sqlx::SqlitePool;

use migrator_core::application::ProgressOptions;
use migrator_core::domain::{Outcome, SideEffectKind};
use migrator_core::port::confirmation::mocks::ScriptedInput;
use migrator_core::port::id_provider::mocks::SequentialIds;
use migrator_core::port::progress::mocks::LineProgressFactory;
use migrator_core::port::time_provider::SystemTimeProvider;
use migrator_core::port::{
    Output, ProgressReporter, SharedBuffer, SideEffectBus, TransactionProvider,
};
use migrator_core::{AppError, Context, Migration, Operator, OperatorConfig, OperatorOptions, Result};
use migrator_infra_sqlite::{
    create_pool, execute_tracked, SqliteJobQueue, SqliteMigrationTransaction, SqliteScope,
    SqliteTransactionProvider,
};

const PROMPT: &str = "Are you sure to commit? (yes/no) > ";
const INSERT_JOB: &str = "INSERT INTO background_jobs (id, queue, job_type, payload, state, created_at) \
     VALUES (?, ?, ?, ?, ?, ?)";

#[derive(Debug, sqlx::FromRow)]
struct User {
    id: i64,
}

struct Db {
    pool: SqlitePool,
    bus: SideEffectBus,
    provider: Arc<SqliteTransactionProvider>,
}

async fn setup(users: i64) -> Db {
    let pool = create_pool("sqlite::memory:").await.unwrap();
    sqlx::query("CREATE TABLE users (id INTEGER PRIMARY KEY, active INTEGER NOT NULL DEFAULT 1)")
        .execute(&pool)
        .await
        .unwrap();
    for id in 1..=users {
        sqlx::query("INSERT INTO users (id) VALUES (?)")
            .bind(id)
            .execute(&pool)
            .await
            .unwrap();
    }

    let bus = SideEffectBus::new();
    let mut conn = pool.acquire().await.unwrap();
    job_queue(&bus).ensure_schema(&mut *conn).await.unwrap();
    drop(conn);

    let provider = Arc::new(SqliteTransactionProvider::new(pool.clone(), bus.clone()));
    Db {
        pool,
        bus,
        provider,
    }
}

fn job_queue(bus: &SideEffectBus) -> SqliteJobQueue {
    SqliteJobQueue::new(
        bus.clone(),
        Arc::new(SequentialIds::default()),
        Arc::new(SystemTimeProvider),
    )
}

fn operator(
    db: &Db,
    answers: &[&str],
    options: OperatorOptions,
) -> (Operator<SqliteTransactionProvider>, SharedBuffer, Arc<LineProgressFactory>) {
    let (output, buffer) = Output::buffer();
    let progress = Arc::new(LineProgressFactory::default());
    let config = OperatorConfig::new(
        db.provider.clone(),
        progress.clone(),
        Arc::new(ScriptedInput::new(answers.iter().copied())),
        db.bus.clone(),
    );
    let operator = Operator::new("Deactivate users", options.with_output(output), config);
    (operator, buffer, progress)
}

async fn active_users(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE active = 1")
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn queued_jobs(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM background_jobs")
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Deactivates every user in batches and enqueues a reindex job per user
struct DeactivateUsers {
    jobs: SqliteJobQueue,
    fail_on: Option<i64>,
}

impl DeactivateUsers {
    fn new(db: &Db) -> Self {
        Self {
            jobs: job_queue(&db.bus),
            fail_on: None,
        }
    }
}

#[async_trait]
impl Migration<SqliteMigrationTransaction> for DeactivateUsers {
    fn title(&self) -> String {
        "Deactivate users".to_string()
    }

    async fn run(&self, ctx: &mut Context<'_, SqliteMigrationTransaction>) -> Result<()> {
        let scope = SqliteScope::new("users", "id", |u: &User| u.id)?.batch_size(2)?;
        let mut cursor = ctx.find_each_with_progress(&scope, ProgressOptions::titled("Users"));
        let console = ctx.console();
        let tx = ctx.transaction()?;

        while let Some(user) = cursor.next(tx.connection()).await? {
            if self.fail_on == Some(user.id) {
                return Err(AppError::migration(format!("user {} is locked", user.id)));
            }
            tx.execute(sqlx::query("UPDATE users SET active = 0 WHERE id = ?").bind(user.id))
                .await?;
            self.jobs
                .enqueue(tx.connection(), "ReindexUser", json!({ "user_id": user.id }))
                .await?;
            console.log(format!("deactivated user {}", user.id));
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_yes_commits_all_writes_and_jobs() {
    let db = setup(5).await;
    let (mut operator, buffer, progress) = operator(&db, &["yes"], OperatorOptions::default());

    let committed = operator.execute(&DeactivateUsers::new(&db)).await.unwrap();

    assert!(committed);
    assert_eq!(operator.result(), Some(true));
    assert_eq!(active_users(&db.pool).await, 0);
    assert_eq!(queued_jobs(&db.pool).await, 5);
    assert_eq!(db.provider.open_transactions(), 0);

    let out = buffer.contents();
    // Job inserts made by the queue count as writes too; ties sort by statement
    assert!(out.contains(&format!(
        "Write Queries!!\n5 call: {}\n5 call: UPDATE users SET active = 0 WHERE id = ?",
        INSERT_JOB
    )));
    assert!(out.contains("Enqueued Jobs!!\n5 call: ReindexUser"));
    assert!(out.contains(PROMPT));
    assert!(out.contains("Finished successfully: Deactivate users"));
    assert!(out.lines().last().unwrap().starts_with("Total time:"));
    // Logged through the console while the transaction was borrowed
    assert!(out.contains("[progress] deactivated user 5"));

    let bars = progress.created();
    assert_eq!(bars.len(), 1);
    assert_eq!(bars[0].title, "Users");
    assert_eq!(bars[0].total, Some(5));
    assert_eq!(bars[0].position(), 5);
}

#[tokio::test]
async fn test_no_rolls_back_everything() {
    let db = setup(5).await;
    let (mut operator, buffer, _) = operator(&db, &["no"], OperatorOptions::default());

    let err = operator.execute(&DeactivateUsers::new(&db)).await.unwrap_err();

    assert!(err.is_canceled());
    assert_eq!(operator.outcome(), Some(&Outcome::Canceled));
    assert_eq!(active_users(&db.pool).await, 5);
    assert_eq!(queued_jobs(&db.pool).await, 0);
    assert_eq!(db.provider.open_transactions(), 0);

    let out = buffer.contents();
    assert!(out.contains("Canceled: Deactivate users"));
    assert!(out.contains("Total time:"));
    assert!(!out.contains("Finished successfully"));
}

#[tokio::test]
async fn test_routine_failure_rolls_back_without_prompt() {
    let db = setup(5).await;
    let (mut operator, buffer, progress) = operator(&db, &["yes"], OperatorOptions::default());
    let migration = DeactivateUsers {
        fail_on: Some(3),
        ..DeactivateUsers::new(&db)
    };

    let err = operator.execute(&migration).await.unwrap_err();

    assert_eq!(err.to_string(), "Migration failed: user 3 is locked");
    assert_eq!(active_users(&db.pool).await, 5);
    assert_eq!(queued_jobs(&db.pool).await, 0);

    let out = buffer.contents();
    assert!(!out.contains(PROMPT));
    assert!(!out.contains("Canceled:"));
    // Effects observed before the failure are still summarized
    assert!(out.contains("2 call: ReindexUser"));

    let bars = progress.created();
    assert_eq!(bars[0].position(), 2);
    assert!(bars[0].is_finished());
}

#[tokio::test]
async fn test_open_transaction_is_nested_error() {
    let db = setup(2).await;
    let (mut operator, buffer, progress) = operator(&db, &["yes"], OperatorOptions::default());
    let held = db.provider.begin().await.unwrap();

    let err = operator.execute(&DeactivateUsers::new(&db)).await.unwrap_err();
    drop(held);

    assert!(err.is_nested_transaction());
    assert_eq!(operator.result(), Some(false));
    assert!(progress.created().is_empty());
    assert_eq!(active_users(&db.pool).await, 2);
    assert!(!buffer.contents().contains(PROMPT));
}

/// Writes straight through the pool
struct ArchiveDirect {
    pool: SqlitePool,
    bus: SideEffectBus,
}

#[async_trait]
impl Migration<SqliteMigrationTransaction> for ArchiveDirect {
    fn title(&self) -> String {
        "Archive users".to_string()
    }

    async fn run(&self, ctx: &mut Context<'_, SqliteMigrationTransaction>) -> Result<()> {
        assert!(!ctx.in_transaction());
        assert!(ctx.transaction().is_err());

        for id in ctx.with_progress(1..=3i64, ProgressOptions::default()) {
            execute_tracked(
                &self.pool,
                sqlx::query("UPDATE users SET active = 0 WHERE id = ?").bind(id),
                &self.bus,
            )
            .await?;
        }
        self.bus.notification_sent("WeeklyDigest");
        Ok(())
    }
}

#[tokio::test]
async fn test_without_transaction_writes_immediately() {
    let db = setup(4).await;
    let (mut operator, buffer, _) = operator(
        &db,
        &[],
        OperatorOptions::default().without_transaction(),
    );
    let migration = ArchiveDirect {
        pool: db.pool.clone(),
        bus: db.bus.clone(),
    };

    assert!(operator.execute(&migration).await.unwrap());

    assert_eq!(active_users(&db.pool).await, 1);
    let out = buffer.contents();
    assert!(!out.contains(PROMPT));
    assert!(out.contains("3 call: UPDATE users SET active = 0 WHERE id = ?"));
    assert!(out.contains("Delivered Notifications!!\n1 call: WeeklyDigest"));
    assert!(!out.contains("Enqueued Jobs!!"));
}

#[tokio::test]
async fn test_summary_suppressed_when_disabled() {
    let db = setup(3).await;
    let (mut operator, buffer, _) = operator(
        &db,
        &["yes"],
        OperatorOptions::default().warning_side_effects(false),
    );

    operator.execute(&DeactivateUsers::new(&db)).await.unwrap();

    assert_eq!(active_users(&db.pool).await, 0);
    assert!(!buffer.contents().contains("!!"));
    assert_eq!(db.bus.subscriber_count(), 0);
}

#[tokio::test]
async fn test_report_reflects_run() {
    let db = setup(3).await;
    let (mut operator, _, _) = operator(&db, &["yes"], OperatorOptions::default());

    operator.execute(&DeactivateUsers::new(&db)).await.unwrap();

    let report = operator.report();
    assert_eq!(report.result, Some(true));
    assert_eq!(report.side_effects.total(SideEffectKind::JobEnqueue), 3);
    assert_eq!(report.side_effects.total(SideEffectKind::WriteStatement), 6);

    let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(value["title"], "Deactivate users");
    assert_eq!(value["state"], "COMMITTED");
    assert_eq!(value["outcome"]["kind"], "committed");
}

#[tokio::test]
async fn test_sequential_runs_do_not_leak_subscriptions() {
    let db = setup(2).await;

    let (mut first, _, _) = operator(&db, &["no"], OperatorOptions::default());
    assert!(first.execute(&DeactivateUsers::new(&db)).await.is_err());

    let (mut second, buffer, _) = operator(&db, &["yes"], OperatorOptions::default());
    second.execute(&DeactivateUsers::new(&db)).await.unwrap();

    assert_eq!(db.bus.subscriber_count(), 0);
    assert!(buffer.contents().contains("Enqueued Jobs!!\n2 call: ReindexUser"));
    assert_eq!(second.side_effect_counts().total(SideEffectKind::JobEnqueue), 2);
}
