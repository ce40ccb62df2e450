// Operator constants (no magic values)

/// Prompt shown before committing the run's transaction
pub const COMMIT_PROMPT: &str = "Are you sure to commit? (yes/no) > ";

/// Answer that commits
pub const ANSWER_YES: &str = "yes";

/// Answer that rolls back
pub const ANSWER_NO: &str = "no";

/// Maximum keys listed per side-effect category
pub const SIDE_EFFECT_REPORT_LIMIT: usize = 20;

/// Timestamp in the start line, e.g. `2024-05-01 09:30:00 +0900`
pub const START_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";
