// Side Effect Domain Model
// Externally observable effects performed while a migration routine runs

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Category of an observed side effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideEffectKind {
    /// INSERT / UPDATE / DELETE statement
    WriteStatement,
    JobEnqueue,
    NotificationDispatch,
}

impl SideEffectKind {
    /// Report order
    pub const ALL: [SideEffectKind; 3] = [
        SideEffectKind::WriteStatement,
        SideEffectKind::JobEnqueue,
        SideEffectKind::NotificationDispatch,
    ];

    /// Header used in the side-effect summary
    pub fn title(&self) -> &'static str {
        match self {
            SideEffectKind::WriteStatement => "Write Queries",
            SideEffectKind::JobEnqueue => "Enqueued Jobs",
            SideEffectKind::NotificationDispatch => "Delivered Notifications",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideEffect {
    pub kind: SideEffectKind,
    pub key: String,
}

impl SideEffect {
    /// Classify a SQL statement; only write statements are side effects
    pub fn from_statement(sql: &str) -> Option<Self> {
        let normalized = normalize_statement(sql);
        if is_write_statement(&normalized) {
            Some(Self {
                kind: SideEffectKind::WriteStatement,
                key: normalized,
            })
        } else {
            None
        }
    }

    pub fn job_enqueue(job_type: impl Into<String>) -> Self {
        Self {
            kind: SideEffectKind::JobEnqueue,
            key: job_type.into(),
        }
    }

    pub fn notification(name: impl Into<String>) -> Self {
        Self {
            kind: SideEffectKind::NotificationDispatch,
            key: name.into(),
        }
    }
}

/// Collapse whitespace runs and trim, so one statement text maps to one key
pub fn normalize_statement(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_write_statement(normalized: &str) -> bool {
    let head = normalized.trim_start_matches('(');
    let keyword = head
        .split(|c: char| !c.is_ascii_alphabetic())
        .next()
        .unwrap_or("");
    ["INSERT", "UPDATE", "DELETE"]
        .iter()
        .any(|write| keyword.eq_ignore_ascii_case(write))
}

/// Occurrence counts: category -> key -> count
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideEffectCounts(BTreeMap<SideEffectKind, HashMap<String, u64>>);

impl SideEffectCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, effect: &SideEffect) {
        *self
            .0
            .entry(effect.kind)
            .or_default()
            .entry(effect.key.clone())
            .or_insert(0) += 1;
    }

    pub fn count(&self, kind: SideEffectKind, key: &str) -> u64 {
        self.0
            .get(&kind)
            .and_then(|keys| keys.get(key))
            .copied()
            .unwrap_or(0)
    }

    /// Sum of all occurrences in a category
    pub fn total(&self, kind: SideEffectKind) -> u64 {
        self.0
            .get(&kind)
            .map(|keys| keys.values().sum())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(|keys| keys.is_empty())
    }

    /// Up to `limit` keys by descending count, ties broken by key
    pub fn top(&self, kind: SideEffectKind, limit: usize) -> Vec<(&str, u64)> {
        let Some(keys) = self.0.get(&kind) else {
            return Vec::new();
        };
        let mut entries: Vec<(&str, u64)> = keys
            .iter()
            .map(|(key, count)| (key.as_str(), *count))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        entries.truncate(limit);
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_statements_are_classified() {
        let effect = SideEffect::from_statement("  UPDATE users\n   SET name = ?  WHERE id = ?")
            .expect("update is a write");
        assert_eq!(effect.kind, SideEffectKind::WriteStatement);
        assert_eq!(effect.key, "UPDATE users SET name = ? WHERE id = ?");

        assert!(SideEffect::from_statement("insert into t values (1)").is_some());
        assert!(SideEffect::from_statement("Delete FROM t").is_some());
    }

    #[test]
    fn test_reads_are_not_side_effects() {
        assert!(SideEffect::from_statement("SELECT * FROM users").is_none());
        assert!(SideEffect::from_statement("PRAGMA foreign_keys = ON").is_none());
        assert!(SideEffect::from_statement("UPDATED_AT").is_none());
        assert!(SideEffect::from_statement("").is_none());
    }

    #[test]
    fn test_top_sorts_by_count_then_key() {
        let mut counts = SideEffectCounts::new();
        for _ in 0..3 {
            counts.record(&SideEffect::job_enqueue("ReindexJob"));
        }
        counts.record(&SideEffect::job_enqueue("MailJob"));
        counts.record(&SideEffect::job_enqueue("AuditJob"));

        let top = counts.top(SideEffectKind::JobEnqueue, 2);
        assert_eq!(top, vec![("ReindexJob", 3), ("AuditJob", 1)]);
        assert_eq!(counts.total(SideEffectKind::JobEnqueue), 5);
        assert!(counts.top(SideEffectKind::WriteStatement, 20).is_empty());
    }

    #[test]
    fn test_counts_start_empty() {
        let mut counts = SideEffectCounts::new();
        assert!(counts.is_empty());
        counts.record(&SideEffect::notification("WelcomeMailer"));
        assert!(!counts.is_empty());
        assert_eq!(
            counts.count(SideEffectKind::NotificationDispatch, "WelcomeMailer"),
            1
        );
    }
}
