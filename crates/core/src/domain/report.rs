// Run Report - serializable summary of a finished run

use crate::domain::{Run, SideEffectCounts};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    #[serde(flatten)]
    pub run: Run,
    pub result: Option<bool>,
    pub duration_secs: f64,
    pub side_effects: SideEffectCounts,
}

impl RunReport {
    pub fn new(run: &Run, side_effects: &SideEffectCounts, now: DateTime<Utc>) -> Self {
        Self {
            run: run.clone(),
            result: run.result(),
            duration_secs: run.duration_secs(now),
            side_effects: side_effects.clone(),
        }
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
