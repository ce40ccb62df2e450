// Side Effect Recorder - tallies effects observed during one routine

use super::console::Console;
use super::constants::SIDE_EFFECT_REPORT_LIMIT;
use crate::domain::{SideEffect, SideEffectCounts, SideEffectKind};
use crate::port::SideEffectObserver;
use std::sync::Mutex;

#[derive(Default)]
pub(crate) struct SideEffectRecorder {
    counts: Mutex<SideEffectCounts>,
}

impl SideEffectRecorder {
    pub(crate) fn counts(&self) -> SideEffectCounts {
        self.counts.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Log a header and the top keys for every category that saw effects
    pub(crate) fn report(&self, console: &Console) {
        let counts = self.counts();
        for kind in SideEffectKind::ALL {
            let top = counts.top(kind, SIDE_EFFECT_REPORT_LIMIT);
            if top.is_empty() {
                continue;
            }
            console.log(format!("{}!!", kind.title()));
            for (key, count) in top {
                console.log(format!("{} call: {}", count, key));
            }
        }
    }
}

impl SideEffectObserver for SideEffectRecorder {
    fn observe(&self, effect: &SideEffect) {
        self.counts
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .record(effect);
    }
}
