//! Per-operation outcome counters for replay and host reporting.

use serde::Serialize;
use std::collections::BTreeMap;

/// Committed and rolled-back counts for one operation name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCount {
    pub committed: u64,
    pub rolled_back: u64,
}

/// Outcome counters keyed by operation name, reported in name order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OpStats {
    counters: BTreeMap<&'static str, OutcomeCount>,
}

impl OpStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, op: &'static str, committed: bool) {
        let entry = self.counters.entry(op).or_default();
        if committed {
            entry.committed += 1;
        } else {
            entry.rolled_back += 1;
        }
    }

    pub fn get(&self, op: &str) -> OutcomeCount {
        self.counters.get(op).copied().unwrap_or_default()
    }

    pub fn total(&self) -> OutcomeCount {
        self.counters
            .values()
            .fold(OutcomeCount::default(), |acc, c| OutcomeCount {
                committed: acc.committed + c.committed,
                rolled_back: acc.rolled_back + c.rolled_back,
            })
    }

    pub fn snapshot(&self) -> BTreeMap<&'static str, OutcomeCount> {
        self.counters.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_per_operation() {
        let mut stats = OpStats::new();
        stats.record("cast_vote", true);
        stats.record("cast_vote", false);
        stats.record("finalize", true);

        assert_eq!(
            stats.get("cast_vote"),
            OutcomeCount {
                committed: 1,
                rolled_back: 1,
            }
        );
        assert_eq!(stats.get("execute"), OutcomeCount::default());
        assert_eq!(stats.total().committed, 2);
        assert_eq!(stats.snapshot().len(), 2);
    }
}
