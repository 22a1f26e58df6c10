//! Bounded in-memory execution ledger.
//!
//! Executions are kept in submission order. Once the ledger holds `capacity`
//! entries, recording a new execution evicts the oldest one.

use crate::execution::{ExecutionId, ExecutionStatus, PluginExecution};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{PoisonError, RwLock};

/// Aggregate statistics over ledger entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStats {
    /// Executions considered.
    pub total: usize,
    /// Executions with status `completed`.
    pub completed: usize,
    /// Executions with status `failed`.
    pub failed: usize,
    /// Executions with status `timeout`.
    pub timed_out: usize,
    /// Mean duration of completed executions, in milliseconds.
    pub average_duration_ms: f64,
    /// `completed / total * 100`, or 0 for an empty set.
    pub success_rate: f64,
}

impl ExecutionStats {
    fn from_executions<'a>(executions: impl Iterator<Item = &'a PluginExecution>) -> Self {
        let mut total = 0;
        let mut completed = 0;
        let mut failed = 0;
        let mut timed_out = 0;
        let mut duration_sum = 0u128;
        let mut duration_count = 0u32;

        for execution in executions {
            total += 1;
            match execution.status {
                ExecutionStatus::Completed => {
                    completed += 1;
                    if let Some(ms) = execution.duration_ms {
                        duration_sum += u128::from(ms);
                        duration_count += 1;
                    }
                }
                ExecutionStatus::Failed => failed += 1,
                ExecutionStatus::Timeout => timed_out += 1,
                ExecutionStatus::Pending | ExecutionStatus::Running => {}
            }
        }

        let average_duration_ms = if duration_count == 0 {
            0.0
        } else {
            duration_sum as f64 / f64::from(duration_count)
        };
        let success_rate = if total == 0 {
            0.0
        } else {
            completed as f64 / total as f64 * 100.0
        };

        Self {
            total,
            completed,
            failed,
            timed_out,
            average_duration_ms,
            success_rate,
        }
    }
}

#[derive(Debug, Default)]
struct LedgerState {
    order: VecDeque<ExecutionId>,
    entries: HashMap<ExecutionId, PluginExecution>,
}

/// Ring-buffer store of recent executions.
#[derive(Debug)]
pub struct ExecutionLedger {
    capacity: usize,
    state: RwLock<LedgerState>,
}

impl ExecutionLedger {
    /// Creates a ledger holding at most `capacity` executions (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: RwLock::new(LedgerState::default()),
        }
    }

    /// Maximum number of retained executions.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Inserts or replaces an execution, evicting the oldest entries when full.
    pub fn record(&self, execution: PluginExecution) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let id = execution.id.clone();
        if state.entries.insert(id.clone(), execution).is_none() {
            state.order.push_back(id);
        }
        while state.order.len() > self.capacity {
            if let Some(evicted) = state.order.pop_front() {
                state.entries.remove(&evicted);
            }
        }
    }

    /// Looks up an execution.
    #[must_use]
    pub fn get(&self, id: &ExecutionId) -> Option<PluginExecution> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .get(id)
            .cloned()
    }

    /// Executions in submission order, optionally filtered by plugin name.
    ///
    /// Names are compared case-insensitively, like tool names in the registry.
    #[must_use]
    pub fn list(&self, plugin_name: Option<&str>) -> Vec<PluginExecution> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .order
            .iter()
            .filter_map(|id| state.entries.get(id))
            .filter(|e| matches_plugin(e, plugin_name))
            .cloned()
            .collect()
    }

    /// Aggregates statistics, optionally filtered by plugin name.
    #[must_use]
    pub fn stats(&self, plugin_name: Option<&str>) -> ExecutionStats {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        ExecutionStats::from_executions(
            state
                .entries
                .values()
                .filter(|e| matches_plugin(e, plugin_name)),
        )
    }

    /// Number of retained executions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .order
            .len()
    }

    /// Returns true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn matches_plugin(execution: &PluginExecution, plugin_name: Option<&str>) -> bool {
    plugin_name.is_none_or(|name| execution.plugin_name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentry_core::ErrorCode;
    use serde_json::json;
    use std::time::Duration;

    fn finished(plugin: &str, status: ExecutionStatus, ms: u64) -> PluginExecution {
        let mut execution = PluginExecution::new(plugin, "input", None);
        execution.begin_attempt();
        let elapsed = Duration::from_millis(ms);
        match status {
            ExecutionStatus::Completed => execution.complete(json!("ok"), elapsed),
            ExecutionStatus::Failed => execution.fail(ErrorCode::ApiError, "boom", elapsed),
            ExecutionStatus::Timeout => execution.time_out("slow", elapsed),
            ExecutionStatus::Pending | ExecutionStatus::Running => {}
        }
        execution
    }

    #[test]
    fn empty_ledger_has_zero_success_rate() {
        let stats = ExecutionLedger::new(10).stats(None);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.success_rate, 0.0);
        assert_eq!(stats.average_duration_ms, 0.0);
    }

    #[test]
    fn stats_average_only_completed_durations() {
        let ledger = ExecutionLedger::new(10);
        ledger.record(finished("gmail", ExecutionStatus::Completed, 100));
        ledger.record(finished("gmail", ExecutionStatus::Completed, 300));
        ledger.record(finished("gmail", ExecutionStatus::Failed, 5_000));
        ledger.record(finished("gmail", ExecutionStatus::Timeout, 30_000));
        ledger.record(finished("notion", ExecutionStatus::Completed, 50));

        let gmail = ledger.stats(Some("gmail"));
        assert_eq!(gmail.total, 4);
        assert_eq!(gmail.completed, 2);
        assert_eq!(gmail.failed, 1);
        assert_eq!(gmail.timed_out, 1);
        assert_eq!(gmail.average_duration_ms, 200.0);
        assert_eq!(gmail.success_rate, 50.0);
        assert!(gmail.completed + gmail.failed <= gmail.total);

        assert_eq!(ledger.stats(None).total, 5);
    }

    #[test]
    fn running_executions_count_toward_total_only() {
        let ledger = ExecutionLedger::new(10);
        let mut running = PluginExecution::new("gmail", "send", None);
        running.begin_attempt();
        ledger.record(running);

        let stats = ledger.stats(None);
        assert_eq!(stats.total, 1);
        assert_eq!(stats.completed + stats.failed + stats.timed_out, 0);
    }

    #[test]
    fn oldest_entries_are_evicted_at_capacity() {
        let ledger = ExecutionLedger::new(2);
        let first = finished("a", ExecutionStatus::Completed, 1);
        let first_id = first.id.clone();
        ledger.record(first);
        ledger.record(finished("b", ExecutionStatus::Completed, 1));
        ledger.record(finished("c", ExecutionStatus::Completed, 1));

        assert_eq!(ledger.len(), 2);
        assert!(ledger.get(&first_id).is_none());
        let names: Vec<String> = ledger.list(None).into_iter().map(|e| e.plugin_name).collect();
        assert_eq!(names, vec!["b", "c"]);
    }

    #[test]
    fn recording_same_id_updates_in_place() {
        let ledger = ExecutionLedger::new(5);
        let mut execution = PluginExecution::new("gmail", "send", None);
        ledger.record(execution.clone());
        execution.begin_attempt();
        execution.complete(json!({}), Duration::from_millis(7));
        ledger.record(execution.clone());

        assert_eq!(ledger.len(), 1);
        assert_eq!(
            ledger.get(&execution.id).map(|e| e.status),
            Some(ExecutionStatus::Completed)
        );
    }
}
