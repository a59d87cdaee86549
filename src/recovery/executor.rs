use std::collections::HashMap;
use std::path::Path;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, info};

use super::commands::{CommandTarget, generate_commands, manual_notes};
use super::types::{ExecutionOutcome, PhaseStatus, StrategyExecution};
use crate::config::ExecutorConfig;
use crate::strategy::{ActionKind, RetryStrategy};

#[derive(Debug, Default)]
struct ExecutionRegistry {
    records: HashMap<String, StrategyExecution>,
    order: Vec<String>,
}

/// Generates commands for a chosen strategy and tracks the execution
/// lifecycle. Commands are never run here; the host reports outcomes back
/// through `update_execution_status`.
#[derive(Debug, Default)]
pub struct StrategyExecutor {
    config: ExecutorConfig,
    registry: Mutex<ExecutionRegistry>,
}

impl StrategyExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self {
            config,
            registry: Mutex::new(ExecutionRegistry::default()),
        }
    }

    pub fn execute_strategy(
        &self,
        strategy: &RetryStrategy,
        issue_number: u32,
        phase_number: u32,
        workdir: impl AsRef<Path>,
    ) -> StrategyExecution {
        let target = CommandTarget {
            issue_number,
            phase_number,
            workdir: workdir.as_ref(),
            config: &self.config,
        };
        let commands = generate_commands(strategy, target);
        let notes = (strategy.action == ActionKind::Manual)
            .then(|| manual_notes(strategy, issue_number, phase_number));

        let execution = StrategyExecution {
            id: format!("exec-{}", uuid::Uuid::new_v4()),
            strategy_id: strategy.id.clone(),
            issue_number,
            phase_number,
            started_at: Utc::now(),
            completed_at: None,
            outcome: ExecutionOutcome::Pending,
            result_phase_status: None,
            notes,
            commands,
        };

        info!(
            execution_id = %execution.id,
            strategy_id = %strategy.id,
            action = %strategy.action,
            issue_number,
            phase_number,
            commands = execution.commands.len(),
            "Strategy execution created"
        );

        let mut registry = self.registry.lock();
        registry.order.push(execution.id.clone());
        registry
            .records
            .insert(execution.id.clone(), execution.clone());

        execution
    }

    pub fn get_execution_status(&self, execution_id: &str) -> Option<StrategyExecution> {
        self.registry.lock().records.get(execution_id).cloned()
    }

    /// Cancel a pending execution. Returns false for unknown ids and for
    /// executions that already reached a terminal outcome.
    pub fn cancel_execution(&self, execution_id: &str) -> bool {
        let mut registry = self.registry.lock();
        let Some(execution) = registry.records.get_mut(execution_id) else {
            debug!(execution_id, "Cancel requested for unknown execution");
            return false;
        };

        if execution.outcome != ExecutionOutcome::Pending {
            debug!(
                execution_id,
                outcome = %execution.outcome,
                "Cancel ignored, execution already terminal"
            );
            return false;
        }

        execution.set_outcome(ExecutionOutcome::Cancelled);
        info!(execution_id, "Strategy execution cancelled");
        true
    }

    /// Overwrite the outcome reported by the host. Returns false only for
    /// unknown ids.
    pub fn update_execution_status(
        &self,
        execution_id: &str,
        outcome: ExecutionOutcome,
        result_phase_status: Option<PhaseStatus>,
        notes: Option<String>,
    ) -> bool {
        let mut registry = self.registry.lock();
        let Some(execution) = registry.records.get_mut(execution_id) else {
            debug!(execution_id, "Status update for unknown execution");
            return false;
        };

        execution.set_outcome(outcome);
        execution.result_phase_status = result_phase_status;
        if notes.is_some() {
            execution.notes = notes;
        }

        info!(
            execution_id,
            outcome = %outcome,
            phase_status = ?result_phase_status,
            "Strategy execution updated"
        );
        true
    }

    /// All executions for an issue, in creation order.
    pub fn get_execution_history(&self, issue_number: u32) -> Vec<StrategyExecution> {
        let registry = self.registry.lock();
        registry
            .order
            .iter()
            .filter_map(|id| registry.records.get(id))
            .filter(|e| e.issue_number == issue_number)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{StrategyCatalog, ids};

    fn executor() -> StrategyExecutor {
        StrategyExecutor::new(ExecutorConfig::default())
    }

    fn builtin(id: &str) -> RetryStrategy {
        StrategyCatalog::new().get(id).cloned().unwrap()
    }

    #[test]
    fn test_execute_creates_pending_record() {
        let executor = executor();
        let execution = executor.execute_strategy(&builtin(ids::SIMPLE_REDO), 5, 2, "/repo");

        assert!(execution.id.starts_with("exec-"));
        assert_eq!(execution.outcome, ExecutionOutcome::Pending);
        assert!(execution.completed_at.is_none());
        assert_eq!(execution.commands.len(), 1);

        let stored = executor.get_execution_status(&execution.id).unwrap();
        assert_eq!(stored.strategy_id, ids::SIMPLE_REDO);
    }

    #[test]
    fn test_rollback_commands_carry_issue_and_phase() {
        let executor = executor();
        let execution = executor.execute_strategy(&builtin(ids::ROLLBACK_AND_REDO), 17, 4, "/repo");

        assert_eq!(execution.commands.len(), 2);
        assert_eq!(execution.commands[0].sequence, 1);
        assert!(execution.commands[0].command.contains("rollback"));
        assert_eq!(execution.commands[1].sequence, 2);
        assert!(execution.commands[1].command.contains("execute"));
        for command in &execution.commands {
            assert!(command.command.contains("17"));
            assert!(command.command.contains('4'));
        }
    }

    #[test]
    fn test_manual_strategy_gets_notes() {
        let executor = executor();
        let strategy = RetryStrategy::new("ask", "Ask", "Ask a maintainer", ActionKind::Manual, 0.5)
            .with_hints(vec!["Error line: 9".into()]);
        let execution = executor.execute_strategy(&strategy, 1, 1, "/repo");

        assert!(execution.commands.is_empty());
        assert!(execution.notes.unwrap().contains("Error line: 9"));
    }

    #[test]
    fn test_cancel_only_once() {
        let executor = executor();
        let execution = executor.execute_strategy(&builtin(ids::SIMPLE_REDO), 1, 1, "/repo");

        assert!(executor.cancel_execution(&execution.id));
        assert!(!executor.cancel_execution(&execution.id));

        let stored = executor.get_execution_status(&execution.id).unwrap();
        assert_eq!(stored.outcome, ExecutionOutcome::Cancelled);
        assert!(stored.completed_at.is_some());
    }

    #[test]
    fn test_cancel_unknown_and_terminal() {
        let executor = executor();
        assert!(!executor.cancel_execution("exec-missing"));

        let execution = executor.execute_strategy(&builtin(ids::SIMPLE_REDO), 1, 1, "/repo");
        assert!(executor.update_execution_status(
            &execution.id,
            ExecutionOutcome::Success,
            Some(PhaseStatus::Completed),
            None,
        ));
        assert!(!executor.cancel_execution(&execution.id));
        assert_eq!(
            executor.get_execution_status(&execution.id).unwrap().outcome,
            ExecutionOutcome::Success
        );
    }

    #[test]
    fn test_update_overwrites_and_tracks_completion() {
        let executor = executor();
        let execution = executor.execute_strategy(&builtin(ids::SIMPLE_REDO), 1, 1, "/repo");

        assert!(executor.update_execution_status(
            &execution.id,
            ExecutionOutcome::Failure,
            Some(PhaseStatus::Failed),
            Some("tests still red".into()),
        ));
        let stored = executor.get_execution_status(&execution.id).unwrap();
        assert_eq!(stored.outcome, ExecutionOutcome::Failure);
        assert_eq!(stored.result_phase_status, Some(PhaseStatus::Failed));
        assert_eq!(stored.notes.as_deref(), Some("tests still red"));
        assert!(stored.completed_at.is_some());

        assert!(executor.update_execution_status(
            &execution.id,
            ExecutionOutcome::Success,
            Some(PhaseStatus::Completed),
            None,
        ));
        let stored = executor.get_execution_status(&execution.id).unwrap();
        assert_eq!(stored.outcome, ExecutionOutcome::Success);
        assert_eq!(stored.notes.as_deref(), Some("tests still red"));

        assert!(!executor.update_execution_status(
            "exec-missing",
            ExecutionOutcome::Success,
            None,
            None,
        ));
    }

    #[test]
    fn test_update_after_terminal_still_overwrites() {
        let executor = executor();
        let execution = executor.execute_strategy(&builtin(ids::SIMPLE_REDO), 1, 1, "/repo");
        assert!(executor.cancel_execution(&execution.id));

        // Host reports are authoritative even after cancellation
        assert!(executor.update_execution_status(
            &execution.id,
            ExecutionOutcome::Success,
            Some(PhaseStatus::Completed),
            None,
        ));
        assert!(executor.update_execution_status(
            &execution.id,
            ExecutionOutcome::Success,
            Some(PhaseStatus::Completed),
            None,
        ));

        let stored = executor.get_execution_status(&execution.id).unwrap();
        assert_eq!(stored.outcome, ExecutionOutcome::Success);
        assert_eq!(stored.result_phase_status, Some(PhaseStatus::Completed));
        assert!(stored.completed_at.is_some());

        assert!(executor.update_execution_status(
            &execution.id,
            ExecutionOutcome::Pending,
            None,
            None,
        ));
        assert!(executor.get_execution_status(&execution.id).unwrap().completed_at.is_none());
    }

    #[test]
    fn test_history_in_insertion_order() {
        let executor = executor();
        let first = executor.execute_strategy(&builtin(ids::SIMPLE_REDO), 9, 1, "/repo");
        let _other = executor.execute_strategy(&builtin(ids::SKIP_PHASE), 10, 1, "/repo");
        let second = executor.execute_strategy(&builtin(ids::SKIP_PHASE), 9, 2, "/repo");

        let history = executor.get_execution_history(9);
        let ids: Vec<_> = history.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec![first.id.as_str(), second.id.as_str()]);
        assert!(executor.get_execution_history(99).is_empty());
    }

    #[test]
    fn test_executor_is_shareable_across_threads() {
        let executor = std::sync::Arc::new(executor());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let executor = executor.clone();
                std::thread::spawn(move || {
                    executor.execute_strategy(&builtin(ids::SIMPLE_REDO), 1, i, "/repo")
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(executor.get_execution_history(1).len(), 4);
    }
}
