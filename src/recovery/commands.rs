//! Command generation, one pure function per action kind.

use std::path::Path;

use super::types::GeneratedCommand;
use crate::config::ExecutorConfig;
use crate::strategy::{ActionKind, RetryStrategy, ids};

/// Inputs shared by every generator.
#[derive(Debug, Clone, Copy)]
pub struct CommandTarget<'a> {
    pub issue_number: u32,
    pub phase_number: u32,
    pub workdir: &'a Path,
    pub config: &'a ExecutorConfig,
}

impl CommandTarget<'_> {
    fn execute(&self, context: Option<&str>) -> String {
        let base = format!(
            "{}execute {} --phase {}",
            self.config.command_prefix, self.issue_number, self.phase_number
        );
        match context {
            Some(ctx) => format!("{} --context \"{}\"", base, escape_quotes(ctx)),
            None => base,
        }
    }

    fn label(&self) -> String {
        format!("issue #{} phase {}", self.issue_number, self.phase_number)
    }
}

pub fn generate_commands(strategy: &RetryStrategy, target: CommandTarget<'_>) -> Vec<GeneratedCommand> {
    match strategy.action {
        ActionKind::Redo => redo_commands(target),
        ActionKind::RedoWithContext => redo_with_context_commands(strategy, target),
        ActionKind::Skip => skip_commands(target),
        ActionKind::RollbackAndRedo => rollback_and_redo_commands(strategy, target),
        ActionKind::Manual => Vec::new(),
    }
}

fn sequenced(commands: Vec<(String, String)>) -> Vec<GeneratedCommand> {
    commands
        .into_iter()
        .zip(1u32..)
        .map(|((command, description), sequence)| GeneratedCommand {
            command,
            sequence,
            description,
        })
        .collect()
}

fn joined_hints(strategy: &RetryStrategy) -> Option<String> {
    if strategy.context_hints.is_empty() {
        None
    } else {
        Some(strategy.context_hints.join("; "))
    }
}

fn escape_quotes(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

fn redo_commands(target: CommandTarget<'_>) -> Vec<GeneratedCommand> {
    sequenced(vec![(
        target.execute(None),
        format!("Re-run {}", target.label()),
    )])
}

fn redo_with_context_commands(
    strategy: &RetryStrategy,
    target: CommandTarget<'_>,
) -> Vec<GeneratedCommand> {
    let context = joined_hints(strategy).unwrap_or_else(|| strategy.description.clone());
    let redo = (
        target.execute(Some(&context)),
        format!("Re-run {} with error context", target.label()),
    );

    if strategy.id == ids::INSTALL_DEPENDENCIES {
        let install = (
            format!(
                "cd \"{}\" && {}  # issue #{} phase {}",
                target.workdir.display(),
                target.config.install_command,
                target.issue_number,
                target.phase_number
            ),
            format!("Install project dependencies for {}", target.label()),
        );
        return sequenced(vec![install, redo]);
    }

    sequenced(vec![redo])
}

fn skip_commands(target: CommandTarget<'_>) -> Vec<GeneratedCommand> {
    sequenced(vec![(
        format!(
            "{}skip-phase {} --phase {}",
            target.config.command_prefix, target.issue_number, target.phase_number
        ),
        format!("Skip {}", target.label()),
    )])
}

fn rollback_and_redo_commands(
    strategy: &RetryStrategy,
    target: CommandTarget<'_>,
) -> Vec<GeneratedCommand> {
    let context = joined_hints(strategy);
    sequenced(vec![
        (
            format!(
                "{}rollback {} --phase {}",
                target.config.command_prefix, target.issue_number, target.phase_number
            ),
            format!("Roll back changes made by {}", target.label()),
        ),
        (
            target.execute(context.as_deref()),
            format!("Re-run {} from a clean state", target.label()),
        ),
    ])
}

/// Advisory notes for strategies that produce no commands.
pub fn manual_notes(strategy: &RetryStrategy, issue_number: u32, phase_number: u32) -> String {
    let mut notes = format!(
        "Manual intervention required for issue #{} phase {}: {}",
        issue_number, phase_number, strategy.description
    );
    for hint in &strategy.context_hints {
        notes.push_str("\n- ");
        notes.push_str(hint);
    }
    notes
}
