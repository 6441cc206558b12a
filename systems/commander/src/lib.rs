#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Ordered queue of asynchronous turn commands.
//!
//! Systems enqueue commands while the turn is in its planning phase. When the
//! turn resolves, the pending commands are detached into a [`DrainBatch`] and
//! executed one at a time against the [`Stage`], each command finishing before
//! the next one starts.

use std::{collections::VecDeque, fmt};

use futures::future::LocalBoxFuture;
use tactica_core::{CommandError, Diagnostics, Stage};

/// Deferred unit of work executed while a turn resolves.
///
/// The [`fmt::Display`] output is the stable tag used in diagnostics.
pub trait Command: fmt::Display {
    /// Runs the command to completion.
    fn execute<'a>(
        &'a mut self,
        stage: &'a mut dyn Stage,
    ) -> LocalBoxFuture<'a, Result<(), CommandError>>;

    /// Releases visuals owned by a command that will never execute.
    fn abandon(&mut self, stage: &mut dyn Stage) {
        let _ = stage;
    }
}

/// Outcome of a drain that ran every command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrainReport {
    executed: usize,
}

impl DrainReport {
    /// Number of commands that ran to completion.
    #[must_use]
    pub const fn executed(&self) -> usize {
        self.executed
    }
}

/// Failure of a drain, raised by the first command that returned an error.
#[derive(Debug, thiserror::Error)]
#[error("{command} failed after {executed} command(s) completed; {abandoned} abandoned")]
pub struct DrainError {
    command: String,
    executed: usize,
    abandoned: usize,
    source: CommandError,
}

impl DrainError {
    /// Diagnostic tag of the command that failed.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Number of commands that completed before the failure.
    #[must_use]
    pub const fn executed(&self) -> usize {
        self.executed
    }

    /// Number of commands discarded after the failure.
    #[must_use]
    pub const fn abandoned(&self) -> usize {
        self.abandoned
    }

    /// Error returned by the failing command.
    #[must_use]
    pub const fn error(&self) -> &CommandError {
        &self.source
    }
}

/// FIFO of pending turn commands.
pub struct CommandQueue {
    pending: VecDeque<Box<dyn Command>>,
    diagnostics: Diagnostics,
}

impl CommandQueue {
    /// Creates an empty queue that reports through `diagnostics`.
    #[must_use]
    pub fn new(diagnostics: Diagnostics) -> Self {
        Self {
            pending: VecDeque::new(),
            diagnostics,
        }
    }

    /// Appends a command to the tail of the queue.
    pub fn enqueue(&mut self, command: Box<dyn Command>) {
        let before = self.pending.len();
        self.diagnostics
            .emit(format_args!("Adding command {command}"));
        self.pending.push_back(command);
        self.diagnostics.emit(format_args!(
            "Queue length {before} -> {}",
            self.pending.len()
        ));
    }

    /// Number of pending commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Reports whether no command is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Diagnostic tags of the pending commands, head first.
    #[must_use]
    pub fn labels(&self) -> Vec<String> {
        self.pending.iter().map(ToString::to_string).collect()
    }

    /// Detaches every pending command into a batch, leaving the queue empty.
    ///
    /// Commands enqueued after this call stay in the queue for the next batch.
    #[must_use]
    pub fn take_batch(&mut self) -> DrainBatch {
        DrainBatch {
            commands: std::mem::take(&mut self.pending),
            diagnostics: self.diagnostics.clone(),
        }
    }

    /// Runs every pending command in order.
    pub async fn drain(&mut self, stage: &mut dyn Stage) -> Result<DrainReport, DrainError> {
        self.take_batch().run(stage).await
    }
}

impl fmt::Debug for CommandQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandQueue")
            .field("pending", &self.labels())
            .finish()
    }
}

/// Commands detached from a [`CommandQueue`] for one resolve pass.
#[must_use = "detached commands do nothing until the batch is run"]
pub struct DrainBatch {
    commands: VecDeque<Box<dyn Command>>,
    diagnostics: Diagnostics,
}

impl DrainBatch {
    /// Number of commands in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Reports whether the batch holds no command.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Executes the batch head first, awaiting each command before starting
    /// the next.
    ///
    /// The first failing command stops the batch. Every command after it is
    /// abandoned so that it can release its visuals.
    pub async fn run(mut self, stage: &mut dyn Stage) -> Result<DrainReport, DrainError> {
        if self.commands.is_empty() {
            self.diagnostics.emit(format_args!("No commands to run"));
            return Ok(DrainReport { executed: 0 });
        }

        self.diagnostics.emit(format_args!(
            "Starting to run {} commands",
            self.commands.len()
        ));

        let mut executed = 0;
        while let Some(mut command) = self.commands.pop_front() {
            log::debug!("running {command}");
            if let Err(source) = command.execute(stage).await {
                let abandoned = self.commands.len();
                for mut remaining in self.commands.drain(..) {
                    remaining.abandon(stage);
                }
                let error = DrainError {
                    command: command.to_string(),
                    executed,
                    abandoned,
                    source,
                };
                log::warn!("{error}");
                self.diagnostics.emit(format_args!("{error}"));
                return Err(error);
            }
            executed += 1;
        }

        self.diagnostics
            .emit(format_args!("Finished running commands"));
        Ok(DrainReport { executed })
    }
}

impl fmt::Debug for DrainBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<String> = self.commands.iter().map(ToString::to_string).collect();
        f.debug_struct("DrainBatch").field("commands", &labels).finish()
    }
}
