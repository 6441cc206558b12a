#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Two-phase turn loop: players plan, then queued commands resolve.
//!
//! The machine owns the [`CommandQueue`]. Entering [`TurnState::Resolve`]
//! detaches the pending commands into a [`ResolvePass`]. Running the pass
//! yields a [`Resolved`] token, and only [`TurnStateMachine::finish_resolve`]
//! consuming that token takes the machine back to [`TurnState::Plan`]. Because
//! the pass owns its commands, the machine stays usable while the pass is in
//! flight: new commands wait for the next turn.

use std::fmt;

use tactica_core::{Diagnostics, Observers, Stage, SubscriptionId, TurnError, TurnState};
use tactica_system_commander::{CommandQueue, DrainBatch, DrainError, DrainReport};

/// Who may take a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// A player request, such as pressing End Turn.
    Player,
    /// Completion of the resolve pass.
    DrainComplete,
}

/// Every legal transition as `(from, to, trigger)`.
pub const TRANSITIONS: &[(TurnState, TurnState, Trigger)] = &[
    (TurnState::Plan, TurnState::Resolve, Trigger::Player),
    (TurnState::Resolve, TurnState::Plan, Trigger::DrainComplete),
];

/// Response to an End Turn press.
#[must_use = "the turn stays in the resolve phase until its pass is run and finished"]
#[derive(Debug)]
pub enum EndTurn {
    /// The turn started resolving; run the pass, then hand the result to
    /// [`TurnStateMachine::finish_resolve`].
    Resolve(ResolvePass),
    /// A resolve pass is already in flight; the press was ignored.
    StillResolving,
}

/// Failure of a full [`TurnStateMachine::advance`] cycle.
#[derive(Debug, thiserror::Error)]
pub enum AdvanceError {
    /// The machine refused to enter or leave the resolve phase.
    #[error(transparent)]
    Turn(#[from] TurnError),
    /// A command failed while the turn resolved.
    #[error(transparent)]
    Drain(#[from] DrainError),
}

/// Commands detached for one resolve phase.
#[must_use = "the turn stays in the resolve phase until the pass is run and finished"]
#[derive(Debug)]
pub struct ResolvePass {
    batch: DrainBatch,
}

impl ResolvePass {
    /// Number of commands the pass will run.
    #[must_use]
    pub fn len(&self) -> usize {
        self.batch.len()
    }

    /// Reports whether the pass has nothing to run.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.batch.is_empty()
    }

    /// Runs every command of the pass in order.
    pub async fn run(self, stage: &mut dyn Stage) -> Resolved {
        Resolved {
            outcome: self.batch.run(stage).await,
        }
    }
}

/// Outcome of a [`ResolvePass`] that ran to the end.
///
/// It can only be obtained from [`ResolvePass::run`], so the machine cannot
/// leave the resolve phase for a pass that never ran.
#[must_use = "the turn stays in the resolve phase until this is passed to `finish_resolve`"]
#[derive(Debug)]
pub struct Resolved {
    outcome: Result<DrainReport, DrainError>,
}

impl Resolved {
    /// Reports whether every command of the pass completed.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Validated Plan/Resolve state machine that owns the command queue.
pub struct TurnStateMachine {
    state: TurnState,
    queue: CommandQueue,
    observers: Observers<TurnState>,
    diagnostics: Diagnostics,
}

impl TurnStateMachine {
    /// Creates a machine in [`TurnState::Plan`] with an empty queue.
    #[must_use]
    pub fn new(diagnostics: Diagnostics) -> Self {
        Self {
            state: TurnState::Plan,
            queue: CommandQueue::new(diagnostics.clone()),
            observers: Observers::new(),
            diagnostics,
        }
    }

    /// Phase that is currently active.
    #[must_use]
    pub const fn state(&self) -> TurnState {
        self.state
    }

    /// Commands waiting for the next resolve phase.
    #[must_use]
    pub const fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    /// Mutable access used by systems that enqueue commands.
    pub fn queue_mut(&mut self) -> &mut CommandQueue {
        &mut self.queue
    }

    /// Registers a callback invoked with every state the machine enters.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&TurnState) + 'static,
    {
        self.observers.subscribe(callback)
    }

    /// Removes a callback registered with [`Self::subscribe`].
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Takes a player-triggered transition to `target`.
    ///
    /// Observers learn about the new state before the pending commands are
    /// detached, so reactions such as clearing the selection happen before
    /// anything moves. On error the state is left untouched.
    pub fn request_transition(&mut self, target: TurnState) -> Result<ResolvePass, TurnError> {
        self.check(target, Trigger::Player)?;
        self.enter(target);
        Ok(ResolvePass {
            batch: self.queue.take_batch(),
        })
    }

    /// Leaves the resolve phase once its pass has run and returns the outcome
    /// of that pass.
    ///
    /// The machine returns to [`TurnState::Plan`] even when a command failed;
    /// the failure is then reported as [`AdvanceError::Drain`].
    pub fn finish_resolve(&mut self, resolved: Resolved) -> Result<DrainReport, AdvanceError> {
        self.check(TurnState::Plan, Trigger::DrainComplete)?;
        self.enter(TurnState::Plan);
        Ok(resolved.outcome?)
    }

    /// Handles an End Turn press.
    ///
    /// Pressing End Turn while a pass is in flight is not an error; the press
    /// is reported and ignored.
    pub fn end_turn(&mut self) -> EndTurn {
        match self.request_transition(TurnState::Resolve) {
            Ok(pass) => EndTurn::Resolve(pass),
            Err(error) => {
                log::debug!("end turn ignored: {error}");
                self.diagnostics.emit(format_args!("Still resolving..."));
                EndTurn::StillResolving
            }
        }
    }

    /// Runs a whole turn: enters the resolve phase, runs the pass and returns
    /// to planning. The machine is back in [`TurnState::Plan`] even when a
    /// command fails.
    pub async fn advance(&mut self, stage: &mut dyn Stage) -> Result<DrainReport, AdvanceError> {
        let pass = self.request_transition(TurnState::Resolve)?;
        let resolved = pass.run(stage).await;
        self.finish_resolve(resolved)
    }

    fn check(&self, target: TurnState, trigger: Trigger) -> Result<(), TurnError> {
        if target == self.state {
            return Err(TurnError::AlreadyInState { state: self.state });
        }

        let legal = TRANSITIONS
            .iter()
            .any(|&(from, to, by)| from == self.state && to == target && by == trigger);
        if legal {
            Ok(())
        } else {
            Err(TurnError::IllegalTransition {
                from: self.state,
                to: target,
            })
        }
    }

    fn enter(&mut self, target: TurnState) {
        log::info!("turn state {} -> {target}", self.state);
        self.state = target;
        self.diagnostics.emit(format_args!("Entering {target}"));
        self.observers.notify(&target);
    }
}

impl fmt::Debug for TurnStateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TurnStateMachine")
            .field("state", &self.state)
            .field("queue", &self.queue)
            .field("observers", &self.observers)
            .finish()
    }
}
