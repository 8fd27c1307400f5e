use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    Validating,
    Computing,
    Persisting,
    Done,
    Failed,
}

impl RunPhase {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::Computing => "computing",
            Self::Persisting => "persisting",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    pub const fn can_advance_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Idle, Self::Validating)
            | (Self::Validating, Self::Computing)
            | (Self::Computing, Self::Persisting)
            | (Self::Persisting, Self::Done) => true,
            (from, Self::Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal run transition {from} -> {to}")]
pub struct TransitionError {
    pub from: RunPhase,
    pub to: RunPhase,
}

/// Request-scoped lifecycle of one compute-and-persist run.
#[derive(Debug, Clone, Serialize)]
pub struct ComputationRun {
    run_id: String,
    phase: RunPhase,
    history: Vec<RunPhase>,
    failure: Option<String>,
}

impl ComputationRun {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            phase: RunPhase::Idle,
            history: vec![RunPhase::Idle],
            failure: None,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub const fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn history(&self) -> &[RunPhase] {
        &self.history
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn advance(&mut self, next: RunPhase) -> Result<(), TransitionError> {
        if !self.phase.can_advance_to(next) {
            return Err(TransitionError {
                from: self.phase,
                to: next,
            });
        }
        info!(
            run_id = self.run_id.as_str(),
            from = self.phase.as_str(),
            to = next.as_str(),
            "run phase"
        );
        self.phase = next;
        self.history.push(next);
        Ok(())
    }

    /// Moves to `Failed`, keeping the reason. Ignored once the run is terminal.
    pub fn fail(&mut self, reason: impl Into<String>) {
        if self.advance(RunPhase::Failed).is_ok() {
            self.failure = Some(reason.into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_reaches_done() {
        let mut run = ComputationRun::new("run-1");
        for phase in [
            RunPhase::Validating,
            RunPhase::Computing,
            RunPhase::Persisting,
            RunPhase::Done,
        ] {
            run.advance(phase).expect("legal transition");
        }
        assert_eq!(run.phase(), RunPhase::Done);
        assert_eq!(run.history().len(), 5);
    }

    #[test]
    fn cannot_skip_phases() {
        let mut run = ComputationRun::new("run-2");
        let err = run.advance(RunPhase::Persisting).expect_err("skip");
        assert_eq!(err.from, RunPhase::Idle);
        assert_eq!(run.phase(), RunPhase::Idle);
    }

    #[test]
    fn failure_is_terminal() {
        let mut run = ComputationRun::new("run-3");
        run.advance(RunPhase::Validating).expect("validate");
        run.fail("incomplete data");
        run.fail("ignored");
        assert_eq!(run.phase(), RunPhase::Failed);
        assert_eq!(run.failure(), Some("incomplete data"));
        assert!(run.advance(RunPhase::Computing).is_err());
    }
}
