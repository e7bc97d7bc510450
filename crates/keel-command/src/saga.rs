//! Saga mechanics.
//!
//! A saga is an ordered list of steps, each paired with a compensation.
//! [`SagaExecutor`] runs the steps in order and, on the first failure,
//! runs the compensations of the completed steps in reverse:
//!
//! - a rejected step (business rule) changed nothing, so only the steps
//!   before it are compensated;
//! - a technical failure may have left partial effects, so the failing
//!   step is compensated too.
//!
//! Compensations are expected to check for presence themselves. A failing
//! compensation does not stop the others; each one is logged as an
//! operator alert and listed in the resulting error.

use std::fmt;

use tracing::{debug, error, warn};

use crate::command::ReplyStatus;
use crate::error::{CommandError, CommandResult};

pub trait Saga: Send + Sync {
    type Step: Copy + fmt::Display + Send + Sync;
    type State: Send;

    /// Name used in logs.
    fn name(&self) -> &'static str;

    fn steps(&self) -> Vec<Self::Step>;

    fn execute(
        &self,
        step: Self::Step,
        state: &mut Self::State,
    ) -> impl Future<Output = CommandResult<()>> + Send;

    fn compensate(
        &self,
        step: Self::Step,
        state: &mut Self::State,
    ) -> impl Future<Output = CommandResult<()>> + Send;
}

/// Runs a [`Saga`] to completion or compensates it.
pub struct SagaExecutor<'a, S: Saga> {
    saga: &'a S,
}

impl<'a, S: Saga> SagaExecutor<'a, S> {
    pub fn new(saga: &'a S) -> Self {
        Self { saga }
    }

    /// Run every step. On failure the saga is compensated before this
    /// returns; the error is the step's own error unless a compensation
    /// failed too, in which case it is [`CommandError::Aborted`].
    pub async fn run(&self, state: &mut S::State) -> CommandResult<()> {
        let mut completed: Vec<S::Step> = Vec::new();

        for step in self.saga.steps() {
            debug!(saga = self.saga.name(), %step, "executing step");
            match self.saga.execute(step, state).await {
                Ok(()) => completed.push(step),
                Err(err) => {
                    if err.status() == ReplyStatus::Error {
                        completed.push(step);
                    }
                    warn!(
                        saga = self.saga.name(),
                        %step,
                        error = %err,
                        compensating = completed.len(),
                        "step failed, compensating"
                    );
                    return Err(self.compensate(step, err, completed, state).await);
                }
            }
        }
        Ok(())
    }

    async fn compensate(
        &self,
        failed_step: S::Step,
        cause: CommandError,
        completed: Vec<S::Step>,
        state: &mut S::State,
    ) -> CommandError {
        let mut failures = Vec::new();
        for step in completed.into_iter().rev() {
            if let Err(err) = self.saga.compensate(step, state).await {
                error!(
                    saga = self.saga.name(),
                    %step,
                    error = %err,
                    operator_alert = true,
                    "compensation failed, manual cleanup required"
                );
                failures.push(format!("{step}: {err}"));
            }
        }

        if failures.is_empty() {
            cause
        } else {
            CommandError::Aborted {
                message: format!(
                    "{} failed at {failed_step}: {cause}; compensation failed for [{}]",
                    self.saga.name(),
                    failures.join(", ")
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_core::KeelError;
    use std::sync::Mutex;

    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    enum Step {
        A,
        B,
        C,
    }

    impl fmt::Display for Step {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{self:?}")
        }
    }

    #[derive(Clone, Copy)]
    enum Failure {
        Reject,
        Technical,
    }

    struct Scripted {
        fail_at: Option<(Step, Failure)>,
        broken_compensation: Option<Step>,
        log: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(fail_at: Option<(Step, Failure)>) -> Self {
            Self {
                fail_at,
                broken_compensation: None,
                log: Mutex::new(Vec::new()),
            }
        }

        fn log(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    impl Saga for Scripted {
        type Step = Step;
        type State = ();

        fn name(&self) -> &'static str {
            "scripted"
        }

        fn steps(&self) -> Vec<Step> {
            vec![Step::A, Step::B, Step::C]
        }

        async fn execute(&self, step: Step, _state: &mut ()) -> CommandResult<()> {
            self.log.lock().unwrap().push(format!("do {step}"));
            match self.fail_at {
                Some((at, Failure::Reject)) if at == step => Err(CommandError::rejected("no")),
                Some((at, Failure::Technical)) if at == step => {
                    Err(KeelError::Database("boom".into()).into())
                }
                _ => Ok(()),
            }
        }

        async fn compensate(&self, step: Step, _state: &mut ()) -> CommandResult<()> {
            self.log.lock().unwrap().push(format!("undo {step}"));
            if self.broken_compensation == Some(step) {
                return Err(KeelError::Database("undo failed".into()).into());
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn success_runs_every_step_and_no_compensation() {
        let saga = Scripted::new(None);
        SagaExecutor::new(&saga).run(&mut ()).await.unwrap();
        assert_eq!(saga.log(), vec!["do A", "do B", "do C"]);
    }

    #[tokio::test]
    async fn rejection_compensates_previous_steps_in_reverse() {
        let saga = Scripted::new(Some((Step::C, Failure::Reject)));
        let err = SagaExecutor::new(&saga).run(&mut ()).await.unwrap_err();
        assert_eq!(err.status(), ReplyStatus::Failed);
        assert_eq!(saga.log(), vec!["do A", "do B", "do C", "undo B", "undo A"]);
    }

    #[tokio::test]
    async fn technical_failure_also_compensates_failing_step() {
        let saga = Scripted::new(Some((Step::B, Failure::Technical)));
        let err = SagaExecutor::new(&saga).run(&mut ()).await.unwrap_err();
        assert_eq!(err.status(), ReplyStatus::Error);
        assert_eq!(saga.log(), vec!["do A", "do B", "undo B", "undo A"]);
    }

    #[tokio::test]
    async fn failed_compensation_keeps_going_and_escalates() {
        let mut saga = Scripted::new(Some((Step::C, Failure::Reject)));
        saga.broken_compensation = Some(Step::B);
        let err = SagaExecutor::new(&saga).run(&mut ()).await.unwrap_err();
        assert_eq!(saga.log(), vec!["do A", "do B", "do C", "undo B", "undo A"]);
        assert_eq!(err.status(), ReplyStatus::Error);
        assert!(err.to_string().contains("compensation failed for [B:"));
    }
}
