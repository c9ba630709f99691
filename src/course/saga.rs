use futures::future::BoxFuture;
use thiserror::Error;

use crate::integration::IntegrationError;

type StepResult = Result<(), IntegrationError>;
type StepFn = Box<dyn FnOnce() -> BoxFuture<'static, StepResult> + Send>;

/// A multi-system operation failed at the named step. Completed steps have
/// already been compensated (best effort) by the time this is returned.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct SagaError {
    message: String,
}

/// Controls when a step's undo action is eligible to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UndoScope {
    /// Run during unwinding even when this step itself failed partway.
    /// Creation steps use this: a half-created org still has to be removed.
    Always,
    /// Run during unwinding only once this step has fully succeeded.
    /// Removal steps use this: there is nothing to re-apply until the
    /// removal actually went through.
    Completed,
}

/// One compensable step of a multi-system operation: a forward action, the
/// error message reported when it fails, and an optional undo action.
pub struct Step {
    fail: String,
    forward: StepFn,
    undo: Option<(UndoScope, StepFn)>,
}

impl Step {
    pub fn new<F>(fail: impl Into<String>, forward: F) -> Self
    where
        F: FnOnce() -> BoxFuture<'static, StepResult> + Send + 'static,
    {
        Self {
            fail: fail.into(),
            forward: Box::new(forward),
            undo: None,
        }
    }

    /// Undo action that also covers partial work of this very step.
    #[must_use]
    pub fn undo<F>(mut self, undo: F) -> Self
    where
        F: FnOnce() -> BoxFuture<'static, StepResult> + Send + 'static,
    {
        self.undo = Some((UndoScope::Always, Box::new(undo)));
        self
    }

    /// Undo action that only makes sense after this step completed.
    #[must_use]
    pub fn undo_completed<F>(mut self, undo: F) -> Self
    where
        F: FnOnce() -> BoxFuture<'static, StepResult> + Send + 'static,
    {
        self.undo = Some((UndoScope::Completed, Box::new(undo)));
        self
    }
}

/// An ordered list of compensable steps, executed front to back. On the
/// first failure the completed prefix is unwound in reverse order (the
/// failed step's own undo first, when eligible), undo failures are logged
/// and swallowed, and the failed step's message is returned.
#[derive(Default)]
pub struct Saga {
    steps: Vec<Step>,
}

impl Saga {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn then(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub async fn run(self) -> Result<(), SagaError> {
        let mut completed: Vec<StepFn> = Vec::new();

        for step in self.steps {
            match (step.forward)().await {
                Ok(()) => {
                    if let Some((_, undo)) = step.undo {
                        completed.push(undo);
                    }
                }
                Err(err) => {
                    tracing::error!(error = %err, "{}", step.fail);

                    if let Some((UndoScope::Always, undo)) = step.undo {
                        Self::compensate(undo).await;
                    }
                    for undo in completed.into_iter().rev() {
                        Self::compensate(undo).await;
                    }

                    return Err(SagaError { message: step.fail });
                }
            }
        }

        Ok(())
    }

    async fn compensate(undo: StepFn) {
        if let Err(err) = undo().await {
            tracing::warn!(error = %err, "compensation failed");
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::{Arc, Mutex};

    use futures::FutureExt;

    use super::*;

    type Log = Arc<Mutex<Vec<&'static str>>>;

    fn ok_step(log: &Log, fail: &str, name: &'static str) -> Step {
        let log = Arc::clone(log);
        Step::new(fail, move || {
            async move {
                log.lock().unwrap().push(name);
                Ok(())
            }
            .boxed()
        })
    }

    fn failing_step(log: &Log, fail: &str, name: &'static str) -> Step {
        let log = Arc::clone(log);
        Step::new(fail, move || {
            async move {
                log.lock().unwrap().push(name);
                Err(IntegrationError::rejected("test", "boom"))
            }
            .boxed()
        })
    }

    fn record(log: &Log, name: &'static str) -> impl FnOnce() -> BoxFuture<'static, StepResult> + use<> {
        let log = Arc::clone(log);
        move || {
            async move {
                log.lock().unwrap().push(name);
                Ok(())
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn all_steps_run_in_order_on_success() {
        let log: Log = Arc::default();

        Saga::new()
            .then(ok_step(&log, "a failed", "a"))
            .then(ok_step(&log, "b failed", "b"))
            .run()
            .await
            .unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn failure_unwinds_completed_steps_in_reverse() {
        let log: Log = Arc::default();

        let err = Saga::new()
            .then(ok_step(&log, "a failed", "a").undo(record(&log, "undo a")))
            .then(ok_step(&log, "b failed", "b").undo(record(&log, "undo b")))
            .then(failing_step(&log, "c failed", "c").undo(record(&log, "undo c")))
            .run()
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "c failed");
        assert_eq!(
            *log.lock().unwrap(),
            vec!["a", "b", "c", "undo c", "undo b", "undo a"]
        );
    }

    #[tokio::test]
    async fn completed_scope_skips_the_failed_steps_own_undo() {
        let log: Log = Arc::default();

        let err = Saga::new()
            .then(ok_step(&log, "a failed", "a").undo_completed(record(&log, "undo a")))
            .then(failing_step(&log, "b failed", "b").undo_completed(record(&log, "undo b")))
            .run()
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "b failed");
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "undo a"]);
    }

    #[tokio::test]
    async fn steps_after_the_failure_never_run() {
        let log: Log = Arc::default();

        Saga::new()
            .then(failing_step(&log, "a failed", "a"))
            .then(ok_step(&log, "b failed", "b"))
            .run()
            .await
            .unwrap_err();

        assert_eq!(*log.lock().unwrap(), vec!["a"]);
    }
}
