use std::future::Future;

use futures::future::BoxFuture;
use tracing::warn;

use crate::error::UpstreamError;

/// Primary-call classification. `AlreadyExists` is the duplicate-as-success
/// remap: the provider refused the write because the resource is already on
/// file, which callers treat as a successful, idempotent submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created,
    AlreadyExists,
}

impl Outcome {
    pub fn already_exists(self) -> bool {
        matches!(self, Outcome::AlreadyExists)
    }
}

type StepFn<'a, T> = Box<dyn FnOnce(T) -> BoxFuture<'a, Result<(), UpstreamError>> + Send + 'a>;

struct Step<'a, T> {
    name: &'static str,
    run: StepFn<'a, T>,
}

/// Ordered chain of one required primary call and any number of best-effort
/// secondaries.
///
/// The primary decides the handler's own outcome: its error aborts the whole
/// chain before any secondary runs. Secondaries then run in declared order,
/// each receiving the primary's value; a secondary failure is logged and
/// swallowed. It never changes the returned value and never stops the steps
/// after it.
pub struct Pipeline<'a, T> {
    label: &'static str,
    secondaries: Vec<Step<'a, T>>,
}

impl<'a, T: Clone> Pipeline<'a, T> {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            secondaries: Vec::new(),
        }
    }

    /// Append a best-effort step. The closure receives a clone of the
    /// primary's value once the primary has succeeded.
    pub fn best_effort<F, Fut>(mut self, name: &'static str, step: F) -> Self
    where
        F: FnOnce(T) -> Fut + Send + 'a,
        Fut: Future<Output = Result<(), UpstreamError>> + Send + 'a,
    {
        self.secondaries.push(Step {
            name,
            run: Box::new(move |value| Box::pin(step(value))),
        });
        self
    }

    /// Run the primary, then every secondary in order.
    pub async fn run<P>(self, primary: P) -> Result<T, UpstreamError>
    where
        P: Future<Output = Result<T, UpstreamError>>,
    {
        let value = match primary.await {
            Ok(value) => value,
            Err(err) => {
                warn!(pipeline = self.label, error = %err, "primary call failed, aborting");
                return Err(err);
            }
        };

        for step in self.secondaries {
            if let Err(err) = (step.run)(value.clone()).await {
                warn!(
                    pipeline = self.label,
                    step = step.name,
                    error = %err,
                    "best-effort step failed"
                );
            }
        }

        Ok(value)
    }
}

/// Swallow-and-log wrapper for best-effort calls issued outside a
/// [`Pipeline`], e.g. steps whose count is only known after the primary call.
/// Returns whether the call succeeded.
pub async fn best_effort<F>(step: &'static str, fut: F) -> bool
where
    F: Future<Output = Result<(), UpstreamError>>,
{
    match fut.await {
        Ok(()) => true,
        Err(err) => {
            warn!(step, error = %err, "best-effort step failed");
            false
        }
    }
}
