use std::any::Any;
use std::cell::Cell;
use std::fmt::Display;
use std::panic::{self, AssertUnwindSafe};

use drawguard_common::RenderKind;
use drawguard_config::GuardPolicy;
use drawguard_render::{GraphicsContext, RenderError};

use crate::notifier::{LogMessageSink, RateLimitedNotifier};
use crate::snapshot::{GraphicsStateSnapshot, RestoreReport};

/// How a guarded render call ended, when it did not propagate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The call returned normally.
    Rendered,
    /// The call failed and the failure was swallowed; the object is not drawn.
    Suppressed,
    /// Swallowed, and graphics state was restored to its state on entry.
    Recovered(RestoreReport),
}

impl RenderOutcome {
    pub fn is_rendered(&self) -> bool {
        matches!(self, Self::Rendered)
    }
}

/// What the guard did with a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Propagated,
    Suppressed,
    Recovered,
}

impl Display for Disposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Propagated => f.write_str("propagated"),
            Self::Suppressed => f.write_str("suppressed"),
            Self::Recovered => f.write_str("recovered"),
        }
    }
}

/// Operator-facing record of one failed render call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReport {
    pub kind: RenderKind,
    pub target: String,
    pub cause: String,
    /// The render call panicked instead of returning an error.
    pub panicked: bool,
    pub disposition: Disposition,
}

/// Receives exactly one report per failed render call.
pub trait FailureReporter {
    fn report(&self, report: &FailureReport);
}

/// Reports failures as `error` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl FailureReporter for TracingReporter {
    fn report(&self, report: &FailureReport) {
        tracing::error!(
            kind = %report.kind,
            object = %report.target,
            panicked = report.panicked,
            disposition = %report.disposition,
            "render call failed: {}",
            report.cause
        );
    }
}

impl<R: FailureReporter + ?Sized> FailureReporter for std::rc::Rc<R> {
    fn report(&self, report: &FailureReport) {
        (**self).report(report)
    }
}

/// Running totals of guarded calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GuardStats {
    pub rendered: u64,
    pub suppressed: u64,
    pub recovered: u64,
    pub propagated: u64,
}

enum Failure {
    Error(RenderError),
    Panic(Box<dyn Any + Send>),
}

impl Failure {
    fn cause(&self) -> String {
        match self {
            Self::Error(e) => e.to_string(),
            Self::Panic(payload) => panic_message(&**payload).to_string(),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}

/// Wraps single render calls, isolating their failures to the object being drawn.
///
/// Lives on the render thread: the policy, the notification window and the
/// counters sit in `Cell`s, so the guard is neither `Send` nor `Sync`.
pub struct RenderGuard {
    policy: Cell<GuardPolicy>,
    notifier: RateLimitedNotifier,
    reporter: Box<dyn FailureReporter>,
    stats: Cell<GuardStats>,
}

impl RenderGuard {
    /// Guard reporting to the log and notifying through the log.
    pub fn new(policy: GuardPolicy) -> Self {
        Self::with_parts(
            policy,
            RateLimitedNotifier::new(Box::new(LogMessageSink)),
            Box::new(TracingReporter),
        )
    }

    pub fn with_parts(
        policy: GuardPolicy,
        notifier: RateLimitedNotifier,
        reporter: Box<dyn FailureReporter>,
    ) -> Self {
        Self {
            policy: Cell::new(policy),
            notifier,
            reporter,
            stats: Cell::new(GuardStats::default()),
        }
    }

    pub fn policy(&self) -> GuardPolicy {
        self.policy.get()
    }

    /// Install a reloaded policy. Call between frames.
    pub fn replace_policy(&self, policy: GuardPolicy) {
        tracing::debug!(%policy, "render guard policy replaced");
        self.policy.set(policy);
    }

    pub fn stats(&self) -> GuardStats {
        self.stats.get()
    }

    pub fn notifier(&self) -> &RateLimitedNotifier {
        &self.notifier
    }

    /// Run one render call under the guard.
    ///
    /// A failure the policy does not catch for `kind` comes back unchanged:
    /// returned errors as `Err`, panics by resuming the unwind. A caught
    /// failure yields `Suppressed`, or `Recovered` when recovery is enabled
    /// and `kind` is `Item`. Every failure reaches the [`FailureReporter`]
    /// exactly once.
    ///
    /// The process panic hook runs before the unwind reaches this call, so a
    /// caught panic is also printed by whatever hook is installed (stderr for
    /// the default hook), once per panic and without the notifier's cooldown.
    /// Hosts that want the reporter to be the only record must install their
    /// own hook with [`std::panic::set_hook`].
    pub fn guard<F>(
        &self,
        kind: RenderKind,
        target: &dyn Display,
        gfx: &mut GraphicsContext,
        render: F,
    ) -> Result<RenderOutcome, RenderError>
    where
        F: FnOnce(&mut GraphicsContext) -> Result<(), RenderError>,
    {
        let snapshot = GraphicsStateSnapshot::capture(gfx);

        let failure = match panic::catch_unwind(AssertUnwindSafe(|| render(&mut *gfx))) {
            Ok(Ok(())) => {
                self.bump(|s| s.rendered += 1);
                return Ok(RenderOutcome::Rendered);
            }
            Ok(Err(e)) => Failure::Error(e),
            Err(payload) => Failure::Panic(payload),
        };

        let policy = self.policy.get();
        if !policy.catches(kind) {
            self.report(kind, target, &failure, Disposition::Propagated);
            self.bump(|s| s.propagated += 1);
            return match failure {
                Failure::Error(e) => Err(e),
                Failure::Panic(payload) => panic::resume_unwind(payload),
            };
        }

        let outcome = if policy.attempt_recovery && kind == RenderKind::Item {
            let restored = snapshot.restore(gfx);
            if !restored.is_clean() {
                tracing::warn!(
                    popped = restored.popped,
                    ended_build = restored.ended_build,
                    "recovered graphics state after failed {kind} render"
                );
            }
            self.report(kind, target, &failure, Disposition::Recovered);
            self.bump(|s| s.recovered += 1);
            RenderOutcome::Recovered(restored)
        } else {
            self.report(kind, target, &failure, Disposition::Suppressed);
            self.bump(|s| s.suppressed += 1);
            RenderOutcome::Suppressed
        };

        if policy.notify_player {
            self.notifier.notify(&format!(
                "Caught an exception rendering {target}; the {kind} was skipped. See the log for details."
            ));
        }

        Ok(outcome)
    }

    fn report(
        &self,
        kind: RenderKind,
        target: &dyn Display,
        failure: &Failure,
        disposition: Disposition,
    ) {
        self.reporter.report(&FailureReport {
            kind,
            target: target.to_string(),
            cause: failure.cause(),
            panicked: matches!(failure, Failure::Panic(_)),
            disposition,
        });
    }

    fn bump(&self, f: impl FnOnce(&mut GuardStats)) {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }
}

impl std::fmt::Debug for RenderGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderGuard")
            .field("policy", &self.policy.get())
            .field("stats", &self.stats.get())
            .field("notifier", &self.notifier)
            .finish()
    }
}
