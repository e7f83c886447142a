//! Owned periodic tasks.
//!
//! A [`PeriodicTask`] is returned by a [`Scheduler`] and is the only handle
//! to the recurring callback. `cancel()` stops it; dropping it without
//! cancelling detaches it, so the callback keeps firing for the lifetime of
//! the host.

use std::fmt;
use std::time::Duration;

use crate::diag::LOG_TARGET;
use crate::error::KeepAliveError;

pub type TaskFn = Box<dyn FnMut()>;

/// A host timer facility.
pub trait Scheduler {
    /// Run `task` every `period`, starting one period from now.
    fn every(&self, period: Duration, task: TaskFn) -> Result<PeriodicTask, KeepAliveError>;
}

/// Host-side registration behind a [`PeriodicTask`].
pub trait TaskGuard {
    fn cancel(self: Box<Self>);
    /// Release the handle while leaving the host timer running.
    fn detach(self: Box<Self>);
}

pub struct PeriodicTask {
    label: &'static str,
    period: Duration,
    guard: Option<Box<dyn TaskGuard>>,
}

impl PeriodicTask {
    pub fn new(label: &'static str, period: Duration, guard: Box<dyn TaskGuard>) -> Self {
        PeriodicTask {
            label,
            period,
            guard: Some(guard),
        }
    }

    /// Attach a label naming what the task does, for logs.
    pub fn labeled(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_active(&self) -> bool {
        self.guard.is_some()
    }

    pub fn cancel(&mut self) {
        if let Some(guard) = self.guard.take() {
            log::debug!(target: LOG_TARGET, "cancelling periodic task '{}'", self.label);
            guard.cancel();
        }
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        if let Some(guard) = self.guard.take() {
            log::debug!(target: LOG_TARGET, "detaching periodic task '{}'", self.label);
            guard.detach();
        }
    }
}

impl fmt::Debug for PeriodicTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeriodicTask")
            .field("label", &self.label)
            .field("period", &self.period)
            .field("active", &self.is_active())
            .finish()
    }
}
