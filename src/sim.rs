//! Virtual-clock scheduler.
//!
//! Drives periodic tasks deterministically: nothing fires until
//! [`ManualScheduler::advance`] moves the clock past a task's due time.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crate::error::KeepAliveError;
use crate::schedule::{PeriodicTask, Scheduler, TaskFn, TaskGuard};

struct Entry {
    id: u64,
    period: Duration,
    next_due: Duration,
    /// `None` while the task body is running.
    task: Option<TaskFn>,
}

#[derive(Default)]
struct Clock {
    now: Duration,
    next_id: u64,
    entries: Vec<Entry>,
}

#[derive(Clone, Default)]
pub struct ManualScheduler {
    inner: Rc<RefCell<Clock>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.inner.borrow().now
    }

    /// Number of registered (not cancelled) tasks, detached ones included.
    pub fn pending(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    /// Advance the clock, firing every due task in deadline order.
    /// Returns the number of task invocations.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.inner.borrow().now + by;
        let mut fired = 0;

        loop {
            let due = {
                let clock = self.inner.borrow();
                clock
                    .entries
                    .iter()
                    .filter(|e| e.next_due <= target)
                    .min_by_key(|e| (e.next_due, e.id))
                    .map(|e| (e.id, e.next_due))
            };
            let Some((id, at)) = due else { break };

            let task = {
                let mut clock = self.inner.borrow_mut();
                clock.now = at;
                match clock.entries.iter_mut().find(|e| e.id == id) {
                    Some(entry) => {
                        entry.next_due += entry.period;
                        entry.task.take()
                    }
                    None => None,
                }
            };

            // The borrow is released here so the task may cancel itself or
            // register new work.
            if let Some(mut task) = task {
                task();
                fired += 1;
                let mut clock = self.inner.borrow_mut();
                if let Some(entry) = clock.entries.iter_mut().find(|e| e.id == id) {
                    entry.task = Some(task);
                }
            }
        }

        self.inner.borrow_mut().now = target;
        fired
    }
}

impl Scheduler for ManualScheduler {
    fn every(&self, period: Duration, task: TaskFn) -> Result<PeriodicTask, KeepAliveError> {
        if period.is_zero() {
            return Err(KeepAliveError::Schedule("period must be non-zero".into()));
        }
        let mut clock = self.inner.borrow_mut();
        let id = clock.next_id;
        clock.next_id += 1;
        let next_due = clock.now + period;
        clock.entries.push(Entry {
            id,
            period,
            next_due,
            task: Some(task),
        });
        Ok(PeriodicTask::new(
            "manual",
            period,
            Box::new(ManualGuard {
                id,
                clock: Rc::clone(&self.inner),
            }),
        ))
    }
}

struct ManualGuard {
    id: u64,
    clock: Rc<RefCell<Clock>>,
}

impl TaskGuard for ManualGuard {
    fn cancel(self: Box<Self>) {
        self.clock.borrow_mut().entries.retain(|e| e.id != self.id);
    }

    fn detach(self: Box<Self>) {}
}
