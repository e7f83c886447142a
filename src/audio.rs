//! Silent audio: a near-zero-gain tone that marks the page as audible, plus
//! a recheck loop that resumes the context whenever the host suspends it.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use serde::Serialize;

use crate::config::ToneSettings;
use crate::diag::LOG_TARGET;
use crate::error::KeepAliveError;
use crate::schedule::{PeriodicTask, Scheduler};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextState {
    Suspended,
    Running,
    Closed,
}

/// Host audio subsystem.
pub trait AudioHost {
    /// Acquire a processing context. Returns
    /// [`KeepAliveError::AudioUnavailable`] when the host has no audio support.
    fn create_context(&self) -> Result<Rc<dyn AudioContextHandle>, KeepAliveError>;
}

/// A live audio-processing context.
pub trait AudioContextHandle {
    /// Build generator -> volume -> destination with `tone` and start the
    /// generator.
    fn start_tone(&self, tone: &ToneSettings) -> Result<(), KeepAliveError>;
    fn state(&self) -> ContextState;
    /// Ask the host to resume. The request may complete asynchronously.
    fn resume(&self) -> Result<(), KeepAliveError>;
    fn close(&self) -> Result<(), KeepAliveError>;
}

/// Outcome of one recheck tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recheck {
    Running,
    ResumeRequested,
    ResumeFailed,
    Closed,
}

/// Resume `ctx` if it is suspended.
pub fn recheck(ctx: &dyn AudioContextHandle) -> Recheck {
    match ctx.state() {
        ContextState::Running => Recheck::Running,
        ContextState::Closed => Recheck::Closed,
        ContextState::Suspended => match ctx.resume() {
            Ok(()) => {
                log::debug!(target: LOG_TARGET, "audio context suspended, resume requested");
                Recheck::ResumeRequested
            }
            Err(e) => {
                log::warn!(target: LOG_TARGET, "audio context resume failed: {e}");
                Recheck::ResumeFailed
            }
        },
    }
}

/// The running tone and its recheck task.
pub struct SilentAudio {
    ctx: Rc<dyn AudioContextHandle>,
    recheck: PeriodicTask,
    resume_attempts: Rc<Cell<u64>>,
}

impl SilentAudio {
    pub fn start(
        host: &dyn AudioHost,
        scheduler: &dyn Scheduler,
        tone: &ToneSettings,
        recheck_every: Duration,
    ) -> Result<Self, KeepAliveError> {
        tone.validate()?;
        let ctx = host.create_context()?;
        ctx.start_tone(tone)?;

        let resume_attempts = Rc::new(Cell::new(0u64));
        let attempts = Rc::clone(&resume_attempts);
        let watched = Rc::clone(&ctx);
        let recheck_task = scheduler
            .every(
                recheck_every,
                Box::new(move || {
                    if matches!(
                        recheck(watched.as_ref()),
                        Recheck::ResumeRequested | Recheck::ResumeFailed
                    ) {
                        attempts.set(attempts.get() + 1);
                    }
                }),
            )?
            .labeled("audio-resume");

        Ok(SilentAudio {
            ctx,
            recheck: recheck_task,
            resume_attempts,
        })
    }

    pub fn state(&self) -> ContextState {
        self.ctx.state()
    }

    /// Resume requests issued by the recheck loop so far.
    pub fn resume_attempts(&self) -> u64 {
        self.resume_attempts.get()
    }

    pub fn is_checking(&self) -> bool {
        self.recheck.is_active()
    }

    /// Cancel the recheck loop and close the context.
    pub fn stop(mut self) -> Result<(), KeepAliveError> {
        self.recheck.cancel();
        self.ctx.close()
    }
}

impl fmt::Debug for SilentAudio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SilentAudio")
            .field("state", &self.ctx.state())
            .field("recheck", &self.recheck)
            .field("resume_attempts", &self.resume_attempts.get())
            .finish()
    }
}
