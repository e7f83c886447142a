//! The keep-alive service: owns the silent audio and the tick worker.

use std::rc::Rc;

use serde::Serialize;

use crate::audio::{AudioHost, ContextState, SilentAudio};
use crate::config::KeepAliveConfig;
use crate::diag::{Diagnostics, LOG_TARGET};
use crate::error::KeepAliveError;
use crate::schedule::Scheduler;
use crate::ticker::{TickProgram, TickWorker, WorkerHost};

/// The host capabilities the service runs against.
pub struct HostCapabilities {
    pub audio: Box<dyn AudioHost>,
    pub workers: Box<dyn WorkerHost>,
    pub scheduler: Rc<dyn Scheduler>,
    pub diagnostics: Rc<dyn Diagnostics>,
}

/// Snapshot of a service, as reported to embedders.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    pub running: bool,
    /// `None` when audio is not running (never started, failed, or stopped).
    pub audio: Option<ContextState>,
    pub worker: bool,
    pub resume_attempts: u64,
    pub ticks_received: u64,
}

pub struct KeepAlive {
    config: KeepAliveConfig,
    host: HostCapabilities,
    audio: Option<SilentAudio>,
    worker: Option<TickWorker>,
    running: bool,
}

impl KeepAlive {
    pub fn new(config: KeepAliveConfig, host: HostCapabilities) -> Self {
        KeepAlive {
            config,
            host,
            audio: None,
            worker: None,
            running: false,
        }
    }

    pub fn config(&self) -> &KeepAliveConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    fn line(&self, text: &str) -> String {
        format!("{} {text}", self.config.tag)
    }

    /// Start both mechanisms. Audio failures are logged and absorbed; a
    /// worker launch failure is returned, leaving the audio running.
    pub fn start(&mut self) -> Result<(), KeepAliveError> {
        if self.running {
            return Err(KeepAliveError::AlreadyRunning);
        }
        self.config.validate()?;

        let diag = Rc::clone(&self.host.diagnostics);
        diag.info(&self.line("Injecting Anti-Freeze..."));

        match SilentAudio::start(
            self.host.audio.as_ref(),
            self.host.scheduler.as_ref(),
            &self.config.tone,
            self.config.resume_check,
        ) {
            Ok(audio) => {
                self.audio = Some(audio);
                diag.info(&self.line("Silent Audio Started."));
            }
            Err(e) => {
                diag.error(&self.line(&format!("Audio Failed: {e}")));
            }
        }

        // The two mechanisms are independent: audio keeps running even if the
        // worker cannot be launched, and `stop()` still releases it.
        self.running = true;

        let program = TickProgram::new(self.config.tick_interval, self.config.tick_payload.clone());
        let worker = TickWorker::launch(self.host.workers.as_ref(), program)?;
        self.worker = Some(worker);
        diag.info(&self.line("Worker Started."));
        Ok(())
    }

    fn release_audio(&mut self) {
        if let Some(audio) = self.audio.take() {
            if let Err(e) = audio.stop() {
                log::warn!(target: LOG_TARGET, "closing audio context failed: {e}");
            }
        }
    }

    /// Cancel the recheck loop, close the audio context and terminate the
    /// worker. Does nothing if the service is not running.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.release_audio();
        if let Some(worker) = self.worker.take() {
            worker.stop();
        }
        self.running = false;
        self.host.diagnostics.info(&self.line("Stopped."));
    }

    /// Deliver queued worker messages (native hosts only).
    pub fn pump(&mut self) -> usize {
        self.worker.as_mut().map_or(0, TickWorker::pump)
    }

    pub fn status(&self) -> ServiceStatus {
        ServiceStatus {
            running: self.running,
            audio: self.audio.as_ref().map(SilentAudio::state),
            worker: self.worker.is_some(),
            resume_attempts: self.audio.as_ref().map_or(0, SilentAudio::resume_attempts),
            ticks_received: self.worker.as_ref().map_or(0, TickWorker::ticks_received),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioContextHandle;
    use crate::dsp::offline::OfflineAudioHost;
    use crate::sim::ManualScheduler;
    use crate::testing::{FailingAudioHost, MemoryDiagnostics, ScriptedWorkerHost};
    use crate::thread_host::ThreadWorkerHost;
    use std::time::Duration;

    struct Rig {
        service: KeepAlive,
        diag: MemoryDiagnostics,
        scheduler: ManualScheduler,
        workers: ScriptedWorkerHost,
    }

    fn rig(audio: Box<dyn AudioHost>) -> Rig {
        let diag = MemoryDiagnostics::new();
        let scheduler = ManualScheduler::new();
        let workers = ScriptedWorkerHost::new();
        let service = KeepAlive::new(
            KeepAliveConfig::default(),
            HostCapabilities {
                audio,
                workers: Box::new(workers.clone()),
                scheduler: Rc::new(scheduler.clone()),
                diagnostics: Rc::new(diag.clone()),
            },
        );
        Rig {
            service,
            diag,
            scheduler,
            workers,
        }
    }

    #[test]
    fn start_with_audio_logs_three_lines() {
        let mut r = rig(Box::new(OfflineAudioHost::new(44100.0)));
        r.service.start().unwrap();

        assert_eq!(
            r.diag.infos(),
            vec![
                "[Tarabean KeepAlive] Injecting Anti-Freeze...",
                "[Tarabean KeepAlive] Silent Audio Started.",
                "[Tarabean KeepAlive] Worker Started.",
            ]
        );
        assert!(r.diag.errors().is_empty());

        let status = r.service.status();
        assert!(status.running);
        assert_eq!(status.audio, Some(ContextState::Running));
        assert!(status.worker);
    }

    #[test]
    fn audio_failure_is_absorbed() {
        let mut r = rig(Box::new(FailingAudioHost::new("NotAllowedError: no gesture")));
        r.service.start().expect("audio failure must not reach the caller");

        assert_eq!(
            r.diag.infos(),
            vec![
                "[Tarabean KeepAlive] Injecting Anti-Freeze...",
                "[Tarabean KeepAlive] Worker Started.",
            ]
        );
        let errors = r.diag.errors();
        assert_eq!(errors.len(), 1, "exactly one error line: {errors:?}");
        assert!(errors[0].starts_with("[Tarabean KeepAlive] Audio Failed:"));
        assert!(errors[0].contains("NotAllowedError: no gesture"));

        assert_eq!(r.workers.launches(), 1);
        assert_eq!(r.service.status().audio, None);
    }

    #[test]
    fn absent_audio_still_starts_worker() {
        let mut r = rig(Box::new(FailingAudioHost::absent()));
        r.service.start().unwrap();
        assert_eq!(r.diag.errors().len(), 1);
        assert!(r.service.status().worker);
        assert_eq!(r.scheduler.pending(), 0);
    }

    #[test]
    fn second_start_is_rejected() {
        let mut r = rig(Box::new(OfflineAudioHost::new(44100.0)));
        r.service.start().unwrap();
        assert_eq!(r.service.start(), Err(KeepAliveError::AlreadyRunning));
        assert_eq!(r.workers.launches(), 1);
        assert_eq!(r.scheduler.pending(), 1);
    }

    #[test]
    fn worker_failure_leaves_audio_running() {
        let audio = OfflineAudioHost::new(44100.0);
        let diag = MemoryDiagnostics::new();
        let scheduler = ManualScheduler::new();
        let mut service = KeepAlive::new(
            KeepAliveConfig::default(),
            HostCapabilities {
                audio: Box::new(audio.clone()),
                workers: Box::new(ScriptedWorkerHost::failing("SecurityError")),
                scheduler: Rc::new(scheduler.clone()),
                diagnostics: Rc::new(diag.clone()),
            },
        );
        let err = service.start().unwrap_err();
        assert_eq!(err, KeepAliveError::WorkerLaunch("SecurityError".into()));

        let ctx = audio.last_context().unwrap();
        assert_eq!(ctx.state(), ContextState::Running, "audio must outlive a failed worker");
        assert_eq!(scheduler.pending(), 1, "resume check must keep running");
        assert!(diag.errors().is_empty(), "worker failure is returned, not logged");
        assert!(!diag.infos().iter().any(|l| l.ends_with("Worker Started.")));

        let status = service.status();
        assert!(status.running);
        assert_eq!(status.audio, Some(ContextState::Running));
        assert!(!status.worker);

        ctx.suspend();
        scheduler.advance(Duration::from_secs(5));
        assert_eq!(ctx.state(), ContextState::Running);

        service.stop();
        assert_eq!(ctx.state(), ContextState::Closed);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn sub_millisecond_tick_is_rejected_up_front() {
        let audio = OfflineAudioHost::new(44100.0);
        let diag = MemoryDiagnostics::new();
        let config = KeepAliveConfig {
            tick_interval: Duration::from_micros(500),
            ..KeepAliveConfig::default()
        };
        let mut service = KeepAlive::new(
            config,
            HostCapabilities {
                audio: Box::new(audio.clone()),
                workers: Box::new(ScriptedWorkerHost::new()),
                scheduler: Rc::new(ManualScheduler::new()),
                diagnostics: Rc::new(diag.clone()),
            },
        );
        assert!(matches!(service.start(), Err(KeepAliveError::InvalidConfig(_))));
        assert!(diag.lines().is_empty(), "nothing may start: {:?}", diag.lines());
        assert_eq!(audio.contexts_created(), 0);
    }

    #[test]
    fn ticks_are_counted_and_resume_loop_runs() {
        let host = OfflineAudioHost::new(44100.0);
        let mut r = rig(Box::new(host.clone()));
        r.service.start().unwrap();

        let ctx = host.last_context().unwrap();
        ctx.suspend();
        r.scheduler.advance(Duration::from_secs(5));
        r.workers.emit(3);

        let status = r.service.status();
        assert_eq!(status.audio, Some(ContextState::Running));
        assert_eq!(status.resume_attempts, 1);
        assert_eq!(status.ticks_received, 3);
    }

    #[test]
    fn stop_releases_everything_once() {
        let mut r = rig(Box::new(OfflineAudioHost::new(44100.0)));
        r.service.start().unwrap();
        r.service.stop();
        r.service.stop();

        assert!(!r.service.is_running());
        assert_eq!(r.scheduler.pending(), 0);
        assert!(r.workers.terminated());
        let stopped = r.diag.infos().iter().filter(|l| l.ends_with("Stopped.")).count();
        assert_eq!(stopped, 1);

        // A stopped service can be started again.
        r.service.start().unwrap();
        assert_eq!(r.workers.launches(), 2);
    }

    #[test]
    fn runs_on_native_threads() {
        let diag = MemoryDiagnostics::new();
        let config = KeepAliveConfig {
            tick_interval: Duration::from_millis(5),
            ..KeepAliveConfig::default()
        };
        let mut service = KeepAlive::new(
            config,
            HostCapabilities {
                audio: Box::new(OfflineAudioHost::new(8000.0)),
                workers: Box::new(ThreadWorkerHost),
                scheduler: Rc::new(ManualScheduler::new()),
                diagnostics: Rc::new(diag.clone()),
            },
        );
        service.start().unwrap();
        std::thread::sleep(Duration::from_millis(100));
        service.pump();
        assert!(service.status().ticks_received >= 3);
        service.stop();
    }

    #[test]
    fn invalid_config_is_returned_before_anything_starts() {
        let diag = MemoryDiagnostics::new();
        let workers = ScriptedWorkerHost::new();
        let mut config = KeepAliveConfig::default();
        config.tone.gain = 0.2;
        let mut service = KeepAlive::new(
            config,
            HostCapabilities {
                audio: Box::new(OfflineAudioHost::new(44100.0)),
                workers: Box::new(workers.clone()),
                scheduler: Rc::new(ManualScheduler::new()),
                diagnostics: Rc::new(diag.clone()),
            },
        );
        assert!(matches!(service.start(), Err(KeepAliveError::InvalidConfig(_))));
        assert!(diag.lines().is_empty());
        assert_eq!(workers.launches(), 0);
    }
}
