//! Native background units: each tick program runs on its own OS thread and
//! sends messages back over a channel. The launching side drains them with
//! [`BackgroundUnit::pump`].

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};

use crate::diag::LOG_TARGET;
use crate::error::KeepAliveError;
use crate::ticker::{BackgroundUnit, MessageHandler, TickMessage, TickProgram, WorkerHost};

#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadWorkerHost;

impl WorkerHost for ThreadWorkerHost {
    fn launch(
        &self,
        program: TickProgram,
        on_message: MessageHandler,
    ) -> Result<Box<dyn BackgroundUnit>, KeepAliveError> {
        let (msg_tx, msg_rx) = mpsc::channel();
        let (stop_tx, stop_rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("keepalive-tick".to_string())
            .spawn(move || run_program(program, msg_tx, stop_rx))
            .map_err(|e| KeepAliveError::WorkerLaunch(e.to_string()))?;

        Ok(Box::new(ThreadUnit {
            messages: msg_rx,
            on_message,
            stop: stop_tx,
            handle: Some(handle),
        }))
    }
}

/// Tick loop. Exits only when told to stop or when the stop channel is
/// gone; a detached unit keeps ticking with nobody listening.
fn run_program(mut program: TickProgram, out: Sender<TickMessage>, stop: Receiver<()>) {
    let interval = program.interval();
    loop {
        match stop.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {
                let _ = out.send(program.tick());
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

struct ThreadUnit {
    messages: Receiver<TickMessage>,
    on_message: MessageHandler,
    stop: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl BackgroundUnit for ThreadUnit {
    fn pump(&mut self) -> usize {
        let mut delivered = 0;
        while let Ok(msg) = self.messages.try_recv() {
            (self.on_message)(msg);
            delivered += 1;
        }
        delivered
    }

    fn terminate(mut self: Box<Self>) {
        let _ = self.stop.send(());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!(target: LOG_TARGET, "tick thread panicked");
            }
        }
    }
}

impl Drop for ThreadUnit {
    fn drop(&mut self) {
        // Not terminated: keep the stop channel open so the thread runs on.
        if self.handle.take().is_some() {
            std::mem::forget(self.stop.clone());
            log::debug!(target: LOG_TARGET, "tick thread detached");
        }
    }
}
