//! Background tick: a worker that posts a message to the page once per
//! interval. The page receives and drops each message.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::KeepAliveError;

/// One message from the background unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickMessage {
    pub seq: u64,
    pub payload: String,
}

/// The program a background unit runs: emit one [`TickMessage`] per
/// interval, forever. Serializable so it can be handed to a browser worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickProgram {
    pub interval_ms: u64,
    pub payload: String,
    #[serde(default)]
    pub next_seq: u64,
}

impl TickProgram {
    pub fn new(interval: Duration, payload: impl Into<String>) -> Self {
        TickProgram {
            interval_ms: interval.as_millis().try_into().unwrap_or(u64::MAX),
            payload: payload.into(),
            next_seq: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Produce the message for the current tick.
    pub fn tick(&mut self) -> TickMessage {
        let msg = TickMessage {
            seq: self.next_seq,
            payload: self.payload.clone(),
        };
        self.next_seq += 1;
        msg
    }
}

pub type MessageHandler = Box<dyn FnMut(TickMessage)>;

/// Host background-execution capability.
pub trait WorkerHost {
    /// Launch `program` in an isolated unit; `on_message` is invoked on the
    /// launching side for every message the unit emits.
    fn launch(
        &self,
        program: TickProgram,
        on_message: MessageHandler,
    ) -> Result<Box<dyn BackgroundUnit>, KeepAliveError>;
}

pub trait BackgroundUnit {
    /// Deliver queued messages to the handler. Hosts with their own event
    /// loop deliver as messages arrive and return 0.
    fn pump(&mut self) -> usize {
        0
    }

    fn terminate(self: Box<Self>);
}

/// A launched tick program and the count of messages it has delivered.
pub struct TickWorker {
    unit: Box<dyn BackgroundUnit>,
    received: Rc<Cell<u64>>,
}

impl TickWorker {
    pub fn launch(host: &dyn WorkerHost, program: TickProgram) -> Result<Self, KeepAliveError> {
        if program.interval_ms == 0 {
            return Err(KeepAliveError::InvalidConfig(
                "tick interval must be non-zero".into(),
            ));
        }
        let received = Rc::new(Cell::new(0u64));
        let counter = Rc::clone(&received);
        let unit = host.launch(
            program,
            Box::new(move |_msg: TickMessage| {
                // Receiving is the point; the message itself is dropped.
                counter.set(counter.get() + 1);
            }),
        )?;
        Ok(TickWorker { unit, received })
    }

    pub fn ticks_received(&self) -> u64 {
        self.received.get()
    }

    pub fn pump(&mut self) -> usize {
        self.unit.pump()
    }

    pub fn stop(self) {
        self.unit.terminate();
    }
}

impl fmt::Debug for TickWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickWorker")
            .field("ticks_received", &self.received.get())
            .finish()
    }
}
