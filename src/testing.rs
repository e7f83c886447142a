//! Test doubles shared by the unit tests.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::audio::{AudioContextHandle, AudioHost};
use crate::diag::Diagnostics;
use crate::error::KeepAliveError;
use crate::ticker::{BackgroundUnit, MessageHandler, TickMessage, TickProgram, WorkerHost};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Info(String),
    Error(String),
}

/// Records every diagnostic line.
#[derive(Debug, Clone, Default)]
pub struct MemoryDiagnostics {
    lines: Rc<RefCell<Vec<Line>>>,
}

impl MemoryDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<Line> {
        self.lines.borrow().clone()
    }

    pub fn infos(&self) -> Vec<String> {
        self.lines
            .borrow()
            .iter()
            .filter_map(|l| match l {
                Line::Info(s) => Some(s.clone()),
                Line::Error(_) => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.lines
            .borrow()
            .iter()
            .filter_map(|l| match l {
                Line::Error(s) => Some(s.clone()),
                Line::Info(_) => None,
            })
            .collect()
    }
}

impl Diagnostics for MemoryDiagnostics {
    fn info(&self, line: &str) {
        self.lines.borrow_mut().push(Line::Info(line.to_string()));
    }

    fn error(&self, line: &str) {
        self.lines.borrow_mut().push(Line::Error(line.to_string()));
    }
}

/// An audio host whose context construction always fails.
pub struct FailingAudioHost {
    detail: Option<String>,
}

impl FailingAudioHost {
    pub fn new(detail: &str) -> Self {
        FailingAudioHost {
            detail: Some(detail.to_string()),
        }
    }

    /// No audio capability at all.
    pub fn absent() -> Self {
        FailingAudioHost { detail: None }
    }
}

impl AudioHost for FailingAudioHost {
    fn create_context(&self) -> Result<Rc<dyn AudioContextHandle>, KeepAliveError> {
        match &self.detail {
            Some(detail) => Err(KeepAliveError::AudioSetup(detail.clone())),
            None => Err(KeepAliveError::AudioUnavailable),
        }
    }
}

#[derive(Default)]
struct Script {
    program: Option<TickProgram>,
    handler: Option<MessageHandler>,
    terminated: bool,
}

/// A worker host driven by the test: messages are emitted with [`emit`].
///
/// [`emit`]: ScriptedWorkerHost::emit
#[derive(Clone, Default)]
pub struct ScriptedWorkerHost {
    script: Rc<RefCell<Script>>,
    fail_with: Option<String>,
    launches: Rc<Cell<u32>>,
}

impl ScriptedWorkerHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(detail: &str) -> Self {
        ScriptedWorkerHost {
            fail_with: Some(detail.to_string()),
            ..Self::default()
        }
    }

    pub fn launches(&self) -> u32 {
        self.launches.get()
    }

    pub fn launched_program(&self) -> Option<TickProgram> {
        self.script.borrow().program.clone()
    }

    pub fn terminated(&self) -> bool {
        self.script.borrow().terminated
    }

    /// Run `count` ticks of the launched program through the handler.
    pub fn emit(&self, count: usize) {
        let mut script = self.script.borrow_mut();
        let Script {
            program, handler, ..
        } = &mut *script;
        if let (Some(program), Some(handler)) = (program.as_mut(), handler.as_mut()) {
            for _ in 0..count {
                let msg: TickMessage = program.tick();
                handler(msg);
            }
        }
    }
}

impl WorkerHost for ScriptedWorkerHost {
    fn launch(
        &self,
        program: TickProgram,
        on_message: MessageHandler,
    ) -> Result<Box<dyn BackgroundUnit>, KeepAliveError> {
        if let Some(detail) = &self.fail_with {
            return Err(KeepAliveError::WorkerLaunch(detail.clone()));
        }
        self.launches.set(self.launches.get() + 1);
        let mut script = self.script.borrow_mut();
        script.program = Some(program);
        script.handler = Some(on_message);
        script.terminated = false;
        Ok(Box::new(ScriptedUnit {
            script: Rc::clone(&self.script),
        }))
    }
}

struct ScriptedUnit {
    script: Rc<RefCell<Script>>,
}

impl BackgroundUnit for ScriptedUnit {
    fn terminate(self: Box<Self>) {
        let mut script = self.script.borrow_mut();
        script.terminated = true;
        script.handler = None;
    }
}
