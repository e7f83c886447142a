//! Offline audio host: a software generator -> gain -> destination graph.
//!
//! Used where no browser audio stack exists. The rendered output is what a
//! real destination would receive, so the tone's level can be measured.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::audio::{AudioContextHandle, AudioHost, ContextState};
use crate::config::ToneSettings;
use crate::error::KeepAliveError;

use super::oscillator::Oscillator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Generator,
    Volume,
    Destination,
}

#[derive(Debug, Clone)]
pub struct ToneGraph {
    oscillator: Oscillator,
    gain: f64,
    started: bool,
    edges: Vec<(NodeKind, NodeKind)>,
}

impl ToneGraph {
    pub fn connections(&self) -> Vec<(NodeKind, NodeKind)> {
        self.edges.clone()
    }

    pub fn started(&self) -> bool {
        self.started
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }

    pub fn frequency(&self) -> f64 {
        self.oscillator.frequency()
    }
}

#[derive(Debug)]
pub struct OfflineContext {
    sample_rate: f64,
    state: Cell<ContextState>,
    graph: RefCell<Option<ToneGraph>>,
    reject_resume: Cell<bool>,
}

impl OfflineContext {
    fn new(sample_rate: f64) -> Self {
        OfflineContext {
            sample_rate,
            state: Cell::new(ContextState::Running),
            graph: RefCell::new(None),
            reject_resume: Cell::new(false),
        }
    }

    pub fn graph(&self) -> Option<ToneGraph> {
        self.graph.borrow().clone()
    }

    /// Simulate the host auto-suspending the context.
    pub fn suspend(&self) {
        if self.state.get() == ContextState::Running {
            self.state.set(ContextState::Suspended);
        }
    }

    /// Make subsequent resume requests fail (e.g. no user gesture yet).
    pub fn reject_resume(&self, reject: bool) {
        self.reject_resume.set(reject);
    }

    /// Render `frames` samples as seen by the destination. A context that is
    /// not running outputs silence and does not advance the generator.
    pub fn render(&self, frames: usize) -> Vec<f64> {
        let mut graph = self.graph.borrow_mut();
        match graph.as_mut() {
            Some(g) if g.started && self.state.get() == ContextState::Running => (0..frames)
                .map(|_| g.oscillator.next_sample() * g.gain)
                .collect(),
            _ => vec![0.0; frames],
        }
    }
}

impl AudioContextHandle for OfflineContext {
    fn start_tone(&self, tone: &ToneSettings) -> Result<(), KeepAliveError> {
        if self.state.get() == ContextState::Closed {
            return Err(KeepAliveError::AudioSetup("context is closed".into()));
        }
        let mut graph = self.graph.borrow_mut();
        if graph.is_some() {
            return Err(KeepAliveError::AudioSetup("tone already started".into()));
        }
        *graph = Some(ToneGraph {
            oscillator: Oscillator::new(
                tone.waveform,
                f64::from(tone.frequency_hz),
                self.sample_rate,
            ),
            gain: f64::from(tone.gain),
            started: true,
            edges: vec![
                (NodeKind::Generator, NodeKind::Volume),
                (NodeKind::Volume, NodeKind::Destination),
            ],
        });
        Ok(())
    }

    fn state(&self) -> ContextState {
        self.state.get()
    }

    fn resume(&self) -> Result<(), KeepAliveError> {
        match self.state.get() {
            ContextState::Closed => Err(KeepAliveError::AudioSetup("context is closed".into())),
            _ if self.reject_resume.get() => {
                Err(KeepAliveError::AudioSetup("resume rejected by host".into()))
            }
            _ => {
                self.state.set(ContextState::Running);
                Ok(())
            }
        }
    }

    fn close(&self) -> Result<(), KeepAliveError> {
        self.state.set(ContextState::Closed);
        if let Some(g) = self.graph.borrow_mut().as_mut() {
            g.started = false;
        }
        Ok(())
    }
}

/// Hands out [`OfflineContext`]s and remembers them for inspection.
/// Clones share the same context list.
#[derive(Debug, Clone)]
pub struct OfflineAudioHost {
    sample_rate: f64,
    contexts: Rc<RefCell<Vec<Rc<OfflineContext>>>>,
}

impl OfflineAudioHost {
    pub fn new(sample_rate: f64) -> Self {
        OfflineAudioHost {
            sample_rate,
            contexts: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn contexts_created(&self) -> usize {
        self.contexts.borrow().len()
    }

    pub fn last_context(&self) -> Option<Rc<OfflineContext>> {
        self.contexts.borrow().last().cloned()
    }
}

impl AudioHost for OfflineAudioHost {
    fn create_context(&self) -> Result<Rc<dyn AudioContextHandle>, KeepAliveError> {
        let ctx = Rc::new(OfflineContext::new(self.sample_rate));
        self.contexts.borrow_mut().push(Rc::clone(&ctx));
        Ok(ctx)
    }
}
