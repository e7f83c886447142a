//! Web Audio backend.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Array, Function, Reflect};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{AudioContext, AudioContextState, GainNode, OscillatorNode, OscillatorType};

use crate::audio::{AudioContextHandle, AudioHost, ContextState};
use crate::config::ToneSettings;
use crate::dsp::oscillator::Waveform;
use crate::error::KeepAliveError;

use super::js_detail;

#[derive(Debug, Default, Clone, Copy)]
pub struct WebAudioHost;

impl WebAudioHost {
    /// The page's audio context constructor, falling back to the prefixed
    /// WebKit name.
    fn constructor() -> Option<Function> {
        let global = js_sys::global();
        ["AudioContext", "webkitAudioContext"]
            .iter()
            .filter_map(|name| Reflect::get(&global, &JsValue::from_str(name)).ok())
            .find_map(|ctor| ctor.dyn_into::<Function>().ok())
    }
}

impl AudioHost for WebAudioHost {
    fn create_context(&self) -> Result<Rc<dyn AudioContextHandle>, KeepAliveError> {
        let ctor = Self::constructor().ok_or(KeepAliveError::AudioUnavailable)?;
        let ctx: AudioContext = Reflect::construct(&ctor, &Array::new())
            .map_err(|e| KeepAliveError::AudioSetup(js_detail(&e)))?
            .unchecked_into();
        Ok(Rc::new(WebAudioContext {
            ctx,
            nodes: RefCell::new(None),
        }))
    }
}

/// The context plus the generator and volume nodes, kept here so they live
/// as long as the context does.
pub struct WebAudioContext {
    ctx: AudioContext,
    nodes: RefCell<Option<(OscillatorNode, GainNode)>>,
}

fn oscillator_type(waveform: Waveform) -> OscillatorType {
    match waveform {
        Waveform::Sine => OscillatorType::Sine,
        Waveform::Square => OscillatorType::Square,
        Waveform::Sawtooth => OscillatorType::Sawtooth,
        Waveform::Triangle => OscillatorType::Triangle,
    }
}

impl AudioContextHandle for WebAudioContext {
    fn start_tone(&self, tone: &ToneSettings) -> Result<(), KeepAliveError> {
        if self.nodes.borrow().is_some() {
            return Err(KeepAliveError::AudioSetup("tone already started".into()));
        }
        let setup = |e: JsValue| KeepAliveError::AudioSetup(js_detail(&e));

        let oscillator = self.ctx.create_oscillator().map_err(setup)?;
        let gain = self.ctx.create_gain().map_err(setup)?;

        oscillator.connect_with_audio_node(&gain).map_err(setup)?;
        gain.connect_with_audio_node(&self.ctx.destination()).map_err(setup)?;

        oscillator.set_type(oscillator_type(tone.waveform));
        oscillator.frequency().set_value(tone.frequency_hz);
        gain.gain().set_value(tone.gain);

        oscillator.start().map_err(setup)?;
        *self.nodes.borrow_mut() = Some((oscillator, gain));
        Ok(())
    }

    fn state(&self) -> ContextState {
        match self.ctx.state() {
            AudioContextState::Running => ContextState::Running,
            AudioContextState::Closed => ContextState::Closed,
            _ => ContextState::Suspended,
        }
    }

    fn resume(&self) -> Result<(), KeepAliveError> {
        // The returned promise is not awaited; the next recheck observes the
        // outcome.
        self.ctx
            .resume()
            .map(|_| ())
            .map_err(|e| KeepAliveError::AudioSetup(js_detail(&e)))
    }

    fn close(&self) -> Result<(), KeepAliveError> {
        if let Some((oscillator, _gain)) = self.nodes.borrow_mut().take() {
            let _ = oscillator.stop();
        }
        self.ctx
            .close()
            .map(|_| ())
            .map_err(|e| KeepAliveError::AudioSetup(js_detail(&e)))
    }
}
