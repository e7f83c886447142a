//! Browser bindings: Web Audio, `setInterval`, dedicated workers and the
//! console, plus the exported entry points.

pub mod audio;
pub mod console;
pub mod timer;
pub mod worker;

use std::cell::RefCell;
use std::rc::Rc;

use log::LevelFilter;
use wasm_bindgen::prelude::*;

use crate::config::KeepAliveConfig;
use crate::diag::LogDiagnostics;
use crate::service::{HostCapabilities, KeepAlive};

pub use audio::WebAudioHost;
pub use timer::WebScheduler;
pub use worker::WebWorkerHost;

thread_local! {
    static ACTIVE: RefCell<Option<KeepAlive>> = const { RefCell::new(None) };
}

/// Human-readable detail of a thrown JS value.
pub(crate) fn js_detail(value: &JsValue) -> String {
    if let Some(s) = value.as_string() {
        return s;
    }
    match value.dyn_ref::<js_sys::Error>() {
        Some(err) => String::from(err.to_string()),
        None => format!("{value:?}"),
    }
}

/// A service wired to the page's own capabilities.
pub fn browser_service(config: KeepAliveConfig) -> KeepAlive {
    KeepAlive::new(
        config,
        HostCapabilities {
            audio: Box::new(WebAudioHost),
            workers: Box::new(WebWorkerHost::new()),
            scheduler: Rc::new(WebScheduler),
            diagnostics: Rc::new(LogDiagnostics),
        },
    )
}

/// Runs when the module is instantiated. Inside the tick worker there is no
/// window and nothing is started.
#[wasm_bindgen(start)]
pub fn inject() -> Result<(), JsValue> {
    if web_sys::window().is_none() {
        return Ok(());
    }
    console::init(LevelFilter::Info);

    ACTIVE.with(|active| {
        let mut active = active.borrow_mut();
        if active.is_some() {
            return Ok(());
        }
        let mut service = browser_service(KeepAliveConfig::default());
        // Kept even when the worker fails: the audio half is already running.
        let started = service.start();
        *active = Some(service);
        started.map_err(|e| JsValue::from_str(&e.to_string()))
    })
}

/// Stop the injected keep-alive and release its resources.
#[wasm_bindgen]
pub fn release() {
    // Taken out first so `stop` runs without the slot borrowed.
    let service = ACTIVE.with(|active| active.borrow_mut().take());
    if let Some(mut service) = service {
        service.stop();
    }
}

/// Status of the injected keep-alive, or `null` if none is running.
#[wasm_bindgen]
pub fn keepalive_status() -> Result<JsValue, JsValue> {
    ACTIVE.with(|active| match active.borrow().as_ref() {
        Some(service) => serde_wasm_bindgen::to_value(&service.status()).map_err(JsValue::from),
        None => Ok(JsValue::NULL),
    })
}
