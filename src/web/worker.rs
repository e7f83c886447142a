//! Dedicated-worker backend.
//!
//! The worker runs from an in-memory Blob holding the bootstrap from
//! [`worker_bootstrap`]. The bootstrap loads this crate's wasm module inside
//! the worker by absolute URL and hands the posted [`TickProgram`] to
//! [`run_tick_worker`].

use js_sys::Array;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use web_sys::{
    Blob, BlobPropertyBag, DedicatedWorkerGlobalScope, MessageEvent, Url, Worker, WorkerOptions,
    WorkerType,
};

use crate::bootstrap::{BOOTSTRAP_MIME, worker_bootstrap};
use crate::diag::LOG_TARGET;
use crate::error::KeepAliveError;
use crate::schedule::Scheduler;
use crate::ticker::{BackgroundUnit, MessageHandler, TickMessage, TickProgram, WorkerHost};

use super::js_detail;
use super::timer::WebScheduler;

#[wasm_bindgen]
extern "C" {
    /// URL of the wasm-bindgen glue module, resolved where the glue lives
    /// rather than against the host page.
    #[wasm_bindgen(thread_local_v2, js_namespace = ["import", "meta"], js_name = url)]
    static MODULE_URL: JsValue;
}

pub struct WebWorkerHost {
    module_url: Option<String>,
}

impl WebWorkerHost {
    /// Launch workers that load the module this code was loaded from.
    pub fn new() -> Self {
        WebWorkerHost {
            module_url: MODULE_URL.with(JsValue::as_string),
        }
    }

    pub fn with_module_url(module_url: impl Into<String>) -> Self {
        WebWorkerHost {
            module_url: Some(module_url.into()),
        }
    }

    fn bootstrap_url(&self) -> Result<String, KeepAliveError> {
        let module_url = self
            .module_url
            .as_deref()
            .ok_or_else(|| KeepAliveError::WorkerLaunch("module URL is unknown".into()))?;
        let blob_url = || -> Result<String, JsValue> {
            let parts = Array::of1(&JsValue::from_str(&worker_bootstrap(module_url)));
            let options = BlobPropertyBag::new();
            options.set_type(BOOTSTRAP_MIME);
            let blob = Blob::new_with_str_sequence_and_options(&parts, &options)?;
            Url::create_object_url_with_blob(&blob)
        };
        blob_url().map_err(|e| KeepAliveError::WorkerLaunch(js_detail(&e)))
    }
}

impl Default for WebWorkerHost {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkerHost for WebWorkerHost {
    fn launch(
        &self,
        program: TickProgram,
        mut on_message: MessageHandler,
    ) -> Result<Box<dyn BackgroundUnit>, KeepAliveError> {
        let launch = |e: JsValue| KeepAliveError::WorkerLaunch(js_detail(&e));

        let script_url = self.bootstrap_url()?;
        let options = WorkerOptions::new();
        options.set_type(WorkerType::Module);
        let worker = match Worker::new_with_options(&script_url, &options) {
            Ok(worker) => worker,
            Err(e) => {
                let _ = Url::revoke_object_url(&script_url);
                return Err(launch(e));
            }
        };

        let onmessage = Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
            match serde_wasm_bindgen::from_value::<TickMessage>(event.data()) {
                Ok(msg) => on_message(msg),
                Err(e) => log::debug!(target: LOG_TARGET, "ignoring worker message: {e}"),
            }
        });
        worker.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));

        let unit = WebWorkerUnit {
            worker,
            script_url,
            onmessage: Some(onmessage),
        };
        let posted = serde_wasm_bindgen::to_value(&program)
            .map_err(JsValue::from)
            .and_then(|payload| unit.worker.post_message(&payload));
        if let Err(e) = posted {
            Box::new(unit).terminate();
            return Err(launch(e));
        }

        Ok(Box::new(unit))
    }
}

struct WebWorkerUnit {
    worker: Worker,
    /// Blob URL of the bootstrap, revoked on terminate.
    script_url: String,
    onmessage: Option<Closure<dyn FnMut(MessageEvent)>>,
}

impl BackgroundUnit for WebWorkerUnit {
    fn terminate(mut self: Box<Self>) {
        self.worker.set_onmessage(None);
        self.worker.terminate();
        let _ = Url::revoke_object_url(&self.script_url);
        self.onmessage = None;
    }
}

impl Drop for WebWorkerUnit {
    fn drop(&mut self) {
        // Not terminated: the worker keeps posting, so the handler must stay.
        if let Some(onmessage) = self.onmessage.take() {
            onmessage.forget();
        }
    }
}

/// Worker-side entry point: run the posted tick program until the worker
/// is terminated.
#[wasm_bindgen]
pub fn run_tick_worker(program: JsValue) -> Result<(), JsValue> {
    let mut program: TickProgram = serde_wasm_bindgen::from_value(program)?;
    let scope: DedicatedWorkerGlobalScope = js_sys::global().dyn_into()?;
    let interval = program.interval();

    let task = WebScheduler
        .every(
            interval,
            Box::new(move || {
                let posted = serde_wasm_bindgen::to_value(&program.tick())
                    .map_err(JsValue::from)
                    .and_then(|msg| scope.post_message(&msg));
                if let Err(e) = posted {
                    log::warn!(target: LOG_TARGET, "tick post failed: {}", js_detail(&e));
                }
            }),
        )
        .map_err(|e| JsValue::from_str(&e.to_string()))?
        .labeled("worker-tick");

    // Runs for the worker's lifetime.
    drop(task);
    Ok(())
}
