//! `setInterval`-backed scheduler.

use std::time::Duration;

use js_sys::{Function, Reflect};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};

use crate::error::KeepAliveError;
use crate::schedule::{PeriodicTask, Scheduler, TaskFn, TaskGuard};

use super::js_detail;

/// Schedules on the global scope (window or worker).
#[derive(Debug, Default, Clone, Copy)]
pub struct WebScheduler;

fn global_fn(name: &str) -> Result<Function, KeepAliveError> {
    Reflect::get(&js_sys::global(), &JsValue::from_str(name))
        .ok()
        .and_then(|f| f.dyn_into::<Function>().ok())
        .ok_or_else(|| KeepAliveError::Schedule(format!("{name} is not available")))
}

pub(crate) fn millis(period: Duration) -> i32 {
    period.as_millis().try_into().unwrap_or(i32::MAX)
}

impl Scheduler for WebScheduler {
    fn every(&self, period: Duration, task: TaskFn) -> Result<PeriodicTask, KeepAliveError> {
        let set_interval = global_fn("setInterval")?;
        let closure = Closure::wrap(task);
        let id = set_interval
            .call2(
                &JsValue::NULL,
                closure.as_ref().unchecked_ref(),
                &JsValue::from(millis(period)),
            )
            .map_err(|e| KeepAliveError::Schedule(js_detail(&e)))?;
        Ok(PeriodicTask::new(
            "interval",
            period,
            Box::new(IntervalGuard { id, closure }),
        ))
    }
}

struct IntervalGuard {
    id: JsValue,
    closure: Closure<dyn FnMut()>,
}

impl TaskGuard for IntervalGuard {
    fn cancel(self: Box<Self>) {
        if let Ok(clear) = global_fn("clearInterval") {
            let _ = clear.call1(&JsValue::NULL, &self.id);
        }
        drop(self.closure);
    }

    fn detach(self: Box<Self>) {
        // The interval keeps calling into the closure, so it must outlive us.
        self.closure.forget();
    }
}
