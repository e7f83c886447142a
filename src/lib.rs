pub mod audio;
pub mod bootstrap;
pub mod config;
pub mod diag;
pub mod dsp;
pub mod error;
pub mod schedule;
pub mod service;
pub mod sim;
pub mod thread_host;
pub mod ticker;

#[cfg(target_arch = "wasm32")]
pub mod web;

#[cfg(test)]
mod testing;

use wasm_bindgen::prelude::*;

pub use crate::audio::{AudioContextHandle, AudioHost, ContextState, SilentAudio};
pub use crate::config::{KeepAliveConfig, ToneSettings};
pub use crate::diag::{Diagnostics, LogDiagnostics};
pub use crate::error::KeepAliveError;
pub use crate::schedule::{PeriodicTask, Scheduler};
pub use crate::service::{HostCapabilities, KeepAlive, ServiceStatus};
pub use crate::ticker::{BackgroundUnit, TickMessage, TickProgram, TickWorker, WorkerHost};

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the keepalive-core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}
