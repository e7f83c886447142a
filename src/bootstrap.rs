//! Source of the worker bootstrap.
//!
//! The browser worker is created from an in-memory Blob, never from a file
//! served by the page. The bootstrap only loads this crate's own module by
//! absolute URL and hands the first posted message (the tick program) to
//! `run_tick_worker`; the tick logic itself lives in Rust.

/// MIME type of the bootstrap Blob.
pub const BOOTSTRAP_MIME: &str = "text/javascript";

/// Build the bootstrap for the wasm-bindgen module at `module_url`.
///
/// `module_url` must be absolute: a Blob worker has no base URL to resolve a
/// relative one against.
pub fn worker_bootstrap(module_url: &str) -> String {
    let url = serde_json::to_string(module_url).unwrap_or_else(|_| String::from("\"\""));
    format!(
        "self.onmessage = async (event) => {{\n\
         \x20   self.onmessage = null;\n\
         \x20   const keepalive = await import({url});\n\
         \x20   await keepalive.default();\n\
         \x20   keepalive.run_tick_worker(event.data);\n\
         }};\n"
    )
}
