//! Logging setup for retrieval binaries.
//!
//! Logs go to stderr so rendered documents on stdout stay pipeable. The level
//! applies to the retrieval crates only; HTTP client internals stay at `warn`.
//! `RUST_LOG`, when set, replaces the whole filter.

use std::sync::OnceLock;
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

// The `octofhir-rag` binary logs under `octofhir_rag` too.
const RETRIEVAL_TARGETS: [&str; 2] = ["octofhir_rag", "octofhir_rag_core"];

static FILTER_HANDLE: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

/// Filter directives that put the retrieval crates at `level`.
pub fn retrieval_directives(level: &str) -> String {
    let mut directives = String::from("warn");
    for target in RETRIEVAL_TARGETS {
        directives.push_str(&format!(",{target}={level}"));
    }
    directives
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init_tracing_with_level(level: &str) {
    let filter = match std::env::var_os("RUST_LOG") {
        Some(_) => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(retrieval_directives(level))),
        None => EnvFilter::new(retrieval_directives(level)),
    };

    let (filter_layer, handle) = reload::Layer::new(filter);
    let _ = FILTER_HANDLE.set(handle);

    let _ = tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Swap the retrieval crates to `level`, e.g. once configuration is loaded.
pub fn apply_logging_level(level: &str) {
    if let Some(handle) = FILTER_HANDLE.get() {
        let _ = handle.modify(|filter| *filter = EnvFilter::new(retrieval_directives(level)));
    }
}
