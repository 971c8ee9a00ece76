//! Logging facilities for macrokit.
//!
//! macrokit uses the `tracing` crate for instrumentation and never installs a
//! subscriber itself. To see logs, install one in the host application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("macrokit=debug,macrokit_core=info")
//!     .init();
//! ```
//!
//! Every subsystem logs to a fixed target listed in [`targets`], so filters
//! can be scoped to, say, only the undo history or only the store.

/// Span names used throughout macrokit for tracing.
pub mod span_names {
    /// Event dispatch span.
    pub const EVENT: &str = "macrokit::event";
    /// Snapshot serialization span.
    pub const SERIALIZE: &str = "macrokit::serialize";
    /// Store I/O span.
    pub const STORE: &str = "macrokit::store";
}

/// Target names for log filtering.
pub mod targets {
    /// Core crate target.
    pub const CORE: &str = "macrokit_core";
    /// Signal/slot target.
    pub const SIGNAL: &str = "macrokit_core::signal";
    /// Typed event broker target.
    pub const EVENT: &str = "macrokit_core::event";
    /// Tree model target.
    pub const TREE: &str = "macrokit::tree";
    /// Undo/redo history target.
    pub const HISTORY: &str = "macrokit::history";
    /// Persistence target.
    pub const STORE: &str = "macrokit::store";
    /// View-model target.
    pub const VIEW_MODEL: &str = "macrokit::view_model";
    /// Configuration target.
    pub const SETTINGS: &str = "macrokit::settings";
    /// Performance spans.
    pub const PERF: &str = "macrokit::perf";
}

/// A guard that keeps a tracing span entered until dropped.
///
/// Useful for timing operations such as full-tree serialization or store I/O.
#[derive(Debug)]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create and enter a new performance span.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: targets::PERF, "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}
