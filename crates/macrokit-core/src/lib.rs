//! Core systems for macrokit.
//!
//! This crate provides the domain-independent plumbing the macro model is
//! built on:
//!
//! - **Signal/Slot System**: [`Signal`], ordered synchronous callbacks
//! - **Event Broker**: [`EventManager`], typed pub/sub keyed by event kind
//! - **Logging**: tracing targets and [`PerfSpan`]
//!
//! # Signal/Slot Example
//!
//! ```
//! use macrokit_core::Signal;
//!
//! let history_changed = Signal::<(bool, bool)>::new();
//!
//! let conn_id = history_changed.connect(|(can_undo, can_redo)| {
//!     println!("undo: {can_undo}, redo: {can_redo}");
//! });
//!
//! history_changed.emit((true, false));
//! history_changed.disconnect(conn_id);
//! ```

pub mod event;
pub mod logging;
pub mod signal;

pub use event::{Event, EventManager};
pub use logging::PerfSpan;
pub use signal::{ConnectionGuard, ConnectionId, Signal};
