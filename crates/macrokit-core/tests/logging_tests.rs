//! Tests for what the core crate logs.

use std::io;
use std::sync::Arc;

use macrokit_core::{Event, EventManager, PerfSpan, Signal};
use parking_lot::Mutex;

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn capture<R>(filter: &str, body: impl FnOnce() -> R) -> (R, String) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let result = tracing::subscriber::with_default(subscriber, body);
    (result, logs.text())
}

#[derive(Clone, Debug)]
struct Tick;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct TickKind;

impl Event for Tick {
    type Kind = TickKind;

    fn kind(&self) -> TickKind {
        TickKind
    }
}

#[test]
fn test_subscriber_panic_is_logged_at_error() {
    let ((), logs) = capture("macrokit_core=error", || {
        let events = EventManager::<Tick>::new();
        events.subscribe(TickKind, |_| panic!("boom"));
        events.notify(Tick);
    });

    assert!(logs.contains("ERROR"), "{logs}");
    assert!(logs.contains("event subscriber panicked"), "{logs}");
    assert!(logs.contains("macrokit_core::event"), "{logs}");
}

#[test]
fn test_signal_dispatch_logs_at_trace() {
    let ((), logs) = capture("macrokit_core::signal=trace", || {
        let signal = Signal::<u8>::new();
        signal.connect(|_| {});
        signal.emit(1);
    });

    assert!(logs.contains("emitting signal"), "{logs}");
    assert!(logs.contains("connection_count=1"), "{logs}");
}

#[test]
fn test_filtered_out_targets_stay_quiet() {
    let ((), logs) = capture("macrokit_core=warn", || {
        let signal = Signal::<u8>::new();
        signal.emit(1);
        let _span = PerfSpan::new("quiet");
    });

    assert!(logs.is_empty(), "{logs}");
}
