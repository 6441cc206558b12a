//! Observational diagnostic lines, injected into the systems that emit them.
//!
//! Nothing in the game reads these lines back; they exist for players and
//! developers watching the session. Every line reaches the `log` facade at
//! debug level; sinks only receive lines when the `diagnostics` feature is
//! enabled.

use std::{
    cell::RefCell,
    collections::VecDeque,
    fmt,
    rc::Rc,
    time::{Duration, Instant},
};

/// Destination for timestamped diagnostic lines.
pub trait DiagnosticSink {
    /// Records a line emitted `elapsed` after the diagnostics handle was created.
    fn record(&self, elapsed: Duration, line: &str);
}

/// Cloneable handle that systems use to emit diagnostic lines.
#[derive(Clone)]
pub struct Diagnostics {
    #[cfg_attr(not(feature = "diagnostics"), allow(dead_code))]
    sink: Option<Rc<dyn DiagnosticSink>>,
    #[cfg_attr(not(feature = "diagnostics"), allow(dead_code))]
    origin: Instant,
}

impl Diagnostics {
    /// Creates a handle that forwards every line to `sink`.
    #[must_use]
    pub fn new(sink: Rc<dyn DiagnosticSink>) -> Self {
        Self {
            sink: Some(sink),
            origin: Instant::now(),
        }
    }

    /// Creates a handle without a sink. Lines still reach the `log` facade.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            sink: None,
            origin: Instant::now(),
        }
    }

    /// Emits a formatted line.
    pub fn emit(&self, line: fmt::Arguments<'_>) {
        log::debug!("{line}");
        #[cfg(feature = "diagnostics")]
        if let Some(sink) = &self.sink {
            sink.record(self.origin.elapsed(), &line.to_string());
        }
        #[cfg(not(feature = "diagnostics"))]
        let _ = line;
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::disabled()
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("enabled", &self.sink.is_some())
            .finish()
    }
}

/// Sink that forwards lines to the `log` facade at info level.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn record(&self, elapsed: Duration, line: &str) {
        log::info!(target: "tactica::diagnostics", "[{:.3}s] {line}", elapsed.as_secs_f32());
    }
}

/// Bounded buffer of the most recent lines, rendered by an on-screen overlay.
#[derive(Debug)]
pub struct OnScreenLog {
    capacity: usize,
    lines: RefCell<VecDeque<String>>,
}

impl OnScreenLog {
    /// Number of lines kept when no capacity is configured.
    pub const DEFAULT_CAPACITY: usize = 32;

    /// Creates a buffer retaining at most `capacity` lines. A zero capacity
    /// is raised to one.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            lines: RefCell::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Lines currently held, oldest first.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().iter().cloned().collect()
    }

    /// Reports whether any retained line contains `needle`.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.borrow().iter().any(|line| line.contains(needle))
    }
}

impl Default for OnScreenLog {
    fn default() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }
}

impl DiagnosticSink for OnScreenLog {
    fn record(&self, elapsed: Duration, line: &str) {
        let mut lines = self.lines.borrow_mut();
        while lines.len() >= self.capacity {
            let _ = lines.pop_front();
        }
        lines.push_back(format!("[{:>7.3}s] {line}", elapsed.as_secs_f32()));
    }
}

/// Sink that copies every line to several sinks in order.
#[derive(Default)]
pub struct FanOut {
    sinks: Vec<Rc<dyn DiagnosticSink>>,
}

impl FanOut {
    /// Creates a fan-out over the provided sinks.
    #[must_use]
    pub fn new(sinks: Vec<Rc<dyn DiagnosticSink>>) -> Self {
        Self { sinks }
    }
}

impl DiagnosticSink for FanOut {
    fn record(&self, elapsed: Duration, line: &str) {
        for sink in &self.sinks {
            sink.record(elapsed, line);
        }
    }
}

#[cfg(all(test, feature = "diagnostics"))]
mod tests {
    use super::*;

    #[test]
    fn on_screen_log_keeps_only_the_latest_lines() {
        let log = Rc::new(OnScreenLog::with_capacity(2));
        let diagnostics = Diagnostics::new(log.clone());

        diagnostics.emit(format_args!("first"));
        diagnostics.emit(format_args!("second"));
        diagnostics.emit(format_args!("third"));

        let lines = log.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("second"));
        assert!(lines[1].ends_with("third"));
        assert!(!log.contains("first"));
    }

    #[test]
    fn on_screen_lines_carry_a_timestamp() {
        let log = Rc::new(OnScreenLog::default());
        let diagnostics = Diagnostics::new(log.clone());

        diagnostics.emit(format_args!("Hello"));

        let lines = log.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with('['), "line should open with a timestamp");
        assert!(lines[0].contains("s] Hello"));
    }

    #[test]
    fn fan_out_copies_lines_to_every_sink() {
        let first = Rc::new(OnScreenLog::default());
        let second = Rc::new(OnScreenLog::default());
        let fan_out = FanOut::new(vec![first.clone(), second.clone()]);
        let diagnostics = Diagnostics::new(Rc::new(fan_out));

        diagnostics.emit(format_args!("Adding command"));

        assert!(first.contains("Adding command"));
        assert!(second.contains("Adding command"));
    }

    struct Captured(std::sync::Mutex<Vec<String>>);

    impl log::Log for Captured {
        fn enabled(&self, _: &log::Metadata<'_>) -> bool {
            true
        }

        fn log(&self, record: &log::Record<'_>) {
            if let Ok(mut lines) = self.0.lock() {
                lines.push(format!("{} {}", record.level(), record.args()));
            }
        }

        fn flush(&self) {}
    }

    static CAPTURED: Captured = Captured(std::sync::Mutex::new(Vec::new()));

    #[test]
    fn disabled_handle_still_reaches_the_log_facade() {
        let _ = log::set_logger(&CAPTURED);
        log::set_max_level(log::LevelFilter::Debug);

        let diagnostics = Diagnostics::disabled();
        diagnostics.emit(format_args!("Still resolving..."));

        assert_eq!(format!("{diagnostics:?}"), "Diagnostics { enabled: false }");
        let lines = CAPTURED.0.lock().expect("captured lines");
        assert!(lines.iter().any(|line| line == "DEBUG Still resolving..."));
    }
}
