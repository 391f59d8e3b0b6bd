//! Step reporting capability
//!
//! Callers that compose the core components report progress through a
//! [`Reporter`] handed to them explicitly. The components themselves never
//! report anything.

/// Receives progress of a multi-step operation
pub trait Reporter {
    /// A new step starts
    fn step(&mut self, name: &str);

    /// Informational message within the current step
    fn info(&mut self, message: &str);

    /// The current step finished successfully
    fn success(&mut self, message: &str);

    /// The current step failed
    fn failure(&mut self, message: &str);
}

/// Reporter that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl Reporter for NoopReporter {
    fn step(&mut self, _name: &str) {}
    fn info(&mut self, _message: &str) {}
    fn success(&mut self, _message: &str) {}
    fn failure(&mut self, _message: &str) {}
}

/// One event recorded by [`RecordingReporter`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEvent {
    Step(String),
    Info(String),
    Success(String),
    Failure(String),
}

/// Reporter that keeps every event, useful for tests and JSON output
#[derive(Debug, Default, Clone)]
pub struct RecordingReporter {
    pub events: Vec<ReportEvent>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the steps started, in order
    pub fn steps(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ReportEvent::Step(name) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn has_failure(&self) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e, ReportEvent::Failure(_)))
    }
}

impl Reporter for RecordingReporter {
    fn step(&mut self, name: &str) {
        self.events.push(ReportEvent::Step(name.to_string()));
    }

    fn info(&mut self, message: &str) {
        self.events.push(ReportEvent::Info(message.to_string()));
    }

    fn success(&mut self, message: &str) {
        self.events.push(ReportEvent::Success(message.to_string()));
    }

    fn failure(&mut self, message: &str) {
        self.events.push(ReportEvent::Failure(message.to_string()));
    }
}
