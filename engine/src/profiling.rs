use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskTimings {
    /// Virtual time the task was due.
    pub at: Duration,
    /// Wall time spent inside the task callback.
    pub elapsed: Duration,
}

/// Optional hook for capturing per-task dispatch timings.
pub trait Profiler {
    fn on_task(&mut self, _name: &'static str, _timings: TaskTimings) {}
}

impl Profiler for () {}
