use std::time::{Duration, Instant};

use crate::profiling::{Profiler, TaskTimings};

pub const DISPLAY_REFRESH: Duration = Duration::from_micros(16_667);
pub const ONE_SECOND: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

/// What a repeating task wants after it ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskControl {
    Reschedule,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fired {
    pub task: TaskId,
    pub name: &'static str,
    pub at: Duration,
}

#[derive(Debug, Clone)]
struct Task {
    id: TaskId,
    name: &'static str,
    period: Duration,
    next_due: Duration,
}

/// Cooperative single-threaded scheduler on a virtual clock.
///
/// Every task is an independent repeating stream. A stream fires in order
/// of its own due times; different streams interleave by due time, ties
/// broken by registration order. Nothing here blocks: the caller decides
/// how far to advance the clock.
#[derive(Debug, Default)]
pub struct Scheduler {
    now: Duration,
    next_id: u64,
    tasks: Vec<Task>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    /// Registers a task whose first run is one `period` from now.
    pub fn schedule_repeating(&mut self, name: &'static str, period: Duration) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        let period = period.max(Duration::from_micros(1));
        self.tasks.push(Task {
            id,
            name,
            period,
            next_due: self.now.saturating_add(period),
        });
        id
    }

    pub fn cancel(&mut self, id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        before != self.tasks.len()
    }

    pub fn is_scheduled(&self, id: TaskId) -> bool {
        self.tasks.iter().any(|t| t.id == id)
    }

    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    fn next_index(&self) -> Option<usize> {
        self.tasks
            .iter()
            .enumerate()
            .min_by_key(|(_, t)| (t.next_due, t.id))
            .map(|(i, _)| i)
    }

    pub fn next_due(&self) -> Option<Duration> {
        self.next_index().map(|i| self.tasks[i].next_due)
    }

    /// Fires every task due up to and including `until`, then parks the clock there.
    pub fn run_until<F>(&mut self, until: Duration, dispatch: F) -> usize
    where
        F: FnMut(Fired) -> TaskControl,
    {
        self.run_until_profiled(until, dispatch, &mut ())
    }

    pub fn run_until_profiled<F, P>(&mut self, until: Duration, mut dispatch: F, profiler: &mut P) -> usize
    where
        F: FnMut(Fired) -> TaskControl,
        P: Profiler,
    {
        let mut fired = 0;
        while let Some(idx) = self.next_index() {
            let task = &self.tasks[idx];
            if task.next_due > until {
                break;
            }
            let event = Fired {
                task: task.id,
                name: task.name,
                at: task.next_due,
            };
            self.now = event.at;

            let start = Instant::now();
            let control = dispatch(event);
            profiler.on_task(
                event.name,
                TaskTimings {
                    at: event.at,
                    elapsed: start.elapsed(),
                },
            );
            fired += 1;

            match control {
                TaskControl::Reschedule => {
                    let task = &mut self.tasks[idx];
                    task.next_due = task.next_due.saturating_add(task.period);
                }
                TaskControl::Stop => {
                    self.tasks.remove(idx);
                }
            }
        }
        self.now = self.now.max(until);
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interleaves_streams_by_due_time() {
        let mut sched = Scheduler::new();
        let fast = sched.schedule_repeating("fast", Duration::from_millis(300));
        let slow = sched.schedule_repeating("slow", ONE_SECOND);

        let mut order = Vec::new();
        sched.run_until(Duration::from_millis(1000), |f| {
            order.push((f.task, f.at.as_millis()));
            TaskControl::Reschedule
        });

        assert_eq!(
            order,
            vec![(fast, 300), (fast, 600), (fast, 900), (slow, 1000)]
        );
        assert_eq!(sched.now(), Duration::from_millis(1000));
    }

    #[test]
    fn stop_removes_only_that_stream() {
        let mut sched = Scheduler::new();
        let render = sched.schedule_repeating("render", DISPLAY_REFRESH);
        let timer = sched.schedule_repeating("timer", ONE_SECOND);

        let mut render_runs = 0;
        sched.run_until(Duration::from_secs(2), |f| {
            if f.task == render {
                render_runs += 1;
                if render_runs == 3 {
                    return TaskControl::Stop;
                }
            }
            TaskControl::Reschedule
        });

        assert_eq!(render_runs, 3);
        assert!(!sched.is_scheduled(render));
        assert!(sched.is_scheduled(timer));
    }

    #[test]
    fn cancel_prevents_further_runs() {
        let mut sched = Scheduler::new();
        let timer = sched.schedule_repeating("timer", ONE_SECOND);
        sched.run_until(Duration::from_millis(1500), |_| TaskControl::Reschedule);
        assert!(sched.cancel(timer));
        assert!(!sched.cancel(timer));

        let fired = sched.run_until(Duration::from_secs(10), |_| TaskControl::Reschedule);
        assert_eq!(fired, 0);
        assert_eq!(sched.next_due(), None);
    }
}
