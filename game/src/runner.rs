use std::time::{Duration, Instant};

use engine::scheduler::DISPLAY_REFRESH;
use engine::{LandmarkSource, Profiler, Scheduler, TaskTimings};

use crate::app::{App, AppError, Command, DELIVERY_TASK, Feature};
use crate::frame_budget::FrameBudget;

/// Drives an [`App`] and its sources on the scheduler's virtual clock.
///
/// Each step pumps every source up to the step's end, hands the newest
/// deliveries to the app, then fires the scheduled callbacks.
pub struct Runner {
    app: App,
    sched: Scheduler,
    sources: Vec<Box<dyn LandmarkSource>>,
    budget: FrameBudget,
    step: Duration,
}

impl Runner {
    pub fn new(app: App, budget: FrameBudget) -> Self {
        Self {
            app,
            sched: Scheduler::new(),
            sources: Vec::new(),
            budget,
            step: DISPLAY_REFRESH,
        }
    }

    pub fn attach(&mut self, feature: Feature, mut source: Box<dyn LandmarkSource>) {
        self.app.connect(feature, source.as_mut());
        self.sources.push(source);
    }

    pub fn apply(&mut self, command: Command) -> Result<(), AppError> {
        self.app.apply(&mut self.sched, command)
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.sched
    }

    pub fn budget(&self) -> &FrameBudget {
        &self.budget
    }

    pub fn now(&self) -> Duration {
        self.sched.now()
    }

    /// Advances the clock to `until`, or until `done` reports true between steps.
    pub fn run_until<F>(&mut self, until: Duration, mut done: F) -> Duration
    where
        F: FnMut(&App) -> bool,
    {
        while self.sched.now() < until && !done(&self.app) {
            let next = (self.sched.now() + self.step).min(until);
            for source in self.sources.iter_mut() {
                source.pump(next);
            }
            let start = Instant::now();
            self.app.process_deliveries(&mut self.sched);
            self.budget.on_task(
                DELIVERY_TASK,
                TaskTimings {
                    at: next,
                    elapsed: start.elapsed(),
                },
            );

            let app = &mut self.app;
            self.sched
                .run_until_profiled(next, |fired| app.on_task(fired), &mut self.budget);
        }
        self.sched.now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo;
    use crate::exercise::Exercise;
    use crate::high_score::HighScoreStore;
    use crate::session::SessionState;
    use crate::settings::Settings;

    #[test]
    fn coach_session_runs_to_completion_on_the_virtual_clock() {
        let app = App::new(Settings::default(), HighScoreStore::in_memory());
        let mut runner = Runner::new(app, FrameBudget::default());
        runner.attach(Feature::Coach, Box::new(demo::coach_source(Exercise::CatCow, 50)));
        runner.apply(Command::StartSession(Exercise::CatCow)).expect("start");

        let stopped_at = runner.run_until(Duration::from_secs(60), |app| {
            app.session().state == SessionState::Complete
        });

        assert!(stopped_at >= Duration::from_secs(45));
        assert!(stopped_at < Duration::from_secs(45) + DISPLAY_REFRESH);
        let view = runner.app().coach_view();
        assert_eq!(view.time_remaining_secs, 0);
        assert!(view.rep_count >= 14, "reps: {}", view.rep_count);
        assert!(runner.budget().task(crate::app::TIMER_TASK).is_some());
        assert!(runner.budget().task(DELIVERY_TASK).is_some_and(|t| t.runs > 0));
    }
}
