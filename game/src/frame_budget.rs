use std::collections::BTreeMap;

use engine::{Profiler, TaskTimings};
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BudgetThreshold {
    pub warn_ms: f64,
    pub critical_ms: f64,
}

impl BudgetThreshold {
    pub const fn new(warn_ms: f64, critical_ms: f64) -> Self {
        Self {
            warn_ms,
            critical_ms,
        }
    }

    fn is_valid(self) -> bool {
        self.warn_ms.is_finite()
            && self.critical_ms.is_finite()
            && self.warn_ms > 0.0
            && self.warn_ms < self.critical_ms
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(mut lookup: F) -> Self
    where
        F: FnMut(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let warn_ms = parse_override_ms(lookup("KINETIC_BUDGET_WARN_MS")).unwrap_or(defaults.warn_ms);
        let critical_ms =
            parse_override_ms(lookup("KINETIC_BUDGET_CRIT_MS")).unwrap_or(defaults.critical_ms);
        let threshold = Self::new(warn_ms, critical_ms);
        if threshold.is_valid() { threshold } else { defaults }
    }
}

impl Default for BudgetThreshold {
    /// Half a 60 Hz frame to warn, a whole one to flag critical.
    fn default() -> Self {
        Self::new(8.0, 16.0)
    }
}

fn parse_override_ms(raw: Option<String>) -> Option<f64> {
    raw.and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|value| value.is_finite() && *value > 0.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    #[default]
    Ok,
    Warn,
    Critical,
}

pub fn classify(elapsed_ms: f64, threshold: BudgetThreshold) -> BudgetStatus {
    if elapsed_ms > threshold.critical_ms {
        BudgetStatus::Critical
    } else if elapsed_ms > threshold.warn_ms {
        BudgetStatus::Warn
    } else {
        BudgetStatus::Ok
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct TaskBudget {
    pub runs: u64,
    pub over_warn: u64,
    pub over_critical: u64,
    pub max_ms: f64,
    pub total_ms: f64,
}

impl TaskBudget {
    fn observe(&mut self, elapsed_ms: f64, status: BudgetStatus) {
        self.runs += 1;
        self.total_ms += elapsed_ms;
        self.max_ms = self.max_ms.max(elapsed_ms);
        if status >= BudgetStatus::Warn {
            self.over_warn += 1;
        }
        if status == BudgetStatus::Critical {
            self.over_critical += 1;
        }
    }
}

/// Per-callback timing tallies, fed by the scheduler's profiler hook.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FrameBudget {
    pub threshold: BudgetThreshold,
    pub tasks: BTreeMap<&'static str, TaskBudget>,
}

impl FrameBudget {
    pub fn new(threshold: BudgetThreshold) -> Self {
        Self {
            threshold,
            tasks: BTreeMap::new(),
        }
    }

    pub fn task(&self, name: &str) -> Option<&TaskBudget> {
        self.tasks.get(name)
    }

    pub fn worst_status(&self) -> BudgetStatus {
        self.tasks
            .values()
            .map(|t| classify(t.max_ms, self.threshold))
            .max()
            .unwrap_or_default()
    }
}

impl Profiler for FrameBudget {
    fn on_task(&mut self, name: &'static str, timings: TaskTimings) {
        let elapsed_ms = timings.elapsed.as_secs_f64() * 1000.0;
        let status = classify(elapsed_ms, self.threshold);
        if status == BudgetStatus::Critical {
            warn!(task = name, elapsed_ms, "callback exceeded frame budget");
        }
        self.tasks.entry(name).or_default().observe(elapsed_ms, status);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn classify_returns_ok_warn_and_critical() {
        let threshold = BudgetThreshold::new(10.0, 20.0);
        assert_eq!(classify(9.0, threshold), BudgetStatus::Ok);
        assert_eq!(classify(10.5, threshold), BudgetStatus::Warn);
        assert_eq!(classify(25.0, threshold), BudgetStatus::Critical);
    }

    #[test]
    fn profiler_hook_tallies_per_task() {
        let mut budget = FrameBudget::new(BudgetThreshold::new(10.0, 20.0));
        for ms in [5, 12, 30] {
            budget.on_task(
                "render",
                TaskTimings {
                    at: Duration::ZERO,
                    elapsed: Duration::from_millis(ms),
                },
            );
        }
        let render = budget.task("render").expect("render tallied");
        assert_eq!(render.runs, 3);
        assert_eq!(render.over_warn, 2);
        assert_eq!(render.over_critical, 1);
        assert!((render.max_ms - 30.0).abs() < 1e-9);
        assert_eq!(budget.worst_status(), BudgetStatus::Critical);
    }

    #[test]
    fn env_override_invalid_values_fall_back_to_defaults() {
        let cfg = BudgetThreshold::from_lookup(|key| match key {
            "KINETIC_BUDGET_WARN_MS" => Some("12".to_string()),
            "KINETIC_BUDGET_CRIT_MS" => Some("11".to_string()),
            _ => None,
        });
        assert_eq!(cfg, BudgetThreshold::default());

        let cfg = BudgetThreshold::from_lookup(|key| match key {
            "KINETIC_BUDGET_WARN_MS" => Some("4.5".to_string()),
            _ => None,
        });
        assert_eq!(cfg, BudgetThreshold::new(4.5, 16.0));
    }
}
