use serde::{Deserialize, Serialize};

/// Whole-second countdown for time boxed sessions.
///
/// Ticks are driven from outside (one per elapsed second); once the
/// countdown hits zero further ticks are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoundTimer {
    limit_secs: u32,
    elapsed_secs: u32,
}

impl RoundTimer {
    pub fn new(limit_secs: u32) -> Self {
        Self {
            limit_secs,
            elapsed_secs: 0,
        }
    }

    pub fn limit_secs(&self) -> u32 {
        self.limit_secs
    }

    pub fn elapsed_secs(&self) -> u32 {
        self.elapsed_secs
    }

    pub fn remaining_secs(&self) -> u32 {
        self.limit_secs.saturating_sub(self.elapsed_secs)
    }

    pub fn is_up(&self) -> bool {
        self.elapsed_secs >= self.limit_secs
    }

    /// Advances one second. Returns `true` on the tick that runs the clock out.
    pub fn tick(&mut self) -> bool {
        if self.is_up() {
            return false;
        }
        self.elapsed_secs += 1;
        self.is_up()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_reports_up_exactly_at_limit() {
        let mut t = RoundTimer::new(3);
        assert_eq!(t.remaining_secs(), 3);
        assert!(!t.tick());
        assert!(!t.tick());
        assert!(t.tick());
        assert!(t.is_up());
        assert_eq!(t.remaining_secs(), 0);

        // Once up, it stays up and doesn't keep accumulating.
        assert!(!t.tick());
        assert_eq!(t.elapsed_secs(), 3);
    }

    #[test]
    fn zero_limit_is_up_immediately() {
        let mut t = RoundTimer::new(0);
        assert!(t.is_up());
        assert!(!t.tick());
    }
}
