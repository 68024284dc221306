use serde::{Deserialize, Serialize};

pub const MIN_QUESTIONS: usize = 10;
pub const MAX_ATTEMPTS: i64 = 3;
pub const TIME_LIMIT_MINUTES: i64 = 30;
pub const PASS_THRESHOLD_PERCENT: u32 = 70;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TestOutcome {
    pub correct: usize,
    pub total: usize,
    pub percent: f64,
    pub passed: bool,
}

/// Grade an attempt against the pass threshold. Integer arithmetic decides
/// the pass so a 7/10 lands exactly on the 70% boundary.
pub fn grade(correct: usize, total: usize) -> TestOutcome {
    let passed = total > 0 && correct * 100 >= total * PASS_THRESHOLD_PERCENT as usize;
    let percent = if total > 0 {
        correct as f64 * 100.0 / total as f64
    } else {
        0.0
    };
    TestOutcome {
        correct,
        total,
        percent,
        passed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seventy_percent_passes() {
        assert!(grade(7, 10).passed);
        assert!(grade(10, 10).passed);
    }

    #[test]
    fn below_seventy_fails() {
        assert!(!grade(6, 10).passed);
        assert!(!grade(0, 10).passed);
    }

    #[test]
    fn boundary_without_rounding_drift() {
        // 14/20 is exactly 70%
        assert!(grade(14, 20).passed);
        assert!(!grade(13, 20).passed);
    }

    #[test]
    fn empty_attempt_fails() {
        assert!(!grade(0, 0).passed);
    }
}
