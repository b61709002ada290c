//! Attempt budget for the retry engine

/// Number of attempts a call may still make.
///
/// Every attempt consumes one credit, rate-limited ones included. A
/// decision hook may restore the full budget once it runs out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RetryBudget {
    max_attempts: u32,
    remaining: u32,
}

impl RetryBudget {
    pub(crate) fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            remaining: max_attempts,
        }
    }

    pub(crate) fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Take one credit; returns the 1-based attempt number within the
    /// current budget
    pub(crate) fn consume(&mut self) -> u32 {
        self.remaining = self.remaining.saturating_sub(1);
        self.max_attempts - self.remaining
    }

    /// Restore the full budget; a zero budget is renewed with one attempt
    pub(crate) fn reset(&mut self) {
        self.remaining = self.max_attempts.max(1);
    }

    pub(crate) fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_consumption() {
        let mut budget = RetryBudget::new(2);
        assert!(!budget.is_exhausted());
        assert_eq!(budget.consume(), 1);
        assert_eq!(budget.consume(), 2);
        assert!(budget.is_exhausted());

        budget.reset();
        assert!(!budget.is_exhausted());
        assert_eq!(budget.max_attempts(), 2);
    }

    #[test]
    fn test_zero_budget_is_exhausted() {
        let mut budget = RetryBudget::new(0);
        assert!(budget.is_exhausted());

        budget.reset();
        assert!(!budget.is_exhausted());
        budget.consume();
        assert!(budget.is_exhausted());
    }
}
