use std::time::Duration;
use tokio::time::Instant;

/// Time allocation for a multi-candidate search.
///
/// The total is split evenly across all attempts, each share floored at
/// `min_attempt`. Remaining time is recomputed from a single start instant on
/// every attempt, so a slow early candidate shrinks what later ones get.
///
/// The floor wins over the remaining budget: when fewer than `min_attempt`
/// milliseconds are left, the next attempt still gets `min_attempt`, and the
/// search as a whole may overrun the total by up to one floor.
#[derive(Debug, Clone)]
pub struct SearchBudget {
    total: Duration,
    min_attempt: Duration,
    per_attempt: Duration,
    started: Instant,
}

impl SearchBudget {
    pub fn start(total: Duration, attempts: usize, min_attempt: Duration) -> Self {
        let share = match u32::try_from(attempts) {
            Ok(0) => total,
            Ok(n) => total / n,
            Err(_) => Duration::ZERO,
        };
        Self {
            total,
            min_attempt,
            per_attempt: share.max(min_attempt),
            started: Instant::now(),
        }
    }

    pub fn total(&self) -> Duration {
        self.total
    }

    pub fn per_attempt(&self) -> Duration {
        self.per_attempt
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn remaining(&self) -> Duration {
        self.total.saturating_sub(self.elapsed())
    }

    /// Timeout for the next attempt, or `None` once the budget is spent.
    pub fn next_attempt(&self) -> Option<Duration> {
        let remaining = self.remaining();
        if remaining.is_zero() {
            return None;
        }
        Some(self.per_attempt.min(remaining).max(self.min_attempt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN: Duration = Duration::from_millis(500);

    #[tokio::test(start_paused = true)]
    async fn splits_evenly_above_floor() {
        let budget = SearchBudget::start(Duration::from_millis(6000), 3, MIN);
        assert_eq!(budget.per_attempt(), Duration::from_millis(2000));
        assert_eq!(budget.next_attempt(), Some(Duration::from_millis(2000)));
    }

    #[tokio::test(start_paused = true)]
    async fn floors_small_shares() {
        // 50 candidates over 5s would be 100ms each.
        let budget = SearchBudget::start(Duration::from_millis(5000), 50, MIN);
        assert_eq!(budget.per_attempt(), MIN);
    }

    #[tokio::test(start_paused = true)]
    async fn shrinks_to_remaining_but_not_below_floor() {
        let budget = SearchBudget::start(Duration::from_millis(3000), 1, MIN);
        tokio::time::advance(Duration::from_millis(2200)).await;
        assert_eq!(budget.next_attempt(), Some(Duration::from_millis(800)));

        tokio::time::advance(Duration::from_millis(600)).await;
        assert_eq!(budget.next_attempt(), Some(MIN));

        tokio::time::advance(Duration::from_millis(200)).await;
        assert_eq!(budget.next_attempt(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_attempts_uses_whole_total() {
        let budget = SearchBudget::start(Duration::from_millis(1200), 0, MIN);
        assert_eq!(budget.per_attempt(), Duration::from_millis(1200));
    }
}
