/// A month clock that walks a trial from the epoch to its horizon.
///
/// Month 0 is the simulation epoch; the clock yields `0..=horizon` in
/// strictly increasing order so that feedback computed in one month is
/// visible before the next begins.
///
/// # Examples
///
/// ```
/// use vaccine_sim::sim::clock::MonthClock;
///
/// let mut clock = MonthClock::new(2);
/// let mut months = Vec::new();
///
/// clock.run(|month| months.push(month));
/// assert_eq!(months, vec![0, 1, 2]);
/// ```
pub struct MonthClock {
    /// Next month to hand out.
    current: u32,
    /// Last month (inclusive).
    horizon: u32,
    finished: bool,
}

impl MonthClock {
    /// Creates a clock covering months `0..=horizon`.
    pub fn new(horizon: u32) -> Self {
        Self {
            current: 0,
            horizon,
            finished: false,
        }
    }

    /// Advances the clock by one month.
    ///
    /// # Returns
    ///
    /// * `Some(month)` - The month to simulate
    /// * `None` - Once the horizon has been handed out
    pub fn tick(&mut self) -> Option<u32> {
        if self.finished {
            return None;
        }
        let month = self.current;
        if month >= self.horizon {
            self.finished = true;
        } else {
            self.current += 1;
        }
        Some(month)
    }

    /// Runs `f` for each remaining month.
    pub fn run(&mut self, mut f: impl FnMut(u32)) {
        while let Some(month) = self.tick() {
            f(month);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick() {
        let mut clock = MonthClock::new(1);
        assert_eq!(clock.tick(), Some(0));
        assert_eq!(clock.tick(), Some(1));
        assert_eq!(clock.tick(), None);
    }

    #[test]
    fn test_zero_horizon_yields_epoch_only() {
        let mut clock = MonthClock::new(0);
        let mut calls = Vec::new();
        clock.run(|m| calls.push(m));
        assert_eq!(calls, vec![0]);
    }
}
