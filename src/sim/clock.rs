use crate::sim::types::SimulationTiming;

/// A simulation clock walking the ticks of a [`SimulationTiming`].
///
/// # Examples
///
/// ```
/// use hems_sched::sim::clock::Clock;
/// use hems_sched::sim::types::SimulationTiming;
///
/// let mut clock = Clock::new(SimulationTiming::new(100, 60, 280).unwrap());
/// let mut ticks = Vec::new();
///
/// clock.run(|t| ticks.push(t));
/// assert_eq!(ticks, vec![100, 160, 220]);
/// ```
#[derive(Debug, Clone)]
pub struct Clock {
    timing: SimulationTiming,
    /// Index of the next tick
    current: usize,
    total: usize,
}

impl Clock {
    pub fn new(timing: SimulationTiming) -> Self {
        Self {
            timing,
            current: 0,
            total: timing.total_steps(),
        }
    }

    /// Advances the clock by one step.
    ///
    /// # Returns
    ///
    /// * `Some(time)` - Absolute time of the tick just entered
    /// * `None` - If the horizon has been covered
    pub fn tick(&mut self) -> Option<i64> {
        if self.current < self.total {
            let time = self.timing.tick(self.current);
            self.current += 1;
            Some(time)
        } else {
            None
        }
    }

    /// Ticks taken so far.
    pub fn elapsed_steps(&self) -> usize {
        self.current
    }

    pub fn is_done(&self) -> bool {
        self.current >= self.total
    }

    /// Runs a function for each remaining tick.
    pub fn run(&mut self, mut f: impl FnMut(i64)) {
        while let Some(time) = self.tick() {
            f(time);
        }
    }
}
