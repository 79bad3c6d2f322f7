//! Dual-rate scheduler: independent fixed-period physics and render
//! clocks advanced against one wall-clock timeline.
//!
//! Physics catches up (several steps per poll, bounded) so the control
//! period stays fixed regardless of frame time; rendering runs a single
//! check per poll and simply degrades under load.

/// What one scheduler poll decided to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickPlan {
    /// Physics steps due this poll, at most the catch-up cap.
    pub physics_steps: u32,
    /// Whether a render frame is due.
    pub render: bool,
}

/// Two independent `(next target time, period)` clocks.
pub struct DualRateScheduler {
    physics_period: f64,
    render_period: f64,
    max_catchup: u32,
    next_physics: f64,
    next_render: f64,
}

impl DualRateScheduler {
    /// Rates in Hz. `max_catchup` bounds physics steps per poll so a long
    /// stall cannot block the loop indefinitely.
    pub fn new(physics_rate: f64, render_rate: f64, max_catchup: u32) -> Self {
        Self {
            physics_period: 1.0 / physics_rate,
            render_period: 1.0 / render_rate,
            max_catchup,
            next_physics: f64::INFINITY,
            next_render: f64::INFINITY,
        }
    }

    /// Restart both clocks: the first physics step and render frame come
    /// due one period after `now`.
    pub fn align(&mut self, now: f64) {
        self.next_physics = now + self.physics_period;
        self.next_render = now + self.render_period;
    }

    pub fn physics_period(&self) -> f64 {
        self.physics_period
    }

    /// Advance both clocks to `now` and report what is due.
    pub fn poll(&mut self, now: f64) -> TickPlan {
        let mut physics_steps = 0;
        while now > self.next_physics {
            if physics_steps == self.max_catchup {
                // Drop the backlog rather than blocking the loop.
                let behind = now - self.next_physics;
                tracing::warn!(
                    behind_s = behind,
                    "physics backlog dropped after catch-up cap"
                );
                self.next_physics = now + self.physics_period;
                break;
            }
            physics_steps += 1;
            self.next_physics += self.physics_period;
        }

        // Single check: render cadence never multiply-catches-up.
        let render = now > self.next_render;
        if render {
            self.next_render += self.render_period;
        }

        TickPlan {
            physics_steps,
            render,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hundred_hz_physics_thirty_hz_render_at_35ms_polls() {
        let mut scheduler = DualRateScheduler::new(100.0, 30.0, 100);
        scheduler.align(0.0);

        // Wall clock 0.035s ahead: exactly 3 physics steps are due
        // (0.01, 0.02, 0.03) and render at most once.
        let plan = scheduler.poll(0.035);
        assert_eq!(plan.physics_steps, 3);
        assert!(plan.render);

        // Steady state: the clock gains 3.5 physics periods per poll, so
        // catch-up alternates between 3 and 4 steps and stays in lock-step
        // with the wall clock; no poll ever renders twice.
        let mut total = 3;
        for i in 2..=20 {
            let plan = scheduler.poll(i as f64 * 0.035);
            assert!(plan.physics_steps == 3 || plan.physics_steps == 4, "poll {}", i);
            total += plan.physics_steps;
        }
        // 0.7s of wall time at 100 Hz, minus the one period of headroom
        // from alignment.
        assert!((69..=70).contains(&total));
    }

    #[test]
    fn no_steps_due_before_the_first_period() {
        let mut scheduler = DualRateScheduler::new(100.0, 30.0, 8);
        scheduler.align(10.0);
        let plan = scheduler.poll(10.005);
        assert_eq!(plan.physics_steps, 0);
        assert!(!plan.render);
    }

    #[test]
    fn catchup_is_capped_and_backlog_dropped() {
        let mut scheduler = DualRateScheduler::new(100.0, 30.0, 8);
        scheduler.align(0.0);

        // One-second stall: a hundred steps owed, only the cap runs.
        let plan = scheduler.poll(1.0);
        assert_eq!(plan.physics_steps, 8);

        // The backlog is gone: the next step comes due a period later.
        let plan = scheduler.poll(1.005);
        assert_eq!(plan.physics_steps, 0);
        let plan = scheduler.poll(1.011);
        assert_eq!(plan.physics_steps, 1);
    }

    #[test]
    fn render_never_runs_twice_per_poll() {
        let mut scheduler = DualRateScheduler::new(100.0, 30.0, 1000);
        scheduler.align(0.0);

        // After a stall many frames are owed, but each poll renders once.
        let plan = scheduler.poll(1.0);
        assert!(plan.render);
        let plan = scheduler.poll(1.001);
        assert!(plan.render);
    }
}
