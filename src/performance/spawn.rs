use std::time::{Duration, Instant};

/// Starts simulated users at a fixed rate until the target count is reached.
#[derive(Debug)]
pub struct SpawnSchedule {
    users: u32,
    spawn_rate: f64,
    started: Instant,
}

impl SpawnSchedule {
    pub fn new(users: u32, spawn_rate: f64) -> Self {
        Self {
            users,
            spawn_rate,
            started: Instant::now(),
        }
    }

    pub fn users(&self) -> u32 {
        self.users
    }

    /// Delay after the start of the run at which user `index` is spawned,
    /// or `None` when it does not fit in a `Duration`.
    pub fn try_delay_for(&self, index: u32) -> Option<Duration> {
        Duration::try_from_secs_f64(index as f64 / self.spawn_rate).ok()
    }

    /// Saturates at `Duration::MAX`.
    pub fn delay_for(&self, index: u32) -> Duration {
        self.try_delay_for(index).unwrap_or(Duration::MAX)
    }

    /// Time until the last user has been spawned.
    pub fn ramp_duration(&self) -> Duration {
        self.delay_for(self.users.saturating_sub(1))
    }

    pub fn running_users_at(&self, elapsed: Duration) -> u32 {
        let spawned = (elapsed.as_secs_f64() * self.spawn_rate).floor() as u64 + 1;
        spawned.min(self.users as u64) as u32
    }

    pub fn running_users(&self) -> u32 {
        self.running_users_at(self.started.elapsed())
    }

    pub fn current_phase_description(&self) -> String {
        let running = self.running_users();
        if running < self.users {
            format!("Spawning ({}/{} users)", running, self.users)
        } else {
            format!("All {} users running", self.users)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delays_follow_spawn_rate() {
        let schedule = SpawnSchedule::new(10, 2.0);
        assert_eq!(schedule.delay_for(0), Duration::ZERO);
        assert_eq!(schedule.delay_for(1), Duration::from_millis(500));
        assert_eq!(schedule.delay_for(4), Duration::from_secs(2));
        assert_eq!(schedule.ramp_duration(), Duration::from_millis(4500));
    }

    #[test]
    fn test_delays_are_monotone() {
        let schedule = SpawnSchedule::new(50, 7.5);
        for index in 1..50 {
            assert!(schedule.delay_for(index) >= schedule.delay_for(index - 1));
        }
    }

    #[test]
    fn test_running_users_caps_at_target() {
        let schedule = SpawnSchedule::new(4, 1.0);
        assert_eq!(schedule.running_users_at(Duration::ZERO), 1);
        assert_eq!(schedule.running_users_at(Duration::from_millis(2500)), 3);
        assert_eq!(schedule.running_users_at(Duration::from_secs(60)), 4);
    }

    #[test]
    fn test_tiny_spawn_rate_saturates_instead_of_panicking() {
        let schedule = SpawnSchedule::new(2, 1e-20);
        assert_eq!(schedule.try_delay_for(0), Some(Duration::ZERO));
        assert_eq!(schedule.try_delay_for(1), None);
        assert_eq!(schedule.delay_for(1), Duration::MAX);
        assert_eq!(schedule.running_users_at(Duration::from_secs(3600)), 1);
    }

    #[test]
    fn test_single_user_has_no_ramp() {
        let schedule = SpawnSchedule::new(1, 1.0);
        assert_eq!(schedule.ramp_duration(), Duration::ZERO);
        assert_eq!(schedule.current_phase_description(), "All 1 users running");
    }
}
