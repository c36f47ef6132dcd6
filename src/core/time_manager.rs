use std::time::Instant;

pub struct TimeManager {
    instant: Instant,
    delta: f32,
}

impl TimeManager {
    pub fn new() -> TimeManager {
        TimeManager {
            instant: Instant::now(),
            delta: 0.0,
        }
    }

    pub fn update(&mut self) {
        let last_instant = self.instant;
        self.instant = Instant::now();
        self.delta = self.instant.duration_since(last_instant).as_secs_f32();
    }

    /// Seconds elapsed between the last two updates.
    pub fn delta(&self) -> f32 {
        self.delta
    }
}
