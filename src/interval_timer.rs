use chrono::{DateTime, Duration, Utc};

/// Cadence gate for work driven from the engine loop.
pub struct IntervalTimer {
    last_tick: Option<DateTime<Utc>>,
    interval: Duration,
}

impl IntervalTimer {
    pub fn new(interval: std::time::Duration) -> Self {
        Self {
            last_tick: None,
            interval: Duration::from_std(interval).unwrap_or(Duration::zero()),
        }
    }

    pub fn has_elapsed(&mut self, now: DateTime<Utc>) -> bool {
        let elapsed = self.last_tick.is_none_or(|last_tick| now - last_tick >= self.interval);

        if elapsed {
            self.last_tick = Some(now);
        }

        elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_fire_once_per_interval() {
        let mut timer = IntervalTimer::new(std::time::Duration::from_millis(200));
        let now = Utc::now();

        assert!(timer.has_elapsed(now));
        assert!(!timer.has_elapsed(now + Duration::milliseconds(100)));
        assert!(timer.has_elapsed(now + Duration::milliseconds(200)));
    }
}
