use crate::models::{Attempt, HitCells, HitRecord};

/// Append-only log of individual hits for one (source, target, skill) rollup.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct HitLog {
    records: Vec<HitRecord>,
}

impl HitLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<HitRecord>) -> Self {
        Self { records }
    }

    pub fn push(&mut self, record: HitRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[HitRecord] {
        &self.records
    }

    pub fn within<'a>(&'a self, attempt: &'a Attempt) -> impl Iterator<Item = &'a HitRecord> + 'a {
        self.records.iter().filter(move |record| belongs_to(record, attempt))
    }

    /// Re-aggregates the hits that belong to `attempt`.
    pub fn replay(&self, attempt: &Attempt) -> HitCells {
        let mut cells = HitCells::default();

        for record in self.within(attempt) {
            cells.record(record.value, record.is_crit, record.is_lucky);
        }

        cells
    }
}

/// Hits stamped with an attempt index match on it; unstamped hits fall back to the time range.
pub fn belongs_to(record: &HitRecord, attempt: &Attempt) -> bool {
    match record.attempt_index {
        Some(index) => index == attempt.index,
        None => attempt.contains(record.timestamp_ms),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AttemptReason;

    fn hit(timestamp_ms: i64, value: i64, attempt_index: Option<u32>) -> HitRecord {
        HitRecord { timestamp_ms, value, is_crit: value > 150, is_lucky: false, attempt_index }
    }

    fn attempt(index: u32, started_at_ms: i64, ended_at_ms: i64) -> Attempt {
        Attempt {
            index,
            started_at_ms,
            ended_at_ms: Some(ended_at_ms),
            reason: AttemptReason::Manual,
            ..Default::default()
        }
    }

    #[test]
    fn should_replay_by_attempt_index() {
        let log = HitLog::from_records(vec![
            hit(1_000, 100, Some(1)),
            hit(2_000, 200, Some(1)),
            hit(2_000, 50, Some(2)),
        ]);

        let first = log.replay(&attempt(1, 0, 2_000));
        let second = log.replay(&attempt(2, 2_000, 3_000));

        assert_eq!(first.total, 300);
        assert_eq!(first.hits, 2);
        assert_eq!(first.crit_hits, 1);
        assert_eq!(second.total, 50);
    }

    #[test]
    fn should_fall_back_to_time_range_for_unstamped_hits() {
        let log = HitLog::from_records(vec![
            hit(500, 10, None),
            hit(1_500, 20, None),
        ]);

        assert_eq!(log.replay(&attempt(1, 0, 1_000)).total, 10);
        assert_eq!(log.replay(&attempt(2, 1_000, 2_000)).total, 20);
    }
}
