use hashbrown::HashMap;

use crate::models::{BuffInterval, EntityBuffs};

#[derive(Debug, Default, Clone)]
pub struct BuffTracker {
    buffs: HashMap<(i64, i32), Vec<BuffInterval>>,
}

impl BuffTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.buffs.is_empty()
    }

    /// Opens an interval, or refreshes the stack count of the one already open.
    pub fn apply(&mut self, entity_id: i64, buff_id: i32, stack_count: i32, timestamp_ms: i64) {
        let intervals = self.buffs.entry((entity_id, buff_id)).or_default();

        match intervals.last_mut() {
            Some(open) if open.end_ms.is_none() => open.stack_count = stack_count,
            _ => intervals.push(BuffInterval {
                start_ms: timestamp_ms,
                end_ms: None,
                duration_ms: 0,
                stack_count,
            }),
        }
    }

    pub fn remove(&mut self, entity_id: i64, buff_id: i32, timestamp_ms: i64) {
        if let Some(open) = self
            .buffs
            .get_mut(&(entity_id, buff_id))
            .and_then(|intervals| intervals.last_mut())
            .filter(|interval| interval.end_ms.is_none())
        {
            close(open, timestamp_ms);
        }
    }

    pub fn close_all(&mut self, timestamp_ms: i64) {
        for interval in self.buffs.values_mut().flat_map(|intervals| intervals.iter_mut()) {
            if interval.end_ms.is_none() {
                close(interval, timestamp_ms);
            }
        }
    }

    /// Sorted view; open intervals report their duration up to `until_ms`.
    pub fn snapshot(&self, until_ms: i64) -> Vec<EntityBuffs> {
        let mut buffs: Vec<EntityBuffs> = self
            .buffs
            .iter()
            .map(|(&(entity_id, buff_id), intervals)| EntityBuffs {
                entity_id,
                buff_id,
                intervals: intervals
                    .iter()
                    .map(|interval| match interval.end_ms {
                        Some(_) => interval.clone(),
                        None => BuffInterval {
                            duration_ms: (until_ms - interval.start_ms).max(0),
                            ..interval.clone()
                        },
                    })
                    .collect(),
            })
            .collect();

        buffs.sort_by_key(|buff| (buff.entity_id, buff.buff_id));
        buffs
    }
}

fn close(interval: &mut BuffInterval, timestamp_ms: i64) {
    let end_ms = timestamp_ms.max(interval.start_ms);
    interval.end_ms = Some(end_ms);
    interval.duration_ms = end_ms - interval.start_ms;
}
