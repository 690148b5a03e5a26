use crate::models::*;

use super::{EncounterState, EventOutcome};

impl EncounterState {
    /// Buff intervals are tracked per encounter; changes while idle are dropped.
    pub fn on_buff_applied(&mut self, event: &BuffAppliedEvent) -> EventOutcome {
        if let Some(encounter) = self.encounter.as_mut() {
            encounter.buffs.apply(event.entity_id, event.buff_id, event.stack_count, event.timestamp_ms);
            encounter.last_event_ms = encounter.last_event_ms.max(event.timestamp_ms);
            self.touch();
        }

        EventOutcome::default()
    }

    pub fn on_buff_removed(&mut self, event: &BuffRemovedEvent) -> EventOutcome {
        if let Some(encounter) = self.encounter.as_mut() {
            encounter.buffs.remove(event.entity_id, event.buff_id, event.timestamp_ms);
            encounter.last_event_ms = encounter.last_event_ms.max(event.timestamp_ms);
            self.touch();
        }

        EventOutcome::default()
    }
}
