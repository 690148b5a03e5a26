use crate::models::*;

use super::{EncounterState, EventOutcome};

impl EncounterState {
    pub fn on_heal(&mut self, now_ms: i64, event: &HealEvent) -> EventOutcome {
        let (Some(healer), Some(target)) = (event.healer, event.target) else {
            return EventOutcome::default();
        };
        let timestamp_ms = event.timestamp_ms;

        let target_name = {
            let mut registry = self.write_registry();
            registry.touch(healer.id, healer.kind, timestamp_ms);
            registry.touch(target.id, target.kind, timestamp_ms);
            registry.name_or_placeholder(target.id)
        };

        let healer = self.resolve(&healer);
        let target = self.resolve(&target);
        let seq = self.next_seq();
        let encounter = self.begin_combat_event(timestamp_ms, now_ms);

        encounter.segmenter.track_player(&healer);
        encounter.segmenter.track_target(&target);

        let resolved = ResolvedEvent {
            seq,
            timestamp_ms,
            attempt_index: encounter.segmenter.attempt_index(),
            phase_id: encounter.segmenter.current_phase_id(),
            kind: ResolvedKind::Heal {
                healer,
                target,
                skill_id: event.skill_id,
                value: event.value,
                is_crit: event.is_crit,
                is_lucky: event.is_lucky,
                target_name,
            },
        };
        encounter.aggregator.apply(&resolved);

        EventOutcome::default()
    }
}
