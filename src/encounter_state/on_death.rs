use crate::models::*;

use super::{EncounterState, EventOutcome};

impl EncounterState {
    /// Deaths outside an encounter only refresh the registry.
    pub fn on_death(&mut self, now_ms: i64, event: &DeathEvent) -> EventOutcome {
        let mut outcome = EventOutcome::default();
        let Some(actor) = event.actor else {
            return outcome;
        };
        let timestamp_ms = event.timestamp_ms;

        let is_boss = self.write_registry().touch(actor.id, actor.kind, timestamp_ms).is_boss;

        if self.encounter.is_none() {
            return outcome;
        }

        let actor = self.resolve(&actor);
        let seq = self.next_seq();
        let encounter = self.begin_combat_event(timestamp_ms, now_ms);

        let resolved = ResolvedEvent {
            seq,
            timestamp_ms,
            attempt_index: encounter.segmenter.attempt_index(),
            phase_id: encounter.segmenter.current_phase_id(),
            kind: ResolvedKind::Death { actor },
        };
        encounter.aggregator.apply(&resolved);
        outcome.split = encounter.segmenter.on_death(timestamp_ms, &actor);

        if is_boss {
            outcome.defeated_boss = self.defeat_boss(timestamp_ms, actor.id);
        }

        outcome
    }

    pub fn on_revive(&mut self, now_ms: i64, event: &ReviveEvent) -> EventOutcome {
        let Some(actor) = event.actor else {
            return EventOutcome::default();
        };
        let timestamp_ms = event.timestamp_ms;

        self.write_registry().touch(actor.id, actor.kind, timestamp_ms);

        if self.encounter.is_none() {
            return EventOutcome::default();
        }

        let actor = self.resolve(&actor);
        let seq = self.next_seq();
        let encounter = self.begin_combat_event(timestamp_ms, now_ms);

        let resolved = ResolvedEvent {
            seq,
            timestamp_ms,
            attempt_index: encounter.segmenter.attempt_index(),
            phase_id: encounter.segmenter.current_phase_id(),
            kind: ResolvedKind::Revive { actor },
        };
        encounter.aggregator.apply(&resolved);
        encounter.segmenter.on_revive(&actor);

        EventOutcome::default()
    }
}
