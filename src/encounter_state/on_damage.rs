use crate::models::*;

use super::{EncounterState, EventOutcome};

impl EncounterState {
    pub fn on_damage(&mut self, now_ms: i64, event: &DamageEvent) -> EventOutcome {
        let mut outcome = EventOutcome::default();
        let (Some(attacker), Some(defender)) = (event.attacker, event.defender) else {
            return outcome;
        };
        let timestamp_ms = event.timestamp_ms;

        let (defender_name, is_boss_target) = {
            let mut registry = self.write_registry();
            registry.touch(attacker.id, attacker.kind, timestamp_ms);

            let attrs = EntityAttributes {
                name: event.defender_name.clone(),
                current_hp: event.defender_hp,
                max_hp: event.defender_max_hp,
                is_boss: event.is_boss,
                ..Default::default()
            };
            let is_boss = registry.upsert(defender.id, defender.kind, attrs, timestamp_ms).is_boss;

            (registry.name_or_placeholder(defender.id), is_boss)
        };

        let attacker = self.resolve(&attacker);
        let defender = self.resolve(&defender);
        let seq = self.next_seq();
        let encounter = self.begin_combat_event(timestamp_ms, now_ms);
        let segmenter = &mut encounter.segmenter;

        // rollback check runs before the hit is stamped so it lands in the new attempt
        if let Some(current_hp) = event.defender_hp.filter(|_| is_boss_target) {
            outcome.split = segmenter.observe_boss_hp(timestamp_ms, defender.id, current_hp, event.defender_max_hp);
        }

        segmenter.track_player(&attacker);
        segmenter.track_target(&defender);
        segmenter.on_damage(timestamp_ms, defender.id, is_boss_target);

        let resolved = ResolvedEvent {
            seq,
            timestamp_ms,
            attempt_index: segmenter.attempt_index(),
            phase_id: segmenter.current_phase_id(),
            kind: ResolvedKind::Damage {
                attacker,
                defender,
                skill_id: event.skill_id,
                value: event.value,
                hp_loss: event.hp_loss,
                shield_loss: event.shield_loss,
                is_crit: event.is_crit,
                is_lucky: event.is_lucky,
                is_boss_target,
                defender_name,
                defender_max_hp: event.defender_max_hp,
            },
        };
        encounter.aggregator.apply(&resolved);

        if is_boss_target && event.defender_hp == Some(0) {
            outcome.defeated_boss = self.defeat_boss(timestamp_ms, defender.id);
        }

        outcome
    }
}
