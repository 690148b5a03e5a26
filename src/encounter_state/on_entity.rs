use crate::models::*;

use super::{EncounterState, EventOutcome};

impl EncounterState {
    pub fn on_entity_sighted(&mut self, event: &EntitySighting) -> EventOutcome {
        self.write_registry().upsert(event.id, event.kind, event.attrs.clone(), event.timestamp_ms);
        self.touch();

        EventOutcome::default()
    }

    /// HP sync without damage. Feeds the rollback heuristic and boss defeat.
    pub fn on_boss_hp(&mut self, event: &BossHpEvent) -> EventOutcome {
        let mut outcome = EventOutcome::default();
        let timestamp_ms = event.timestamp_ms;

        let attrs = EntityAttributes {
            current_hp: Some(event.current_hp),
            max_hp: event.max_hp,
            is_boss: true,
            ..Default::default()
        };
        self.write_registry().upsert(event.entity_id, EntityKind::Monster, attrs, timestamp_ms);
        self.touch();

        let Some(encounter) = self.encounter.as_mut() else {
            return outcome;
        };

        outcome.split = encounter
            .segmenter
            .observe_boss_hp(timestamp_ms, event.entity_id, event.current_hp, event.max_hp);

        if event.current_hp == 0 {
            outcome.defeated_boss = self.defeat_boss(timestamp_ms, event.entity_id);
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use crate::models::*;
    use crate::test_utils::*;

    #[test]
    fn should_register_sighted_entity() {
        let mut state = StateBuilder::new().build();
        let sighting = EntitySighting {
            timestamp_ms: 1_000,
            id: 1,
            kind: EntityKind::Player,
            attrs: EntityAttributes { is_local: true, ..player_attributes("Aria", 3, 24_000) },
        };

        state.on_entity_sighted(&sighting);

        let registry = state.read_registry();
        assert_eq!(registry.local_player_id(), Some(1));
        assert_eq!(registry.display_name(1), "Aria (You)");
    }

    #[test]
    fn should_split_on_hp_sync_rollback() {
        let mut state = StateBuilder::new().build();
        state.on_damage(NOW_MS, &EventBuilder::boss_damage(1, 900, 500, 500).at(1_000).build_damage());

        let outcome = state.on_boss_hp(&BossHpEvent { timestamp_ms: 5_000, entity_id: 900, current_hp: 1_000, max_hp: None });

        assert_eq!(outcome.split, Some(AttemptReason::HpRollback));
        assert_eq!(state.encounter.as_ref().unwrap().segmenter.attempt_index(), 2);
    }

    #[test]
    fn should_only_refresh_registry_when_idle() {
        let mut state = StateBuilder::new().build();

        let outcome = state.on_boss_hp(&BossHpEvent { timestamp_ms: 1_000, entity_id: 900, current_hp: 0, max_hp: Some(100) });

        assert!(outcome.defeated_boss.is_none());
        assert!(state.encounter.is_none());
        assert!(state.read_registry().lookup(900).unwrap().is_boss);
    }
}
