use std::sync::{Arc, RwLock};

use crate::encounter_state::EncounterState;
use crate::entity_registry::EntityRegistry;
use crate::models::*;

pub struct StateBuilder {
    settings: Settings,
    registry: EntityRegistry,
}

impl StateBuilder {
    pub fn new() -> Self {
        Self {
            settings: Settings::default(),
            registry: EntityRegistry::new(),
        }
    }

    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn inactivity_timeout(mut self, timeout_ms: u64) -> Self {
        self.settings.inactivity_timeout_ms = timeout_ms;
        self
    }

    pub fn boss_only_dps(mut self) -> Self {
        self.settings.boss_only_dps = true;
        self
    }

    pub fn player(mut self, id: i64, name: &str, class_id: i32) -> Self {
        self.registry.upsert(id, EntityKind::Player, super::player_attributes(name, class_id, 20_000), 1_000);
        self
    }

    pub fn local_player(mut self, id: i64, name: &str) -> Self {
        let attrs = EntityAttributes {
            is_local: true,
            ..super::player_attributes(name, 1, 20_000)
        };
        self.registry.upsert(id, EntityKind::Player, attrs, 1_000);
        self
    }

    pub fn build(self) -> EncounterState {
        EncounterState::new("0.0.1", &self.settings, Arc::new(RwLock::new(self.registry)))
    }
}
