use anyhow::Result;

use crate::abstractions::*;
use crate::encounter_state::EncounterState;
use crate::models::*;

use super::DefaultEventHandler;

impl<EE, PE> DefaultEventHandler<EE, PE>
where
    EE: EventEmitter,
    PE: Persister,
{
    pub fn on_entity_sighted(&self, event: &EntitySighting, state: &mut EncounterState) -> Result<()> {
        let outcome = state.on_entity_sighted(event);
        self.announce(outcome)
    }

    pub fn on_boss_hp(&self, event: &BossHpEvent, state: &mut EncounterState) -> Result<()> {
        let outcome = state.on_boss_hp(event);
        self.announce(outcome)
    }
}
