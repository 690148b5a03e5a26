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
    pub fn on_damage(&self, now: i64, event: &DamageEvent, state: &mut EncounterState) -> Result<()> {
        let outcome = state.on_damage(now, event);
        self.announce(outcome)
    }
}
