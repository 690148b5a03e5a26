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
    pub fn on_heal(&self, now: i64, event: &HealEvent, state: &mut EncounterState) -> Result<()> {
        let outcome = state.on_heal(now, event);
        self.announce(outcome)
    }
}
