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
    pub fn on_buff_applied(&self, event: &BuffAppliedEvent, state: &mut EncounterState) -> Result<()> {
        let outcome = state.on_buff_applied(event);
        self.announce(outcome)
    }

    pub fn on_buff_removed(&self, event: &BuffRemovedEvent, state: &mut EncounterState) -> Result<()> {
        let outcome = state.on_buff_removed(event);
        self.announce(outcome)
    }
}
