use anyhow::Result;
use log::*;

use crate::abstractions::*;
use crate::encounter_state::EncounterState;
use crate::models::*;

use super::DefaultEventHandler;

impl<EE, PE> DefaultEventHandler<EE, PE>
where
    EE: EventEmitter,
    PE: Persister,
{
    pub fn on_death(&self, now: i64, event: &DeathEvent, state: &mut EncounterState) -> Result<()> {
        let outcome = state.on_death(now, event);

        if outcome.split == Some(AttemptReason::Wipe) {
            warn!("party wiped at {}", event.timestamp_ms);
        }

        self.announce(outcome)
    }

    pub fn on_revive(&self, now: i64, event: &ReviveEvent, state: &mut EncounterState) -> Result<()> {
        let outcome = state.on_revive(now, event);
        self.announce(outcome)
    }
}
