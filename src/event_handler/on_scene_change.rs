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
    pub fn on_scene_change(&self, event: &SceneChangeEvent, state: &mut EncounterState) -> Result<()> {
        let outcome = state.on_scene_change(event);
        self.announce(outcome)?;

        self.event_emitter.emit(AppEvent::SceneChange {
            scene_name: event.scene_name.clone(),
        })
    }
}
