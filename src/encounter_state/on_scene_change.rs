use log::info;

use crate::models::*;

use super::{EncounterState, EventOutcome};

impl EncounterState {
    /// Closes the open encounter and remembers the scene for the next one.
    pub fn on_scene_change(&mut self, event: &SceneChangeEvent) -> EventOutcome {
        info!("scene changed to {} ({})", event.scene_name, event.scene_id);

        let closed = self.close(false);
        self.scene = Some((event.scene_id, event.scene_name.clone()));
        self.touch();

        EventOutcome {
            closed,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::encounter_state::EncounterStatus;
    use crate::models::*;
    use crate::test_utils::*;

    fn scene(scene_id: i32, scene_name: &str) -> SceneChangeEvent {
        SceneChangeEvent { timestamp_ms: 10_000, scene_id, scene_name: scene_name.into() }
    }

    #[test]
    fn should_close_encounter_and_carry_scene_forward() {
        let mut state = StateBuilder::new().build();
        state.on_scene_change(&scene(1, "Harbor"));
        state.on_damage(NOW_MS, &EventBuilder::damage(1, 500, 100).build_damage());

        let outcome = state.on_scene_change(&scene(2, "Crypt"));

        let closed = outcome.closed.unwrap();
        assert_eq!(closed.scene_id, Some(1));
        assert_eq!(closed.scene_name.as_deref(), Some("Harbor"));
        assert_eq!(state.status(), EncounterStatus::Idle);

        state.on_damage(NOW_MS, &EventBuilder::damage(1, 500, 100).build_damage());
        assert_eq!(state.encounter.as_ref().unwrap().scene_name.as_deref(), Some("Crypt"));
    }

    #[test]
    fn should_not_produce_encounter_when_idle() {
        let mut state = StateBuilder::new().build();

        assert!(state.on_scene_change(&scene(1, "Harbor")).closed.is_none());
    }
}
