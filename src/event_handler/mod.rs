mod on_buff;
mod on_damage;
mod on_death;
mod on_entity;
mod on_heal;
mod on_scene_change;
mod validation;

use std::sync::Arc;

use anyhow::Result;
use log::*;

use crate::abstractions::*;
use crate::encounter_state::{EncounterState, EventOutcome};
use crate::models::CombatEvent;
use crate::utils::now_ms;

pub use validation::{ValidationError, validate};

#[cfg(test)]
use mockall::automock;

/// Ingestion boundary: validates one decoded event and drives the encounter state with it.
#[cfg_attr(test, automock)]
pub trait EventHandler {
    fn handle(&mut self, event: CombatEvent, state: &mut EncounterState) -> Result<()>;
}

pub struct DefaultEventHandler<EE, PE>
where
    EE: EventEmitter,
    PE: Persister,
{
    event_emitter: Arc<EE>,
    persister: Arc<PE>,
}

impl<EE, PE> EventHandler for DefaultEventHandler<EE, PE>
where
    EE: EventEmitter,
    PE: Persister,
{
    fn handle(&mut self, event: CombatEvent, state: &mut EncounterState) -> Result<()> {
        if let Err(err) = validate(&event) {
            warn!("dropping event: {err}");
            return Err(err.into());
        }

        let now = now_ms();

        match &event {
            CombatEvent::Damage(event) => self.on_damage(now, event, state)?,
            CombatEvent::Heal(event) => self.on_heal(now, event, state)?,
            CombatEvent::Death(event) => self.on_death(now, event, state)?,
            CombatEvent::Revive(event) => self.on_revive(now, event, state)?,
            CombatEvent::EntitySighted(event) => self.on_entity_sighted(event, state)?,
            CombatEvent::BossHp(event) => self.on_boss_hp(event, state)?,
            CombatEvent::BuffApplied(event) => self.on_buff_applied(event, state)?,
            CombatEvent::BuffRemoved(event) => self.on_buff_removed(event, state)?,
            CombatEvent::SceneChange(event) => self.on_scene_change(event, state)?,
        }

        Ok(())
    }
}

impl<EE, PE> DefaultEventHandler<EE, PE>
where
    EE: EventEmitter,
    PE: Persister,
{
    pub fn new(event_emitter: Arc<EE>, persister: Arc<PE>) -> Self {
        Self {
            event_emitter,
            persister,
        }
    }

    /// Publishes what an event changed beyond the rollups and hands closed encounters off.
    fn announce(&self, outcome: EventOutcome) -> Result<()> {
        if let Some(reason) = outcome.split {
            info!("new attempt: {}", reason.as_str());
        }

        if let Some(boss_name) = outcome.defeated_boss {
            self.event_emitter.emit(AppEvent::BossDeath { boss_name })?;
        }

        if let Some(encounter) = outcome.closed {
            self.persister.save(encounter)?;
        }

        Ok(())
    }
}
