use log::debug;
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use std::fmt::Debug;

use crate::models::*;

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(tag = "event", content = "data")]
#[serde(rename_all = "kebab-case")]
pub enum AppEvent {
    EncounterUpdate(EncounterUpdatePayload),
    PlayersUpdate(PlayersUpdatePayload),
    DpsPlayersUpdate(PlayersWindow),
    HealPlayersUpdate(PlayersWindow),
    SkillsUpdate(SkillsUpdatePayload),
    #[serde(rename_all = "camelCase")]
    BossDeath { boss_name: String },
    #[serde(rename_all = "camelCase")]
    SceneChange { scene_name: String },
    ResetEncounter,
    PauseEncounter(bool),
    #[serde(rename_all = "camelCase")]
    EncounterSaved { encounter_id: i64 },
    PersistenceError { message: String },
}

impl AppEvent {
    pub fn name(&self) -> &'static str {
        match self {
            AppEvent::EncounterUpdate(_) => "encounter-update",
            AppEvent::PlayersUpdate(_) => "players-update",
            AppEvent::DpsPlayersUpdate(_) => "dps-players-update",
            AppEvent::HealPlayersUpdate(_) => "heal-players-update",
            AppEvent::SkillsUpdate(_) => "skills-update",
            AppEvent::BossDeath { .. } => "boss-death",
            AppEvent::SceneChange { .. } => "scene-change",
            AppEvent::ResetEncounter => "reset-encounter",
            AppEvent::PauseEncounter(_) => "pause-encounter",
            AppEvent::EncounterSaved { .. } => "encounter-saved",
            AppEvent::PersistenceError { .. } => "persistence-error",
        }
    }
}

#[cfg(test)]
use mockall::automock;

#[cfg_attr(test, automock)]
pub trait EventEmitter : Send + Sync + 'static {
    fn emit(&self, event: AppEvent) -> anyhow::Result<()>;
}

pub struct DefaultEventEmitter;

impl EventEmitter for DefaultEventEmitter {

    fn emit(&self, event: AppEvent) -> anyhow::Result<()> {
        debug!("{}: {:?}", event.name(), event);
        Ok(())
    }
}

impl DefaultEventEmitter {
    pub fn new() -> Self {
        Self {}
    }
}

/// Forwards events to the presentation layer over a channel.
pub struct ChannelEventEmitter {
    sender: UnboundedSender<AppEvent>,
}

impl EventEmitter for ChannelEventEmitter {
    fn emit(&self, event: AppEvent) -> anyhow::Result<()> {
        debug!("emitting {}", event.name());
        self.sender
            .send(event)
            .map_err(|err| anyhow::anyhow!("event receiver dropped: {}", err.0.name()))
    }
}

impl ChannelEventEmitter {
    pub fn new(sender: UnboundedSender<AppEvent>) -> Self {
        Self { sender }
    }
}
