use std::sync::{Arc, PoisonError, RwLock};

use hashbrown::HashSet;
use log::*;

use crate::entity_registry::{EntityRegistry, filter_names};
use crate::flags::Flags;
use crate::models::*;
use crate::publisher::{SharedBuffs, SharedSubscriptions};
use crate::store::{EncounterService, QueryResult};

/// Request/response surface used by the presentation layer.
/// Live-state commands only raise flags; the engine loop applies them between events.
pub struct Commands<FL, ES>
where
    FL: Flags,
    ES: EncounterService,
{
    flags: Arc<FL>,
    encounter_service: Arc<ES>,
    registry: Arc<RwLock<EntityRegistry>>,
    subscriptions: SharedSubscriptions,
    live_buffs: SharedBuffs,
}

impl<FL, ES> Commands<FL, ES>
where
    FL: Flags,
    ES: EncounterService,
{
    pub fn new(
        flags: Arc<FL>,
        encounter_service: Arc<ES>,
        registry: Arc<RwLock<EntityRegistry>>,
        subscriptions: SharedSubscriptions,
        live_buffs: SharedBuffs,
    ) -> Self {
        Self {
            flags,
            encounter_service,
            registry,
            subscriptions,
            live_buffs,
        }
    }

    pub fn reset_encounter(&self) {
        info!("resetting meter");
        self.flags.set_reset();
    }

    pub fn toggle_pause_encounter(&self) {
        info!("toggling pause");
        self.flags.request_pause_toggle();
    }

    pub fn set_boss_only_dps(&self, enabled: bool) {
        if enabled {
            info!("boss only damage enabled");
        } else {
            info!("boss only damage disabled");
        }

        self.flags.set_boss_only_dps(enabled);
    }

    pub fn split_attempt(&self) {
        info!("manual attempt split requested");
        self.flags.request_split();
    }

    pub fn start_encounter(&self) {
        info!("manual encounter start requested");
        self.flags.request_start();
    }

    pub fn subscribe_player_skills(&self, uid: i64, metric_type: MetricType) -> u32 {
        self.subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .subscribe(uid, metric_type)
    }

    pub fn unsubscribe_player_skills(&self, uid: i64, metric_type: MetricType) -> bool {
        self.subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .unsubscribe(uid, metric_type)
    }

    /// Live registry names merged with names seen in stored encounters.
    pub fn get_player_names_filtered(&self, prefix: &str) -> QueryResult<PlayerNames> {
        let mut known: HashSet<String> = self
            .registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .filter_names(prefix)
            .into_iter()
            .collect();

        known.extend(self.encounter_service.filter_player_names(prefix)?);

        Ok(PlayerNames {
            names: filter_names(known.iter().map(String::as_str), prefix),
        })
    }

    pub fn get_recent_encounters(&self, limit: usize) -> QueryResult<Vec<EncounterSummary>> {
        self.encounter_service.get_recent(limit)
    }

    pub fn get_encounter_by_id(&self, id: i64) -> QueryResult<EncounterDetail> {
        self.encounter_service.get_by_id(id)
    }

    pub fn get_encounter_player_skills(&self, id: i64, actor_id: i64, metric_type: MetricType) -> QueryResult<SkillsWindow> {
        let boss_only = self.flags.boss_only_dps();
        self.encounter_service.get_player_skills(id, actor_id, metric_type, boss_only)
    }

    pub fn delete_encounter(&self, id: i64) -> QueryResult<()> {
        info!("deleting encounter {id}");
        self.encounter_service.delete(id)
    }

    pub fn toggle_favorite_encounter(&self, id: i64, is_favorite: bool) -> QueryResult<()> {
        self.encounter_service.set_favorite(id, is_favorite)
    }

    pub fn get_encounter_attempts(&self, encounter_id: i64) -> QueryResult<Vec<Attempt>> {
        self.encounter_service.get_attempts(encounter_id)
    }

    pub fn get_encounter_attempt_actor_stats(&self, encounter_id: i64, attempt_index: u32) -> QueryResult<Vec<ActorStatRow>> {
        self.encounter_service.get_attempt_actor_stats(encounter_id, attempt_index)
    }

    pub fn get_encounter_attempt_player_skills(
        &self,
        encounter_id: i64,
        actor_id: i64,
        attempt_index: u32,
        metric_type: MetricType,
    ) -> QueryResult<SkillsWindow> {
        self.encounter_service
            .get_attempt_player_skills(encounter_id, actor_id, attempt_index, metric_type)
    }

    pub fn get_encounter_buffs(&self, encounter_id: i64) -> QueryResult<Vec<EntityBuffs>> {
        self.encounter_service.get_buffs(encounter_id)
    }

    /// Buffs as of the last publish tick.
    pub fn get_live_buffs(&self) -> Vec<EntityBuffs> {
        self.live_buffs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn get_pending_uploads(&self, limit: usize) -> QueryResult<Vec<EncounterSummary>> {
        self.encounter_service.get_pending_uploads(limit)
    }

    pub fn mark_uploaded(&self, id: i64, remote_id: &str, uploaded_at_ms: i64) -> QueryResult<()> {
        self.encounter_service.mark_uploaded(id, remote_id, uploaded_at_ms)
    }
}
