mod finalize;
mod on_buff;
mod on_damage;
mod on_death;
mod on_entity;
mod on_heal;
mod on_scene_change;

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use hashbrown::HashSet;
use log::info;
use uuid::Uuid;

use crate::aggregator::{Aggregator, BuffTracker};
use crate::entity_registry::EntityRegistry;
use crate::models::*;
use crate::segmenter::{Segmenter, SegmenterConfig};
use crate::utils::now_ms;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum EncounterStatus {
    #[default]
    Idle,
    Active,
    Paused,
}

/// What a single event changed beyond the rollups, for the caller to announce.
#[derive(Debug, Default, Clone)]
pub struct EventOutcome {
    pub defeated_boss: Option<String>,
    pub split: Option<AttemptReason>,
    pub closed: Option<CompleteEncounter>,
}

/// The one open encounter.
#[derive(Debug, Clone)]
pub struct LiveEncounter {
    pub started_at_ms: i64,
    pub last_event_ms: i64,
    pub last_activity_ms: i64,
    pub scene_id: Option<i32>,
    pub scene_name: Option<String>,
    pub segmenter: Segmenter,
    pub aggregator: Aggregator,
    pub buffs: BuffTracker,
    pub defeated_bosses: HashSet<i64>,
    pub event_count: u64,
    elapsed_before_pause_ms: i64,
    running_since_ms: Option<i64>,
}

impl LiveEncounter {
    fn new(started_at_ms: i64, now_ms: i64, config: SegmenterConfig, scene: Option<&(i32, String)>) -> Self {
        Self {
            started_at_ms,
            last_event_ms: started_at_ms,
            last_activity_ms: now_ms,
            scene_id: scene.map(|(id, _)| *id),
            scene_name: scene.map(|(_, name)| name.clone()),
            segmenter: Segmenter::new(config, started_at_ms),
            aggregator: Aggregator::new(config.phases_enabled),
            buffs: BuffTracker::new(),
            defeated_bosses: HashSet::new(),
            event_count: 0,
            elapsed_before_pause_ms: 0,
            running_since_ms: Some(started_at_ms),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.event_count == 0
    }

    pub fn is_paused(&self) -> bool {
        self.running_since_ms.is_none()
    }

    /// Combat time excluding pauses. Frozen while paused.
    pub fn elapsed_ms(&self) -> i64 {
        self.elapsed_until(self.last_event_ms)
    }

    fn elapsed_until(&self, until_ms: i64) -> i64 {
        match self.running_since_ms {
            Some(running_since_ms) => self.elapsed_before_pause_ms + (until_ms - running_since_ms).max(0),
            None => self.elapsed_before_pause_ms,
        }
    }

    /// Both ends of a pause are epoch milliseconds, the same clock events are stamped with.
    fn pause(&mut self, now_ms: i64) {
        self.elapsed_before_pause_ms = self.elapsed_until(now_ms.max(self.last_event_ms));
        self.running_since_ms = None;
    }

    fn resume(&mut self, now_ms: i64) {
        self.running_since_ms = Some(now_ms.max(self.last_event_ms));
    }

    fn record_event(&mut self, timestamp_ms: i64, now_ms: i64) {
        self.last_event_ms = self.last_event_ms.max(timestamp_ms);
        self.last_activity_ms = now_ms;
        self.event_count += 1;
    }
}

/// Engine context owned by the event loop and passed explicitly to every component.
#[derive(Debug)]
pub struct EncounterState {
    pub session_id: Uuid,
    pub session_started_at_ms: i64,
    pub version: String,
    pub registry: Arc<RwLock<EntityRegistry>>,
    pub segmenter_config: SegmenterConfig,
    pub inactivity_timeout_ms: i64,
    pub boss_only_dps: bool,
    pub scene: Option<(i32, String)>,
    pub encounter: Option<LiveEncounter>,
    revision: u64,
    next_seq: u64,
}

impl EncounterState {
    pub fn new(version: &str, settings: &Settings, registry: Arc<RwLock<EntityRegistry>>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            session_started_at_ms: now_ms(),
            version: version.to_string(),
            registry,
            segmenter_config: SegmenterConfig::from(settings),
            inactivity_timeout_ms: i64::try_from(settings.inactivity_timeout_ms).unwrap_or(i64::MAX),
            boss_only_dps: settings.boss_only_dps,
            scene: None,
            encounter: None,
            revision: 0,
            next_seq: 0,
        }
    }

    pub fn status(&self) -> EncounterStatus {
        match &self.encounter {
            None => EncounterStatus::Idle,
            Some(encounter) if encounter.is_paused() => EncounterStatus::Paused,
            Some(_) => EncounterStatus::Active,
        }
    }

    /// Bumped on every mutation; the publisher skips ticks when it has not moved.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    pub fn read_registry(&self) -> RwLockReadGuard<'_, EntityRegistry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_registry(&self) -> RwLockWriteGuard<'_, EntityRegistry> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn start_encounter(&mut self, timestamp_ms: i64, now_ms: i64) -> bool {
        if self.encounter.is_some() {
            return false;
        }

        info!("encounter started at {timestamp_ms}");
        self.encounter = Some(LiveEncounter::new(timestamp_ms, now_ms, self.segmenter_config, self.scene.as_ref()));
        self.touch();
        true
    }

    /// Returns the new paused state, `None` when there is nothing to pause.
    pub fn toggle_pause(&mut self, now_ms: i64) -> Option<bool> {
        let encounter = self.encounter.as_mut()?;

        if encounter.is_paused() {
            encounter.resume(now_ms);
            info!("encounter resumed");
        } else {
            encounter.pause(now_ms);
            info!("encounter paused");
        }

        let is_paused = encounter.is_paused();
        self.touch();
        Some(is_paused)
    }

    pub fn set_boss_only_dps(&mut self, enabled: bool) {
        if self.boss_only_dps != enabled {
            self.boss_only_dps = enabled;
            self.touch();
        }
    }

    pub fn split_attempt(&mut self, now_ms: i64) -> Option<u32> {
        let encounter = self.encounter.as_mut()?;
        let timestamp_ms = now_ms.max(encounter.last_event_ms);

        encounter.segmenter.split_manual(timestamp_ms);
        let index = encounter.segmenter.attempt_index();
        self.touch();
        Some(index)
    }

    /// Closes the open encounter. Empty encounters are discarded.
    pub fn close(&mut self, is_manual: bool) -> Option<CompleteEncounter> {
        let encounter = self.encounter.take()?;
        self.touch();

        if encounter.is_empty() {
            info!("discarding empty encounter");
            return None;
        }

        info!("encounter closed after {} events", encounter.event_count);
        Some(self.finalize(encounter, is_manual))
    }

    pub fn reset(&mut self) -> Option<CompleteEncounter> {
        self.close(true)
    }

    pub fn check_inactivity(&mut self, now_ms: i64) -> Option<CompleteEncounter> {
        let encounter = self.encounter.as_ref()?;

        if encounter.is_paused() || now_ms - encounter.last_activity_ms < self.inactivity_timeout_ms {
            return None;
        }

        info!("encounter inactive for {} ms", now_ms - encounter.last_activity_ms);
        self.close(false)
    }

    pub fn live_buffs(&self, now_ms: i64) -> Vec<EntityBuffs> {
        self.encounter
            .as_ref()
            .map(|encounter| encounter.buffs.snapshot(now_ms.max(encounter.last_event_ms)))
            .unwrap_or_default()
    }

    fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    /// Opens an encounter on the first combat event after idle and stamps the event on it.
    fn begin_combat_event(&mut self, timestamp_ms: i64, now_ms: i64) -> &mut LiveEncounter {
        self.touch();

        let config = self.segmenter_config;
        let scene = &self.scene;
        let encounter = self.encounter.get_or_insert_with(|| {
            info!("encounter started at {timestamp_ms}");
            LiveEncounter::new(timestamp_ms, now_ms, config, scene.as_ref())
        });
        encounter.record_event(timestamp_ms, now_ms);
        encounter
    }

    fn resolve(&self, actor: &ActorRef) -> ResolvedActor {
        let registry = self.read_registry();

        ResolvedActor {
            id: actor.id,
            kind: actor.kind,
            is_local: registry.local_player_id() == Some(actor.id),
        }
    }

    /// Marks a boss defeated once. Returns its name on the first time.
    fn defeat_boss(&mut self, timestamp_ms: i64, boss_id: i64) -> Option<String> {
        let name = self.read_registry().name_or_placeholder(boss_id);
        let encounter = self.encounter.as_mut()?;

        if !encounter.defeated_bosses.insert(boss_id) {
            return None;
        }

        encounter.segmenter.on_boss_defeated(timestamp_ms, boss_id);
        encounter.aggregator.boss_defeated(boss_id, &name);
        info!("boss defeated: {name}");
        Some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn should_start_on_first_damage() {
        let mut state = StateBuilder::new().build();
        assert_eq!(state.status(), EncounterStatus::Idle);

        state.on_damage(NOW_MS, &EventBuilder::damage(1, 500, 100).build_damage());

        assert_eq!(state.status(), EncounterStatus::Active);
        let encounter = state.encounter.as_ref().unwrap();
        assert_eq!(encounter.segmenter.attempts().len(), 1);
        assert_eq!(encounter.segmenter.current_attempt().reason, AttemptReason::Manual);
    }

    #[test]
    fn should_freeze_elapsed_while_paused() {
        let mut state = StateBuilder::new().build();

        state.on_damage(NOW_MS, &EventBuilder::damage(1, 500, 100).at(1_000).build_damage());
        state.on_damage(NOW_MS, &EventBuilder::damage(1, 500, 100).at(5_000).build_damage());
        assert_eq!(state.toggle_pause(6_000), Some(true));
        assert_eq!(state.status(), EncounterStatus::Paused);

        state.on_damage(NOW_MS, &EventBuilder::damage(1, 500, 100).at(9_000).build_damage());
        assert_eq!(state.encounter.as_ref().unwrap().elapsed_ms(), 5_000);

        assert_eq!(state.toggle_pause(10_000), Some(false));
        state.on_damage(NOW_MS, &EventBuilder::damage(1, 500, 100).at(12_000).build_damage());

        let encounter = state.encounter.as_ref().unwrap();
        assert_eq!(encounter.elapsed_ms(), 7_000);
        assert_eq!(encounter.aggregator.actors[&1].damage_dealt(), 400);
    }

    #[test]
    fn should_count_quiet_time_before_pause() {
        let mut state = StateBuilder::new().build();

        state.on_damage(NOW_MS, &EventBuilder::damage(1, 500, 100).at(10_000).build_damage());
        state.on_damage(NOW_MS, &EventBuilder::damage(1, 500, 100).at(20_000).build_damage());
        state.toggle_pause(25_000);
        assert_eq!(state.encounter.as_ref().unwrap().elapsed_ms(), 15_000);

        state.toggle_pause(26_000);
        state.on_damage(NOW_MS, &EventBuilder::damage(1, 500, 100).at(24_000).build_damage());
        state.on_damage(NOW_MS, &EventBuilder::damage(1, 500, 100).at(30_000).build_damage());

        assert_eq!(state.encounter.as_ref().unwrap().elapsed_ms(), 19_000);
    }

    #[test]
    fn should_clamp_oversized_inactivity_timeout() {
        let settings = Settings { inactivity_timeout_ms: u64::MAX, ..Default::default() };
        let mut state = EncounterState::new("test", &settings, Arc::new(RwLock::new(EntityRegistry::new())));
        state.on_damage(NOW_MS, &EventBuilder::damage(1, 500, 100).build_damage());

        assert_eq!(state.inactivity_timeout_ms, i64::MAX);
        assert!(state.check_inactivity(NOW_MS + 60_000).is_none());
    }

    #[test]
    fn should_not_toggle_pause_when_idle() {
        let mut state = StateBuilder::new().build();
        assert_eq!(state.toggle_pause(1_000), None);
    }

    #[test]
    fn should_discard_empty_encounter_on_reset() {
        let mut state = StateBuilder::new().build();
        state.start_encounter(1_000, 1_000);

        assert!(state.reset().is_none());
        assert_eq!(state.status(), EncounterStatus::Idle);
    }

    #[test]
    fn should_flush_non_empty_encounter_on_reset() {
        let mut state = StateBuilder::new().build();
        state.on_damage(NOW_MS, &EventBuilder::damage(1, 500, 100).build_damage());

        let encounter = state.reset().unwrap();

        assert!(encounter.is_manual);
        assert_eq!(encounter.total_damage, 100);
        assert_eq!(state.status(), EncounterStatus::Idle);
    }

    #[test]
    fn should_close_after_inactivity() {
        let mut state = StateBuilder::new().inactivity_timeout(1_000).build();
        state.on_damage(NOW_MS, &EventBuilder::damage(1, 500, 100).build_damage());

        assert!(state.check_inactivity(NOW_MS + 500).is_none());
        let encounter = state.check_inactivity(NOW_MS + 1_000).unwrap();

        assert!(!encounter.is_manual);
        assert_eq!(state.status(), EncounterStatus::Idle);
    }

    #[test]
    fn should_not_time_out_while_paused() {
        let mut state = StateBuilder::new().inactivity_timeout(1_000).build();
        state.on_damage(NOW_MS, &EventBuilder::damage(1, 500, 100).build_damage());
        state.toggle_pause(NOW_MS);

        assert!(state.check_inactivity(NOW_MS + 60_000).is_none());
    }

    #[test]
    fn should_split_attempt_manually() {
        let mut state = StateBuilder::new().build();
        assert_eq!(state.split_attempt(NOW_MS), None);

        state.on_damage(NOW_MS, &EventBuilder::damage(1, 500, 100).build_damage());

        assert_eq!(state.split_attempt(NOW_MS), Some(2));
    }

    #[test]
    fn should_bump_revision_on_changes() {
        let mut state = StateBuilder::new().build();
        let initial = state.revision();

        state.set_boss_only_dps(false);
        assert_eq!(state.revision(), initial);

        state.set_boss_only_dps(true);
        assert!(state.revision() > initial);
    }
}
