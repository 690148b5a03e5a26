mod subscriptions;
mod windows;

pub use subscriptions::SubscriptionTable;
pub use windows::*;

use std::sync::{Arc, PoisonError, RwLock};

use anyhow::Result;
use log::debug;

use crate::abstractions::{AppEvent, EventEmitter};
use crate::encounter_state::EncounterState;
use crate::models::*;
use crate::skill_names::{SharedSkillNames, SkillNames};
use crate::utils::per_second;

pub type SharedSubscriptions = Arc<RwLock<SubscriptionTable>>;
pub type SharedBuffs = Arc<RwLock<Vec<EntityBuffs>>>;

/// Everything one publish tick emits.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Snapshot {
    pub encounter: EncounterUpdatePayload,
    pub players: Vec<PlayersUpdatePayload>,
    pub skills: Vec<SkillsUpdatePayload>,
}

/// Builds the windows for the current state. Pure: the same state yields the same snapshot.
pub fn build_snapshot(state: &EncounterState, subscriptions: &[(i64, MetricType)], names: &SkillNames) -> Snapshot {
    let registry = state.read_registry();
    let boss_only = state.boss_only_dps;

    let Some(encounter) = state.encounter.as_ref() else {
        return Snapshot {
            encounter: EncounterUpdatePayload {
                header_info: HeaderInfo {
                    scene_id: state.scene.as_ref().map(|(id, _)| *id),
                    scene_name: state.scene.as_ref().map(|(_, name)| name.clone()),
                    ..Default::default()
                },
                is_paused: false,
            },
            players: MetricType::ALL
                .iter()
                .map(|metric| PlayersUpdatePayload { metric_type: *metric, players_window: PlayersWindow::default() })
                .collect(),
            skills: vec![],
        };
    };

    let aggregator = &encounter.aggregator;
    let elapsed_ms = encounter.elapsed_ms();
    let elapsed_secs = elapsed_ms as f64 / 1000.0;
    let info = |id: i64| ActorInfo::from_registry(&registry, id);

    let players: Vec<PlayersUpdatePayload> = MetricType::ALL
        .iter()
        .map(|metric| PlayersUpdatePayload {
            metric_type: *metric,
            players_window: players_window(aggregator.actors.values(), &info, *metric, boss_only, elapsed_secs),
        })
        .collect();

    let skills = subscriptions
        .iter()
        .map(|(uid, metric)| {
            let curr_player = players
                .iter()
                .find(|payload| payload.metric_type == *metric)
                .and_then(|payload| payload.players_window.player_rows.iter().find(|row| row.uid == *uid))
                .cloned();
            let breakdown = aggregator.skill_breakdown(*uid, *metric, boss_only);

            SkillsUpdatePayload {
                metric_type: *metric,
                player_uid: *uid,
                skills_window: skills_window(names, curr_player, breakdown, elapsed_secs),
            }
        })
        .collect();

    let total_dmg = if boss_only {
        aggregator
            .actors
            .values()
            .filter(|stat| stat.is_player)
            .map(|stat| stat.boss_damage.total)
            .fold(0, i64::saturating_add)
    } else {
        aggregator.total_damage
    };

    let mut bosses: Vec<BossHealth> = aggregator
        .bosses
        .keys()
        .map(|id| {
            let entity = registry.lookup(*id);

            BossHealth {
                uid: *id,
                name: registry.name_or_placeholder(*id),
                current_hp: entity.and_then(|entity| entity.current_hp),
                max_hp: entity.and_then(|entity| entity.max_hp),
            }
        })
        .collect();
    bosses.sort_by_key(|boss| boss.uid);

    Snapshot {
        encounter: EncounterUpdatePayload {
            header_info: HeaderInfo {
                total_dps: per_second(total_dmg, elapsed_secs),
                total_dmg,
                elapsed_ms,
                fight_start_timestamp_ms: encounter.started_at_ms,
                bosses,
                scene_id: encounter.scene_id,
                scene_name: encounter.scene_name.clone(),
            },
            is_paused: encounter.is_paused(),
        },
        players,
        skills,
    }
}

/// Pushes snapshot windows to the presentation layer, skipping ticks where nothing moved.
pub struct SnapshotPublisher<EE: EventEmitter> {
    event_emitter: Arc<EE>,
    subscriptions: SharedSubscriptions,
    live_buffs: SharedBuffs,
    skill_names: SharedSkillNames,
    last_published: Option<(u64, u64, bool)>,
}

impl<EE: EventEmitter> SnapshotPublisher<EE> {
    pub fn new(event_emitter: Arc<EE>, subscriptions: SharedSubscriptions, live_buffs: SharedBuffs) -> Self {
        Self {
            event_emitter,
            subscriptions,
            live_buffs,
            skill_names: Arc::new(SkillNames::new()),
            last_published: None,
        }
    }

    pub fn with_skill_names(mut self, skill_names: SharedSkillNames) -> Self {
        self.skill_names = skill_names;
        self
    }

    /// Returns whether anything was emitted. A failed emit is not retried on the next tick.
    pub fn publish(&mut self, state: &EncounterState, now_ms: i64) -> Result<bool> {
        let (active, generation) = {
            let table = self.subscriptions.read().unwrap_or_else(PoisonError::into_inner);
            (table.active(), table.generation())
        };
        let marker = (state.revision(), generation, state.boss_only_dps);

        if self.last_published == Some(marker) {
            return Ok(false);
        }

        let snapshot = build_snapshot(state, &active, &self.skill_names);
        *self.live_buffs.write().unwrap_or_else(PoisonError::into_inner) = state.live_buffs(now_ms);
        self.last_published = Some(marker);

        debug!("publishing revision {} with {} skill windows", marker.0, snapshot.skills.len());
        self.emit(snapshot)?;

        Ok(true)
    }

    fn emit(&self, snapshot: Snapshot) -> Result<()> {
        self.event_emitter.emit(AppEvent::EncounterUpdate(snapshot.encounter))?;

        for payload in snapshot.players {
            let legacy = match payload.metric_type {
                MetricType::Dps => Some(AppEvent::DpsPlayersUpdate(payload.players_window.clone())),
                MetricType::Heal => Some(AppEvent::HealPlayersUpdate(payload.players_window.clone())),
                MetricType::Tanked => None,
            };

            self.event_emitter.emit(AppEvent::PlayersUpdate(payload))?;

            if let Some(legacy) = legacy {
                self.event_emitter.emit(legacy)?;
            }
        }

        for payload in snapshot.skills {
            self.event_emitter.emit(AppEvent::SkillsUpdate(payload))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::abstractions::MockEventEmitter;
    use crate::test_utils::*;

    fn recording_emitter() -> (Arc<MockEventEmitter>, Arc<Mutex<Vec<AppEvent>>>) {
        let events = Arc::new(Mutex::new(vec![]));
        let recorded = events.clone();
        let mut event_emitter = MockEventEmitter::new();
        event_emitter.expect_emit().returning(move |event| {
            recorded.lock().unwrap().push(event);
            Ok(())
        });

        (Arc::new(event_emitter), events)
    }

    fn publisher(event_emitter: Arc<MockEventEmitter>) -> (SnapshotPublisher<MockEventEmitter>, SharedSubscriptions, SharedBuffs) {
        let subscriptions: SharedSubscriptions = Arc::new(RwLock::new(SubscriptionTable::new()));
        let live_buffs: SharedBuffs = Arc::new(RwLock::new(vec![]));
        let publisher = SnapshotPublisher::new(event_emitter, subscriptions.clone(), live_buffs.clone());

        (publisher, subscriptions, live_buffs)
    }

    fn scenario_a() -> EncounterState {
        let mut state = StateBuilder::new().player(1, "Aria", 3).player(2, "Marlo", 4).build();
        state.on_damage(NOW_MS, &EventBuilder::damage(1, 500, 100).at(1_000).build_damage());
        state.on_damage(NOW_MS, &EventBuilder::damage(1, 500, 200).at(2_000).crit().build_damage());
        state.on_damage(NOW_MS, &EventBuilder::damage(2, 500, 50).at(3_000).build_damage());
        state
    }

    fn skills_updates(events: &[AppEvent]) -> usize {
        events.iter().filter(|event| matches!(event, AppEvent::SkillsUpdate(_))).count()
    }

    #[test]
    fn should_compute_scenario_a_share() {
        let state = scenario_a();

        let snapshot = build_snapshot(&state, &[], &SkillNames::new());

        let dps = &snapshot.players[0];
        assert_eq!(dps.metric_type, MetricType::Dps);
        let first = &dps.players_window.player_rows[0];
        assert_eq!(first.name, "Aria");
        assert_eq!(first.total_dmg, 300);
        assert_eq!(first.hits, 2);
        assert!((first.dmg_pct - 85.7).abs() < 0.1);
        assert_eq!(dps.players_window.player_rows[1].total_dmg, 50);
        assert_eq!(snapshot.encounter.header_info.total_dmg, 350);
        assert_eq!(snapshot.encounter.header_info.elapsed_ms, 2_000);
    }

    #[test]
    fn should_build_identical_snapshots_without_new_events() {
        let state = scenario_a();
        let subscriptions = [(1, MetricType::Dps)];

        let names = SkillNames::new();
        assert_eq!(build_snapshot(&state, &subscriptions, &names), build_snapshot(&state, &subscriptions, &names));
    }

    #[test]
    fn should_skip_publish_when_nothing_changed() {
        let (event_emitter, events) = recording_emitter();
        let (mut publisher, _, _) = publisher(event_emitter);
        let mut state = scenario_a();

        assert!(publisher.publish(&state, NOW_MS).unwrap());
        let emitted = events.lock().unwrap().len();
        assert!(!publisher.publish(&state, NOW_MS).unwrap());
        assert_eq!(events.lock().unwrap().len(), emitted);

        state.on_damage(NOW_MS, &EventBuilder::damage(2, 500, 50).at(4_000).build_damage());
        assert!(publisher.publish(&state, NOW_MS).unwrap());
    }

    #[test]
    fn should_emit_each_metric_with_legacy_variants() {
        let (event_emitter, events) = recording_emitter();
        let (mut publisher, _, _) = publisher(event_emitter);

        publisher.publish(&scenario_a(), NOW_MS).unwrap();

        let names: Vec<&str> = events.lock().unwrap().iter().map(|event| event.name()).collect();
        assert_eq!(
            names,
            vec![
                "encounter-update",
                "players-update",
                "dps-players-update",
                "players-update",
                "heal-players-update",
                "players-update",
            ]
        );
    }

    #[test]
    fn should_stop_skill_windows_after_unsubscribe() {
        let (event_emitter, events) = recording_emitter();
        let (mut publisher, subscriptions, _) = publisher(event_emitter);
        let state = scenario_a();

        subscriptions.write().unwrap().subscribe(1, MetricType::Dps);
        publisher.publish(&state, NOW_MS).unwrap();

        {
            let events = events.lock().unwrap();
            assert_eq!(skills_updates(&events), 1);
            let Some(AppEvent::SkillsUpdate(payload)) = events.last() else {
                panic!("expected skills-update last");
            };
            assert_eq!(payload.player_uid, 1);
            assert_eq!(payload.skills_window.curr_player.as_ref().unwrap().total_dmg, 300);
            assert_eq!(payload.skills_window.skill_rows[0].total_dmg, 300);
        }

        subscriptions.write().unwrap().unsubscribe(1, MetricType::Dps);
        events.lock().unwrap().clear();
        assert!(publisher.publish(&state, NOW_MS).unwrap());

        assert_eq!(skills_updates(&events.lock().unwrap()), 0);
    }

    #[test]
    fn should_publish_cleared_windows_after_close() {
        let (event_emitter, events) = recording_emitter();
        let (mut publisher, _, _) = publisher(event_emitter);
        let mut state = scenario_a();

        publisher.publish(&state, NOW_MS).unwrap();
        state.reset();
        events.lock().unwrap().clear();
        publisher.publish(&state, NOW_MS).unwrap();

        let events = events.lock().unwrap();
        let Some(AppEvent::EncounterUpdate(payload)) = events.first() else {
            panic!("expected encounter-update first");
        };
        assert_eq!(payload.header_info.total_dmg, 0);
        assert!(events.iter().all(|event| match event {
            AppEvent::PlayersUpdate(payload) => payload.players_window.player_rows.is_empty(),
            _ => true,
        }));
    }

    #[test]
    fn should_refresh_live_buffs() {
        let (event_emitter, _) = recording_emitter();
        let (mut publisher, _, live_buffs) = publisher(event_emitter);
        let mut state = scenario_a();
        state.on_buff_applied(&BuffAppliedEvent { timestamp_ms: 2_000, entity_id: 1, buff_id: 9, stack_count: 1 });

        publisher.publish(&state, 3_000).unwrap();

        let buffs = live_buffs.read().unwrap();
        assert_eq!(buffs.len(), 1);
        assert_eq!(buffs[0].buff_id, 9);
    }
}
