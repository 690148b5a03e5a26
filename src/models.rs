use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::aggregator::HitLog;
use crate::constants::*;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    #[default]
    Player,
    Monster,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Player => "player",
            EntityKind::Monster => "monster",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "monster" => EntityKind::Monster,
            _ => EntityKind::Player,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorRef {
    pub id: i64,
    pub kind: EntityKind,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DamageEvent {
    pub timestamp_ms: i64,
    pub attacker: Option<ActorRef>,
    pub defender: Option<ActorRef>,
    pub skill_id: i32,
    pub value: i64,
    pub hp_loss: i64,
    pub shield_loss: i64,
    pub is_crit: bool,
    pub is_lucky: bool,
    pub defender_hp: Option<i64>,
    pub defender_max_hp: Option<i64>,
    pub defender_name: Option<String>,
    pub is_boss: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealEvent {
    pub timestamp_ms: i64,
    pub healer: Option<ActorRef>,
    pub target: Option<ActorRef>,
    pub skill_id: i32,
    pub value: i64,
    pub is_crit: bool,
    pub is_lucky: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeathEvent {
    pub timestamp_ms: i64,
    pub actor: Option<ActorRef>,
    pub killer_id: Option<i64>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviveEvent {
    pub timestamp_ms: i64,
    pub actor: Option<ActorRef>,
}

/// Attribute update carried by a sighting. `None` keeps whatever the registry already knows.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityAttributes {
    pub name: Option<String>,
    pub class_id: Option<i32>,
    pub spec_id: Option<i32>,
    pub ability_score: Option<i64>,
    pub level: Option<i32>,
    pub current_hp: Option<i64>,
    pub max_hp: Option<i64>,
    pub is_boss: bool,
    pub is_local: bool,
    pub attributes: Option<Value>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySighting {
    pub timestamp_ms: i64,
    pub id: i64,
    pub kind: EntityKind,
    #[serde(flatten)]
    pub attrs: EntityAttributes,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuffAppliedEvent {
    pub timestamp_ms: i64,
    pub entity_id: i64,
    pub buff_id: i32,
    pub stack_count: i32,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuffRemovedEvent {
    pub timestamp_ms: i64,
    pub entity_id: i64,
    pub buff_id: i32,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BossHpEvent {
    pub timestamp_ms: i64,
    pub entity_id: i64,
    pub current_hp: i64,
    pub max_hp: Option<i64>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneChangeEvent {
    pub timestamp_ms: i64,
    pub scene_id: i32,
    pub scene_name: String,
}

/// Typed event as produced by the decoding subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum CombatEvent {
    Damage(DamageEvent),
    Heal(HealEvent),
    Death(DeathEvent),
    Revive(ReviveEvent),
    EntitySighted(EntitySighting),
    BuffApplied(BuffAppliedEvent),
    BuffRemoved(BuffRemovedEvent),
    BossHp(BossHpEvent),
    SceneChange(SceneChangeEvent),
}

impl CombatEvent {
    pub fn timestamp_ms(&self) -> i64 {
        match self {
            CombatEvent::Damage(event) => event.timestamp_ms,
            CombatEvent::Heal(event) => event.timestamp_ms,
            CombatEvent::Death(event) => event.timestamp_ms,
            CombatEvent::Revive(event) => event.timestamp_ms,
            CombatEvent::EntitySighted(event) => event.timestamp_ms,
            CombatEvent::BuffApplied(event) => event.timestamp_ms,
            CombatEvent::BuffRemoved(event) => event.timestamp_ms,
            CombatEvent::BossHp(event) => event.timestamp_ms,
            CombatEvent::SceneChange(event) => event.timestamp_ms,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            CombatEvent::Damage(_) => "damage",
            CombatEvent::Heal(_) => "heal",
            CombatEvent::Death(_) => "death",
            CombatEvent::Revive(_) => "revive",
            CombatEvent::EntitySighted(_) => "entity-sighted",
            CombatEvent::BuffApplied(_) => "buff-applied",
            CombatEvent::BuffRemoved(_) => "buff-removed",
            CombatEvent::BossHp(_) => "boss-hp",
            CombatEvent::SceneChange(_) => "scene-change",
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: i64,
    pub kind: EntityKind,
    pub name: Option<String>,
    pub class_id: Option<i32>,
    pub spec_id: Option<i32>,
    pub ability_score: Option<i64>,
    pub level: Option<i32>,
    pub current_hp: Option<i64>,
    pub max_hp: Option<i64>,
    pub is_boss: bool,
    pub is_local: bool,
    pub attributes: Option<Value>,
    pub first_seen_ms: i64,
    pub last_seen_ms: i64,
}

impl Entity {
    pub fn is_player(&self) -> bool {
        self.kind == EntityKind::Player
    }
}

/// Actor as seen by the aggregator once identity has been resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedActor {
    pub id: i64,
    pub kind: EntityKind,
    pub is_local: bool,
}

impl ResolvedActor {
    pub fn is_player(&self) -> bool {
        self.kind == EntityKind::Player
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedKind {
    Damage {
        attacker: ResolvedActor,
        defender: ResolvedActor,
        skill_id: i32,
        value: i64,
        hp_loss: i64,
        shield_loss: i64,
        is_crit: bool,
        is_lucky: bool,
        is_boss_target: bool,
        defender_name: String,
        defender_max_hp: Option<i64>,
    },
    Heal {
        healer: ResolvedActor,
        target: ResolvedActor,
        skill_id: i32,
        value: i64,
        is_crit: bool,
        is_lucky: bool,
        target_name: String,
    },
    Death {
        actor: ResolvedActor,
    },
    Revive {
        actor: ResolvedActor,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEvent {
    pub seq: u64,
    pub timestamp_ms: i64,
    pub attempt_index: u32,
    pub phase_id: Option<u32>,
    pub kind: ResolvedKind,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HitCells {
    pub total: i64,
    pub hits: i64,
    pub crit_hits: i64,
    pub lucky_hits: i64,
    pub crit_total: i64,
    pub lucky_total: i64,
}

impl HitCells {
    pub fn record(&mut self, value: i64, is_crit: bool, is_lucky: bool) {
        self.total = self.total.saturating_add(value);
        self.hits = self.hits.saturating_add(1);

        if is_crit {
            self.crit_hits = self.crit_hits.saturating_add(1);
            self.crit_total = self.crit_total.saturating_add(value);
        }

        if is_lucky {
            self.lucky_hits = self.lucky_hits.saturating_add(1);
            self.lucky_total = self.lucky_total.saturating_add(value);
        }
    }

    pub fn merge(&mut self, other: &HitCells) {
        self.total = self.total.saturating_add(other.total);
        self.hits = self.hits.saturating_add(other.hits);
        self.crit_hits = self.crit_hits.saturating_add(other.crit_hits);
        self.lucky_hits = self.lucky_hits.saturating_add(other.lucky_hits);
        self.crit_total = self.crit_total.saturating_add(other.crit_total);
        self.lucky_total = self.lucky_total.saturating_add(other.lucky_total);
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorStat {
    pub actor_id: i64,
    pub is_player: bool,
    pub is_local_player: bool,
    pub damage: HitCells,
    pub boss_damage: HitCells,
    pub heal: HitCells,
    pub taken: HitCells,
    pub revives: u32,
    pub deaths: u32,
}

impl ActorStat {
    pub fn new(actor: &ResolvedActor) -> Self {
        Self {
            actor_id: actor.id,
            is_player: actor.is_player(),
            is_local_player: actor.is_local,
            ..Default::default()
        }
    }

    pub fn damage_dealt(&self) -> i64 {
        self.damage.total
    }

    pub fn heal_dealt(&self) -> i64 {
        self.heal.total
    }

    pub fn damage_taken(&self) -> i64 {
        self.taken.total
    }

    pub fn cells(&self, metric: MetricType, boss_only: bool) -> &HitCells {
        match metric {
            MetricType::Dps if boss_only => &self.boss_damage,
            MetricType::Dps => &self.damage,
            MetricType::Heal => &self.heal,
            MetricType::Tanked => &self.taken,
        }
    }
}

/// Rolled-up actor stat together with the registry metadata known at finalization.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorStatRow {
    pub name: String,
    pub class_id: Option<i32>,
    pub spec_id: Option<i32>,
    pub ability_score: Option<i64>,
    pub level: Option<i32>,
    pub attributes: Option<Value>,
    #[serde(flatten)]
    pub stat: ActorStat,
    pub dps: f64,
    pub duration_secs: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillKey {
    pub source_id: i64,
    pub target_id: i64,
    pub skill_id: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitRecord {
    #[serde(rename = "t")]
    pub timestamp_ms: i64,
    #[serde(rename = "v")]
    pub value: i64,
    #[serde(rename = "c", default)]
    pub is_crit: bool,
    #[serde(rename = "l", default)]
    pub is_lucky: bool,
    #[serde(rename = "a", default, skip_serializing_if = "Option::is_none")]
    pub attempt_index: Option<u32>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct SkillStat {
    pub cells: HitCells,
    pub hp_loss: i64,
    pub shield_loss: i64,
    pub target_name: String,
    pub is_boss_target: bool,
    pub hit_log: HitLog,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BossRecord {
    pub monster_name: String,
    pub hits: i64,
    pub total_damage: i64,
    pub max_hp: Option<i64>,
    pub is_defeated: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuffInterval {
    pub start_ms: i64,
    pub end_ms: Option<i64>,
    pub duration_ms: i64,
    pub stack_count: i32,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityBuffs {
    pub entity_id: i64,
    pub buff_id: i32,
    pub intervals: Vec<BuffInterval>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptReason {
    #[default]
    Manual,
    Wipe,
    HpRollback,
}

impl AttemptReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptReason::Manual => "manual",
            AttemptReason::Wipe => "wipe",
            AttemptReason::HpRollback => "hp_rollback",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "manual" => Some(AttemptReason::Manual),
            "wipe" => Some(AttemptReason::Wipe),
            "hp_rollback" => Some(AttemptReason::HpRollback),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub index: u32,
    pub started_at_ms: i64,
    pub ended_at_ms: Option<i64>,
    /// Boundary that opened this attempt.
    pub reason: AttemptReason,
    /// Boundary that closed it, `None` when the encounter itself closed.
    pub end_reason: Option<AttemptReason>,
    pub boss_hp_start: Option<i64>,
    pub boss_hp_end: Option<i64>,
    pub total_deaths: u32,
}

impl Attempt {
    pub fn contains(&self, timestamp_ms: i64) -> bool {
        timestamp_ms >= self.started_at_ms
            && self.ended_at_ms.is_none_or(|end| timestamp_ms <= end)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseKind {
    #[default]
    Mob,
    Boss,
}

impl PhaseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseKind::Mob => "mob",
            PhaseKind::Boss => "boss",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "boss" => PhaseKind::Boss,
            _ => PhaseKind::Mob,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseOutcome {
    Success,
    Wipe,
    #[default]
    Unknown,
}

impl PhaseOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseOutcome::Success => "success",
            PhaseOutcome::Wipe => "wipe",
            PhaseOutcome::Unknown => "unknown",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "success" => PhaseOutcome::Success,
            "wipe" => PhaseOutcome::Wipe,
            _ => PhaseOutcome::Unknown,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Phase {
    pub id: u32,
    pub kind: PhaseKind,
    pub started_at_ms: i64,
    pub ended_at_ms: Option<i64>,
    pub outcome: PhaseOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    Dps,
    Heal,
    Tanked,
}

impl MetricType {
    pub const ALL: [MetricType; 3] = [MetricType::Dps, MetricType::Heal, MetricType::Tanked];
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BossHealth {
    pub uid: i64,
    pub name: String,
    pub current_hp: Option<i64>,
    pub max_hp: Option<i64>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderInfo {
    pub total_dps: f64,
    pub total_dmg: i64,
    pub elapsed_ms: i64,
    pub fight_start_timestamp_ms: i64,
    pub bosses: Vec<BossHealth>,
    pub scene_id: Option<i32>,
    pub scene_name: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRow {
    pub uid: i64,
    pub name: String,
    pub class_id: Option<i32>,
    pub spec_id: Option<i32>,
    pub ability_score: Option<i64>,
    pub total_dmg: i64,
    pub dps: f64,
    pub dmg_pct: f64,
    pub crit_rate: f64,
    pub crit_dmg_rate: f64,
    pub lucky_rate: f64,
    pub lucky_dmg_rate: f64,
    pub hits: i64,
    pub hits_per_minute: f64,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillRow {
    pub skill_id: i32,
    pub name: String,
    pub total_dmg: i64,
    pub dps: f64,
    pub dmg_pct: f64,
    pub crit_rate: f64,
    pub crit_dmg_rate: f64,
    pub lucky_rate: f64,
    pub lucky_dmg_rate: f64,
    pub hits: i64,
    pub hits_per_minute: f64,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayersWindow {
    pub player_rows: Vec<PlayerRow>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillsWindow {
    pub curr_player: Option<PlayerRow>,
    pub skill_rows: Vec<SkillRow>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncounterUpdatePayload {
    pub header_info: HeaderInfo,
    pub is_paused: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayersUpdatePayload {
    pub metric_type: MetricType,
    pub players_window: PlayersWindow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillsUpdatePayload {
    pub metric_type: MetricType,
    pub player_uid: i64,
    pub skills_window: SkillsWindow,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncounterSummary {
    pub id: i64,
    pub session_id: String,
    pub started_at_ms: i64,
    pub ended_at_ms: i64,
    pub duration_secs: i64,
    pub local_player_id: Option<i64>,
    pub total_dmg: i64,
    pub total_heal: i64,
    pub scene_id: Option<i32>,
    pub scene_name: Option<String>,
    pub bosses: Vec<String>,
    pub is_favorite: bool,
    pub uploaded_at_ms: Option<i64>,
    pub remote_encounter_id: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncounterDetail {
    pub summary: EncounterSummary,
    pub actors: Vec<ActorStatRow>,
    pub bosses: Vec<BossRecord>,
    pub phases: Vec<Phase>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerNames {
    pub names: Vec<String>,
}

/// Finalized encounter handed from the state machine to the persistence gateway.
#[derive(Debug, Default, Clone)]
pub struct CompleteEncounter {
    pub session_id: Uuid,
    pub session_started_at_ms: i64,
    pub version: String,
    pub started_at_ms: i64,
    pub ended_at_ms: i64,
    pub duration_secs: i64,
    pub local_player_id: Option<i64>,
    pub total_damage: i64,
    pub total_heal: i64,
    pub scene_id: Option<i32>,
    pub scene_name: Option<String>,
    pub is_manual: bool,
    pub attempts: Vec<Attempt>,
    pub phases: Vec<Phase>,
    pub actors: Vec<ActorStatRow>,
    pub phase_actors: Vec<(u32, ActorStatRow)>,
    pub damage_skills: Vec<(SkillKey, SkillStat)>,
    pub heal_skills: Vec<(SkillKey, SkillStat)>,
    pub bosses: Vec<BossRecord>,
    pub buffs: Vec<EntityBuffs>,
    pub entities: Vec<Entity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub event_update_rate_ms: u64,
    pub boss_only_dps: bool,
    pub wipe_detection: bool,
    pub dungeon_segments_enabled: bool,
    pub inactivity_timeout_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            event_update_rate_ms: DEFAULT_EVENT_UPDATE_RATE_MS,
            boss_only_dps: false,
            wipe_detection: true,
            dungeon_segments_enabled: true,
            inactivity_timeout_ms: DEFAULT_INACTIVITY_TIMEOUT_MS,
        }
    }
}

impl Settings {
    pub fn event_update_rate(&self) -> Duration {
        Duration::from_millis(self.event_update_rate_ms.max(MIN_EVENT_UPDATE_RATE_MS))
    }

    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_millis(self.inactivity_timeout_ms)
    }
}
