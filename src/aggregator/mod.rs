mod buff_tracker;
mod hit_log;

pub use buff_tracker::BuffTracker;
pub use hit_log::{HitLog, belongs_to};

use hashbrown::HashMap;

use crate::models::*;

/// Incrementally maintained rollups for the live encounter. Every `apply` is O(1).
#[derive(Debug, Default, Clone)]
pub struct Aggregator {
    pub total_damage: i64,
    pub total_heal: i64,
    pub actors: HashMap<i64, ActorStat>,
    pub phase_actors: HashMap<(u32, i64), ActorStat>,
    pub damage_skills: HashMap<SkillKey, SkillStat>,
    pub heal_skills: HashMap<SkillKey, SkillStat>,
    pub bosses: HashMap<i64, BossRecord>,
    track_phases: bool,
}

impl Aggregator {
    pub fn new(track_phases: bool) -> Self {
        Self {
            track_phases,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    pub fn apply(&mut self, event: &ResolvedEvent) {
        let phase_id = event.phase_id.filter(|_| self.track_phases);

        match &event.kind {
            ResolvedKind::Damage {
                attacker,
                defender,
                skill_id,
                value,
                hp_loss,
                shield_loss,
                is_crit,
                is_lucky,
                is_boss_target,
                defender_name,
                defender_max_hp,
            } => {
                let (value, is_crit, is_lucky) = (*value, *is_crit, *is_lucky);

                self.update_actor(attacker, phase_id, |stat| {
                    stat.damage.record(value, is_crit, is_lucky);
                    if *is_boss_target {
                        stat.boss_damage.record(value, is_crit, is_lucky);
                    }
                });
                self.update_actor(defender, phase_id, |stat| {
                    stat.taken.record(value, is_crit, is_lucky);
                });

                if attacker.is_player() {
                    self.total_damage = self.total_damage.saturating_add(value);
                }

                let key = SkillKey { source_id: attacker.id, target_id: defender.id, skill_id: *skill_id };
                let skill = self.damage_skills.entry(key).or_default();
                skill.cells.record(value, is_crit, is_lucky);
                skill.hp_loss = skill.hp_loss.saturating_add(*hp_loss);
                skill.shield_loss = skill.shield_loss.saturating_add(*shield_loss);
                skill.is_boss_target |= is_boss_target;
                skill.target_name.clone_from(defender_name);
                skill.hit_log.push(HitRecord {
                    timestamp_ms: event.timestamp_ms,
                    value,
                    is_crit,
                    is_lucky,
                    attempt_index: Some(event.attempt_index),
                });

                if *is_boss_target {
                    let boss = self.bosses.entry(defender.id).or_default();
                    boss.monster_name.clone_from(defender_name);
                    boss.hits = boss.hits.saturating_add(1);
                    boss.total_damage = boss.total_damage.saturating_add(value);
                    if defender_max_hp.is_some() {
                        boss.max_hp = *defender_max_hp;
                    }
                }
            }
            ResolvedKind::Heal { healer, target, skill_id, value, is_crit, is_lucky, target_name } => {
                let (value, is_crit, is_lucky) = (*value, *is_crit, *is_lucky);

                self.update_actor(healer, phase_id, |stat| stat.heal.record(value, is_crit, is_lucky));

                if healer.is_player() {
                    self.total_heal = self.total_heal.saturating_add(value);
                }

                let key = SkillKey { source_id: healer.id, target_id: target.id, skill_id: *skill_id };
                let skill = self.heal_skills.entry(key).or_default();
                skill.cells.record(value, is_crit, is_lucky);
                skill.target_name.clone_from(target_name);
                skill.hit_log.push(HitRecord {
                    timestamp_ms: event.timestamp_ms,
                    value,
                    is_crit,
                    is_lucky,
                    attempt_index: Some(event.attempt_index),
                });
            }
            ResolvedKind::Death { actor } => {
                self.update_actor(actor, phase_id, |stat| stat.deaths += 1);
            }
            ResolvedKind::Revive { actor } => {
                self.update_actor(actor, phase_id, |stat| stat.revives += 1);
            }
        }
    }

    fn update_actor<F>(&mut self, actor: &ResolvedActor, phase_id: Option<u32>, update: F)
    where
        F: Fn(&mut ActorStat),
    {
        let stat = self.actors.entry(actor.id).or_insert_with(|| ActorStat::new(actor));
        stat.is_local_player |= actor.is_local;
        update(stat);

        if let Some(phase_id) = phase_id {
            let stat = self
                .phase_actors
                .entry((phase_id, actor.id))
                .or_insert_with(|| ActorStat::new(actor));
            update(stat);
        }
    }

    pub fn boss_defeated(&mut self, boss_id: i64, name: &str) {
        let boss = self.bosses.entry(boss_id).or_default();
        boss.is_defeated = true;

        if boss.monster_name.is_empty() {
            boss.monster_name = name.to_string();
        }
    }

    /// Per-skill cells of one actor for a metric; boss-only keeps damage against boss targets.
    pub fn skill_breakdown(&self, actor_id: i64, metric: MetricType, boss_only: bool) -> HashMap<i32, HitCells> {
        let mut breakdown: HashMap<i32, HitCells> = HashMap::new();

        let rows: Box<dyn Iterator<Item = (&SkillKey, &SkillStat)> + '_> = match metric {
            MetricType::Dps => Box::new(
                self.damage_skills
                    .iter()
                    .filter(move |(key, skill)| key.source_id == actor_id && (!boss_only || skill.is_boss_target)),
            ),
            MetricType::Heal => Box::new(self.heal_skills.iter().filter(move |(key, _)| key.source_id == actor_id)),
            MetricType::Tanked => Box::new(self.damage_skills.iter().filter(move |(key, _)| key.target_id == actor_id)),
        };

        for (key, skill) in rows {
            breakdown.entry(key.skill_id).or_default().merge(&skill.cells);
        }

        breakdown
    }
}
