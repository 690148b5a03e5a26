use hashbrown::HashMap;

use crate::entity_registry::EntityRegistry;
use crate::models::*;
use crate::utils::per_second;

use super::{EncounterState, LiveEncounter};

impl EncounterState {
    /// Closes everything still open at the last event time and back-fills registry metadata.
    pub(super) fn finalize(&self, mut encounter: LiveEncounter, is_manual: bool) -> CompleteEncounter {
        let ended_at_ms = encounter.last_event_ms;
        encounter.segmenter.finalize(ended_at_ms);
        encounter.buffs.close_all(ended_at_ms);

        let duration_secs = (encounter.elapsed_ms() / 1000).max(1);
        let registry = self.read_registry();
        let aggregator = encounter.aggregator;

        let mut actors: Vec<ActorStatRow> = aggregator
            .actors
            .into_values()
            .map(|stat| to_row(&registry, stat, duration_secs))
            .collect();
        actors.sort_by(|left, right| right.stat.damage.total.cmp(&left.stat.damage.total));

        let phase_durations: HashMap<u32, i64> = encounter
            .segmenter
            .phases()
            .iter()
            .map(|phase| {
                let duration_ms = phase.ended_at_ms.unwrap_or(ended_at_ms) - phase.started_at_ms;
                (phase.id, (duration_ms / 1000).max(1))
            })
            .collect();

        let mut phase_actors: Vec<(u32, ActorStatRow)> = aggregator
            .phase_actors
            .into_iter()
            .map(|((phase_id, _), stat)| {
                let duration_secs = phase_durations.get(&phase_id).copied().unwrap_or(duration_secs);
                (phase_id, to_row(&registry, stat, duration_secs))
            })
            .collect();
        phase_actors.sort_by_key(|(phase_id, row)| (*phase_id, row.stat.actor_id));

        CompleteEncounter {
            session_id: self.session_id,
            session_started_at_ms: self.session_started_at_ms,
            version: self.version.clone(),
            started_at_ms: encounter.started_at_ms,
            ended_at_ms,
            duration_secs,
            local_player_id: registry.local_player_id(),
            total_damage: aggregator.total_damage,
            total_heal: aggregator.total_heal,
            scene_id: encounter.scene_id,
            scene_name: encounter.scene_name,
            is_manual,
            attempts: encounter.segmenter.attempts().to_vec(),
            phases: encounter.segmenter.phases().to_vec(),
            actors,
            phase_actors,
            damage_skills: skill_rows(&registry, aggregator.damage_skills),
            heal_skills: skill_rows(&registry, aggregator.heal_skills),
            bosses: merge_bosses(&registry, aggregator.bosses),
            buffs: encounter.buffs.snapshot(ended_at_ms),
            entities: registry
                .entities()
                .filter(|entity| entity.last_seen_ms >= encounter.started_at_ms)
                .cloned()
                .collect(),
        }
    }
}

fn to_row(registry: &EntityRegistry, stat: ActorStat, duration_secs: i64) -> ActorStatRow {
    let entity = registry.lookup(stat.actor_id);

    ActorStatRow {
        name: registry.name_or_placeholder(stat.actor_id),
        class_id: entity.and_then(|entity| entity.class_id),
        spec_id: entity.and_then(|entity| entity.spec_id),
        ability_score: entity.and_then(|entity| entity.ability_score),
        level: entity.and_then(|entity| entity.level),
        attributes: entity.and_then(|entity| entity.attributes.clone()),
        dps: per_second(stat.damage_dealt(), duration_secs as f64),
        duration_secs,
        stat,
    }
}

fn skill_rows(registry: &EntityRegistry, skills: HashMap<SkillKey, SkillStat>) -> Vec<(SkillKey, SkillStat)> {
    let mut rows: Vec<(SkillKey, SkillStat)> = skills
        .into_iter()
        .map(|(key, mut skill)| {
            skill.target_name = registry.name_or_placeholder(key.target_id);
            (key, skill)
        })
        .collect();

    rows.sort_by_key(|(key, _)| (key.source_id, key.target_id, key.skill_id));
    rows
}

/// One record per distinct boss name.
fn merge_bosses(registry: &EntityRegistry, bosses: HashMap<i64, BossRecord>) -> Vec<BossRecord> {
    let mut merged: Vec<BossRecord> = vec![];

    for (boss_id, record) in bosses {
        let name = registry.name_or_placeholder(boss_id);

        match merged.iter_mut().find(|boss| boss.monster_name == name) {
            Some(existing) => {
                existing.hits = existing.hits.saturating_add(record.hits);
                existing.total_damage = existing.total_damage.saturating_add(record.total_damage);
                existing.max_hp = existing.max_hp.max(record.max_hp);
                existing.is_defeated |= record.is_defeated;
            }
            None => merged.push(BossRecord { monster_name: name, ..record }),
        }
    }

    merged.sort_by(|left, right| left.monster_name.cmp(&right.monster_name));
    merged
}
