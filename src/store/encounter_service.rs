use std::sync::Arc;

use anyhow::Result;
use hashbrown::HashMap;
use log::{info, warn};
use moka::sync::Cache;

use crate::constants::{ENCOUNTER_CACHE_CAPACITY, MAX_RECENT_ENCOUNTERS};
use crate::models::*;
use crate::publisher::{ActorInfo, breakdown_for, players_window, skills_window};
use crate::skill_names::{SharedSkillNames, SkillNames};
use crate::utils::per_second;

use super::error::{QueryError, QueryResult};
use super::repository::Repository;

#[cfg(test)]
use mockall::automock;

#[cfg_attr(test, automock)]
pub trait EncounterService: Send + Sync + 'static {
    fn create(&self, encounter: &CompleteEncounter) -> Result<i64>;
    fn get_recent(&self, limit: usize) -> QueryResult<Vec<EncounterSummary>>;
    fn get_by_id(&self, id: i64) -> QueryResult<EncounterDetail>;
    fn get_player_skills(&self, id: i64, actor_id: i64, metric: MetricType, boss_only: bool) -> QueryResult<SkillsWindow>;
    fn get_attempts(&self, id: i64) -> QueryResult<Vec<Attempt>>;
    /// Actor rollups recomputed from the hit details of one attempt.
    fn get_attempt_actor_stats(&self, id: i64, attempt_index: u32) -> QueryResult<Vec<ActorStatRow>>;
    fn get_attempt_player_skills(
        &self,
        id: i64,
        actor_id: i64,
        attempt_index: u32,
        metric: MetricType,
    ) -> QueryResult<SkillsWindow>;
    fn get_buffs(&self, id: i64) -> QueryResult<Vec<EntityBuffs>>;
    fn delete(&self, id: i64) -> QueryResult<()>;
    fn set_favorite(&self, id: i64, is_favorite: bool) -> QueryResult<()>;
    fn filter_player_names(&self, prefix: &str) -> QueryResult<Vec<String>>;
    fn get_pending_uploads(&self, limit: usize) -> QueryResult<Vec<EncounterSummary>>;
    fn mark_uploaded(&self, id: i64, remote_id: &str, uploaded_at_ms: i64) -> QueryResult<()>;
}

pub struct DefaultEncounterService<R: Repository> {
    repository: R,
    details: Cache<i64, EncounterDetail>,
    skill_names: SharedSkillNames,
}

impl<R: Repository> DefaultEncounterService<R> {
    pub fn new(repository: R) -> Self {
        Self {
            repository,
            details: Cache::builder().max_capacity(ENCOUNTER_CACHE_CAPACITY).build(),
            skill_names: Arc::new(SkillNames::new()),
        }
    }

    pub fn with_skill_names(mut self, skill_names: SharedSkillNames) -> Self {
        self.skill_names = skill_names;
        self
    }

    fn validate_id(id: i64) -> QueryResult<()> {
        if id <= 0 {
            return Err(QueryError::InvalidArgument(format!("encounter id must be positive, got {id}")));
        }

        Ok(())
    }

    fn validate_limit(limit: usize) -> QueryResult<usize> {
        if limit == 0 {
            return Err(QueryError::InvalidArgument("limit must be positive".to_string()));
        }

        Ok(limit.min(MAX_RECENT_ENCOUNTERS))
    }

    fn find_attempt(&self, id: i64, attempt_index: u32) -> QueryResult<Attempt> {
        if attempt_index == 0 {
            return Err(QueryError::InvalidArgument("attempt indices start at 1".to_string()));
        }

        self.get_attempts(id)?
            .into_iter()
            .find(|attempt| attempt.index == attempt_index)
            .ok_or(QueryError::AttemptNotFound { encounter_id: id, attempt_index })
    }

    /// Damage and heal rollups restricted to one attempt, keyed by skill.
    fn replay_skills(&self, id: i64, attempt: &Attempt) -> QueryResult<(Vec<(SkillKey, SkillStat)>, Vec<(SkillKey, SkillStat)>)> {
        let replay = |skills: Vec<(SkillKey, SkillStat)>| -> Vec<(SkillKey, SkillStat)> {
            skills
                .into_iter()
                .filter_map(|(key, skill)| {
                    let cells = skill.hit_log.replay(attempt);
                    (cells.hits > 0).then_some((key, SkillStat { cells, ..skill }))
                })
                .collect()
        };

        Ok((
            replay(self.repository.get_damage_skills(id)?),
            replay(self.repository.get_heal_skills(id)?),
        ))
    }
}

fn attempt_duration_secs(attempt: &Attempt, fallback_end_ms: i64) -> i64 {
    let ended_at_ms = attempt.ended_at_ms.unwrap_or(fallback_end_ms);
    ((ended_at_ms - attempt.started_at_ms) / 1000).max(1)
}

/// Empty attempt row carrying the encounter-level metadata of `actor_id`.
fn attempt_row<'a>(
    rows: &'a mut HashMap<i64, ActorStatRow>,
    templates: &HashMap<i64, &ActorStatRow>,
    actor_id: i64,
    duration_secs: i64,
) -> &'a mut ActorStatRow {
    rows.entry(actor_id).or_insert_with(|| {
        let template = templates.get(&actor_id);

        ActorStatRow {
            name: template.map(|row| row.name.clone()).unwrap_or_default(),
            class_id: template.and_then(|row| row.class_id),
            spec_id: template.and_then(|row| row.spec_id),
            ability_score: template.and_then(|row| row.ability_score),
            level: template.and_then(|row| row.level),
            attributes: template.and_then(|row| row.attributes.clone()),
            stat: ActorStat {
                actor_id,
                is_player: template.is_some_and(|row| row.stat.is_player),
                is_local_player: template.is_some_and(|row| row.stat.is_local_player),
                ..Default::default()
            },
            dps: 0.0,
            duration_secs,
        }
    })
}

fn skill_cells<'a>(skills: &'a [(SkillKey, SkillStat)]) -> impl Iterator<Item = (&'a SkillKey, HitCells, bool)> + 'a {
    skills.iter().map(|(key, skill)| (key, skill.cells, skill.is_boss_target))
}

impl<R: Repository> EncounterService for DefaultEncounterService<R> {
    fn create(&self, encounter: &CompleteEncounter) -> Result<i64> {
        let id = self.repository.insert_encounter(encounter)?;
        info!("stored encounter {id} with {} actors", encounter.actors.len());

        Ok(id)
    }

    fn get_recent(&self, limit: usize) -> QueryResult<Vec<EncounterSummary>> {
        let limit = Self::validate_limit(limit)?;
        self.repository.get_recent_encounters(limit)
    }

    fn get_by_id(&self, id: i64) -> QueryResult<EncounterDetail> {
        Self::validate_id(id)?;

        if let Some(detail) = self.details.get(&id) {
            return Ok(detail);
        }

        let summary = self.repository.get_encounter(id)?.ok_or(QueryError::NotFound(id))?;
        let detail = EncounterDetail {
            actors: self.repository.get_actor_stats(id)?,
            bosses: self.repository.get_bosses(id)?,
            phases: self.repository.get_phases(id)?,
            summary,
        };
        self.details.insert(id, detail.clone());

        Ok(detail)
    }

    fn get_player_skills(&self, id: i64, actor_id: i64, metric: MetricType, boss_only: bool) -> QueryResult<SkillsWindow> {
        let detail = self.get_by_id(id)?;
        let elapsed_secs = detail.summary.duration_secs as f64;
        let skills = match metric {
            MetricType::Heal => self.repository.get_heal_skills(id)?,
            MetricType::Dps | MetricType::Tanked => self.repository.get_damage_skills(id)?,
        };

        let infos: HashMap<i64, ActorInfo> = detail.actors.iter().map(|row| (row.stat.actor_id, ActorInfo::from_row(row))).collect();
        let players = players_window(
            detail.actors.iter().map(|row| &row.stat),
            |uid| infos.get(&uid).cloned().unwrap_or_default(),
            metric,
            boss_only,
            elapsed_secs,
        );
        let curr_player = players.player_rows.into_iter().find(|row| row.uid == actor_id);
        let breakdown = breakdown_for(skill_cells(&skills), actor_id, metric, boss_only);

        Ok(skills_window(&self.skill_names, curr_player, breakdown, elapsed_secs))
    }

    fn get_attempts(&self, id: i64) -> QueryResult<Vec<Attempt>> {
        Self::validate_id(id)?;

        let attempts = self.repository.get_attempts(id)?;

        if attempts.is_empty() && self.repository.get_encounter(id)?.is_none() {
            return Err(QueryError::NotFound(id));
        }

        Ok(attempts)
    }

    fn get_attempt_actor_stats(&self, id: i64, attempt_index: u32) -> QueryResult<Vec<ActorStatRow>> {
        let attempt = self.find_attempt(id, attempt_index)?;
        let detail = self.get_by_id(id)?;
        let duration_secs = attempt_duration_secs(&attempt, detail.summary.ended_at_ms);
        let (damage_skills, heal_skills) = self.replay_skills(id, &attempt)?;

        let templates: HashMap<i64, &ActorStatRow> = detail.actors.iter().map(|row| (row.stat.actor_id, row)).collect();
        let mut rows: HashMap<i64, ActorStatRow> = HashMap::new();

        for (key, skill) in &damage_skills {
            let attacker = attempt_row(&mut rows, &templates, key.source_id, duration_secs);
            attacker.stat.damage.merge(&skill.cells);
            if skill.is_boss_target {
                attacker.stat.boss_damage.merge(&skill.cells);
            }

            attempt_row(&mut rows, &templates, key.target_id, duration_secs).stat.taken.merge(&skill.cells);
        }

        for (key, skill) in &heal_skills {
            attempt_row(&mut rows, &templates, key.source_id, duration_secs).stat.heal.merge(&skill.cells);
        }

        let mut rows: Vec<ActorStatRow> = rows
            .into_values()
            .map(|mut row| {
                row.dps = per_second(row.stat.damage.total, duration_secs as f64);
                row
            })
            .collect();
        rows.sort_by(|left, right| {
            right.stat.damage.total.cmp(&left.stat.damage.total).then(left.stat.actor_id.cmp(&right.stat.actor_id))
        });

        Ok(rows)
    }

    fn get_attempt_player_skills(
        &self,
        id: i64,
        actor_id: i64,
        attempt_index: u32,
        metric: MetricType,
    ) -> QueryResult<SkillsWindow> {
        let attempt = self.find_attempt(id, attempt_index)?;
        let rows = self.get_attempt_actor_stats(id, attempt_index)?;
        let elapsed_secs = rows.first().map(|row| row.duration_secs).unwrap_or(1) as f64;
        let (damage_skills, heal_skills) = self.replay_skills(id, &attempt)?;
        let skills = match metric {
            MetricType::Heal => heal_skills,
            MetricType::Dps | MetricType::Tanked => damage_skills,
        };

        let infos: HashMap<i64, ActorInfo> = rows.iter().map(|row| (row.stat.actor_id, ActorInfo::from_row(row))).collect();
        let players = players_window(
            rows.iter().map(|row| &row.stat),
            |uid| infos.get(&uid).cloned().unwrap_or_default(),
            metric,
            false,
            elapsed_secs,
        );
        let curr_player = players.player_rows.into_iter().find(|row| row.uid == actor_id);
        let breakdown = breakdown_for(skill_cells(&skills), actor_id, metric, false);

        Ok(skills_window(&self.skill_names, curr_player, breakdown, elapsed_secs))
    }

    fn get_buffs(&self, id: i64) -> QueryResult<Vec<EntityBuffs>> {
        Self::validate_id(id)?;
        self.repository.get_buffs(id)
    }

    fn delete(&self, id: i64) -> QueryResult<()> {
        Self::validate_id(id)?;
        let deleted = self.repository.delete_encounter(id)?;
        self.details.invalidate(&id);

        if !deleted {
            return Err(QueryError::NotFound(id));
        }

        info!("deleted encounter {id}");
        Ok(())
    }

    fn set_favorite(&self, id: i64, is_favorite: bool) -> QueryResult<()> {
        Self::validate_id(id)?;
        let updated = self.repository.set_favorite(id, is_favorite)?;
        self.details.invalidate(&id);

        if !updated {
            return Err(QueryError::NotFound(id));
        }

        Ok(())
    }

    fn filter_player_names(&self, prefix: &str) -> QueryResult<Vec<String>> {
        self.repository.filter_player_names(prefix)
    }

    fn get_pending_uploads(&self, limit: usize) -> QueryResult<Vec<EncounterSummary>> {
        let limit = Self::validate_limit(limit)?;
        self.repository.get_pending_uploads(limit)
    }

    fn mark_uploaded(&self, id: i64, remote_id: &str, uploaded_at_ms: i64) -> QueryResult<()> {
        Self::validate_id(id)?;

        if remote_id.trim().is_empty() {
            return Err(QueryError::InvalidArgument("remote id must not be empty".to_string()));
        }

        let updated = self.repository.mark_uploaded(id, remote_id, uploaded_at_ms)?;
        self.details.invalidate(&id);

        if !updated {
            warn!("upload marker for missing encounter {id}");
            return Err(QueryError::NotFound(id));
        }

        Ok(())
    }
}
