use anyhow::Result;
use hashbrown::HashMap;
use rusqlite::types::Type;
use rusqlite::{CachedStatement, OptionalExtension, Row, ToSql, Transaction, params};
use serde::de::DeserializeOwned;

use crate::aggregator::HitLog;
use crate::entity_registry::filter_names;
use crate::models::*;
use crate::utils::{compress_json, decompress_json};

use super::connection_pool::ConnectionPool;
use super::error::QueryResult;

#[cfg(test)]
use mockall::automock;

const CELL_GROUPS: [&str; 4] = ["dealt", "boss", "heal", "taken"];
const CELL_FIELDS: [&str; 6] = ["total", "hits", "crit_hits", "lucky_hits", "crit_total", "lucky_total"];
const ACTOR_META_COLUMNS: [&str; 8] = [
    "name",
    "class_id",
    "spec_id",
    "ability_score",
    "level",
    "attributes",
    "is_player",
    "is_local_player",
];
const ACTOR_TAIL_COLUMNS: [&str; 4] = ["revives", "deaths", "dps", "duration_secs"];

const SUMMARY_COLUMNS: &str = "id, session_id, started_at_ms, ended_at_ms, duration_secs, local_player_id,
    total_dmg, total_heal, scene_id, scene_name, is_favorite, uploaded_at_ms, remote_encounter_id";

/// Column names of the four rolled-up hit cell groups, in storage order.
pub fn cell_columns() -> Vec<String> {
    CELL_GROUPS
        .iter()
        .flat_map(|group| CELL_FIELDS.iter().map(move |field| format!("{group}_{field}")))
        .collect()
}

#[cfg_attr(test, automock)]
pub trait Repository: Send + Sync + 'static {
    /// Writes every row of a finalized encounter in one transaction.
    fn insert_encounter(&self, encounter: &CompleteEncounter) -> Result<i64>;
    fn get_recent_encounters(&self, limit: usize) -> QueryResult<Vec<EncounterSummary>>;
    fn get_encounter(&self, id: i64) -> QueryResult<Option<EncounterSummary>>;
    fn get_actor_stats(&self, encounter_id: i64) -> QueryResult<Vec<ActorStatRow>>;
    fn get_bosses(&self, encounter_id: i64) -> QueryResult<Vec<BossRecord>>;
    fn get_phases(&self, encounter_id: i64) -> QueryResult<Vec<Phase>>;
    fn get_attempts(&self, encounter_id: i64) -> QueryResult<Vec<Attempt>>;
    fn get_damage_skills(&self, encounter_id: i64) -> QueryResult<Vec<(SkillKey, SkillStat)>>;
    fn get_heal_skills(&self, encounter_id: i64) -> QueryResult<Vec<(SkillKey, SkillStat)>>;
    fn get_buffs(&self, encounter_id: i64) -> QueryResult<Vec<EntityBuffs>>;
    fn get_entity_names(&self, ids: Vec<i64>) -> QueryResult<HashMap<i64, Entity>>;
    /// Returns false when no such encounter exists.
    fn delete_encounter(&self, id: i64) -> QueryResult<bool>;
    fn set_favorite(&self, id: i64, is_favorite: bool) -> QueryResult<bool>;
    fn filter_player_names(&self, prefix: &str) -> QueryResult<Vec<String>>;
    fn get_pending_uploads(&self, limit: usize) -> QueryResult<Vec<EncounterSummary>>;
    fn mark_uploaded(&self, id: i64, remote_id: &str, uploaded_at_ms: i64) -> QueryResult<bool>;
}

pub struct SqliteRepository {
    pool: ConnectionPool,
}

impl SqliteRepository {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }
}

impl Repository for SqliteRepository {
    fn insert_encounter(&self, encounter: &CompleteEncounter) -> Result<i64> {
        let mut connection = self.pool.get()?;
        let transaction = connection.transaction()?;

        transaction.execute(
            "INSERT OR IGNORE INTO sessions (id, started_at_ms, version) VALUES (?1, ?2, ?3)",
            params![encounter.session_id.to_string(), encounter.session_started_at_ms, encounter.version],
        )?;

        transaction.execute(
            "
    INSERT INTO encounters (
        session_id,
        started_at_ms,
        ended_at_ms,
        duration_secs,
        local_player_id,
        total_dmg,
        total_heal,
        scene_id,
        scene_name,
        is_manual,
        version
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                encounter.session_id.to_string(),
                encounter.started_at_ms,
                encounter.ended_at_ms,
                encounter.duration_secs,
                encounter.local_player_id,
                encounter.total_damage,
                encounter.total_heal,
                encounter.scene_id,
                encounter.scene_name,
                encounter.is_manual,
                encounter.version,
            ],
        )?;
        let encounter_id = transaction.last_insert_rowid();

        insert_attempts(&transaction, encounter_id, &encounter.attempts)?;
        insert_phases(&transaction, encounter_id, &encounter.phases)?;
        insert_actor_stats(&transaction, encounter_id, encounter)?;
        insert_skill_stats(&transaction, encounter_id, encounter)?;
        insert_bosses(&transaction, encounter_id, &encounter.bosses)?;
        insert_buffs(&transaction, encounter_id, &encounter.buffs)?;
        upsert_entities(&transaction, &encounter.entities)?;

        transaction.commit()?;

        Ok(encounter_id)
    }

    fn get_recent_encounters(&self, limit: usize) -> QueryResult<Vec<EncounterSummary>> {
        let connection = self.pool.get()?;
        let mut statement = connection.prepare_cached(&format!(
            "SELECT {SUMMARY_COLUMNS} FROM encounters ORDER BY started_at_ms DESC, id DESC LIMIT ?1"
        ))?;

        let mut summaries = statement
            .query_map([limit as i64], read_summary)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        drop(statement);

        for summary in summaries.iter_mut() {
            summary.bosses = boss_names(&connection, summary.id)?;
        }

        Ok(summaries)
    }

    fn get_encounter(&self, id: i64) -> QueryResult<Option<EncounterSummary>> {
        let connection = self.pool.get()?;
        let mut statement = connection.prepare_cached(&format!("SELECT {SUMMARY_COLUMNS} FROM encounters WHERE id = ?1"))?;

        let summary = statement.query_row([id], read_summary).optional()?;
        drop(statement);

        match summary {
            Some(mut summary) => {
                summary.bosses = boss_names(&connection, id)?;
                Ok(Some(summary))
            }
            None => Ok(None),
        }
    }

    fn get_actor_stats(&self, encounter_id: i64) -> QueryResult<Vec<ActorStatRow>> {
        let connection = self.pool.get()?;
        let mut statement = connection.prepare_cached(&format!(
            "SELECT actor_id, {} FROM actor_encounter_stats WHERE encounter_id = ?1 ORDER BY dealt_total DESC, actor_id",
            actor_value_columns().join(", ")
        ))?;

        let rows = statement
            .query_map([encounter_id], read_actor_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
    }

    fn get_bosses(&self, encounter_id: i64) -> QueryResult<Vec<BossRecord>> {
        let connection = self.pool.get()?;
        let mut statement = connection.prepare_cached(
            "SELECT monster_name, hits, total_damage, max_hp, is_defeated
             FROM encounter_bosses WHERE encounter_id = ?1 ORDER BY monster_name",
        )?;

        let bosses = statement
            .query_map([encounter_id], |row| {
                Ok(BossRecord {
                    monster_name: row.get(0)?,
                    hits: row.get(1)?,
                    total_damage: row.get(2)?,
                    max_hp: row.get(3)?,
                    is_defeated: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(bosses)
    }

    fn get_phases(&self, encounter_id: i64) -> QueryResult<Vec<Phase>> {
        let connection = self.pool.get()?;
        let mut statement = connection.prepare_cached(
            "SELECT phase_id, kind, started_at_ms, ended_at_ms, outcome
             FROM encounter_phases WHERE encounter_id = ?1 ORDER BY phase_id",
        )?;

        let phases = statement
            .query_map([encounter_id], |row| {
                Ok(Phase {
                    id: row.get(0)?,
                    kind: PhaseKind::parse(&row.get::<_, String>(1)?),
                    started_at_ms: row.get(2)?,
                    ended_at_ms: row.get(3)?,
                    outcome: PhaseOutcome::parse(&row.get::<_, String>(4)?),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(phases)
    }

    fn get_attempts(&self, encounter_id: i64) -> QueryResult<Vec<Attempt>> {
        let connection = self.pool.get()?;
        let mut statement = connection.prepare_cached(
            "SELECT attempt_index, started_at_ms, ended_at_ms, reason, end_reason,
                    boss_hp_start, boss_hp_end, total_deaths
             FROM attempts WHERE encounter_id = ?1 ORDER BY attempt_index",
        )?;

        let attempts = statement
            .query_map([encounter_id], |row| {
                let reason: String = row.get(3)?;
                let end_reason: Option<String> = row.get(4)?;

                Ok(Attempt {
                    index: row.get(0)?,
                    started_at_ms: row.get(1)?,
                    ended_at_ms: row.get(2)?,
                    reason: AttemptReason::parse(&reason).unwrap_or_default(),
                    end_reason: end_reason.as_deref().and_then(AttemptReason::parse),
                    boss_hp_start: row.get(5)?,
                    boss_hp_end: row.get(6)?,
                    total_deaths: row.get(7)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(attempts)
    }

    fn get_damage_skills(&self, encounter_id: i64) -> QueryResult<Vec<(SkillKey, SkillStat)>> {
        let connection = self.pool.get()?;
        let mut statement = connection.prepare_cached(
            "SELECT attacker_id, defender_id, skill_id, target_name, is_boss_target,
                    total, hits, crit_hits, lucky_hits, crit_total, lucky_total,
                    hp_loss, shield_loss, hit_details
             FROM damage_skill_stats WHERE encounter_id = ?1",
        )?;

        let skills = statement
            .query_map([encounter_id], |row| {
                let key = SkillKey { source_id: row.get(0)?, target_id: row.get(1)?, skill_id: row.get(2)? };
                let skill = SkillStat {
                    target_name: row.get(3)?,
                    is_boss_target: row.get(4)?,
                    cells: read_cells(row, 5)?,
                    hp_loss: row.get(11)?,
                    shield_loss: row.get(12)?,
                    hit_log: read_hit_log(row, 13)?,
                };

                Ok((key, skill))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(skills)
    }

    fn get_heal_skills(&self, encounter_id: i64) -> QueryResult<Vec<(SkillKey, SkillStat)>> {
        let connection = self.pool.get()?;
        let mut statement = connection.prepare_cached(
            "SELECT healer_id, target_id, skill_id, target_name,
                    total, hits, crit_hits, lucky_hits, crit_total, lucky_total, hit_details
             FROM heal_skill_stats WHERE encounter_id = ?1",
        )?;

        let skills = statement
            .query_map([encounter_id], |row| {
                let key = SkillKey { source_id: row.get(0)?, target_id: row.get(1)?, skill_id: row.get(2)? };
                let skill = SkillStat {
                    target_name: row.get(3)?,
                    cells: read_cells(row, 4)?,
                    hit_log: read_hit_log(row, 10)?,
                    ..Default::default()
                };

                Ok((key, skill))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(skills)
    }

    fn get_buffs(&self, encounter_id: i64) -> QueryResult<Vec<EntityBuffs>> {
        let connection = self.pool.get()?;
        let mut statement = connection.prepare_cached(
            "SELECT entity_id, buff_id, intervals FROM buffs
             WHERE encounter_id = ?1 ORDER BY entity_id, buff_id",
        )?;

        let buffs = statement
            .query_map([encounter_id], |row| {
                Ok(EntityBuffs {
                    entity_id: row.get(0)?,
                    buff_id: row.get(1)?,
                    intervals: read_json(row, 2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(buffs)
    }

    fn get_entity_names(&self, ids: Vec<i64>) -> QueryResult<HashMap<i64, Entity>> {
        let connection = self.pool.get()?;
        let mut statement = connection.prepare_cached(
            "SELECT entity_id, kind, name, class_id, spec_id, ability_score, level, first_seen_ms, last_seen_ms
             FROM entities WHERE entity_id = ?1",
        )?;
        let mut entities = HashMap::new();

        for id in ids {
            let entity = statement
                .query_row([id], |row| {
                    Ok(Entity {
                        id: row.get(0)?,
                        kind: EntityKind::parse(&row.get::<_, String>(1)?),
                        name: row.get(2)?,
                        class_id: row.get(3)?,
                        spec_id: row.get(4)?,
                        ability_score: row.get(5)?,
                        level: row.get(6)?,
                        first_seen_ms: row.get::<_, Option<i64>>(7)?.unwrap_or_default(),
                        last_seen_ms: row.get::<_, Option<i64>>(8)?.unwrap_or_default(),
                        ..Default::default()
                    })
                })
                .optional()?;

            if let Some(entity) = entity {
                entities.insert(id, entity);
            }
        }

        Ok(entities)
    }

    fn delete_encounter(&self, id: i64) -> QueryResult<bool> {
        let connection = self.pool.get()?;
        let deleted = connection.execute("DELETE FROM encounters WHERE id = ?1", [id])?;

        Ok(deleted > 0)
    }

    fn set_favorite(&self, id: i64, is_favorite: bool) -> QueryResult<bool> {
        let connection = self.pool.get()?;
        let updated = connection.execute("UPDATE encounters SET is_favorite = ?1 WHERE id = ?2", params![is_favorite, id])?;

        Ok(updated > 0)
    }

    fn filter_player_names(&self, prefix: &str) -> QueryResult<Vec<String>> {
        let needle = prefix.trim().to_lowercase();

        if needle.is_empty() {
            return Ok(vec![]);
        }

        let pattern = format!("%{}%", escape_like(&needle));
        let connection = self.pool.get()?;
        let mut statement = connection.prepare_cached(
            "SELECT DISTINCT name FROM entities
             WHERE kind = 'player' AND name IS NOT NULL AND name LIKE ?1 ESCAPE '\\'",
        )?;

        let names = statement
            .query_map([pattern], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(filter_names(names.iter().map(String::as_str), &needle))
    }

    fn get_pending_uploads(&self, limit: usize) -> QueryResult<Vec<EncounterSummary>> {
        let connection = self.pool.get()?;
        let mut statement = connection.prepare_cached(&format!(
            "SELECT {SUMMARY_COLUMNS} FROM encounters
             WHERE uploaded_at_ms IS NULL ORDER BY started_at_ms, id LIMIT ?1"
        ))?;

        let summaries = statement
            .query_map([limit as i64], read_summary)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(summaries)
    }

    fn mark_uploaded(&self, id: i64, remote_id: &str, uploaded_at_ms: i64) -> QueryResult<bool> {
        let connection = self.pool.get()?;
        let updated = connection.execute(
            "UPDATE encounters SET uploaded_at_ms = ?1, remote_encounter_id = ?2 WHERE id = ?3",
            params![uploaded_at_ms, remote_id, id],
        )?;

        Ok(updated > 0)
    }
}

fn insert_attempts(transaction: &Transaction, encounter_id: i64, attempts: &[Attempt]) -> Result<()> {
    let mut statement = transaction.prepare_cached(
        "
    INSERT INTO attempts (
        encounter_id,
        attempt_index,
        started_at_ms,
        ended_at_ms,
        reason,
        end_reason,
        boss_hp_start,
        boss_hp_end,
        total_deaths
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )?;

    for attempt in attempts {
        statement.execute(params![
            encounter_id,
            attempt.index,
            attempt.started_at_ms,
            attempt.ended_at_ms,
            attempt.reason.as_str(),
            attempt.end_reason.map(|reason| reason.as_str()),
            attempt.boss_hp_start,
            attempt.boss_hp_end,
            attempt.total_deaths,
        ])?;
    }

    Ok(())
}

fn insert_phases(transaction: &Transaction, encounter_id: i64, phases: &[Phase]) -> Result<()> {
    let mut statement = transaction.prepare_cached(
        "
    INSERT INTO encounter_phases (
        encounter_id,
        phase_id,
        kind,
        started_at_ms,
        ended_at_ms,
        outcome
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;

    for phase in phases {
        statement.execute(params![
            encounter_id,
            phase.id,
            phase.kind.as_str(),
            phase.started_at_ms,
            phase.ended_at_ms,
            phase.outcome.as_str(),
        ])?;
    }

    Ok(())
}

fn insert_actor_stats(transaction: &Transaction, encounter_id: i64, encounter: &CompleteEncounter) -> Result<()> {
    let mut statement = transaction.prepare_cached(&actor_insert_sql("actor_encounter_stats", &["encounter_id", "actor_id"]))?;

    for row in &encounter.actors {
        execute_actor_row(&mut statement, &[encounter_id, row.stat.actor_id], row)?;
    }

    let mut statement = transaction.prepare_cached(&actor_insert_sql(
        "actor_phase_stats",
        &["encounter_id", "phase_id", "actor_id"],
    ))?;

    for (phase_id, row) in &encounter.phase_actors {
        execute_actor_row(&mut statement, &[encounter_id, *phase_id as i64, row.stat.actor_id], row)?;
    }

    Ok(())
}

fn insert_skill_stats(transaction: &Transaction, encounter_id: i64, encounter: &CompleteEncounter) -> Result<()> {
    let mut statement = transaction.prepare_cached(
        "
    INSERT INTO damage_skill_stats (
        encounter_id,
        attacker_id,
        defender_id,
        skill_id,
        target_name,
        is_boss_target,
        total,
        hits,
        crit_hits,
        lucky_hits,
        crit_total,
        lucky_total,
        hp_loss,
        shield_loss,
        hit_details
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
    )?;

    for (key, skill) in &encounter.damage_skills {
        let hit_details = compress_json(skill.hit_log.records())?;
        let cells = &skill.cells;

        statement.execute(params![
            encounter_id,
            key.source_id,
            key.target_id,
            key.skill_id,
            skill.target_name,
            skill.is_boss_target,
            cells.total,
            cells.hits,
            cells.crit_hits,
            cells.lucky_hits,
            cells.crit_total,
            cells.lucky_total,
            skill.hp_loss,
            skill.shield_loss,
            hit_details,
        ])?;
    }

    let mut statement = transaction.prepare_cached(
        "
    INSERT INTO heal_skill_stats (
        encounter_id,
        healer_id,
        target_id,
        skill_id,
        target_name,
        total,
        hits,
        crit_hits,
        lucky_hits,
        crit_total,
        lucky_total,
        hit_details
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
    )?;

    for (key, skill) in &encounter.heal_skills {
        let hit_details = compress_json(skill.hit_log.records())?;
        let cells = &skill.cells;

        statement.execute(params![
            encounter_id,
            key.source_id,
            key.target_id,
            key.skill_id,
            skill.target_name,
            cells.total,
            cells.hits,
            cells.crit_hits,
            cells.lucky_hits,
            cells.crit_total,
            cells.lucky_total,
            hit_details,
        ])?;
    }

    Ok(())
}

fn insert_bosses(transaction: &Transaction, encounter_id: i64, bosses: &[BossRecord]) -> Result<()> {
    let mut statement = transaction.prepare_cached(
        "
    INSERT INTO encounter_bosses (
        encounter_id,
        monster_name,
        hits,
        total_damage,
        max_hp,
        is_defeated
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;

    for boss in bosses {
        statement.execute(params![
            encounter_id,
            boss.monster_name,
            boss.hits,
            boss.total_damage,
            boss.max_hp,
            boss.is_defeated,
        ])?;
    }

    Ok(())
}

fn insert_buffs(transaction: &Transaction, encounter_id: i64, buffs: &[EntityBuffs]) -> Result<()> {
    let mut statement = transaction.prepare_cached(
        "INSERT INTO buffs (encounter_id, entity_id, buff_id, intervals) VALUES (?1, ?2, ?3, ?4)",
    )?;

    for buff in buffs {
        statement.execute(params![
            encounter_id,
            buff.entity_id,
            buff.buff_id,
            serde_json::to_string(&buff.intervals)?,
        ])?;
    }

    Ok(())
}

fn upsert_entities(transaction: &Transaction, entities: &[Entity]) -> Result<()> {
    let mut statement = transaction.prepare_cached(
        "
    INSERT INTO entities (
        entity_id,
        kind,
        name,
        class_id,
        spec_id,
        ability_score,
        level,
        attributes,
        first_seen_ms,
        last_seen_ms
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
    ON CONFLICT (entity_id) DO UPDATE SET
        kind = excluded.kind,
        name = COALESCE(excluded.name, entities.name),
        class_id = COALESCE(excluded.class_id, entities.class_id),
        spec_id = COALESCE(excluded.spec_id, entities.spec_id),
        ability_score = COALESCE(excluded.ability_score, entities.ability_score),
        level = COALESCE(excluded.level, entities.level),
        attributes = COALESCE(excluded.attributes, entities.attributes),
        first_seen_ms = MIN(COALESCE(entities.first_seen_ms, excluded.first_seen_ms), excluded.first_seen_ms),
        last_seen_ms = MAX(COALESCE(entities.last_seen_ms, excluded.last_seen_ms), excluded.last_seen_ms)",
    )?;

    for entity in entities {
        statement.execute(params![
            entity.id,
            entity.kind.as_str(),
            entity.name,
            entity.class_id,
            entity.spec_id,
            entity.ability_score,
            entity.level,
            entity.attributes,
            entity.first_seen_ms,
            entity.last_seen_ms,
        ])?;
    }

    Ok(())
}

/// Everything after the key columns of an actor stat row.
fn actor_value_columns() -> Vec<String> {
    ACTOR_META_COLUMNS
        .iter()
        .map(|column| column.to_string())
        .chain(cell_columns())
        .chain(ACTOR_TAIL_COLUMNS.iter().map(|column| column.to_string()))
        .collect()
}

fn actor_insert_sql(table: &str, key_columns: &[&str]) -> String {
    let columns: Vec<String> = key_columns
        .iter()
        .map(|column| column.to_string())
        .chain(actor_value_columns())
        .collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|index| format!("?{index}")).collect();

    format!("INSERT INTO {table} ({}) VALUES ({})", columns.join(", "), placeholders.join(", "))
}

fn execute_actor_row(statement: &mut CachedStatement, keys: &[i64], row: &ActorStatRow) -> rusqlite::Result<usize> {
    let stat = &row.stat;
    let cells: Vec<i64> = [&stat.damage, &stat.boss_damage, &stat.heal, &stat.taken]
        .into_iter()
        .flat_map(cell_values)
        .collect();

    let meta: [&dyn ToSql; 8] = [
        &row.name,
        &row.class_id,
        &row.spec_id,
        &row.ability_score,
        &row.level,
        &row.attributes,
        &stat.is_player,
        &stat.is_local_player,
    ];
    let tail: [&dyn ToSql; 4] = [&stat.revives, &stat.deaths, &row.dps, &row.duration_secs];

    let mut values: Vec<&dyn ToSql> = keys.iter().map(|key| key as &dyn ToSql).collect();
    values.extend(meta);
    values.extend(cells.iter().map(|value| value as &dyn ToSql));
    values.extend(tail);

    statement.execute(values.as_slice())
}

fn cell_values(cells: &HitCells) -> [i64; 6] {
    [cells.total, cells.hits, cells.crit_hits, cells.lucky_hits, cells.crit_total, cells.lucky_total]
}

fn read_cells(row: &Row, start: usize) -> rusqlite::Result<HitCells> {
    Ok(HitCells {
        total: row.get(start)?,
        hits: row.get(start + 1)?,
        crit_hits: row.get(start + 2)?,
        lucky_hits: row.get(start + 3)?,
        crit_total: row.get(start + 4)?,
        lucky_total: row.get(start + 5)?,
    })
}

/// Reads `actor_id` followed by `actor_value_columns()`.
fn read_actor_row(row: &Row) -> rusqlite::Result<ActorStatRow> {
    let cells_start = 1 + ACTOR_META_COLUMNS.len();
    let tail_start = cells_start + CELL_GROUPS.len() * CELL_FIELDS.len();

    Ok(ActorStatRow {
        name: row.get(1)?,
        class_id: row.get(2)?,
        spec_id: row.get(3)?,
        ability_score: row.get(4)?,
        level: row.get(5)?,
        attributes: row.get(6)?,
        stat: ActorStat {
            actor_id: row.get(0)?,
            is_player: row.get(7)?,
            is_local_player: row.get(8)?,
            damage: read_cells(row, cells_start)?,
            boss_damage: read_cells(row, cells_start + 6)?,
            heal: read_cells(row, cells_start + 12)?,
            taken: read_cells(row, cells_start + 18)?,
            revives: row.get(tail_start)?,
            deaths: row.get(tail_start + 1)?,
        },
        dps: row.get(tail_start + 2)?,
        duration_secs: row.get(tail_start + 3)?,
    })
}

fn read_summary(row: &Row) -> rusqlite::Result<EncounterSummary> {
    Ok(EncounterSummary {
        id: row.get(0)?,
        session_id: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        started_at_ms: row.get(2)?,
        ended_at_ms: row.get(3)?,
        duration_secs: row.get(4)?,
        local_player_id: row.get(5)?,
        total_dmg: row.get(6)?,
        total_heal: row.get(7)?,
        scene_id: row.get(8)?,
        scene_name: row.get(9)?,
        bosses: vec![],
        is_favorite: row.get(10)?,
        uploaded_at_ms: row.get(11)?,
        remote_encounter_id: row.get(12)?,
    })
}

fn read_hit_log(row: &Row, index: usize) -> rusqlite::Result<HitLog> {
    let bytes: Option<Vec<u8>> = row.get(index)?;

    match bytes {
        Some(bytes) => decompress_json::<Vec<HitRecord>>(&bytes)
            .map(HitLog::from_records)
            .map_err(|err| rusqlite::Error::FromSqlConversionFailure(index, Type::Blob, err.into())),
        None => Ok(HitLog::new()),
    }
}

fn read_json<T: DeserializeOwned>(row: &Row, index: usize) -> rusqlite::Result<T> {
    let text: String = row.get(index)?;

    serde_json::from_str(&text).map_err(|err| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(err)))
}

fn boss_names(connection: &rusqlite::Connection, encounter_id: i64) -> rusqlite::Result<Vec<String>> {
    let mut statement =
        connection.prepare_cached("SELECT monster_name FROM encounter_bosses WHERE encounter_id = ?1 ORDER BY monster_name")?;

    statement
        .query_map([encounter_id], |row| row.get(0))?
        .collect()
}

fn escape_like(value: &str) -> String {
    value.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}
