use anyhow::{Context, Result};
use log::info;

use crate::constants::DB_VERSION;

use super::connection_pool::ConnectionPool;
use super::repository::cell_columns;

/// Applies versioned schema migrations tracked in `PRAGMA user_version`.
pub struct MigrationRunner {
    pool: ConnectionPool,
}

impl MigrationRunner {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    /// Returns the schema version after migrating.
    pub fn run(&self) -> Result<i32> {
        let mut connection = self.pool.get()?;
        let current: i32 = connection.query_row("PRAGMA user_version", [], |row| row.get(0))?;

        for (version, sql) in migrations().into_iter().enumerate() {
            let version = version as i32 + 1;

            if version <= current {
                continue;
            }

            let transaction = connection.transaction()?;
            transaction
                .execute_batch(&sql)
                .with_context(|| format!("migration {version} failed"))?;
            transaction.pragma_update(None, "user_version", version)?;
            transaction.commit()?;

            info!("applied migration {version}");
        }

        Ok(current.max(DB_VERSION))
    }
}

fn stat_columns_sql() -> String {
    cell_columns()
        .iter()
        .map(|column| format!("{column} INTEGER NOT NULL DEFAULT 0,"))
        .collect::<Vec<_>>()
        .join("\n    ")
}

fn migrations() -> Vec<String> {
    let stat_columns = stat_columns_sql();

    vec![
        format!(
            "
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    started_at_ms INTEGER NOT NULL,
    version TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS entities (
    entity_id INTEGER PRIMARY KEY,
    kind TEXT NOT NULL DEFAULT 'player',
    name TEXT,
    class_id INTEGER,
    spec_id INTEGER,
    ability_score INTEGER,
    level INTEGER,
    attributes TEXT,
    first_seen_ms INTEGER,
    last_seen_ms INTEGER
);

CREATE INDEX IF NOT EXISTS entities_name_idx ON entities (name COLLATE NOCASE);

CREATE TABLE IF NOT EXISTS encounters (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT REFERENCES sessions (id) ON DELETE SET NULL,
    started_at_ms INTEGER NOT NULL,
    ended_at_ms INTEGER NOT NULL,
    duration_secs INTEGER NOT NULL,
    local_player_id INTEGER,
    total_dmg INTEGER NOT NULL DEFAULT 0,
    total_heal INTEGER NOT NULL DEFAULT 0,
    scene_id INTEGER,
    scene_name TEXT,
    is_manual INTEGER NOT NULL DEFAULT 0,
    version TEXT
);

CREATE INDEX IF NOT EXISTS encounters_started_at_idx ON encounters (started_at_ms DESC);

CREATE TABLE IF NOT EXISTS damage_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    encounter_id INTEGER NOT NULL REFERENCES encounters (id) ON DELETE CASCADE,
    timestamp_ms INTEGER NOT NULL,
    attacker_id INTEGER NOT NULL,
    defender_id INTEGER,
    skill_id INTEGER,
    value INTEGER NOT NULL,
    is_crit INTEGER NOT NULL DEFAULT 0,
    is_lucky INTEGER NOT NULL DEFAULT 0,
    hp_loss INTEGER NOT NULL DEFAULT 0,
    shield_loss INTEGER NOT NULL DEFAULT 0,
    is_boss INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS heal_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    encounter_id INTEGER NOT NULL REFERENCES encounters (id) ON DELETE CASCADE,
    timestamp_ms INTEGER NOT NULL,
    healer_id INTEGER NOT NULL,
    target_id INTEGER,
    skill_id INTEGER,
    value INTEGER NOT NULL,
    is_crit INTEGER NOT NULL DEFAULT 0,
    is_lucky INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS actor_encounter_stats (
    encounter_id INTEGER NOT NULL REFERENCES encounters (id) ON DELETE CASCADE,
    actor_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    class_id INTEGER,
    spec_id INTEGER,
    ability_score INTEGER,
    level INTEGER,
    attributes TEXT,
    is_player INTEGER NOT NULL DEFAULT 0,
    is_local_player INTEGER NOT NULL DEFAULT 0,
    {stat_columns}
    revives INTEGER NOT NULL DEFAULT 0,
    deaths INTEGER NOT NULL DEFAULT 0,
    dps REAL NOT NULL DEFAULT 0,
    duration_secs INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (encounter_id, actor_id)
);
"
        ),
        format!(
            "
CREATE TABLE IF NOT EXISTS attempts (
    encounter_id INTEGER NOT NULL REFERENCES encounters (id) ON DELETE CASCADE,
    attempt_index INTEGER NOT NULL,
    started_at_ms INTEGER NOT NULL,
    ended_at_ms INTEGER,
    reason TEXT NOT NULL,
    end_reason TEXT,
    boss_hp_start INTEGER,
    boss_hp_end INTEGER,
    total_deaths INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (encounter_id, attempt_index)
);

CREATE TABLE IF NOT EXISTS encounter_phases (
    encounter_id INTEGER NOT NULL REFERENCES encounters (id) ON DELETE CASCADE,
    phase_id INTEGER NOT NULL,
    kind TEXT NOT NULL,
    started_at_ms INTEGER NOT NULL,
    ended_at_ms INTEGER,
    outcome TEXT NOT NULL,
    PRIMARY KEY (encounter_id, phase_id)
);

CREATE TABLE IF NOT EXISTS actor_phase_stats (
    encounter_id INTEGER NOT NULL REFERENCES encounters (id) ON DELETE CASCADE,
    phase_id INTEGER NOT NULL,
    actor_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    class_id INTEGER,
    spec_id INTEGER,
    ability_score INTEGER,
    level INTEGER,
    attributes TEXT,
    is_player INTEGER NOT NULL DEFAULT 0,
    is_local_player INTEGER NOT NULL DEFAULT 0,
    {stat_columns}
    revives INTEGER NOT NULL DEFAULT 0,
    deaths INTEGER NOT NULL DEFAULT 0,
    dps REAL NOT NULL DEFAULT 0,
    duration_secs INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (encounter_id, phase_id, actor_id)
);
"
        ),
        "
CREATE TABLE IF NOT EXISTS damage_skill_stats (
    encounter_id INTEGER NOT NULL REFERENCES encounters (id) ON DELETE CASCADE,
    attacker_id INTEGER NOT NULL,
    defender_id INTEGER NOT NULL,
    skill_id INTEGER NOT NULL,
    target_name TEXT NOT NULL,
    is_boss_target INTEGER NOT NULL DEFAULT 0,
    total INTEGER NOT NULL DEFAULT 0,
    hits INTEGER NOT NULL DEFAULT 0,
    crit_hits INTEGER NOT NULL DEFAULT 0,
    lucky_hits INTEGER NOT NULL DEFAULT 0,
    crit_total INTEGER NOT NULL DEFAULT 0,
    lucky_total INTEGER NOT NULL DEFAULT 0,
    hp_loss INTEGER NOT NULL DEFAULT 0,
    shield_loss INTEGER NOT NULL DEFAULT 0,
    hit_details BLOB,
    PRIMARY KEY (encounter_id, attacker_id, defender_id, skill_id)
);

CREATE TABLE IF NOT EXISTS heal_skill_stats (
    encounter_id INTEGER NOT NULL REFERENCES encounters (id) ON DELETE CASCADE,
    healer_id INTEGER NOT NULL,
    target_id INTEGER NOT NULL,
    skill_id INTEGER NOT NULL,
    target_name TEXT NOT NULL,
    total INTEGER NOT NULL DEFAULT 0,
    hits INTEGER NOT NULL DEFAULT 0,
    crit_hits INTEGER NOT NULL DEFAULT 0,
    lucky_hits INTEGER NOT NULL DEFAULT 0,
    crit_total INTEGER NOT NULL DEFAULT 0,
    lucky_total INTEGER NOT NULL DEFAULT 0,
    hit_details BLOB,
    PRIMARY KEY (encounter_id, healer_id, target_id, skill_id)
);

CREATE TABLE IF NOT EXISTS encounter_bosses (
    encounter_id INTEGER NOT NULL REFERENCES encounters (id) ON DELETE CASCADE,
    monster_name TEXT NOT NULL,
    hits INTEGER NOT NULL DEFAULT 0,
    total_damage INTEGER NOT NULL DEFAULT 0,
    max_hp INTEGER,
    is_defeated INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (encounter_id, monster_name)
);

CREATE TABLE IF NOT EXISTS buffs (
    encounter_id INTEGER NOT NULL REFERENCES encounters (id) ON DELETE CASCADE,
    entity_id INTEGER NOT NULL,
    buff_id INTEGER NOT NULL,
    intervals TEXT NOT NULL,
    PRIMARY KEY (encounter_id, entity_id, buff_id)
);
"
        .to_string(),
        "
DROP TABLE IF EXISTS damage_events;
DROP TABLE IF EXISTS heal_events;

ALTER TABLE encounters ADD COLUMN is_favorite INTEGER NOT NULL DEFAULT 0;
ALTER TABLE encounters ADD COLUMN uploaded_at_ms INTEGER;
ALTER TABLE encounters ADD COLUMN remote_encounter_id TEXT;

CREATE INDEX IF NOT EXISTS encounters_pending_upload_idx ON encounters (uploaded_at_ms, started_at_ms);
"
        .to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_pool;

    fn table_exists(pool: &ConnectionPool, name: &str) -> bool {
        let connection = pool.get().unwrap();
        connection
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [name],
                |row| row.get::<_, i64>(0),
            )
            .unwrap()
            == 1
    }

    #[test]
    fn should_migrate_to_latest_version() {
        let pool = create_test_pool();

        let version = MigrationRunner::new(pool.clone()).run().unwrap();

        assert_eq!(version, DB_VERSION);
        for table in [
            "sessions",
            "entities",
            "encounters",
            "attempts",
            "encounter_phases",
            "actor_encounter_stats",
            "actor_phase_stats",
            "damage_skill_stats",
            "heal_skill_stats",
            "encounter_bosses",
            "buffs",
        ] {
            assert!(table_exists(&pool, table), "missing table {table}");
        }
        assert!(!table_exists(&pool, "damage_events"));
        assert!(!table_exists(&pool, "heal_events"));
    }

    #[test]
    fn should_be_idempotent() {
        let pool = create_test_pool();
        let runner = MigrationRunner::new(pool.clone());

        runner.run().unwrap();
        let version = runner.run().unwrap();

        let connection = pool.get().unwrap();
        let stored: i32 = connection.query_row("PRAGMA user_version", [], |row| row.get(0)).unwrap();
        assert_eq!(version, DB_VERSION);
        assert_eq!(stored, DB_VERSION);
    }
}
