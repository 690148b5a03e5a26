use std::env;
use std::time::Duration;

use uuid::Uuid;

use crate::StartOptions;
use crate::models::*;
use crate::store::connection_pool::{self, ConnectionPool};
use crate::store::migration_runner::MigrationRunner;

use super::{EventBuilder, NOW_MS, StateBuilder};

pub fn create_start_options() -> StartOptions {
    StartOptions {
        version: "0.0.1".to_string(),
        event_update_rate: Duration::from_millis(50),
        inactivity_check_interval: Duration::from_millis(50),
        flush_timeout: Duration::from_secs(1),
    }
}

/// Fresh, unmigrated database file under the temp directory.
pub fn create_test_pool() -> ConnectionPool {
    let path = env::temp_dir().join(format!("combat-meter-{}.db", Uuid::new_v4()));
    connection_pool::get(&path).unwrap()
}

pub fn create_migrated_pool() -> ConnectionPool {
    let pool = create_test_pool();
    MigrationRunner::new(pool.clone()).run().unwrap();
    pool
}

/// Two players fighting a boss and an add in the "Crypt" scene, with one heal and one buff.
pub fn create_complete_encounter() -> CompleteEncounter {
    let mut state = StateBuilder::new()
        .local_player(1, "Aria")
        .player(2, "Marlo", 4)
        .build();

    state.on_scene_change(&SceneChangeEvent { timestamp_ms: 500, scene_id: 12, scene_name: "Crypt".to_string() });
    state.on_damage(NOW_MS, &EventBuilder::boss_damage(1, 900, 300, 700).at(1_000).crit().build_damage());
    state.on_buff_applied(&BuffAppliedEvent { timestamp_ms: 1_500, entity_id: 1, buff_id: 77, stack_count: 2 });
    state.on_damage(NOW_MS, &EventBuilder::boss_damage(2, 900, 200, 500).at(2_000).build_damage());
    state.on_damage(NOW_MS, &EventBuilder::damage(1, 500, 150).at(3_000).lucky().build_damage());
    state.on_heal(NOW_MS, &EventBuilder::heal(2, 1, 400).at(4_000).build_heal());
    state.on_buff_removed(&BuffRemovedEvent { timestamp_ms: 5_000, entity_id: 1, buff_id: 77 });

    state.close(false).unwrap()
}
