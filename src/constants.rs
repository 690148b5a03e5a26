use std::time::Duration;

pub const DB_VERSION: i32 = 4;
pub const DEFAULT_EVENT_UPDATE_RATE_MS: u64 = 200;
pub const MIN_EVENT_UPDATE_RATE_MS: u64 = 50;
pub const DEFAULT_INACTIVITY_TIMEOUT_MS: u64 = 30_000;
pub const INACTIVITY_CHECK_INTERVAL: Duration = Duration::from_millis(1000);
pub const MAX_EVENT_VALUE: i64 = 1_000_000_000_000;
pub const PHASE_TIMEOUT_MS: i64 = 15_000;
pub const SPLIT_COOLDOWN_MS: i64 = 2_000;
pub const HP_ROLLBACK_TOLERANCE_PCT: f64 = 5.0;
pub const MAX_FILTERED_NAMES: usize = 20;
pub const MAX_RECENT_ENCOUNTERS: usize = 200;
pub const PERSIST_RETRIES: u32 = 3;
pub const PERSIST_TIMEOUT: Duration = Duration::from_secs(5);
pub const PERSIST_BACKOFF: Duration = Duration::from_millis(250);
pub const SHUTDOWN_FLUSH_TIMEOUT: Duration = Duration::from_secs(10);
pub const SKILL_NAMES_FILE: &str = "skill_names.json";
pub const SKILL_NAMES_ENV: &str = "COMBAT_METER_SKILL_NAMES";
pub const ENCOUNTER_CACHE_CAPACITY: u64 = 64;
