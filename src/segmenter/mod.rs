mod attempts;
mod phases;

use hashbrown::{HashMap, HashSet};

use crate::models::{Attempt, AttemptReason, Phase, Settings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmenterConfig {
    /// Wipe and hp-rollback heuristics. Manual splits work either way.
    pub wipe_detection: bool,
    pub phases_enabled: bool,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            wipe_detection: true,
            phases_enabled: true,
        }
    }
}

impl From<&Settings> for SegmenterConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            wipe_detection: settings.wipe_detection,
            phases_enabled: settings.dungeon_segments_enabled,
        }
    }
}

#[derive(Debug, Default, Clone)]
struct BossTrack {
    last_hp: Option<i64>,
    max_hp: Option<i64>,
    engaged: bool,
    is_defeated: bool,
}

/// Splits the live encounter into attempts and phases.
#[derive(Debug, Clone)]
pub struct Segmenter {
    config: SegmenterConfig,
    attempts: Vec<Attempt>,
    phases: Vec<Phase>,
    open_phase: Option<usize>,
    next_phase_id: u32,
    last_combat_ms: Option<i64>,
    tracked_players: HashSet<i64>,
    dead_players: HashSet<i64>,
    bosses: HashMap<i64, BossTrack>,
    primary_boss: Option<i64>,
    last_split_ms: Option<i64>,
}

impl Segmenter {
    pub fn new(config: SegmenterConfig, started_at_ms: i64) -> Self {
        let first = Attempt {
            index: 1,
            started_at_ms,
            reason: AttemptReason::Manual,
            ..Default::default()
        };

        Self {
            config,
            attempts: vec![first],
            phases: vec![],
            open_phase: None,
            next_phase_id: 1,
            last_combat_ms: None,
            tracked_players: HashSet::new(),
            dead_players: HashSet::new(),
            bosses: HashMap::new(),
            primary_boss: None,
            last_split_ms: None,
        }
    }

    pub fn config(&self) -> SegmenterConfig {
        self.config
    }

    pub fn attempts(&self) -> &[Attempt] {
        &self.attempts
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    /// Closes whatever is still open at `ended_at_ms`.
    pub fn finalize(&mut self, ended_at_ms: i64) {
        let boss_hp = self.boss_hp();

        if let Some(attempt) = self.attempts.last_mut().filter(|attempt| attempt.ended_at_ms.is_none()) {
            attempt.ended_at_ms = Some(ended_at_ms.max(attempt.started_at_ms));
            attempt.boss_hp_end = boss_hp;
        }

        if self.open_phase.is_some() {
            let outcome = self.closing_outcome();
            self.close_phase(ended_at_ms, outcome);
        }
    }

    fn boss_hp(&self) -> Option<i64> {
        self.primary_boss
            .and_then(|id| self.bosses.get(&id))
            .and_then(|boss| boss.last_hp)
    }

    fn boss_present(&self) -> bool {
        self.bosses.values().any(|boss| boss.engaged && !boss.is_defeated)
    }
}
