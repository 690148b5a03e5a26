use log::info;

use crate::constants::{HP_ROLLBACK_TOLERANCE_PCT, SPLIT_COOLDOWN_MS};
use crate::models::{Attempt, AttemptReason, PhaseOutcome, ResolvedActor};

use super::Segmenter;

impl Segmenter {
    pub fn current_attempt(&self) -> &Attempt {
        // never empty: `new` seeds attempt 1 and splits only push
        &self.attempts[self.attempts.len() - 1]
    }

    pub fn attempt_index(&self) -> u32 {
        self.current_attempt().index
    }

    /// Registers a player taking part in the current attempt. A dead player that acts again
    /// is treated as revived.
    pub fn track_player(&mut self, actor: &ResolvedActor) {
        if actor.is_player() {
            self.tracked_players.insert(actor.id);
            self.dead_players.remove(&actor.id);
        }
    }

    /// Registers a player on the receiving end of an event. Does not clear a death.
    pub fn track_target(&mut self, actor: &ResolvedActor) {
        if actor.is_player() {
            self.tracked_players.insert(actor.id);
        }
    }

    pub fn on_death(&mut self, timestamp_ms: i64, actor: &ResolvedActor) -> Option<AttemptReason> {
        if actor.is_local {
            if let Some(attempt) = self.attempts.last_mut() {
                attempt.total_deaths += 1;
            }
        }

        if !actor.is_player() {
            return None;
        }

        self.tracked_players.insert(actor.id);
        self.dead_players.insert(actor.id);

        let is_wipe = self.tracked_players.iter().all(|id| self.dead_players.contains(id));

        if self.config.wipe_detection && is_wipe && self.split_allowed(timestamp_ms) {
            let boss_hp = self.boss_hp();
            self.split(timestamp_ms, AttemptReason::Wipe, boss_hp, boss_hp);
            return Some(AttemptReason::Wipe);
        }

        None
    }

    pub fn on_revive(&mut self, actor: &ResolvedActor) {
        self.dead_players.remove(&actor.id);
    }

    /// Records a boss HP reading. A rise above the previous reading beyond the tolerance
    /// means the fight was reset and opens a new attempt.
    pub fn observe_boss_hp(
        &mut self,
        timestamp_ms: i64,
        boss_id: i64,
        current_hp: i64,
        max_hp: Option<i64>,
    ) -> Option<AttemptReason> {
        let boss = self.bosses.entry(boss_id).or_default();
        let previous_hp = boss.last_hp.replace(current_hp);

        if max_hp.is_some() {
            boss.max_hp = max_hp;
        }

        let is_defeated = boss.is_defeated;
        let reference_hp = boss.max_hp.or(previous_hp).unwrap_or(0);
        self.primary_boss = Some(boss_id);

        let attempt = self.attempts.last_mut()?;
        if attempt.boss_hp_start.is_none() {
            attempt.boss_hp_start = previous_hp.or(Some(current_hp));
        }

        let previous_hp = previous_hp?;
        let tolerance = reference_hp as f64 * HP_ROLLBACK_TOLERANCE_PCT / 100.0;
        let rolled_back = (current_hp - previous_hp) as f64 > tolerance;

        if !self.config.wipe_detection
            || is_defeated
            || !rolled_back
            || !self.single_relevant_boss(boss_id)
            || !self.split_allowed(timestamp_ms)
        {
            return None;
        }

        self.split(timestamp_ms, AttemptReason::HpRollback, Some(previous_hp), Some(current_hp));
        Some(AttemptReason::HpRollback)
    }

    /// Explicit user split. Ignores the heuristic cooldown.
    pub fn split_manual(&mut self, timestamp_ms: i64) {
        let boss_hp = self.boss_hp();
        self.split(timestamp_ms, AttemptReason::Manual, boss_hp, boss_hp);
    }

    fn split(&mut self, timestamp_ms: i64, reason: AttemptReason, boss_hp_end: Option<i64>, boss_hp_start: Option<i64>) {
        let next_index = self.attempt_index() + 1;

        if let Some(attempt) = self.attempts.last_mut() {
            attempt.ended_at_ms = Some(timestamp_ms.max(attempt.started_at_ms));
            attempt.end_reason = Some(reason);
            attempt.boss_hp_end = boss_hp_end;
        }

        if reason == AttemptReason::Wipe && self.open_phase.is_some() {
            self.close_phase(timestamp_ms, PhaseOutcome::Wipe);
        }

        info!("attempt {} started ({})", next_index, reason.as_str());

        self.attempts.push(Attempt {
            index: next_index,
            started_at_ms: timestamp_ms,
            reason,
            boss_hp_start,
            ..Default::default()
        });

        self.tracked_players.clear();
        self.dead_players.clear();
        self.last_split_ms = Some(timestamp_ms);
    }

    fn split_allowed(&self, timestamp_ms: i64) -> bool {
        self.last_split_ms
            .is_none_or(|last_split_ms| timestamp_ms - last_split_ms >= SPLIT_COOLDOWN_MS)
    }

    fn single_relevant_boss(&self, boss_id: i64) -> bool {
        let mut alive = self.bosses.iter().filter(|(_, boss)| !boss.is_defeated);

        matches!((alive.next(), alive.next()), (Some((id, _)), None) if *id == boss_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmenter::SegmenterConfig;
    use crate::test_utils::*;

    fn segmenter() -> Segmenter {
        Segmenter::new(SegmenterConfig::default(), 1_000)
    }

    #[test]
    fn should_start_with_manual_attempt() {
        let segmenter = segmenter();
        let attempt = segmenter.current_attempt();

        assert_eq!(attempt.index, 1);
        assert_eq!(attempt.reason, AttemptReason::Manual);
        assert_eq!(attempt.started_at_ms, 1_000);
    }

    #[test]
    fn should_split_on_hp_rollback() {
        let mut segmenter = segmenter();

        assert_eq!(segmenter.observe_boss_hp(2_000, 900, 1_000, Some(1_000)), None);
        assert_eq!(segmenter.observe_boss_hp(3_000, 900, 600, None), None);
        let reason = segmenter.observe_boss_hp(4_000, 900, 900, None);

        assert_eq!(reason, Some(AttemptReason::HpRollback));
        let attempts = segmenter.attempts();
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0].boss_hp_start, Some(1_000));
        assert_eq!(attempts[0].boss_hp_end, Some(600));
        assert_eq!(attempts[0].end_reason, Some(AttemptReason::HpRollback));
        assert_eq!(attempts[1].index, 2);
        assert_eq!(attempts[1].reason, AttemptReason::HpRollback);
        assert_eq!(attempts[1].boss_hp_start, Some(900));
        assert_eq!(attempts[1].started_at_ms, 4_000);
    }

    #[test]
    fn should_ignore_rise_within_tolerance() {
        let mut segmenter = segmenter();

        segmenter.observe_boss_hp(2_000, 900, 600, Some(1_000));
        let reason = segmenter.observe_boss_hp(3_000, 900, 640, None);

        assert_eq!(reason, None);
        assert_eq!(segmenter.attempt_index(), 1);
    }

    #[test]
    fn should_ignore_rollback_with_several_bosses_alive() {
        let mut segmenter = segmenter();

        segmenter.observe_boss_hp(2_000, 900, 600, Some(1_000));
        segmenter.observe_boss_hp(2_000, 901, 500, Some(1_000));
        let reason = segmenter.observe_boss_hp(3_000, 900, 900, None);

        assert_eq!(reason, None);
    }

    #[test]
    fn should_ignore_rollback_when_detection_disabled() {
        let mut segmenter = Segmenter::new(SegmenterConfig { wipe_detection: false, phases_enabled: true }, 1_000);

        segmenter.observe_boss_hp(2_000, 900, 600, Some(1_000));
        let reason = segmenter.observe_boss_hp(3_000, 900, 1_000, None);

        assert_eq!(reason, None);
        assert_eq!(segmenter.attempts().len(), 1);
    }

    #[test]
    fn should_split_on_wipe() {
        let mut segmenter = segmenter();
        let first = player_actor(1);
        let second = player_actor(2);

        segmenter.track_player(&first);
        segmenter.track_player(&second);

        assert_eq!(segmenter.on_death(2_000, &first), None);
        assert_eq!(segmenter.on_death(2_500, &second), Some(AttemptReason::Wipe));

        let attempts = segmenter.attempts();
        assert_eq!(attempts[0].end_reason, Some(AttemptReason::Wipe));
        assert_eq!(attempts[0].ended_at_ms, Some(2_500));
        assert_eq!(attempts[1].index, 2);
        assert_eq!(attempts[1].reason, AttemptReason::Wipe);
    }

    #[test]
    fn should_not_wipe_when_player_revived() {
        let mut segmenter = segmenter();
        let first = player_actor(1);
        let second = player_actor(2);

        segmenter.track_player(&first);
        segmenter.track_player(&second);
        segmenter.on_death(2_000, &first);
        segmenter.on_revive(&first);

        assert_eq!(segmenter.on_death(2_500, &second), None);
    }

    #[test]
    fn should_respect_split_cooldown() {
        let mut segmenter = segmenter();
        let player = player_actor(1);

        segmenter.track_player(&player);
        segmenter.on_death(2_000, &player);
        segmenter.track_player(&player);

        assert_eq!(segmenter.on_death(2_500, &player), None);
        assert_eq!(segmenter.attempt_index(), 2);
    }

    #[test]
    fn should_count_local_player_deaths() {
        let mut segmenter = Segmenter::new(SegmenterConfig { wipe_detection: false, phases_enabled: false }, 1_000);
        let local = local_player_actor(1);

        segmenter.on_death(2_000, &local);
        segmenter.on_death(3_000, &player_actor(2));

        assert_eq!(segmenter.current_attempt().total_deaths, 1);
    }

    #[test]
    fn should_split_manually_regardless_of_detection() {
        let mut segmenter = Segmenter::new(SegmenterConfig { wipe_detection: false, phases_enabled: false }, 1_000);

        segmenter.split_manual(1_500);
        segmenter.split_manual(1_600);

        let indices: Vec<u32> = segmenter.attempts().iter().map(|attempt| attempt.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        assert!(segmenter.attempts().iter().all(|attempt| attempt.reason == AttemptReason::Manual));
    }
}
