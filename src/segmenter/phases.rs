use log::debug;

use crate::constants::PHASE_TIMEOUT_MS;
use crate::models::{Phase, PhaseKind, PhaseOutcome};

use super::Segmenter;

impl Segmenter {
    /// Phase the next event belongs to, `None` when phase tracking is off.
    pub fn current_phase_id(&self) -> Option<u32> {
        self.open_phase.map(|index| self.phases[index].id)
    }

    /// Drives mob/boss phase transitions from the damage stream.
    pub fn on_damage(&mut self, timestamp_ms: i64, target_id: i64, target_is_boss: bool) {
        if target_is_boss {
            let boss = self.bosses.entry(target_id).or_default();
            boss.engaged = !boss.is_defeated;
            self.primary_boss.get_or_insert(target_id);
        }

        if !self.config.phases_enabled {
            self.last_combat_ms = Some(timestamp_ms);
            return;
        }

        self.expire_phase(timestamp_ms);

        let boss_present = self.boss_present();

        match self.open_phase.map(|index| self.phases[index].kind) {
            None => {
                let kind = if boss_present { PhaseKind::Boss } else { PhaseKind::Mob };
                self.open_phase(timestamp_ms, kind);
            }
            Some(PhaseKind::Mob) if boss_present => {
                self.close_phase(timestamp_ms, PhaseOutcome::Unknown);
                self.open_phase(timestamp_ms, PhaseKind::Boss);
            }
            Some(PhaseKind::Boss) if !boss_present => {
                let outcome = self.closing_outcome();
                self.close_phase(timestamp_ms, outcome);
                self.open_phase(timestamp_ms, PhaseKind::Mob);
            }
            _ => {}
        }

        self.last_combat_ms = Some(timestamp_ms);
    }

    /// Marks a boss defeated; the boss phase closes as a success once no boss is left standing.
    pub fn on_boss_defeated(&mut self, timestamp_ms: i64, boss_id: i64) {
        let boss = self.bosses.entry(boss_id).or_default();
        boss.is_defeated = true;
        boss.engaged = false;
        boss.last_hp = Some(0);

        let boss_phase_open = self
            .open_phase
            .is_some_and(|index| self.phases[index].kind == PhaseKind::Boss);

        if boss_phase_open && !self.boss_present() {
            self.close_phase(timestamp_ms, PhaseOutcome::Success);
        }
    }

    /// Sum of phase durations, open phase counted up to `now_ms`.
    pub fn active_combat_ms(&self, now_ms: i64) -> i64 {
        self.phases
            .iter()
            .map(|phase| phase.ended_at_ms.unwrap_or(now_ms) - phase.started_at_ms)
            .filter(|duration| *duration > 0)
            .sum()
    }

    pub(super) fn closing_outcome(&self) -> PhaseOutcome {
        let is_boss_phase = self
            .open_phase
            .is_some_and(|index| self.phases[index].kind == PhaseKind::Boss);
        let boss_defeated = self.bosses.values().any(|boss| boss.is_defeated);

        if is_boss_phase && boss_defeated && !self.boss_present() {
            PhaseOutcome::Success
        } else {
            PhaseOutcome::Unknown
        }
    }

    pub(super) fn close_phase(&mut self, timestamp_ms: i64, outcome: PhaseOutcome) {
        if let Some(index) = self.open_phase.take() {
            let phase = &mut self.phases[index];
            phase.ended_at_ms = Some(timestamp_ms.max(phase.started_at_ms));
            phase.outcome = outcome;
            debug!("phase {} ({}) closed: {}", phase.id, phase.kind.as_str(), outcome.as_str());
        }
    }

    fn open_phase(&mut self, timestamp_ms: i64, kind: PhaseKind) {
        let id = self.next_phase_id;
        self.next_phase_id += 1;

        self.phases.push(Phase {
            id,
            kind,
            started_at_ms: timestamp_ms,
            ended_at_ms: None,
            outcome: PhaseOutcome::Unknown,
        });
        self.open_phase = Some(self.phases.len() - 1);
        debug!("phase {} ({}) opened", id, kind.as_str());
    }

    fn expire_phase(&mut self, timestamp_ms: i64) {
        let Some(last_combat_ms) = self.last_combat_ms else {
            return;
        };

        if self.open_phase.is_some() && timestamp_ms - last_combat_ms > PHASE_TIMEOUT_MS {
            self.close_phase(last_combat_ms, PhaseOutcome::Unknown);

            for boss in self.bosses.values_mut() {
                boss.engaged = false;
            }
        }
    }
}
