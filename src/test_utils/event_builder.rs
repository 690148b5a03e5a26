use crate::models::*;

use super::{BOSS_MAX_HP, SKILL_ID};

enum Template {
    Damage(DamageEvent),
    Heal(HealEvent),
    Death(DeathEvent),
    Revive(ReviveEvent),
}

pub struct EventBuilder {
    template: Template,
}

fn player(id: i64) -> Option<ActorRef> {
    Some(ActorRef { id, kind: EntityKind::Player })
}

fn monster(id: i64) -> Option<ActorRef> {
    Some(ActorRef { id, kind: EntityKind::Monster })
}

impl EventBuilder {
    /// Player hitting a monster.
    pub fn damage(attacker: i64, defender: i64, value: i64) -> Self {
        Self {
            template: Template::Damage(DamageEvent {
                timestamp_ms: 1_000,
                attacker: player(attacker),
                defender: monster(defender),
                skill_id: SKILL_ID,
                value,
                hp_loss: value,
                ..Default::default()
            }),
        }
    }

    pub fn boss_damage(attacker: i64, boss_id: i64, value: i64, boss_hp: i64) -> Self {
        Self {
            template: Template::Damage(DamageEvent {
                timestamp_ms: 1_000,
                attacker: player(attacker),
                defender: monster(boss_id),
                skill_id: SKILL_ID,
                value,
                hp_loss: value,
                defender_hp: Some(boss_hp),
                defender_max_hp: Some(BOSS_MAX_HP),
                defender_name: Some("Boss".to_string()),
                is_boss: true,
                ..Default::default()
            }),
        }
    }

    pub fn heal(healer: i64, target: i64, value: i64) -> Self {
        Self {
            template: Template::Heal(HealEvent {
                timestamp_ms: 1_000,
                healer: player(healer),
                target: player(target),
                skill_id: SKILL_ID + 1,
                value,
                ..Default::default()
            }),
        }
    }

    pub fn death(player_id: i64) -> Self {
        Self {
            template: Template::Death(DeathEvent { timestamp_ms: 1_000, actor: player(player_id), killer_id: None }),
        }
    }

    pub fn monster_death(monster_id: i64) -> Self {
        Self {
            template: Template::Death(DeathEvent { timestamp_ms: 1_000, actor: monster(monster_id), killer_id: None }),
        }
    }

    pub fn revive(player_id: i64) -> Self {
        Self {
            template: Template::Revive(ReviveEvent { timestamp_ms: 1_000, actor: player(player_id) }),
        }
    }

    pub fn at(mut self, timestamp_ms: i64) -> Self {
        match &mut self.template {
            Template::Damage(event) => event.timestamp_ms = timestamp_ms,
            Template::Heal(event) => event.timestamp_ms = timestamp_ms,
            Template::Death(event) => event.timestamp_ms = timestamp_ms,
            Template::Revive(event) => event.timestamp_ms = timestamp_ms,
        }

        self
    }

    pub fn crit(mut self) -> Self {
        match &mut self.template {
            Template::Damage(event) => event.is_crit = true,
            Template::Heal(event) => event.is_crit = true,
            _ => {}
        }

        self
    }

    pub fn lucky(mut self) -> Self {
        match &mut self.template {
            Template::Damage(event) => event.is_lucky = true,
            Template::Heal(event) => event.is_lucky = true,
            _ => {}
        }

        self
    }

    pub fn skill(mut self, skill_id: i32) -> Self {
        match &mut self.template {
            Template::Damage(event) => event.skill_id = skill_id,
            Template::Heal(event) => event.skill_id = skill_id,
            _ => {}
        }

        self
    }

    pub fn defender_name(mut self, name: &str) -> Self {
        if let Template::Damage(event) = &mut self.template {
            event.defender_name = Some(name.to_string());
        }

        self
    }

    pub fn without_attacker(mut self) -> Self {
        if let Template::Damage(event) = &mut self.template {
            event.attacker = None;
        }

        self
    }

    pub fn build(self) -> CombatEvent {
        match self.template {
            Template::Damage(event) => CombatEvent::Damage(event),
            Template::Heal(event) => CombatEvent::Heal(event),
            Template::Death(event) => CombatEvent::Death(event),
            Template::Revive(event) => CombatEvent::Revive(event),
        }
    }

    pub fn build_damage(self) -> DamageEvent {
        match self.build() {
            CombatEvent::Damage(event) => event,
            other => panic!("expected damage template, got {}", other.kind_name()),
        }
    }

    pub fn build_heal(self) -> HealEvent {
        match self.build() {
            CombatEvent::Heal(event) => event,
            other => panic!("expected heal template, got {}", other.kind_name()),
        }
    }

    pub fn build_death(self) -> DeathEvent {
        match self.build() {
            CombatEvent::Death(event) => event,
            other => panic!("expected death template, got {}", other.kind_name()),
        }
    }

    pub fn build_revive(self) -> ReviveEvent {
        match self.build() {
            CombatEvent::Revive(event) => event,
            other => panic!("expected revive template, got {}", other.kind_name()),
        }
    }
}
