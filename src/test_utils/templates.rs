use crate::models::*;

pub const NOW_MS: i64 = 1_700_000_000_000;
pub const SKILL_ID: i32 = 21_090;
pub const BOSS_MAX_HP: i64 = 1_000;

pub fn player_attributes(name: &str, class_id: i32, ability_score: i64) -> EntityAttributes {
    EntityAttributes {
        name: Some(name.to_string()),
        class_id: Some(class_id),
        spec_id: Some(class_id * 10),
        ability_score: Some(ability_score),
        level: Some(60),
        ..Default::default()
    }
}

pub fn player_actor(id: i64) -> ResolvedActor {
    ResolvedActor { id, kind: EntityKind::Player, is_local: false }
}

pub fn local_player_actor(id: i64) -> ResolvedActor {
    ResolvedActor { id, kind: EntityKind::Player, is_local: true }
}

pub fn monster_actor(id: i64) -> ResolvedActor {
    ResolvedActor { id, kind: EntityKind::Monster, is_local: false }
}

pub fn resolved(kind: ResolvedKind, attempt_index: u32) -> ResolvedEvent {
    ResolvedEvent {
        seq: 1,
        timestamp_ms: 1_000,
        attempt_index,
        phase_id: None,
        kind,
    }
}

pub fn resolved_damage(attacker: i64, defender: i64, value: i64, is_crit: bool, attempt_index: u32) -> ResolvedEvent {
    resolved(
        ResolvedKind::Damage {
            attacker: player_actor(attacker),
            defender: ResolvedActor { id: defender, kind: EntityKind::Monster, is_local: false },
            skill_id: SKILL_ID,
            value,
            hp_loss: value,
            shield_loss: 0,
            is_crit,
            is_lucky: false,
            is_boss_target: false,
            defender_name: format!("Unknown Monster #{defender}"),
            defender_max_hp: None,
        },
        attempt_index,
    )
}

pub fn resolved_boss_damage(attacker: i64, boss_id: i64, value: i64, attempt_index: u32) -> ResolvedEvent {
    resolved(
        ResolvedKind::Damage {
            attacker: player_actor(attacker),
            defender: monster_actor(boss_id),
            skill_id: SKILL_ID,
            value,
            hp_loss: value,
            shield_loss: 0,
            is_crit: false,
            is_lucky: false,
            is_boss_target: true,
            defender_name: "Boss".to_string(),
            defender_max_hp: Some(BOSS_MAX_HP),
        },
        attempt_index,
    )
}

pub fn resolved_heal(healer: i64, target: i64, value: i64, attempt_index: u32) -> ResolvedEvent {
    resolved(
        ResolvedKind::Heal {
            healer: player_actor(healer),
            target: player_actor(target),
            skill_id: SKILL_ID + 1,
            value,
            is_crit: false,
            is_lucky: false,
            target_name: format!("#{target}"),
        },
        attempt_index,
    )
}
