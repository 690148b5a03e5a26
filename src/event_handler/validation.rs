use thiserror::Error;

use crate::constants::MAX_EVENT_VALUE;
use crate::models::*;

/// Why an incoming event was rejected at the ingestion boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{event} event is missing {field}")]
    MissingId { event: &'static str, field: &'static str },

    #[error("{event} event has non-positive {field} {value}")]
    NonPositiveId { event: &'static str, field: &'static str, value: i64 },

    #[error("{event} event has negative {field} {value}")]
    Negative { event: &'static str, field: &'static str, value: i64 },

    #[error("{event} event has {field} {value} above {limit}", limit = MAX_EVENT_VALUE)]
    OutOfRange { event: &'static str, field: &'static str, value: i64 },

    #[error("{event} event has non-positive timestamp {value}")]
    Timestamp { event: &'static str, value: i64 },
}

type Validation = Result<(), ValidationError>;

fn require_actor(event: &'static str, field: &'static str, actor: Option<ActorRef>) -> Validation {
    let actor = actor.ok_or(ValidationError::MissingId { event, field })?;
    require_id(event, field, actor.id)
}

fn require_id(event: &'static str, field: &'static str, value: i64) -> Validation {
    if value <= 0 {
        return Err(ValidationError::NonPositiveId { event, field, value });
    }

    Ok(())
}

fn non_negative(event: &'static str, field: &'static str, value: i64) -> Validation {
    if value < 0 {
        return Err(ValidationError::Negative { event, field, value });
    }

    Ok(())
}

/// Combat amounts: non-negative and small enough that rollup totals never overflow.
fn amount(event: &'static str, field: &'static str, value: i64) -> Validation {
    non_negative(event, field, value)?;

    if value > MAX_EVENT_VALUE {
        return Err(ValidationError::OutOfRange { event, field, value });
    }

    Ok(())
}

pub fn validate(event: &CombatEvent) -> Validation {
    let name = event.kind_name();
    let timestamp_ms = event.timestamp_ms();

    if timestamp_ms <= 0 {
        return Err(ValidationError::Timestamp { event: name, value: timestamp_ms });
    }

    match event {
        CombatEvent::Damage(event) => {
            require_actor(name, "attacker", event.attacker)?;
            require_actor(name, "defender", event.defender)?;
            amount(name, "value", event.value)?;
            amount(name, "hp_loss", event.hp_loss)?;
            amount(name, "shield_loss", event.shield_loss)?;
            if let Some(hp) = event.defender_hp {
                non_negative(name, "defender_hp", hp)?;
            }
        }
        CombatEvent::Heal(event) => {
            require_actor(name, "healer", event.healer)?;
            require_actor(name, "target", event.target)?;
            amount(name, "value", event.value)?;
        }
        CombatEvent::Death(event) => require_actor(name, "actor", event.actor)?,
        CombatEvent::Revive(event) => require_actor(name, "actor", event.actor)?,
        CombatEvent::EntitySighted(event) => {
            require_id(name, "id", event.id)?;
            if let Some(hp) = event.attrs.current_hp {
                non_negative(name, "current_hp", hp)?;
            }
        }
        CombatEvent::BuffApplied(event) => require_id(name, "entity_id", event.entity_id)?,
        CombatEvent::BuffRemoved(event) => require_id(name, "entity_id", event.entity_id)?,
        CombatEvent::BossHp(event) => {
            require_id(name, "entity_id", event.entity_id)?;
            non_negative(name, "current_hp", event.current_hp)?;
        }
        CombatEvent::SceneChange(_) => {}
    }

    Ok(())
}
