use std::cmp::Ordering;

use hashbrown::HashMap;
use log::debug;

use crate::constants::MAX_FILTERED_NAMES;
use crate::models::{Entity, EntityAttributes, EntityKind};

/// Directory of every entity sighted during the session. Entries are never removed.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    entities: HashMap<i64, Entity>,
    local_player_id: Option<i64>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&mut self, id: i64, kind: EntityKind, attrs: EntityAttributes, timestamp_ms: i64) -> &Entity {
        if attrs.is_local {
            self.local_player_id = Some(id);
        }

        let entity = self.entities.entry(id).or_insert_with(|| {
            debug!("new entity {id} ({})", kind.as_str());
            Entity {
                id,
                kind,
                first_seen_ms: timestamp_ms,
                last_seen_ms: timestamp_ms,
                ..Default::default()
            }
        });

        entity.kind = kind;
        entity.last_seen_ms = entity.last_seen_ms.max(timestamp_ms);
        entity.first_seen_ms = entity.first_seen_ms.min(timestamp_ms);
        entity.is_boss |= attrs.is_boss;
        entity.is_local |= attrs.is_local;

        if let Some(name) = attrs.name.filter(|name| !name.is_empty()) {
            entity.name = Some(name);
        }
        if attrs.class_id.is_some() {
            entity.class_id = attrs.class_id;
        }
        if attrs.spec_id.is_some() {
            entity.spec_id = attrs.spec_id;
        }
        if attrs.ability_score.is_some() {
            entity.ability_score = attrs.ability_score;
        }
        if attrs.level.is_some() {
            entity.level = attrs.level;
        }
        if attrs.current_hp.is_some() {
            entity.current_hp = attrs.current_hp;
        }
        if attrs.max_hp.is_some() {
            entity.max_hp = attrs.max_hp;
        }
        if attrs.attributes.is_some() {
            entity.attributes = attrs.attributes;
        }

        entity
    }

    /// Refreshes `last_seen` for an id referenced by a combat event, creating a bare entry if needed.
    pub fn touch(&mut self, id: i64, kind: EntityKind, timestamp_ms: i64) -> &Entity {
        self.upsert(id, kind, EntityAttributes::default(), timestamp_ms)
    }

    pub fn lookup(&self, id: i64) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn lookup_mut(&mut self, id: i64) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn local_player_id(&self) -> Option<i64> {
        self.local_player_id
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Registered name, or a placeholder until one arrives.
    pub fn name_or_placeholder(&self, id: i64) -> String {
        match self.entities.get(&id) {
            Some(Entity { name: Some(name), .. }) => name.clone(),
            Some(entity) => placeholder_name(id, entity.kind),
            None => placeholder_name(id, EntityKind::Monster),
        }
    }

    /// Name used in snapshots, tagged for the local player.
    pub fn display_name(&self, id: i64) -> String {
        let is_named = self.entities.get(&id).is_some_and(|entity| entity.name.is_some());

        match (self.local_player_id == Some(id), is_named) {
            (true, true) => format!("{} (You)", self.name_or_placeholder(id)),
            (true, false) => "You".to_string(),
            (false, _) => self.name_or_placeholder(id),
        }
    }

    /// Player names matching `prefix` case-insensitively. Prefix matches rank ahead of
    /// substring matches, then alphabetical.
    pub fn filter_names(&self, prefix: &str) -> Vec<String> {
        filter_names(
            self.entities
                .values()
                .filter(|entity| entity.is_player())
                .filter_map(|entity| entity.name.as_deref()),
            prefix,
        )
    }
}

pub fn placeholder_name(id: i64, kind: EntityKind) -> String {
    match kind {
        EntityKind::Player => format!("#{id}"),
        EntityKind::Monster => format!("Unknown Monster #{id}"),
    }
}

pub fn filter_names<'a>(names: impl Iterator<Item = &'a str>, prefix: &str) -> Vec<String> {
    let needle = prefix.trim().to_lowercase();

    if needle.is_empty() {
        return vec![];
    }

    let mut matches: Vec<(bool, &str)> = names
        .filter_map(|name| {
            let lowered = name.to_lowercase();
            if lowered.starts_with(&needle) {
                Some((true, name))
            } else if lowered.contains(&needle) {
                Some((false, name))
            } else {
                None
            }
        })
        .collect();

    matches.sort_by(|(left_prefix, left), (right_prefix, right)| {
        match right_prefix.cmp(left_prefix) {
            Ordering::Equal => left.to_lowercase().cmp(&right.to_lowercase()),
            other => other,
        }
    });
    matches.dedup_by(|(_, left), (_, right)| left == right);

    matches
        .into_iter()
        .take(MAX_FILTERED_NAMES)
        .map(|(_, name)| name.to_string())
        .collect()
}
