use hashbrown::HashMap;

use crate::entity_registry::EntityRegistry;
use crate::models::*;
use crate::skill_names::SkillNames;
use crate::utils::{nan_is_zero, per_minute, per_second, percentage};

/// Metadata shown next to an actor's numbers.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ActorInfo {
    pub name: String,
    pub class_id: Option<i32>,
    pub spec_id: Option<i32>,
    pub ability_score: Option<i64>,
}

impl ActorInfo {
    pub fn from_registry(registry: &EntityRegistry, id: i64) -> Self {
        let entity = registry.lookup(id);

        Self {
            name: registry.display_name(id),
            class_id: entity.and_then(|entity| entity.class_id),
            spec_id: entity.and_then(|entity| entity.spec_id),
            ability_score: entity.and_then(|entity| entity.ability_score),
        }
    }

    pub fn from_row(row: &ActorStatRow) -> Self {
        Self {
            name: row.name.clone(),
            class_id: row.class_id,
            spec_id: row.spec_id,
            ability_score: row.ability_score,
        }
    }
}

fn ratio(part: i64, whole: i64) -> f64 {
    nan_is_zero(part as f64 / whole as f64)
}

pub fn player_row(uid: i64, info: &ActorInfo, cells: &HitCells, scope_total: i64, elapsed_secs: f64) -> PlayerRow {
    PlayerRow {
        uid,
        name: info.name.clone(),
        class_id: info.class_id,
        spec_id: info.spec_id,
        ability_score: info.ability_score,
        total_dmg: cells.total,
        dps: per_second(cells.total, elapsed_secs),
        dmg_pct: percentage(cells.total, scope_total),
        crit_rate: ratio(cells.crit_hits, cells.hits),
        crit_dmg_rate: ratio(cells.crit_total, cells.total),
        lucky_rate: ratio(cells.lucky_hits, cells.hits),
        lucky_dmg_rate: ratio(cells.lucky_total, cells.total),
        hits: cells.hits,
        hits_per_minute: per_minute(cells.hits, elapsed_secs),
    }
}

/// Ranked rows over the player actors active in `metric`. Percentages are relative to
/// the listed players only.
pub fn players_window<'a, I, F>(actors: I, info: F, metric: MetricType, boss_only: bool, elapsed_secs: f64) -> PlayersWindow
where
    I: IntoIterator<Item = &'a ActorStat>,
    F: Fn(i64) -> ActorInfo,
{
    let listed: Vec<&ActorStat> = actors
        .into_iter()
        .filter(|stat| stat.is_player && stat.cells(metric, boss_only).hits > 0)
        .collect();
    let scope_total: i64 = listed.iter().map(|stat| stat.cells(metric, boss_only).total).fold(0, i64::saturating_add);

    let mut player_rows: Vec<PlayerRow> = listed
        .iter()
        .map(|stat| {
            player_row(
                stat.actor_id,
                &info(stat.actor_id),
                stat.cells(metric, boss_only),
                scope_total,
                elapsed_secs,
            )
        })
        .collect();
    player_rows.sort_by(|left, right| right.total_dmg.cmp(&left.total_dmg).then(left.uid.cmp(&right.uid)));

    PlayersWindow { player_rows }
}

/// One row per skill, ranked by total. Percentages are relative to the actor's own total.
pub fn skills_window(
    names: &SkillNames,
    curr_player: Option<PlayerRow>,
    breakdown: HashMap<i32, HitCells>,
    elapsed_secs: f64,
) -> SkillsWindow {
    let actor_total: i64 = breakdown.values().map(|cells| cells.total).fold(0, i64::saturating_add);

    let mut skill_rows: Vec<SkillRow> = breakdown
        .into_iter()
        .map(|(skill_id, cells)| SkillRow {
            skill_id,
            name: names.resolve(skill_id),
            total_dmg: cells.total,
            dps: per_second(cells.total, elapsed_secs),
            dmg_pct: percentage(cells.total, actor_total),
            crit_rate: ratio(cells.crit_hits, cells.hits),
            crit_dmg_rate: ratio(cells.crit_total, cells.total),
            lucky_rate: ratio(cells.lucky_hits, cells.hits),
            lucky_dmg_rate: ratio(cells.lucky_total, cells.total),
            hits: cells.hits,
            hits_per_minute: per_minute(cells.hits, elapsed_secs),
        })
        .collect();
    skill_rows.sort_by(|left, right| right.total_dmg.cmp(&left.total_dmg).then(left.skill_id.cmp(&right.skill_id)));

    SkillsWindow { curr_player, skill_rows }
}

/// Groups skill rollups of one actor by skill id for a metric.
pub fn breakdown_for<'a, I>(skills: I, actor_id: i64, metric: MetricType, boss_only: bool) -> HashMap<i32, HitCells>
where
    I: IntoIterator<Item = (&'a SkillKey, HitCells, bool)>,
{
    let mut breakdown: HashMap<i32, HitCells> = HashMap::new();

    for (key, cells, is_boss_target) in skills {
        let is_owned = match metric {
            MetricType::Dps => key.source_id == actor_id && (!boss_only || is_boss_target),
            MetricType::Heal => key.source_id == actor_id,
            MetricType::Tanked => key.target_id == actor_id,
        };

        if is_owned {
            breakdown.entry(key.skill_id).or_default().merge(&cells);
        }
    }

    breakdown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::Aggregator;
    use crate::test_utils::*;

    fn info(id: i64) -> ActorInfo {
        ActorInfo { name: format!("#{id}"), ..Default::default() }
    }

    #[test]
    fn should_rank_players_with_share_of_total() {
        let mut aggregator = Aggregator::new(false);
        aggregator.apply(&resolved_damage(1, 10, 100, false, 1));
        aggregator.apply(&resolved_damage(1, 10, 200, true, 1));
        aggregator.apply(&resolved_damage(2, 10, 50, false, 1));

        let window = players_window(aggregator.actors.values(), info, MetricType::Dps, false, 10.0);

        assert_eq!(window.player_rows.len(), 2);
        let first = &window.player_rows[0];
        assert_eq!(first.uid, 1);
        assert_eq!(first.total_dmg, 300);
        assert_eq!(first.hits, 2);
        assert!((first.dmg_pct - 85.714).abs() < 0.01);
        assert_eq!(first.crit_rate, 0.5);
        assert_eq!(first.dps, 30.0);
        assert_eq!(first.hits_per_minute, 12.0);
        assert_eq!(window.player_rows[1].uid, 2);
    }

    #[test]
    fn should_read_boss_cells_in_boss_only_mode() {
        let mut aggregator = Aggregator::new(false);
        aggregator.apply(&resolved_damage(1, 10, 500, false, 1));
        aggregator.apply(&resolved_boss_damage(1, 20, 100, 1));
        aggregator.apply(&resolved_boss_damage(2, 20, 300, 1));

        let window = players_window(aggregator.actors.values(), info, MetricType::Dps, true, 1.0);

        assert_eq!(window.player_rows[0].uid, 2);
        assert_eq!(window.player_rows[0].dmg_pct, 75.0);
        assert_eq!(window.player_rows[1].total_dmg, 100);
        assert!(window.player_rows.iter().all(|row| row.total_dmg <= 500));
    }

    #[test]
    fn should_list_only_healers_in_heal_window() {
        let mut aggregator = Aggregator::new(false);
        aggregator.apply(&resolved_damage(1, 10, 100, false, 1));
        aggregator.apply(&resolved_heal(2, 1, 40, 1));

        let window = players_window(aggregator.actors.values(), info, MetricType::Heal, false, 1.0);

        assert_eq!(window.player_rows.len(), 1);
        assert_eq!(window.player_rows[0].uid, 2);
        assert_eq!(window.player_rows[0].dmg_pct, 100.0);
    }

    #[test]
    fn should_rank_skills_of_one_actor() {
        let mut breakdown = HashMap::new();
        breakdown.insert(7, HitCells { total: 100, hits: 1, ..Default::default() });
        breakdown.insert(9, HitCells { total: 300, hits: 3, crit_hits: 1, crit_total: 150, ..Default::default() });

        let names = SkillNames::from_json(&serde_json::json!({ "9": "Flame Burst" })).unwrap();

        let window = skills_window(&names, None, breakdown, 2.0);

        assert_eq!(window.skill_rows[0].skill_id, 9);
        assert_eq!(window.skill_rows[0].name, "Flame Burst");
        assert_eq!(window.skill_rows[0].dmg_pct, 75.0);
        assert_eq!(window.skill_rows[0].crit_dmg_rate, 0.5);
        assert_eq!(window.skill_rows[1].name, "Skill #7");
        assert_eq!(window.skill_rows[1].dps, 50.0);
    }

    #[test]
    fn should_group_breakdown_by_metric() {
        let boss_hit = SkillKey { source_id: 1, target_id: 20, skill_id: 5 };
        let add_hit = SkillKey { source_id: 1, target_id: 10, skill_id: 5 };
        let taken = SkillKey { source_id: 10, target_id: 1, skill_id: 8 };
        let cells = HitCells { total: 10, hits: 1, ..Default::default() };
        let rows = [(&boss_hit, cells, true), (&add_hit, cells, false), (&taken, cells, false)];

        assert_eq!(breakdown_for(rows, 1, MetricType::Dps, false)[&5].total, 20);
        assert_eq!(breakdown_for(rows, 1, MetricType::Dps, true)[&5].total, 10);
        assert_eq!(breakdown_for(rows, 1, MetricType::Tanked, false)[&8].hits, 1);
    }
}
