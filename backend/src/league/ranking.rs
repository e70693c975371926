//! Standings order and group qualification
//!
//! Tie-break cascade, best first:
//! 1. table points
//! 2. the decisive head-to-head result between the two teams
//! 3. sets won
//! 4. set difference
//! 5. point difference
//!
//! Teams still tied keep their input order.

use serde::Serialize;
use sqlx::FromRow;
use std::cmp::Ordering;

/// One team's standings row joined with its name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct StandingRow {
    pub team_id: i64,
    pub team_name: String,
    pub level_id: i64,
    pub played: i64,
    pub won: i64,
    pub lost: i64,
    pub sets_won: i64,
    pub sets_lost: i64,
    pub points_for: i64,
    pub points_against: i64,
    pub table_points: i64,
}

impl StandingRow {
    pub fn set_difference(&self) -> i64 {
        self.sets_won - self.sets_lost
    }

    pub fn point_difference(&self) -> i64 {
        self.points_for - self.points_against
    }
}

/// Header of a finalized match, enough to settle a head-to-head tie
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct MatchResult {
    pub level_id: i64,
    pub team_a_id: i64,
    pub team_b_id: i64,
    pub sets_a: i64,
    pub sets_b: i64,
}

impl MatchResult {
    fn winner(&self) -> Option<i64> {
        match self.sets_a.cmp(&self.sets_b) {
            Ordering::Greater => Some(self.team_a_id),
            Ordering::Less => Some(self.team_b_id),
            Ordering::Equal => None,
        }
    }

    fn involves(&self, x: i64, y: i64) -> bool {
        (self.team_a_id == x && self.team_b_id == y) || (self.team_a_id == y && self.team_b_id == x)
    }
}

fn head_to_head(a: i64, b: i64, results: &[MatchResult]) -> Ordering {
    match results.iter().find(|m| m.involves(a, b)).and_then(MatchResult::winner) {
        Some(winner) if winner == a => Ordering::Less,
        Some(winner) if winner == b => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

/// `Less` when `a` ranks above `b`.
pub fn compare(a: &StandingRow, b: &StandingRow, results: &[MatchResult]) -> Ordering {
    b.table_points
        .cmp(&a.table_points)
        .then_with(|| head_to_head(a.team_id, b.team_id, results))
        .then_with(|| b.sets_won.cmp(&a.sets_won))
        .then_with(|| b.set_difference().cmp(&a.set_difference()))
        .then_with(|| b.point_difference().cmp(&a.point_difference()))
}

/// Orders a level's rows best first.
///
/// Head-to-head results can form cycles (A beat B, B beat C, C beat A), so the
/// comparison is not a total order; a stable insertion sort is used instead
/// of `sort_by`, which may panic on inconsistent comparators.
pub fn rank(mut rows: Vec<StandingRow>, results: &[MatchResult]) -> Vec<StandingRow> {
    for i in 1..rows.len() {
        let mut j = i;
        while j > 0 && compare(&rows[j - 1], &rows[j], results) == Ordering::Greater {
            rows.swap(j - 1, j);
            j -= 1;
        }
    }
    rows
}

/// Teams advancing from each group so that four reach the playoff
pub fn qualifiers_per_group(group_count: usize) -> usize {
    match group_count {
        0 => 0,
        1 => 4,
        2 | 3 => 2,
        _ => 1,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Qualifier {
    /// 1-based rank inside the team's group
    pub position: usize,
    #[serde(flatten)]
    pub standing: StandingRow,
}

/// Top teams of each sibling group, ordered by group id then rank.
pub fn group_winners(
    groups: Vec<(i64, Vec<StandingRow>)>,
    results: &[MatchResult],
) -> Vec<Qualifier> {
    let per_group = qualifiers_per_group(groups.len());
    let mut groups = groups;
    groups.sort_by_key(|(level_id, _)| *level_id);

    let mut winners = Vec::new();
    for (level_id, rows) in groups {
        let level_results: Vec<MatchResult> = results
            .iter()
            .filter(|m| m.level_id == level_id)
            .cloned()
            .collect();

        winners.extend(
            rank(rows, &level_results)
                .into_iter()
                .take(per_group)
                .enumerate()
                .map(|(i, standing)| Qualifier {
                    position: i + 1,
                    standing,
                }),
        );
    }
    winners
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(team_id: i64, table_points: i64, sets: (i64, i64), points: (i64, i64)) -> StandingRow {
        StandingRow {
            team_id,
            team_name: format!("Team {}", team_id),
            level_id: 1,
            played: 0,
            won: 0,
            lost: 0,
            sets_won: sets.0,
            sets_lost: sets.1,
            points_for: points.0,
            points_against: points.1,
            table_points,
        }
    }

    fn result(team_a_id: i64, team_b_id: i64, sets_a: i64, sets_b: i64) -> MatchResult {
        MatchResult {
            level_id: 1,
            team_a_id,
            team_b_id,
            sets_a,
            sets_b,
        }
    }

    fn ids(rows: &[StandingRow]) -> Vec<i64> {
        rows.iter().map(|r| r.team_id).collect()
    }

    #[test]
    fn test_table_points_first() {
        let ranked = rank(
            vec![row(1, 3, (9, 0), (225, 0)), row(2, 8, (0, 9), (0, 225))],
            &[],
        );
        assert_eq!(ids(&ranked), vec![2, 1]);
    }

    #[test]
    fn test_head_to_head_beats_every_later_criterion() {
        // Team 1 has worse sets and points but beat team 2
        let rows = vec![row(2, 5, (8, 2), (250, 180)), row(1, 5, (4, 6), (200, 230))];
        let ranked = rank(rows, &[result(2, 1, 1, 3)]);
        assert_eq!(ids(&ranked), vec![1, 2]);
    }

    #[test]
    fn test_undecided_or_missing_head_to_head_falls_through() {
        let rows = vec![row(1, 5, (4, 2), (100, 90)), row(2, 5, (6, 2), (100, 90))];
        let ranked = rank(rows.clone(), &[result(1, 2, 2, 2)]);
        assert_eq!(ids(&ranked), vec![2, 1]);
        let ranked = rank(rows, &[]);
        assert_eq!(ids(&ranked), vec![2, 1]);
    }

    #[test]
    fn test_set_then_point_difference() {
        // Same sets won; set difference decides
        let ranked = rank(
            vec![row(1, 4, (6, 4), (0, 0)), row(2, 4, (6, 2), (0, 0))],
            &[],
        );
        assert_eq!(ids(&ranked), vec![2, 1]);

        // Same sets; point difference decides
        let ranked = rank(
            vec![row(1, 4, (6, 2), (150, 140)), row(2, 4, (6, 2), (150, 120))],
            &[],
        );
        assert_eq!(ids(&ranked), vec![2, 1]);
    }

    #[test]
    fn test_full_ties_keep_input_order() {
        let rows = vec![
            row(3, 4, (3, 3), (100, 100)),
            row(1, 4, (3, 3), (100, 100)),
            row(2, 4, (3, 3), (100, 100)),
        ];
        assert_eq!(ids(&rank(rows, &[])), vec![3, 1, 2]);
    }

    #[test]
    fn test_head_to_head_cycle_does_not_panic() {
        let rows = vec![
            row(1, 5, (5, 5), (200, 200)),
            row(2, 5, (5, 5), (200, 200)),
            row(3, 5, (5, 5), (200, 200)),
        ];
        let results = [result(1, 2, 3, 0), result(2, 3, 3, 0), result(3, 1, 3, 0)];
        let ranked = rank(rows, &results);
        assert_eq!(ranked.len(), 3);
    }

    #[test]
    fn test_qualifiers_per_group() {
        assert_eq!(qualifiers_per_group(1), 4);
        assert_eq!(qualifiers_per_group(2), 2);
        assert_eq!(qualifiers_per_group(4), 1);
        assert_eq!(qualifiers_per_group(6), 1);
    }

    #[test]
    fn test_group_winners_take_top_two_of_two_groups() {
        let mut g1 = vec![row(1, 2, (2, 3), (0, 0)), row(2, 8, (6, 1), (0, 0)), row(3, 5, (4, 4), (0, 0))];
        let mut g2 = vec![row(4, 9, (6, 0), (0, 0)), row(5, 1, (1, 6), (0, 0)), row(6, 4, (3, 3), (0, 0))];
        for r in g1.iter_mut() {
            r.level_id = 10;
        }
        for r in g2.iter_mut() {
            r.level_id = 20;
        }

        let winners = group_winners(vec![(20, g2), (10, g1)], &[]);
        let picked: Vec<(i64, usize)> = winners
            .iter()
            .map(|q| (q.standing.team_id, q.position))
            .collect();
        assert_eq!(picked, vec![(2, 1), (3, 2), (4, 1), (6, 2)]);
    }
}
