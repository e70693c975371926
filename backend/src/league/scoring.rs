//! Set and match scoring rules
//!
//! Pure functions shared by the incremental referee path, the walkover path
//! and the full standings recompute, so every path awards the same table
//! points for the same result.

use crate::db::models::{MatchSet, Side};
use serde::Serialize;
use std::ops::{AddAssign, Neg};

/// Set wins needed to take a best-of-five match
pub const SETS_TO_WIN: i64 = 3;
/// Highest valid set number
pub const MAX_SETS: i64 = 5;
/// Points credited to the present side in each synthesized walkover set
pub const WALKOVER_SET_POINTS: i64 = 25;

/// Winner of a single set. Equal points win nobody.
pub fn set_winner(points_a: i64, points_b: i64) -> Option<Side> {
    match points_a.cmp(&points_b) {
        std::cmp::Ordering::Greater => Some(Side::A),
        std::cmp::Ordering::Less => Some(Side::B),
        std::cmp::Ordering::Equal => None,
    }
}

/// Running set wins and rally points across a match's sets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SetTally {
    pub sets_a: i64,
    pub sets_b: i64,
    pub points_a: i64,
    pub points_b: i64,
}

impl SetTally {
    pub fn from_scores<I>(scores: I) -> Self
    where
        I: IntoIterator<Item = (i64, i64)>,
    {
        let mut tally = SetTally::default();
        for (points_a, points_b) in scores {
            tally.points_a += points_a;
            tally.points_b += points_b;
            match set_winner(points_a, points_b) {
                Some(Side::A) => tally.sets_a += 1,
                Some(Side::B) => tally.sets_b += 1,
                None => {}
            }
        }
        tally
    }

    pub fn from_sets(sets: &[MatchSet]) -> Self {
        Self::from_scores(sets.iter().map(|s| (s.points_a, s.points_b)))
    }

    /// Side with the set-win majority
    pub fn winner(&self) -> Option<Side> {
        set_winner(self.sets_a, self.sets_b)
    }

    /// True once either side has reached the set wins that end a match
    pub fn is_decided(&self) -> bool {
        self.sets_a.max(self.sets_b) >= SETS_TO_WIN
    }

    fn sets_for(&self, side: Side) -> (i64, i64) {
        match side {
            Side::A => (self.sets_a, self.sets_b),
            Side::B => (self.sets_b, self.sets_a),
        }
    }

    fn points_for(&self, side: Side) -> (i64, i64) {
        match side {
            Side::A => (self.points_a, self.points_b),
            Side::B => (self.points_b, self.points_a),
        }
    }
}

/// Table points as (winner, loser).
///
/// A win by two or more sets (3-0, 3-1) is worth 4 to the winner and 1 to the
/// loser; a one-set win (3-2) is worth 3 and 2. A walkover gives the present
/// side 4 and the absent side nothing, whatever the margin.
pub fn table_points(winner_sets: i64, loser_sets: i64, walkover: bool) -> (i64, i64) {
    if walkover {
        return (4, 0);
    }
    if winner_sets - loser_sets >= 2 {
        (4, 1)
    } else {
        (3, 2)
    }
}

/// Change to one team's standings row caused by one finalized match
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsDelta {
    pub played: i64,
    pub won: i64,
    pub lost: i64,
    pub sets_won: i64,
    pub sets_lost: i64,
    pub points_for: i64,
    pub points_against: i64,
    pub table_points: i64,
}

impl AddAssign for StatsDelta {
    fn add_assign(&mut self, other: Self) {
        self.played += other.played;
        self.won += other.won;
        self.lost += other.lost;
        self.sets_won += other.sets_won;
        self.sets_lost += other.sets_lost;
        self.points_for += other.points_for;
        self.points_against += other.points_against;
        self.table_points += other.table_points;
    }
}

impl Neg for StatsDelta {
    type Output = StatsDelta;

    fn neg(self) -> StatsDelta {
        StatsDelta {
            played: -self.played,
            won: -self.won,
            lost: -self.lost,
            sets_won: -self.sets_won,
            sets_lost: -self.sets_lost,
            points_for: -self.points_for,
            points_against: -self.points_against,
            table_points: -self.table_points,
        }
    }
}

/// Per-side deltas of a decided match, indexed as (side A, side B).
///
/// Returns `None` when neither side holds a set-win majority; such a match
/// contributes nothing to the standings.
pub fn match_deltas(tally: &SetTally, walkover: bool) -> Option<(StatsDelta, StatsDelta)> {
    let winner = tally.winner()?;
    let (winner_sets, loser_sets) = tally.sets_for(winner);
    let (winner_points, loser_points) = table_points(winner_sets, loser_sets, walkover);

    let side_delta = |side: Side| {
        let (sets_won, sets_lost) = tally.sets_for(side);
        let (points_for, points_against) = tally.points_for(side);
        let won = side == winner;
        StatsDelta {
            played: 1,
            won: won as i64,
            lost: (!won) as i64,
            sets_won,
            sets_lost,
            points_for,
            points_against,
            table_points: if won { winner_points } else { loser_points },
        }
    };

    Some((side_delta(Side::A), side_delta(Side::B)))
}

/// Set scores of a walkover, numbered 1..=3, with the absent side scoring nothing
pub fn walkover_sets(absent: Side) -> Vec<(i64, i64, i64)> {
    (1..=SETS_TO_WIN)
        .map(|n| match absent {
            Side::A => (n, 0, WALKOVER_SET_POINTS),
            Side::B => (n, WALKOVER_SET_POINTS, 0),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_winner_requires_strictly_more_points() {
        assert_eq!(set_winner(25, 23), Some(Side::A));
        assert_eq!(set_winner(24, 26), Some(Side::B));
        assert_eq!(set_winner(20, 20), None);
    }

    #[test]
    fn test_tally_counts_sets_and_points() {
        let tally = SetTally::from_scores([(25, 10), (20, 25), (25, 25), (25, 18)]);
        assert_eq!(tally.sets_a, 2);
        assert_eq!(tally.sets_b, 1);
        assert_eq!(tally.points_a, 95);
        assert_eq!(tally.points_b, 78);
        assert!(!tally.is_decided());
        assert_eq!(tally.winner(), Some(Side::A));
    }

    #[test]
    fn test_points_table() {
        assert_eq!(table_points(3, 0, false), (4, 1));
        assert_eq!(table_points(3, 1, false), (4, 1));
        assert_eq!(table_points(3, 2, false), (3, 2));
        assert_eq!(table_points(3, 0, true), (4, 0));
    }

    #[test]
    fn test_straight_sets_deltas() {
        let tally = SetTally::from_scores([(25, 10), (25, 10), (25, 10)]);
        let (a, b) = match_deltas(&tally, false).unwrap();

        assert_eq!(
            a,
            StatsDelta {
                played: 1,
                won: 1,
                lost: 0,
                sets_won: 3,
                sets_lost: 0,
                points_for: 75,
                points_against: 30,
                table_points: 4,
            }
        );
        assert_eq!(b.lost, 1);
        assert_eq!(b.table_points, 1);
        assert_eq!(b.sets_lost, 3);
    }

    #[test]
    fn test_five_set_loser_gets_two_points() {
        let tally =
            SetTally::from_scores([(25, 20), (20, 25), (25, 22), (23, 25), (13, 15)]);
        let (a, b) = match_deltas(&tally, false).unwrap();
        assert_eq!(tally.winner(), Some(Side::B));
        assert_eq!(b.table_points, 3);
        assert_eq!(a.table_points, 2);
        assert_eq!(a.won + a.lost, 1);
    }

    #[test]
    fn test_walkover_deltas_are_fixed() {
        let sets = walkover_sets(Side::A);
        assert_eq!(sets, vec![(1, 0, 25), (2, 0, 25), (3, 0, 25)]);

        let tally = SetTally::from_scores(sets.iter().map(|&(_, a, b)| (a, b)));
        let (absent, present) = match_deltas(&tally, true).unwrap();
        assert_eq!(
            present,
            StatsDelta {
                played: 1,
                won: 1,
                lost: 0,
                sets_won: 3,
                sets_lost: 0,
                points_for: 75,
                points_against: 0,
                table_points: 4,
            }
        );
        assert_eq!(
            absent,
            StatsDelta {
                played: 1,
                won: 0,
                lost: 1,
                sets_won: 0,
                sets_lost: 3,
                points_for: 0,
                points_against: 75,
                table_points: 0,
            }
        );
    }

    #[test]
    fn test_undecided_match_has_no_deltas() {
        let tally = SetTally::from_scores([(25, 20), (20, 25)]);
        assert!(match_deltas(&tally, false).is_none());
    }

    #[test]
    fn test_negated_delta_cancels() {
        let tally = SetTally::from_scores([(25, 20), (25, 20), (20, 25), (25, 3)]);
        let (a, _) = match_deltas(&tally, false).unwrap();
        let mut total = a;
        total += -a;
        assert_eq!(total, StatsDelta::default());
    }
}
