//! Score tracking for one trivia session
//!
//! Scores are keyed by display name, exactly as they appear in the wire
//! `score` event. Entries are created when a player joins, removed when
//! they disconnect, and may go negative: a wrong answer costs a point and
//! a timeout costs every registered player a point.

use std::collections::HashMap;

use itertools::Itertools;

/// Name-keyed signed score table for the current session
#[derive(Debug, Default, Clone)]
pub struct Scoreboard {
    scores: HashMap<String, i64>,
}

impl Scoreboard {
    /// Creates an empty scoreboard
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a zeroed entry for a joining player
    ///
    /// Names are not guaranteed unique; a second enrollment under the same
    /// name resets that name's entry.
    pub fn enroll(&mut self, name: &str) {
        self.scores.insert(name.to_owned(), 0);
    }

    /// Removes a departing player's entry
    pub fn forget(&mut self, name: &str) {
        self.scores.remove(name);
    }

    /// Adjusts one player's score by the given delta
    ///
    /// Returns `false` when no entry exists under that name, leaving the
    /// table untouched.
    pub fn award(&mut self, name: &str, delta: i64) -> bool {
        match self.scores.get_mut(name) {
            Some(score) => {
                *score += delta;
                true
            }
            None => false,
        }
    }

    /// Deducts one point from every entry
    pub fn penalize_all(&mut self) {
        for score in self.scores.values_mut() {
            *score -= 1;
        }
    }

    /// Returns the score mapping as broadcast in the `score` event
    pub fn table(&self) -> HashMap<String, i64> {
        self.scores.clone()
    }

    /// Returns `(name, score)` pairs sorted by score descending
    ///
    /// The sort is stable, so ties keep the underlying iteration order.
    pub fn standings(&self) -> Vec<(String, i64)> {
        self.scores
            .iter()
            .map(|(name, score)| (name.to_owned(), *score))
            .sorted_by_key(|(_, score)| std::cmp::Reverse(*score))
            .collect()
    }

    /// Returns the name holding the maximum score, if any entries exist
    pub fn winner(&self) -> Option<String> {
        self.standings().into_iter().next().map(|(name, _)| name)
    }

    /// Returns the number of entries
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Checks whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_enroll_starts_at_zero() {
        let mut board = Scoreboard::new();
        board.enroll("Ann");

        assert_eq!(board.table().get("Ann"), Some(&0));
        assert_eq!(board.len(), 1);
    }

    #[test]
    fn test_reenroll_resets_entry() {
        let mut board = Scoreboard::new();
        board.enroll("Ann");
        board.award("Ann", 3);
        board.enroll("Ann");

        assert_eq!(board.table().get("Ann"), Some(&0));
    }

    #[test]
    fn test_award_and_forget() {
        let mut board = Scoreboard::new();
        board.enroll("Ann");

        assert!(board.award("Ann", 1));
        assert!(board.award("Ann", -1));
        assert_eq!(board.table().get("Ann"), Some(&0));

        board.forget("Ann");
        assert!(board.is_empty());
        assert!(!board.award("Ann", 1));
    }

    #[test]
    fn test_scores_can_go_negative() {
        let mut board = Scoreboard::new();
        board.enroll("Ann");
        board.award("Ann", -1);
        board.penalize_all();

        assert_eq!(board.table().get("Ann"), Some(&-2));
    }

    #[test]
    fn test_penalize_all_hits_every_entry() {
        let mut board = Scoreboard::new();
        board.enroll("Ann");
        board.enroll("Bo");
        board.award("Ann", 2);
        board.penalize_all();

        assert_eq!(board.table().get("Ann"), Some(&1));
        assert_eq!(board.table().get("Bo"), Some(&-1));
    }

    #[test]
    fn test_standings_sorted_descending() {
        let mut board = Scoreboard::new();
        board.enroll("Ann");
        board.enroll("Bo");
        board.enroll("Cy");
        board.award("Ann", 1);
        board.award("Cy", 3);
        board.award("Bo", -2);

        let standings = board.standings();
        assert_eq!(
            standings,
            vec![
                ("Cy".to_owned(), 3),
                ("Ann".to_owned(), 1),
                ("Bo".to_owned(), -2),
            ]
        );
    }

    #[test]
    fn test_winner_is_top_of_standings() {
        let mut board = Scoreboard::new();
        assert_eq!(board.winner(), None);

        board.enroll("Ann");
        board.enroll("Bo");
        board.award("Bo", 2);
        assert_eq!(board.winner(), Some("Bo".to_owned()));
    }
}
