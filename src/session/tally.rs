//! One-vote-per-voter tallies for the accusation and survival votes

use crate::error::{GameError, GameResult};
use crate::types::{PlayerId, TieBreak};
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Collects exactly one vote per eligible voter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally<V> {
    eligible: BTreeSet<PlayerId>,
    votes: BTreeMap<PlayerId, V>,
}

impl<V> Default for VoteTally<V> {
    fn default() -> Self {
        Self {
            eligible: BTreeSet::new(),
            votes: BTreeMap::new(),
        }
    }
}

impl<V> VoteTally<V> {
    pub fn new(eligible: impl IntoIterator<Item = PlayerId>) -> Self {
        Self {
            eligible: eligible.into_iter().collect(),
            votes: BTreeMap::new(),
        }
    }

    /// Validate a voter without recording anything
    pub fn check_voter(&self, voter: &str) -> GameResult<()> {
        if !self.eligible.contains(voter) {
            return Err(GameError::NotEligible);
        }
        if self.votes.contains_key(voter) {
            return Err(GameError::AlreadyVoted);
        }
        Ok(())
    }

    pub fn cast(&mut self, voter: &str, value: V) -> GameResult<()> {
        self.check_voter(voter)?;
        self.votes.insert(voter.to_string(), value);
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.votes.len() >= self.eligible.len()
    }

    pub fn has_voted(&self, voter: &str) -> bool {
        self.votes.contains_key(voter)
    }

    pub fn votes(&self) -> &BTreeMap<PlayerId, V> {
        &self.votes
    }

    pub fn cast_count(&self) -> usize {
        self.votes.len()
    }

    pub fn eligible_count(&self) -> usize {
        self.eligible.len()
    }

    /// Settle the tally under a rule
    pub fn resolve<Rule, R>(&self, rule: &Rule, rng: &mut R) -> Rule::Outcome
    where
        Rule: Resolution<V>,
        R: Rng + ?Sized,
    {
        rule.resolve(self, rng)
    }
}

impl VoteTally<PlayerId> {
    /// Votes received per target
    pub fn counts(&self) -> BTreeMap<PlayerId, usize> {
        let mut counts = BTreeMap::new();
        for target in self.votes.values() {
            *counts.entry(target.clone()).or_insert(0) += 1;
        }
        counts
    }
}

/// A rule that turns a tally into an outcome
pub trait Resolution<V> {
    type Outcome;

    fn resolve<R: Rng + ?Sized>(&self, tally: &VoteTally<V>, rng: &mut R) -> Self::Outcome;
}

/// Most votes wins; ties settled by the tie-break policy
#[derive(Debug, Clone)]
pub struct Plurality<'a> {
    pub tie_break: TieBreak,
    /// Candidates to draw from when nobody voted at all
    pub fallback: &'a [PlayerId],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccusationOutcome {
    Accused { target: PlayerId, tied: bool },
    Revote { tied: Vec<PlayerId> },
    /// Nobody voted and there is nobody to draw
    Nobody,
}

impl Resolution<PlayerId> for Plurality<'_> {
    type Outcome = AccusationOutcome;

    fn resolve<R: Rng + ?Sized>(&self, tally: &VoteTally<PlayerId>, rng: &mut R) -> AccusationOutcome {
        let counts = tally.counts();
        let Some(max) = counts.values().copied().max() else {
            return match self.fallback.choose(rng) {
                Some(target) => AccusationOutcome::Accused {
                    target: target.clone(),
                    tied: false,
                },
                None => AccusationOutcome::Nobody,
            };
        };

        // BTreeMap iteration keeps the candidate list sorted, so a seeded rng
        // always draws the same winner.
        let leaders: Vec<PlayerId> = counts
            .into_iter()
            .filter(|(_, n)| *n == max)
            .map(|(id, _)| id)
            .collect();

        if leaders.len() == 1 {
            return AccusationOutcome::Accused {
                target: leaders[0].clone(),
                tied: false,
            };
        }

        match self.tie_break {
            TieBreak::Random => match leaders.choose(rng) {
                Some(target) => AccusationOutcome::Accused {
                    target: target.clone(),
                    tied: true,
                },
                None => AccusationOutcome::Nobody,
            },
            TieBreak::Revote => AccusationOutcome::Revote { tied: leaders },
        }
    }
}

/// More than half of the eligible voters must vote `true`
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictMajority;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MajorityOutcome {
    pub yes: usize,
    pub no: usize,
    pub eligible: usize,
    pub passed: bool,
}

impl Resolution<bool> for StrictMajority {
    type Outcome = MajorityOutcome;

    fn resolve<R: Rng + ?Sized>(&self, tally: &VoteTally<bool>, _rng: &mut R) -> MajorityOutcome {
        let yes = tally.votes().values().filter(|v| **v).count();
        let no = tally.cast_count() - yes;
        let eligible = tally.eligible_count();
        MajorityOutcome {
            yes,
            no,
            eligible,
            passed: eligible > 0 && yes * 2 > eligible,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ids(names: &[&str]) -> Vec<PlayerId> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_rejects_ineligible_and_duplicate_voters() {
        let mut tally: VoteTally<bool> = VoteTally::new(ids(&["a", "b"]));

        assert_eq!(tally.cast("z", true), Err(GameError::NotEligible));
        assert!(tally.cast("a", true).is_ok());
        assert_eq!(tally.cast("a", false), Err(GameError::AlreadyVoted));

        // Recorded value unchanged by the rejected duplicate
        assert_eq!(tally.votes().get("a"), Some(&true));
        assert!(!tally.is_complete());
        tally.cast("b", false).unwrap();
        assert!(tally.is_complete());
    }

    #[test]
    fn test_plurality_single_leader() {
        let alive = ids(&["a", "b", "c", "d"]);
        let mut tally = VoteTally::new(alive.clone());
        tally.cast("a", "c".to_string()).unwrap();
        tally.cast("b", "c".to_string()).unwrap();
        tally.cast("c", "a".to_string()).unwrap();

        let rule = Plurality {
            tie_break: TieBreak::Random,
            fallback: &alive,
        };
        let outcome = tally.resolve(&rule, &mut StdRng::seed_from_u64(0));
        assert_eq!(
            outcome,
            AccusationOutcome::Accused {
                target: "c".to_string(),
                tied: false
            }
        );
    }

    #[test]
    fn test_plurality_random_tie_picks_a_tied_candidate() {
        let alive = ids(&["a", "b", "c", "d"]);
        let mut tally = VoteTally::new(alive.clone());
        tally.cast("a", "b".to_string()).unwrap();
        tally.cast("b", "a".to_string()).unwrap();
        tally.cast("c", "a".to_string()).unwrap();
        tally.cast("d", "b".to_string()).unwrap();

        let rule = Plurality {
            tie_break: TieBreak::Random,
            fallback: &alive,
        };
        for seed in 0..20 {
            match tally.resolve(&rule, &mut StdRng::seed_from_u64(seed)) {
                AccusationOutcome::Accused { target, tied } => {
                    assert!(tied);
                    assert!(target == "a" || target == "b");
                }
                other => panic!("Expected accusation, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_plurality_revote_on_tie() {
        let alive = ids(&["a", "b"]);
        let mut tally = VoteTally::new(alive.clone());
        tally.cast("a", "b".to_string()).unwrap();
        tally.cast("b", "a".to_string()).unwrap();

        let rule = Plurality {
            tie_break: TieBreak::Revote,
            fallback: &alive,
        };
        let outcome = tally.resolve(&rule, &mut StdRng::seed_from_u64(0));
        assert_eq!(
            outcome,
            AccusationOutcome::Revote {
                tied: ids(&["a", "b"])
            }
        );
    }

    #[test]
    fn test_plurality_without_votes_uses_fallback() {
        let alive = ids(&["a", "b", "c"]);
        let tally: VoteTally<PlayerId> = VoteTally::new(alive.clone());
        let rule = Plurality {
            tie_break: TieBreak::Revote,
            fallback: &alive,
        };
        match tally.resolve(&rule, &mut StdRng::seed_from_u64(5)) {
            AccusationOutcome::Accused { target, .. } => assert!(alive.contains(&target)),
            other => panic!("Expected accusation, got {:?}", other),
        }

        let empty: Vec<PlayerId> = Vec::new();
        let rule = Plurality {
            tie_break: TieBreak::Random,
            fallback: &empty,
        };
        assert_eq!(
            tally.resolve(&rule, &mut StdRng::seed_from_u64(5)),
            AccusationOutcome::Nobody
        );
    }

    #[test]
    fn test_strict_majority_counts_missing_votes_as_no() {
        let mut tally = VoteTally::new(ids(&["a", "b", "c", "d"]));
        tally.cast("a", true).unwrap();
        tally.cast("b", true).unwrap();

        // 2 of 4 is not more than half
        let outcome = tally.resolve(&StrictMajority, &mut StdRng::seed_from_u64(0));
        assert_eq!(outcome.yes, 2);
        assert_eq!(outcome.no, 0);
        assert!(!outcome.passed);

        tally.cast("c", true).unwrap();
        let outcome = tally.resolve(&StrictMajority, &mut StdRng::seed_from_u64(0));
        assert!(outcome.passed);
    }

    #[test]
    fn test_strict_majority_with_no_eligible_voters_fails() {
        let tally: VoteTally<bool> = VoteTally::new(Vec::new());
        let outcome = tally.resolve(&StrictMajority, &mut StdRng::seed_from_u64(0));
        assert!(!outcome.passed);
    }
}
