//! Win-condition policy, kept as a pure function of counts and events

use crate::types::{EndReason, LiarWinThreshold, Role};

/// Alive players per role, taken after the latest elimination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AliveCounts {
    pub citizens: usize,
    pub liars: usize,
}

/// What just happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundEvent {
    /// The survival vote failed; the accused stays in
    Spared,
    /// The survival vote passed against a player of this role
    Eliminated(Role),
    /// The eliminated liar's guess was judged
    Guessed { correct: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Start the next round with a fresh turn order
    NextRound,
    /// Give the eliminated liar their guess
    LiarGuess,
    Ended(EndReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundLimit {
    pub round: u32,
    pub total_rounds: u32,
}

pub fn evaluate(
    event: RoundEvent,
    counts: AliveCounts,
    limit: RoundLimit,
    threshold: LiarWinThreshold,
) -> Verdict {
    match event {
        RoundEvent::Guessed { correct: true } => Verdict::Ended(EndReason::LiarGuessedWord),
        RoundEvent::Guessed { correct: false } => Verdict::Ended(EndReason::LiarMissedWord),
        RoundEvent::Eliminated(Role::Liar) => Verdict::LiarGuess,
        RoundEvent::Eliminated(Role::Citizen) => {
            let liars_win = match threshold {
                LiarWinThreshold::AnyCitizenEliminated => {
                    return Verdict::Ended(EndReason::CitizenEliminated)
                }
                LiarWinThreshold::Parity => counts.citizens <= counts.liars,
                LiarWinThreshold::Outnumber => counts.citizens < counts.liars,
            };
            if liars_win {
                Verdict::Ended(EndReason::LiarsReachedThreshold)
            } else {
                next_round_or_exhausted(limit)
            }
        }
        RoundEvent::Spared => next_round_or_exhausted(limit),
    }
}

fn next_round_or_exhausted(limit: RoundLimit) -> Verdict {
    if limit.round >= limit.total_rounds {
        Verdict::Ended(EndReason::RoundsExhausted)
    } else {
        Verdict::NextRound
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Winner;

    const COUNTS: AliveCounts = AliveCounts {
        citizens: 2,
        liars: 1,
    };
    const EARLY: RoundLimit = RoundLimit {
        round: 1,
        total_rounds: 3,
    };
    const LAST: RoundLimit = RoundLimit {
        round: 3,
        total_rounds: 3,
    };

    #[test]
    fn test_guess_decides_game() {
        let correct = evaluate(
            RoundEvent::Guessed { correct: true },
            COUNTS,
            EARLY,
            LiarWinThreshold::Parity,
        );
        assert_eq!(correct, Verdict::Ended(EndReason::LiarGuessedWord));
        assert_eq!(EndReason::LiarGuessedWord.winner(), Winner::Liar);

        let wrong = evaluate(
            RoundEvent::Guessed { correct: false },
            COUNTS,
            EARLY,
            LiarWinThreshold::Parity,
        );
        assert_eq!(wrong, Verdict::Ended(EndReason::LiarMissedWord));
        assert_eq!(EndReason::LiarMissedWord.winner(), Winner::Citizen);
    }

    #[test]
    fn test_eliminated_liar_gets_to_guess() {
        for threshold in [
            LiarWinThreshold::AnyCitizenEliminated,
            LiarWinThreshold::Parity,
            LiarWinThreshold::Outnumber,
        ] {
            let verdict = evaluate(RoundEvent::Eliminated(Role::Liar), COUNTS, LAST, threshold);
            assert_eq!(verdict, Verdict::LiarGuess);
        }
    }

    #[test]
    fn test_any_citizen_eliminated_ends_game() {
        let verdict = evaluate(
            RoundEvent::Eliminated(Role::Citizen),
            AliveCounts {
                citizens: 5,
                liars: 1,
            },
            EARLY,
            LiarWinThreshold::AnyCitizenEliminated,
        );
        assert_eq!(verdict, Verdict::Ended(EndReason::CitizenEliminated));
    }

    #[test]
    fn test_parity_threshold() {
        let still_ahead = evaluate(
            RoundEvent::Eliminated(Role::Citizen),
            COUNTS,
            EARLY,
            LiarWinThreshold::Parity,
        );
        assert_eq!(still_ahead, Verdict::NextRound);

        let even = evaluate(
            RoundEvent::Eliminated(Role::Citizen),
            AliveCounts {
                citizens: 1,
                liars: 1,
            },
            EARLY,
            LiarWinThreshold::Parity,
        );
        assert_eq!(even, Verdict::Ended(EndReason::LiarsReachedThreshold));
    }

    #[test]
    fn test_outnumber_threshold() {
        let even = evaluate(
            RoundEvent::Eliminated(Role::Citizen),
            AliveCounts {
                citizens: 2,
                liars: 2,
            },
            EARLY,
            LiarWinThreshold::Outnumber,
        );
        assert_eq!(even, Verdict::NextRound);

        let behind = evaluate(
            RoundEvent::Eliminated(Role::Citizen),
            AliveCounts {
                citizens: 1,
                liars: 2,
            },
            EARLY,
            LiarWinThreshold::Outnumber,
        );
        assert_eq!(behind, Verdict::Ended(EndReason::LiarsReachedThreshold));
    }

    #[test]
    fn test_spared_continues_until_rounds_run_out() {
        let verdict = evaluate(RoundEvent::Spared, COUNTS, EARLY, LiarWinThreshold::Parity);
        assert_eq!(verdict, Verdict::NextRound);

        let verdict = evaluate(RoundEvent::Spared, COUNTS, LAST, LiarWinThreshold::Parity);
        assert_eq!(verdict, Verdict::Ended(EndReason::RoundsExhausted));
        assert_eq!(EndReason::RoundsExhausted.winner(), Winner::Citizen);
    }
}
