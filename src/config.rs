//! Server and game-rule configuration loaded from the environment

use crate::types::{GamePhase, LiarWinThreshold, TieBreak};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Per-phase time limits. `None` disables the timer for that phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseTimers {
    pub hint: Option<Duration>,
    pub vote: Option<Duration>,
    pub defense: Option<Duration>,
    pub final_vote: Option<Duration>,
    pub guess: Option<Duration>,
}

impl Default for PhaseTimers {
    fn default() -> Self {
        Self {
            hint: Some(Duration::from_secs(60)),
            vote: Some(Duration::from_secs(60)),
            defense: Some(Duration::from_secs(60)),
            final_vote: Some(Duration::from_secs(30)),
            guess: Some(Duration::from_secs(30)),
        }
    }
}

impl PhaseTimers {
    /// No timers at all; phases only advance on player actions
    pub fn disabled() -> Self {
        Self {
            hint: None,
            vote: None,
            defense: None,
            final_vote: None,
            guess: None,
        }
    }

    /// Time limit for a phase instance
    pub fn for_phase(&self, phase: GamePhase) -> Option<Duration> {
        match phase {
            GamePhase::Speech => self.hint,
            GamePhase::VotingForLiar => self.vote,
            GamePhase::Defending => self.defense,
            GamePhase::VotingForSurvival => self.final_vote,
            GamePhase::GuessingWord => self.guess,
            GamePhase::Waiting | GamePhase::Ended => None,
        }
    }
}

/// When the sweeper closes rooms nobody plays in any more
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomCleanup {
    /// How often the sweeper runs
    pub interval: Duration,
    /// Close a room with no commits for this long. `None` keeps idle rooms.
    pub idle_after: Option<Duration>,
    /// Shorter limit for rooms whose game has ended
    pub ended_after: Option<Duration>,
}

impl Default for RoomCleanup {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            idle_after: Some(Duration::from_secs(60 * 60)),
            ended_after: Some(Duration::from_secs(10 * 60)),
        }
    }
}

impl RoomCleanup {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        // A zero interval would make the sweeper spin
        let interval = seconds_from_env(
            "LIARGAME_CLEANUP_INTERVAL_SECONDS",
            Some(defaults.interval),
        )
        .unwrap_or(defaults.interval);
        Self {
            interval,
            idle_after: seconds_from_env("LIARGAME_IDLE_ROOM_SECONDS", defaults.idle_after),
            ended_after: seconds_from_env("LIARGAME_ENDED_ROOM_SECONDS", defaults.ended_after),
        }
    }
}

/// Rules shared by every room on this server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameRules {
    pub min_players: usize,
    pub max_participants: usize,
    pub max_total_rounds: u32,
    pub max_room_name_chars: usize,
    pub max_nickname_chars: usize,
    pub max_hint_chars: usize,
    pub max_defense_chars: usize,
    pub max_guess_chars: usize,
    pub tie_break: TieBreak,
    pub liar_win_threshold: LiarWinThreshold,
    pub timers: PhaseTimers,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            min_players: 3,
            max_participants: 15,
            max_total_rounds: 10,
            max_room_name_chars: 50,
            max_nickname_chars: 20,
            max_hint_chars: 200,
            max_defense_chars: 500,
            max_guess_chars: 100,
            tie_break: TieBreak::default(),
            liar_win_threshold: LiarWinThreshold::default(),
            timers: PhaseTimers::default(),
        }
    }
}

impl GameRules {
    /// Load rule overrides from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let timers = PhaseTimers {
            hint: seconds_from_env("LIARGAME_HINT_SECONDS", defaults.timers.hint),
            vote: seconds_from_env("LIARGAME_VOTE_SECONDS", defaults.timers.vote),
            defense: seconds_from_env("LIARGAME_DEFENSE_SECONDS", defaults.timers.defense),
            final_vote: seconds_from_env(
                "LIARGAME_FINAL_VOTE_SECONDS",
                defaults.timers.final_vote,
            ),
            guess: seconds_from_env("LIARGAME_GUESS_SECONDS", defaults.timers.guess),
        };

        let tie_break = match std::env::var("LIARGAME_TIE_BREAK").ok().as_deref() {
            None => defaults.tie_break,
            Some("random") => TieBreak::Random,
            Some("revote") => TieBreak::Revote,
            Some(other) => {
                tracing::warn!("Unknown LIARGAME_TIE_BREAK '{}', using random", other);
                defaults.tie_break
            }
        };

        let liar_win_threshold = match std::env::var("LIARGAME_LIAR_WIN_THRESHOLD")
            .ok()
            .as_deref()
        {
            None => defaults.liar_win_threshold,
            Some("any_citizen_eliminated") => LiarWinThreshold::AnyCitizenEliminated,
            Some("parity") => LiarWinThreshold::Parity,
            Some("outnumber") => LiarWinThreshold::Outnumber,
            Some(other) => {
                tracing::warn!(
                    "Unknown LIARGAME_LIAR_WIN_THRESHOLD '{}', using any_citizen_eliminated",
                    other
                );
                defaults.liar_win_threshold
            }
        };

        Self {
            tie_break,
            liar_win_threshold,
            timers,
            ..defaults
        }
    }
}

/// Parse a timer in whole seconds; `0` disables it
fn seconds_from_env(key: &str, default: Option<Duration>) -> Option<Duration> {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse::<u64>() {
            Ok(0) => None,
            Ok(secs) => Some(Duration::from_secs(secs)),
            Err(_) => {
                tracing::warn!("Invalid {} '{}', using default", key, raw);
                default
            }
        },
        Err(_) => default,
    }
}

/// Top-level server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// Optional JSON file with subjects and words
    pub content_path: Option<PathBuf>,
    pub rules: GameRules,
    pub cleanup: RoomCleanup,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let addr = std::env::var("LIARGAME_ADDR")
            .ok()
            .and_then(|raw| match raw.parse() {
                Ok(addr) => Some(addr),
                Err(e) => {
                    tracing::warn!("Invalid LIARGAME_ADDR '{}': {}", raw, e);
                    None
                }
            })
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8080)));

        let content_path = std::env::var("LIARGAME_CONTENT_PATH")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        Self {
            addr,
            content_path,
            rules: GameRules::from_env(),
            cleanup: RoomCleanup::from_env(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in [
            "LIARGAME_ADDR",
            "LIARGAME_CONTENT_PATH",
            "LIARGAME_HINT_SECONDS",
            "LIARGAME_VOTE_SECONDS",
            "LIARGAME_DEFENSE_SECONDS",
            "LIARGAME_FINAL_VOTE_SECONDS",
            "LIARGAME_GUESS_SECONDS",
            "LIARGAME_TIE_BREAK",
            "LIARGAME_LIAR_WIN_THRESHOLD",
            "LIARGAME_CLEANUP_INTERVAL_SECONDS",
            "LIARGAME_IDLE_ROOM_SECONDS",
            "LIARGAME_ENDED_ROOM_SECONDS",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_defaults_without_env() {
        clear_env();
        let config = ServerConfig::from_env();
        assert_eq!(config.addr.port(), 8080);
        assert!(config.content_path.is_none());
        assert_eq!(config.rules, GameRules::default());
        assert_eq!(config.cleanup, RoomCleanup::default());
    }

    #[test]
    #[serial]
    fn test_cleanup_overrides() {
        clear_env();
        std::env::set_var("LIARGAME_CLEANUP_INTERVAL_SECONDS", "0");
        std::env::set_var("LIARGAME_IDLE_ROOM_SECONDS", "0");
        std::env::set_var("LIARGAME_ENDED_ROOM_SECONDS", "120");

        let cleanup = RoomCleanup::from_env();
        assert_eq!(cleanup.interval, RoomCleanup::default().interval);
        assert_eq!(cleanup.idle_after, None);
        assert_eq!(cleanup.ended_after, Some(Duration::from_secs(120)));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_timer_overrides() {
        clear_env();
        std::env::set_var("LIARGAME_HINT_SECONDS", "15");
        std::env::set_var("LIARGAME_GUESS_SECONDS", "0");
        std::env::set_var("LIARGAME_VOTE_SECONDS", "soon");

        let rules = GameRules::from_env();
        assert_eq!(rules.timers.hint, Some(Duration::from_secs(15)));
        assert_eq!(rules.timers.guess, None);
        assert_eq!(rules.timers.vote, PhaseTimers::default().vote);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_policy_overrides() {
        clear_env();
        std::env::set_var("LIARGAME_TIE_BREAK", "revote");
        std::env::set_var("LIARGAME_LIAR_WIN_THRESHOLD", "parity");

        let rules = GameRules::from_env();
        assert_eq!(rules.tie_break, TieBreak::Revote);
        assert_eq!(rules.liar_win_threshold, LiarWinThreshold::Parity);

        std::env::set_var("LIARGAME_TIE_BREAK", "coin-flip");
        let rules = GameRules::from_env();
        assert_eq!(rules.tie_break, TieBreak::Random);
        clear_env();
    }

    #[test]
    fn test_timer_lookup_by_phase() {
        let timers = PhaseTimers::default();
        assert_eq!(timers.for_phase(GamePhase::Waiting), None);
        assert_eq!(timers.for_phase(GamePhase::Ended), None);
        assert_eq!(
            timers.for_phase(GamePhase::VotingForSurvival),
            Some(Duration::from_secs(30))
        );
        assert_eq!(PhaseTimers::disabled().for_phase(GamePhase::Speech), None);
    }
}
