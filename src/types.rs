use serde::{Deserialize, Serialize};

/// Opaque ID types for type safety
pub type PlayerId = String;
pub type SubjectId = String;
pub type RoomNumber = u32;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GamePhase {
    Waiting,
    Speech,
    VotingForLiar,
    Defending,
    VotingForSurvival,
    GuessingWord,
    Ended,
}

impl GamePhase {
    /// Phases in which a round is actively being played
    pub fn is_in_progress(&self) -> bool {
        !matches!(self, GamePhase::Waiting | GamePhase::Ended)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Citizen,
    Liar,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerState {
    Alive,
    Accused,
    Survived,
    Eliminated,
}

impl PlayerState {
    /// Everyone except eliminated players is still in the game
    pub fn is_alive(&self) -> bool {
        *self != PlayerState::Eliminated
    }
}

/// Controls how much the liars learn about the secret
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameMode {
    /// Liars are shown the subject, never the word
    #[default]
    LiarsKnow,
    /// Liars are shown nothing but their role
    LiarsDontKnow,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Winner {
    Citizen,
    Liar,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EndReason {
    LiarGuessedWord,
    LiarMissedWord,
    CitizenEliminated,
    LiarsReachedThreshold,
    RoundsExhausted,
}

impl EndReason {
    pub fn winner(&self) -> Winner {
        match self {
            EndReason::LiarGuessedWord
            | EndReason::CitizenEliminated
            | EndReason::LiarsReachedThreshold => Winner::Liar,
            EndReason::LiarMissedWord | EndReason::RoundsExhausted => Winner::Citizen,
        }
    }
}

/// How an accusation vote with several top candidates is settled
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Pick one of the tied candidates uniformly at random
    #[default]
    Random,
    /// Throw the tally away and let everyone vote again
    Revote,
}

/// When the elimination of a citizen hands the game to the liars
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LiarWinThreshold {
    /// Any wrongful elimination ends the game
    #[default]
    AnyCitizenEliminated,
    /// Liars win once citizens no longer outnumber them
    Parity,
    /// Liars win once they outnumber the citizens
    Outnumber,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "kind", content = "subject_ids", rename_all = "snake_case")]
pub enum SubjectSelection {
    /// Any subject from the content pool
    #[default]
    Random,
    /// Restrict the draw to these subjects
    Fixed(Vec<SubjectId>),
}

/// Per-room settings chosen at creation time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomSettings {
    pub name: String,
    pub max_participants: usize,
    pub total_rounds: u32,
    pub liar_count: usize,
    #[serde(default)]
    pub mode: GameMode,
    #[serde(default)]
    pub subject_selection: SubjectSelection,
}

/// The authenticated caller of an operation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub id: PlayerId,
    pub nickname: String,
}

impl Actor {
    pub fn new(id: impl Into<PlayerId>, nickname: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            nickname: nickname.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub nickname: String,
    /// Unset until the game starts
    pub role: Option<Role>,
    pub state: PlayerState,
}

impl Player {
    pub fn new(actor: &Actor) -> Self {
        Self {
            id: actor.id.clone(),
            nickname: actor.nickname.clone(),
            role: None,
            state: PlayerState::Alive,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.state.is_alive()
    }

    pub fn is_liar(&self) -> bool {
        self.role == Some(Role::Liar)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Hint {
    pub round: u32,
    pub player_id: PlayerId,
    pub text: String,
    /// True when the speaker ran out of time and the turn was skipped
    #[serde(default)]
    pub skipped: bool,
}

/// Result of the survival vote, kept for display
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SurvivalResult {
    pub accused_id: PlayerId,
    pub eliminate_votes: usize,
    pub spare_votes: usize,
    pub eligible_voters: usize,
    pub eliminated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GuessRecord {
    pub player_id: PlayerId,
    /// None when the guess timed out
    pub guess: Option<String>,
    pub correct: bool,
}

/// The subject/word pair drawn for a game
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Secret {
    pub subject_id: SubjectId,
    pub subject: String,
    pub word: String,
}
