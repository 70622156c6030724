use crate::types::{GamePhase, RoomNumber};

/// Result type for game operations
pub type GameResult<T> = Result<T, GameError>;

/// Validation failures surfaced to the caller of a game action.
///
/// Every variant is detected before any state is touched, so an `Err`
/// always means the room is exactly as it was before the call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("Action not allowed during {0:?}")]
    WrongPhase(GamePhase),

    #[error("It is not your turn to speak")]
    NotYourTurn,

    #[error("Only the accused player can do that")]
    NotAccused,

    #[error("You have already voted")]
    AlreadyVoted,

    #[error("Invalid vote target: {0}")]
    InvalidTarget(String),

    #[error("Not enough players: have {have}, need {need}")]
    InsufficientPlayers { have: usize, need: usize },

    #[error("No subject with words is available")]
    InsufficientContent,

    #[error("The game has ended")]
    GameEnded,

    #[error("Room {0} not found")]
    RoomNotFound(RoomNumber),

    #[error("Room is full")]
    RoomFull,

    #[error("You are not in this room")]
    NotInRoom,

    #[error("You are already in this room")]
    AlreadyJoined,

    #[error("Only the room owner can do that")]
    NotOwner,

    #[error("You are not eligible for this action")]
    NotEligible,

    #[error("Defense already submitted")]
    DefenseAlreadySubmitted,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid room settings: {0}")]
    InvalidSettings(String),

    #[error("All room numbers are in use")]
    RoomNumbersExhausted,
}

impl GameError {
    /// Stable machine-readable code sent to clients
    pub fn code(&self) -> &'static str {
        match self {
            GameError::WrongPhase(_) => "WRONG_PHASE",
            GameError::NotYourTurn => "NOT_YOUR_TURN",
            GameError::NotAccused => "NOT_ACCUSED",
            GameError::AlreadyVoted => "ALREADY_VOTED",
            GameError::InvalidTarget(_) => "INVALID_TARGET",
            GameError::InsufficientPlayers { .. } => "INSUFFICIENT_PLAYERS",
            GameError::InsufficientContent => "INSUFFICIENT_CONTENT",
            GameError::GameEnded => "GAME_ENDED",
            GameError::RoomNotFound(_) => "ROOM_NOT_FOUND",
            GameError::RoomFull => "ROOM_FULL",
            GameError::NotInRoom => "NOT_IN_ROOM",
            GameError::AlreadyJoined => "ALREADY_JOINED",
            GameError::NotOwner => "NOT_OWNER",
            GameError::NotEligible => "NOT_ELIGIBLE",
            GameError::DefenseAlreadySubmitted => "DEFENSE_ALREADY_SUBMITTED",
            GameError::InvalidInput(_) => "INVALID_INPUT",
            GameError::InvalidSettings(_) => "INVALID_SETTINGS",
            GameError::RoomNumbersExhausted => "ROOM_NUMBERS_EXHAUSTED",
        }
    }
}
