use crate::error::GameError;
use crate::session::snapshot::GameSnapshot;
use crate::types::*;
use serde::{Deserialize, Serialize};

/// Protocol identifier sent in `Welcome`
pub const PROTOCOL_VERSION: &str = "liargame/1";

/// Messages from a connected player. The room and the acting player come
/// from the connection, never from the message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    Join,
    Leave,
    Start,
    GiveHint {
        text: String,
    },
    Vote {
        target_id: PlayerId,
    },
    SubmitDefense {
        text: String,
    },
    EndDefense,
    FinalVote {
        /// True votes to eliminate the accused
        eliminate: bool,
    },
    GuessWord {
        guess: String,
    },
    /// Ask for a fresh snapshot (e.g. after reconnecting)
    GetState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        room_number: RoomNumber,
        player_id: PlayerId,
        server_now: String,
    },
    /// Role-scoped state, sent after every committed change in the room
    State {
        snapshot: Box<GameSnapshot>,
    },
    /// Reply to the eliminated liar's guess
    GuessResult {
        is_correct: bool,
        snapshot: Box<GameSnapshot>,
    },
    /// Sent to the leaving player
    Left {
        room_number: RoomNumber,
    },
    /// The room was destroyed
    RoomClosed {
        room_number: RoomNumber,
    },
    Error {
        code: String,
        msg: String,
    },
}

impl ServerMessage {
    pub fn state(snapshot: GameSnapshot) -> Self {
        ServerMessage::State {
            snapshot: Box::new(snapshot),
        }
    }
}

impl From<GameError> for ServerMessage {
    fn from(e: GameError) -> Self {
        ServerMessage::Error {
            code: e.code().to_string(),
            msg: e.to_string(),
        }
    }
}
