//! WebSocket message dispatch
//!
//! Every client message maps onto one registry operation for the
//! connection's room and player.

use crate::protocol::{ClientMessage, ServerMessage};
use crate::registry::RoomRegistry;
use crate::types::{Actor, RoomNumber};

/// Who is on the other end of a socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub room: RoomNumber,
    pub actor: Actor,
}

/// Apply a client message and build the reply
pub async fn handle_message(
    msg: ClientMessage,
    conn: &Connection,
    registry: &RoomRegistry,
) -> ServerMessage {
    let room = conn.room;
    let id = conn.actor.id.as_str();

    let result = match msg {
        ClientMessage::Join => registry
            .join(room, &conn.actor)
            .await
            .map(ServerMessage::state),

        ClientMessage::Leave => registry
            .leave(room, id)
            .await
            .map(|()| ServerMessage::Left { room_number: room }),

        ClientMessage::Start => registry.start(room, id).await.map(ServerMessage::state),

        ClientMessage::GiveHint { text } => registry
            .give_hint(room, id, &text)
            .await
            .map(ServerMessage::state),

        ClientMessage::Vote { target_id } => registry
            .vote(room, id, &target_id)
            .await
            .map(ServerMessage::state),

        ClientMessage::SubmitDefense { text } => registry
            .submit_defense(room, id, &text)
            .await
            .map(ServerMessage::state),

        ClientMessage::EndDefense => registry
            .end_defense(room, id)
            .await
            .map(ServerMessage::state),

        ClientMessage::FinalVote { eliminate } => registry
            .final_vote(room, id, eliminate)
            .await
            .map(ServerMessage::state),

        ClientMessage::GuessWord { guess } => registry
            .guess_word(room, id, &guess)
            .await
            .map(|outcome| ServerMessage::GuessResult {
                is_correct: outcome.is_correct,
                snapshot: Box::new(outcome.snapshot),
            }),

        ClientMessage::GetState => registry
            .game_state(room, Some(id))
            .await
            .map(ServerMessage::state),
    };

    match result {
        Ok(reply) => reply,
        Err(e) => {
            tracing::warn!(room, player = id, "Rejected action: {}", e);
            e.into()
        }
    }
}
