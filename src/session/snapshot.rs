//! Role-scoped views of a session.
//!
//! A snapshot never carries another player's role, or a word the requester
//! is not allowed to know, until the game has ended.

use super::roles::knowledge_for;
use super::SessionState;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub nickname: String,
    pub state: PlayerState,
    /// Revealed once the game has ended
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub version: u64,
    pub room_number: RoomNumber,
    pub room_name: String,
    pub owner_id: PlayerId,
    pub mode: GameMode,
    pub phase: GamePhase,
    pub round: u32,
    pub total_rounds: u32,
    pub liar_count: usize,
    pub max_participants: usize,
    pub players: Vec<PlayerView>,
    pub turn_order: Vec<PlayerId>,
    pub current_speaker: Option<PlayerId>,
    pub hints: Vec<Hint>,
    pub accused_player: Option<PlayerId>,
    pub defense_text: Option<String>,
    pub accusation_votes_cast: usize,
    pub survival_votes_cast: usize,
    pub survival_voters: usize,
    pub accusation_tally: Option<BTreeMap<PlayerId, usize>>,
    pub last_survival_result: Option<SurvivalResult>,
    pub last_guess: Option<GuessRecord>,
    pub your_id: Option<PlayerId>,
    pub your_role: Option<Role>,
    pub your_subject: Option<String>,
    pub your_word: Option<String>,
    pub has_voted: bool,
    /// Revealed to everyone once the game has ended
    pub subject: Option<String>,
    pub secret_word: Option<String>,
    pub winner: Option<Winner>,
    pub end_reason: Option<EndReason>,
    pub phase_deadline: Option<String>,
    pub server_now: String,
}

/// Project `state` for `requester`. `None` (or a non-member) gets the
/// public view only.
pub fn project(state: &SessionState, requester: Option<&str>) -> GameSnapshot {
    let ended = state.phase == GamePhase::Ended;
    let me = requester.and_then(|id| state.player(id));

    let players = state
        .players
        .iter()
        .map(|p| PlayerView {
            id: p.id.clone(),
            nickname: p.nickname.clone(),
            state: p.state,
            role: if ended { p.role } else { None },
        })
        .collect();

    let your_role = me.and_then(|p| p.role);
    let knowledge = match (your_role, &state.secret) {
        (Some(role), Some(secret)) => knowledge_for(role, state.settings.mode, secret),
        _ => Default::default(),
    };

    let has_voted = me.is_some_and(|p| match state.phase {
        GamePhase::VotingForLiar => state.accusations.has_voted(&p.id),
        GamePhase::VotingForSurvival => state.survival_votes.has_voted(&p.id),
        _ => false,
    });

    let revealed = state.secret.as_ref().filter(|_| ended);

    GameSnapshot {
        version: state.version,
        room_number: state.room_number,
        room_name: state.settings.name.clone(),
        owner_id: state.owner_id.clone(),
        mode: state.settings.mode,
        phase: state.phase,
        round: state.round,
        total_rounds: state.settings.total_rounds,
        liar_count: state.settings.liar_count,
        max_participants: state.settings.max_participants,
        players,
        turn_order: state.turns.order().to_vec(),
        current_speaker: if state.phase == GamePhase::Speech {
            state.turns.current().cloned()
        } else {
            None
        },
        hints: state.hints.clone(),
        accused_player: state.accused_id().cloned(),
        defense_text: state
            .defense
            .as_ref()
            .and_then(|d| d.text())
            .map(str::to_string),
        accusation_votes_cast: state.accusations.cast_count(),
        survival_votes_cast: state.survival_votes.cast_count(),
        survival_voters: state.survival_votes.eligible_count(),
        accusation_tally: state.accusation_tally.clone(),
        last_survival_result: state.last_survival_result.clone(),
        last_guess: state.last_guess.clone(),
        your_id: me.map(|p| p.id.clone()),
        your_role,
        your_subject: knowledge.subject,
        your_word: knowledge.word,
        has_voted,
        subject: revealed.map(|s| s.subject.clone()),
        secret_word: revealed.map(|s| s.word.clone()),
        winner: state.winner,
        end_reason: state.end_reason,
        phase_deadline: state.phase_deadline.clone(),
        server_now: chrono::Utc::now().to_rfc3339(),
    }
}
