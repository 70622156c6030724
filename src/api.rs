//! HTTP API endpoints.
//!
//! Every inbound game operation is reachable here as well as over the
//! WebSocket. The acting player is named by `player_id` in the body.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::GameError;
use crate::registry::{GuessOutcome, RoomRegistry, RoomSummary};
use crate::session::snapshot::GameSnapshot;
use crate::store::RoomRecord;
use crate::types::*;

/// Error body shared with `ServerMessage::Error`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub code: String,
    pub msg: String,
}

impl GameError {
    pub fn status(&self) -> StatusCode {
        match self {
            GameError::RoomNotFound(_) => StatusCode::NOT_FOUND,
            GameError::NotOwner
            | GameError::NotInRoom
            | GameError::NotAccused
            | GameError::NotEligible => StatusCode::FORBIDDEN,
            GameError::WrongPhase(_)
            | GameError::NotYourTurn
            | GameError::AlreadyVoted
            | GameError::GameEnded
            | GameError::RoomFull
            | GameError::AlreadyJoined
            | GameError::DefenseAlreadySubmitted
            | GameError::InsufficientPlayers { .. } => StatusCode::CONFLICT,
            GameError::InvalidTarget(_)
            | GameError::InvalidInput(_)
            | GameError::InvalidSettings(_)
            | GameError::InsufficientContent => StatusCode::UNPROCESSABLE_ENTITY,
            GameError::RoomNumbersExhausted => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for GameError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.code().to_string(),
            msg: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, GameError>;

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    /// Generated when absent
    #[serde(default)]
    pub player_id: Option<PlayerId>,
    pub nickname: String,
    pub settings: RoomSettings,
}

#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    pub player_id: PlayerId,
    pub nickname: String,
}

#[derive(Debug, Deserialize)]
pub struct ActorRequest {
    pub player_id: PlayerId,
}

#[derive(Debug, Deserialize)]
pub struct TextRequest {
    pub player_id: PlayerId,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub player_id: PlayerId,
    pub target_id: PlayerId,
}

#[derive(Debug, Deserialize)]
pub struct FinalVoteRequest {
    pub player_id: PlayerId,
    pub eliminate: bool,
}

#[derive(Debug, Deserialize)]
pub struct GuessRequest {
    pub player_id: PlayerId,
    pub guess: String,
}

#[derive(Debug, Deserialize)]
pub struct StateQuery {
    pub player_id: Option<PlayerId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub rooms: usize,
}

/// REST routes plus `/health`; the caller supplies the registry state
pub fn router() -> Router<RoomRegistry> {
    Router::new()
        .route("/health", get(health))
        .route("/api/rooms", get(list_rooms).post(create_room))
        .route("/api/rooms/{room}/state", get(room_state))
        .route("/api/rooms/{room}/export", get(export_room))
        .route("/api/rooms/{room}/join", post(join_room))
        .route("/api/rooms/{room}/leave", post(leave_room))
        .route("/api/rooms/{room}/start", post(start_game))
        .route("/api/rooms/{room}/hint", post(give_hint))
        .route("/api/rooms/{room}/vote", post(vote))
        .route("/api/rooms/{room}/defense", post(submit_defense))
        .route("/api/rooms/{room}/defense/end", post(end_defense))
        .route("/api/rooms/{room}/final-vote", post(final_vote))
        .route("/api/rooms/{room}/guess", post(guess_word))
}

/// GET /health
pub async fn health(State(registry): State<RoomRegistry>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        rooms: registry.room_count().await,
    })
}

/// GET /api/rooms
pub async fn list_rooms(State(registry): State<RoomRegistry>) -> Json<Vec<RoomSummary>> {
    Json(registry.list_rooms().await)
}

/// POST /api/rooms
///
/// The creator becomes owner and first member. The reply is the creator's
/// own snapshot, so `your_id` carries a generated id back to the client.
pub async fn create_room(
    State(registry): State<RoomRegistry>,
    Json(req): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<GameSnapshot>), GameError> {
    let player_id = req
        .player_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| ulid::Ulid::new().to_string());
    let owner = Actor::new(player_id, req.nickname);
    let snapshot = registry.create_room(&owner, req.settings).await?;
    tracing::info!(
        room = snapshot.room_number,
        "Room '{}' created by {}",
        snapshot.room_name,
        owner.id
    );
    Ok((StatusCode::CREATED, Json(snapshot)))
}

/// GET /api/rooms/{room}/state?player_id=
///
/// Without `player_id` the snapshot is the spectator view.
pub async fn room_state(
    State(registry): State<RoomRegistry>,
    Path(room): Path<RoomNumber>,
    Query(query): Query<StateQuery>,
) -> ApiResult<GameSnapshot> {
    let snapshot = registry
        .game_state(room, query.player_id.as_deref())
        .await?;
    Ok(Json(snapshot))
}

/// GET /api/rooms/{room}/export
///
/// Full persisted record, hidden roles and the secret word included.
/// Only served in WAITING and ENDED.
pub async fn export_room(
    State(registry): State<RoomRegistry>,
    Path(room): Path<RoomNumber>,
) -> ApiResult<RoomRecord> {
    Ok(Json(registry.export(room).await?))
}

/// POST /api/rooms/{room}/join
pub async fn join_room(
    State(registry): State<RoomRegistry>,
    Path(room): Path<RoomNumber>,
    Json(req): Json<JoinRequest>,
) -> ApiResult<GameSnapshot> {
    let actor = Actor::new(req.player_id, req.nickname);
    Ok(Json(registry.join(room, &actor).await?))
}

/// POST /api/rooms/{room}/leave
pub async fn leave_room(
    State(registry): State<RoomRegistry>,
    Path(room): Path<RoomNumber>,
    Json(req): Json<ActorRequest>,
) -> Result<StatusCode, GameError> {
    registry.leave(room, &req.player_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/rooms/{room}/start
pub async fn start_game(
    State(registry): State<RoomRegistry>,
    Path(room): Path<RoomNumber>,
    Json(req): Json<ActorRequest>,
) -> ApiResult<GameSnapshot> {
    Ok(Json(registry.start(room, &req.player_id).await?))
}

/// POST /api/rooms/{room}/hint
pub async fn give_hint(
    State(registry): State<RoomRegistry>,
    Path(room): Path<RoomNumber>,
    Json(req): Json<TextRequest>,
) -> ApiResult<GameSnapshot> {
    Ok(Json(
        registry.give_hint(room, &req.player_id, &req.text).await?,
    ))
}

/// POST /api/rooms/{room}/vote
pub async fn vote(
    State(registry): State<RoomRegistry>,
    Path(room): Path<RoomNumber>,
    Json(req): Json<VoteRequest>,
) -> ApiResult<GameSnapshot> {
    Ok(Json(
        registry.vote(room, &req.player_id, &req.target_id).await?,
    ))
}

/// POST /api/rooms/{room}/defense
pub async fn submit_defense(
    State(registry): State<RoomRegistry>,
    Path(room): Path<RoomNumber>,
    Json(req): Json<TextRequest>,
) -> ApiResult<GameSnapshot> {
    Ok(Json(
        registry
            .submit_defense(room, &req.player_id, &req.text)
            .await?,
    ))
}

/// POST /api/rooms/{room}/defense/end
pub async fn end_defense(
    State(registry): State<RoomRegistry>,
    Path(room): Path<RoomNumber>,
    Json(req): Json<ActorRequest>,
) -> ApiResult<GameSnapshot> {
    Ok(Json(registry.end_defense(room, &req.player_id).await?))
}

/// POST /api/rooms/{room}/final-vote
pub async fn final_vote(
    State(registry): State<RoomRegistry>,
    Path(room): Path<RoomNumber>,
    Json(req): Json<FinalVoteRequest>,
) -> ApiResult<GameSnapshot> {
    Ok(Json(
        registry
            .final_vote(room, &req.player_id, req.eliminate)
            .await?,
    ))
}

/// POST /api/rooms/{room}/guess
pub async fn guess_word(
    State(registry): State<RoomRegistry>,
    Path(room): Path<RoomNumber>,
    Json(req): Json<GuessRequest>,
) -> ApiResult<GuessOutcome> {
    Ok(Json(
        registry
            .guess_word(room, &req.player_id, &req.guess)
            .await?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GameRules, PhaseTimers};
    use crate::content::StaticContentPool;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> Router {
        let rules = GameRules {
            timers: PhaseTimers::disabled(),
            ..GameRules::default()
        };
        let registry = RoomRegistry::in_memory(rules, Arc::new(StaticContentPool::builtin()));
        router().with_state(registry)
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn create_body(player_id: &str) -> Value {
        json!({
            "player_id": player_id,
            "nickname": "Alice",
            "settings": {
                "name": "Rest room",
                "max_participants": 6,
                "total_rounds": 2,
                "liar_count": 1
            }
        })
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(GameError::RoomNotFound(1).status(), StatusCode::NOT_FOUND);
        assert_eq!(GameError::NotOwner.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            GameError::WrongPhase(GamePhase::Speech).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(GameError::AlreadyVoted.status(), StatusCode::CONFLICT);
        assert_eq!(
            GameError::InvalidInput("empty".to_string()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[tokio::test]
    async fn test_health() {
        let app = app();
        let (status, body) = call(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["rooms"], 0);
    }

    #[tokio::test]
    async fn test_create_list_and_join() {
        let app = app();
        let (status, body) = call(&app, "POST", "/api/rooms", Some(create_body("p1"))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["room_number"], 1);
        assert_eq!(body["owner_id"], "p1");

        let (status, body) = call(
            &app,
            "POST",
            "/api/rooms/1/join",
            Some(json!({"player_id": "p2", "nickname": "Bob"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["players"].as_array().unwrap().len(), 2);

        let (status, body) = call(&app, "GET", "/api/rooms", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["players"], 2);
        assert_eq!(body[0]["name"], "Rest room");
    }

    #[tokio::test]
    async fn test_create_generates_player_id() {
        let app = app();
        let mut body = create_body("");
        body.as_object_mut().unwrap().remove("player_id");
        let (status, body) = call(&app, "POST", "/api/rooms", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["your_id"].as_str().unwrap();
        assert_eq!(id.len(), 26);
        assert_eq!(body["owner_id"], id);
    }

    #[tokio::test]
    async fn test_errors_map_to_status_and_code() {
        let app = app();
        let (status, body) = call(&app, "GET", "/api/rooms/42/state", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "ROOM_NOT_FOUND");

        call(&app, "POST", "/api/rooms", Some(create_body("p1"))).await;

        let (status, body) = call(
            &app,
            "POST",
            "/api/rooms/1/start",
            Some(json!({"player_id": "p1"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "INSUFFICIENT_PLAYERS");

        let (status, body) = call(
            &app,
            "POST",
            "/api/rooms/1/defense/end",
            Some(json!({"player_id": "p1"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "WRONG_PHASE");

        let (status, body) = call(
            &app,
            "POST",
            "/api/rooms/1/join",
            Some(json!({"player_id": "p2", "nickname": "   "})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "INVALID_INPUT");
    }

    #[tokio::test]
    async fn test_start_and_hint_over_rest() {
        let app = app();
        call(&app, "POST", "/api/rooms", Some(create_body("p1"))).await;
        for (id, name) in [("p2", "Bob"), ("p3", "Carol")] {
            call(
                &app,
                "POST",
                "/api/rooms/1/join",
                Some(json!({"player_id": id, "nickname": name})),
            )
            .await;
        }

        let (status, body) = call(
            &app,
            "POST",
            "/api/rooms/1/start",
            Some(json!({"player_id": "p1"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["phase"], "SPEECH");
        assert_eq!(body["round"], 1);

        let speaker = body["current_speaker"].as_str().unwrap().to_string();
        let (status, body) = call(
            &app,
            "POST",
            "/api/rooms/1/hint",
            Some(json!({"player_id": speaker, "text": "round and red"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["hints"][0]["text"], "round and red");

        let (status, body) = call(
            &app,
            "POST",
            "/api/rooms/1/hint",
            Some(json!({"player_id": speaker, "text": "again"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "NOT_YOUR_TURN");
    }

    #[tokio::test]
    async fn test_leave_last_member_closes_room() {
        let app = app();
        call(&app, "POST", "/api/rooms", Some(create_body("p1"))).await;

        let (status, _) = call(
            &app,
            "POST",
            "/api/rooms/1/leave",
            Some(json!({"player_id": "p1"})),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = call(&app, "GET", "/api/rooms/1/state", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_export_only_outside_a_running_game() {
        let app = app();
        call(&app, "POST", "/api/rooms", Some(create_body("p1"))).await;
        let (status, body) = call(&app, "GET", "/api/rooms/1/export", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["schema_version"], 1);
        assert_eq!(body["state"]["room_number"], 1);

        for (id, name) in [("p2", "Bob"), ("p3", "Carol"), ("p4", "Dave")] {
            call(
                &app,
                "POST",
                "/api/rooms/1/join",
                Some(json!({"player_id": id, "nickname": name})),
            )
            .await;
        }
        let (status, _) = call(
            &app,
            "POST",
            "/api/rooms/1/start",
            Some(json!({"player_id": "p1"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(&app, "GET", "/api/rooms/1/export", None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "WRONG_PHASE");
        assert!(body.get("state").is_none());
    }
}
