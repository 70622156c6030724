//! Per-room game state machine.
//!
//! `GameSession` is the only writer of a room's `SessionState`. Every public
//! operation validates all of its preconditions before the first write, so
//! an `Err` leaves the state (and its `version`) untouched.

pub mod defense;
pub mod guess;
pub mod outcome;
pub mod roles;
pub mod snapshot;
pub mod tally;
pub mod turns;

use crate::config::GameRules;
use crate::content::ContentPool;
use crate::error::{GameError, GameResult};
use crate::types::*;
use defense::DefenseCoordinator;
use outcome::{AliveCounts, RoundEvent, RoundLimit, Verdict};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use snapshot::GameSnapshot;
use std::collections::BTreeMap;
use std::time::Duration;
use tally::{AccusationOutcome, Plurality, StrictMajority, VoteTally};
use turns::TurnScheduler;

/// Identifies one phase instance. A timer armed for a token only acts if
/// the session still carries the same token when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseToken {
    pub round: u32,
    pub phase: GamePhase,
    pub seq: u64,
}

/// Authoritative state of one room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub room_number: RoomNumber,
    pub settings: RoomSettings,
    pub owner_id: PlayerId,
    /// Members in join order
    pub players: Vec<Player>,
    pub phase: GamePhase,
    pub round: u32,
    pub turns: TurnScheduler,
    pub hints: Vec<Hint>,
    pub accusations: VoteTally<PlayerId>,
    /// Votes per target, published once the accusation resolves
    pub accusation_tally: Option<BTreeMap<PlayerId, usize>>,
    pub defense: Option<DefenseCoordinator>,
    pub survival_votes: VoteTally<bool>,
    pub last_survival_result: Option<SurvivalResult>,
    pub last_guess: Option<GuessRecord>,
    pub secret: Option<Secret>,
    pub winner: Option<Winner>,
    pub end_reason: Option<EndReason>,
    /// Bumped once per accepted mutation
    pub version: u64,
    /// Bumped on every phase entry and speaker advance
    pub seq: u64,
    pub phase_deadline: Option<String>,
    pub created_at: String,
}

impl SessionState {
    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    /// Alive player ids in join order
    pub fn alive_ids(&self) -> Vec<PlayerId> {
        self.players
            .iter()
            .filter(|p| p.is_alive())
            .map(|p| p.id.clone())
            .collect()
    }

    pub fn accused_id(&self) -> Option<&PlayerId> {
        self.defense.as_ref().map(|d| d.accused())
    }

    pub fn alive_counts(&self) -> AliveCounts {
        let alive = self.players.iter().filter(|p| p.is_alive());
        let liars = alive.clone().filter(|p| p.is_liar()).count();
        AliveCounts {
            citizens: alive.count() - liars,
            liars,
        }
    }

    pub fn token(&self) -> PhaseToken {
        PhaseToken {
            round: self.round,
            phase: self.phase,
            seq: self.seq,
        }
    }
}

/// Legal phase edges. Everything else is a bug in the session.
fn is_valid_transition(from: GamePhase, to: GamePhase) -> bool {
    use GamePhase::*;

    matches!(
        (from, to),
        (Waiting, Speech)
            | (Speech, VotingForLiar)
            // Tie under the revote policy
            | (VotingForLiar, VotingForLiar)
            | (VotingForLiar, Defending)
            | (Defending, VotingForSurvival)
            | (VotingForSurvival, GuessingWord)
            | (VotingForSurvival, Speech)
            | (VotingForSurvival, Ended)
            | (GuessingWord, Ended)
    )
}

/// Trim and length-check free text from a player
fn clean_text(raw: &str, max_chars: usize, field: &str) -> GameResult<String> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(GameError::InvalidInput(format!("{} must not be empty", field)));
    }
    if text.chars().count() > max_chars {
        return Err(GameError::InvalidInput(format!(
            "{} must be at most {} characters",
            field, max_chars
        )));
    }
    Ok(text.to_string())
}

fn validate_actor(actor: &Actor, rules: &GameRules) -> GameResult<Actor> {
    if actor.id.trim().is_empty() {
        return Err(GameError::InvalidInput("player id must not be empty".to_string()));
    }
    let nickname = clean_text(&actor.nickname, rules.max_nickname_chars, "nickname")?;
    Ok(Actor::new(actor.id.clone(), nickname))
}

fn validate_settings(
    settings: RoomSettings,
    rules: &GameRules,
    pool: &dyn ContentPool,
) -> GameResult<RoomSettings> {
    let invalid =
        |msg: String| -> GameResult<RoomSettings> { Err(GameError::InvalidSettings(msg)) };

    let name = settings.name.trim().to_string();
    if name.is_empty() || name.chars().count() > rules.max_room_name_chars {
        return invalid(format!(
            "room name must be 1 to {} characters",
            rules.max_room_name_chars
        ));
    }
    if settings.max_participants < rules.min_players
        || settings.max_participants > rules.max_participants
    {
        return invalid(format!(
            "max participants must be between {} and {}",
            rules.min_players, rules.max_participants
        ));
    }
    if settings.total_rounds == 0 || settings.total_rounds > rules.max_total_rounds {
        return invalid(format!(
            "total rounds must be between 1 and {}",
            rules.max_total_rounds
        ));
    }
    if settings.liar_count == 0 || settings.liar_count * 2 >= settings.max_participants {
        return invalid("liars must be at least one and fewer than half the room".to_string());
    }
    roles::ensure_content(&settings.subject_selection, pool)?;

    Ok(RoomSettings { name, ..settings })
}

pub struct GameSession {
    state: SessionState,
    rules: GameRules,
    rng: StdRng,
}

impl GameSession {
    /// Open a room with the owner as its first member
    pub fn create(
        room_number: RoomNumber,
        owner: &Actor,
        settings: RoomSettings,
        rules: GameRules,
        pool: &dyn ContentPool,
    ) -> GameResult<Self> {
        Self::create_with_rng(
            room_number,
            owner,
            settings,
            rules,
            pool,
            StdRng::from_os_rng(),
        )
    }

    /// Like `create`, with a caller-supplied rng for reproducible games
    pub fn create_with_rng(
        room_number: RoomNumber,
        owner: &Actor,
        settings: RoomSettings,
        rules: GameRules,
        pool: &dyn ContentPool,
        rng: StdRng,
    ) -> GameResult<Self> {
        let settings = validate_settings(settings, &rules, pool)?;
        let owner = validate_actor(owner, &rules)?;

        let state = SessionState {
            room_number,
            settings,
            owner_id: owner.id.clone(),
            players: vec![Player::new(&owner)],
            phase: GamePhase::Waiting,
            round: 0,
            turns: TurnScheduler::default(),
            hints: Vec::new(),
            accusations: VoteTally::default(),
            accusation_tally: None,
            defense: None,
            survival_votes: VoteTally::default(),
            last_survival_result: None,
            last_guess: None,
            secret: None,
            winner: None,
            end_reason: None,
            version: 1,
            seq: 0,
            phase_deadline: None,
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        tracing::info!(
            room = room_number,
            owner = %state.owner_id,
            "Room created: {}",
            state.settings.name
        );

        Ok(Self { state, rules, rng })
    }

    /// Resume a persisted room
    pub fn restore(state: SessionState, rules: GameRules) -> Self {
        Self {
            state,
            rules,
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.state.players.is_empty()
    }

    pub fn snapshot_for(&self, requester: Option<&str>) -> GameSnapshot {
        snapshot::project(&self.state, requester)
    }

    /// Token and duration for the timer the current phase instance needs
    pub fn pending_timeout(&self) -> Option<(PhaseToken, Duration)> {
        self.rules
            .timers
            .for_phase(self.state.phase)
            .map(|after| (self.state.token(), after))
    }

    // ---- guards ----

    fn expect_phase(&self, phase: GamePhase) -> GameResult<()> {
        match self.state.phase {
            GamePhase::Ended => Err(GameError::GameEnded),
            current if current == phase => Ok(()),
            current => Err(GameError::WrongPhase(current)),
        }
    }

    fn expect_member(&self, actor_id: &str) -> GameResult<&Player> {
        self.state.player(actor_id).ok_or(GameError::NotInRoom)
    }

    fn defense_mut(&mut self) -> GameResult<&mut DefenseCoordinator> {
        let phase = self.state.phase;
        self.state
            .defense
            .as_mut()
            .ok_or(GameError::WrongPhase(phase))
    }

    fn player_mut(&mut self, id: &str) -> Option<&mut Player> {
        self.state.players.iter_mut().find(|p| p.id == id)
    }

    fn limit(&self) -> RoundLimit {
        RoundLimit {
            round: self.state.round,
            total_rounds: self.state.settings.total_rounds,
        }
    }

    // ---- transitions ----

    fn commit(&mut self) {
        self.state.version += 1;
    }

    fn enter(&mut self, phase: GamePhase) {
        debug_assert!(
            is_valid_transition(self.state.phase, phase),
            "invalid phase transition {:?} -> {:?}",
            self.state.phase,
            phase
        );
        tracing::debug!(
            room = self.state.room_number,
            round = self.state.round,
            "Phase {:?} -> {:?}",
            self.state.phase,
            phase
        );
        self.state.phase = phase;
        self.rearm();
    }

    /// Start a new timer instance for the current phase
    fn rearm(&mut self) {
        self.state.seq += 1;
        self.state.phase_deadline = self
            .rules
            .timers
            .for_phase(self.state.phase)
            .and_then(|after| chrono::Duration::from_std(after).ok())
            .map(|after| (chrono::Utc::now() + after).to_rfc3339());
    }

    fn begin_round(&mut self) {
        self.state.defense = None;
        self.state.accusations = VoteTally::default();
        self.state.accusation_tally = None;
        self.state.survival_votes = VoteTally::default();
        // Spared players rejoin the pool; the verdict stays in last_survival_result
        for player in &mut self.state.players {
            if player.state == PlayerState::Survived {
                player.state = PlayerState::Alive;
            }
        }

        let alive = self.state.alive_ids();
        self.state.turns = TurnScheduler::draw(&alive, &mut self.rng);

        tracing::info!(
            room = self.state.room_number,
            round = self.state.round,
            "Round started with {} players",
            alive.len()
        );
        self.enter(GamePhase::Speech);
    }

    fn record_hint(&mut self, player_id: PlayerId, text: String, skipped: bool) {
        self.state.hints.push(Hint {
            round: self.state.round,
            player_id,
            text,
            skipped,
        });

        if self.state.turns.advance().is_some() {
            self.rearm();
        } else {
            self.open_accusation_vote();
        }
    }

    fn open_accusation_vote(&mut self) {
        self.state.accusations = VoteTally::new(self.state.alive_ids());
        self.state.accusation_tally = None;
        self.enter(GamePhase::VotingForLiar);
    }

    fn resolve_accusation(&mut self, tie_break: TieBreak) {
        let alive = self.state.alive_ids();
        let rule = Plurality {
            tie_break,
            fallback: &alive,
        };
        let outcome = self.state.accusations.resolve(&rule, &mut self.rng);
        let counts = self.state.accusations.counts();

        match outcome {
            AccusationOutcome::Accused { target, tied } => {
                tracing::info!(
                    room = self.state.room_number,
                    round = self.state.round,
                    tied,
                    "Player {} accused",
                    target
                );
                if let Some(player) = self.player_mut(&target) {
                    player.state = PlayerState::Accused;
                }
                self.state.accusation_tally = Some(counts);
                self.state.defense = Some(DefenseCoordinator::new(target));
                self.enter(GamePhase::Defending);
            }
            AccusationOutcome::Revote { tied } => {
                tracing::info!(
                    room = self.state.room_number,
                    round = self.state.round,
                    "Accusation tied between {:?}, voting again",
                    tied
                );
                self.state.accusation_tally = Some(counts);
                self.state.accusations = VoteTally::new(alive);
                self.enter(GamePhase::VotingForLiar);
            }
            AccusationOutcome::Nobody => {
                tracing::warn!(
                    room = self.state.room_number,
                    "Accusation vote has no alive candidates"
                );
            }
        }
    }

    fn open_survival_vote(&mut self) {
        let accused = self.state.accused_id().cloned();
        let eligible = self
            .state
            .alive_ids()
            .into_iter()
            .filter(|id| Some(id) != accused.as_ref());
        self.state.survival_votes = VoteTally::new(eligible);
        self.enter(GamePhase::VotingForSurvival);
    }

    fn resolve_survival(&mut self) {
        let Some(accused) = self.state.accused_id().cloned() else {
            tracing::warn!(
                room = self.state.room_number,
                "Survival vote without an accused player"
            );
            return;
        };

        let result = self
            .state
            .survival_votes
            .resolve(&StrictMajority, &mut self.rng);
        self.state.last_survival_result = Some(SurvivalResult {
            accused_id: accused.clone(),
            eliminate_votes: result.yes,
            // Missing votes count as spare
            spare_votes: result.eligible - result.yes,
            eligible_voters: result.eligible,
            eliminated: result.passed,
        });

        let event = match self.player_mut(&accused) {
            Some(player) if result.passed => {
                player.state = PlayerState::Eliminated;
                RoundEvent::Eliminated(player.role.unwrap_or(Role::Citizen))
            }
            Some(player) => {
                player.state = PlayerState::Survived;
                RoundEvent::Spared
            }
            None => RoundEvent::Spared,
        };

        tracing::info!(
            room = self.state.room_number,
            round = self.state.round,
            eliminate = result.yes,
            eligible = result.eligible,
            "Survival vote on {}: {:?}",
            accused,
            event
        );

        let verdict = outcome::evaluate(
            event,
            self.state.alive_counts(),
            self.limit(),
            self.rules.liar_win_threshold,
        );
        self.apply_verdict(verdict);
    }

    fn apply_verdict(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::NextRound => {
                self.state.round += 1;
                self.begin_round();
            }
            Verdict::LiarGuess => self.enter(GamePhase::GuessingWord),
            Verdict::Ended(reason) => self.finish(reason),
        }
    }

    fn finish(&mut self, reason: EndReason) {
        let winner = reason.winner();
        self.state.winner = Some(winner);
        self.state.end_reason = Some(reason);
        self.state.defense = None;
        self.enter(GamePhase::Ended);

        tracing::info!(
            room = self.state.room_number,
            round = self.state.round,
            "Game ended: {:?} ({:?})",
            winner,
            reason
        );
    }

    // ---- room membership ----

    pub fn join(&mut self, actor: &Actor) -> GameResult<()> {
        self.expect_phase(GamePhase::Waiting)?;
        let actor = validate_actor(actor, &self.rules)?;
        if self.state.player(&actor.id).is_some() {
            return Err(GameError::AlreadyJoined);
        }
        if self.state.players.len() >= self.state.settings.max_participants {
            return Err(GameError::RoomFull);
        }

        self.state.players.push(Player::new(&actor));
        self.commit();
        tracing::info!(
            room = self.state.room_number,
            "{} joined ({}/{})",
            actor.id,
            self.state.players.len(),
            self.state.settings.max_participants
        );
        Ok(())
    }

    pub fn leave(&mut self, actor_id: &str) -> GameResult<()> {
        match self.state.phase {
            GamePhase::Waiting | GamePhase::Ended => {}
            current => return Err(GameError::WrongPhase(current)),
        }
        let index = self
            .state
            .players
            .iter()
            .position(|p| p.id == actor_id)
            .ok_or(GameError::NotInRoom)?;

        self.state.players.remove(index);
        if self.state.owner_id == actor_id {
            if let Some(next) = self.state.players.first() {
                self.state.owner_id = next.id.clone();
                tracing::info!(
                    room = self.state.room_number,
                    "Ownership passed to {}",
                    next.id
                );
            }
        }
        self.commit();
        tracing::info!(room = self.state.room_number, "{} left", actor_id);
        Ok(())
    }

    // ---- game actions ----

    /// Assign roles and the secret, then open the first hint round
    pub fn start(&mut self, actor_id: &str, pool: &dyn ContentPool) -> GameResult<()> {
        self.expect_phase(GamePhase::Waiting)?;
        self.expect_member(actor_id)?;
        if self.state.owner_id != actor_id {
            return Err(GameError::NotOwner);
        }

        let have = self.state.players.len();
        let need = self
            .rules
            .min_players
            .max(self.state.settings.liar_count * 2 + 1);
        if have < need {
            return Err(GameError::InsufficientPlayers { have, need });
        }

        let ids: Vec<PlayerId> = self.state.players.iter().map(|p| p.id.clone()).collect();
        let assignment = roles::assign(
            &ids,
            self.state.settings.liar_count,
            &self.state.settings.subject_selection,
            pool,
            &mut self.rng,
        )?;

        for player in &mut self.state.players {
            player.role = Some(assignment.role_of(&player.id));
            player.state = PlayerState::Alive;
        }
        tracing::info!(
            room = self.state.room_number,
            "Game started: {} players, {} liar(s), subject {}",
            have,
            assignment.liars.len(),
            assignment.secret.subject_id
        );
        self.state.secret = Some(assignment.secret);
        self.state.round = 1;
        self.state.hints.clear();
        self.state.last_survival_result = None;
        self.state.last_guess = None;

        self.begin_round();
        self.commit();
        Ok(())
    }

    pub fn give_hint(&mut self, actor_id: &str, text: &str) -> GameResult<()> {
        self.expect_phase(GamePhase::Speech)?;
        self.expect_member(actor_id)?;
        if self.state.turns.current().map(String::as_str) != Some(actor_id) {
            return Err(GameError::NotYourTurn);
        }
        let text = clean_text(text, self.rules.max_hint_chars, "hint")?;

        tracing::debug!(room = self.state.room_number, "Hint from {}", actor_id);
        self.record_hint(actor_id.to_string(), text, false);
        self.commit();
        Ok(())
    }

    pub fn vote(&mut self, actor_id: &str, target_id: &str) -> GameResult<()> {
        self.expect_phase(GamePhase::VotingForLiar)?;
        self.expect_member(actor_id)?;
        self.state.accusations.check_voter(actor_id)?;
        if target_id == actor_id {
            return Err(GameError::InvalidTarget("cannot vote for yourself".to_string()));
        }
        match self.state.player(target_id) {
            Some(target) if target.is_alive() => {}
            Some(_) => {
                return Err(GameError::InvalidTarget(format!(
                    "{} is eliminated",
                    target_id
                )))
            }
            None => {
                return Err(GameError::InvalidTarget(format!(
                    "{} is not in this room",
                    target_id
                )))
            }
        }

        self.state
            .accusations
            .cast(actor_id, target_id.to_string())?;
        tracing::debug!(
            room = self.state.room_number,
            "Accusation vote {}/{}",
            self.state.accusations.cast_count(),
            self.state.accusations.eligible_count()
        );

        if self.state.accusations.is_complete() {
            self.resolve_accusation(self.rules.tie_break);
        }
        self.commit();
        Ok(())
    }

    /// Record the accused player's statement; the phase stays open
    pub fn submit_defense(&mut self, actor_id: &str, text: &str) -> GameResult<()> {
        self.expect_phase(GamePhase::Defending)?;
        self.expect_member(actor_id)?;
        self.defense_mut()?.check_submit(actor_id)?;
        let text = clean_text(text, self.rules.max_defense_chars, "defense")?;

        self.defense_mut()?.submit(actor_id, text)?;
        self.commit();
        Ok(())
    }

    pub fn end_defense(&mut self, actor_id: &str) -> GameResult<()> {
        self.expect_phase(GamePhase::Defending)?;
        self.expect_member(actor_id)?;
        self.defense_mut()?.end(actor_id)?;

        self.open_survival_vote();
        self.commit();
        Ok(())
    }

    /// `eliminate = true` votes to eliminate the accused
    pub fn final_vote(&mut self, actor_id: &str, eliminate: bool) -> GameResult<()> {
        self.expect_phase(GamePhase::VotingForSurvival)?;
        self.expect_member(actor_id)?;
        self.state.survival_votes.cast(actor_id, eliminate)?;
        tracing::debug!(
            room = self.state.room_number,
            "Survival vote {}/{}",
            self.state.survival_votes.cast_count(),
            self.state.survival_votes.eligible_count()
        );

        if self.state.survival_votes.is_complete() {
            self.resolve_survival();
        }
        self.commit();
        Ok(())
    }

    /// The eliminated liar's one guess. Returns whether it was correct.
    pub fn guess_word(&mut self, actor_id: &str, guess: &str) -> GameResult<bool> {
        self.expect_phase(GamePhase::GuessingWord)?;
        self.expect_member(actor_id)?;
        if self.state.accused_id().map(String::as_str) != Some(actor_id) {
            return Err(GameError::NotEligible);
        }
        let attempt = clean_text(guess, self.rules.max_guess_chars, "guess")?;

        let correct = self
            .state
            .secret
            .as_ref()
            .is_some_and(|secret| guess::is_correct(&attempt, &secret.word));
        self.state.last_guess = Some(GuessRecord {
            player_id: actor_id.to_string(),
            guess: Some(attempt),
            correct,
        });

        let verdict = outcome::evaluate(
            RoundEvent::Guessed { correct },
            self.state.alive_counts(),
            self.limit(),
            self.rules.liar_win_threshold,
        );
        self.apply_verdict(verdict);
        self.commit();
        Ok(correct)
    }

    /// Apply the timeout policy of the phase instance `token` was armed for.
    /// Returns false, without touching state, when the token is stale.
    pub fn on_timeout(&mut self, token: PhaseToken) -> bool {
        if token != self.state.token() {
            tracing::debug!(
                room = self.state.room_number,
                "Ignoring stale timer {:?} (current {:?})",
                token,
                self.state.token()
            );
            return false;
        }

        match self.state.phase {
            GamePhase::Speech => match self.state.turns.current().cloned() {
                Some(speaker) => {
                    tracing::info!(
                        room = self.state.room_number,
                        "{} ran out of time, turn skipped",
                        speaker
                    );
                    self.record_hint(speaker, String::new(), true);
                }
                None => self.open_accusation_vote(),
            },
            // Revoting on a timeout could loop forever
            GamePhase::VotingForLiar => self.resolve_accusation(TieBreak::Random),
            GamePhase::Defending => {
                if let Some(defense) = self.state.defense.as_mut() {
                    defense.force_end();
                }
                self.open_survival_vote();
            }
            GamePhase::VotingForSurvival => self.resolve_survival(),
            GamePhase::GuessingWord => {
                if let Some(accused) = self.state.accused_id().cloned() {
                    self.state.last_guess = Some(GuessRecord {
                        player_id: accused,
                        guess: None,
                        correct: false,
                    });
                }
                let verdict = outcome::evaluate(
                    RoundEvent::Guessed { correct: false },
                    self.state.alive_counts(),
                    self.limit(),
                    self.rules.liar_win_threshold,
                );
                self.apply_verdict(verdict);
            }
            GamePhase::Waiting | GamePhase::Ended => return false,
        }

        tracing::info!(
            room = self.state.room_number,
            "{:?} timed out, now {:?}",
            token.phase,
            self.state.phase
        );
        self.commit();
        true
    }
}
