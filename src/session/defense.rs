use crate::error::{GameError, GameResult};
use crate::types::{GamePhase, PlayerId};
use serde::{Deserialize, Serialize};

/// The accused player's defense: one writer, one statement, one phase advance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefenseCoordinator {
    accused: PlayerId,
    text: Option<String>,
    ended: bool,
}

impl DefenseCoordinator {
    pub fn new(accused: PlayerId) -> Self {
        Self {
            accused,
            text: None,
            ended: false,
        }
    }

    pub fn accused(&self) -> &PlayerId {
        &self.accused
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    fn check_writer(&self, actor: &str) -> GameResult<()> {
        if self.ended {
            return Err(GameError::WrongPhase(GamePhase::VotingForSurvival));
        }
        if actor != self.accused {
            return Err(GameError::NotAccused);
        }
        Ok(())
    }

    pub fn check_submit(&self, actor: &str) -> GameResult<()> {
        self.check_writer(actor)?;
        if self.text.is_some() {
            return Err(GameError::DefenseAlreadySubmitted);
        }
        Ok(())
    }

    pub fn submit(&mut self, actor: &str, text: String) -> GameResult<()> {
        self.check_submit(actor)?;
        self.text = Some(text);
        Ok(())
    }

    pub fn check_end(&self, actor: &str) -> GameResult<()> {
        self.check_writer(actor)
    }

    pub fn end(&mut self, actor: &str) -> GameResult<()> {
        self.check_end(actor)?;
        self.ended = true;
        Ok(())
    }

    /// End without an actor check (timeout)
    pub fn force_end(&mut self) {
        self.ended = true;
    }
}
