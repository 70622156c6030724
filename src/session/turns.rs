//! Speaking order for the hint phase

use crate::types::PlayerId;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A shuffled order of alive players, fixed once drawn for the round
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnScheduler {
    order: Vec<PlayerId>,
    index: usize,
}

impl TurnScheduler {
    /// Shuffle the given alive players into a new order
    pub fn draw<R: Rng + ?Sized>(alive: &[PlayerId], rng: &mut R) -> Self {
        let mut order = alive.to_vec();
        order.sort();
        order.dedup();
        order.shuffle(rng);
        Self { order, index: 0 }
    }

    pub fn order(&self) -> &[PlayerId] {
        &self.order
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// The player whose turn it is, if the round is not complete
    pub fn current(&self) -> Option<&PlayerId> {
        self.order.get(self.index)
    }

    /// Move to the next speaker and return them
    pub fn advance(&mut self) -> Option<&PlayerId> {
        if self.index < self.order.len() {
            self.index += 1;
        }
        self.current()
    }

    pub fn is_round_complete(&self) -> bool {
        self.index >= self.order.len()
    }
}
