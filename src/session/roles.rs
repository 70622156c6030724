//! Role assignment and secret selection at game start

use crate::content::{ContentPool, Subject};
use crate::error::{GameError, GameResult};
use crate::types::{GameMode, PlayerId, Role, Secret, SubjectSelection};
use rand::seq::IndexedRandom;
use rand::Rng;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAssignment {
    pub liars: BTreeSet<PlayerId>,
    pub secret: Secret,
}

impl RoleAssignment {
    pub fn role_of(&self, player_id: &str) -> Role {
        if self.liars.contains(player_id) {
            Role::Liar
        } else {
            Role::Citizen
        }
    }
}

/// What a player is allowed to know about the secret
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Knowledge {
    pub subject: Option<String>,
    pub word: Option<String>,
}

/// Subjects from the selection that have at least one word
fn eligible_subjects(selection: &SubjectSelection, pool: &dyn ContentPool) -> Vec<Subject> {
    let subjects = pool.subjects().into_iter().filter(|s| !s.words.is_empty());
    match selection {
        SubjectSelection::Random => subjects.collect(),
        SubjectSelection::Fixed(ids) => subjects.filter(|s| ids.contains(&s.id)).collect(),
    }
}

/// Check that a selection can produce a secret, without drawing one
pub fn ensure_content(selection: &SubjectSelection, pool: &dyn ContentPool) -> GameResult<()> {
    if eligible_subjects(selection, pool).is_empty() {
        return Err(GameError::InsufficientContent);
    }
    Ok(())
}

/// Pick `liar_count` distinct liars uniformly at random, then one subject
/// and one word from it.
pub fn assign<R: Rng + ?Sized>(
    players: &[PlayerId],
    liar_count: usize,
    selection: &SubjectSelection,
    pool: &dyn ContentPool,
    rng: &mut R,
) -> GameResult<RoleAssignment> {
    if liar_count == 0 || liar_count >= players.len() {
        return Err(GameError::InsufficientPlayers {
            have: players.len(),
            need: liar_count + 1,
        });
    }

    let subjects = eligible_subjects(selection, pool);
    let subject = subjects.choose(rng).ok_or(GameError::InsufficientContent)?;
    let word = subject
        .words
        .choose(rng)
        .ok_or(GameError::InsufficientContent)?;

    let liars = rand::seq::index::sample(rng, players.len(), liar_count)
        .into_iter()
        .map(|i| players[i].clone())
        .collect();

    Ok(RoleAssignment {
        liars,
        secret: Secret {
            subject_id: subject.id.clone(),
            subject: subject.name.clone(),
            word: word.clone(),
        },
    })
}

/// Project the secret for a given role under the room's mode
pub fn knowledge_for(role: Role, mode: GameMode, secret: &Secret) -> Knowledge {
    match (role, mode) {
        (Role::Citizen, _) => Knowledge {
            subject: Some(secret.subject.clone()),
            word: Some(secret.word.clone()),
        },
        (Role::Liar, GameMode::LiarsKnow) => Knowledge {
            subject: Some(secret.subject.clone()),
            word: None,
        },
        (Role::Liar, GameMode::LiarsDontKnow) => Knowledge::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::StaticContentPool;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn players(n: usize) -> Vec<PlayerId> {
        (1..=n).map(|i| format!("p{}", i)).collect()
    }

    #[test]
    fn test_assigns_exact_liar_count() {
        let pool = StaticContentPool::builtin();
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let assignment =
                assign(&players(7), 2, &SubjectSelection::Random, &pool, &mut rng).unwrap();
            assert_eq!(assignment.liars.len(), 2);
            assert!(assignment.liars.iter().all(|id| players(7).contains(id)));
        }
    }

    #[test]
    fn test_word_belongs_to_subject() {
        let pool = StaticContentPool::builtin();
        let mut rng = StdRng::seed_from_u64(7);
        let assignment =
            assign(&players(4), 1, &SubjectSelection::Random, &pool, &mut rng).unwrap();
        let subject = pool.subject(&assignment.secret.subject_id).unwrap();
        assert_eq!(subject.name, assignment.secret.subject);
        assert!(subject.words.contains(&assignment.secret.word));
    }

    #[test]
    fn test_fixed_selection_is_respected() {
        let pool = StaticContentPool::builtin();
        let selection = SubjectSelection::Fixed(vec!["jobs".to_string()]);
        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(seed);
            let assignment = assign(&players(4), 1, &selection, &pool, &mut rng).unwrap();
            assert_eq!(assignment.secret.subject_id, "jobs");
        }
    }

    #[test]
    fn test_missing_content_fails() {
        let pool = StaticContentPool::new(vec![Subject {
            id: "blank".to_string(),
            name: "Blank".to_string(),
            words: vec![],
        }]);
        let mut rng = StdRng::seed_from_u64(1);
        let result = assign(&players(4), 1, &SubjectSelection::Random, &pool, &mut rng);
        assert_eq!(result, Err(GameError::InsufficientContent));

        let selection = SubjectSelection::Fixed(vec!["nope".to_string()]);
        let builtin = StaticContentPool::builtin();
        assert_eq!(
            ensure_content(&selection, &builtin),
            Err(GameError::InsufficientContent)
        );
    }

    #[test]
    fn test_too_many_liars_fails() {
        let pool = StaticContentPool::builtin();
        let mut rng = StdRng::seed_from_u64(1);
        let result = assign(&players(3), 3, &SubjectSelection::Random, &pool, &mut rng);
        assert!(matches!(
            result,
            Err(GameError::InsufficientPlayers { .. })
        ));
    }

    #[test]
    fn test_knowledge_by_mode() {
        let secret = Secret {
            subject_id: "food".to_string(),
            subject: "Food".to_string(),
            word: "Pizza".to_string(),
        };

        let citizen = knowledge_for(Role::Citizen, GameMode::LiarsDontKnow, &secret);
        assert_eq!(citizen.word.as_deref(), Some("Pizza"));

        let knowing_liar = knowledge_for(Role::Liar, GameMode::LiarsKnow, &secret);
        assert_eq!(knowing_liar.subject.as_deref(), Some("Food"));
        assert_eq!(knowing_liar.word, None);

        let blind_liar = knowledge_for(Role::Liar, GameMode::LiarsDontKnow, &secret);
        assert_eq!(blind_liar, Knowledge::default());
    }
}
