//! Subjects and secret words.
//!
//! Content curation lives elsewhere; the game only reads a pool of
//! approved subjects through [`ContentPool`].

use crate::types::SubjectId;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subject {
    pub id: SubjectId,
    pub name: String,
    pub words: Vec<String>,
}

/// Read-only source of subjects
pub trait ContentPool: Send + Sync {
    fn subjects(&self) -> Vec<Subject>;

    fn subject(&self, id: &str) -> Option<Subject> {
        self.subjects().into_iter().find(|s| s.id == id)
    }
}

/// Errors while loading a content file
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("Failed to read content file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse content file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Content file contains no subject with words")]
    Empty,
}

/// Fixed in-memory pool
#[derive(Debug, Clone)]
pub struct StaticContentPool {
    subjects: Vec<Subject>,
}

impl StaticContentPool {
    pub fn new(subjects: Vec<Subject>) -> Self {
        Self { subjects }
    }

    /// Load a JSON array of subjects, dropping blank words and empty subjects
    pub fn from_json_file(path: &Path) -> Result<Self, ContentError> {
        let raw = std::fs::read_to_string(path)?;
        let subjects: Vec<Subject> = serde_json::from_str(&raw)?;

        let subjects: Vec<Subject> = subjects
            .into_iter()
            .map(|mut s| {
                s.words = s
                    .words
                    .into_iter()
                    .map(|w| w.trim().to_string())
                    .filter(|w| !w.is_empty())
                    .collect();
                s
            })
            .filter(|s| !s.words.is_empty())
            .collect();

        if subjects.is_empty() {
            return Err(ContentError::Empty);
        }

        tracing::info!(
            "Loaded {} subjects from {}",
            subjects.len(),
            path.display()
        );
        Ok(Self { subjects })
    }

    /// Small default pool so a fresh server is playable
    pub fn builtin() -> Self {
        let subject = |id: &str, name: &str, words: &[&str]| Subject {
            id: id.to_string(),
            name: name.to_string(),
            words: words.iter().map(|w| w.to_string()).collect(),
        };

        Self::new(vec![
            subject(
                "animals",
                "Animals",
                &["Elephant", "Penguin", "Giraffe", "Dolphin", "Kangaroo"],
            ),
            subject(
                "food",
                "Food",
                &["Pizza", "Sushi", "Pancake", "Burrito", "Dumpling"],
            ),
            subject(
                "places",
                "Places",
                &["Airport", "Library", "Hospital", "Beach", "Museum"],
            ),
            subject(
                "jobs",
                "Jobs",
                &["Firefighter", "Dentist", "Pilot", "Chef", "Astronaut"],
            ),
            subject(
                "sports",
                "Sports",
                &["Tennis", "Surfing", "Fencing", "Bowling", "Skiing"],
            ),
        ])
    }
}

impl ContentPool for StaticContentPool {
    fn subjects(&self) -> Vec<Subject> {
        self.subjects.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_pool_has_words() {
        let pool = StaticContentPool::builtin();
        assert!(!pool.subjects().is_empty());
        assert!(pool.subjects().iter().all(|s| !s.words.is_empty()));
        assert_eq!(pool.subject("food").unwrap().name, "Food");
        assert!(pool.subject("missing").is_none());
    }

    #[test]
    fn test_load_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"id": "fruit", "name": "Fruit", "words": ["Apple", "  ", "Mango "]}},
                {{"id": "empty", "name": "Empty", "words": []}}
            ]"#
        )
        .unwrap();

        let pool = StaticContentPool::from_json_file(file.path()).unwrap();
        let subjects = pool.subjects();
        assert_eq!(subjects.len(), 1);
        assert_eq!(subjects[0].words, vec!["Apple", "Mango"]);
    }

    #[test]
    fn test_load_rejects_empty_pool() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[]").unwrap();

        let result = StaticContentPool::from_json_file(file.path());
        assert!(matches!(result, Err(ContentError::Empty)));
    }

    #[test]
    fn test_load_rejects_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let result = StaticContentPool::from_json_file(file.path());
        assert!(matches!(result, Err(ContentError::Parse(_))));
    }
}
