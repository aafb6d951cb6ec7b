//! Scripted phrase list
//!
//! Phrases come from a plain text file, one per line. Blank lines are
//! skipped. `next_phrase` walks the list in order and wraps around.

use std::path::Path;

use tracing::info;

/// Errors loading the phrase file
#[derive(Debug, thiserror::Error)]
pub enum PhraseError {
    #[error("failed to read phrase file: {0}")]
    Read(#[from] std::io::Error),

    #[error("phrase file contains no phrases")]
    Empty,
}

/// Cycles through the scripted phrases
#[derive(Debug, Clone, Default)]
pub struct PhraseManager {
    phrases: Vec<String>,
    next: usize,
}

impl PhraseManager {
    pub fn from_phrases(phrases: Vec<String>) -> Self {
        Self { phrases, next: 0 }
    }

    /// Replace the list with the contents of `path`
    pub fn load(&mut self, path: &Path) -> Result<usize, PhraseError> {
        let content = std::fs::read_to_string(path)?;
        let phrases: Vec<String> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        if phrases.is_empty() {
            return Err(PhraseError::Empty);
        }

        info!(count = phrases.len(), ?path, "phrases loaded");
        self.phrases = phrases;
        self.next = 0;
        Ok(self.phrases.len())
    }

    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    /// Next phrase in order; empty when nothing is loaded
    pub fn next_phrase(&mut self) -> String {
        if self.phrases.is_empty() {
            return String::new();
        }
        let phrase = self.phrases[self.next].clone();
        self.next = (self.next + 1) % self.phrases.len();
        phrase
    }
}
