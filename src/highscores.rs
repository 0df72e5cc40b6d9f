//! Local leaderboard and player names
//!
//! One entry per player holding their best score. Persisted as JSON through
//! a [`KeyValueStore`].

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::persistence::{HIGHSCORES_KEY, KeyValueStore, StoreError};

/// Entries shown by [`Leaderboard::top`]
pub const LEADERBOARD_SIZE: usize = 50;

/// Longest accepted display name
pub const MAX_NAME_LEN: usize = 15;

/// Where finished rounds are reported
pub trait ScoreService {
    /// Record `score` for `player_id`. Returns the player's 1-indexed rank,
    /// or None if nothing was recorded.
    fn submit(&mut self, player_id: &str, score: u64) -> Option<usize>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("name is empty")]
    Empty,
    #[error("name is longer than 15 characters")]
    TooLong,
    #[error("invalid character {0:?} (letters, digits and '-' only)")]
    InvalidChar(char),
}

/// Random default name, `Player-NNNNNN`
pub fn generate_player_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("Player-{}", rng.random_range(100_000..=999_999u32))
}

/// Trim and check a display name
pub fn validate_player_name(name: &str) -> Result<String, NameError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(NameError::Empty);
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(NameError::TooLong);
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-'))
    {
        return Err(NameError::InvalidChar(c));
    }
    Ok(name.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub player_id: String,
    pub name: String,
    /// Best score so far
    pub score: u64,
}

/// Best score per player, sorted descending (earlier arrival wins ties)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Leaderboard {
    entries: Vec<LeaderboardEntry>,
}

impl Leaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read from `store`; missing or corrupt data starts fresh
    pub fn load(store: &dyn KeyValueStore) -> Self {
        match store.get(HIGHSCORES_KEY) {
            Ok(Some(json)) => match serde_json::from_str::<Leaderboard>(&json) {
                Ok(mut board) => {
                    board.sort();
                    log::info!("Loaded {} leaderboard entries", board.entries.len());
                    board
                }
                Err(e) => {
                    log::warn!("Leaderboard data unreadable, starting fresh: {}", e);
                    Self::new()
                }
            },
            Ok(None) => {
                log::info!("No leaderboard found, starting fresh");
                Self::new()
            }
            Err(e) => {
                log::warn!("Leaderboard unavailable: {}", e);
                Self::new()
            }
        }
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<(), StoreError> {
        let json = serde_json::to_string(self)?;
        store.set(HIGHSCORES_KEY, &json)?;
        log::info!("Leaderboard saved ({} entries)", self.entries.len());
        Ok(())
    }

    // Stable, so ties keep arrival order
    fn sort(&mut self) {
        self.entries.sort_by(|a, b| b.score.cmp(&a.score));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn top_score(&self) -> Option<u64> {
        self.entries.first().map(|e| e.score)
    }

    /// Leading entries, at most [`LEADERBOARD_SIZE`]
    pub fn top(&self) -> &[LeaderboardEntry] {
        &self.entries[..self.entries.len().min(LEADERBOARD_SIZE)]
    }

    pub fn entry(&self, player_id: &str) -> Option<&LeaderboardEntry> {
        self.entries.iter().find(|e| e.player_id == player_id)
    }

    /// 1-indexed rank
    pub fn rank_of(&self, player_id: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.player_id == player_id)
            .map(|i| i + 1)
    }

    /// Change a player's display name. Ok(false) if the player is unknown.
    pub fn rename(&mut self, player_id: &str, name: &str) -> Result<bool, NameError> {
        let name = validate_player_name(name)?;
        match self.entries.iter_mut().find(|e| e.player_id == player_id) {
            Some(entry) => {
                entry.name = name;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn insert(&mut self, entry: LeaderboardEntry) -> usize {
        // After every entry with an equal or better score
        let pos = self
            .entries
            .iter()
            .position(|e| entry.score > e.score)
            .unwrap_or(self.entries.len());
        self.entries.insert(pos, entry);
        pos + 1
    }
}

impl ScoreService for Leaderboard {
    fn submit(&mut self, player_id: &str, score: u64) -> Option<usize> {
        if score == 0 {
            return None;
        }

        let name = match self.entries.iter().position(|e| e.player_id == player_id) {
            Some(i) if self.entries[i].score >= score => return Some(i + 1),
            Some(i) => self.entries.remove(i).name,
            None => player_id.to_string(),
        };

        let rank = self.insert(LeaderboardEntry {
            player_id: player_id.to_string(),
            name,
            score,
        });
        log::info!("{} scored {} (rank {})", player_id, score, rank);
        Some(rank)
    }
}
