use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;
use uuid::Uuid;

use super::MAX_NAME_LENGTH;
use crate::error::GameError;

/// The two sides of a Taboo game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    A,
    B,
}

impl Team {
    /// Get the string representation of the team
    pub fn as_str(&self) -> &'static str {
        match self {
            Team::A => "A",
            Team::B => "B",
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents a player seated in a room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    /// Unique player identifier
    pub id: String,
    /// Player's display name
    pub name: String,
    /// Team the player plays for
    pub team: Option<Team>,
    /// Whether a live connection currently backs this seat
    pub connected: bool,
    /// Timestamp when player joined
    pub joined_at: OffsetDateTime,
}

impl Player {
    /// Create a new player with a fresh id
    ///
    /// The name is expected to have gone through [`validate_player_name`].
    pub fn new(name: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            team: None,
            connected: true,
            joined_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Validate and clean a display name
///
/// # Validation Rules
///
/// - Surrounding whitespace is trimmed
/// - Must not be empty after trimming
/// - At most `MAX_NAME_LENGTH` characters
/// - No control characters
pub fn validate_player_name(raw: &str) -> Result<String, GameError> {
    let cleaned = raw.trim();

    if cleaned.is_empty() {
        return Err(GameError::Validation("Player name cannot be empty".to_string()));
    }

    if cleaned.chars().count() > MAX_NAME_LENGTH {
        return Err(GameError::Validation(format!(
            "Player name must be {} characters or less",
            MAX_NAME_LENGTH
        )));
    }

    if cleaned.chars().any(char::is_control) {
        return Err(GameError::Validation(
            "Player name cannot contain control characters".to_string(),
        ));
    }

    Ok(cleaned.to_string())
}
