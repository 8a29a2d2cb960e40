//! Playable character roster.
//!
//! Characters differ only in their stat scalars (which re-derive the player's
//! move speed and jump force) and in the id that character gates test against.
//! The roster order is the character-selector order.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CharacterStats {
    pub speed: f32,
    pub jump: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharacterShape {
    Square,
    Circle,
    Rhombus,
    Triangle,
    Isosceles,
    Rectangle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub shape: CharacterShape,
    pub color: String,
    #[serde(default)]
    pub description: String,
    pub stats: CharacterStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterRoster {
    pub characters: Vec<Character>,
}

impl CharacterRoster {
    /// Boxy, Isquio, Gordo: the selector order used in play mode.
    pub fn builtin() -> Self {
        Self {
            characters: vec![
                Character {
                    id: "boxy".to_string(),
                    name: "Boxy".to_string(),
                    shape: CharacterShape::Square,
                    color: "#8b5cf6".to_string(),
                    description: "A brave, balanced square".to_string(),
                    stats: CharacterStats {
                        speed: 5.0,
                        jump: 5.0,
                    },
                },
                Character {
                    id: "isquio".to_string(),
                    name: "Isquio".to_string(),
                    shape: CharacterShape::Isosceles,
                    color: "#a855f7".to_string(),
                    description: "A precise isosceles triangle".to_string(),
                    stats: CharacterStats {
                        speed: 6.0,
                        jump: 7.0,
                    },
                },
                Character {
                    id: "gordo".to_string(),
                    name: "Gordo".to_string(),
                    shape: CharacterShape::Circle,
                    color: "#06b6d4".to_string(),
                    description: "A sturdy, resilient circle".to_string(),
                    stats: CharacterStats {
                        speed: 3.0,
                        jump: 4.0,
                    },
                },
            ],
        }
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Character> {
        self.characters.get(index)
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.characters
            .iter()
            .position(|c| c.id.eq_ignore_ascii_case(id))
    }
}

impl Default for CharacterRoster {
    fn default() -> Self {
        Self::builtin()
    }
}

pub fn load_roster_from_path(path: &Path) -> Result<CharacterRoster, String> {
    let raw =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let roster: CharacterRoster = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse roster JSON {}: {e}", path.display()))?;
    validate_roster(&roster)?;
    Ok(roster)
}

fn validate_roster(roster: &CharacterRoster) -> Result<(), String> {
    if roster.characters.is_empty() {
        return Err("Roster validation failed: characters array is empty".to_string());
    }
    let mut ids = HashSet::new();
    for character in &roster.characters {
        if !ids.insert(character.id.to_ascii_lowercase()) {
            return Err(format!(
                "Roster validation failed: duplicate character id '{}'",
                character.id
            ));
        }
    }
    Ok(())
}
