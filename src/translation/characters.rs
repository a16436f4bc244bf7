/*!
 * Character roster extracted from a translated subtitle.
 *
 * The roster is proposed by the analysis call, edited by the user while
 * the review is open, and serialized into the gender fix prompt once
 * confirmed.
 */

use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::errors::GenerationError;

/// Gender of a character as used by the fix pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Gender {
    Male,
    Female,
    #[default]
    Unknown,
}

impl Gender {
    /// Parse a label leniently; anything unrecognized is `Unknown`
    pub fn parse(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "male" | "nam" | "m" => Self::Male,
            "female" | "nữ" | "nu" | "f" => Self::Female,
            _ => Self::Unknown,
        }
    }

    /// Canonical label written to prompts and config
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
            Self::Unknown => "Unknown",
        }
    }
}

impl From<String> for Gender {
    fn from(label: String) -> Self {
        Self::parse(&label)
    }
}

impl From<Gender> for String {
    fn from(gender: Gender) -> Self {
        gender.as_str().to_string()
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named character
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    /// Name as it appears in the translated text
    pub name: String,

    /// Gender used when fixing pronouns
    #[serde(default)]
    pub gender: Gender,
}

impl Character {
    /// Create a new character
    pub fn new(name: impl Into<String>, gender: Gender) -> Self {
        Self {
            name: name.into(),
            gender,
        }
    }
}

/// Ordered list of characters with unique names
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CharacterRoster {
    #[serde(default)]
    characters: Vec<Character>,
}

impl CharacterRoster {
    /// Build a roster, dropping blank names and later duplicates
    pub fn from_characters(characters: impl IntoIterator<Item = Character>) -> Self {
        let mut seen = HashSet::new();
        let mut unique = Vec::new();

        for mut character in characters {
            character.name = character.name.trim().to_string();
            if character.name.is_empty() {
                warn!("Skipping character with an empty name");
                continue;
            }
            if !seen.insert(character.name.clone()) {
                warn!("Duplicate character '{}' in roster, keeping the first entry", character.name);
                continue;
            }
            unique.push(character);
        }

        Self { characters: unique }
    }

    /// Parse the analysis response, tolerating markdown code fences
    ///
    /// A JSON object without a `characters` key yields an empty roster.
    pub fn from_response(response: &str) -> Result<Self, GenerationError> {
        let json = strip_code_fence(response);
        let parsed: CharacterRoster = serde_json::from_str(json)
            .map_err(|e| GenerationError::MalformedResponse(format!("character list is not valid JSON: {}", e)))?;

        Ok(Self::from_characters(parsed.characters))
    }

    /// Characters in roster order
    pub fn characters(&self) -> &[Character] {
        &self.characters
    }

    /// Look up a character by exact name
    pub fn get(&self, name: &str) -> Option<&Character> {
        self.characters.iter().find(|c| c.name == name)
    }

    /// Number of characters
    pub fn len(&self) -> usize {
        self.characters.len()
    }

    /// Whether the roster has no characters
    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    /// Change a character's gender; returns false when the name is unknown
    pub fn set_gender(&mut self, name: &str, gender: Gender) -> bool {
        match self.characters.iter_mut().find(|c| c.name == name) {
            Some(character) => {
                character.gender = gender;
                true
            }
            None => false,
        }
    }

    /// JSON form embedded in the gender fix prompt
    pub fn to_prompt_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"characters":[]}"#.to_string())
    }
}

// @returns: Body of a ```json fenced block, or the trimmed input
fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
