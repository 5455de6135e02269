//! Migration identifiers: the `NNN-description` naming convention.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Sequence prefixes longer than this cannot fit in a `u32`.
const MAX_SEQUENCE_DIGITS: usize = 9;

/// Errors raised while parsing a migration identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierError {
    #[error("identifier is empty")]
    Empty,

    #[error("identifier {name:?} has no numeric sequence prefix")]
    MissingSequence { name: String },

    #[error("identifier {name:?} has no description after the sequence prefix")]
    MissingDescription { name: String },

    #[error("identifier {name:?} has a sequence prefix out of range")]
    SequenceOutOfRange { name: String },

    #[error("identifier {name:?} contains {found:?}; expected lowercase letters, digits, and single hyphens")]
    InvalidCharacter { name: String, found: char },
}

/// A parsed migration identifier of the form `NNN-description`.
///
/// The numeric prefix decides execution order; the kebab-case description
/// is for humans. `"010-add-orders"` sorts after `"002-seed-users"` even
/// though it compares lower lexicographically, which is why the prefix is
/// parsed rather than compared as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MigrationId {
    sequence: u32,
    name: String,
}

impl MigrationId {
    /// Parse and validate an identifier.
    ///
    /// Accepted shape: one or more ASCII digits, a hyphen, then a
    /// kebab-case description (`[a-z0-9]` runs joined by single hyphens).
    pub fn parse(name: &str) -> Result<Self, IdentifierError> {
        if name.is_empty() {
            return Err(IdentifierError::Empty);
        }
        let digits = name.chars().take_while(char::is_ascii_digit).count();
        if digits == 0 {
            return Err(IdentifierError::MissingSequence {
                name: name.to_string(),
            });
        }
        if digits > MAX_SEQUENCE_DIGITS {
            return Err(IdentifierError::SequenceOutOfRange {
                name: name.to_string(),
            });
        }
        let sequence: u32 =
            name[..digits]
                .parse()
                .map_err(|_| IdentifierError::SequenceOutOfRange {
                    name: name.to_string(),
                })?;
        let rest = &name[digits..];
        let slug = match rest.strip_prefix('-') {
            Some(slug) => slug,
            None => {
                // Either nothing follows the digits, or a non-hyphen does.
                return match rest.chars().next() {
                    None => Err(IdentifierError::MissingDescription {
                        name: name.to_string(),
                    }),
                    Some(found) => Err(IdentifierError::InvalidCharacter {
                        name: name.to_string(),
                        found,
                    }),
                };
            }
        };
        if slug.is_empty() {
            return Err(IdentifierError::MissingDescription {
                name: name.to_string(),
            });
        }
        let mut at_boundary = true;
        for c in slug.chars() {
            match c {
                'a'..='z' | '0'..='9' => at_boundary = false,
                '-' if !at_boundary => at_boundary = true,
                _ => {
                    return Err(IdentifierError::InvalidCharacter {
                        name: name.to_string(),
                        found: c,
                    })
                }
            }
        }
        if at_boundary {
            // Slug ended on a hyphen (or started with one).
            return Err(IdentifierError::InvalidCharacter {
                name: name.to_string(),
                found: '-',
            });
        }
        Ok(Self {
            sequence,
            name: name.to_string(),
        })
    }

    /// Build an identifier from parts using the canonical zero-padded form.
    pub fn new(sequence: u32, description: &str) -> Result<Self, IdentifierError> {
        Self::parse(&format!("{sequence:03}-{description}"))
    }

    /// The numeric sequence prefix.
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// The full identifier text, e.g. `001-initial-schema`.
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// The description part after the sequence prefix.
    pub fn description(&self) -> &str {
        match self.name.split_once('-') {
            Some((_, slug)) => slug,
            None => "",
        }
    }
}

impl Ord for MigrationId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sequence
            .cmp(&other.sequence)
            .then_with(|| self.name.cmp(&other.name))
    }
}

impl PartialOrd for MigrationId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for MigrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl FromStr for MigrationId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for MigrationId {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<MigrationId> for String {
    fn from(id: MigrationId) -> Self {
        id.name
    }
}
