//! Tagged identifiers for boards and tasks.
//!
//! # Responsibility
//! - Distinguish client-generated placeholder ids from store-assigned ids.
//! - Provide one stable string form for wire/serde round-trips.
//!
//! # Invariants
//! - Temporary ids always carry the `temp-` prefix.
//! - Durable ids never carry the `temp-` prefix.
//! - Only bulk save resolves `Temporary` into `Durable`; local copies
//!   follow through `resolve_from` with the save's assignment map.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Prefix used by every client-generated placeholder id.
pub const TEMP_ID_PREFIX: &str = "temp-";

/// Identifier of a board or task.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityId {
    /// Client-generated placeholder assigned before the first save.
    Temporary(String),
    /// Store-assigned identifier.
    Durable(String),
}

/// Error returned when an id string cannot be interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityIdError {
    Blank,
    /// `temp-` with nothing after it.
    EmptyTemporary,
}

impl Display for EntityIdError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blank => write!(f, "entity id must not be blank"),
            Self::EmptyTemporary => write!(f, "temporary id has no suffix"),
        }
    }
}

impl Error for EntityIdError {}

impl EntityId {
    /// Generates a new temporary id (`temp-<uuid>`).
    pub fn temporary() -> Self {
        Self::Temporary(format!("{TEMP_ID_PREFIX}{}", Uuid::new_v4()))
    }

    /// Wraps a store-assigned id.
    ///
    /// Strings carrying the temporary prefix are still classified as
    /// temporary so a misbehaving store cannot launder placeholder ids.
    pub fn durable(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.starts_with(TEMP_ID_PREFIX) {
            return Self::Temporary(value);
        }
        Self::Durable(value)
    }

    /// Parses the string form produced by [`EntityId::as_str`].
    pub fn parse(value: &str) -> Result<Self, EntityIdError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(EntityIdError::Blank);
        }
        if let Some(suffix) = trimmed.strip_prefix(TEMP_ID_PREFIX) {
            if suffix.is_empty() {
                return Err(EntityIdError::EmptyTemporary);
            }
            return Ok(Self::Temporary(trimmed.to_string()));
        }
        Ok(Self::Durable(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Temporary(value) | Self::Durable(value) => value,
        }
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, Self::Temporary(_))
    }

    /// Replaces a temporary id with the durable id a save assigned to it.
    ///
    /// Returns `true` when the id changed.
    pub fn resolve_from(&mut self, assigned: &BTreeMap<String, String>) -> bool {
        if !self.is_temporary() {
            return false;
        }
        match assigned.get(self.as_str()) {
            Some(durable) => {
                *self = Self::durable(durable.clone());
                !self.is_temporary()
            }
            None => false,
        }
    }

    /// Returns the store id when this id is durable.
    pub fn as_durable(&self) -> Option<&str> {
        match self {
            Self::Durable(value) => Some(value),
            Self::Temporary(_) => None,
        }
    }
}

impl Display for EntityId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
