//! Value types shared by folders, files and tags.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use uuid::Uuid;

use crate::validation::{self, FieldError};

/// Generate a new opaque entity id.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Who can see a folder or file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Private,
    Shared,
    Public,
}

impl Visibility {
    /// Convert visibility to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Private => "private",
            Visibility::Shared => "shared",
            Visibility::Public => "public",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "private" => Ok(Visibility::Private),
            "shared" => Ok(Visibility::Shared),
            "public" => Ok(Visibility::Public),
            _ => Err(format!("unknown visibility: {s}")),
        }
    }
}

/// A display color, stored as `color_hex` / `color_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Color {
    /// `#RRGGBB` value.
    pub hex: String,
    /// Optional human readable name ("blue", "work red", ...).
    pub name: Option<String>,
}

impl Color {
    pub fn new(hex: impl Into<String>) -> Self {
        Self {
            hex: hex.into().trim().to_string(),
            name: None,
        }
    }

    pub fn named(hex: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            hex: hex.into().trim().to_string(),
            name: validation::normalize_optional(Some(name.into())),
        }
    }

    /// Rebuild a color from its stored columns; a row without hex has no color.
    pub(crate) fn from_columns(hex: Option<String>, name: Option<String>) -> Option<Self> {
        hex.map(|hex| Self { hex, name })
    }

    pub fn validate(&self, field: &str) -> Option<FieldError> {
        validation::hex_color(field, &self.hex)
    }
}
