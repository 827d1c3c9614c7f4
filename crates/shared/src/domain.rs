use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::NameError;

/// Separator used when scope segments are joined into a path string.
pub const PATH_SEPARATOR: char = '/';

/// Runtime type tag attached to every remote variable or argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeTag {
    Boolean,
    #[serde(alias = "number", alias = "int")]
    Integer,
    #[serde(alias = "double")]
    Float,
    String,
    #[serde(rename = "list", alias = "choice", alias = "loglvl")]
    Choice,
    Range,
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeTag::Boolean => "boolean",
            TypeTag::Integer => "integer",
            TypeTag::Float => "float",
            TypeTag::String => "string",
            TypeTag::Choice => "choice",
            TypeTag::Range => "range",
        };
        f.pad(name)
    }
}

/// Rejects names that cannot be used as a scope segment.
pub fn validate_name(name: &str) -> Result<(), NameError> {
    if name.is_empty() {
        return Err(NameError::Empty);
    }
    if name.contains(PATH_SEPARATOR) {
        return Err(NameError::ContainsSeparator(name.to_string()));
    }
    Ok(())
}

/// Position in the remote module/command tree, e.g. `rf/tx`.
///
/// The empty path is the root. Segments never contain [`PATH_SEPARATOR`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ScopePath {
    segments: Vec<String>,
}

impl ScopePath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn child(&self, segment: &str) -> Result<Self, NameError> {
        validate_name(segment)?;
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Ok(Self { segments })
    }

    /// Parses a `/`-joined path. Leading, trailing and doubled separators are ignored.
    pub fn parse(raw: &str) -> Self {
        Self {
            segments: raw
                .split(PATH_SEPARATOR)
                .map(str::trim)
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

impl fmt::Display for ScopePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, segment) in self.segments.iter().enumerate() {
            if idx > 0 {
                write!(f, "{PATH_SEPARATOR}")?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}
