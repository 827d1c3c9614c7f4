//! Typed remote variables and command arguments.
//!
//! A [`TypedValue`] always holds a value that is valid for its [`TypeTag`]:
//! construction rejects malformed descriptions and every edit goes through
//! [`TypedValue::validate`] first.

use std::fmt;

use shared::{
    domain::{validate_name, TypeTag},
    protocol::{VariableDescription, WireValue},
};

use crate::error::{DescriptionError, ValidationError};

/// Optional inclusive bounds on a numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds<T> {
    pub min: Option<T>,
    pub max: Option<T>,
}

impl<T: PartialOrd + Copy + fmt::Display> Bounds<T> {
    pub fn contains(&self, value: T) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }

    fn clamp(&self, value: T) -> T {
        match (self.min, self.max) {
            (Some(min), _) if value < min => min,
            (_, Some(max)) if value > max => max,
            _ => value,
        }
    }

    fn describe(&self, type_name: &str) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("{type_name} in {min}..={max}"),
            (Some(min), None) => format!("{type_name} >= {min}"),
            (None, Some(max)) => format!("{type_name} <= {max}"),
            (None, None) => type_name.to_string(),
        }
    }
}

/// Value plus the constraints implied by its type tag.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedKind {
    Boolean(bool),
    Integer { value: i64, bounds: Bounds<i64> },
    Float { value: f64, bounds: Bounds<f64> },
    Text(String),
    Choice { selected: usize, choices: Vec<String> },
    Range { value: i64, min: i64, max: i64 },
}

impl TypedKind {
    pub fn type_tag(&self) -> TypeTag {
        match self {
            TypedKind::Boolean(_) => TypeTag::Boolean,
            TypedKind::Integer { .. } => TypeTag::Integer,
            TypedKind::Float { .. } => TypeTag::Float,
            TypedKind::Text(_) => TypeTag::String,
            TypedKind::Choice { .. } => TypeTag::Choice,
            TypedKind::Range { .. } => TypeTag::Range,
        }
    }

    fn expectation(&self) -> String {
        match self {
            TypedKind::Boolean(_) => "boolean (true/false)".to_string(),
            TypedKind::Integer { bounds, .. } => bounds.describe("integer"),
            TypedKind::Float { bounds, .. } => bounds.describe("float"),
            TypedKind::Text(_) => "string".to_string(),
            TypedKind::Choice { choices, .. } => format!("one of [{}]", choices.join(", ")),
            TypedKind::Range { min, max, .. } => format!("integer in {min}..={max}"),
        }
    }

    /// Same constraints, new value. `None` if `raw` does not satisfy them.
    fn with_value(&self, raw: &str) -> Option<TypedKind> {
        let trimmed = raw.trim();
        match self {
            TypedKind::Boolean(_) => parse_bool(trimmed).map(TypedKind::Boolean),
            TypedKind::Integer { bounds, .. } => trimmed
                .parse::<i64>()
                .ok()
                .filter(|value| bounds.contains(*value))
                .map(|value| TypedKind::Integer {
                    value,
                    bounds: *bounds,
                }),
            TypedKind::Float { bounds, .. } => trimmed
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite() && bounds.contains(*value))
                .map(|value| TypedKind::Float {
                    value,
                    bounds: *bounds,
                }),
            TypedKind::Text(_) => Some(TypedKind::Text(raw.to_string())),
            TypedKind::Choice { choices, .. } => choices
                .iter()
                .position(|choice| choice == raw)
                .or_else(|| choices.iter().position(|choice| choice.trim() == trimmed))
                .map(|selected| TypedKind::Choice {
                    selected,
                    choices: choices.clone(),
                }),
            TypedKind::Range { min, max, .. } => trimmed
                .parse::<i64>()
                .ok()
                .filter(|value| (*min..=*max).contains(value))
                .map(|value| TypedKind::Range {
                    value,
                    min: *min,
                    max: *max,
                }),
        }
    }

    fn text(&self) -> String {
        match self {
            TypedKind::Boolean(value) => value.to_string(),
            TypedKind::Integer { value, .. } | TypedKind::Range { value, .. } => value.to_string(),
            TypedKind::Float { value, .. } => value.to_string(),
            TypedKind::Text(value) => value.clone(),
            TypedKind::Choice { selected, choices } => {
                choices.get(*selected).cloned().unwrap_or_default()
            }
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn integral_bound(name: &str, bound: Option<f64>) -> Result<Option<i64>, DescriptionError> {
    match bound {
        None => Ok(None),
        Some(raw) if raw.is_finite() && raw.fract() == 0.0 => {
            // i64::MAX as f64 rounds up to 2^63, which is already out of range.
            if raw >= i64::MIN as f64 && raw < i64::MAX as f64 {
                Ok(Some(raw as i64))
            } else {
                Err(DescriptionError::MalformedVariable {
                    name: name.to_string(),
                    reason: format!("bound {raw} does not fit a 64-bit integer"),
                })
            }
        }
        Some(raw) => Err(DescriptionError::MalformedVariable {
            name: name.to_string(),
            reason: format!("bound {raw} is not an integer"),
        }),
    }
}

fn ordered<T: PartialOrd + fmt::Display>(
    name: &str,
    min: Option<T>,
    max: Option<T>,
) -> Result<(), DescriptionError> {
    match (min, max) {
        (Some(min), Some(max)) if min > max => Err(DescriptionError::MalformedVariable {
            name: name.to_string(),
            reason: format!("min {min} exceeds max {max}"),
        }),
        _ => Ok(()),
    }
}

/// Text of a JSON scalar; `None` for null or an empty string.
fn scalar_text(name: &str, value: &serde_json::Value) -> Result<Option<String>, DescriptionError> {
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::String(text) if text.trim().is_empty() => Ok(None),
        serde_json::Value::String(text) => Ok(Some(text.clone())),
        serde_json::Value::Bool(flag) => Ok(Some(flag.to_string())),
        serde_json::Value::Number(number) => Ok(Some(number.to_string())),
        _ => Err(DescriptionError::MalformedVariable {
            name: name.to_string(),
            reason: "value must be a scalar".to_string(),
        }),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypedValue {
    name: String,
    kind: TypedKind,
    modifiable: bool,
}

impl TypedValue {
    /// Builds a modifiable value; `kind` must already satisfy its own constraints.
    pub fn new(name: impl Into<String>, kind: TypedKind) -> Result<Self, DescriptionError> {
        let name = name.into();
        validate_name(&name)?;
        let value = Self {
            name,
            kind,
            modifiable: true,
        };
        value
            .check()
            .map_err(|err| DescriptionError::MalformedVariable {
                name: value.name.clone(),
                reason: format!("expected {}, got '{}'", err.expected, err.candidate),
            })?;
        Ok(value)
    }

    /// Builds a value from a listing entry. A missing initial value takes the
    /// type's default (false, zero or the lower bound, empty text, first choice).
    pub fn from_description(desc: &VariableDescription) -> Result<Self, DescriptionError> {
        if desc.name.is_empty() {
            return Err(DescriptionError::MissingName);
        }
        validate_name(&desc.name)?;
        let name = desc.name.as_str();

        let Some(type_tag) = desc.type_tag else {
            return Err(DescriptionError::MalformedVariable {
                name: name.to_string(),
                reason: "unknown or missing type".to_string(),
            });
        };

        let template = match type_tag {
            TypeTag::Boolean => TypedKind::Boolean(false),
            TypeTag::Integer => {
                let bounds = Bounds {
                    min: integral_bound(name, desc.min)?,
                    max: integral_bound(name, desc.max)?,
                };
                ordered(name, bounds.min, bounds.max)?;
                TypedKind::Integer {
                    value: bounds.clamp(0),
                    bounds,
                }
            }
            TypeTag::Float => {
                let bounds = Bounds {
                    min: desc.min,
                    max: desc.max,
                };
                ordered(name, bounds.min, bounds.max)?;
                TypedKind::Float {
                    value: bounds.clamp(0.0),
                    bounds,
                }
            }
            TypeTag::String => TypedKind::Text(String::new()),
            TypeTag::Choice => {
                let choices = desc.choices.clone().unwrap_or_default();
                if choices.is_empty() {
                    return Err(DescriptionError::MalformedVariable {
                        name: name.to_string(),
                        reason: "choice type without choices".to_string(),
                    });
                }
                TypedKind::Choice {
                    selected: 0,
                    choices,
                }
            }
            TypeTag::Range => {
                let (Some(min), Some(max)) = (
                    integral_bound(name, desc.min)?,
                    integral_bound(name, desc.max)?,
                ) else {
                    return Err(DescriptionError::MalformedVariable {
                        name: name.to_string(),
                        reason: "range type requires min and max".to_string(),
                    });
                };
                ordered(name, Some(min), Some(max))?;
                TypedKind::Range {
                    value: min,
                    min,
                    max,
                }
            }
        };

        let kind = match scalar_text(name, &desc.value)? {
            None => template,
            Some(raw) => template.with_value(&raw).ok_or_else(|| {
                DescriptionError::MalformedVariable {
                    name: name.to_string(),
                    reason: format!("expected {}, got '{raw}'", template.expectation()),
                }
            })?,
        };

        Ok(Self {
            name: desc.name.clone(),
            kind,
            modifiable: desc.modifiable,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_tag(&self) -> TypeTag {
        self.kind.type_tag()
    }

    pub fn kind(&self) -> &TypedKind {
        &self.kind
    }

    pub fn is_modifiable(&self) -> bool {
        self.modifiable
    }

    pub fn choices(&self) -> Option<&[String]> {
        match &self.kind {
            TypedKind::Choice { choices, .. } => Some(choices),
            _ => None,
        }
    }

    /// Human readable form of the expected type and range.
    pub fn expectation(&self) -> String {
        self.kind.expectation()
    }

    pub fn value_text(&self) -> String {
        self.kind.text()
    }

    fn parse(&self, candidate: &str) -> Result<TypedKind, ValidationError> {
        self.ensure_modifiable()?;
        self.kind
            .with_value(candidate)
            .ok_or_else(|| ValidationError::new(&self.name, self.kind.expectation(), candidate))
    }

    pub fn ensure_modifiable(&self) -> Result<(), ValidationError> {
        if self.modifiable {
            Ok(())
        } else {
            Err(ValidationError::new(
                &self.name,
                "a modifiable variable",
                self.value_text(),
            ))
        }
    }

    /// Checks a user edit against the type's format, range and choice constraints.
    pub fn validate(&self, candidate: &str) -> Result<(), ValidationError> {
        self.parse(candidate).map(|_| ())
    }

    pub fn is_valid(&self, candidate: &str) -> bool {
        self.validate(candidate).is_ok()
    }

    /// Applies an edit; the current value is left untouched when validation fails.
    pub fn edit(&mut self, candidate: &str) -> Result<(), ValidationError> {
        self.kind = self.parse(candidate)?;
        Ok(())
    }

    /// Re-checks the held value against its constraints, ignoring modifiability.
    pub fn check(&self) -> Result<(), ValidationError> {
        let text = self.kind.text();
        match self.kind.with_value(&text) {
            Some(_) => Ok(()),
            None => Err(ValidationError::new(
                &self.name,
                self.kind.expectation(),
                text,
            )),
        }
    }

    pub fn to_wire_value(&self) -> WireValue {
        WireValue(self.kind.text())
    }
}

#[cfg(test)]
#[path = "tests/typed_value_tests.rs"]
mod tests;
