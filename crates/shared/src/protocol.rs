use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::TypeTag;

fn default_true() -> bool {
    true
}

/// Unknown or malformed tags decode as `None` so one bad entry cannot fail a whole listing.
fn lenient_type_tag<'de, D>(deserializer: D) -> Result<Option<TypeTag>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(TypeTag::deserialize(raw).ok())
}

/// One scalar as it travels over the wire. The device expects every value as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WireValue(pub String);

impl WireValue {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WireValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WireValue {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandDescription {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub has_children: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<VariableDescription>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableDescription {
    #[serde(default)]
    pub name: String,
    #[serde(
        rename = "type",
        default,
        deserialize_with = "lenient_type_tag",
        skip_serializing_if = "Option::is_none"
    )]
    pub type_tag: Option<TypeTag>,
    #[serde(default)]
    pub value: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default = "default_true")]
    pub modifiable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetVariableRequest {
    pub name: String,
    pub value: WireValue,
    #[serde(rename = "type")]
    pub type_tag: TypeTag,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetVariableResponse {
    #[serde(default = "default_true")]
    pub accepted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Positional command invocation; `args` order matches the remote parameter list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    pub name: String,
    pub args: Vec<WireValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunCommandResponse {
    #[serde(default)]
    pub display: Vec<String>,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default)]
    pub component: String,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelpRequest {
    pub component: String,
    pub module: String,
    pub object: String,
}

impl HelpRequest {
    pub fn file_name(&self) -> String {
        format!("{}_{}_{}.html", self.component, self.module, self.object)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelpResponse {
    pub text: String,
}
