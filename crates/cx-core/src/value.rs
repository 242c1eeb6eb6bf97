use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A value crossing the host/interpreter boundary.
///
/// Interpreter failures never appear here: they travel as `Err(CodexError)`
/// next to the value instead of as an in-band marker.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CxValue {
    #[default]
    Nil,
    Bool(bool),
    /// Integer values stay integers across the boundary, so `7 / 2` keeps
    /// integer semantics after a save and restore.
    Int(i64),
    Number(f64),
    String(String),
    List(Vec<CxValue>),
    Map(BTreeMap<String, CxValue>),
}

/// Snapshot of the declared global roster, keyed by variable name.
pub type StateMap = BTreeMap<String, CxValue>;

impl CxValue {
    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Numeric value of an `Int` or a `Number`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Int(value) => Some(*value as f64),
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[CxValue]> {
        match self {
            Self::List(values) => Some(values.as_slice()),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, CxValue>> {
        match self {
            Self::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    /// Boolean coercion used for option guards.
    ///
    /// nil, `false`, zero, NaN and the empty string are false; everything else,
    /// including empty lists and maps, is true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Nil => false,
            Self::Bool(value) => *value,
            Self::Int(value) => *value != 0,
            Self::Number(value) => *value != 0.0 && !value.is_nan(),
            Self::String(value) => !value.is_empty(),
            Self::List(_) | Self::Map(_) => true,
        }
    }

    /// String coercion used for text templates. nil renders as nothing.
    pub fn to_text(&self) -> String {
        match self {
            Self::Nil => String::new(),
            Self::Bool(value) => value.to_string(),
            Self::Int(value) => value.to_string(),
            Self::Number(value) => number_to_text(*value),
            Self::String(value) => value.clone(),
            Self::List(values) => values
                .iter()
                .map(CxValue::to_text)
                .collect::<Vec<_>>()
                .join(", "),
            Self::Map(entries) => entries
                .iter()
                .map(|(key, value)| format!("{}: {}", key, value.to_text()))
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

pub fn number_to_text(value: f64) -> String {
    if value.is_finite() && value.fract().abs() < f64::EPSILON && value.abs() < 1e15 {
        (value as i64).to_string()
    } else {
        value.to_string()
    }
}

impl From<bool> for CxValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for CxValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for CxValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for CxValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for CxValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl<T: Into<CxValue>> From<Vec<T>> for CxValue {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}
