use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single extracted or computed field value
///
/// Absent values are represented by the field missing from its map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

/// Field identifier -> value for one page
pub type FieldMap = BTreeMap<String, FieldValue>;

impl FieldValue {
    /// Numeric view of the value, used by validation rules and time-series export
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns true for empty text; numbers and booleans are never empty
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Text(s) if s.trim().is_empty())
    }

    /// Parses a cell read back from the tabular file into the narrowest type
    ///
    /// Returns `None` for empty cells.
    pub fn parse_cell(cell: &str) -> Option<Self> {
        if cell.is_empty() {
            return None;
        }
        if cell == "true" || cell == "false" {
            return Some(Self::Bool(cell == "true"));
        }
        // Leading-zero strings like "007" stay text
        let leading_zero = cell.len() > 1 && cell.starts_with('0') && !cell.starts_with("0.");
        if !leading_zero {
            if let Ok(i) = cell.parse::<i64>() {
                return Some(Self::Integer(i));
            }
            if let Ok(f) = cell.parse::<f64>() {
                if f.is_finite() {
                    return Some(Self::Float(f));
                }
            }
        }
        Some(Self::Text(cell.to_string()))
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<usize> for FieldValue {
    fn from(i: usize) -> Self {
        Self::Integer(i as i64)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}
