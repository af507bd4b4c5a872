//! Parameter grids: ordered candidate lists for search and walk-forward.
//!
//! Grid order is significant. Selection ties keep the first-encountered
//! candidate, so the same grid order always picks the same parameters.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use anchorlab_core::{ParamSet, ParamValue};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    #[error("malformed grid token '{0}' (expected name=v1,v2,...)")]
    MalformedToken(String),
    #[error("no values supplied for grid parameter '{0}'")]
    NoValues(String),
}

/// An ordered list of candidate parameter sets. Never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamGrid(Vec<ParamSet>);

impl Default for ParamGrid {
    /// A single empty candidate.
    fn default() -> Self {
        Self(vec![ParamSet::new()])
    }
}

impl ParamGrid {
    /// Candidates in the given order. An empty list becomes one empty candidate.
    pub fn from_sets(sets: Vec<ParamSet>) -> Self {
        if sets.is_empty() {
            Self::default()
        } else {
            Self(sets)
        }
    }

    /// Cartesian product of named axes. The first axis varies slowest.
    pub fn from_axes(axes: Vec<(String, Vec<ParamValue>)>) -> Self {
        let mut sets = vec![ParamSet::new()];
        for (name, values) in axes {
            sets = sets
                .into_iter()
                .flat_map(|base| {
                    let name = name.clone();
                    values.iter().cloned().map(move |v| {
                        let mut set = base.clone();
                        set.insert(name.clone(), v);
                        set
                    })
                })
                .collect();
        }
        Self::from_sets(sets)
    }

    /// Axes from a name → values table (key order).
    pub fn from_table(table: &BTreeMap<String, Vec<ParamValue>>) -> Self {
        Self::from_axes(table.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }

    /// Parse whitespace-separated `name=v1,v2` tokens.
    ///
    /// Values are coerced: `none`/`null` → null, `true`/`false` → bool,
    /// numbers with a leading zero (`007`) stay text, then integer, then
    /// float, otherwise text. Blank input yields a single empty candidate.
    pub fn parse(tokens: &str) -> Result<Self, GridError> {
        let axes = tokens
            .split_whitespace()
            .map(parse_token)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_axes(axes))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ParamSet> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[ParamSet] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a ParamGrid {
    type Item = &'a ParamSet;
    type IntoIter = std::slice::Iter<'a, ParamSet>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

fn parse_token(token: &str) -> Result<(String, Vec<ParamValue>), GridError> {
    let (name, raw) = token
        .split_once('=')
        .ok_or_else(|| GridError::MalformedToken(token.to_string()))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(GridError::MalformedToken(token.to_string()));
    }
    let values: Vec<ParamValue> = raw
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(coerce)
        .collect();
    if values.is_empty() {
        return Err(GridError::NoValues(name.to_string()));
    }
    Ok((name.to_string(), values))
}

/// Best-effort typing of a grid value literal.
pub fn coerce(raw: &str) -> ParamValue {
    let lower = raw.to_ascii_lowercase();
    match lower.as_str() {
        "none" | "null" => return ParamValue::Null,
        "true" => return ParamValue::Bool(true),
        "false" => return ParamValue::Bool(false),
        _ => {}
    }
    if has_leading_zero(raw) {
        return ParamValue::Text(raw.to_string());
    }
    if let Ok(i) = raw.parse::<i64>() {
        return ParamValue::Int(i);
    }
    match raw.parse::<f64>() {
        Ok(f) if f.is_finite() => ParamValue::Float(f),
        _ => ParamValue::Text(raw.to_string()),
    }
}

/// `007`, `-01`: digits after a leading zero that is not a decimal point.
fn has_leading_zero(raw: &str) -> bool {
    let digits = raw.strip_prefix(['-', '+']).unwrap_or(raw);
    let mut chars = digits.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some('0'), Some(c)) if c.is_ascii_digit()
    )
}
