/// Core data types for correlation snapshots
///
/// These types match the JSON message format broadcast by the correlation server
/// on its `/ws` endpoint, e.g. `{"BTC":{"BTC":1.0,"ETH":0.82},"ETH":{"BTC":0.82,"ETH":1.0}}`

use crate::shared::error::MatrixError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// One row of a [`CorrelationMatrix`], keyed by column symbol.
pub type CorrelationRow = IndexMap<String, f64>;

/// Full correlation snapshot from the server
///
/// Rows and columns keep the key order of the JSON document. The matrix is expected to be
/// square and symmetric with a unit diagonal, but nothing here enforces that: absent cells
/// are reported as [`Cell::Unknown`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct CorrelationMatrix(IndexMap<String, CorrelationRow>);

impl CorrelationMatrix {
    /// Row symbols in document order
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Coefficient for `row` against `col`, if the snapshot carries it
    pub fn get(&self, row: &str, col: &str) -> Option<f64> {
        self.0.get(row).and_then(|cols| cols.get(col)).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for CorrelationMatrix {
    type Err = MatrixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(serde_json::from_str(s)?)
    }
}

/// Renderable view of a single matrix cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell {
    Value(f64),
    /// Cell absent from the snapshot. Never rendered as zero.
    Unknown,
}

impl Cell {
    pub fn value(&self) -> Option<f64> {
        match self {
            Cell::Value(value) => Some(*value),
            Cell::Unknown => None,
        }
    }

    /// Check if the coefficient is non-negative
    pub fn is_positive(&self) -> bool {
        matches!(self, Cell::Value(value) if *value >= 0.0)
    }

    /// Shading strength in `[0, 0.3]`, proportional to the coefficient magnitude
    pub fn intensity(&self) -> f64 {
        match self {
            Cell::Value(value) => value.abs().min(1.0) * 0.3,
            Cell::Unknown => 0.0,
        }
    }
}

impl From<Option<f64>> for Cell {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Cell::Unknown, Cell::Value)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Value(value) => write!(f, "{value:.4}"),
            Cell::Unknown => f.write_str("-"),
        }
    }
}
