//! Append-only time series used for equity and position curves.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::Timestamp;

/// Parallel timestamp/value vectors, one entry per processed bar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    timestamps: Vec<Timestamp>,
    values: Vec<f64>,
}

impl Series {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            timestamps: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
        }
    }

    /// Pair up timestamps and values. The longer side is truncated so the
    /// two vectors always stay the same length.
    pub fn from_parts(mut timestamps: Vec<Timestamp>, mut values: Vec<f64>) -> Self {
        let len = timestamps.len().min(values.len());
        timestamps.truncate(len);
        values.truncate(len);
        Self { timestamps, values }
    }

    pub fn push(&mut self, timestamp: Timestamp, value: f64) {
        self.timestamps.push(timestamp);
        self.values.push(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn timestamps(&self) -> &[Timestamp] {
        &self.timestamps
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn first(&self) -> Option<(Timestamp, f64)> {
        Some((*self.timestamps.first()?, *self.values.first()?))
    }

    pub fn last(&self) -> Option<(Timestamp, f64)> {
        Some((*self.timestamps.last()?, *self.values.last()?))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Timestamp, f64)> + '_ {
        self.timestamps.iter().copied().zip(self.values.iter().copied())
    }

    /// Sub-series by position, clamped to the series bounds.
    pub fn slice_range(&self, range: Range<usize>) -> Series {
        let end = range.end.min(self.len());
        let start = range.start.min(end);
        Series {
            timestamps: self.timestamps[start..end].to_vec(),
            values: self.values[start..end].to_vec(),
        }
    }

    /// Sub-series whose timestamps fall within `[start, end]` (inclusive).
    pub fn slice_between(&self, start: Timestamp, end: Timestamp) -> Series {
        let lo = self.timestamps.partition_point(|t| *t < start);
        let hi = self.timestamps.partition_point(|t| *t <= end);
        self.slice_range(lo..hi.max(lo))
    }

    /// Value at an exact timestamp.
    pub fn get(&self, timestamp: Timestamp) -> Option<f64> {
        self.timestamps
            .binary_search(&timestamp)
            .ok()
            .map(|i| self.values[i])
    }

    /// Append every point of `other`.
    pub fn extend(&mut self, other: &Series) {
        self.timestamps.extend_from_slice(&other.timestamps);
        self.values.extend_from_slice(&other.values);
    }
}
