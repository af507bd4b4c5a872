//! Window policies: map a cursor to (train range, test range).
//!
//! The cursor is the index of the first out-of-sample bar. Each split tests
//! `cursor .. cursor + test_window_bars` (clipped to the data) and the next
//! split starts where this one ended, so test windows tile the history after
//! the first cursor with no gaps or overlaps.
//!
//! - **Anchored**: training always starts at bar 0 and grows each split.
//! - **Rolling**: training covers only the trailing `train_days` calendar days.

use std::ops::Range;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use anchorlab_core::Timestamp;

use crate::walk_forward::WalkForwardError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WindowPolicy {
    Anchored {
        min_train_bars: usize,
        test_window_bars: usize,
    },
    Rolling {
        min_train_bars: usize,
        test_window_bars: usize,
        train_days: u32,
    },
}

impl Default for WindowPolicy {
    fn default() -> Self {
        Self::Anchored {
            min_train_bars: 252,
            test_window_bars: 63,
        }
    }
}

/// Bar index ranges for one split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitWindows {
    pub train: Range<usize>,
    pub test: Range<usize>,
}

impl SplitWindows {
    /// Bars the winning candidate is re-run over: training start to test end,
    /// so indicators see the same history they would in a single full run.
    pub fn evaluation(&self) -> Range<usize> {
        self.train.start..self.test.end
    }
}

impl WindowPolicy {
    pub fn min_train_bars(&self) -> usize {
        match *self {
            Self::Anchored { min_train_bars, .. } | Self::Rolling { min_train_bars, .. } => {
                min_train_bars
            }
        }
    }

    pub fn test_window_bars(&self) -> usize {
        match *self {
            Self::Anchored { test_window_bars, .. } | Self::Rolling { test_window_bars, .. } => {
                test_window_bars
            }
        }
    }

    pub fn validate(&self) -> Result<(), WalkForwardError> {
        if self.test_window_bars() == 0 {
            return Err(WalkForwardError::InvalidWindow(
                "test_window_bars must be at least 1".into(),
            ));
        }
        if let Self::Rolling { train_days: 0, .. } = self {
            return Err(WalkForwardError::InvalidWindow(
                "train_days must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Windows for the split whose test range starts at `cursor`.
    /// `None` once the cursor reaches the end of the data.
    pub fn windows(&self, timestamps: &[Timestamp], cursor: usize) -> Option<SplitWindows> {
        let total = timestamps.len();
        if cursor == 0 || cursor >= total {
            return None;
        }
        let test_end = (cursor + self.test_window_bars()).min(total);
        if test_end == cursor {
            return None;
        }
        let train_start = match *self {
            Self::Anchored { .. } => 0,
            Self::Rolling { train_days, .. } => {
                let horizon = timestamps[cursor] - Duration::days(i64::from(train_days));
                timestamps[..cursor]
                    .partition_point(|t| *t < horizon)
                    .min(cursor - 1)
            }
        };
        Some(SplitWindows {
            train: train_start..cursor,
            test: cursor..test_end,
        })
    }

    /// The full split schedule over `timestamps`.
    pub fn schedule(&self, timestamps: &[Timestamp]) -> Result<Vec<SplitWindows>, WalkForwardError> {
        self.validate()?;
        let total = timestamps.len();
        let min_train = self.min_train_bars();
        if total < min_train {
            return Err(WalkForwardError::InsufficientData {
                total_bars: total,
                min_train_bars: min_train,
            });
        }

        let mut splits = Vec::new();
        let mut cursor = min_train.max(1);
        while let Some(w) = self.windows(timestamps, cursor) {
            cursor = w.test.end;
            splits.push(w);
        }
        if splits.is_empty() {
            return Err(WalkForwardError::EmptyOutOfSample {
                total_bars: total,
                min_train_bars: min_train,
            });
        }
        Ok(splits)
    }
}
