//! Rolling trend history of risk samples.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Default number of samples kept.
pub const DEFAULT_TREND_CAPACITY: usize = 300;

/// Fixed-capacity FIFO of `(FoS, PoF %)` samples. Both series always have the
/// same length and index `i` in each belongs to the same evaluation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrendHistory {
    fos: VecDeque<f64>,
    pof: VecDeque<f64>,
    capacity: usize,
}

impl Default for TrendHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_TREND_CAPACITY)
    }
}

impl TrendHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            fos: VecDeque::with_capacity(capacity),
            pof: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest when full.
    pub fn push(&mut self, fos: f64, pof_percent: f64) {
        if self.fos.len() >= self.capacity {
            self.fos.pop_front();
            self.pof.pop_front();
        }
        self.fos.push_back(fos);
        self.pof.push_back(pof_percent);
    }

    pub fn fos(&self) -> &VecDeque<f64> {
        &self.fos
    }

    pub fn pof(&self) -> &VecDeque<f64> {
        &self.pof
    }

    /// Both series in chronological order.
    pub fn series(&self) -> (Vec<f64>, Vec<f64>) {
        (self.fos.iter().copied().collect(), self.pof.iter().copied().collect())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.fos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fos.is_empty()
    }

    pub fn clear(&mut self) {
        self.fos.clear();
        self.pof.clear();
    }
}
