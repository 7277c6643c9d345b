use serde::{Deserialize, Serialize};

use crate::error::{DestretchError, Result};

/// How a window that runs past either end of the sequence is adjusted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgePolicy {
    /// Shift the window inside the sequence, keeping its width.
    #[default]
    KeepRange,
    /// Clamp each bound independently, shrinking the window at the edges.
    TrimMargins,
}

impl std::fmt::Display for EdgePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::KeepRange => write!(f, "Keep Range"),
            Self::TrimMargins => write!(f, "Trim Margins"),
        }
    }
}

/// Validated neighbour counts on each side of a position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Margins {
    pub left: usize,
    pub right: usize,
}

impl Margins {
    pub fn new(left: i64, right: i64) -> Result<Self> {
        if left < 0 || right < 0 {
            return Err(DestretchError::Configuration(format!(
                "margins must be non-negative (left = {left}, right = {right})"
            )));
        }
        Ok(Self {
            left: left as usize,
            right: right as usize,
        })
    }

    /// Nominal window width, `left + right + 1`.
    pub fn width(&self) -> usize {
        self.left.saturating_add(self.right).saturating_add(1)
    }
}

/// Half-open interval `[start, end)` of sequence positions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    pub start: usize,
    pub end: usize,
}

impl Window {
    /// Effective window of `position` in a sequence of `total` frames.
    pub fn around(position: usize, margins: Margins, total: usize, policy: EdgePolicy) -> Self {
        let n = total as i128;
        let mut start = position as i128 - margins.left as i128;
        let mut end = position as i128 + margins.right as i128 + 1;

        if start < 0 || end > n {
            match policy {
                EdgePolicy::KeepRange => {
                    let width = end - start;
                    if width > n {
                        start = 0;
                        end = n;
                    } else if start < 0 {
                        start = 0;
                        end = width;
                    } else {
                        end = n;
                        start = n - width;
                    }
                }
                EdgePolicy::TrimMargins => {
                    start = start.max(0);
                    end = end.min(n);
                }
            }
        }

        Self {
            start: start as usize,
            end: end as usize,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

impl std::fmt::Display for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}
