use std::collections::VecDeque;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{DestretchError, Result};
use crate::frame::Frame;
use crate::pipeline::config::RollingConfig;
use crate::validate::ResolutionGuard;

use super::median::median_of;
use super::window::{EdgePolicy, Margins, Window};

/// One emitted aggregate.
#[derive(Debug)]
pub struct Aggregate<'a> {
    /// Output index; equal to the sequence position it stands for.
    pub position: usize,
    /// Effective window of `position`.
    pub window: Window,
    pub frame: &'a Frame,
    /// Set when the stream ended before `window` was resident and the last
    /// computed aggregate stands in.
    pub repeated: bool,
}

/// Single-pass windowed median over a frame stream.
///
/// Frames are pushed in sequence order. Every position whose window is fully
/// resident is reduced and emitted immediately, in order; frames are evicted
/// from the front as soon as no pending window starts at or before them, so
/// at most `margin_left + margin_right + 1` frames are ever held.
///
/// The reduction for window `[start, end)` is taken over the frames strictly
/// inside `(start, end)`: the frame at `start` contributes to residency but
/// not to the median. A window whose interior is empty (width one) falls
/// back to its single frame.
pub struct RollingAggregator {
    total: usize,
    margins: Margins,
    policy: EdgePolicy,
    guard: ResolutionGuard,
    planes: Option<usize>,
    buffer: VecDeque<Frame>,
    /// Number of frames evicted from the front; `buffer[k]` is frame `offset + k`.
    offset: usize,
    loaded: usize,
    next_position: usize,
    last: Option<Frame>,
    peak_resident: usize,
}

impl RollingAggregator {
    pub fn new(total: usize, margins: Margins, policy: EdgePolicy) -> Self {
        Self {
            total,
            margins,
            policy,
            guard: ResolutionGuard::new(),
            planes: None,
            buffer: VecDeque::with_capacity(margins.width().min(total)),
            offset: 0,
            loaded: 0,
            next_position: 0,
            last: None,
            peak_resident: 0,
        }
    }

    /// Validate the configured margins and build an aggregator.
    pub fn from_config(total: usize, config: &RollingConfig) -> Result<Self> {
        let margins = Margins::new(config.margin_left, config.margin_right)?;
        Ok(Self::new(total, margins, config.edge_policy))
    }

    pub fn window(&self, position: usize) -> Window {
        Window::around(position, self.margins, self.total, self.policy)
    }

    pub fn resident(&self) -> usize {
        self.buffer.len()
    }

    /// Largest number of frames held at once so far.
    pub fn peak_resident(&self) -> usize {
        self.peak_resident
    }

    /// Add the next frame of the stream and emit every aggregate that became
    /// computable.
    pub fn push<F>(&mut self, frame: Frame, source: &Path, mut emit: F) -> Result<()>
    where
        F: FnMut(Aggregate<'_>) -> Result<()>,
    {
        if self.loaded >= self.total {
            return Err(DestretchError::Configuration(format!(
                "received more than the declared {} frames",
                self.total
            )));
        }
        self.guard.check(&frame, source)?;
        match self.planes {
            None => self.planes = Some(frame.planes()),
            Some(planes) if planes != frame.planes() => {
                return Err(DestretchError::Configuration(format!(
                    "'{}' has {} planes, expected {}",
                    source.display(),
                    frame.planes(),
                    planes
                )));
            }
            Some(_) => {}
        }

        self.buffer.push_back(frame);
        self.loaded += 1;
        self.peak_resident = self.peak_resident.max(self.buffer.len());

        while self.next_position < self.total {
            let window = self.window(self.next_position);
            if window.end > self.loaded {
                debug!(
                    position = self.next_position,
                    window = %window,
                    loaded = self.loaded,
                    "Deferring aggregate"
                );
                break;
            }

            let aggregate = self.reduce(window)?;
            emit(Aggregate {
                position: self.next_position,
                window,
                frame: &aggregate,
                repeated: false,
            })?;
            self.last = Some(aggregate);
            self.next_position += 1;
            self.evict();
        }

        Ok(())
    }

    /// Close the stream. Positions that never became resident are emitted
    /// with the last computed aggregate, so exactly `total` outputs exist.
    ///
    /// A stream that delivered all `total` frames has already emitted every
    /// position from `push`, so this only repeats output for truncated
    /// streams.
    pub fn finish<F>(self, mut emit: F) -> Result<()>
    where
        F: FnMut(Aggregate<'_>) -> Result<()>,
    {
        if self.next_position >= self.total {
            return Ok(());
        }
        let last = self.last.as_ref().ok_or(DestretchError::EmptySequence)?;
        warn!(
            unflushed = self.total - self.next_position,
            loaded = self.loaded,
            total = self.total,
            "Stream ended early, repeating last aggregate"
        );
        for position in self.next_position..self.total {
            emit(Aggregate {
                position,
                window: self.window(position),
                frame: last,
                repeated: true,
            })?;
        }
        Ok(())
    }

    fn reduce(&self, window: Window) -> Result<Frame> {
        let interior = if window.len() > 1 {
            window.start + 1..window.end
        } else {
            window.start..window.end
        };
        let frames: Vec<&Frame> = interior
            .map(|i| &self.buffer[i - self.offset])
            .collect();
        median_of(&frames)
    }

    /// Drop frames before the start of the next pending window.
    fn evict(&mut self) {
        let keep_from = if self.next_position < self.total {
            self.window(self.next_position).start
        } else {
            self.loaded
        };
        while self.offset < keep_from {
            self.buffer.pop_front();
            self.offset += 1;
        }
    }
}
