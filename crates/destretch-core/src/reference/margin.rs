use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{DestretchError, Result};
use crate::frame::{Frame, IndexConvention};
use crate::io::ImageSource;
use crate::rolling::{median_of, EdgePolicy, Margins, Window};
use crate::validate::ResolutionGuard;

use super::ReferenceStrategy;

/// References each frame against the per-pixel median of its neighbourhood.
///
/// The whole sequence is loaded on the first `prepare` and served from
/// memory afterwards. Without margins every position shares one composite
/// over all frames; with margins the window follows [`Window::around`] and
/// the composite is recomputed only when the window moves.
pub struct MarginComposite {
    source: Arc<dyn ImageSource>,
    paths: Vec<PathBuf>,
    convention: IndexConvention,
    margins: Option<Margins>,
    policy: EdgePolicy,
    frames: Vec<Frame>,
    composite: Option<(Window, Frame)>,
}

impl MarginComposite {
    pub fn new(
        source: Arc<dyn ImageSource>,
        paths: Vec<PathBuf>,
        convention: IndexConvention,
        margins: Option<Margins>,
        policy: EdgePolicy,
    ) -> Self {
        Self {
            source,
            paths,
            convention,
            margins,
            policy,
            frames: Vec::new(),
            composite: None,
        }
    }

    fn window(&self, index: usize) -> Window {
        let total = self.paths.len();
        match self.margins {
            Some(margins) => Window::around(index, margins, total, self.policy),
            None => Window { start: 0, end: total },
        }
    }

    fn load_all(&mut self) -> Result<()> {
        info!(frames = self.paths.len(), "Loading sequence for composite reference");
        let mut guard = ResolutionGuard::new();
        let mut frames = Vec::with_capacity(self.paths.len());
        for path in &self.paths {
            let frame = self.source.load(path, self.convention, None)?;
            guard.check(&frame, path)?;
            frames.push(frame);
        }
        self.frames = frames;
        Ok(())
    }
}

impl ReferenceStrategy for MarginComposite {
    fn name(&self) -> &'static str {
        "margin composite"
    }

    fn prepare(&mut self, _index: usize) -> Result<()> {
        if self.frames.is_empty() && !self.paths.is_empty() {
            self.load_all()?;
        }
        Ok(())
    }

    fn original(&mut self, index: usize) -> Result<Option<Frame>> {
        Ok(self.frames.get(index).cloned())
    }

    fn reference(&mut self, index: usize, _original: &Frame) -> Result<Frame> {
        let window = self.window(index);
        if let Some((cached, frame)) = &self.composite {
            if *cached == window {
                return Ok(frame.clone());
            }
        }
        debug!(index, window = %window, "Computing composite reference");
        let members: Vec<&Frame> = self
            .frames
            .get(window.start..window.end)
            .ok_or(DestretchError::EmptySequence)?
            .iter()
            .collect();
        let frame = median_of(&members)?;
        self.composite = Some((window, frame.clone()));
        Ok(frame)
    }
}
