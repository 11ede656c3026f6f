use super::canvas::Canvas;
use super::resolution::Resolution;
use crate::error::LoopError;

/// Physical output driven by a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// Television
    Primary,
    /// Companion screen
    Secondary,
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Primary => f.write_str("primary"),
            Target::Secondary => f.write_str("secondary"),
        }
    }
}

/// Double-buffered presentation state for one physical output.
///
/// Draw calls for a frame are bracketed by `begin_frame` / `end_frame`.
/// A bracket left open is a fatal precondition violation; the next
/// `begin_frame` reports it as [`LoopError::FrameAlreadyBegun`].
pub trait DisplayPipeline: Send {
    fn target(&self) -> Target;

    fn resolution(&self) -> Resolution;

    /// Open a frame and clear the back buffer
    fn begin_frame(&mut self) -> Result<(), LoopError>;

    /// Back buffer of the open frame
    fn canvas(&mut self) -> &mut Canvas;

    /// Close the frame and queue the back buffer for presentation
    fn end_frame(&mut self) -> Result<(), LoopError>;

    /// Block until the queued frame has been presented
    fn wait_for_sync(&mut self);

    /// Turn the physical output on or off.
    /// Enabling before the first completed frame is rejected.
    fn set_enabled(&mut self, enabled: bool) -> Result<(), LoopError>;

    fn is_enabled(&self) -> bool;

    /// Frames presented so far
    fn frame_count(&self) -> u64;
}

/// Bracket and counter bookkeeping shared by pipeline backends
#[derive(Debug, Clone)]
pub struct PipelineState {
    target: Target,
    resolution: Resolution,
    in_frame: bool,
    enabled: bool,
    frames_completed: u64,
    frames_presented: u64,
}

impl PipelineState {
    pub fn new(target: Target, resolution: Resolution) -> Self {
        Self {
            target,
            resolution,
            in_frame: false,
            enabled: false,
            frames_completed: 0,
            frames_presented: 0,
        }
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn begin(&mut self) -> Result<(), LoopError> {
        if self.in_frame {
            return Err(LoopError::FrameAlreadyBegun(self.target));
        }
        self.in_frame = true;
        Ok(())
    }

    pub fn end(&mut self) -> Result<(), LoopError> {
        if !self.in_frame {
            return Err(LoopError::FrameNotBegun(self.target));
        }
        self.in_frame = false;
        self.frames_completed += 1;
        Ok(())
    }

    /// Count a presented frame; only frames that were ended are presented
    pub fn present(&mut self) {
        if self.frames_presented < self.frames_completed {
            self.frames_presented += 1;
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) -> Result<(), LoopError> {
        if enabled && self.frames_completed == 0 {
            return Err(LoopError::EnableBeforeFirstFrame(self.target));
        }
        if self.enabled != enabled {
            log::debug!("{} output {}", self.target, if enabled { "enabled" } else { "disabled" });
        }
        self.enabled = enabled;
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn in_frame(&self) -> bool {
        self.in_frame
    }

    pub fn frames_completed(&self) -> u64 {
        self.frames_completed
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }
}
