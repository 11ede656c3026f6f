use super::canvas::{Canvas, Color};
use super::pipeline::{DisplayPipeline, PipelineState, Target};
use super::resolution::Resolution;
use crate::error::LoopError;

/// Pipeline that presents into memory.
///
/// The back buffer is drawn between `begin_frame` and `end_frame`; `end_frame`
/// swaps it with the front buffer, which holds the last complete frame.
pub struct HeadlessPipeline {
    state: PipelineState,
    back: Canvas,
    front: Canvas,
    clear_color: Color,
}

impl HeadlessPipeline {
    pub fn new(target: Target, resolution: Resolution) -> Self {
        Self {
            state: PipelineState::new(target, resolution),
            back: Canvas::new(resolution),
            front: Canvas::new(resolution),
            clear_color: Color::BLACK,
        }
    }

    /// Last frame that went through `end_frame`
    pub fn front(&self) -> &Canvas {
        &self.front
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }
}

impl DisplayPipeline for HeadlessPipeline {
    fn target(&self) -> Target {
        self.state.target()
    }

    fn resolution(&self) -> Resolution {
        self.state.resolution()
    }

    fn begin_frame(&mut self) -> Result<(), LoopError> {
        self.state.begin()?;
        self.back.clear(self.clear_color);
        Ok(())
    }

    fn canvas(&mut self) -> &mut Canvas {
        &mut self.back
    }

    fn end_frame(&mut self) -> Result<(), LoopError> {
        self.state.end()?;
        std::mem::swap(&mut self.back, &mut self.front);
        Ok(())
    }

    fn wait_for_sync(&mut self) {
        self.state.present();
    }

    fn set_enabled(&mut self, enabled: bool) -> Result<(), LoopError> {
        self.state.set_enabled(enabled)
    }

    fn is_enabled(&self) -> bool {
        self.state.is_enabled()
    }

    fn frame_count(&self) -> u64 {
        self.state.frames_presented()
    }
}
