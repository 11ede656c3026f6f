use crate::core::{Canvas, Color, DisplayPipeline, Resolution, SceneRoot, Target, VsyncClock};
use crate::error::LoopError;

/// Both outputs plus the vsync clock that paces them.
///
/// Frames are always drawn primary first, then secondary, each inside its own
/// begin/end bracket.
pub struct DisplayPair {
    primary: Box<dyn DisplayPipeline>,
    secondary: Box<dyn DisplayPipeline>,
    vsync: VsyncClock,
}

impl DisplayPair {
    /// Pair two pipelines. Each must drive the output it is given for and
    /// have a non-empty resolution.
    pub fn new(
        primary: Box<dyn DisplayPipeline>,
        secondary: Box<dyn DisplayPipeline>,
        vsync: VsyncClock,
    ) -> Result<Self, LoopError> {
        for (expected, pipeline) in [(Target::Primary, &primary), (Target::Secondary, &secondary)] {
            if pipeline.target() != expected || pipeline.resolution().is_empty() {
                return Err(LoopError::MissingPipeline(expected));
            }
        }

        log::info!(
            "displays: primary {} secondary {}",
            primary.resolution(),
            secondary.resolution()
        );

        Ok(Self {
            primary,
            secondary,
            vsync,
        })
    }

    pub fn primary_resolution(&self) -> Resolution {
        self.primary.resolution()
    }

    pub fn secondary_resolution(&self) -> Resolution {
        self.secondary.resolution()
    }

    pub fn pipeline(&self, target: Target) -> &dyn DisplayPipeline {
        match target {
            Target::Primary => self.primary.as_ref(),
            Target::Secondary => self.secondary.as_ref(),
        }
    }

    fn pipeline_mut(&mut self, target: Target) -> &mut dyn DisplayPipeline {
        match target {
            Target::Primary => self.primary.as_mut(),
            Target::Secondary => self.secondary.as_mut(),
        }
    }

    /// Run one begin/draw/end bracket on `target`
    pub fn render<F>(&mut self, target: Target, draw: F) -> Result<(), LoopError>
    where
        F: FnOnce(&mut Canvas),
    {
        let pipeline = self.pipeline_mut(target);
        pipeline.begin_frame()?;
        draw(pipeline.canvas());
        pipeline.end_frame()
    }

    /// Let the scene draw both outputs, optionally covered by a black overlay
    pub fn render_scene(
        &mut self,
        scene: &mut dyn SceneRoot,
        overlay: Option<f32>,
    ) -> Result<(), LoopError> {
        for target in [Target::Primary, Target::Secondary] {
            self.render(target, |canvas| {
                scene.draw(target, canvas);
                if let Some(opacity) = overlay {
                    canvas.overlay(Color::BLACK, opacity);
                }
            })?;
        }
        Ok(())
    }

    /// Empty frame on both outputs; pipelines clear to black on begin
    pub fn render_blank(&mut self) -> Result<(), LoopError> {
        self.render(Target::Primary, |_| {})?;
        self.render(Target::Secondary, |_| {})
    }

    /// Nothing has been presented yet on at least one output
    pub fn is_first_frame(&self) -> bool {
        self.primary.frame_count() == 0 || self.secondary.frame_count() == 0
    }

    pub fn set_outputs_enabled(&mut self, enabled: bool) -> Result<(), LoopError> {
        self.primary.set_enabled(enabled)?;
        self.secondary.set_enabled(enabled)
    }

    /// Block until the next vertical sync on both outputs
    pub fn wait_for_sync(&mut self) {
        self.vsync.wait();
        self.primary.wait_for_sync();
        self.secondary.wait_for_sync();
    }

    pub fn vsync(&self) -> &VsyncClock {
        &self.vsync
    }
}
