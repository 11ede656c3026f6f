use std::sync::Arc;
use wgpu::{Device, Texture};

use super::canvas::{Canvas, Color};
use super::deletion::{DeletionEntry, DeletionQueue};
use super::gpu_context::GpuContext;
use super::pipeline::{DisplayPipeline, PipelineState, Target};
use super::resolution::Resolution;
use crate::error::LoopError;

/// Pipeline backed by a wgpu texture.
///
/// Scene roots draw into a CPU canvas; `end_frame` uploads it to the output
/// texture and submits, `wait_for_sync` blocks until the GPU has retired the
/// upload. When the pipeline goes away its texture is handed to the deletion
/// queue instead of being destroyed on the render thread.
pub struct GpuPipeline {
    gpu: Arc<GpuContext>,
    deletion: Arc<DeletionQueue>,
    state: PipelineState,
    canvas: Canvas,
    texture: Option<Texture>,
}

impl GpuPipeline {
    pub fn new(
        gpu: Arc<GpuContext>,
        deletion: Arc<DeletionQueue>,
        target: Target,
        resolution: Resolution,
    ) -> Result<Self, LoopError> {
        if resolution.is_empty() {
            return Err(LoopError::MissingPipeline(target));
        }

        let texture = Self::create_output_texture(gpu.device(), target, resolution);

        Ok(Self {
            gpu,
            deletion,
            state: PipelineState::new(target, resolution),
            canvas: Canvas::new(resolution),
            texture: Some(texture),
        })
    }

    pub fn texture(&self) -> Option<&Texture> {
        self.texture.as_ref()
    }

    fn create_output_texture(device: &Device, target: Target, resolution: Resolution) -> Texture {
        let label = match target {
            Target::Primary => "Primary Output Texture",
            Target::Secondary => "Secondary Output Texture",
        };

        device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: resolution.width,
                height: resolution.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        })
    }

    fn upload(&self) {
        let Some(texture) = &self.texture else {
            return;
        };
        let resolution = self.state.resolution();

        self.gpu.queue().write_texture(
            texture.as_image_copy(),
            self.canvas.as_bytes(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * resolution.width),
                rows_per_image: Some(resolution.height),
            },
            wgpu::Extent3d {
                width: resolution.width,
                height: resolution.height,
                depth_or_array_layers: 1,
            },
        );
        self.gpu.queue().submit(std::iter::empty());
    }
}

impl DisplayPipeline for GpuPipeline {
    fn target(&self) -> Target {
        self.state.target()
    }

    fn resolution(&self) -> Resolution {
        self.state.resolution()
    }

    fn begin_frame(&mut self) -> Result<(), LoopError> {
        self.state.begin()?;
        self.canvas.clear(Color::BLACK);
        Ok(())
    }

    fn canvas(&mut self) -> &mut Canvas {
        &mut self.canvas
    }

    fn end_frame(&mut self) -> Result<(), LoopError> {
        self.state.end()?;
        self.upload();
        Ok(())
    }

    fn wait_for_sync(&mut self) {
        self.gpu.wait_idle();
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

impl Drop for GpuPipeline {
    fn drop(&mut self) {
        if let Some(texture) = self.texture.take() {
            self.deletion.register(DeletionEntry::with_release(
                "output texture",
                texture,
                |texture: Texture| texture.destroy(),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_is_send() {
        // Pipelines move onto the render thread
        fn assert_send<T: Send>() {}
        assert_send::<GpuPipeline>();
    }

    #[test]
    fn test_upload_layout_matches_canvas() {
        let resolution = Resolution::new(64, 32);
        let canvas = Canvas::new(resolution);
        let bytes_per_row = 4 * resolution.width;
        assert_eq!(canvas.as_bytes().len(), (bytes_per_row * resolution.height) as usize);
    }
}
