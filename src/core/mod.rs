pub mod canvas;
pub mod clock;
pub mod controller;
pub mod deletion;
pub mod gpu_context;
pub mod gpu_pipeline;
pub mod headless;
pub mod input_script;
pub mod lifecycle;
pub mod pipeline;
pub mod resolution;
pub mod scene;

pub use canvas::{Canvas, Color};
pub use clock::VsyncClock;
pub use controller::{
    Buttons, ChannelId, ChannelSet, ControllerChannel, IdleDevice, InputDevice, RawReport,
    Snapshot, HOME_BUTTON, MAX_CHANNELS, QUIT_BUTTON,
};
pub use deletion::{DeletionEntry, DeletionQueue, DrainOutcome, Release};
pub use gpu_context::GpuContext;
pub use gpu_pipeline::GpuPipeline;
pub use headless::HeadlessPipeline;
pub use input_script::{InputScript, ScriptedDevice};
pub use lifecycle::{ExitCode, ExitHandle, Lifecycle};
pub use pipeline::{DisplayPipeline, PipelineState, Target};
pub use resolution::Resolution;
pub use scene::{HostMenu, LogHostMenu, SceneRoot};
