use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::core::Target;

/// Errors raised by the presentation loop and its collaborators.
///
/// Everything except `Io`, `Config` and `Script` is a fatal precondition
/// failure: the loop stops and the host decides what to do with the process.
#[derive(Debug, Error)]
pub enum LoopError {
    #[error("no display pipeline available for the {0} output")]
    MissingPipeline(Target),

    #[error("default font `{0}` is missing from resources")]
    MissingFont(String),

    #[error("default font `{0}` is not a TrueType/OpenType file")]
    InvalidFont(String),

    #[error("begin_frame on the {0} output while a frame is still open")]
    FrameAlreadyBegun(Target),

    #[error("end_frame on the {0} output without a matching begin_frame")]
    FrameNotBegun(Target),

    #[error("the {0} output cannot be enabled before its first frame completes")]
    EnableBeforeFirstFrame(Target),

    #[error("gpu: {0}")]
    Gpu(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid input script: {0}")]
    Script(#[from] serde_json::Error),

    #[error("failed to spawn {name} thread: {source}")]
    SpawnThread {
        name: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("render thread panicked")]
    RenderThreadPanicked,
}
