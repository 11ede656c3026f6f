pub mod app;
pub mod audio;
pub mod cli;
pub mod config;
pub mod core;
pub mod demo;
pub mod display;
pub mod error;
pub mod resources;

pub use app::{Application, LoopState, RenderContext, RenderLoop, Stage, StageContext};
pub use config::{AppConfig, Backend};
pub use display::DisplayPair;
pub use error::LoopError;
