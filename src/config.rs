use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::cli::Cli;
use crate::core::{ExitCode, Resolution};
use crate::error::LoopError;

/// Where the two outputs present their frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// In-memory double buffers
    #[default]
    Headless,
    /// Offscreen wgpu textures
    Gpu,
}

/// Application configuration, read from an optional JSON file and
/// overridden by command-line flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub primary: Resolution,
    pub secondary: Resolution,
    /// `None` runs unpaced
    pub refresh_hz: Option<f32>,
    /// Fade-out opacity step, out of 255
    pub fade_step: u8,
    pub drain_poll_ms: u64,
    /// `None` waits for every deferred release
    pub drain_timeout_ms: Option<u64>,
    pub music_volume: u8,
    pub music_loop: bool,
    pub resources: PathBuf,
    pub max_frames: Option<u64>,
    pub backend: Backend,
    pub input_script: Option<PathBuf>,
    pub exit_code: ExitCode,
    pub render_stack_size: usize,
    /// Core the render thread is pinned to; `None` leaves it to the scheduler
    pub render_core: Option<usize>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            primary: Resolution::TV_720P,
            secondary: Resolution::COMPANION,
            refresh_hz: Some(60.0),
            fade_step: 10,
            drain_poll_ms: 1,
            drain_timeout_ms: None,
            music_volume: 50,
            music_loop: true,
            resources: PathBuf::from("resources"),
            max_frames: None,
            backend: Backend::default(),
            input_script: None,
            exit_code: ExitCode::default(),
            render_stack_size: 512 * 1024,
            render_core: Some(1),
        }
    }
}

impl AppConfig {
    pub fn from_json(json: &str) -> Result<Self, LoopError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| LoopError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, or the file at `path` when given
    pub fn load(path: Option<&Path>) -> Result<Self, LoopError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let json = std::fs::read_to_string(path).map_err(|source| LoopError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Apply command-line overrides on top of the loaded values
    pub fn apply_cli(&mut self, cli: &Cli) -> Result<(), LoopError> {
        if let Some(resources) = &cli.resources {
            self.resources = resources.clone();
        }
        if let Some(backend) = cli.backend {
            self.backend = backend;
        }
        if let Some(frames) = cli.frames {
            self.max_frames = Some(frames);
        }
        if let Some(script) = &cli.script {
            self.input_script = Some(script.clone());
        }
        if let Some(hz) = cli.refresh_hz {
            self.refresh_hz = Some(hz);
        }
        if cli.unpaced {
            self.refresh_hz = None;
        }
        if let Some(timeout) = cli.drain_timeout_ms {
            self.drain_timeout_ms = Some(timeout);
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), LoopError> {
        if self.primary.is_empty() || self.secondary.is_empty() {
            return Err(LoopError::Config("output resolutions must be non-zero".into()));
        }
        if self.fade_step == 0 {
            return Err(LoopError::Config("fade_step must be at least 1".into()));
        }
        if self.refresh_hz.is_some_and(|hz| !(hz.is_finite() && hz > 0.0)) {
            return Err(LoopError::Config("refresh_hz must be a positive number".into()));
        }
        if self.music_volume > 100 {
            return Err(LoopError::Config("music_volume is a percentage".into()));
        }
        Ok(())
    }

    pub fn drain_poll(&self) -> Duration {
        Duration::from_millis(self.drain_poll_ms.max(1))
    }

    pub fn drain_timeout(&self) -> Option<Duration> {
        self.drain_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.primary, Resolution::new(1280, 720));
        assert_eq!(config.fade_step, 10);
        assert_eq!(config.music_volume, 50);
        assert_eq!(config.drain_timeout(), None);
        assert_eq!(config.exit_code, ExitCode::Relaunch);
        assert_eq!(config.render_core, Some(1));
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = AppConfig::from_json(r#"{ "backend": "gpu", "fade_step": 5 }"#).unwrap();
        assert_eq!(config.backend, Backend::Gpu);
        assert_eq!(config.fade_step, 5);
        assert_eq!(config.secondary, Resolution::COMPANION);
    }

    #[test]
    fn test_render_core_can_be_unset() {
        let config = AppConfig::from_json(r#"{ "render_core": null }"#).unwrap();
        assert_eq!(config.render_core, None);
        let config = AppConfig::from_json(r#"{ "render_core": 3 }"#).unwrap();
        assert_eq!(config.render_core, Some(3));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(AppConfig::from_json(r#"{ "fade_step": 0 }"#).is_err());
        assert!(AppConfig::from_json(r#"{ "refresh_hz": -1.0 }"#).is_err());
        assert!(AppConfig::from_json(r#"{ "primary": { "width": 0, "height": 720 } }"#).is_err());
        assert!(matches!(
            AppConfig::from_json("[1, 2]"),
            Err(LoopError::Config(_))
        ));
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "dualscreen",
            "--backend",
            "gpu",
            "--frames",
            "120",
            "--unpaced",
            "--drain-timeout-ms",
            "500",
        ]);
        let mut config = AppConfig::default();
        config.apply_cli(&cli).unwrap();

        assert_eq!(config.backend, Backend::Gpu);
        assert_eq!(config.max_frames, Some(120));
        assert_eq!(config.refresh_hz, None);
        assert_eq!(config.drain_timeout(), Some(Duration::from_millis(500)));
    }

    #[test]
    fn test_load_without_path_is_default() {
        assert_eq!(AppConfig::load(None).unwrap(), AppConfig::default());
    }
}
