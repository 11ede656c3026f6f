use std::collections::VecDeque;
use std::path::Path;

use glam::Vec2;
use serde::Deserialize;

use super::controller::{Buttons, ChannelId, InputDevice, RawReport};
use crate::error::LoopError;

/// One scripted device report
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScriptReport {
    /// Frame (poll index) the report is delivered on
    pub frame: u64,
    /// Channel slot the report belongs to
    pub channel: usize,
    #[serde(default)]
    pub held: Buttons,
    /// Device-space pointer, absent when the pointer is not valid
    #[serde(default)]
    pub pointer: Option<[f32; 2]>,
}

/// Recorded input for every channel, replayed frame by frame
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct InputScript {
    reports: Vec<ScriptReport>,
}

impl InputScript {
    pub fn from_json(json: &str) -> Result<Self, LoopError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, LoopError> {
        let json = std::fs::read_to_string(path).map_err(|source| LoopError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// Whether any report targets `channel`
    pub fn uses_channel(&self, channel: ChannelId) -> bool {
        self.reports.iter().any(|r| r.channel == channel.0)
    }

    /// Device replaying the reports of `channel` in frame order
    pub fn device(&self, channel: ChannelId) -> ScriptedDevice {
        let mut reports: Vec<_> = self
            .reports
            .iter()
            .filter(|r| r.channel == channel.0)
            .map(|r| {
                let report = RawReport {
                    held: r.held,
                    pointer: r.pointer.map(Vec2::from_array),
                };
                (r.frame, report)
            })
            .collect();
        reports.sort_by_key(|(frame, _)| *frame);

        ScriptedDevice {
            reports: reports.into(),
            frame: 0,
        }
    }
}

/// Input device fed by an [`InputScript`]
#[derive(Debug, Clone)]
pub struct ScriptedDevice {
    reports: VecDeque<(u64, RawReport)>,
    frame: u64,
}

impl ScriptedDevice {
    /// Reports not yet delivered
    pub fn remaining(&self) -> usize {
        self.reports.len()
    }
}

impl InputDevice for ScriptedDevice {
    fn read(&mut self) -> Option<RawReport> {
        let frame = self.frame;
        self.frame += 1;

        // Only one report per frame; later duplicates are dropped
        while self.reports.front().is_some_and(|(at, _)| *at < frame) {
            self.reports.pop_front();
        }

        match self.reports.front() {
            Some((at, _)) if *at == frame => self.reports.pop_front().map(|(_, report)| report),
            _ => None,
        }
    }
}
