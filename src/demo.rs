//! Demo scene shown by the binary: a cursor per controller channel and a
//! fading ripple wherever a button goes down.
//!
//! Ripples own their sprite buffers. Once a ripple expires its sprite is handed
//! to the deletion queue rather than freed inline, the same way a real scene
//! would give up a texture it drew with this frame.

use std::mem;
use std::sync::Arc;

use glam::Vec2;

use crate::app::{Stage, StageContext};
use crate::config::Backend;
use crate::core::{
    Canvas, ChannelId, ChannelSet, Color, ControllerChannel, DeletionEntry, DeletionQueue,
    DisplayPipeline, GpuContext, GpuPipeline, HeadlessPipeline, IdleDevice, InputDevice,
    InputScript, Resolution, SceneRoot, Snapshot, Target, VsyncClock, MAX_CHANNELS,
};
use crate::display::DisplayPair;
use crate::error::LoopError;
use crate::resources::{FontFace, DEFAULT_FONT};

const BACKGROUND: Color = Color::rgba(18, 22, 34, 255);
const CURSOR_RADIUS: f32 = 6.0;
const RIPPLE_SIZE: u32 = 48;
const RIPPLE_WIDTH: f32 = 3.0;
/// Frames a ripple stays on screen
const RIPPLE_LIFETIME: u32 = 30;

const CHANNEL_COLORS: [Color; MAX_CHANNELS] = [
    Color::rgba(240, 240, 240, 255),
    Color::rgba(235, 87, 87, 255),
    Color::rgba(86, 204, 242, 255),
    Color::rgba(111, 207, 151, 255),
    Color::rgba(242, 201, 76, 255),
];

struct Ripple {
    center: Vec2,
    age: u32,
    sprite: Vec<Color>,
}

impl Ripple {
    fn new(center: Vec2, color: Color) -> Self {
        Self {
            center,
            age: 0,
            sprite: ring_sprite(color),
        }
    }

    fn opacity(&self) -> f32 {
        1.0 - self.age as f32 / RIPPLE_LIFETIME as f32
    }

    fn expired(&self) -> bool {
        self.age >= RIPPLE_LIFETIME
    }
}

fn ring_sprite(color: Color) -> Vec<Color> {
    let half = RIPPLE_SIZE as f32 / 2.0;
    (0..RIPPLE_SIZE * RIPPLE_SIZE)
        .map(|i| {
            let texel = Vec2::new((i % RIPPLE_SIZE) as f32, (i / RIPPLE_SIZE) as f32);
            let distance = (texel + Vec2::splat(0.5) - Vec2::splat(half)).length();
            if distance < half && distance >= half - RIPPLE_WIDTH {
                color
            } else {
                Color::TRANSPARENT
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
struct Cursor {
    position: Vec2,
    valid: bool,
    held: bool,
}

pub struct DemoScene {
    deletion: Arc<DeletionQueue>,
    primary: Resolution,
    secondary: Resolution,
    cursors: [Cursor; MAX_CHANNELS],
    invalidate: [bool; MAX_CHANNELS],
    ripples: Vec<Ripple>,
    updates: u64,
}

impl DemoScene {
    pub fn new(deletion: Arc<DeletionQueue>, primary: Resolution, secondary: Resolution) -> Self {
        Self {
            deletion,
            primary,
            secondary,
            cursors: [Cursor::default(); MAX_CHANNELS],
            invalidate: [false; MAX_CHANNELS],
            ripples: Vec::new(),
            updates: 0,
        }
    }

    /// Ripples still on screen
    pub fn ripple_count(&self) -> usize {
        self.ripples.len()
    }

    /// Channel snapshots applied so far
    pub fn updates(&self) -> u64 {
        self.updates
    }

    fn scale_for(&self, target: Target) -> Vec2 {
        match target {
            Target::Primary => Vec2::ONE,
            Target::Secondary => self.primary.scale_to(self.secondary),
        }
    }
}

impl SceneRoot for DemoScene {
    fn update(&mut self, snapshot: &Snapshot) {
        let slot = snapshot.channel.0;
        let Some(cursor) = self.cursors.get_mut(slot) else {
            return;
        };
        self.updates += 1;

        if cursor.valid && !snapshot.pointer_valid {
            self.invalidate[slot] = true;
        }
        cursor.valid = snapshot.pointer_valid;
        cursor.position = snapshot.pointer;
        cursor.held = !snapshot.held.is_empty();

        if snapshot.pointer_valid && !snapshot.pressed.is_empty() {
            self.ripples
                .push(Ripple::new(snapshot.pointer, CHANNEL_COLORS[slot]));
        }
    }

    fn draw(&mut self, target: Target, canvas: &mut Canvas) {
        canvas.clear(BACKGROUND);
        let scale = self.scale_for(target);

        for ripple in &self.ripples {
            canvas.blit(&ripple.sprite, RIPPLE_SIZE, ripple.center * scale, ripple.opacity());
        }

        for (cursor, color) in self.cursors.iter().zip(CHANNEL_COLORS) {
            if !cursor.valid {
                continue;
            }
            let radius = if cursor.held {
                CURSOR_RADIUS * 1.5
            } else {
                CURSOR_RADIUS
            };
            canvas.fill_circle(cursor.position * scale, radius, color);
        }
    }

    fn update_effects(&mut self) {
        for ripple in &mut self.ripples {
            ripple.age += 1;
        }

        let (expired, live): (Vec<_>, Vec<_>) =
            mem::take(&mut self.ripples).into_iter().partition(Ripple::expired);
        self.ripples = live;

        for ripple in expired {
            self.deletion
                .register(DeletionEntry::new("ripple sprite", ripple.sprite));
        }
    }

    fn take_pointer_invalidation(&mut self, channel: ChannelId) -> bool {
        self.invalidate
            .get_mut(channel.0)
            .map(mem::take)
            .unwrap_or(false)
    }
}

/// Build the displays, font and demo scene on the render thread
pub fn build_stage(context: StageContext<'_>) -> Result<Stage, LoopError> {
    let StageContext {
        config,
        resources,
        deletion,
    } = context;

    let font = FontFace::from_resources(resources, DEFAULT_FONT)?;

    let (primary, secondary): (Box<dyn DisplayPipeline>, Box<dyn DisplayPipeline>) =
        match config.backend {
            Backend::Headless => (
                Box::new(HeadlessPipeline::new(Target::Primary, config.primary)),
                Box::new(HeadlessPipeline::new(Target::Secondary, config.secondary)),
            ),
            Backend::Gpu => {
                let gpu = Arc::new(pollster::block_on(GpuContext::new())?);
                (
                    Box::new(GpuPipeline::new(
                        Arc::clone(&gpu),
                        Arc::clone(deletion),
                        Target::Primary,
                        config.primary,
                    )?),
                    Box::new(GpuPipeline::new(
                        gpu,
                        Arc::clone(deletion),
                        Target::Secondary,
                        config.secondary,
                    )?),
                )
            }
        };

    let displays = DisplayPair::new(
        primary,
        secondary,
        VsyncClock::from_refresh(config.refresh_hz),
    )?;
    let scene = DemoScene::new(Arc::clone(deletion), config.primary, config.secondary);

    Ok(Stage {
        displays,
        font,
        scene: Box::new(scene),
    })
}

/// Slot 0 is the touch pointer, slots 1.. are remotes. Slots the script does
/// not mention get an idle device.
pub fn build_channels(script: Option<&InputScript>) -> ChannelSet {
    fn channel(slot: usize, device: impl InputDevice + 'static) -> ControllerChannel {
        if slot == 0 {
            ControllerChannel::pointer(device)
        } else {
            ControllerChannel::remote(device)
        }
    }

    let mut channels = ChannelSet::new();
    for slot in 0..MAX_CHANNELS {
        let id = ChannelId(slot);
        let assigned = match script.filter(|s| s.uses_channel(id)) {
            Some(script) => channel(slot, script.device(id)),
            None => channel(slot, IdleDevice),
        };
        channels.insert(slot, assigned);
    }
    channels
}
