//! Render/input loop and the application shell that hosts it.
//!
//! The loop runs on one dedicated thread and walks through
//! `Uninitialized -> Running -> Fading -> Draining -> Terminated`:
//!
//! * **Running** polls every controller channel, draws both outputs, enables
//!   them after the first frame, advances scene effects, waits for vsync and
//!   stages deferred deletions, in that order, until the exit flag is set.
//! * **Fading** renders a black overlay of rising opacity over a fixed number
//!   of frames, one blank frame, then switches both outputs off.
//! * **Draining** keeps staging deferred deletions until nothing is left.
//! * **Terminated** drops the scene root, the font and the displays, in that
//!   order, and hands the exit code back.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use thread_priority::ThreadPriority;

use crate::audio::{AudioSink, BackgroundMusic};
use crate::config::AppConfig;
use crate::core::{
    ChannelSet, DeletionQueue, DrainOutcome, ExitCode, ExitHandle, HostMenu, Lifecycle, Resolution,
    SceneRoot, HOME_BUTTON, QUIT_BUTTON,
};
use crate::display::DisplayPair;
use crate::error::LoopError;
use crate::resources::{FontFace, Resources, BACKGROUND_MUSIC};

/// Render loop phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Uninitialized,
    Running,
    Fading,
    Draining,
    Terminated,
}

/// Everything drawn by the loop. Built on the render thread before the first
/// frame; any failure while building it is fatal.
pub struct Stage {
    pub displays: DisplayPair,
    pub font: FontFace,
    pub scene: Box<dyn SceneRoot>,
}

/// What a stage builder gets to work with
pub struct StageContext<'a> {
    pub config: &'a AppConfig,
    pub resources: &'a Resources,
    pub deletion: &'a Arc<DeletionQueue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoopSettings {
    /// Fade-out opacity step, out of 255
    pub fade_step: u8,
    pub drain_poll: Duration,
    pub drain_timeout: Option<Duration>,
    /// Raise the exit flag after this many frames
    pub max_frames: Option<u64>,
}

impl LoopSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            fade_step: config.fade_step,
            drain_poll: config.drain_poll(),
            drain_timeout: config.drain_timeout(),
            max_frames: config.max_frames,
        }
    }
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// State the loop owns for the whole process lifetime
pub struct RenderContext {
    pub channels: ChannelSet,
    pub lifecycle: Lifecycle,
    pub deletion: Arc<DeletionQueue>,
    pub host: Box<dyn HostMenu>,
    pub settings: LoopSettings,
}

/// What the render thread got out of the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThreadPlacement {
    pub pinned: bool,
    pub elevated: bool,
}

/// Pin the calling thread to `core` and raise it to maximum priority.
/// Both steps are best effort; failures are logged and the thread keeps going.
pub fn promote_render_thread(core: Option<usize>) -> ThreadPlacement {
    let mut placement = ThreadPlacement::default();

    if let Some(index) = core {
        let core_id = core_affinity::get_core_ids()
            .and_then(|ids| ids.into_iter().find(|id| id.id == index));
        match core_id {
            Some(id) if core_affinity::set_for_current(id) => {
                log::info!("render thread pinned to core {index}");
                placement.pinned = true;
            }
            Some(_) => log::warn!("failed to pin render thread to core {index}"),
            None => log::warn!("core {index} not available, render thread left unpinned"),
        }
    }

    match thread_priority::set_current_thread_priority(ThreadPriority::Max) {
        Ok(()) => placement.elevated = true,
        Err(e) => log::warn!("could not raise render thread priority: {e:?}"),
    }

    placement
}

/// Overlay opacities of the fade-out, strictly increasing from 0
pub fn fade_levels(step: u8) -> impl Iterator<Item = f32> {
    (0..255u16)
        .step_by(step.max(1) as usize)
        .map(|level| level as f32 / 255.0)
}

pub struct RenderLoop<'a> {
    context: &'a mut RenderContext,
    state: LoopState,
    history: Vec<LoopState>,
    frames: u64,
}

impl<'a> RenderLoop<'a> {
    pub fn new(context: &'a mut RenderContext) -> Self {
        Self {
            context,
            state: LoopState::Uninitialized,
            history: vec![LoopState::Uninitialized],
            frames: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Every state entered so far, in order
    pub fn history(&self) -> &[LoopState] {
        &self.history
    }

    /// Steady-state frames completed
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Build the stage, run until exit, shut down. Returns the exit code.
    pub fn run<F>(&mut self, build: F) -> Result<ExitCode, LoopError>
    where
        F: FnOnce() -> Result<Stage, LoopError>,
    {
        let Stage {
            mut displays,
            font,
            mut scene,
        } = build()?;

        self.enter(LoopState::Running);
        while !self.context.lifecycle.should_exit() {
            self.run_frame(&mut displays, scene.as_mut())?;
        }

        self.enter(LoopState::Fading);
        self.fade_out(&mut displays, scene.as_mut())?;

        self.enter(LoopState::Draining);
        self.drain();

        // The scene draws with the font and into the displays: it goes first
        log::info!("destroy scene root");
        drop(scene);
        log::info!("destroy font {}", font.name());
        drop(font);
        log::info!("destroy displays");
        drop(displays);

        self.enter(LoopState::Terminated);
        Ok(self.context.lifecycle.exit_code())
    }

    fn enter(&mut self, state: LoopState) {
        log::info!("render loop: {:?} -> {:?}", self.state, state);
        self.state = state;
        self.history.push(state);
    }

    fn run_frame(
        &mut self,
        displays: &mut DisplayPair,
        scene: &mut dyn SceneRoot,
    ) -> Result<(), LoopError> {
        self.poll_channels(scene, displays.primary_resolution());

        displays.render_scene(scene, None)?;

        // Never show the undefined contents of a buffer that was not drawn yet
        if displays.is_first_frame() {
            displays.set_outputs_enabled(true)?;
        }

        // Effects may release what this frame drew, so only after both draws
        scene.update_effects();

        displays.wait_for_sync();

        // Everything registered up to here is no longer referenced by a frame
        let staged = self.context.deletion.trigger_stage();
        if staged > 0 {
            log::trace!("frame {}: staged {staged} deletions", self.frames);
        }

        self.frames += 1;
        if let Some(limit) = self.context.settings.max_frames {
            if self.frames >= limit && !self.context.lifecycle.should_exit() {
                log::info!("frame limit {limit} reached");
                self.context.lifecycle.request_exit();
            }
        }
        Ok(())
    }

    fn poll_channels(&mut self, scene: &mut dyn SceneRoot, resolution: Resolution) {
        let RenderContext {
            channels,
            lifecycle,
            host,
            ..
        } = &mut *self.context;

        for channel in channels.iter_mut() {
            let Some(snapshot) = channel.poll(resolution.width, resolution.height) else {
                continue;
            };

            if snapshot.just_pressed(QUIT_BUTTON) {
                log::info!("quit pressed on channel {}", snapshot.channel.0);
                lifecycle.request_exit();
            } else if snapshot.just_pressed(HOME_BUTTON) {
                log::info!("home pressed on channel {}", snapshot.channel.0);
                host.launch_menu();
                lifecycle.request_menu();
            }

            scene.update(&snapshot);

            if scene.take_pointer_invalidation(snapshot.channel) || channel.invalidation_requested() {
                channel.invalidate_pointer();
                channel.clear_invalidation_request();
            }
        }
    }

    fn fade_out(
        &mut self,
        displays: &mut DisplayPair,
        scene: &mut dyn SceneRoot,
    ) -> Result<(), LoopError> {
        for opacity in fade_levels(self.context.settings.fade_step) {
            displays.render_scene(scene, Some(opacity))?;
            scene.update_effects();
            displays.wait_for_sync();
        }

        // One last cleared black screen
        displays.render_blank()?;
        displays.wait_for_sync();
        displays.set_outputs_enabled(false)
    }

    fn drain(&mut self) {
        let deletion = &self.context.deletion;
        let settings = &self.context.settings;

        match deletion.drain(settings.drain_poll, settings.drain_timeout) {
            DrainOutcome::Drained => {
                log::info!("deferred deletions drained ({} released)", deletion.released_count());
            }
            DrainOutcome::TimedOut { remaining } => {
                log::warn!("drain timed out; leaking {remaining} deferred entries");
            }
        }
    }
}

/// Application shell: owns resources, music, controllers and the deletion
/// queue, and runs the render loop on its own thread.
pub struct Application {
    config: AppConfig,
    resources: Resources,
    music: Option<BackgroundMusic>,
    context: RenderContext,
}

impl Application {
    pub fn new(
        config: AppConfig,
        resources: Resources,
        channels: ChannelSet,
        audio: Box<dyn AudioSink>,
        host: Box<dyn HostMenu>,
    ) -> Result<Self, LoopError> {
        config.validate()?;
        let deletion = Arc::new(DeletionQueue::new()?);

        let music = match resources.get(BACKGROUND_MUSIC) {
            Some(data) => Some(BackgroundMusic::start(
                audio,
                data,
                config.music_volume,
                config.music_loop,
            )),
            None => {
                log::warn!("no {BACKGROUND_MUSIC} in resources, running without music");
                None
            }
        };

        let context = RenderContext {
            channels,
            lifecycle: Lifecycle::new(config.exit_code),
            deletion,
            host,
            settings: LoopSettings::from_config(&config),
        };

        Ok(Self {
            config,
            resources,
            music,
            context,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Writer for the exit flag, usable from any thread
    pub fn exit_handle(&self) -> ExitHandle {
        self.context.lifecycle.handle()
    }

    pub fn deletion_queue(&self) -> Arc<DeletionQueue> {
        Arc::clone(&self.context.deletion)
    }

    pub fn menu_requested(&self) -> bool {
        self.context.lifecycle.menu_requested()
    }

    /// Run the loop on the render thread and wait for it to finish
    pub fn exec<F>(&mut self, build: F) -> Result<ExitCode, LoopError>
    where
        F: FnOnce(StageContext<'_>) -> Result<Stage, LoopError> + Send,
    {
        let Self {
            config,
            resources,
            context,
            ..
        } = self;
        let stack_size = config.render_stack_size;
        let render_core = config.render_core;

        thread::scope(|scope| {
            let render = thread::Builder::new()
                .name("render".to_string())
                .stack_size(stack_size)
                .spawn_scoped(scope, move || {
                    promote_render_thread(render_core);
                    let deletion = Arc::clone(&context.deletion);
                    let stage_context = StageContext {
                        config: &*config,
                        resources: &*resources,
                        deletion: &deletion,
                    };
                    RenderLoop::new(context).run(|| build(stage_context))
                })
                .map_err(|source| LoopError::SpawnThread {
                    name: "render",
                    source,
                })?;

            render.join().map_err(|_| LoopError::RenderThreadPanicked)?
        })
    }
}

impl Drop for Application {
    fn drop(&mut self) {
        log::info!("destroy music");
        self.music.take();

        log::info!("destroy controllers");
        self.context.channels.clear();

        // Pipeline teardown may have registered more entries after the loop drained
        log::info!("destroy deferred deletion queue");
        let settings = &self.context.settings;
        if let DrainOutcome::TimedOut { remaining } = self
            .context
            .deletion
            .drain(settings.drain_poll, settings.drain_timeout)
        {
            log::warn!("leaking {remaining} deferred entries at exit");
        }

        log::info!("clear resources");
        self.resources.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fade_levels_are_monotonic_and_below_full() {
        let levels: Vec<f32> = fade_levels(10).collect();
        assert_eq!(levels.len(), 26);
        assert_eq!(levels[0], 0.0);
        assert!(levels.windows(2).all(|w| w[0] < w[1]));
        assert!(*levels.last().unwrap() < 1.0);
    }

    #[test]
    fn fade_step_zero_treated_as_one() {
        assert_eq!(fade_levels(0).count(), 255);
        assert_eq!(fade_levels(255).count(), 1);
    }

    #[test]
    fn missing_core_leaves_thread_unpinned() {
        let placement = std::thread::spawn(|| promote_render_thread(Some(usize::MAX)))
            .join()
            .unwrap();
        assert!(!placement.pinned);
    }

    #[test]
    fn no_core_requested_skips_pinning() {
        let placement = std::thread::spawn(|| promote_render_thread(None)).join().unwrap();
        assert!(!placement.pinned);
    }

    #[test]
    fn settings_follow_config() {
        let config = AppConfig {
            fade_step: 20,
            max_frames: Some(3),
            drain_timeout_ms: Some(40),
            ..AppConfig::default()
        };
        let settings = LoopSettings::from_config(&config);
        assert_eq!(settings.fade_step, 20);
        assert_eq!(settings.max_frames, Some(3));
        assert_eq!(settings.drain_timeout, Some(Duration::from_millis(40)));
    }
}
