use super::canvas::Canvas;
use super::controller::{ChannelId, Snapshot};
use super::pipeline::Target;

/// Root of the drawable scene, driven by the render loop every frame
pub trait SceneRoot: Send {
    /// Apply one channel's input for this frame
    fn update(&mut self, snapshot: &Snapshot);

    /// Draw into the open frame of `target`
    fn draw(&mut self, target: Target, canvas: &mut Canvas);

    /// Advance time-based effects. Called after both outputs are drawn, so
    /// an effect may drop resources here that the frame just used.
    fn update_effects(&mut self);

    /// Take a pending request to invalidate `channel`'s pointer
    fn take_pointer_invalidation(&mut self, _channel: ChannelId) -> bool {
        false
    }
}

/// Host environment that owns the system menu
pub trait HostMenu: Send {
    fn launch_menu(&mut self);
}

/// Host menu that only records the hand-off in the log
#[derive(Debug, Default)]
pub struct LogHostMenu;

impl HostMenu for LogHostMenu {
    fn launch_menu(&mut self) {
        log::info!("handing off to host menu");
    }
}
