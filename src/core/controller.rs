use bitflags::bitflags;
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Number of controller slots polled each frame
pub const MAX_CHANNELS: usize = 5;

/// Largest raw coordinate reported by the touch panel on either axis
pub const TOUCH_RAW_MAX: f32 = 4095.0;

bitflags! {
    /// Button bitmask shared by every channel variant
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Buttons: u32 {
        const A = 1 << 0;
        const B = 1 << 1;
        const X = 1 << 2;
        const Y = 1 << 3;
        const LEFT = 1 << 4;
        const RIGHT = 1 << 5;
        const UP = 1 << 6;
        const DOWN = 1 << 7;
        const L = 1 << 8;
        const R = 1 << 9;
        const ZL = 1 << 10;
        const ZR = 1 << 11;
        const PLUS = 1 << 12;
        const MINUS = 1 << 13;
        const HOME = 1 << 14;
        const TOUCH = 1 << 15;
    }
}

/// Pressing this on any channel ends the loop
pub const QUIT_BUTTON: Buttons = Buttons::MINUS;

/// Pressing this on any channel hands off to the host menu and ends the loop
pub const HOME_BUTTON: Buttons = Buttons::HOME;

/// Slot index of a channel inside the [`ChannelSet`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ChannelId(pub usize);

/// One channel's input for one frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Snapshot {
    pub channel: ChannelId,
    /// Went down this frame
    pub pressed: Buttons,
    /// Went up this frame
    pub released: Buttons,
    /// Currently down
    pub held: Buttons,
    /// Pointer in screen space of the primary output
    pub pointer: Vec2,
    pub pointer_valid: bool,
}

impl Snapshot {
    pub fn just_pressed(&self, buttons: Buttons) -> bool {
        self.pressed.intersects(buttons)
    }

    pub fn is_held(&self, buttons: Buttons) -> bool {
        self.held.contains(buttons)
    }
}

/// Raw device report in the device's own coordinate space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawReport {
    pub held: Buttons,
    pub pointer: Option<Vec2>,
}

/// Source of raw reports for a channel.
///
/// `read` is called exactly once per frame. `None` means the device had
/// nothing new this frame.
pub trait InputDevice: Send {
    fn read(&mut self) -> Option<RawReport>;
}

/// Device that never reports anything. Fills slots with no hardware behind them.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdleDevice;

impl InputDevice for IdleDevice {
    fn read(&mut self) -> Option<RawReport> {
        None
    }
}

/// State common to every channel variant
struct ChannelState {
    id: ChannelId,
    device: Box<dyn InputDevice>,
    previous_held: Buttons,
    pointer: Vec2,
    pointer_valid: bool,
    invalidation_requested: bool,
}

impl ChannelState {
    fn new(device: Box<dyn InputDevice>) -> Self {
        Self {
            id: ChannelId::default(),
            device,
            previous_held: Buttons::empty(),
            pointer: Vec2::ZERO,
            pointer_valid: false,
            invalidation_requested: false,
        }
    }

    fn snapshot(&mut self, held: Buttons, pointer: Option<Vec2>) -> Snapshot {
        let pressed = held & !self.previous_held;
        let released = self.previous_held & !held;
        self.previous_held = held;

        match pointer {
            Some(position) => {
                self.pointer = position;
                self.pointer_valid = true;
            }
            None => {
                // Pointer lost: the last position is stale from now on
                if self.pointer_valid {
                    self.invalidation_requested = true;
                }
                self.pointer_valid = false;
            }
        }

        Snapshot {
            channel: self.id,
            pressed,
            released,
            held,
            pointer: self.pointer,
            pointer_valid: self.pointer_valid,
        }
    }
}

/// Controller channel over the closed set of supported device kinds
pub enum ControllerChannel {
    /// Companion touch screen; raw coordinates in `0..=TOUCH_RAW_MAX`
    Pointer(PointerChannel),
    /// Remote with an aiming pointer; normalized coordinates in `[-1, 1]`, +y up
    Remote(RemoteChannel),
}

pub struct PointerChannel {
    state: ChannelState,
}

pub struct RemoteChannel {
    state: ChannelState,
}

impl ControllerChannel {
    pub fn pointer(device: impl InputDevice + 'static) -> Self {
        ControllerChannel::Pointer(PointerChannel {
            state: ChannelState::new(Box::new(device)),
        })
    }

    pub fn remote(device: impl InputDevice + 'static) -> Self {
        ControllerChannel::Remote(RemoteChannel {
            state: ChannelState::new(Box::new(device)),
        })
    }

    pub fn id(&self) -> ChannelId {
        self.state().id
    }

    /// Poll the device and rescale its pointer to a `width` x `height` screen.
    ///
    /// Returns `None` when the device had nothing new. Callers must skip the
    /// channel for this frame rather than treat it as "all released".
    pub fn poll(&mut self, width: u32, height: u32) -> Option<Snapshot> {
        let screen = Vec2::new(width.max(1) as f32 - 1.0, height.max(1) as f32 - 1.0);

        match self {
            ControllerChannel::Pointer(channel) => {
                let report = channel.state.device.read()?;
                let pointer = report
                    .pointer
                    .map(|raw| (raw / TOUCH_RAW_MAX * screen).clamp(Vec2::ZERO, screen));
                Some(channel.state.snapshot(report.held, pointer))
            }
            ControllerChannel::Remote(channel) => {
                let report = channel.state.device.read()?;
                let pointer = report
                    .pointer
                    .filter(|aim| aim.abs().max_element() <= 1.0)
                    .map(|aim| {
                        let unit = Vec2::new((aim.x + 1.0) * 0.5, (1.0 - aim.y) * 0.5);
                        (unit * screen).clamp(Vec2::ZERO, screen)
                    });
                Some(channel.state.snapshot(report.held, pointer))
            }
        }
    }

    /// Whether the channel wants its pointer invalidated this frame
    pub fn invalidation_requested(&self) -> bool {
        self.state().invalidation_requested
    }

    pub fn clear_invalidation_request(&mut self) {
        self.state_mut().invalidation_requested = false;
    }

    /// Forget the last pointer position so it is never drawn again
    pub fn invalidate_pointer(&mut self) {
        let state = self.state_mut();
        state.pointer = Vec2::ZERO;
        state.pointer_valid = false;
    }

    pub fn pointer_valid(&self) -> bool {
        self.state().pointer_valid
    }

    fn state(&self) -> &ChannelState {
        match self {
            ControllerChannel::Pointer(channel) => &channel.state,
            ControllerChannel::Remote(channel) => &channel.state,
        }
    }

    fn state_mut(&mut self) -> &mut ChannelState {
        match self {
            ControllerChannel::Pointer(channel) => &mut channel.state,
            ControllerChannel::Remote(channel) => &mut channel.state,
        }
    }
}

/// Fixed, ordered set of controller slots. Slot order is controller priority.
pub struct ChannelSet {
    slots: [Option<ControllerChannel>; MAX_CHANNELS],
}

impl ChannelSet {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
        }
    }

    /// Add a channel in `slot` and return the set (builder style)
    pub fn with_channel(mut self, slot: usize, channel: ControllerChannel) -> Self {
        self.insert(slot, channel);
        self
    }

    /// Put a channel into `slot`, replacing what was there.
    /// Slots past [`MAX_CHANNELS`] are ignored.
    pub fn insert(&mut self, slot: usize, mut channel: ControllerChannel) -> Option<ControllerChannel> {
        let entry = self.slots.get_mut(slot)?;
        channel.state_mut().id = ChannelId(slot);
        entry.replace(channel)
    }

    pub fn get_mut(&mut self, id: ChannelId) -> Option<&mut ControllerChannel> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Assigned channels in priority order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ControllerChannel> {
        self.slots.iter_mut().flatten()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every channel and its device
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
    }
}

impl Default for ChannelSet {
    fn default() -> Self {
        Self::new()
    }
}
