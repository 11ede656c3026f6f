use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Exit code handed back to the host once the loop terminates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitCode {
    /// Ask the host to load the application again
    #[default]
    Relaunch,
    /// Final exit
    Exit,
}

impl ExitCode {
    /// Integer value the host environment understands
    pub const fn code(self) -> i32 {
        match self {
            ExitCode::Relaunch => -3,
            ExitCode::Exit => 0,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -3 => Some(ExitCode::Relaunch),
            0 => Some(ExitCode::Exit),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct Flags {
    exit: AtomicBool,
    menu_requested: AtomicBool,
}

/// Application lifecycle: the exit flag and the exit code.
///
/// The loop owns the `Lifecycle` and is the only reader of the exit flag.
/// Anything else that needs to stop the loop (a frame limit, a signal
/// handler, a test) holds an [`ExitHandle`].
#[derive(Debug)]
pub struct Lifecycle {
    flags: Arc<Flags>,
    exit_code: ExitCode,
}

impl Lifecycle {
    pub fn new(exit_code: ExitCode) -> Self {
        Self {
            flags: Arc::new(Flags::default()),
            exit_code,
        }
    }

    /// Cloneable writer for the exit flag
    pub fn handle(&self) -> ExitHandle {
        ExitHandle {
            flags: Arc::clone(&self.flags),
        }
    }

    pub fn should_exit(&self) -> bool {
        self.flags.exit.load(Ordering::Acquire)
    }

    pub fn request_exit(&self) {
        self.flags.exit.store(true, Ordering::Release);
    }

    /// Record a hand-off to the host menu. Also raises the exit flag.
    pub fn request_menu(&self) {
        self.flags.menu_requested.store(true, Ordering::Release);
        self.request_exit();
    }

    pub fn menu_requested(&self) -> bool {
        self.flags.menu_requested.load(Ordering::Acquire)
    }

    pub fn exit_code(&self) -> ExitCode {
        self.exit_code
    }

    pub fn set_exit_code(&mut self, exit_code: ExitCode) {
        self.exit_code = exit_code;
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new(ExitCode::default())
    }
}

/// Shared writer that raises the loop's exit flag from any thread
#[derive(Debug, Clone)]
pub struct ExitHandle {
    flags: Arc<Flags>,
}

impl ExitHandle {
    pub fn request_exit(&self) {
        self.flags.exit.store(true, Ordering::Release);
    }

    pub fn is_exit_requested(&self) -> bool {
        self.flags.exit.load(Ordering::Acquire)
    }
}
