//! Keyboard teleoperation: discrete command symbols mapped to fixed
//! velocity triples, plus the reset trigger.
//!
//! Press sets the command, any release stops the robot, unrecognized keys
//! are ignored. ESC requests a session reset; requests collapse into a
//! single pending reset.

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::command::{CommandChannel, CommandVector};
use crate::host::KeyEvent;

/// Host key name that triggers a session reset.
pub const RESET_KEY: &str = "ESCAPE";

/// The five discrete movement symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandSymbol {
    Forward,
    Stop,
    Left,
    Right,
    Zero,
}

impl CommandSymbol {
    /// Map a host key name to a symbol. Unknown keys map to `None`.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "UP" => Some(Self::Forward),
            "DOWN" => Some(Self::Stop),
            "LEFT" => Some(Self::Left),
            "RIGHT" => Some(Self::Right),
            "ZEROS" => Some(Self::Zero),
            _ => None,
        }
    }

    /// The fixed velocity triple for this symbol.
    pub fn command(self) -> CommandVector {
        match self {
            Self::Forward => CommandVector::new(0.5, 0.0, 0.0),
            Self::Left => CommandVector::new(0.0, 0.0, 1.0),
            Self::Right => CommandVector::new(0.0, 0.0, -1.0),
            Self::Stop | Self::Zero => CommandVector::ZERO,
        }
    }
}

/// Keyboard event handler feeding the command mailbox and the reset line.
pub struct Teleop {
    commands: CommandChannel,
    reset_tx: Sender<()>,
}

impl Teleop {
    /// Wire a teleop handler to a command channel. Returns the receiving
    /// end of the reset line.
    pub fn new(commands: CommandChannel) -> (Self, Receiver<()>) {
        let (reset_tx, reset_rx) = bounded(1);
        (Self { commands, reset_tx }, reset_rx)
    }

    /// Handle one keyboard event. Called from the host's input context.
    pub fn on_key_event(&self, event: &KeyEvent) {
        if event.pressed {
            if event.key == RESET_KEY {
                tracing::info!("reset requested");
                let _ = self.reset_tx.try_send(());
                return;
            }
            if let Some(symbol) = CommandSymbol::from_key(&event.key) {
                tracing::debug!(key = %event.key, "movement command");
                self.commands.write(symbol.command());
            }
        } else {
            // Robot stops on any key release.
            self.commands.clear();
        }
    }
}
