//! Single-slot movement-command mailbox.
//!
//! The input context writes the latest velocity command; the control loop
//! reads it once per physics step. Last write wins, no queue, no
//! backpressure.

use std::sync::{Arc, Mutex, MutexGuard};

/// Base velocity command: forward, lateral, and yaw rates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CommandVector {
    pub vx: f64,
    pub vy: f64,
    pub wz: f64,
}

impl CommandVector {
    /// The stop command.
    pub const ZERO: CommandVector = CommandVector {
        vx: 0.0,
        vy: 0.0,
        wz: 0.0,
    };

    pub fn new(vx: f64, vy: f64, wz: f64) -> Self {
        Self { vx, vy, wz }
    }
}

/// Shared single-slot command mailbox.
///
/// Clones share the same slot, so the keyboard handler can hold one end
/// while the control loop reads the other.
#[derive(Debug, Clone, Default)]
pub struct CommandChannel {
    slot: Arc<Mutex<CommandVector>>,
}

impl CommandChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unconditionally replace the stored command.
    pub fn write(&self, command: CommandVector) {
        *self.lock() = command;
    }

    /// Latest written command.
    pub fn read(&self) -> CommandVector {
        *self.lock()
    }

    /// Reset the stored command to the stop vector.
    pub fn clear(&self) {
        self.write(CommandVector::ZERO);
    }

    fn lock(&self) -> MutexGuard<'_, CommandVector> {
        // The slot holds a Copy value, so a poisoned lock is still usable.
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }
}
