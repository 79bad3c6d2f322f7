//! Capability interfaces for the external simulation host.
//!
//! The physics world, the rendering stack, and the robot articulation are
//! owned by the host process; the runtime only touches them through the
//! narrow traits below. `LoopbackHost` is a self-contained stand-in that
//! feeds applied joint targets back into the reported state, used by tests
//! and by the binary when no real host binding is present.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::observation::NUM_JOINTS;

/// Snapshot of the robot state, read once per policy evaluation.
#[derive(Debug, Clone)]
pub struct RobotState {
    /// Base position in the world frame.
    pub position: [f64; 3],
    /// Base orientation quaternion (w, x, y, z), body to world.
    pub orientation: [f64; 4],
    /// Base linear velocity in the world frame.
    pub linear_velocity: [f64; 3],
    /// Base angular velocity in the world frame.
    pub angular_velocity: [f64; 3],
    /// Joint positions, `NUM_JOINTS` entries.
    pub joint_positions: Vec<f64>,
    /// Joint velocities, `NUM_JOINTS` entries.
    pub joint_velocities: Vec<f64>,
}

/// Read access to the robot state held by the host.
pub trait RobotStateSource {
    fn linear_velocity(&self) -> [f64; 3];
    fn angular_velocity(&self) -> [f64; 3];
    /// World pose as (position, orientation quaternion in (w, x, y, z)).
    fn world_pose(&self) -> ([f64; 3], [f64; 4]);
    fn joint_positions(&self) -> Vec<f64>;
    fn joint_velocities(&self) -> Vec<f64>;

    /// Assemble a full state snapshot. Only valid once the articulation
    /// has been initialized.
    fn snapshot(&self) -> RobotState {
        let (position, orientation) = self.world_pose();
        RobotState {
            position,
            orientation,
            linear_velocity: self.linear_velocity(),
            angular_velocity: self.angular_velocity(),
            joint_positions: self.joint_positions(),
            joint_velocities: self.joint_velocities(),
        }
    }
}

/// Actuation interface of the robot articulation.
pub trait Articulation {
    /// One-time warm-up after a world reset, before the first control step.
    fn initialize(&mut self) -> Result<()>;

    /// Apply per-joint position targets, `NUM_JOINTS` entries.
    fn apply_joint_targets(&mut self, targets: &[f64]) -> Result<()>;
}

/// A keyboard event delivered by the host's input context.
#[derive(Debug, Clone)]
pub struct KeyEvent {
    /// Host key name, e.g. `"UP"` or `"ESCAPE"`.
    pub key: String,
    /// True on press, false on release.
    pub pressed: bool,
}

/// Handler invoked by the host for each keyboard event. May be called from
/// a context other than the control loop.
pub type KeyHandler = Box<dyn Fn(&KeyEvent) + Send + Sync>;

/// Owned keyboard subscription; unsubscribes from the host on drop so a
/// subscription cannot survive a session reset.
pub struct KeyboardSubscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl KeyboardSubscription {
    pub fn new(unsubscribe: impl FnOnce() + Send + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }
}

impl Drop for KeyboardSubscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

/// Host loop and world control.
pub trait SimulationHost {
    fn is_running(&self) -> bool;
    fn is_playing(&self) -> bool;

    /// Advance the physics world by one fixed step, no rendering.
    fn step_physics(&mut self) -> Result<()>;

    /// Render one frame.
    fn render(&mut self) -> Result<()>;

    /// Reset the world to its initial configuration.
    fn reset_world(&mut self) -> Result<()>;

    /// Register a keyboard handler. Dropping the returned subscription
    /// unregisters it.
    fn subscribe_keyboard(&mut self, handler: KeyHandler) -> KeyboardSubscription;
}

/// Everything the session needs from a host that carries the robot.
pub trait PolicyRobotHost: SimulationHost + RobotStateSource + Articulation {}

impl<T: SimulationHost + RobotStateSource + Articulation> PolicyRobotHost for T {}

// ── Loopback host ──

type HandlerMap = Arc<Mutex<HashMap<u64, KeyHandler>>>;

/// Standing height of the G1 base.
const BASE_HEIGHT: f64 = 0.76;

/// Self-contained host: applied joint targets are tracked with a
/// first-order lag and fed back as the reported joint state. The base
/// stays at standing height with identity orientation.
pub struct LoopbackHost {
    dt: f64,
    max_ticks: Option<u64>,
    physics_steps: u64,
    renders: u64,
    resets: u64,
    joint_positions: Vec<f64>,
    joint_velocities: Vec<f64>,
    targets: Vec<f64>,
    handlers: HandlerMap,
    next_handler_id: u64,
}

impl LoopbackHost {
    pub fn new(physics_rate: f64, max_ticks: Option<u64>) -> Self {
        Self {
            dt: 1.0 / physics_rate,
            max_ticks,
            physics_steps: 0,
            renders: 0,
            resets: 0,
            joint_positions: vec![0.0; NUM_JOINTS],
            joint_velocities: vec![0.0; NUM_JOINTS],
            targets: vec![0.0; NUM_JOINTS],
            handlers: Arc::new(Mutex::new(HashMap::new())),
            next_handler_id: 0,
        }
    }

    /// Deliver a keyboard event to every registered handler, as the host's
    /// input context would.
    pub fn emit_key(&self, key: &str, pressed: bool) {
        let event = KeyEvent {
            key: key.to_string(),
            pressed,
        };
        for handler in lock_handlers(&self.handlers).values() {
            handler(&event);
        }
    }

    pub fn subscription_count(&self) -> usize {
        lock_handlers(&self.handlers).len()
    }

    pub fn physics_step_count(&self) -> u64 {
        self.physics_steps
    }

    pub fn render_count(&self) -> u64 {
        self.renders
    }

    pub fn reset_count(&self) -> u64 {
        self.resets
    }

    pub fn last_targets(&self) -> &[f64] {
        &self.targets
    }
}

fn lock_handlers(handlers: &HandlerMap) -> MutexGuard<'_, HashMap<u64, KeyHandler>> {
    handlers.lock().unwrap_or_else(|e| e.into_inner())
}

impl RobotStateSource for LoopbackHost {
    fn linear_velocity(&self) -> [f64; 3] {
        [0.0; 3]
    }

    fn angular_velocity(&self) -> [f64; 3] {
        [0.0; 3]
    }

    fn world_pose(&self) -> ([f64; 3], [f64; 4]) {
        ([0.0, 0.0, BASE_HEIGHT], [1.0, 0.0, 0.0, 0.0])
    }

    fn joint_positions(&self) -> Vec<f64> {
        self.joint_positions.clone()
    }

    fn joint_velocities(&self) -> Vec<f64> {
        self.joint_velocities.clone()
    }
}

impl Articulation for LoopbackHost {
    fn initialize(&mut self) -> Result<()> {
        self.joint_velocities = vec![0.0; NUM_JOINTS];
        Ok(())
    }

    fn apply_joint_targets(&mut self, targets: &[f64]) -> Result<()> {
        self.targets = targets.to_vec();
        Ok(())
    }
}

impl SimulationHost for LoopbackHost {
    fn is_running(&self) -> bool {
        self.max_ticks.map_or(true, |max| self.physics_steps < max)
    }

    fn is_playing(&self) -> bool {
        true
    }

    fn step_physics(&mut self) -> Result<()> {
        // Joints track their targets with a first-order lag.
        for i in 0..NUM_JOINTS {
            let previous = self.joint_positions[i];
            let next = previous + (self.targets[i] - previous) * 0.5;
            self.joint_velocities[i] = (next - previous) / self.dt;
            self.joint_positions[i] = next;
        }
        self.physics_steps += 1;
        Ok(())
    }

    fn render(&mut self) -> Result<()> {
        self.renders += 1;
        Ok(())
    }

    fn reset_world(&mut self) -> Result<()> {
        self.joint_positions = vec![0.0; NUM_JOINTS];
        self.joint_velocities = vec![0.0; NUM_JOINTS];
        self.targets = vec![0.0; NUM_JOINTS];
        self.resets += 1;
        Ok(())
    }

    fn subscribe_keyboard(&mut self, handler: KeyHandler) -> KeyboardSubscription {
        let id = self.next_handler_id;
        self.next_handler_id += 1;
        lock_handlers(&self.handlers).insert(id, handler);

        let handlers = Arc::clone(&self.handlers);
        KeyboardSubscription::new(move || {
            lock_handlers(&handlers).remove(&id);
        })
    }
}
