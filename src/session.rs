//! Session lifecycle: owns the scheduler, the policy, the command channel,
//! and at most one active controller instance.
//!
//! All (re)initialization goes through `initialize()` — startup and the
//! ESC reset take the same path, so a repeated trigger can never leave two
//! live controllers or two keyboard subscriptions behind.

use anyhow::Result;
use crossbeam_channel::Receiver;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::command::CommandChannel;
use crate::config::EnvConfig;
use crate::control::LocomotionController;
use crate::host::{KeyboardSubscription, PolicyRobotHost};
use crate::policy::Policy;
use crate::scheduler::DualRateScheduler;
use crate::teleop::Teleop;

pub struct Session {
    config: EnvConfig,
    policy: Box<dyn Policy>,
    scheduler: DualRateScheduler,
    commands: CommandChannel,
    reset_rx: Option<Receiver<()>>,
    keyboard: Option<KeyboardSubscription>,
    controller: Option<LocomotionController>,
    needs_init: bool,
    tick: u64,
}

impl Session {
    /// The policy is loaded once, up front; resets rebuild the controller
    /// around it without reloading.
    pub fn new(config: EnvConfig, policy: Box<dyn Policy>, scheduler: DualRateScheduler) -> Self {
        Self {
            config,
            policy,
            scheduler,
            commands: CommandChannel::new(),
            reset_rx: None,
            keyboard: None,
            controller: None,
            needs_init: true,
            tick: 0,
        }
    }

    /// The single authoritative INIT -> RUNNING transition.
    ///
    /// Tears down the previous controller and keyboard subscription before
    /// constructing replacements, resets the world, warm-up initializes
    /// the articulation, and realigns both scheduler clocks.
    pub fn initialize<H: PolicyRobotHost>(&mut self, host: &mut H, now: f64) -> Result<()> {
        // Teardown first: the old subscription must be released before a
        // new one is registered.
        self.controller = None;
        self.keyboard = None;
        self.tick = 0;

        let commands = CommandChannel::new();
        self.commands = commands.clone();
        let (teleop, reset_rx) = Teleop::new(commands);
        self.reset_rx = Some(reset_rx);

        host.reset_world()?;
        host.initialize()?;

        self.controller = Some(LocomotionController::new(&self.config));
        let teleop = Arc::new(teleop);
        self.keyboard =
            Some(host.subscribe_keyboard(Box::new(move |event| teleop.on_key_event(event))));

        self.scheduler.align(now);
        self.needs_init = false;

        tracing::info!("session initialized");
        tracing::info!("controls: UP forward, DOWN stop, LEFT rotate left, RIGHT rotate right, ESC reset");
        Ok(())
    }

    /// Mark the session for reinitialization on the next poll. Idempotent.
    pub fn request_reset(&mut self) {
        self.needs_init = true;
    }

    /// One pass of the drive loop: consume pending reset requests, run the
    /// physics steps the scheduler owes (control step per physics step),
    /// and render at most once.
    pub fn poll<H: PolicyRobotHost>(&mut self, host: &mut H, now: f64) -> Result<()> {
        if let Some(reset_rx) = &self.reset_rx {
            if reset_rx.try_recv().is_ok() {
                self.needs_init = true;
            }
        }
        if self.needs_init {
            tracing::info!("(re)initializing session");
            self.initialize(host, now)?;
        }

        let plan = self.scheduler.poll(now);
        let dt = self.scheduler.physics_period();
        for _ in 0..plan.physics_steps {
            host.step_physics()?;
            let command = self.commands.read();
            if let Some(controller) = self.controller.as_mut() {
                controller.step(dt, command, host, self.policy.as_mut())?;
            }
            self.tick += 1;
        }
        if plan.render {
            host.render()?;
        }
        Ok(())
    }

    /// Outer host loop: poll while the host plays, idle while it is
    /// paused, return when it shuts down.
    pub fn run<H: PolicyRobotHost>(&mut self, host: &mut H) -> Result<()> {
        let epoch = Instant::now();
        while host.is_running() {
            if host.is_playing() {
                let now = epoch.elapsed().as_secs_f64();
                self.poll(host, now)?;
                spin_sleep::sleep(Duration::from_micros(500));
            } else {
                spin_sleep::sleep(Duration::from_millis(10));
            }
        }
        Ok(())
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn has_active_controller(&self) -> bool {
        self.controller.is_some()
    }
}
