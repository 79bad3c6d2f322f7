//! G1 locomotion runtime — drives a pretrained walking policy inside a
//! simulated physics/rendering host.
//!
//! Builds the policy observation from the robot state, runs ONNX
//! inference at a sub-multiple of the physics rate, and applies joint
//! position targets every physics step, all paced by a dual-rate
//! wall-clock scheduler.
//!
//! Usage:
//!   g1-locomotion-runtime --policy-path policy.onnx --env-config-path g1_env.json [OPTIONS]

mod command;
mod config;
mod control;
mod host;
mod observation;
mod policy;
mod scheduler;
mod session;
mod teleop;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use host::LoopbackHost;
use scheduler::DualRateScheduler;
use session::Session;

/// Policy-driven locomotion runtime for the G1 humanoid.
#[derive(Parser, Debug)]
#[command(name = "g1-locomotion-runtime")]
#[command(about = "Decimated policy control loop with a dual-rate simulation scheduler")]
struct Args {
    /// Path to the trained policy weights (ONNX).
    #[arg(long)]
    policy_path: PathBuf,

    /// Path to the companion policy environment config (JSON).
    #[arg(long)]
    env_config_path: PathBuf,

    /// Physics step rate in Hz.
    #[arg(long, default_value_t = 100.0)]
    physics_rate: f64,

    /// Render rate in Hz.
    #[arg(long, default_value_t = 30.0)]
    render_rate: f64,

    /// Maximum physics catch-up steps per scheduler poll.
    #[arg(long, default_value_t = 8)]
    max_catchup_steps: u32,

    /// Stop after this many physics steps (loopback host runs only).
    #[arg(long)]
    max_ticks: Option<u64>,
}

fn main() -> Result<()> {
    // Initialize structured JSON logging
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    tracing::info!("G1 locomotion runtime starting");
    tracing::info!("policy weights: {}", args.policy_path.display());
    tracing::info!("env config: {}", args.env_config_path.display());
    tracing::info!(
        "physics rate: {} Hz, render rate: {} Hz",
        args.physics_rate,
        args.render_rate
    );

    let (onnx_policy, env_config) =
        policy::load_policy_artifacts(&args.policy_path, &args.env_config_path)?;

    tracing::info!(
        decimation = env_config.decimation,
        action_scale = env_config.action_scale,
        "policy runs at {} Hz",
        args.physics_rate / f64::from(env_config.decimation)
    );

    let scheduler = DualRateScheduler::new(
        args.physics_rate,
        args.render_rate,
        args.max_catchup_steps,
    );
    let mut session = Session::new(env_config, Box::new(onnx_policy), scheduler);

    // No in-process binding to a full physics host exists; the loopback
    // host feeds applied targets back as joint state.
    let mut host = LoopbackHost::new(args.physics_rate, args.max_ticks);
    session.run(&mut host)
}
