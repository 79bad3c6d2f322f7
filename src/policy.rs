//! Policy model capability — loads the trained network and runs forward
//! passes. Backed by the `ort` crate (ONNX Runtime bindings for Rust).

use anyhow::{bail, Context, Result};
use ndarray::Array2;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;

use crate::config::{resolve, EnvConfig};
use crate::observation::{NUM_JOINTS, OBS_DIM};

/// Opaque inference capability: observation in, action out.
///
/// Implementations are assumed deterministic and reliable once loaded; a
/// wrong-size output is fatal, not retried.
pub trait Policy: Send {
    fn infer(&mut self, observation: &[f64]) -> Result<Vec<f64>>;
}

/// ONNX-backed locomotion policy.
#[derive(Debug)]
pub struct OnnxPolicy {
    session: Session,
    input_name: String,
}

impl OnnxPolicy {
    /// Load the trained policy weights from disk.
    pub fn load(weights_path: &Path) -> Result<Self> {
        if !weights_path.exists() {
            bail!(
                "policy weights not found at {}",
                resolve(weights_path).display()
            );
        }

        let session = Session::builder()
            .context("failed to create ONNX session builder")?
            .commit_from_file(weights_path)
            .with_context(|| {
                format!(
                    "failed to load policy weights {}",
                    resolve(weights_path).display()
                )
            })?;

        let input_name = session.inputs()[0].name().to_string();

        tracing::info!(
            "loaded policy from {} (input: {})",
            weights_path.display(),
            input_name
        );

        Ok(Self {
            session,
            input_name,
        })
    }
}

impl Policy for OnnxPolicy {
    /// Run a forward pass: 123-element observation in, 37-element action out.
    fn infer(&mut self, observation: &[f64]) -> Result<Vec<f64>> {
        if observation.len() != OBS_DIM {
            bail!(
                "observation has {} elements, expected {}",
                observation.len(),
                OBS_DIM
            );
        }

        // Convert to f32 and reshape to [1, obs_dim]
        let obs_f32: Vec<f32> = observation.iter().map(|&x| x as f32).collect();
        let input = Array2::from_shape_vec((1, OBS_DIM), obs_f32)
            .context("failed to create observation array")?;

        let input_tensor = Tensor::from_array(input).context("failed to create input tensor")?;

        let outputs = self
            .session
            .run(ort::inputs![&self.input_name => input_tensor])
            .context("policy inference failed")?;

        let (_, output_data) = outputs[0]
            .try_extract_tensor::<f32>()
            .context("failed to extract action tensor")?;

        let action: Vec<f64> = output_data.iter().map(|&x| x as f64).collect();
        if action.len() != NUM_JOINTS {
            bail!(
                "policy produced {} action values, expected {}",
                action.len(),
                NUM_JOINTS
            );
        }

        Ok(action)
    }
}

/// Load the policy weights and their companion env config. Either file
/// missing aborts startup with the resolved path in the error.
pub fn load_policy_artifacts(
    weights_path: &Path,
    env_config_path: &Path,
) -> Result<(OnnxPolicy, EnvConfig)> {
    let config = EnvConfig::load(env_config_path)?;
    let policy = OnnxPolicy::load(weights_path)?;
    Ok((policy, config))
}
