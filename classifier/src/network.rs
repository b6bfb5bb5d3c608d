use std::fmt;
use std::path::Path;

use tract_onnx::prelude::*;

/// Hardware the forward pass should preferably run on.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComputeTarget {
    #[default]
    Cpu,
    OpenCl,
}

impl fmt::Display for ComputeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComputeTarget::Cpu => write!(f, "cpu"),
            ComputeTarget::OpenCl => write!(f, "opencl"),
        }
    }
}

/// A loaded network: inputs are bound by name, outputs requested by name.
pub trait Network {
    /// Records the preferred target. Not validated until the next forward pass.
    fn set_preferable_target(&mut self, target: ComputeTarget);

    fn set_input(&mut self, name: &str, blob: Tensor) -> TractResult<()>;

    /// Runs the network on the bound inputs and returns the named output.
    fn forward(&mut self, output: &str) -> TractResult<Tensor>;
}

/// Builds a network from a description file and a weights file.
pub trait NetworkLoader {
    type Net: Network;

    fn load(&self, proto: &Path, weights: &Path) -> TractResult<Self::Net>;
}
