use std::time::{Duration, Instant};

use tract_onnx::prelude::*;

use crate::config::NodeNames;
use crate::network::Network;

/// Runs the network once, then `repeats` timed benchmark passes. Returns
/// the output of the last pass.
pub fn run_inference<N: Network>(
    net: &mut N,
    blob: &Tensor,
    nodes: &NodeNames,
    repeats: usize,
) -> TractResult<Tensor> {
    net.set_input(&nodes.input, blob.clone())?;
    let output = net.forward(&nodes.output)?;
    if repeats == 0 {
        return Ok(output);
    }
    let (output, avg) = bench(net, blob, nodes, repeats)?;
    info!("Bench ran {} times, {:.3} ms/iter", repeats, avg.as_secs_f64() * 1e3);
    Ok(output)
}

fn bench<N: Network>(
    net: &mut N,
    blob: &Tensor,
    nodes: &NodeNames,
    repeats: usize,
) -> TractResult<(Tensor, Duration)> {
    let start = Instant::now();
    let mut output = None;
    for iter in 0..repeats {
        trace!("bench loop {}", iter);
        net.set_input(&nodes.input, blob.clone())?;
        output = Some(net.forward(&nodes.output)?);
    }
    let avg = Duration::from_secs_f64(start.elapsed().as_secs_f64() / repeats as f64);
    let Some(output) = output else { anyhow::bail!("No benchmark pass ran") };
    Ok((output, avg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::ComputeTarget;

    /// Returns its input scaled by the number of forward passes so far.
    #[derive(Default)]
    struct Drifting {
        input: Option<(String, Tensor)>,
        forwards: usize,
        fail_at: Option<usize>,
    }

    impl Network for Drifting {
        fn set_preferable_target(&mut self, _target: ComputeTarget) {}

        fn set_input(&mut self, name: &str, blob: Tensor) -> TractResult<()> {
            self.input = Some((name.to_string(), blob));
            Ok(())
        }

        fn forward(&mut self, output: &str) -> TractResult<Tensor> {
            assert_eq!(output, "prob");
            let (name, blob) = self.input.take().expect("input consumed by forward");
            assert_eq!(name, "data");
            self.forwards += 1;
            if self.fail_at == Some(self.forwards) {
                anyhow::bail!("device lost at pass {}", self.forwards)
            }
            let k = self.forwards as f32;
            Ok(blob.into_array::<f32>()?.mapv(|v| v * k).into())
        }
    }

    #[test]
    fn warm_up_plus_repeats() {
        let mut net = Drifting::default();
        let blob = tensor1(&[1f32, 2.0]);
        let out = run_inference(&mut net, &blob, &NodeNames::default(), 10).unwrap();
        assert_eq!(net.forwards, 11);
        assert_eq!(out, tensor1(&[11f32, 22.0]));
    }

    #[test]
    fn no_repeats() {
        let mut net = Drifting::default();
        let blob = tensor1(&[3f32]);
        let out = run_inference(&mut net, &blob, &NodeNames::default(), 0).unwrap();
        assert_eq!(net.forwards, 1);
        assert_eq!(out, tensor1(&[3f32]));
    }

    #[test]
    fn bench_failure_is_reported() {
        let mut net = Drifting { fail_at: Some(4), ..Drifting::default() };
        let err = run_inference(&mut net, &tensor1(&[1f32]), &NodeNames::default(), 10);
        assert!(err.unwrap_err().to_string().contains("pass 4"));
        assert_eq!(net.forwards, 4);
    }
}
