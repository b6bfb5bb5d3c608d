//! tract backed [`Network`]: an ONNX graph for the description, its
//! external-data initializers read from the weights file.
use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, bail};
use tract_onnx::model::ParseResult;
use tract_onnx::pb;
use tract_onnx::prelude::*;

use crate::network::{ComputeTarget, Network, NetworkLoader};

type Plan = Box<dyn Fn(TVec<TValue>) -> TractResult<TVec<TValue>>>;

/// What a plan was built for. A forward pass with other inputs or another
/// output needs a new plan.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PlanKey {
    inputs: Vec<(String, DatumType, TVec<usize>)>,
    output: String,
}

pub struct OnnxLoader {
    framework: tract_onnx::Onnx,
}

impl Default for OnnxLoader {
    fn default() -> OnnxLoader {
        OnnxLoader { framework: tract_onnx::onnx() }
    }
}

impl NetworkLoader for OnnxLoader {
    type Net = OnnxNetwork;

    fn load(&self, proto: &Path, weights: &Path) -> TractResult<OnnxNetwork> {
        if !fs_err::metadata(weights)?.is_file() {
            bail!("Weights {:?} is not a file", weights);
        }
        let location = weights
            .file_name()
            .and_then(|name| name.to_str())
            .with_context(|| format!("Invalid weights file name {weights:?}"))?;
        let dir = match weights.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let dir = dir.to_str().with_context(|| format!("Non UTF-8 weights directory {dir:?}"))?;

        let mut proto_model = self
            .framework
            .proto_model_for_path(proto)
            .with_context(|| format!("Reading network description {proto:?}"))?;
        let redirected = redirect_external_data(&mut proto_model, location);
        if redirected == 0 {
            warn!("{:?} holds its own weights, {:?} is not read", proto, weights);
        } else {
            debug!("{} initializers read from {:?}", redirected, weights);
        }

        let ParseResult { model, unresolved_inputs, .. } = self
            .framework
            .parse(&proto_model, Some(dir))
            .with_context(|| format!("Building network from {proto:?} and {weights:?}"))?;
        if !unresolved_inputs.is_empty() {
            bail!("Could not resolve inputs at top-level: {:?}", unresolved_inputs)
        }
        Ok(OnnxNetwork::new(model))
    }
}

/// Points every external-data initializer at `location`. Returns how many
/// were rewritten.
pub fn redirect_external_data(model: &mut pb::ModelProto, location: &str) -> usize {
    let Some(graph) = model.graph.as_mut() else {
        return 0;
    };
    let mut redirected = 0;
    for tensor in graph.initializer.iter_mut() {
        for entry in tensor.external_data.iter_mut().filter(|entry| entry.key == "location") {
            entry.value = location.to_string();
            redirected += 1;
        }
    }
    redirected
}

/// A parsed network, optimized lazily for the inputs bound at the first
/// forward pass.
pub struct OnnxNetwork {
    model: InferenceModel,
    target: ComputeTarget,
    target_checked: bool,
    inputs: BTreeMap<String, Tensor>,
    plan: Option<(PlanKey, Plan)>,
}

impl OnnxNetwork {
    pub fn new(model: InferenceModel) -> OnnxNetwork {
        OnnxNetwork {
            model,
            target: ComputeTarget::Cpu,
            target_checked: false,
            inputs: BTreeMap::new(),
            plan: None,
        }
    }

    fn prepare(&self, key: &PlanKey) -> TractResult<Plan> {
        let mut model = self.model.clone();
        model.set_input_names(key.inputs.iter().map(|(name, _, _)| name))?;
        model.set_output_names([&key.output])?;
        for (ix, (_, dt, shape)) in key.inputs.iter().enumerate() {
            model.set_input_fact(ix, InferenceFact::dt_shape(*dt, shape.clone()))?;
        }
        let plan = model.into_optimized()?.into_runnable()?;
        Ok(Box::new(move |inputs: TVec<TValue>| plan.run(inputs)))
    }
}

impl Network for OnnxNetwork {
    fn set_preferable_target(&mut self, target: ComputeTarget) {
        self.target = target;
        self.target_checked = false;
    }

    fn set_input(&mut self, name: &str, blob: Tensor) -> TractResult<()> {
        self.inputs.insert(name.to_string(), blob);
        Ok(())
    }

    fn forward(&mut self, output: &str) -> TractResult<Tensor> {
        if self.inputs.is_empty() {
            bail!("No input bound before forward pass")
        }
        if !self.target_checked {
            if self.target != ComputeTarget::Cpu {
                warn!("No {} runtime available, running on cpu", self.target);
            }
            self.target_checked = true;
        }
        let key = PlanKey {
            inputs: self
                .inputs
                .iter()
                .map(|(name, t)| (name.clone(), t.datum_type(), t.shape().into()))
                .collect(),
            output: output.to_string(),
        };
        if self.plan.as_ref().map(|(current, _)| *current != key).unwrap_or(true) {
            debug!("Preparing plan for {:?}", key);
            let plan = self.prepare(&key)?;
            self.plan = Some((key, plan));
        }
        let Some((_, plan)) = &self.plan else { bail!("No plan to run") };
        let inputs = self.inputs.values().map(|t| t.clone().into()).collect();
        let mut outputs = plan(inputs)?;
        if outputs.is_empty() {
            bail!("Network produced no value for {}", output)
        }
        Ok(outputs.remove(0).into_tensor())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passthrough() -> OnnxNetwork {
        let mut model = InferenceModel::default();
        model.add_source("data", InferenceFact::default()).unwrap();
        OnnxNetwork::new(model)
    }

    #[test]
    fn forward_returns_requested_output() {
        let mut net = passthrough();
        net.set_input("data", tensor1(&[0.1f32, 0.7, 0.2])).unwrap();
        let out = net.forward("data").unwrap();
        assert_eq!(out.as_slice::<f32>().unwrap(), &[0.1, 0.7, 0.2]);
        let again = net.forward("data").unwrap();
        assert_eq!(out, again);
    }

    #[test]
    fn new_input_shape_gets_a_new_plan() {
        let mut net = passthrough();
        net.set_input("data", tensor1(&[1f32, 2.0])).unwrap();
        net.forward("data").unwrap();
        net.set_input("data", tensor1(&[1f32, 2.0, 3.0])).unwrap();
        let out = net.forward("data").unwrap();
        assert_eq!(out.shape(), &[3]);
    }

    #[test]
    fn opencl_falls_back_to_cpu() {
        let mut net = passthrough();
        net.set_preferable_target(ComputeTarget::OpenCl);
        net.set_input("data", tensor1(&[4f32])).unwrap();
        assert_eq!(net.forward("data").unwrap().as_slice::<f32>().unwrap(), &[4.0]);
    }

    #[test]
    fn forward_without_input_fails() {
        let mut net = passthrough();
        assert!(net.forward("data").is_err());
    }

    #[test]
    fn unknown_output_fails() {
        let mut net = passthrough();
        net.set_input("data", tensor1(&[1f32])).unwrap();
        assert!(net.forward("prob").is_err());
    }

    fn external(location: &str) -> pb::StringStringEntryProto {
        pb::StringStringEntryProto { key: "location".into(), value: location.into() }
    }

    #[test]
    fn redirects_only_locations() {
        let offset = pb::StringStringEntryProto { key: "offset".into(), value: "128".into() };
        let mut model = pb::ModelProto {
            graph: Some(pb::GraphProto {
                initializer: vec![
                    pb::TensorProto {
                        name: "conv1/w".into(),
                        external_data: vec![external("conv1.bin"), offset],
                        ..Default::default()
                    },
                    pb::TensorProto { name: "inline".into(), ..Default::default() },
                    pb::TensorProto {
                        name: "fc/w".into(),
                        external_data: vec![external("fc.bin")],
                        ..Default::default()
                    },
                ],
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(redirect_external_data(&mut model, "googlenet.weights"), 2);
        let graph = model.graph.unwrap();
        assert_eq!(graph.initializer[0].external_data[0].value, "googlenet.weights");
        assert_eq!(graph.initializer[0].external_data[1].value, "128");
        assert!(graph.initializer[1].external_data.is_empty());
        assert_eq!(graph.initializer[2].external_data[0].value, "googlenet.weights");
    }

    #[test]
    fn redirect_without_graph() {
        assert_eq!(redirect_external_data(&mut pb::ModelProto::default(), "w.bin"), 0);
    }

    fn float_value(name: &str, len: i64) -> pb::ValueInfoProto {
        use pb::tensor_shape_proto::{Dimension, dimension};
        let shape = pb::TensorShapeProto {
            dim: vec![Dimension {
                value: Some(dimension::Value::DimValue(len)),
                ..Default::default()
            }],
        };
        let tensor =
            pb::type_proto::Tensor { elem_type: 1, shape: Some(shape), ..Default::default() };
        pb::ValueInfoProto {
            name: name.into(),
            r#type: Some(pb::TypeProto {
                value: Some(pb::type_proto::Value::TensorType(tensor)),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// `prob = data + W`, W stored as 3 floats in `location`.
    fn add_model(location: &str) -> pb::ModelProto {
        let entry = |key: &str, value: &str| pb::StringStringEntryProto {
            key: key.into(),
            value: value.into(),
        };
        let weights = pb::TensorProto {
            name: "W".into(),
            dims: vec![3],
            data_type: 1,
            data_location: Some(1),
            external_data: vec![external(location), entry("offset", "0"), entry("length", "12")],
            ..Default::default()
        };
        pb::ModelProto {
            ir_version: 7,
            opset_import: vec![pb::OperatorSetIdProto { domain: "".into(), version: 13 }],
            graph: Some(pb::GraphProto {
                name: "add".into(),
                node: vec![pb::NodeProto {
                    name: "sum".into(),
                    op_type: "Add".into(),
                    input: vec!["data".into(), "W".into()],
                    output: vec!["prob".into()],
                    ..Default::default()
                }],
                initializer: vec![weights],
                input: vec![float_value("data", 3)],
                output: vec![float_value("prob", 3)],
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn weights_read_from_renamed_file_in_other_dir() {
        use prost::Message;
        let graph_dir = tempfile::tempdir().unwrap();
        let weights_dir = tempfile::tempdir().unwrap();
        let proto = graph_dir.path().join("add.onnx");
        std::fs::write(&proto, add_model("orig.bin").encode_to_vec()).unwrap();
        let weights = weights_dir.path().join("add.weights");
        let bytes: Vec<u8> = [1f32, 2.0, 3.0].iter().flat_map(|w| w.to_le_bytes()).collect();
        std::fs::write(&weights, bytes).unwrap();

        let mut net = OnnxLoader::default().load(&proto, &weights).unwrap();
        net.set_input("data", tensor1(&[10f32, 20.0, 30.0])).unwrap();
        let out = net.forward("prob").unwrap();
        assert_eq!(out.as_slice::<f32>().unwrap(), &[11.0, 22.0, 33.0]);
    }

    #[test]
    fn missing_weights_fail_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let proto = dir.path().join("net.onnx");
        std::fs::write(&proto, b"").unwrap();
        let err = OnnxLoader::default().load(&proto, &dir.path().join("net.weights"));
        assert!(format!("{:#}", err.err().unwrap()).contains("net.weights"));
    }

    #[test]
    fn corrupt_description_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let proto = dir.path().join("net.onnx");
        let weights = dir.path().join("net.weights");
        std::fs::write(&proto, b"\xff\xff\xff not a protobuf").unwrap();
        std::fs::write(&weights, b"\0\0\0\0").unwrap();
        assert!(OnnxLoader::default().load(&proto, &weights).is_err());
    }
}
