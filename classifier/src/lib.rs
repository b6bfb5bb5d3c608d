//! # dnn-classifier
//!
//! Classify a single image with a pre-trained network and report the best
//! class.
//!
//! The pipeline reads a label list, loads a network through a
//! [`NetworkLoader`], turns the image into an input blob, runs the forward
//! pass (plus a timed benchmark step) and looks the arg-max up in the
//! labels.
//!
//! ```no_run
//! use dnn_classifier::{classify, Config, OnnxLoader};
//!
//! let config = Config::default();
//! let prediction = classify(&config, &OnnxLoader::default(), &mut std::io::stdout()).unwrap();
//! assert!(prediction.probability <= 1.0);
//! ```
#[macro_use]
extern crate log;

pub mod blob;
pub mod classify;
pub mod config;
pub mod errors;
pub mod labels;
pub mod network;
pub mod onnx;
pub mod run;

use std::io::Write;

pub use self::classify::Prediction;
pub use self::config::{Config, NodeNames};
pub use self::errors::{ClassifyError, ClassifyResult};
pub use self::network::{ComputeTarget, Network, NetworkLoader};
pub use self::onnx::{OnnxLoader, OnnxNetwork};

/// Runs the whole pipeline and writes the two result lines to `out`.
///
/// Labels are read before the network is loaded: a missing label file stops
/// the run without touching the model.
pub fn classify<L: NetworkLoader>(
    config: &Config,
    loader: &L,
    out: &mut dyn Write,
) -> ClassifyResult<Prediction> {
    let labels = labels::load_labels(&config.labels)?;
    info!("Loaded {} labels from {:?}", labels.len(), config.labels);

    let mut net = loader.load(&config.proto, &config.model).map_err(|source| {
        ClassifyError::ModelLoad {
            proto: config.proto.clone(),
            model: config.model.clone(),
            source,
        }
    })?;
    info!("Network loaded from {:?} and {:?}", config.proto, config.model);

    if config.target != ComputeTarget::Cpu {
        net.set_preferable_target(config.target);
    }

    let image = blob::read_image(&config.image)?;
    debug!("Image {:?} decoded ({}x{})", config.image, image.width(), image.height());
    let input = blob::blob_from_image(&image, &config.blob);

    let output = run::run_inference(&mut net, &input, &config.nodes, config.bench_repeats)
        .map_err(ClassifyError::Inference)?;

    let prediction = classify::best_class(&output, &labels)?;
    classify::report(out, &prediction).map_err(ClassifyError::Report)?;
    Ok(prediction)
}
