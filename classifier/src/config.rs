use std::path::PathBuf;

use crate::blob::BlobParams;
use crate::network::ComputeTarget;

pub const DEFAULT_PROTO: &str = "bvlc_googlenet.prototxt";
pub const DEFAULT_MODEL: &str = "bvlc_googlenet.caffemodel";
pub const DEFAULT_IMAGE: &str = "space_shuttle.jpg";
pub const DEFAULT_LABELS: &str = "synset_words.txt";
pub const DEFAULT_INPUT_NODE: &str = "data";
pub const DEFAULT_OUTPUT_NODE: &str = "prob";
pub const DEFAULT_BENCH_REPEATS: usize = 10;

/// Where the default weights can be fetched from.
pub const WEIGHTS_HINT_URL: &str = "http://dl.caffe.berkeleyvision.org/bvlc_googlenet.caffemodel";

/// Names of the network input the blob is bound to and of the output read back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeNames {
    pub input: String,
    pub output: String,
}

impl Default for NodeNames {
    fn default() -> NodeNames {
        NodeNames { input: DEFAULT_INPUT_NODE.to_string(), output: DEFAULT_OUTPUT_NODE.to_string() }
    }
}

/// Everything a classification run needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Network description.
    pub proto: PathBuf,
    /// Network weights.
    pub model: PathBuf,
    pub image: PathBuf,
    pub labels: PathBuf,
    pub target: ComputeTarget,
    pub nodes: NodeNames,
    pub blob: BlobParams,
    /// Forward passes run after the first one, for timing only.
    pub bench_repeats: usize,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            proto: DEFAULT_PROTO.into(),
            model: DEFAULT_MODEL.into(),
            image: DEFAULT_IMAGE.into(),
            labels: DEFAULT_LABELS.into(),
            target: ComputeTarget::default(),
            nodes: NodeNames::default(),
            blob: BlobParams::default(),
            bench_repeats: DEFAULT_BENCH_REPEATS,
        }
    }
}
