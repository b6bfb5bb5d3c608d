use std::path::PathBuf;

use clap::{AppSettings, Arg, ArgMatches, Command, crate_version};
use dnn_classifier::config::*;
use dnn_classifier::{ComputeTarget, Config, NodeNames};

/// A boolean option: bare `--name` is true, `--name=true|false` sets it.
fn switch(name: &'static str) -> Arg<'static> {
    Arg::new(name)
        .takes_value(true)
        .value_name("BOOL")
        .require_equals(true)
        .min_values(0)
        .default_missing_value("true")
        .possible_values(["true", "false"])
}

pub fn is_on(matches: &ArgMatches, name: &str) -> bool {
    matches.value_of(name) == Some("true")
}

/// Command line definition. `--help` prints usage and the run goes on.
pub fn command() -> Command<'static> {
    Command::new("dnn-classify")
        .version(crate_version!())
        .about("Classify an image with a pre-trained network and print the best class")
        .setting(AppSettings::DeriveDisplayOrder)
        .disable_help_flag(true)
        .arg(switch("show_help").long("help").help("Print this message, then classify"))
        .arg(
            Arg::new("proto")
                .long("proto")
                .takes_value(true)
                .value_name("PATH")
                .default_value(DEFAULT_PROTO)
                .help("Network description: an ONNX graph"),
        )
        .arg(
            Arg::new("model")
                .long("model")
                .takes_value(true)
                .value_name("PATH")
                .default_value(DEFAULT_MODEL)
                .help("Network weights: external data of the ONNX graph"),
        )
        .arg(
            Arg::new("image")
                .long("image")
                .takes_value(true)
                .value_name("PATH")
                .default_value(DEFAULT_IMAGE)
                .help("Image to classify"),
        )
        .arg(switch("opencl").long("opencl").help("Prefer the OpenCL compute target"))
        .arg(
            Arg::new("input_node")
                .long("input-node")
                .takes_value(true)
                .value_name("NAME")
                .default_value(DEFAULT_INPUT_NODE)
                .help("Network input the image is bound to"),
        )
        .arg(
            Arg::new("output_node")
                .long("output-node")
                .takes_value(true)
                .value_name("NAME")
                .default_value(DEFAULT_OUTPUT_NODE)
                .help("Network output holding the class probabilities"),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .multiple_occurrences(true)
                .help("Sets the level of verbosity."),
        )
}

pub fn config_from_matches(matches: &ArgMatches) -> Config {
    let defaults = Config::default();
    let path =
        |name: &str, default: PathBuf| matches.value_of(name).map(PathBuf::from).unwrap_or(default);
    let node =
        |name: &str, default: String| matches.value_of(name).map(String::from).unwrap_or(default);
    Config {
        proto: path("proto", defaults.proto),
        model: path("model", defaults.model),
        image: path("image", defaults.image),
        target: if is_on(matches, "opencl") {
            ComputeTarget::OpenCl
        } else {
            ComputeTarget::Cpu
        },
        nodes: NodeNames {
            input: node("input_node", defaults.nodes.input),
            output: node("output_node", defaults.nodes.output),
        },
        ..defaults
    }
}

/// Log filter for a number of `-v`.
pub fn log_level(verbosity: u64) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}
