#[macro_use]
extern crate log;

use std::process;

use dnn_classifier::OnnxLoader;

mod params;

/// Entrypoint for the command-line interface.
fn main() {
    let mut command = params::command();
    let matches = command.clone().get_matches();

    let level = params::log_level(matches.occurrences_of("verbosity"));
    let env = env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, level);
    env_logger::Builder::from_env(env).format_timestamp_nanos().init();

    if params::is_on(&matches, "show_help") {
        if let Err(e) = command.print_help() {
            warn!("Could not print help: {}", e);
        }
        println!();
    }

    let config = params::config_from_matches(&matches);
    debug!("{:?}", config);

    let stdout = std::io::stdout();
    if let Err(e) = dnn_classifier::classify(&config, &OnnxLoader::default(), &mut stdout.lock()) {
        error!("{}", e);
        process::exit(e.exit_code())
    }
}
