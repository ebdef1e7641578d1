use std::process::ExitCode;

fn main() -> ExitCode {
    let mut logger = pretty_env_logger::formatted_builder();
    match std::env::var("RUST_LOG") {
        Ok(filters) => logger.parse_filters(&filters),
        Err(_) => logger.filter_module("odrecord", log::LevelFilter::Info),
    };
    logger.init();

    match odrecord::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}
