pub use log::LevelFilter::*;

/// Install the global logger. Later calls are ignored once a logger is set.
pub fn setup_logging(verbosity: log::LevelFilter) {
    let result = fern::Dispatch::new()
        .level(verbosity)
        .format(|out, message, record| out.finish(format_args!("({}) {}: {}", record.level(), record.target(), message)))
        .chain(std::io::stderr())
        .apply();

    if result.is_err() {
        log::trace!("Logger already installed");
    }
}
