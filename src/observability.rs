use std::env;

use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_subscriber::{prelude::*, EnvFilter};

/// Logs go to stderr so they never interleave with the report on stdout.
pub fn initialize_tracing(verbose: bool) {
    let (level, env_filter) = parse_rust_log(verbose);
    let format = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    // A second call (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(format.with_filter(LevelFilter::from(level)))
        .with(env_filter)
        .try_init();
}

pub fn parse_rust_log(verbose: bool) -> (Level, EnvFilter) {
    // A plain level in RUST_LOG is applied on top of the default directives,
    // anything else is used verbatim.
    let default_level = if verbose { Level::DEBUG } else { Level::WARN };
    let level = match env::var(EnvFilter::DEFAULT_ENV) {
        Ok(value) => match value.parse::<Level>() {
            Ok(level) => level,
            Err(_) => return (Level::TRACE, EnvFilter::new(value)),
        },
        Err(_) => default_level,
    };

    let env_filter = EnvFilter::new(
        "INFO,\
        hyper=WARN,\
        reqwest=WARN,\
        zipswarm=TRACE,\
        ",
    );

    (level, env_filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_twice_does_not_panic() {
        initialize_tracing(false);
        initialize_tracing(true);
    }
}
