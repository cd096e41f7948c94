use std::str::FromStr;

use tracing::metadata::LevelFilter;
use tracing_subscriber::{
    Layer, filter::FilterFn, prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt,
};

/// Environment variable selecting the log level
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

fn level_from(value: Option<&str>, default: LevelFilter) -> LevelFilter {
    value.map_or(default, |level| {
        LevelFilter::from_str(level).unwrap_or_else(|_| {
            eprintln!("Invalid log level specified {level}, defaulting to {default}");
            default
        })
    })
}

/// Install the stderr subscriber for the `vapi` crates
///
/// Stdout is left to the demo report.
pub fn init() {
    let default = if cfg!(debug_assertions) {
        LevelFilter::TRACE
    } else {
        LevelFilter::INFO
    };
    let level = level_from(std::env::var(LOG_LEVEL_ENV).ok().as_deref(), default);

    tracing_subscriber::Registry::default()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_file(false)
                .with_line_number(false)
                .compact()
                .with_ansi(true)
                .with_timer(tracing_subscriber::fmt::time::ChronoUtc::rfc_3339())
                .with_filter(level)
                .with_filter(FilterFn::new(|metadata| {
                    metadata.target().starts_with("vapi")
                })),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_parsing_falls_back_to_default() {
        assert_eq!(level_from(None, LevelFilter::INFO), LevelFilter::INFO);
        assert_eq!(level_from(Some("debug"), LevelFilter::INFO), LevelFilter::DEBUG);
        assert_eq!(level_from(Some("chatty"), LevelFilter::WARN), LevelFilter::WARN);
    }
}
