use std::io::IsTerminal;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use wyvern_vm::Result;

const LOG_ENV_VAR: &str = "WYVERN_LOG";

/// Initializes the logging system from the `WYVERN_LOG` environment
/// variable; logging stays off when the variable is unset.
pub(crate) fn initialize() -> Result<()> {
    if std::env::var_os(LOG_ENV_VAR).is_none() {
        return Ok(());
    }

    let enable_ansi = std::io::stdout().is_terminal();

    let format = tracing_subscriber::fmt::format()
        .with_ansi(enable_ansi)
        .with_level(true)
        .with_target(false)
        .with_thread_ids(false)
        .with_timer(fmt::time::uptime())
        .compact();

    let filter = EnvFilter::from_env(LOG_ENV_VAR);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .fmt_fields(fmt::format::DefaultFields::new())
        .event_format(format)
        .init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize() -> Result<()> {
        // This test just checks that the function doesn't panic.
        initialize()
    }
}
