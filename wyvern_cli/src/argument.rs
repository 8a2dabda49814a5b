use anstyle::{AnsiColor, Style};
use clap::Parser;
use clap::builder::Styles;

const CYAN: Style = AnsiColor::Cyan.on_default();
const GREEN: Style = AnsiColor::Green.on_default();
const GREEN_BOLD: Style = AnsiColor::Green.on_default().bold();
const RED_BOLD: Style = AnsiColor::Red.on_default().bold();
const YELLOW: Style = AnsiColor::Yellow.on_default();
const STYLES: Styles = Styles::styled()
    .header(GREEN_BOLD)
    .usage(GREEN_BOLD)
    .literal(CYAN)
    .placeholder(CYAN)
    .error(RED_BOLD)
    .valid(GREEN)
    .invalid(YELLOW);

/// Command line arguments of the world server.
#[derive(Debug, Parser)]
#[command(
    name = "wyvern",
    version,
    about = "A text-based multi-user world server",
    styles = STYLES
)]
pub struct Arguments {
    /// TCP port players connect to
    #[arg(short, long, default_value_t = 4242)]
    pub port: u16,

    /// Bytecodes a fiber may execute per scheduler slice
    #[arg(long, default_value_t = 1000)]
    pub slice_budget: usize,

    /// Scheduler ticks between garbage collection cycles
    #[arg(long, default_value_t = 128)]
    pub gc_interval: u64,

    /// Server tick timeout in milliseconds
    #[arg(long, default_value_t = 20)]
    pub tick_millis: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let arguments = Arguments::parse_from(["wyvern"]);
        assert_eq!(4242, arguments.port);
        assert_eq!(1000, arguments.slice_budget);
        assert_eq!(128, arguments.gc_interval);
        assert_eq!(20, arguments.tick_millis);
    }

    #[test]
    fn test_overrides() {
        let arguments = Arguments::parse_from(["wyvern", "--port", "4000", "--gc-interval", "64"]);
        assert_eq!(4000, arguments.port);
        assert_eq!(64, arguments.gc_interval);
    }
}
