//! Command-line interface definition.

use clap::Parser;

use crate::validator::OutputFormat;

/// Check Docker Compose files against a fixed security baseline.
///
/// Exit codes: 0 = pass, 1 = fail (critical finding present),
/// 2 = the input could not be parsed or modeled.
#[derive(Parser, Debug)]
#[command(name = "composeguard", version, about, long_about = None)]
pub struct Cli {
    /// Compose files to validate; `-` reads from stdin.
    #[arg(value_name = "FILE", default_value = "docker-compose.yml")]
    pub files: Vec<String>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Increase logging verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all logging output.
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Initialize logging based on verbosity flags.
    pub fn init_logging(&self) {
        if self.quiet {
            return;
        }

        let level = match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };

        env_logger::Builder::from_default_env()
            .filter_level(level)
            .init();
    }
}
