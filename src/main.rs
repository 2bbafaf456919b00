use std::io::Read;
use std::process;

use clap::Parser;

use composeguard::cli::Cli;
use composeguard::validator::{self, format, Verdict};

fn main() {
    let cli = Cli::parse();
    cli.init_logging();
    process::exit(run(&cli));
}

/// Validate every input and return the worst exit code across them.
fn run(cli: &Cli) -> i32 {
    let mut exit = 0;

    for file in &cli.files {
        let (text, label) = match read_input(file) {
            Ok(input) => input,
            Err(err) => {
                eprintln!("composeguard: {}: {}", file, err);
                exit = exit.max(2);
                continue;
            }
        };

        match validator::validate_with_context(&text, Some(&label)) {
            Ok(report) => {
                print!("{}", format::render(&report, cli.format));
                if report.verdict == Verdict::Fail {
                    exit = exit.max(1);
                }
            }
            Err(err) => {
                eprintln!("composeguard: {}: {}", label, err);
                exit = exit.max(err.exit_code());
            }
        }
    }

    exit
}

fn read_input(file: &str) -> std::io::Result<(String, String)> {
    if file == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        Ok((text, "<stdin>".to_string()))
    } else {
        Ok((std::fs::read_to_string(file)?, file.to_string()))
    }
}
