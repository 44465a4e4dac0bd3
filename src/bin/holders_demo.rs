use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use holders::config::{ConfigError, DemoConfig};
use holders::scenarios::{self, Scenario, ScenarioReport};

/// Replays the exclusive and shared ownership walkthroughs
#[derive(Parser)]
#[command(name = "holders-demo", version, about)]
struct Cli {
    /// TOML file with demo settings
    #[arg(short = 'c', long = "config", value_parser = clap::value_parser!(PathBuf))]
    config: Option<PathBuf>,

    #[arg(short = 's', long = "scenario", value_enum)]
    scenario: Option<Scenario>,

    /// Starting value for the exclusive and shared walkthroughs
    #[arg(long = "initial", allow_negative_numbers = true)]
    initial: Option<i64>,

    /// Number of clones made by the fan-out walkthrough
    #[arg(long = "copies")]
    copies: Option<usize>,

    #[arg(long = "no-color")]
    no_color: bool,
}

impl Cli {
    fn resolve_config(&self) -> Result<DemoConfig, ConfigError> {
        let config = match &self.config {
            Some(path) => DemoConfig::load(path)?,
            None => DemoConfig::default(),
        };
        self.apply_overrides(config)
    }

    /// Flags win over file values; the merged result is validated again.
    fn apply_overrides(&self, mut config: DemoConfig) -> Result<DemoConfig, ConfigError> {
        if let Some(scenario) = self.scenario {
            config.scenario = scenario;
        }
        if let Some(initial) = self.initial {
            config.initial_value = initial;
        }
        if let Some(copies) = self.copies {
            config.copies = copies;
        }
        if self.no_color {
            config.color = false;
        }
        config.validate()?;
        Ok(config)
    }
}

fn print_report(report: &ScenarioReport) {
    let verdict = if report.releases == 1 {
        "released once".green()
    } else {
        format!("released {} times", report.releases).as_str().red()
    };
    print!("{}", report);
    println!("  => {}", verdict.bold());
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.resolve_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // `resolve_config` already validated the level.
    let level = config.level_filter().unwrap_or(log::LevelFilter::Info);
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
    colored::control::set_override(config.color);

    match scenarios::run(config.scenario, config.initial_value, config.copies) {
        Ok(reports) => {
            for report in &reports {
                print_report(report);
            }
            log::info!("{} walkthroughs finished", reports.len());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{} {}", "Error:".red(), e);
            ExitCode::FAILURE
        }
    }
}
