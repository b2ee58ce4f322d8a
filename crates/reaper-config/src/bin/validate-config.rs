//! Config validation CLI tool
//!
//! Validates a tag-reaper configuration file and reports any errors.

use reaper_util::default_config_path;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a tag-reaper configuration file.");
            eprintln!();
            eprintln!("If no path is provided, uses: {}", default_path.display());
            eprintln!();
            eprintln!("Example:");
            eprintln!("  validate-config {}", default_path.display());
            eprintln!("  validate-config config.example.toml");
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match reaper_config::load_config(&config_path) {
        Ok(policy) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", reaper_config::CURRENT_CONFIG_VERSION);
            if policy.global.regions.is_empty() {
                println!("  Regions: all");
            } else {
                let regions: Vec<&str> = policy.global.regions.iter().map(|r| r.as_str()).collect();
                println!("  Regions: {}", regions.join(", "));
            }
            println!("  Kinds: {}", policy.kinds.len());

            for kind in &policy.kinds {
                println!();
                println!(
                    "{}{}:",
                    kind.kind,
                    if kind.enabled { "" } else { " (disabled)" }
                );
                for state in kind.states.values() {
                    let leads: Vec<String> = state
                        .schedule
                        .iter()
                        .map(|n| n.lead_days.to_string())
                        .collect();
                    println!(
                        "  - {}: {} after {} days (max {}), notify at [{}]{}",
                        state.state,
                        state.action_label(),
                        state.default_days,
                        state.max_days,
                        leads.join(", "),
                        state
                            .next_state
                            .as_deref()
                            .map(|n| format!(", then {}", n))
                            .unwrap_or_default()
                    );
                }
            }

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                reaper_config::ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                reaper_config::ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                reaper_config::ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                reaper_config::ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        reaper_config::CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
