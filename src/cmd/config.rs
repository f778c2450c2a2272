//! Configuration view and validation commands: `opflow config`.

use anyhow::Result;
use opflow::config::{LOG_ENV_VAR, OpflowConfig};
use std::path::Path;

use super::super::ConfigCommands;

pub fn cmd_config(config_path: &Path, command: Option<ConfigCommands>) -> Result<()> {
    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Opflow Configuration");
            println!("====================");
            println!();

            let config = if config_path.exists() {
                println!("Config file: {}", config_path.display());
                OpflowConfig::load(config_path)?
            } else {
                println!("No opflow.toml found at {}", config_path.display());
                println!("Using default configuration.");
                OpflowConfig::default()
            };
            println!();

            println!("[classification]");
            for rule in &config.classification.rules {
                println!("  {} <- {}", rule.kind, rule.keywords.join(", "));
            }
            println!();

            println!("[terminal]");
            println!(
                "  multiple_terminal_components = \"{}\"",
                config.terminal.multiple_terminal_components
            );
            let kinds: Vec<String> = config
                .terminal
                .report_predecessor_for
                .iter()
                .map(|k| k.to_string())
                .collect();
            println!("  report_predecessor_for = [{}]", kinds.join(", "));
            println!();

            println!("[logging]");
            println!("  level = \"{}\"", config.logging.level);
            println!("  json = {}", config.logging.json);
            println!();

            println!("Effective log filter ({} overrides): {}", LOG_ENV_VAR, config.log_filter());
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                println!("No opflow.toml found. Using defaults (valid).");
                return Ok(());
            }

            let config = OpflowConfig::load(config_path)?;
            let warnings = config.validate();

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("opflow.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            if let Some(parent) = config_path.parent()
                && !parent.as_os_str().is_empty()
                && !parent.exists()
            {
                std::fs::create_dir_all(parent)?;
            }

            OpflowConfig::default().save(config_path)?;

            println!("Created opflow.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [classification] keyword rules for operation kinds");
            println!("  - [terminal] multiple_terminal_components, report_predecessor_for");
            println!("  - [logging] level, json");
            println!();
        }
    }

    Ok(())
}
