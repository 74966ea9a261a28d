//! Config command - View and validate the Folio configuration
//!
//! Both subcommands act on the file given by `--config`, or on the default
//! location when the flag is absent.

use anyhow::{Context, Result};
use clap::Subcommand;
use folio_core::config::Config;
use tracing::info;

use crate::app::Environment;
use crate::output::OutputFormat;

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the effective configuration
    Show,
    /// Validate the configuration file
    Validate,
}

impl ConfigCommand {
    pub async fn execute(&self, env: &Environment, format: OutputFormat) -> Result<()> {
        match self {
            ConfigCommand::Show => self.execute_show(env, format),
            ConfigCommand::Validate => self.execute_validate(env, format),
        }
    }

    fn execute_show(&self, env: &Environment, format: OutputFormat) -> Result<()> {
        let formatter = env.formatter(format);
        let config_path = &env.config_path;

        info!(config_path = %config_path.display(), "Showing configuration");

        if format.is_json() {
            let json = serde_json::to_value(&env.config)
                .context("Failed to serialize configuration to JSON")?;
            formatter.print_json(&json);
            return Ok(());
        }

        formatter.success(&format!("Configuration ({})", config_path.display()));
        if !config_path.exists() {
            formatter.info("File not found; showing defaults");
        }
        formatter.info("");
        let yaml =
            serde_yaml::to_string(&env.config).context("Failed to serialize configuration to YAML")?;
        for line in yaml.lines() {
            formatter.info(line);
        }
        Ok(())
    }

    fn execute_validate(&self, env: &Environment, format: OutputFormat) -> Result<()> {
        let formatter = env.formatter(format);
        let config_path = &env.config_path;

        // Load explicitly so parse errors surface instead of falling back to defaults
        let config = match Config::load(config_path) {
            Ok(config) => config,
            Err(e) => {
                let message = if config_path.exists() {
                    format!("{e:#}")
                } else {
                    "Configuration file not found. Using defaults.".to_string()
                };
                if format.is_json() {
                    formatter.print_json(&serde_json::json!({
                        "valid": false,
                        "config_path": config_path.display().to_string(),
                        "errors": [message],
                    }));
                } else if config_path.exists() {
                    formatter.error(&message);
                } else {
                    formatter.info(&format!(
                        "Configuration file not found at {}",
                        config_path.display()
                    ));
                    formatter.info("Using default configuration.");
                }
                return Ok(());
            }
        };

        info!(config_path = %config_path.display(), "Validating configuration");

        let errors = config.validate();

        if format.is_json() {
            let error_strings: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            formatter.print_json(&serde_json::json!({
                "valid": errors.is_empty(),
                "config_path": config_path.display().to_string(),
                "errors": error_strings,
            }));
        } else if errors.is_empty() {
            formatter.success("Configuration is valid");
            formatter.info(&format!("File: {}", config_path.display()));
        } else {
            formatter.error(&format!(
                "Configuration has {} error{}:",
                errors.len(),
                if errors.len() == 1 { "" } else { "s" }
            ));
            formatter.info(&format!("File: {}", config_path.display()));
            formatter.info("");
            for error in &errors {
                formatter.info(&format!("  {} - {}", error.field, error.message));
            }
        }
        Ok(())
    }
}
