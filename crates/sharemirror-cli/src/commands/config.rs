//! Config command - inspect the configuration file

use std::path::Path;

use anyhow::{Context, Result};
use clap::Subcommand;
use tracing::info;

use sharemirror_core::config::Config;

use super::CliContext;
use crate::output::Render;

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the effective configuration
    Show,
    /// Validate the configuration file
    Validate,
}

/// The effective configuration as YAML and JSON
struct Effective {
    yaml: String,
    json: serde_json::Value,
}

impl Render for Effective {
    fn lines(&self) -> Vec<String> {
        self.yaml.lines().map(str::to_string).collect()
    }

    fn json(&self) -> serde_json::Value {
        self.json.clone()
    }
}

/// Outcome of `config validate`
struct Validation {
    config_path: String,
    errors: Vec<String>,
}

impl Validation {
    fn new(path: &Path, errors: Vec<String>) -> Self {
        Self {
            config_path: path.display().to_string(),
            errors,
        }
    }
}

impl Render for Validation {
    fn lines(&self) -> Vec<String> {
        self.errors.iter().map(|e| format!("  {e}")).collect()
    }

    fn json(&self) -> serde_json::Value {
        serde_json::json!({
            "valid": self.errors.is_empty(),
            "config_path": self.config_path,
            "errors": self.errors,
        })
    }
}

impl ConfigCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        match self {
            ConfigCommand::Show => self.execute_show(ctx),
            ConfigCommand::Validate => self.execute_validate(ctx),
        }
    }

    fn execute_show(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();
        let config = ctx.load_config()?;

        info!(config_path = %ctx.config_path.display(), "Showing configuration");

        let effective = Effective {
            yaml: config.to_yaml()?,
            json: serde_json::to_value(&config)
                .context("Failed to serialize configuration to JSON")?,
        };
        formatter.done(
            &format!("Configuration ({})", ctx.config_path.display()),
            &effective,
        );
        Ok(())
    }

    fn execute_validate(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();

        let errors = match Config::load(&ctx.config_path) {
            Ok(config) => config.validate().iter().map(|e| e.to_string()).collect(),
            Err(e) => vec![format!("{e:#}")],
        };
        let validation = Validation::new(&ctx.config_path, errors);
        if validation.errors.is_empty() {
            formatter.done(
                &format!("Configuration is valid ({})", validation.config_path),
                &validation,
            );
        } else {
            formatter.error(&format!("{} problem(s) found", validation.errors.len()));
            formatter.show(&validation);
        }
        Ok(())
    }
}
