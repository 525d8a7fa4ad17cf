//! CLI module for xdi.
//!
//! Subcommands:
//! - `inspect`: Wire the demonstration services and list the container
//! - `validate`: Wire the demonstration services and build every lazy one

mod inspect;
mod validate;
pub mod wiring;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::Result;

use crate::config::Config;
use crate::container::Container;

/// xdi - Service container inspector
#[derive(Parser)]
#[command(name = "xdi")]
#[command(about = "Inspect and validate a service container wiring")]
#[command(version)]
pub struct App {
    /// Run in verbose mode
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Project config file (defaults to `.xdi.toml`)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Wire the services, inject a handler and list the registry
    Inspect {
        /// Print the registry as JSON
        #[arg(long)]
        json: bool,
    },

    /// Wire the services and build every lazy one
    Validate {
        /// Add a service whose provider cannot succeed
        #[arg(long)]
        broken: bool,
    },
}

impl App {
    /// Run the CLI application.
    pub fn run(self) -> Result<()> {
        match self.command {
            Command::Inspect { json } => self.run_inspect(json),
            Command::Validate { broken } => self.run_validate(broken),
        }
    }

    fn load_config(&self) -> Result<Config> {
        let config = match &self.config {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };
        tracing::debug!(
            on_missing = ?config.container.on_missing,
            validate_on_start = config.container.validate_on_start,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Build a container from config and register the demonstration services.
    fn build_container(&self, broken: bool) -> Result<(Config, Container)> {
        let config = self.load_config()?;
        let container = Container::from_config(&config.container);
        wiring::wire(&container, broken);
        tracing::info!("Registered {} service(s)", container.len());
        Ok((config, container))
    }
}
