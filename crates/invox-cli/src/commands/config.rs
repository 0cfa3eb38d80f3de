//! Config command - show or initialize pipeline configuration.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use console::style;

use invox_core::models::config::InvoxConfig;

use super::{default_model_dir, load_config};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    action: ConfigAction,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the active configuration
    Show,

    /// Write a default config file
    Init {
        /// Destination path
        #[arg(short, long, default_value = "invox.json")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub async fn run(args: ConfigArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    match args.action {
        ConfigAction::Show => {
            let config = load_config(config_path)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            println!();
            println!(
                "{} default model directory: {}",
                style("ℹ").blue(),
                default_model_dir().display()
            );
        }
        ConfigAction::Init { path, force } => {
            if path.exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }
            InvoxConfig::default().save(&path)?;
            println!(
                "{} wrote default configuration to {}",
                style("✓").green(),
                path.display()
            );
        }
    }

    Ok(())
}
